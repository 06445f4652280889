// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! The glyph outline path model (§3, §4.B)
//!
//! The source represents the outline as a doubly-linked list of `PathElt`
//! nodes with raw `prev`/`next` pointers. The rewrite keeps the same
//! traversal operations but stores elements in a flat, arena-indexed `Vec`
//! owned by the per-glyph [`crate::context::Context`]; links are `ElementId`
//! indices rather than pointers, per the design notes in `spec.md` §9.

use crate::conv::{to_u32, to_usize};
use crate::fixed::{BBox, Fixed, Point};
use bitflags::bitflags;
use smallvec::SmallVec;

/// Index of a [`PathElement`] within a [`Path`]'s arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

impl ElementId {
    #[inline]
    pub fn get(self) -> usize {
        to_usize(self.0)
    }
}

bitflags! {
    /// Flags carried on a [`PathElement`], matching `PathElt`'s bitfields.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EltFlags: u8 {
        /// Part of an auto-detected flex pair (§4.H `AutoAddFlex`).
        const IS_FLEX = 1 << 0;
        /// The flex pair runs along y rather than x.
        const Y_FLEX  = 1 << 1;
        /// Horizontal hint seg-list was temporarily copied backward by the
        /// hint promoter (§4.I `PromoteHints`).
        const H_COPY  = 1 << 2;
        /// Vertical counterpart of `H_COPY`.
        const V_COPY  = 1 << 3;
        /// This element's closepath endpoint was relocated by the editor.
        const NEW_CP  = 1 << 4;
    }
}

/// The operator a [`PathElement`] represents, mirroring `PathElt.type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EltKind {
    Move,
    Line,
    Curve,
    Close,
}

/// One node of the glyph outline.
///
/// `prev`/`next` form the doubly-linked traversal order within a subpath (and
/// across subpaths, since the whole outline is one chain terminated by
/// `None` at both ends). `hs`/`vs` are populated by the segment generator
/// (§4.D) with the candidate edge segments that originate at this element.
#[derive(Clone, Debug)]
pub struct PathElement {
    pub kind: EltKind,
    pub prev: Option<ElementId>,
    pub next: Option<ElementId>,

    /// Endpoint for Move/Line; final on-curve point for Curve.
    pub x: Fixed,
    pub y: Fixed,
    /// First off-curve control point (Curve only).
    pub x1: Fixed,
    pub y1: Fixed,
    /// Second off-curve control point (Curve only).
    pub x2: Fixed,
    pub y2: Fixed,

    pub flags: EltFlags,

    /// Segment links generated from this element (§3 `hs`/`vs`). Most
    /// elements carry at most one or two; inline up to 2 before spilling.
    pub hs: SmallVec<[crate::segment::SegId; 2]>,
    pub vs: SmallVec<[crate::segment::SegId; 2]>,

    /// 0, or the index of the hint-substitution bucket that becomes active
    /// at this element (§4.I).
    pub new_hints: u32,

    /// Scratch counter used by the path editor and subpath shuffler.
    pub count: i32,
}

impl PathElement {
    fn new(kind: EltKind) -> PathElement {
        PathElement {
            kind,
            prev: None,
            next: None,
            x: Fixed::ZERO,
            y: Fixed::ZERO,
            x1: Fixed::ZERO,
            y1: Fixed::ZERO,
            x2: Fixed::ZERO,
            y2: Fixed::ZERO,
            flags: EltFlags::empty(),
            hs: SmallVec::new(),
            vs: SmallVec::new(),
            new_hints: 0,
            count: 0,
        }
    }

    /// The on-curve endpoint of this element (third curve point, or the
    /// move/line coordinate).
    pub fn end_point(&self) -> Point {
        match self.kind {
            EltKind::Curve => Point::new(self.x, self.y),
            _ => Point::new(self.x, self.y),
        }
    }
}

/// A doubly-linked, arena-backed glyph outline: one or more subpaths, each a
/// `Move ... Close` run with at least one `Line`/`Curve` in between (§3
/// invariants, enforced by [`Path::pre_check`]).
#[derive(Clone, Debug, Default)]
pub struct Path {
    elements: Vec<PathElement>,
    head: Option<ElementId>,
    tail: Option<ElementId>,
}

impl Path {
    pub fn new() -> Path {
        Path::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: ElementId) -> &PathElement {
        &self.elements[id.get()]
    }
    pub fn get_mut(&mut self, id: ElementId) -> &mut PathElement {
        &mut self.elements[id.get()]
    }

    pub fn head(&self) -> Option<ElementId> {
        self.head
    }
    pub fn tail(&self) -> Option<ElementId> {
        self.tail
    }

    /// Append a new Move/Line element.
    pub fn append_move_or_line(&mut self, kind: EltKind, x: Fixed, y: Fixed) -> ElementId {
        debug_assert!(matches!(kind, EltKind::Move | EltKind::Line));
        let mut e = PathElement::new(kind);
        e.x = x;
        e.y = y;
        self.append_element(e)
    }

    /// Append a new Curve element (three absolute points).
    pub fn append_curve(&mut self, x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed, x3: Fixed, y3: Fixed) -> ElementId {
        let mut e = PathElement::new(EltKind::Curve);
        e.x1 = x1;
        e.y1 = y1;
        e.x2 = x2;
        e.y2 = y2;
        e.x = x3;
        e.y = y3;
        self.append_element(e)
    }

    /// Append a Close element.
    pub fn append_close(&mut self) -> ElementId {
        self.append_element(PathElement::new(EltKind::Close))
    }

    fn append_element(&mut self, e: PathElement) -> ElementId {
        let id = ElementId(to_u32(self.elements.len()));
        self.elements.push(e);
        if let Some(tail) = self.tail {
            self.get_mut(tail).next = Some(id);
            self.get_mut(id).prev = Some(tail);
        } else {
            self.head = Some(id);
        }
        self.tail = Some(id);
        id
    }

    /// Unlink `e` from the chain. Does not renumber other elements (their
    /// `ElementId`s stay valid); the slot is simply skipped by traversal.
    pub fn delete_element(&mut self, e: ElementId) {
        let (prev, next) = {
            let elt = self.get(e);
            (elt.prev, elt.next)
        };
        match prev {
            Some(p) => self.get_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.get_mut(n).prev = prev,
            None => self.tail = prev,
        }
        let elt = self.get_mut(e);
        elt.prev = None;
        elt.next = None;
    }

    /// Insert `new_id` immediately after `after`.
    pub fn insert_after(&mut self, after: ElementId, mut new_elt: PathElement) -> ElementId {
        let next = self.get(after).next;
        let id = ElementId(to_u32(self.elements.len()));
        new_elt.prev = Some(after);
        new_elt.next = next;
        self.elements.push(new_elt);
        self.get_mut(after).next = Some(id);
        match next {
            Some(n) => self.get_mut(n).prev = Some(id),
            None => self.tail = Some(id),
        }
        id
    }

    /// Iterate all elements in path order.
    pub fn iter(&self) -> PathIter<'_> {
        PathIter {
            path: self,
            cur: self.head,
        }
    }

    /// Walk backward from `e` to the `Move` that opens this subpath
    /// (`GetDest`). Returns `None` if no Move is found (malformed path).
    pub fn get_dest(&self, e: ElementId) -> Option<ElementId> {
        let mut cur = Some(e);
        let mut guard = self.elements.len() + 1;
        while let Some(id) = cur {
            if matches!(self.get(id).kind, EltKind::Move) {
                return Some(id);
            }
            cur = self.get(id).prev;
            guard -= 1;
            if guard == 0 {
                return None;
            }
        }
        None
    }

    /// Walk forward from `e` (a `Move`) to the `Close` that ends this
    /// subpath (`GetClosedBy`).
    pub fn get_closed_by(&self, e: ElementId) -> Option<ElementId> {
        let mut cur = Some(e);
        let mut guard = self.elements.len() + 1;
        while let Some(id) = cur {
            if matches!(self.get(id).kind, EltKind::Close) {
                return Some(id);
            }
            cur = self.get(id).next;
            guard -= 1;
            if guard == 0 {
                return None;
            }
        }
        None
    }

    /// The endpoint of `e` (§4.B `GetEndPoint`).
    pub fn end_point(&self, e: ElementId) -> Point {
        self.get(e).end_point()
    }

    /// Start and end point of `e`: the start is the previous element's
    /// endpoint (or, for the first element of a subpath, its own point for a
    /// Move), the end is `e`'s own endpoint.
    pub fn end_points(&self, e: ElementId) -> (Point, Point) {
        let end = self.end_point(e);
        let start = match self.get(e).prev {
            Some(p) => self.end_point(p),
            None => end,
        };
        (start, end)
    }

    /// `|Δx|<2 and |Δy|<2` (§4.B `IsTiny`).
    pub fn is_tiny(&self, e: ElementId) -> bool {
        let (s, en) = self.end_points(e);
        (en.x - s.x).abs().0 < 2 * 256 && (en.y - s.y).abs().0 < 2 * 256
    }

    /// Weighted Chebyshev length < 6 units (§4.B `IsShort`).
    pub fn is_short(&self, e: ElementId) -> bool {
        let (s, en) = self.end_points(e);
        let dx = (en.x - s.x).abs();
        let dy = (en.y - s.y).abs();
        dx.max(dy).0 < 6 * 256
    }

    /// Next element for bend detection: skips tiny elements, wraps from a
    /// `Close` to the following subpath's first real element, and detects
    /// an infinite loop (an all-tiny subpath) by remembering the first
    /// `Move` crossed; on a second crossing returns `None` and the caller
    /// should report a possible loop (§4.B).
    pub fn nxt_for_bend(&self, p: ElementId) -> Option<ElementId> {
        let mut cur = self.get(p).next.or(self.head);
        let mut first_move: Option<ElementId> = None;
        let mut guard = self.elements.len() + 1;
        loop {
            guard -= 1;
            if guard == 0 {
                return None;
            }
            let id = cur?;
            match self.get(id).kind {
                EltKind::Close => {
                    // wrap to the Move that opened this subpath, then step
                    // past it to stay within the same subpath's body.
                    let mv = self.get_dest(id)?;
                    cur = self.get(mv).next;
                    continue;
                }
                EltKind::Move => {
                    if Some(id) == first_move {
                        return None; // second visit: loop
                    }
                    if first_move.is_none() {
                        first_move = Some(id);
                    }
                    cur = self.get(id).next;
                    continue;
                }
                _ => {
                    if self.is_tiny(id) {
                        cur = self.get(id).next;
                        continue;
                    }
                    return Some(id);
                }
            }
        }
    }

    /// Previous element for bend detection, symmetric to [`Path::nxt_for_bend`].
    pub fn prv_for_bend(&self, p: ElementId) -> Option<ElementId> {
        let mut cur = self.get(p).prev;
        let mut guard = self.elements.len() + 1;
        loop {
            guard -= 1;
            if guard == 0 {
                return None;
            }
            let id = cur?;
            match self.get(id).kind {
                EltKind::Move => {
                    let closed_by = self.get_closed_by(id)?;
                    cur = self.get(closed_by).prev;
                    continue;
                }
                _ => {
                    if self.is_tiny(id) {
                        cur = self.get(id).prev;
                        continue;
                    }
                    return Some(id);
                }
            }
        }
    }

    /// Move the subpath containing `e` to the end of the outline (§4.K
    /// subpath shuffling support; `MoveSubpathToEnd`).
    pub fn move_subpath_to_end(&mut self, e: ElementId) {
        let mv = match self.get_dest(e) {
            Some(m) => m,
            None => return,
        };
        let close = match self.get_closed_by(mv) {
            Some(c) => c,
            None => return,
        };
        if Some(close) == self.tail {
            return; // already at the end
        }
        let before = self.get(mv).prev;
        let after = self.get(close).next;

        match before {
            Some(b) => self.get_mut(b).next = after,
            None => self.head = after,
        }
        match after {
            Some(a) => self.get_mut(a).prev = before,
            None => self.tail = before,
        }

        let old_tail = self.tail.expect("non-empty path has a tail");
        self.get_mut(old_tail).next = Some(mv);
        self.get_mut(mv).prev = Some(old_tail);
        self.get_mut(close).next = None;
        self.tail = Some(close);
    }

    /// Relocate one control point of `e` by `(dx, dy)` — `RMovePoint`. Used
    /// by the editor to nudge degenerate closepaths apart.
    pub fn rmove_point(&mut self, dx: Fixed, dy: Fixed, which_cp: ControlPoint, e: ElementId) {
        let elt = self.get_mut(e);
        match which_cp {
            ControlPoint::Start => {
                // The "start" is the previous element's endpoint, which this
                // element doesn't own; no caller should ever request it.
                unreachable!(
                    "rmove_point(Start) has no owning element to nudge; pass Curve1/2 on the previous element instead"
                );
            }
            ControlPoint::Curve1 => {
                elt.x1 += dx;
                elt.y1 += dy;
            }
            ControlPoint::Curve2 => {
                elt.x2 += dx;
                elt.y2 += dy;
            }
            ControlPoint::End => {
                elt.x += dx;
                elt.y += dy;
            }
        }
    }

    /// Count subpaths (Move...Close runs).
    pub fn count_subpaths(&self) -> usize {
        self.iter()
            .filter(|(_, e)| matches!(e.kind, EltKind::Move))
            .count()
    }

    /// Bounding box of the whole outline, by flattening every curve.
    pub fn bbox(&self) -> BBox {
        let mut bbox = BBox::empty();
        for (id, elt) in self.iter() {
            match elt.kind {
                EltKind::Move | EltKind::Line => bbox.add_point(elt.end_point()),
                EltKind::Curve => {
                    let (start, _) = self.end_points(id);
                    bbox.union(&crate::geometry::curve_bbox(
                        start,
                        Point::new(elt.x1, elt.y1),
                        Point::new(elt.x2, elt.y2),
                        Point::new(elt.x, elt.y),
                    ));
                }
                EltKind::Close => {}
            }
        }
        bbox
    }
}

/// Which control point of a [`PathElement`] an edit targets (`cpStart` …
/// `cpEnd` in the source).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlPoint {
    Start,
    Curve1,
    Curve2,
    End,
}

pub struct PathIter<'a> {
    path: &'a Path,
    cur: Option<ElementId>,
}

impl<'a> Iterator for PathIter<'a> {
    type Item = (ElementId, &'a PathElement);
    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        let elt = self.path.get(id);
        self.cur = elt.next;
        Some((id, elt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Path {
        let mut p = Path::new();
        p.append_move_or_line(EltKind::Move, Fixed::from_int(0), Fixed::from_int(0));
        p.append_move_or_line(EltKind::Line, Fixed::from_int(100), Fixed::from_int(0));
        p.append_move_or_line(EltKind::Line, Fixed::from_int(100), Fixed::from_int(100));
        p.append_move_or_line(EltKind::Line, Fixed::from_int(0), Fixed::from_int(100));
        p.append_close();
        p
    }

    #[test]
    fn get_dest_and_closed_by_roundtrip() {
        let p = square();
        let mv = p.head().unwrap();
        let close = p.get_closed_by(mv).unwrap();
        assert!(matches!(p.get(close).kind, EltKind::Close));
        assert_eq!(p.get_dest(close), Some(mv));
    }

    #[test]
    fn bbox_of_square() {
        let p = square();
        let bb = p.bbox();
        assert_eq!(bb.ll.x, Fixed::from_int(0));
        assert_eq!(bb.ur.x, Fixed::from_int(100));
    }

    #[test]
    fn is_tiny_detects_small_moves() {
        let mut p = Path::new();
        p.append_move_or_line(EltKind::Move, Fixed::from_int(0), Fixed::from_int(0));
        let tiny = p.append_move_or_line(EltKind::Line, Fixed::from_int(1), Fixed::from_int(0));
        assert!(p.is_tiny(tiny));
    }
}
