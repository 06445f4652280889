// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Candidate edge segment generation (§4.D)
//!
//! Walks the glyph path and produces the four ordered segment lists
//! (left/right for vertical stems, top/bot for horizontal stems) that the
//! pair evaluator (§4.E) will later combine into candidate stems. Also adds
//! synthetic `Bend` segments at sharp corners and `Ghost` segments inside
//! alignment zones, mirroring `gen.c`'s `GenVPts`/`GenHPts`.

use crate::conv::{to_u32, to_usize};
use crate::fixed::Fixed;
use crate::fontinfo::FontInfo;
use crate::geometry;
use crate::path::{EltKind, ElementId, Path};

/// Index of a [`HintSeg`] within a [`SegmentStore`]'s arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegId(pub u32);

impl SegId {
    pub fn get(self) -> usize {
        to_usize(self.0)
    }
}

/// Which of the four segment lists a [`HintSeg`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Left,
    Right,
    Top,
    Bot,
}

/// `HintSeg.sType` (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegKind {
    Line,
    Bend,
    Curve,
    Ghost,
}

/// How a segment's `loc` was derived from its originating element's
/// geometry — recorded at generation time so the multiple-master hint
/// transfer (§4.J) can look up the equivalent value in another master
/// without re-deriving provenance from scratch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointType {
    /// The element's start (previous element's endpoint).
    Start,
    /// The element's own endpoint.
    End,
    /// Midpoint of start and end (a plain Line edge).
    Average,
    /// A curve's bbox extremum; `use_max` picks `bbox.ur` vs `bbox.ll`.
    CurveBBox { use_max: bool },
    /// The flattened-curve inflection point.
    Flatten,
    /// No real element — a synthetic ghost offset (§4.D).
    Ghost,
}

/// A candidate horizontal or vertical edge segment (§3 `HintSeg`).
#[derive(Clone, Debug)]
pub struct HintSeg {
    pub kind: SegKind,
    pub axis: Axis,
    /// Cross-axis coordinate (x for vertical segments, y for horizontal).
    pub loc: Fixed,
    pub min: Fixed,
    pub max: Fixed,
    /// Priority bonus for start/end-of-line subpath segments; 0 otherwise.
    pub bonus: Fixed,
    /// Path element this segment originated from; `None` for ghosts.
    pub elt: Option<ElementId>,
    /// Best `HintVal` referencing this segment so far (set by the picker).
    pub best_val: Option<crate::eval::ValId>,
    /// How `loc` relates to `elt`'s geometry (§4.J).
    pub point_type: PointType,
}

impl HintSeg {
    pub fn len(&self) -> Fixed {
        self.max - self.min
    }
}

/// Bend-segment half-length (≈1 unit, §4.D).
const BEND_HALF_LENGTH: i32 = 256 / 2;
/// Minimum bbox overshoot (units) past the chord before a curve gets a
/// mid-curve segment (§4.D).
const MID_CURVE_EXTREMUM_THRESHOLD: i32 = 2 * 256;
/// Ghost segment offset from its anchoring band edge (§4.D).
const GHOST_OFFSET: i32 = 20 * 256;
/// Synthetic weight/priority recorded for a ghost stem (§4.D).
pub const GHOST_VALUE: i32 = 20;
pub const GHOST_SPECIAL: i32 = 2;

/// The four ordered segment lists plus their backing arena.
#[derive(Clone, Debug, Default)]
pub struct SegmentStore {
    segs: Vec<HintSeg>,
    pub left: Vec<SegId>,
    pub right: Vec<SegId>,
    pub top: Vec<SegId>,
    pub bot: Vec<SegId>,
}

impl SegmentStore {
    pub fn new() -> SegmentStore {
        SegmentStore::default()
    }

    pub fn get(&self, id: SegId) -> &HintSeg {
        &self.segs[id.get()]
    }
    pub fn get_mut(&mut self, id: SegId) -> &mut HintSeg {
        &mut self.segs[id.get()]
    }

    pub fn list(&self, axis: Axis) -> &[SegId] {
        match axis {
            Axis::Left => &self.left,
            Axis::Right => &self.right,
            Axis::Top => &self.top,
            Axis::Bot => &self.bot,
        }
    }

    fn list_mut(&mut self, axis: Axis) -> &mut Vec<SegId> {
        match axis {
            Axis::Left => &mut self.left,
            Axis::Right => &mut self.right,
            Axis::Top => &mut self.top,
            Axis::Bot => &mut self.bot,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn add_segment(
        &mut self,
        axis: Axis,
        kind: SegKind,
        loc: Fixed,
        a: Fixed,
        b: Fixed,
        elt: Option<ElementId>,
        bonus: Fixed,
        point_type: PointType,
    ) -> SegId {
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        let seg = HintSeg {
            kind,
            axis,
            loc,
            min,
            max,
            bonus,
            elt,
            best_val: None,
            point_type,
        };
        let id = SegId(to_u32(self.segs.len()));
        self.segs.push(seg);
        self.list_mut(axis).push(id);
        id
    }

    /// Sort a list ascending by `loc`, then compact: two segments at
    /// (near-)identical `loc` whose extents overlap are merged, the wider
    /// one winning (§4.D).
    fn sort_and_compact(&mut self, axis: Axis) {
        {
            let list = self.list_mut(axis);
            list.sort_by(|&a, &b| {
                self.loc_of(a).cmp(&self.loc_of(b))
            });
        }
        let ids: Vec<SegId> = self.list(axis).to_vec();
        let mut kept: Vec<SegId> = Vec::with_capacity(ids.len());
        for id in ids {
            let mut merged = false;
            if let Some(&last) = kept.last() {
                let (lloc, lmin, lmax) = {
                    let s = self.get(last);
                    (s.loc, s.min, s.max)
                };
                let (loc, min, max) = {
                    let s = self.get(id);
                    (s.loc, s.min, s.max)
                };
                if (loc - lloc).abs().0 == 0 && min <= lmax && max >= lmin {
                    // overlap at identical loc: keep whichever is wider
                    if (max - min) > (lmax - lmin) {
                        kept.pop();
                        kept.push(id);
                    }
                    merged = true;
                }
            }
            if !merged {
                kept.push(id);
            }
        }
        *self.list_mut(axis) = kept;
    }

    fn loc_of(&self, id: SegId) -> Fixed {
        self.get(id).loc
    }

    /// `RemExtraBends`: delete a `Bend` whose extent is ≤⅓ of an overlapping
    /// non-Bend segment at the same `loc` (the non-Bend is the real edge).
    fn rem_extra_bends(&mut self, axis: Axis) {
        let ids: Vec<SegId> = self.list(axis).to_vec();
        let mut keep = Vec::with_capacity(ids.len());
        for &id in &ids {
            let seg = self.get(id);
            if seg.kind != SegKind::Bend {
                keep.push(id);
                continue;
            }
            let (loc, len) = (seg.loc, seg.len());
            let dominated = ids.iter().any(|&other| {
                if other == id {
                    return false;
                }
                let o = self.get(other);
                o.kind != SegKind::Bend
                    && o.loc == loc
                    && o.min <= seg.max
                    && o.max >= seg.min
                    && len.0 * 3 <= o.len().0
            });
            if !dominated {
                keep.push(id);
            }
        }
        *self.list_mut(axis) = keep;
    }

    fn finalize_axis(&mut self, axis: Axis) {
        self.sort_and_compact(axis);
        self.rem_extra_bends(axis);
    }
}

/// Generate vertical (left/right) edge segments from the path (`GenVPts`).
pub fn gen_vpts(path: &mut Path, store: &mut SegmentStore) {
    gen_axis(path, store, true);
    store.finalize_axis(Axis::Left);
    store.finalize_axis(Axis::Right);
    link_elements(path, store, true);
}

/// Generate horizontal (top/bot) edge segments, then augment with ghost
/// segments from the font's alignment zones (`GenHPts`).
pub fn gen_hpts(path: &mut Path, store: &mut SegmentStore, font: &FontInfo) {
    gen_axis(path, store, false);
    store.finalize_axis(Axis::Top);
    store.finalize_axis(Axis::Bot);
    add_ghost_segments(store, font);
    link_elements(path, store, false);
}

/// Populate each [`crate::path::PathElement::hs`]/`vs` with the ids of the
/// segments that originated there (§3), so later passes (§4.H, §4.I) can
/// look up a path location's candidate segments without scanning the arena.
fn link_elements(path: &mut Path, store: &SegmentStore, vertical: bool) {
    let axes: &[Axis] = if vertical {
        &[Axis::Left, Axis::Right]
    } else {
        &[Axis::Top, Axis::Bot]
    };
    for &axis in axes {
        for &id in store.list(axis) {
            if let Some(elt) = store.get(id).elt {
                if vertical {
                    path.get_mut(elt).vs.push(id);
                } else {
                    path.get_mut(elt).hs.push(id);
                }
            }
        }
    }
}

fn gen_axis(path: &mut Path, store: &mut SegmentStore, vertical: bool) {
    let ids: Vec<ElementId> = path.iter().map(|(id, _)| id).collect();
    for id in ids {
        let (start, end) = path.end_points(id);
        let kind = path.get(id).kind;
        match kind {
            EltKind::Move | EltKind::Close => continue,
            EltKind::Line => {
                let quo = if vertical {
                    geometry::vert_quo(start.x, start.y, end.x, end.y)
                } else {
                    geometry::horz_quo(start.x, start.y, end.x, end.y)
                };
                if quo.0 <= 0 {
                    continue;
                }
                if vertical {
                    let mid_x = Fixed((start.x.0 + end.x.0) / 2);
                    let yavg = Fixed((start.y.0 + end.y.0) / 2);
                    let ydist = ((end.y - start.y).mul(quo)).abs();
                    let half = Fixed(ydist.0 / 2);
                    let axis = classify_vertical_side(start, end);
                    store.add_segment(
                        axis,
                        SegKind::Line,
                        mid_x,
                        yavg - half,
                        yavg + half,
                        Some(id),
                        Fixed::ZERO,
                        PointType::Average,
                    );
                } else {
                    let mid_y = Fixed((start.y.0 + end.y.0) / 2);
                    let xavg = Fixed((start.x.0 + end.x.0) / 2);
                    let xdist = ((end.x - start.x).mul(quo)).abs();
                    let half = Fixed(xdist.0 / 2);
                    let axis = classify_horizontal_side(start, end);
                    store.add_segment(
                        axis,
                        SegKind::Line,
                        mid_y,
                        xavg - half,
                        xavg + half,
                        Some(id),
                        Fixed::ZERO,
                        PointType::Average,
                    );
                }
            }
            EltKind::Curve => {
                let elt = path.get(id);
                let c1 = crate::fixed::Point::new(elt.x1, elt.y1);
                let c2 = crate::fixed::Point::new(elt.x2, elt.y2);
                gen_curve_segments(store, start, c1, c2, end, id, vertical);
            }
        }
    }
    gen_bend_segments(path, store, vertical);
}

fn classify_vertical_side(start: crate::fixed::Point, end: crate::fixed::Point) -> Axis {
    // Outline winding convention: a vertical edge traversed with y
    // increasing is a left (outer-facing, "right" list in sLoc terms is
    // the higher-x member of a pair) edge; descending y is a right edge.
    if end.y >= start.y { Axis::Left } else { Axis::Right }
}

fn classify_horizontal_side(start: crate::fixed::Point, end: crate::fixed::Point) -> Axis {
    // y grows downward in the bez coordinate convention used by §4.E; a
    // horizontal edge traversed with x decreasing is a top edge, increasing
    // x is a bottom edge.
    if end.x <= start.x { Axis::Top } else { Axis::Bot }
}

#[allow(clippy::too_many_arguments)]
fn gen_curve_segments(
    store: &mut SegmentStore,
    p0: crate::fixed::Point,
    p1: crate::fixed::Point,
    p2: crate::fixed::Point,
    p3: crate::fixed::Point,
    elt: ElementId,
    vertical: bool,
) {
    let quo_start = if vertical {
        geometry::vert_quo(p0.x, p0.y, p1.x, p1.y)
    } else {
        geometry::horz_quo(p0.x, p0.y, p1.x, p1.y)
    };
    let quo_end = if vertical {
        geometry::vert_quo(p2.x, p2.y, p3.x, p3.y)
    } else {
        geometry::horz_quo(p2.x, p2.y, p3.x, p3.y)
    };
    let quo_chord = if vertical {
        geometry::vert_quo(p0.x, p0.y, p3.x, p3.y)
    } else {
        geometry::horz_quo(p0.x, p0.y, p3.x, p3.y)
    };

    if quo_start.0 > 0 {
        emit_curve_endpoint_segment(store, p0, p1, elt, vertical, true);
    }
    if quo_end.0 > 0 {
        emit_curve_endpoint_segment(store, p2, p3, elt, vertical, false);
    }

    if quo_chord.0 > 0 {
        let bbox = geometry::curve_bbox(p0, p1, p2, p3);
        let overshoot = if vertical {
            let chord_min = p0.x.min(p3.x);
            let chord_max = p0.x.max(p3.x);
            (bbox.ll.x - chord_min).abs().max((bbox.ur.x - chord_max).abs())
        } else {
            let chord_min = p0.y.min(p3.y);
            let chord_max = p0.y.max(p3.y);
            (bbox.ll.y - chord_min).abs().max((bbox.ur.y - chord_max).abs())
        };
        if overshoot.0 > MID_CURVE_EXTREMUM_THRESHOLD {
            let loc = if vertical {
                if p0.x <= p3.x { bbox.ur.x } else { bbox.ll.x }
            } else if p0.y <= p3.y {
                bbox.ur.y
            } else {
                bbox.ll.y
            };
            let (min, max) = if vertical {
                (bbox.ll.y, bbox.ur.y)
            } else {
                (bbox.ll.x, bbox.ur.x)
            };
            let axis = if vertical {
                classify_vertical_side(p0, p3)
            } else {
                classify_horizontal_side(p0, p3)
            };
            let use_max = if vertical { p0.x <= p3.x } else { p0.y <= p3.y };
            store.add_segment(axis, SegKind::Curve, loc, min, max, Some(elt), Fixed::ZERO, PointType::CurveBBox { use_max });
        }
    }
}

fn emit_curve_endpoint_segment(
    store: &mut SegmentStore,
    anchor: crate::fixed::Point,
    control: crate::fixed::Point,
    elt: ElementId,
    vertical: bool,
    at_start: bool,
) {
    let point_type = if at_start { PointType::Start } else { PointType::End };
    if vertical {
        let loc = Fixed((anchor.x.0 + control.x.0) / 2);
        let (min, max) = (anchor.y.min(control.y), anchor.y.max(control.y));
        let axis = classify_vertical_side(anchor, control);
        store.add_segment(axis, SegKind::Curve, loc, min, max, Some(elt), Fixed::ZERO, point_type);
    } else {
        let loc = Fixed((anchor.y.0 + control.y.0) / 2);
        let (min, max) = (anchor.x.min(control.x), anchor.x.max(control.x));
        let axis = classify_horizontal_side(anchor, control);
        store.add_segment(axis, SegKind::Curve, loc, min, max, Some(elt), Fixed::ZERO, point_type);
    }
}

/// Emit `Bend` segments where a curve bends sharply into a non-parallel
/// neighbor, using the same junction classification as the editor's sharp
/// corner detection (§4.A/§4.D).
fn gen_bend_segments(path: &Path, store: &mut SegmentStore, vertical: bool) {
    let ids: Vec<ElementId> = path.iter().map(|(id, _)| id).collect();
    for &id in &ids {
        if !matches!(path.get(id).kind, EltKind::Curve | EltKind::Line) {
            continue;
        }
        let next = match path.nxt_for_bend(id) {
            Some(n) => n,
            None => continue,
        };
        let (_, mid) = path.end_points(id);
        let (_, after) = path.end_points(next);
        let (before_start, _) = path.end_points(id);
        let (smooth, _) = geometry::check_smoothness(before_start.x, before_start.y, mid.x, mid.y, after.x, after.y);
        if smooth != geometry::Smoothness::Sharp {
            continue;
        }
        let half = Fixed(BEND_HALF_LENGTH);
        let convex = (after.x - before_start.x).mul(mid.y - before_start.y)
            - (after.y - before_start.y).mul(mid.x - before_start.x);
        let sign = if convex.0 >= 0 { 1 } else { -1 };
        if vertical {
            let axis = if sign > 0 { Axis::Left } else { Axis::Right };
            store.add_segment(
                axis,
                SegKind::Bend,
                mid.x,
                mid.y - half,
                mid.y + half,
                Some(id),
                Fixed::ZERO,
                PointType::End,
            );
        } else {
            let axis = if sign > 0 { Axis::Top } else { Axis::Bot };
            store.add_segment(
                axis,
                SegKind::Bend,
                mid.y,
                mid.x - half,
                mid.x + half,
                Some(id),
                Fixed::ZERO,
                PointType::End,
            );
        }
    }
}

/// After both passes, create a `Ghost` segment 20 units above every bottom
/// segment inside a bottom band (and symmetrically below every top segment
/// inside a top band), anchoring hints when a feature has only one real edge
/// (§4.D).
fn add_ghost_segments(store: &mut SegmentStore, font: &FontInfo) {
    let offset = Fixed(GHOST_OFFSET);
    let bot_ids: Vec<SegId> = store.bot.clone();
    for id in bot_ids {
        let (loc, min, max) = {
            let s = store.get(id);
            (s.loc, s.min, s.max)
        };
        if font.in_blue_band(loc) {
            store.add_segment(Axis::Top, SegKind::Ghost, loc + offset, min, max, None, Fixed::ZERO, PointType::Ghost);
        }
    }
    let top_ids: Vec<SegId> = store.top.clone();
    for id in top_ids {
        let (loc, min, max) = {
            let s = store.get(id);
            (s.loc, s.min, s.max)
        };
        if font.in_blue_band(loc) {
            store.add_segment(Axis::Bot, SegKind::Ghost, loc - offset, min, max, None, Fixed::ZERO, PointType::Ghost);
        }
    }
    store.finalize_axis(Axis::Top);
    store.finalize_axis(Axis::Bot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::EltKind;

    #[test]
    fn vertical_line_produces_left_segment() {
        let mut path = Path::new();
        path.append_move_or_line(EltKind::Move, Fixed::from_int(0), Fixed::from_int(0));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(0), Fixed::from_int(100));
        let mut store = SegmentStore::new();
        gen_vpts(&mut path, &mut store);
        assert!(!store.left.is_empty() || !store.right.is_empty());
    }

    #[test]
    fn ghost_segment_added_inside_band() {
        let mut path = Path::new();
        path.append_move_or_line(EltKind::Move, Fixed::from_int(0), Fixed::from_int(0));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(100), Fixed::from_int(0));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(100), Fixed::from_int(100));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(0), Fixed::from_int(100));
        path.append_close();
        let mut store = SegmentStore::new();
        gen_vpts(&mut path, &mut store);
        let mut font = FontInfo::new();
        font.bot_bands
            .push(crate::fontinfo::Band::new(Fixed::from_int(0), Fixed::from_int(-10)));
        gen_hpts(&mut path, &mut store, &font);
        assert!(store.top.iter().any(|&id| store.get(id).kind == SegKind::Ghost));
    }
}
