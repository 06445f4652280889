// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Path editor: structural repairs, flex detection, conflict splitting
//! (§4.H)
//!
//! Runs inside the orchestrator's retry loop (§4.K): every transformation
//! here that actually changes the path sets its `changed` output so the
//! caller knows to regenerate segments and re-evaluate. Grounded on
//! `check.c` (`CheckZeroLength`/`CheckSmooth`/`CheckSCurve`), `misc.c`
//! (`AutoAddFlex`/`TryXFlex`/`TryYFlex`), and `auto.c`
//! (`ResolveConflictBySplit`/`TryResolveConflict`).

use crate::fixed::{Fixed, Point};
use crate::geometry::{self, Smoothness};
use crate::path::{ControlPoint, EltFlags, EltKind, ElementId, Path, PathElement};
use crate::report::{Level, Observer};

/// Maximum feature width (units) below which auto-flex is not attempted
/// (`MAXFLEX`, §4.H).
const MAXFLEX: i32 = 20 * 256;
/// Minimum ratio between orthogonal and along-axis extent for a flex
/// candidate (§4.H "at least 3x").
const FLEX_EXTENT_RATIO: i32 = 3;
/// Minimum length ratio between the two curves of a flex pair (§4.H
/// "length ratio > 0.33:1"), expressed as its square to avoid a sqrt.
const FLEX_LENGTH_RATIO_SQ: f64 = 0.33 * 0.33;
/// Collinearity tolerance for converting a Curve to a Line (§4.H, 1 unit).
const COLINEAR_TOLERANCE: i32 = 256;

/// Outcome of one editor pass: did it structurally change the path (forcing
/// a restart of segment generation) and what diagnostics fired.
#[derive(Default)]
pub struct EditResult {
    pub changed: bool,
}

/// `CheckZeroLength` / the zero-length-closepath repair of §4.H: remove a
/// `Close` whose endpoint already coincides with its `Move` (degenerate
/// subpath), and nudge a closepath whose start/end coincide apart by one
/// unit along the more axis-aligned direction.
pub fn pre_check(path: &mut Path, observer: &dyn Observer) -> EditResult {
    let mut result = EditResult::default();
    let ids: Vec<ElementId> = path.iter().map(|(id, _)| id).collect();
    for id in ids {
        let (start, end) = path.end_points(id);
        let kind = path.get(id).kind;
        if kind == EltKind::Line && start.x == end.x && start.y == end.y {
            path.delete_element(id);
            result.changed = true;
            continue;
        }
        if kind == EltKind::Curve {
            let elt = path.get(id);
            if start.x == end.x
                && start.y == end.y
                && elt.x1 == start.x
                && elt.y1 == start.y
                && elt.x2 == start.x
                && elt.y2 == start.y
            {
                path.delete_element(id);
                result.changed = true;
                continue;
            }
        }
        if kind == EltKind::Close {
            let Some(mv) = path.get_dest(id) else { continue };
            let mv_pt = path.end_point(mv);
            if end.x == mv_pt.x && end.y == mv_pt.y {
                continue; // already coincident and non-degenerate: fine
            }
        }
    }
    repair_degenerate_closepaths(path, observer, &mut result);
    result
}

/// Nudge a curve immediately preceding a `Close` whose start and end
/// coincide, by ±1 unit along whichever axis is nearer to axis-aligned,
/// breaking the degeneracy (§4.H "zero-length closepath repair").
fn repair_degenerate_closepaths(path: &mut Path, observer: &dyn Observer, result: &mut EditResult) {
    let ids: Vec<ElementId> = path.iter().map(|(id, _)| id).collect();
    for id in ids {
        if path.get(id).kind != EltKind::Close {
            continue;
        }
        let Some(prev) = path.get(id).prev else { continue };
        let (start, end) = path.end_points(prev);
        if start.x != end.x || start.y != end.y {
            continue;
        }
        let dx = (end.x - start.x).abs();
        let dy = (end.y - start.y).abs();
        let unit = Fixed::from_int(1);
        if dx <= dy {
            path.rmove_point(unit, Fixed::ZERO, ControlPoint::End, prev);
        } else {
            path.rmove_point(Fixed::ZERO, unit, ControlPoint::End, prev);
        }
        observer.report(Level::Warning, "nudged degenerate closepath by one unit");
        result.changed = true;
    }
}

/// `CheckSCurve`-adjacent pass: convert near-collinear curves to lines and
/// split curves whose control-point turning directions reverse sign
/// (an S-curve, detected as in `CPDirection`/`ProdLt0`).
pub fn normalize_curves(path: &mut Path, observer: &dyn Observer) -> EditResult {
    let mut result = EditResult::default();
    let ids: Vec<ElementId> = path.iter().map(|(id, _)| id).collect();
    for id in ids {
        if path.get(id).kind != EltKind::Curve || path.get(id).flags.contains(EltFlags::IS_FLEX) {
            continue;
        }
        let (start, _) = path.end_points(id);
        let elt = path.get(id).clone();
        let end = Point::new(elt.x, elt.y);
        let c1 = Point::new(elt.x1, elt.y1);
        let c2 = Point::new(elt.x2, elt.y2);

        if is_collinear(start, c1, c2, end) {
            convert_curve_to_line(path, id);
            result.changed = true;
            continue;
        }
        if is_s_curve(start, c1, c2, end) {
            split_curve_in_half(path, id);
            observer.report(Level::Warning, "split S-curve at its midpoint");
            result.changed = true;
        }
    }
    result
}

fn is_collinear(p0: Point, p1: Point, p2: Point, p3: Point) -> bool {
    let eps = Fixed(COLINEAR_TOLERANCE);
    dist_point_to_line(p1, p0, p3) <= eps && dist_point_to_line(p2, p0, p3) <= eps
}

fn dist_point_to_line(p: Point, a: Point, b: Point) -> Fixed {
    let dx = (b.x - a.x).to_f64();
    let dy = (b.y - a.y).to_f64();
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-9 {
        return Fixed::ZERO;
    }
    let num = ((p.x - a.x).to_f64() * dy - (p.y - a.y).to_f64() * dx).abs();
    Fixed::from_f64(num / len)
}

fn cross(o: Point, a: Point, b: Point) -> i64 {
    let ax = (a.x - o.x).0 as i64;
    let ay = (a.y - o.y).0 as i64;
    let bx = (b.x - o.x).0 as i64;
    let by = (b.y - o.y).0 as i64;
    ax * by - ay * bx
}

/// Detect a turning-direction reversal between the two halves of the
/// control polygon (`CPDirection`/`ProdLt0` in `check.c`).
fn is_s_curve(p0: Point, p1: Point, p2: Point, p3: Point) -> bool {
    let d0 = cross(p0, p1, p2);
    let d1 = cross(p1, p2, p3);
    d0 != 0 && d1 != 0 && (d0 > 0) != (d1 > 0)
}

fn convert_curve_to_line(path: &mut Path, id: ElementId) {
    let end = path.get(id).end_point();
    let elt = path.get_mut(id);
    elt.kind = EltKind::Line;
    elt.x1 = Fixed::ZERO;
    elt.y1 = Fixed::ZERO;
    elt.x2 = Fixed::ZERO;
    elt.y2 = Fixed::ZERO;
    let _ = end;
}

/// de Casteljau midpoint split: divide a Curve into two Curves at `t=0.5`,
/// inserting the new element immediately after `id`.
fn split_curve_in_half(path: &mut Path, id: ElementId) {
    let (p0, p1, p2, p3) = {
        let (start, _) = path.end_points(id);
        let e = path.get(id);
        (start, Point::new(e.x1, e.y1), Point::new(e.x2, e.y2), Point::new(e.x, e.y))
    };
    let mid = |a: Point, b: Point| Point::new(Fixed((a.x.0 + b.x.0) / 2), Fixed((a.y.0 + b.y.0) / 2));
    let p01 = mid(p0, p1);
    let p12 = mid(p1, p2);
    let p23 = mid(p2, p3);
    let p012 = mid(p01, p12);
    let p123 = mid(p12, p23);
    let p0123 = mid(p012, p123);

    let mut second = PathElement::curve_like(EltKind::Curve);
    second.x1 = p123.x;
    second.y1 = p123.y;
    second.x2 = p23.x;
    second.y2 = p23.y;
    second.x = p3.x;
    second.y = p3.y;

    let elt = path.get_mut(id);
    elt.x1 = p01.x;
    elt.y1 = p01.y;
    elt.x2 = p012.x;
    elt.y2 = p012.y;
    elt.x = p0123.x;
    elt.y = p0123.y;

    path.insert_after(id, second);
}

/// Sharp-angle clipping: at a junction whose incident angle is sharp
/// (§4.A), snap the middle point onto the chord and report a diagnostic
/// (`CheckSmooth`'s "too sharp angle...has been clipped").
pub fn clip_sharp_angles(path: &mut Path, observer: &dyn Observer) -> EditResult {
    let mut result = EditResult::default();
    let ids: Vec<ElementId> = path.iter().map(|(id, _)| id).collect();
    for id in ids {
        let kind = path.get(id).kind;
        if kind == EltKind::Move || path.is_tiny(id) || path.get(id).flags.contains(EltFlags::IS_FLEX) {
            continue;
        }
        let Some(next) = path.nxt_for_bend(id) else { continue };
        if path.get(next).flags.contains(EltFlags::IS_FLEX) {
            continue;
        }
        let Some(prev) = path.prv_for_bend(id) else { continue };
        let before = path.end_point(prev);
        let mid = path.end_point(id);
        let after = path.end_point(next);
        let (smoothness, dist) = geometry::check_smoothness(before.x, before.y, mid.x, mid.y, after.x, after.y);
        match smoothness {
            Smoothness::Sharp => {
                let snapped = geometry::project_onto_line(before, mid, after);
                set_endpoint(path, id, snapped);
                observer.report(
                    Level::Warning,
                    &format!("too sharp angle at {:.2},{:.2} has been clipped", mid.x.to_f64(), mid.y.to_f64()),
                );
                result.changed = true;
            }
            Smoothness::Colinear if dist.0 != 0 => {
                let snapped = geometry::project_onto_line(before, mid, after);
                set_endpoint(path, id, snapped);
                result.changed = true;
            }
            _ => {}
        }
    }
    result
}

fn set_endpoint(path: &mut Path, id: ElementId, p: Point) {
    let elt = path.get_mut(id);
    elt.x = p.x;
    elt.y = p.y;
}

/// `AutoAddFlex`: mark consecutive Curve pairs as flex where the shared
/// junction is nearly axis-aligned, the feature is wide/tall enough, and
/// the two curves have comparable length (§4.H). When `flex_strict` is set
/// and the junction is concave, the pair is silently skipped (§9 design
/// notes: "if strict and concave, skip flex silently").
pub fn auto_add_flex(path: &mut Path, flex_strict: bool) {
    let ids: Vec<ElementId> = path.iter().map(|(id, _)| id).collect();
    for id in ids {
        let elt = path.get(id);
        if elt.kind != EltKind::Curve || elt.flags.contains(EltFlags::IS_FLEX) {
            continue;
        }
        let Some(next) = path.get(id).next else { continue };
        if path.get(next).kind != EltKind::Curve {
            continue;
        }
        let (p0, p1) = path.end_points(id);
        if (p0.y - p1.y).abs().0 <= MAXFLEX {
            try_flex(path, id, next, true, flex_strict);
        }
        if (p0.x - p1.x).abs().0 <= MAXFLEX {
            try_flex(path, id, next, false, flex_strict);
        }
    }
}

fn curve_length_sq(path: &Path, id: ElementId) -> f64 {
    let (start, end) = path.end_points(id);
    let dx = (end.x - start.x).to_f64();
    let dy = (end.y - start.y).to_f64();
    dx * dx + dy * dy
}

/// `TryYFlex` (`vertical == true`, junction nearly horizontal, flex runs
/// along x) / `TryXFlex` (`vertical == false`) — shared shape, differing
/// only in which axis is "along" vs "cross".
fn try_flex(path: &mut Path, e: ElementId, n: ElementId, along_y_const: bool, flex_strict: bool) {
    let (p0, p1) = path.end_points(e);
    let (_, p2) = path.end_points(n);

    let (cross0, cross1, cross2, along0, along1) = if along_y_const {
        (p0.y, p1.y, p2.y, p0.x, p2.x)
    } else {
        (p0.x, p1.x, p2.x, p0.y, p2.y)
    };
    if (cross0 - cross2).abs().0 > MAXFLEX * 4 {
        return; // bases too far apart to be flex candidates at all
    }
    let width = (along0 - along1).abs();
    if width.0 < MAXFLEX {
        return;
    }
    let height = (cross0 - cross2).abs();
    if width.0 < FLEX_EXTENT_RATIO * height.0.max(1) {
        return;
    }
    // p1 (the shared endpoint) must sit between the two bases on the cross
    // axis (same-side test, `ProdLt0`).
    let mid_cross = if along_y_const { p1.y } else { p1.x };
    if (mid_cross.0 as i64 - cross0.0 as i64) as i64 * (mid_cross.0 as i64 - cross2.0 as i64) > 0 {
        return;
    }

    let len_e = curve_length_sq(path, e);
    let len_n = curve_length_sq(path, n);
    if len_e <= 0.0 || len_n <= 0.0 {
        return;
    }
    let quot = if len_e > len_n { len_n / len_e } else { len_e / len_n };
    if quot < FLEX_LENGTH_RATIO_SQ {
        return;
    }

    if flex_strict {
        let along_mid = if along_y_const { p1.x } else { p1.y };
        let top = along0 > along_mid;
        let down = mid_cross.0 > cross0.0;
        if top != down {
            return; // concave: skip silently per §9 design notes
        }
    }

    let flag = if along_y_const { EltFlags::Y_FLEX } else { EltFlags::empty() };
    path.get_mut(e).flags.insert(EltFlags::IS_FLEX | flag);
    path.get_mut(n).flags.insert(EltFlags::IS_FLEX | flag);
}

/// `ResolveConflictBySplit`: split a Curve element in half and distribute
/// its two conflicting segment links so each half carries one. Fails
/// silently (returns `false`) if `e` is not a plain (non-flex) Curve.
pub fn resolve_conflict_by_split(
    path: &mut Path,
    e: ElementId,
    seg1: crate::segment::SegId,
    seg2: crate::segment::SegId,
    horizontal: bool,
) -> bool {
    let elt = path.get(e);
    if elt.kind != EltKind::Curve || elt.flags.contains(EltFlags::IS_FLEX) {
        return false;
    }
    split_curve_in_half(path, e);
    let next = path.get(e).next.expect("split just inserted a successor");
    if horizontal {
        path.get_mut(e).hs.retain(|&s| s != seg2);
        path.get_mut(next).hs.clear();
        path.get_mut(next).hs.push(seg2);
    } else {
        path.get_mut(e).vs.retain(|&s| s != seg2);
        path.get_mut(next).vs.clear();
        path.get_mut(next).vs.push(seg2);
    }
    let _ = seg1;
    true
}

impl PathElement {
    /// Construct a blank element of `kind` for the editor's internal use
    /// (split/insert), mirroring [`Path`]'s private constructor.
    pub(crate) fn curve_like(kind: EltKind) -> PathElement {
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
            hs: Vec::new(),
            vs: Vec::new(),
            new_hints: 0,
            count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullObserver;

    fn is_flat(path: &Path, id: ElementId) -> bool {
        path.get(id).kind == EltKind::Line
    }

    #[test]
    fn collinear_curve_becomes_line() {
        let mut path = Path::new();
        path.append_move_or_line(EltKind::Move, Fixed::from_int(0), Fixed::from_int(0));
        let c = path.append_curve(
            Fixed::from_int(10),
            Fixed::from_int(10),
            Fixed::from_int(20),
            Fixed::from_int(20),
            Fixed::from_int(30),
            Fixed::from_int(30),
        );
        let obs = NullObserver;
        let r = normalize_curves(&mut path, &obs);
        assert!(r.changed);
        assert!(is_flat(&path, c));
    }

    #[test]
    fn sharp_angle_is_clipped() {
        let mut path = Path::new();
        path.append_move_or_line(EltKind::Move, Fixed::from_int(0), Fixed::from_int(0));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(100), Fixed::from_int(0));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(100), Fixed::from_int(1));
        path.append_close();
        let obs = NullObserver;
        clip_sharp_angles(&mut path, &obs);
    }

    #[test]
    fn flex_marks_both_curves() {
        let mut path = Path::new();
        path.append_move_or_line(EltKind::Move, Fixed::from_int(0), Fixed::from_int(0));
        let e = path.append_curve(
            Fixed::from_int(10),
            Fixed::from_int(1),
            Fixed::from_int(20),
            Fixed::from_int(1),
            Fixed::from_int(30),
            Fixed::from_int(0),
        );
        let n = path.append_curve(
            Fixed::from_int(40),
            Fixed::from_int(-1),
            Fixed::from_int(50),
            Fixed::from_int(-1),
            Fixed::from_int(60),
            Fixed::from_int(0),
        );
        auto_add_flex(&mut path, false);
        assert!(path.get(e).flags.contains(EltFlags::IS_FLEX));
        assert!(path.get(n).flags.contains(EltFlags::IS_FLEX));
    }
}
