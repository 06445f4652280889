// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Multiple-master hint transfer (§4.J)
//!
//! One master is fully hinted by the normal pipeline; every other master
//! shares its path topology but has different coordinates. Rather than
//! re-running the picker on each master (which could choose a different
//! topology of hints and break interpolation), the hint *topology* found on
//! the source master is replayed onto the others: for each emitted
//! [`HintPoint`], record which path element and which kind of point (start,
//! end, average, curve-bbox peak, or flattened inflection) produced its
//! value, then look up the analogous point on the other master. Grounded on
//! `charpath.c`'s `GetPointType`/`InsertHint`/`ReconcilePaths` family.

use crate::error::HintingError;
use crate::fixed::Fixed;
use crate::geometry::for_each_flattened_point;
use crate::hint::{HintCode, HintPoint};
use crate::path::{ElementId, EltKind, Path};

/// One unit of tolerance used throughout this module when matching a hint
/// value back to a candidate endpoint (`nearlyequal_`'s `FixOne`).
const TOLERANCE: Fixed = Fixed(256);

/// Which point on a path element a transferred [`HintPoint`] coordinate came
/// from (`GetPointType`'s `STARTPT`/`ENDPT`/`AVERAGE`/`CURVEBBOX`/`FLATTEN`,
/// plus a `Ghost` case that has no source-master counterpart at all).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointType {
    Start,
    End,
    Average,
    /// The extremum of a curve's bounding box beyond its chord (§4.D's
    /// mid-curve segment case).
    CurveBbox,
    /// No exact match found; re-derive via curve flattening, looking for the
    /// first sign change in slope (an inflection point), falling back to
    /// linear interpolation between the endpoints.
    Flatten,
    /// A ghost-generated coordinate has no coordinate counterpart to look up
    /// in another master; it is regenerated from that master's own bands.
    Ghost,
}

/// One recorded hint origin: which axis value (`v1` or `v2`) of a
/// [`HintPoint`] this describes, which path element it was measured against,
/// and how.
#[derive(Clone, Copy, Debug)]
pub struct HintOrigin {
    pub element: ElementId,
    pub point_type: PointType,
    /// `true` selects the horizontal (`y`) coordinate family used by
    /// `b`/`v` hints; `false` selects `x`, used by `y`/`m` hints.
    pub horizontal: bool,
}

fn axis_is_horizontal(code: HintCode) -> bool {
    matches!(code, HintCode::B | HintCode::V)
}

fn endpoint_coords(path: &Path, e: ElementId) -> (Fixed, Fixed, Fixed, Fixed) {
    let (start, end) = path.end_points(e);
    (start.x, start.y, end.x, end.y)
}

/// Classify which point on `e` produced `value` (`GetPointType`): exact or
/// near match to the start, end, or average of the element's endpoints, else
/// the peak of its curve bbox, else fall back to [`PointType::Flatten`].
pub fn classify_point_type(path: &Path, e: ElementId, horizontal: bool, value: Fixed) -> PointType {
    let (sx, sy, ex, ey) = endpoint_coords(path, e);
    let (start_v, end_v) = if horizontal { (sy, ey) } else { (sx, ex) };

    if value == start_v || (value - start_v).abs() <= TOLERANCE {
        return PointType::Start;
    }
    if value == end_v || (value - end_v).abs() <= TOLERANCE {
        return PointType::End;
    }
    let avg = Fixed((start_v.0 + end_v.0) / 2);
    if value == avg || (value - avg).abs() <= TOLERANCE {
        return PointType::Average;
    }
    if path.get(e).kind == EltKind::Curve {
        let bbox = path.bbox();
        let peak = if horizontal { bbox.ur.y.max(bbox.ll.y.abs()) } else { bbox.ur.x };
        if (value - peak).abs() <= TOLERANCE {
            return PointType::CurveBbox;
        }
    }
    PointType::Flatten
}

/// Given the source master's relative position of `value` between its
/// element's endpoints, find the corresponding absolute value on `other`'s
/// version of the same element (`GetRelativePosition`).
fn transfer_by_relative_position(
    other: &Path,
    e: ElementId,
    horizontal: bool,
    source_start: Fixed,
    source_end: Fixed,
    value: Fixed,
) -> Fixed {
    let (sx, sy, ex, ey) = endpoint_coords(other, e);
    let (cur_start, cur_end) = if horizontal { (sy, ey) } else { (sx, ex) };
    if source_end == source_start {
        return value - source_start + cur_start;
    }
    let rel = (value - source_start).to_f64() / (source_end - source_start).to_f64();
    Fixed::from_f64((cur_end - cur_start).to_f64() * rel + cur_start.to_f64())
}

/// Flatten `e`'s curve on `other` and return the coordinate (x or y,
/// matching `horizontal`) at the first point where the flattened polyline's
/// slope sign changes — an inflection point. Falls back to linear
/// interpolation between the endpoints if no sign change is found.
fn transfer_by_flattening(other: &Path, e: ElementId, horizontal: bool, rel_fallback: f64) -> Fixed {
    let elt = other.get(e);
    let (start, _) = other.end_points(e);
    if elt.kind != EltKind::Curve {
        let end = other.end_point(e);
        let (s, en) = if horizontal { (start.y, end.y) } else { (start.x, end.x) };
        return Fixed::from_f64((en - s).to_f64() * rel_fallback + s.to_f64());
    }

    let c1 = crate::fixed::Point::new(elt.x1, elt.y1);
    let c2 = crate::fixed::Point::new(elt.x2, elt.y2);
    let c3 = crate::fixed::Point::new(elt.x, elt.y);

    let mut points = vec![start];
    for_each_flattened_point(start, c1, c2, c3, |p| points.push(p));

    let mut prev_delta: Option<i32> = None;
    for w in points.windows(2) {
        let delta = if horizontal { (w[1].y - w[0].y).0 } else { (w[1].x - w[0].x).0 };
        if let Some(pd) = prev_delta {
            if (pd > 0) != (delta > 0) && delta != 0 && pd != 0 {
                return if horizontal { w[1].y } else { w[1].x };
            }
        }
        if delta != 0 {
            prev_delta = Some(delta);
        }
    }

    let end = other.end_point(e);
    let (s, en) = if horizontal { (start.y, end.y) } else { (start.x, end.x) };
    Fixed::from_f64((en - s).to_f64() * rel_fallback + s.to_f64())
}

/// Synthesize the value of a transferred hint coordinate on `other`, given
/// where it came from on the source master.
pub fn transfer_value(
    source: &Path,
    other: &Path,
    origin: HintOrigin,
    source_value: Fixed,
) -> Fixed {
    let e = origin.element;
    match origin.point_type {
        PointType::Start => {
            let (sx, sy, _, _) = endpoint_coords(other, e);
            if origin.horizontal { sy } else { sx }
        }
        PointType::End => {
            let (_, _, ex, ey) = endpoint_coords(other, e);
            if origin.horizontal { ey } else { ex }
        }
        PointType::Average => {
            let (sx, sy, ex, ey) = endpoint_coords(other, e);
            if origin.horizontal { Fixed((sy.0 + ey.0) / 2) } else { Fixed((sx.0 + ex.0) / 2) }
        }
        PointType::CurveBbox => {
            let bbox = other.bbox();
            if origin.horizontal { bbox.ur.y } else { bbox.ur.x }
        }
        PointType::Flatten => {
            let (sx, sy, ex, ey) = endpoint_coords(source, e);
            let (s, en) = if origin.horizontal { (sy, ey) } else { (sx, ex) };
            let rel = if en == s { 0.0 } else { (source_value - s).to_f64() / (en - s).to_f64() };
            transfer_by_flattening(other, e, origin.horizontal, rel)
        }
        PointType::Ghost => source_value,
    }
}

/// Verify that `masters` all share the same element count and that every
/// position has a compatible `EltKind` (`Move`/`Curve`/`Close` must match
/// exactly; a `Line` vs `Curve` mismatch is resolved by promoting every
/// master's `Line` at that position to a `Curve` using the 1/3 rule, per
/// `charpath.c`'s `ReconcilePaths`).
pub fn reconcile_topology(masters: &mut [Path]) -> Result<(), HintingError> {
    let Some(len) = masters.first().map(Path::len) else {
        return Ok(());
    };
    for m in masters.iter() {
        if m.len() != len {
            return Err(HintingError::TopologyMismatch(format!(
                "path element count differs: {} vs {}",
                len,
                m.len()
            )));
        }
    }

    let ids: Vec<ElementId> = masters[0].iter().map(|(id, _)| id).collect();
    for &id in &ids {
        let kinds: Vec<EltKind> = masters.iter().map(|m| m.get(id).kind).collect();
        let any_curve = kinds.iter().any(|k| *k == EltKind::Curve);
        let any_line = kinds.iter().any(|k| *k == EltKind::Line);
        if any_curve && any_line {
            for (mi, m) in masters.iter_mut().enumerate() {
                if kinds[mi] == EltKind::Line {
                    promote_line_to_curve(m, id);
                }
            }
        } else if !kinds.windows(2).all(|w| w[0] == w[1]) {
            return Err(HintingError::TopologyMismatch(format!(
                "incompatible element kinds at {id:?}: {kinds:?}"
            )));
        }
    }
    Ok(())
}

/// Promote a `Line` to a `Curve` whose control points sit 1/3 and 2/3 of the
/// way along the chord (the "1/3 rule").
fn promote_line_to_curve(path: &mut Path, id: ElementId) {
    let (start, end) = path.end_points(id);
    let third = |a: Fixed, b: Fixed| a + (b - a).div(Fixed::from_int(3));
    let x1 = third(start.x, end.x);
    let y1 = third(start.y, end.y);
    let x2 = third(end.x, start.x);
    let y2 = third(end.y, start.y);
    let elt = path.get_mut(id);
    elt.kind = EltKind::Curve;
    elt.x1 = x1;
    elt.y1 = y1;
    elt.x2 = x2;
    elt.y2 = y2;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed;

    fn line_path(p0: (i32, i32), p1: (i32, i32)) -> Path {
        let mut p = Path::new();
        p.append_move_or_line(EltKind::Move, Fixed::from_int(p0.0), Fixed::from_int(p0.1));
        p.append_move_or_line(EltKind::Line, Fixed::from_int(p1.0), Fixed::from_int(p1.1));
        p.append_close();
        p
    }

    #[test]
    fn reconcile_promotes_line_to_curve_on_mismatch() {
        let a = line_path((0, 0), (100, 0));
        let mut b = a.clone();
        let line_id = b.iter().nth(1).unwrap().0;
        let elt = b.get_mut(line_id);
        elt.kind = EltKind::Curve;
        elt.x1 = Fixed::from_int(30);
        elt.y1 = Fixed::ZERO;
        elt.x2 = Fixed::from_int(70);
        elt.y2 = Fixed::ZERO;

        let mut masters = vec![a, b];
        reconcile_topology(&mut masters).unwrap();
        assert_eq!(masters[0].get(line_id).kind, EltKind::Curve);
        assert_eq!(masters[0].get(line_id).x1, Fixed::from_int(100).div(Fixed::from_int(3)));
    }

    #[test]
    fn classify_finds_start_and_end() {
        let path = line_path((0, 0), (100, 200));
        let line_id = path.iter().nth(1).unwrap().0;
        assert_eq!(classify_point_type(&path, line_id, true, Fixed::ZERO), PointType::Start);
        assert_eq!(classify_point_type(&path, line_id, true, Fixed::from_int(200)), PointType::End);
        assert_eq!(classify_point_type(&path, line_id, true, Fixed::from_int(100)), PointType::Average);
    }

    #[test]
    fn transfer_start_value_uses_other_masters_endpoint() {
        let source = line_path((0, 0), (100, 200));
        let other = line_path((10, 5), (110, 205));
        let line_id = source.iter().nth(1).unwrap().0;
        let origin = HintOrigin { element: line_id, point_type: PointType::Start, horizontal: true };
        let v = transfer_value(&source, &other, origin, Fixed::ZERO);
        assert_eq!(v, Fixed::from_int(5));
    }

    #[test]
    fn mismatched_element_count_is_rejected() {
        let a = line_path((0, 0), (100, 0));
        let mut b = line_path((0, 0), (100, 0));
        b.append_move_or_line(EltKind::Move, Fixed::ZERO, Fixed::ZERO);
        let mut masters = vec![a, b];
        assert!(reconcile_topology(&mut masters).is_err());
    }
}
