// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Curve flattening, bounding boxes, and junction smoothness tests
//!
//! All of §4.A's geometry helpers that are not plain `Fixed` arithmetic live
//! here: adaptive cubic-Bézier flattening, the "H/V-ness" quotient curves
//! used throughout segment generation, and the smoothness/angle test used by
//! both the path editor and the flex detector.

use crate::fixed::{BBox, Fixed, Point};

/// Maximum control-polygon bbox dimension (in units) before a curve is
/// recursively subdivided before flattening begins (§4.A).
const FLATTEN_SPLIT_THRESHOLD: i32 = 256;
/// Adaptive bisection depth once a curve is within `FLATTEN_SPLIT_THRESHOLD`.
const FLATTEN_MAX_DEPTH: u32 = 6;
/// Minimum epsilon (units) used to decide a leaf is flat enough to report.
const FLATTEN_MIN_EPS: i32 = 1;

/// Recursively flatten a cubic Bézier `p0 p1 p2 p3`, calling `report` with
/// each successive endpoint along the curve (never `p0` itself).
///
/// Mirrors the source's `FltnCurve`/`FMiniFltn`: curves whose control-polygon
/// bounding box exceeds `FLATTEN_SPLIT_THRESHOLD` in either dimension are
/// split in half (de Casteljau at `t=0.5`) before the bounded adaptive
/// bisection begins; this keeps the fixed-point intermediates from
/// overflowing on very large curves.
pub fn for_each_flattened_point<F: FnMut(Point)>(p0: Point, p1: Point, p2: Point, p3: Point, mut report: F) {
    flatten_rec(p0, p1, p2, p3, FLATTEN_MAX_DEPTH, &mut report);
}

fn control_bbox_dim(p0: Point, p1: Point, p2: Point, p3: Point) -> Fixed {
    let xs = [p0.x, p1.x, p2.x, p3.x];
    let ys = [p0.y, p1.y, p2.y, p3.y];
    let (mut minx, mut maxx) = (xs[0], xs[0]);
    let (mut miny, mut maxy) = (ys[0], ys[0]);
    for &x in &xs[1..] {
        minx = minx.min(x);
        maxx = maxx.max(x);
    }
    for &y in &ys[1..] {
        miny = miny.min(y);
        maxy = maxy.max(y);
    }
    (maxx - minx).max(maxy - miny)
}

fn midpoint(a: Point, b: Point) -> Point {
    Point::new(
        Fixed((a.x.0 + b.x.0) / 2),
        Fixed((a.y.0 + b.y.0) / 2),
    )
}

fn flatten_rec<F: FnMut(Point)>(p0: Point, p1: Point, p2: Point, p3: Point, depth: u32, report: &mut F) {
    if control_bbox_dim(p0, p1, p2, p3).0 > FLATTEN_SPLIT_THRESHOLD * 256 || depth == 0 {
        if depth == 0 {
            report(p3);
            return;
        }
        let p01 = midpoint(p0, p1);
        let p12 = midpoint(p1, p2);
        let p23 = midpoint(p2, p3);
        let p012 = midpoint(p01, p12);
        let p123 = midpoint(p12, p23);
        let p0123 = midpoint(p012, p123);
        flatten_rec(p0, p01, p012, p0123, depth.saturating_sub(1), report);
        flatten_rec(p0123, p123, p23, p3, depth.saturating_sub(1), report);
        return;
    }

    // Close enough to flat: the control points sit within `eps` of the chord.
    let eps = Fixed::from_int(FLATTEN_MIN_EPS);
    if is_flat_enough(p0, p1, p2, p3, eps) {
        report(p3);
        return;
    }
    let p01 = midpoint(p0, p1);
    let p12 = midpoint(p1, p2);
    let p23 = midpoint(p2, p3);
    let p012 = midpoint(p01, p12);
    let p123 = midpoint(p12, p23);
    let p0123 = midpoint(p012, p123);
    flatten_rec(p0, p01, p012, p0123, depth - 1, report);
    flatten_rec(p0123, p123, p23, p3, depth - 1, report);
}

/// Distance from point `p` to the infinite line through `a`-`b`, in fixed
/// units (uses `f64` internally; flattening tolerance is coarse enough that
/// this does not threaten determinism of the final hinting decision, only
/// the subdivision depth, which converges either way).
fn dist_to_line(p: Point, a: Point, b: Point) -> f64 {
    let (ax, ay) = (a.x.to_f64(), a.y.to_f64());
    let (bx, by) = (b.x.to_f64(), b.y.to_f64());
    let (px, py) = (p.x.to_f64(), p.y.to_f64());
    let dx = bx - ax;
    let dy = by - ay;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-9 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    ((px - ax) * dy - (py - ay) * dx).abs() / len
}

fn is_flat_enough(p0: Point, p1: Point, p2: Point, p3: Point, eps: Fixed) -> bool {
    let e = eps.to_f64();
    dist_to_line(p1, p0, p3) <= e && dist_to_line(p2, p0, p3) <= e
}

/// Bounding box of a cubic Bézier segment, via flattening.
pub fn curve_bbox(p0: Point, p1: Point, p2: Point, p3: Point) -> BBox {
    let mut bbox = BBox::empty();
    bbox.add_point(p0);
    for_each_flattened_point(p0, p1, p2, p3, |p| bbox.add_point(p));
    bbox
}

/// Piecewise-linear "H/V-ness" response curve, anchored at
/// q = 0, 0.25, 0.5, 1, 2, 4 as specified in §4.D. `t` is the input ratio
/// (e.g. `(dx/dy)^2` for `VertQuo`); the result is clamped to `[0, 1]`.
fn hv_response(t: f64) -> f64 {
    // (input, output) anchor pairs.
    const ANCHORS: [(f64, f64); 6] = [
        (0.0, 1.0),
        (0.25, 0.8),
        (0.5, 0.5),
        (1.0, 0.2),
        (2.0, 0.05),
        (4.0, 0.0),
    ];
    if t <= ANCHORS[0].0 {
        return ANCHORS[0].1;
    }
    if t >= ANCHORS[ANCHORS.len() - 1].0 {
        return ANCHORS[ANCHORS.len() - 1].1;
    }
    for w in ANCHORS.windows(2) {
        let (x0, y0) = w[0];
        let (x1, y1) = w[1];
        if t >= x0 && t <= x1 {
            let frac = (t - x0) / (x1 - x0);
            return y0 + frac * (y1 - y0);
        }
    }
    0.0
}

/// Quotient in `[0, 1]` measuring how close the segment `(x1,y1)-(x2,y2)` is
/// to vertical; `1` means exactly vertical.
pub fn vert_quo(x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> Fixed {
    let dx = (x2 - x1).to_f64();
    let dy = (y2 - y1).to_f64();
    if dy.abs() < 1e-9 {
        return Fixed::ZERO;
    }
    let t = (dx / dy).powi(2);
    Fixed::from_f64(hv_response(t))
}

/// Symmetric counterpart of [`vert_quo`] for horizontal-ness.
pub fn horz_quo(x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> Fixed {
    vert_quo(y1, x1, y2, x2)
}

pub fn is_vertical(x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> bool {
    vert_quo(x1, y1, x2, y2).0 > 0
}

pub fn is_horizontal(x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> bool {
    horz_quo(x1, y1, x2, y2).0 > 0
}

/// Outcome of the junction smoothness test (§4.A).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Smoothness {
    /// The incident vectors are within 30° of each other: smooth.
    Smooth,
    /// Within ~1 unit of colinear: the caller should snap the middle point
    /// onto the chord.
    Colinear,
    /// Angle exceeds 150°: a sharp corner that should be clipped.
    Sharp,
    /// Neither smooth, colinear, nor sharp.
    Normal,
}

/// Classify the junction `(x0,y0)-(x1,y1)-(x2,y2)` per §4.A, and report the
/// perpendicular distance of `(x1,y1)` from the chord `(x0,y0)-(x2,y2)` (used
/// by callers deciding whether to snap it onto the line).
pub fn check_smoothness(x0: Fixed, y0: Fixed, x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> (Smoothness, Fixed) {
    let v0 = (x1.to_f64() - x0.to_f64(), y1.to_f64() - y0.to_f64());
    let v1 = (x2.to_f64() - x1.to_f64(), y2.to_f64() - y1.to_f64());
    let len0 = (v0.0 * v0.0 + v0.1 * v0.1).sqrt();
    let len1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let dist = Fixed::from_f64(dist_to_line(
        Point::new(x1, y1),
        Point::new(x0, y0),
        Point::new(x2, y2),
    ));

    if len0 < 1e-9 || len1 < 1e-9 {
        return (Smoothness::Normal, dist);
    }
    let cos_theta = ((v0.0 * v1.0 + v0.1 * v1.1) / (len0 * len1)).clamp(-1.0, 1.0);
    let angle_deg = cos_theta.acos().to_degrees();

    if dist.0.abs() <= 256 {
        // within ~1 unit of colinear
        return (Smoothness::Colinear, dist);
    }
    if angle_deg <= 30.0 {
        (Smoothness::Smooth, dist)
    } else if angle_deg > 150.0 {
        (Smoothness::Sharp, dist)
    } else {
        (Smoothness::Normal, dist)
    }
}

/// Project `p1` onto the line through `p0`-`p2`, rounding the result back to
/// `Fixed`. Used to snap a near-colinear middle point onto the chord.
pub fn project_onto_line(p0: Point, p1: Point, p2: Point) -> Point {
    let (ax, ay) = (p0.x.to_f64(), p0.y.to_f64());
    let (bx, by) = (p2.x.to_f64(), p2.y.to_f64());
    let (px, py) = (p1.x.to_f64(), p1.y.to_f64());
    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;
    if len2 < 1e-9 {
        return p1;
    }
    let t = ((px - ax) * dx + (py - ay) * dy) / len2;
    Point::new(
        Fixed::from_f64(ax + t * dx),
        Fixed::from_f64(ay + t * dy),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_straight_line_reports_one_point() {
        let p0 = Point::new(Fixed::from_int(0), Fixed::from_int(0));
        let p1 = Point::new(Fixed::from_int(33), Fixed::from_int(33));
        let p2 = Point::new(Fixed::from_int(66), Fixed::from_int(66));
        let p3 = Point::new(Fixed::from_int(100), Fixed::from_int(100));
        let mut pts = Vec::new();
        for_each_flattened_point(p0, p1, p2, p3, |p| pts.push(p));
        assert_eq!(pts.last().copied().unwrap(), p3);
    }

    #[test]
    fn vert_quo_exactly_vertical_is_one() {
        let q = vert_quo(
            Fixed::from_int(10),
            Fixed::from_int(0),
            Fixed::from_int(10),
            Fixed::from_int(100),
        );
        assert_eq!(q, FIXED_ONE_F);
    }
    const FIXED_ONE_F: Fixed = Fixed(256);

    #[test]
    fn smoothness_sharp_corner() {
        let (s, _) = check_smoothness(
            Fixed::from_int(0),
            Fixed::from_int(0),
            Fixed::from_int(100),
            Fixed::from_int(0),
            Fixed::from_int(0),
            Fixed::from_int(1),
        );
        assert_eq!(s, Smoothness::Sharp);
    }
}
