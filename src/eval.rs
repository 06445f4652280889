// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Candidate stem pair evaluation (§4.E)
//!
//! For every admissible `(bot, top)` or `(left, right)` segment pair,
//! computes a weight (`val`) and a priority (`spc`), mirroring `eval.c`'s
//! `EvalHPair`/`EvalVPair`/`AdjustVal`.

use crate::conv::{to_u32, to_usize};
use crate::fixed::Fixed;
use crate::fontinfo::FontInfo;
use crate::segment::{Axis, SegId, SegKind, SegmentStore};

/// Index of a [`HintVal`] within a [`ValList`]'s arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValId(pub u32);

impl ValId {
    pub fn get(self) -> usize {
        to_usize(self.0)
    }
}

/// A candidate stem (§3 `HintVal`).
#[derive(Clone, Debug)]
pub struct HintVal {
    /// bot/left coordinate.
    pub loc1: Fixed,
    /// top/right coordinate.
    pub loc2: Fixed,
    pub seg1: SegId,
    pub seg2: SegId,
    pub val: Fixed,
    pub init_val: Fixed,
    pub spc: Fixed,
    pub ghost: bool,
    pub pruned: bool,
    pub merge: bool,
    pub best: Option<ValId>,
}

/// Minimum stem width candidate (§4.E `gMinDist`, 7 units).
const MIN_DIST: i32 = 7 * 256;
/// `GapDist` saturation constant (the source's `d*d/40`, scaled for 24.8).
const GAP_DIV: i64 = 40;
/// Weight floor/ceiling clamps (`gMinVal`/`gMaxVal` analogues).
const MIN_VAL: f64 = 0.01;
const MAX_VAL: f64 = 2000.0;
/// Big-distance scale-up factor (23/20) and floor (400 units), §4.E.
const BIG_DIST_SCALE_NUM: i32 = 23;
const BIG_DIST_SCALE_DEN: i32 = 20;
const BIG_DIST_FLOOR: i32 = 400 * 256;

fn big_dist(max_stem: Fixed) -> Fixed {
    let scaled = Fixed((max_stem.0 as i64 * BIG_DIST_SCALE_NUM as i64 / BIG_DIST_SCALE_DEN as i64) as i32);
    scaled.max(Fixed(BIG_DIST_FLOOR))
}

/// `CalcOverlapDist`: widen `d` when the overlap is partial.
fn calc_overlap_dist(d: Fixed, overlap_len: Fixed, min_len: Fixed) -> Fixed {
    if min_len.0 <= 0 {
        return d;
    }
    let r = d.to_f64();
    let ro = overlap_len.to_f64();
    let rm = min_len.to_f64();
    let factor = 1.0 + 0.4 * (1.0 - ro / rm);
    Fixed::from_f64(r * factor)
}

/// `GapDist`: quadratic gap penalty with saturation for large gaps.
fn gap_dist(d: Fixed) -> Fixed {
    let dd = d.0 as i64 * d.0 as i64;
    Fixed((dd / GAP_DIV / 256) as i32)
}

/// `AdjustVal`: the `1000 * len1^2 * len2^2 / dist^4` weight formula with the
/// big-distance falloff.
fn adjust_val(len1: Fixed, len2: Fixed, dist: Fixed, d: Fixed, big: Fixed) -> Fixed {
    let clamp2 = |x: Fixed| if x < FIXED_TWO { FIXED_TWO } else { x };
    const FIXED_TWO: Fixed = Fixed(2 * 256);
    let l1 = clamp2(len1).to_f64();
    let l2 = clamp2(len2).to_f64();
    let dd = clamp2(dist).to_f64();
    let mut v = (1000.0 * l1 * l1 * l2 * l2) / (dd * dd * dd * dd);

    if d > big {
        let q = big.to_f64() / d.to_f64();
        if q <= 0.5 {
            v = 0.0;
        } else {
            let q8 = q.powi(8);
            v *= q8;
        }
    }
    if v > MAX_VAL {
        v = MAX_VAL;
    } else if v > 0.0 && v < MIN_VAL {
        v = MIN_VAL;
    }
    Fixed::from_f64(v)
}

/// Storage for surviving candidate stems, kept in ascending `(loc1, loc2)`
/// order (§3 `valList`).
#[derive(Clone, Debug, Default)]
pub struct ValList {
    vals: Vec<HintVal>,
    order: Vec<ValId>,
}

impl ValList {
    pub fn new() -> ValList {
        ValList::default()
    }

    pub fn get(&self, id: ValId) -> &HintVal {
        &self.vals[id.get()]
    }
    pub fn get_mut(&mut self, id: ValId) -> &mut HintVal {
        &mut self.vals[id.get()]
    }
    pub fn ids(&self) -> &[ValId] {
        &self.order
    }
    pub fn len(&self) -> usize {
        self.order.len()
    }
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `AddHValue`/`AddVValue`: insert in ascending `(loc1, loc2)` order,
    /// subject to the pruning-at-insertion rules of §4.E.
    fn insert(&mut self, v: HintVal, prune_value: Fixed) -> Option<ValId> {
        if v.val < prune_value && v.spc.0 <= 0 {
            return None;
        }
        let id = self.insert_unconditional(v);
        Some(id)
    }

    /// Insert `v` in ascending `(loc1, loc2)` order without consulting
    /// `prune_value` — used when rebuilding a list from values that already
    /// survived evaluation-time pruning once (the pruner/merger in
    /// [`crate::prune`]).
    pub(crate) fn insert_unconditional(&mut self, v: HintVal) -> ValId {
        let id = ValId(to_u32(self.vals.len()));
        let key = (v.loc1, v.loc2);
        self.vals.push(v);
        let pos = self
            .order
            .partition_point(|&o| (self.vals[o.get()].loc1, self.vals[o.get()].loc2) <= key);
        self.order.insert(pos, id);
        id
    }

    /// `CombineValues`: collapse runs with identical `(loc1, loc2)` using
    /// `v' = v1 + v2 + 2*sqrt(v1*v2)` — approximately `(sqrt(v1)+sqrt(v2))^2`
    /// ("merged sqrt-energy"). A ghost anywhere in a run replaces the
    /// regular value with the ghost's (ghosts are synthetic and should not
    /// be inflated by combination).
    pub fn combine(&mut self) {
        let mut i = 0;
        let mut new_order = Vec::with_capacity(self.order.len());
        while i < self.order.len() {
            let mut j = i + 1;
            let (loc1, loc2) = {
                let v = self.get(self.order[i]);
                (v.loc1, v.loc2)
            };
            let mut run = vec![self.order[i]];
            while j < self.order.len() {
                let v = self.get(self.order[j]);
                if v.loc1 == loc1 && v.loc2 == loc2 {
                    run.push(self.order[j]);
                    j += 1;
                } else {
                    break;
                }
            }
            if run.len() == 1 {
                new_order.push(run[0]);
            } else if let Some(&ghost_id) = run.iter().find(|&&id| self.get(id).ghost) {
                new_order.push(ghost_id);
            } else {
                let combined = run
                    .iter()
                    .map(|&id| self.get(id).val.to_f64())
                    .fold(0.0_f64, |acc, v| {
                        if acc == 0.0 {
                            v
                        } else {
                            let sa = acc.max(0.0).sqrt();
                            let sv = v.max(0.0).sqrt();
                            (sa + sv).powi(2)
                        }
                    });
                let keep = run[0];
                self.get_mut(keep).val = Fixed::from_f64(combined);
                new_order.push(keep);
            }
            i = j;
        }
        self.order = new_order;
    }
}

/// Parameters governing pair evaluation that the original source hardcodes
/// as globals (`gMinDist`, `gPruneValue`, …); exposed here so embedders can
/// tune them (§1.R).
#[derive(Clone, Copy, Debug)]
pub struct EvalParams {
    pub prune_value: Fixed,
}

impl Default for EvalParams {
    fn default() -> EvalParams {
        EvalParams {
            prune_value: Fixed::from_int(5),
        }
    }
}

/// `CheckBBoxes`: neither subpath bbox contains nor is contained by the
/// other — a signal of unrelated blobs whose pairing should be rejected.
fn check_bboxes_related(path: &crate::path::Path, e1: crate::path::ElementId, e2: crate::path::ElementId) -> bool {
    let (Some(m1), Some(m2)) = (path.get_dest(e1), path.get_dest(e2)) else {
        return true;
    };
    if m1 == m2 {
        return true;
    }
    let bb1 = subpath_bbox(path, m1);
    let bb2 = subpath_bbox(path, m2);
    bb1.contains(&bb2) || bb2.contains(&bb1)
}

fn subpath_bbox(path: &crate::path::Path, mv: crate::path::ElementId) -> crate::fixed::BBox {
    let mut bbox = crate::fixed::BBox::empty();
    let Some(close) = path.get_dest(mv).and(path.get_closed_by(mv)) else {
        return bbox;
    };
    let mut cur = Some(mv);
    while let Some(id) = cur {
        bbox.add_point(path.end_point(id));
        if id == close {
            break;
        }
        cur = path.get(id).next;
    }
    bbox
}

/// Evaluate every admissible vertical pair (`left.loc < right.loc`) — `EvalV`.
pub fn eval_v(path: &crate::path::Path, segs: &SegmentStore, font: &FontInfo, params: &EvalParams) -> ValList {
    let big = big_dist(font.max_v_stem());
    let mut list = ValList::new();
    for &l in &segs.left {
        for &r in &segs.right {
            let ls = segs.get(l);
            let rs = segs.get(r);
            if ls.loc >= rs.loc {
                continue;
            }
            if let (Some(e1), Some(e2)) = (ls.elt, rs.elt) {
                if !check_bboxes_related(path, e1, e2) {
                    continue;
                }
            }
            if ls.kind == SegKind::Bend && rs.kind == SegKind::Bend {
                continue;
            }
            if let Some((spc, val)) = eval_pair(ls, rs, font, big, true) {
                let v = HintVal {
                    loc1: ls.loc,
                    loc2: rs.loc,
                    seg1: l,
                    seg2: r,
                    val,
                    init_val: val,
                    spc,
                    ghost: ls.kind == SegKind::Ghost || rs.kind == SegKind::Ghost,
                    pruned: false,
                    merge: false,
                    best: None,
                };
                list.insert(v, params.prune_value);
            }
        }
    }
    list.combine();
    list
}

/// Evaluate every admissible horizontal pair (`bot.loc < top.loc`) — `EvalH`.
pub fn eval_h(path: &crate::path::Path, segs: &SegmentStore, font: &FontInfo, params: &EvalParams) -> ValList {
    let big = big_dist(font.max_h_stem());
    let mut list = ValList::new();
    for &b in &segs.bot {
        for &t in &segs.top {
            let bs = segs.get(b);
            let ts = segs.get(t);
            if bs.loc >= ts.loc {
                continue;
            }
            if let (Some(e1), Some(e2)) = (bs.elt, ts.elt) {
                if !check_bboxes_related(path, e1, e2) {
                    continue;
                }
            }
            if bs.kind == SegKind::Bend && ts.kind == SegKind::Bend {
                continue;
            }
            if let Some((spc, val)) = eval_pair(bs, ts, font, big, false) {
                let v = HintVal {
                    loc1: bs.loc,
                    loc2: ts.loc,
                    seg1: b,
                    seg2: t,
                    val,
                    init_val: val,
                    spc,
                    ghost: bs.kind == SegKind::Ghost || ts.kind == SegKind::Ghost,
                    pruned: false,
                    merge: false,
                    best: None,
                };
                list.insert(v, params.prune_value);
            }
        }
    }
    list.combine();
    list
}

fn eval_pair(
    s1: &crate::segment::HintSeg,
    s2: &crate::segment::HintSeg,
    font: &FontInfo,
    big: Fixed,
    vert: bool,
) -> Option<(Fixed, Fixed)> {
    let d = (s2.loc - s1.loc).abs();
    if d.0 < MIN_DIST {
        return None;
    }

    // Ghost stems carry the fixed synthetic weight/priority directly.
    if s1.kind == SegKind::Ghost || s2.kind == SegKind::Ghost {
        return Some((
            Fixed::from_int(crate::segment::GHOST_SPECIAL),
            Fixed::from_int(crate::segment::GHOST_VALUE),
        ));
    }

    let (lo, hi) = (s1.min.max(s2.min), s1.max.min(s2.max));
    let overlaps = lo <= hi;
    let min_len = (s1.max - s1.min).min(s2.max - s2.min);
    let dist = if overlaps {
        let overlap_len = hi - lo;
        if overlap_len == min_len {
            d
        } else {
            calc_overlap_dist(d, overlap_len, min_len)
        }
    } else {
        let gap_lo = s1.max.max(s2.max);
        let gap_hi = s1.min.min(s2.min);
        let gap = (s1.min - s2.max).abs().min((s2.min - s1.max).abs());
        let _ = (gap_lo, gap_hi);
        let mut dd = gap_dist(gap) + Fixed((d.0 as i64 * 7 / 5) as i32);
        if gap > d {
            dd = Fixed(((dd.0 as i64) * (gap.0 as i64) / (d.0.max(1) as i64)) as i32);
        }
        dd
    };
    let min_dist_floor = Fixed(MIN_DIST * 2);
    let dist = dist.max(min_dist_floor);

    let mut spc = Fixed::ZERO;
    if !vert {
        let in_bot = font.in_blue_band(s1.loc);
        let in_top = font.in_blue_band(s2.loc);
        if in_bot && in_top {
            return None; // let the ghost pair dominate
        }
        if in_bot || in_top {
            spc += Fixed::from_int(2);
        }
    }
    let (exact, _near) = if vert { font.v_stem_match(d) } else { font.h_stem_match(d) };
    if exact {
        spc += Fixed::from_int(1);
    }

    let val = adjust_val(s1.len(), s2.len(), dist, d, big);
    if val.0 == 0 && spc.0 <= 0 {
        return None;
    }
    Some((spc, val))
}

/// For vertical/horizontal axis selection in callers.
pub fn axis_pair_name(vert: bool) -> Axis {
    if vert { Axis::Left } else { Axis::Bot }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{EltKind, Path};

    fn square_font() -> (Path, SegmentStore, FontInfo) {
        let mut path = Path::new();
        path.append_move_or_line(EltKind::Move, Fixed::from_int(0), Fixed::from_int(0));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(500), Fixed::from_int(0));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(500), Fixed::from_int(500));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(0), Fixed::from_int(500));
        path.append_close();
        let mut store = SegmentStore::new();
        crate::segment::gen_vpts(&mut path, &mut store);
        let mut font = FontInfo::new();
        font.v_stems.push(Fixed::from_int(500));
        crate::segment::gen_hpts(&mut path, &mut store, &font);
        (path, store, font)
    }

    #[test]
    fn eval_v_finds_stem_for_square() {
        let (path, store, font) = square_font();
        let params = EvalParams::default();
        let vals = eval_v(&path, &store, &font, &params);
        assert!(!vals.is_empty());
    }
}
