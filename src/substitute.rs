// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Hint substitution planner (§4.I)
//!
//! `AutoExtraHints` walks the path once the primary stems are picked,
//! deciding where a different hint set needs to become active because the
//! local edges don't agree with what's currently active. Mirrors the
//! `TestHintLst`/`StartNewHinting` machinery in `auto.c`, with the
//! `PromoteHints`/`RemPromotedHints` bookkeeping pair for attaching a
//! substitution block to a stable-enough element.

use crate::eval::{HintVal, ValId, ValList};
use crate::fixed::Fixed;
use crate::hint::{self, HintCode, HintPoint};
use crate::path::{ElementId, EltFlags, EltKind, Path};
use crate::pick::PickedStem;
use crate::segment::SegId;

/// Band margin used when testing whether a candidate's edge conflicts with
/// an active hint (matches `pick`'s `BAND_MARGIN`).
const BAND_MARGIN: i32 = 30 * 256;
/// Carry window around a hint-set transition (§4.I, clamped to 20 units).
const TRANSITION_CARRY: i32 = 20 * 256;
/// `min_hint_element_length` (§4.I `RemShortHints`).
const MIN_HINT_ELEMENT_LENGTH: i32 = 12 * 256;
/// Run-length threshold below which a hint trigger is promoted backward
/// (§4.I `PromoteHints`).
const SHORT_RUN_LENGTH: i32 = 100 * 256;
/// Subpath element-count threshold under which a new addition at a `Move`
/// is folded into the main hint set instead of starting its own bucket.
const SHORT_SUBPATH_ELEMENTS: usize = 5;

#[derive(Clone, Copy, PartialEq, Eq)]
enum BandAxis {
    Horizontal,
    Vertical,
}

fn axis_of(code: HintCode) -> BandAxis {
    match code {
        HintCode::B | HintCode::V | HintCode::M => BandAxis::Horizontal,
        HintCode::Y => BandAxis::Vertical,
    }
}

fn range(p: &HintPoint) -> (Fixed, Fixed) {
    (p.v1.min(p.v2), p.v1.max(p.v2))
}

fn bands_overlap(a: &HintPoint, b: &HintPoint, margin: Fixed) -> bool {
    if axis_of(a.code) != axis_of(b.code) {
        return false;
    }
    let (alo, ahi) = range(a);
    let (blo, bhi) = range(b);
    alo - margin <= bhi && ahi + margin >= blo
}

fn band_gap(a: &HintPoint, b: &HintPoint) -> Fixed {
    if axis_of(a.code) != axis_of(b.code) {
        return Fixed(i32::MAX);
    }
    let (alo, ahi) = range(a);
    let (blo, bhi) = range(b);
    if alo <= bhi && ahi >= blo {
        return Fixed::ZERO;
    }
    (alo - bhi).abs().min((blo - ahi).abs())
}

/// One candidate stem together with the segments it was built from, used to
/// match it against a path element's attached segment lists.
struct Candidate {
    point: HintPoint,
    seg1: SegId,
    seg2: SegId,
}

fn h_candidates(picked: &[PickedStem], rejects: &[ValId], list: &ValList, segs: &crate::segment::SegmentStore) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = picked
        .iter()
        .map(|p| Candidate { point: hint::h_point(&p.val, segs), seg1: p.val.seg1, seg2: p.val.seg2 })
        .collect();
    out.extend(rejects.iter().map(|&id| {
        let v: &HintVal = list.get(id);
        Candidate { point: hint::h_point(v, segs), seg1: v.seg1, seg2: v.seg2 }
    }));
    out
}

fn v_candidates(picked: &[PickedStem], rejects: &[ValId], list: &ValList) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = picked
        .iter()
        .map(|p| Candidate { point: hint::v_point(&p.val), seg1: p.val.seg1, seg2: p.val.seg2 })
        .collect();
    out.extend(rejects.iter().map(|&id| {
        let v: &HintVal = list.get(id);
        Candidate { point: hint::v_point(v), seg1: v.seg1, seg2: v.seg2 }
    }));
    out
}

fn touched_bands(hs: &[SegId], vs: &[SegId], h_cands: &[Candidate], v_cands: &[Candidate]) -> Vec<HintPoint> {
    let mut out = Vec::new();
    for c in h_cands {
        if hs.contains(&c.seg1) || hs.contains(&c.seg2) {
            out.push(c.point);
        }
    }
    for c in v_cands {
        if vs.contains(&c.seg1) || vs.contains(&c.seg2) {
            out.push(c.point);
        }
    }
    out
}

/// `TestHintLst`: -1 subset (no change), 0 conflict, 1 compatible addition.
fn test_hint_lst(touched: &[HintPoint], active: &[HintPoint]) -> i32 {
    if touched.is_empty() {
        return -1;
    }
    if touched.iter().all(|t| active.contains(t)) {
        return -1;
    }
    let margin = Fixed(BAND_MARGIN);
    let conflict = touched
        .iter()
        .any(|t| !active.contains(t) && active.iter().any(|a| a != t && bands_overlap(a, t, margin)));
    if conflict { 0 } else { 1 }
}

/// `StartNewHinting`: the new bucket's contents are the touched bands plus
/// any active band within [`TRANSITION_CARRY`] of one of them.
fn start_new_hinting(active: &[HintPoint], touched: &[HintPoint]) -> Vec<HintPoint> {
    let mut bucket = touched.to_vec();
    let carry_window = Fixed(TRANSITION_CARRY);
    for a in active {
        if bucket.contains(a) {
            continue;
        }
        let carry = touched.iter().any(|t| band_gap(a, t) <= carry_window);
        if carry {
            bucket.push(*a);
        }
    }
    hint::sort_bucket(&mut bucket);
    bucket
}

fn subpath_element_count(path: &Path, mv: ElementId) -> usize {
    let Some(close) = path.get_closed_by(mv) else {
        return 0;
    };
    let mut n = 0;
    let mut cur = Some(mv);
    while let Some(id) = cur {
        n += 1;
        if id == close {
            break;
        }
        cur = path.get(id).next;
    }
    n
}

/// Walk the path once the primary stems are picked, computing the
/// `new_hints` bucket for every path element and returning the buckets
/// themselves in emission order (bucket 0 is the main set, §4.I).
#[allow(clippy::too_many_arguments)]
pub fn auto_extra_hints(
    path: &mut Path,
    segs: &crate::segment::SegmentStore,
    h_list: &ValList,
    h_picked: &[PickedStem],
    h_rejects: &[ValId],
    v_list: &ValList,
    v_picked: &[PickedStem],
    v_rejects: &[ValId],
) -> Vec<Vec<HintPoint>> {
    let mut bucket0: Vec<HintPoint> = h_picked.iter().map(|p| hint::h_point(&p.val, segs)).collect();
    bucket0.extend(v_picked.iter().map(|p| hint::v_point(&p.val)));
    hint::sort_bucket(&mut bucket0);

    let mut buckets = vec![bucket0.clone()];
    let mut active = bucket0;

    let h_cands = h_candidates(h_picked, h_rejects, h_list, segs);
    let v_cands = v_candidates(v_picked, v_rejects, v_list);

    let ids: Vec<ElementId> = path.iter().map(|(id, _)| id).collect();
    for id in ids {
        let kind = path.get(id).kind;
        if matches!(kind, EltKind::Close) {
            continue;
        }
        let (hs, vs) = {
            let elt = path.get(id);
            (elt.hs.clone(), elt.vs.clone())
        };
        let touched = touched_bands(&hs, &vs, &h_cands, &v_cands);
        if touched.is_empty() {
            continue;
        }
        match test_hint_lst(&touched, &active) {
            -1 => {}
            1 => {
                for t in &touched {
                    if !active.contains(t) {
                        active.push(*t);
                    }
                }
                hint::sort_bucket(&mut active);
                if kind == EltKind::Move {
                    let small = path
                        .get_dest(id)
                        .map(|mv| subpath_element_count(path, mv) <= SHORT_SUBPATH_ELEMENTS)
                        .unwrap_or(false);
                    if small {
                        for t in &touched {
                            if !buckets[0].contains(t) {
                                buckets[0].push(*t);
                            }
                        }
                        hint::sort_bucket(&mut buckets[0]);
                    }
                }
            }
            _ => {
                let new_bucket = start_new_hinting(&active, &touched);
                active = new_bucket.clone();
                buckets.push(new_bucket);
                path.get_mut(id).new_hints = (buckets.len() - 1) as u32;
            }
        }
    }

    promote_hints(path);
    rem_short_hints(path);
    buckets
}

/// `PromoteHints`: along a run of elements shorter than [`SHORT_RUN_LENGTH`]
/// with no hint trigger of their own, copy the next triggering element's
/// seg-lists back onto the run's first element so the emitter has a stable
/// place to attach the substitution block. Marks [`EltFlags::H_COPY`] /
/// [`EltFlags::V_COPY`] so [`rem_promoted_hints`] can undo it afterward.
fn promote_hints(path: &mut Path) {
    let ids: Vec<ElementId> = path.iter().map(|(id, _)| id).collect();
    let mut i = 0;
    while i < ids.len() {
        let empty = {
            let e = path.get(ids[i]);
            e.hs.is_empty() && e.vs.is_empty()
        };
        if !empty {
            i += 1;
            continue;
        }
        let run_start = i;
        let mut total = Fixed::ZERO;
        let mut j = i;
        while j < ids.len() {
            let e = path.get(ids[j]);
            if !(e.hs.is_empty() && e.vs.is_empty()) {
                break;
            }
            let (s, en) = path.end_points(ids[j]);
            total += (en.x - s.x).abs().max((en.y - s.y).abs());
            j += 1;
            if total.0 >= SHORT_RUN_LENGTH {
                break;
            }
        }
        if total.0 < SHORT_RUN_LENGTH && j < ids.len() {
            let (src_hs, src_vs) = {
                let e = path.get(ids[j]);
                (e.hs.clone(), e.vs.clone())
            };
            if !src_hs.is_empty() {
                let first = path.get_mut(ids[run_start]);
                first.hs = src_hs;
                first.flags |= EltFlags::H_COPY;
            }
            if !src_vs.is_empty() {
                let first = path.get_mut(ids[run_start]);
                first.vs = src_vs;
                first.flags |= EltFlags::V_COPY;
            }
        }
        i = j.max(run_start + 1);
    }
}

/// `RemPromotedHints`: undo the copies [`promote_hints`] made, once the
/// emitter is done consulting them.
pub fn rem_promoted_hints(path: &mut Path) {
    let ids: Vec<ElementId> = path.iter().map(|(id, _)| id).collect();
    for id in ids {
        let elt = path.get_mut(id);
        if elt.flags.contains(EltFlags::H_COPY) {
            elt.hs.clear();
            elt.flags.remove(EltFlags::H_COPY);
        }
        if elt.flags.contains(EltFlags::V_COPY) {
            elt.vs.clear();
            elt.flags.remove(EltFlags::V_COPY);
        }
    }
}

/// `RemShortHints`: a substitution trigger on an element smaller than
/// [`MIN_HINT_ELEMENT_LENGTH`] on both axes is too fragile a landmark to
/// emit at; fold it back into whatever was active before it.
fn rem_short_hints(path: &mut Path) {
    let ids: Vec<ElementId> = path.iter().map(|(id, _)| id).collect();
    for id in ids {
        if path.get(id).new_hints == 0 {
            continue;
        }
        let (s, e) = path.end_points(id);
        let dx = (e.x - s.x).abs();
        let dy = (e.y - s.y).abs();
        if dx.0 < MIN_HINT_ELEMENT_LENGTH && dy.0 < MIN_HINT_ELEMENT_LENGTH {
            path.get_mut(id).new_hints = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed;
    use crate::segment::SegmentStore;

    fn mk_val(loc1: i32, loc2: i32, seg1: u32, seg2: u32) -> HintVal {
        HintVal {
            loc1: Fixed::from_int(loc1),
            loc2: Fixed::from_int(loc2),
            seg1: SegId(seg1),
            seg2: SegId(seg2),
            val: Fixed::from_int(50),
            init_val: Fixed::from_int(50),
            spc: Fixed::ZERO,
            ghost: false,
            pruned: false,
            merge: false,
            best: None,
        }
    }

    #[test]
    fn test_hint_lst_detects_subset_conflict_and_addition() {
        let active = vec![HintPoint { code: HintCode::B, v1: Fixed::from_int(0), v2: Fixed::from_int(100) }];
        let subset = vec![active[0]];
        assert_eq!(test_hint_lst(&subset, &active), -1);

        let conflicting = vec![HintPoint { code: HintCode::B, v1: Fixed::from_int(50), v2: Fixed::from_int(150) }];
        assert_eq!(test_hint_lst(&conflicting, &active), 0);

        let addition = vec![HintPoint { code: HintCode::Y, v1: Fixed::from_int(10), v2: Fixed::from_int(20) }];
        assert_eq!(test_hint_lst(&addition, &active), 1);
    }

    #[test]
    fn auto_extra_hints_runs_on_trivial_square() {
        let mut path = Path::new();
        path.append_move_or_line(EltKind::Move, Fixed::from_int(0), Fixed::from_int(0));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(100), Fixed::from_int(0));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(100), Fixed::from_int(100));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(0), Fixed::from_int(100));
        path.append_close();

        let h_list = ValList::new();
        let v_list = ValList::new();
        let picked = vec![PickedStem { val: mk_val(0, 100, 0, 1), counter: false }];
        let segs = SegmentStore::new();
        let buckets = auto_extra_hints(&mut path, &segs, &h_list, &picked, &[], &v_list, &[], &[]);
        assert_eq!(buckets.len(), 1);
    }
}
