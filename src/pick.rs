// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Greedy stem selection (§4.G)
//!
//! Mirrors `pick.c`'s `PickVVals`/`PickHVals`: walk the surviving candidate
//! list picking the highest-priority, non-conflicting pair at each step,
//! with ghost-band substitution and a bbox-derived fallback when nothing
//! survives (`AddBBoxHV`), and the counter-hinting branch from `control.c`'s
//! `UseCounter`.

use crate::eval::{HintVal, ValId, ValList};
use crate::fixed::Fixed;
use crate::path::Path;
use crate::segment::{Axis, SegKind, SegmentStore};

/// Band expansion used when testing whether two picked pairs conflict
/// (§4.G `band_margin`, 30 units).
const BAND_MARGIN: i32 = 30 * 256;
/// Minimum value for the non-ghost pair substituted in for a ghost pick to
/// win out over it (mirrors `FindBestValForSeg`'s `FixInt(2)` threshold).
const GHOST_SUBSTITUTE_THRESHOLD: i32 = 2 * 256;
/// Equal-width/spacing tolerance accepted by the counter-hint triad
/// (§4.C, 5/100 unit).
const COUNTER_TOLERANCE: i32 = 5 * 256 / 100;
/// Near-miss tolerance reported (but not accepted) for counter hinting.
const COUNTER_NEAR_MISS: i32 = 3 * 256;
/// Synthetic weight assigned to a bbox-derived fallback pair (`AddBBoxHV`).
const BBOX_FALLBACK_VAL: i32 = 100 * 256;

/// One picked stem together with the character code it will be emitted
/// under ('b'/'y' normal, 'v'/'m' counter-hinted — see `AddHPair`/`AddVPair`).
#[derive(Clone, Debug)]
pub struct PickedStem {
    pub val: HintVal,
    pub counter: bool,
}

/// Result of picking one axis: the chosen, non-conflicting stem set and the
/// leftover candidates (kept only for diagnostics).
pub struct PickResult {
    pub picked: Vec<PickedStem>,
    pub rejects: Vec<ValId>,
}

fn val_key(v: &HintVal) -> (Fixed, Fixed) {
    (v.spc, v.val)
}

/// Greedy selection shared by both axes: repeatedly take the best
/// non-conflicting remaining pair (§4.G step 1), with ghost-band
/// substitution (step 2). `lo`/`hi` extract the conflict band's bounds for
/// a value (loc1/loc2, already ordered ascending for this axis).
fn pick_axis(list: &ValList, segs: &SegmentStore) -> PickResult {
    let mut remaining: Vec<ValId> = list.ids().to_vec();
    let mut picked: Vec<ValId> = Vec::new();
    let mut rejects: Vec<ValId> = Vec::new();

    while !remaining.is_empty() {
        // Step 1: find the best (spc, val) candidate among what's left.
        let mut best_idx = 0;
        for i in 1..remaining.len() {
            if val_key(list.get(remaining[i])) > val_key(list.get(remaining[best_idx])) {
                best_idx = i;
            }
        }
        let mut best_id = remaining.remove(best_idx);
        let mut best = list.get(best_id).clone();

        // Step 2: ghost-band substitution — if the picked pair has a ghost
        // on one side, see whether the *other* side's segment has a
        // stronger non-ghost value elsewhere in `remaining` and prefer it.
        if best.ghost {
            let real_seg = if segs.get(best.seg1).kind == SegKind::Ghost {
                best.seg2
            } else {
                best.seg1
            };
            if let Some(pos) = remaining.iter().position(|&id| {
                let v = list.get(id);
                !v.ghost
                    && (v.seg1 == real_seg || v.seg2 == real_seg)
                    && v.val.0 >= GHOST_SUBSTITUTE_THRESHOLD
            }) {
                let sub_id = remaining.remove(pos);
                rejects.push(best_id);
                best_id = sub_id;
                best = list.get(best_id).clone();
            }
        }

        let (lo, hi) = (best.loc1 - Fixed(BAND_MARGIN), best.loc2 + Fixed(BAND_MARGIN));
        picked.push(best_id);

        let mut i = 0;
        while i < remaining.len() {
            let v = list.get(remaining[i]);
            if v.loc1 <= hi && v.loc2 >= lo {
                rejects.push(remaining.remove(i));
            } else {
                i += 1;
            }
        }
    }
    rejects.extend(remaining);

    PickResult {
        picked: picked
            .into_iter()
            .map(|id| PickedStem {
                val: list.get(id).clone(),
                counter: false,
            })
            .collect(),
        rejects,
    }
}

/// Pick vertical stems (`PickVVals`).
pub fn pick_v(list: &ValList, segs: &SegmentStore) -> PickResult {
    pick_axis(list, segs)
}

/// Pick horizontal stems (`PickHVals`).
pub fn pick_h(list: &ValList, segs: &SegmentStore) -> PickResult {
    pick_axis(list, segs)
}

/// `UseCounter`: accept the picked list as a counter-hinted triad if (after
/// taking the three candidates with the lowest/middle/highest midpoint) the
/// widths and spacings agree within [`COUNTER_TOLERANCE`]. Returns `Some`
/// with the three members reordered ascending by location on acceptance,
/// `None` (optionally noting a near miss) otherwise.
pub fn use_counter(picked: &[PickedStem]) -> (Option<Vec<PickedStem>>, bool /* near_miss */) {
    if picked.len() < 3 {
        return (None, false);
    }
    // Classify every candidate by its midpoint into min/mid/max buckets,
    // keeping the widest-spread three, mirroring the source's single-pass
    // bucketing in `control.c`.
    let mut by_mid: Vec<(Fixed, Fixed, usize)> = picked
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let delta = p.val.loc2 - p.val.loc1;
            let mid = p.val.loc1 + Fixed(delta.0 / 2);
            (mid, delta, i)
        })
        .collect();
    by_mid.sort_by(|a, b| a.0.cmp(&b.0));
    if by_mid.len() > 3 {
        // Keep the three most extreme candidates (min, a middle, max),
        // matching the source's preference for the widest-spaced triad.
        let last = by_mid.len() - 1;
        by_mid = vec![by_mid[0], by_mid[last / 2], by_mid[last]];
    }
    let (min_loc, min_delta, _) = by_mid[0];
    let (mid_loc, mid_delta, _) = by_mid[1];
    let (max_loc, max_delta, _) = by_mid[2];

    let width_diff = (min_delta - max_delta).abs();
    let spacing_diff = ((max_loc - mid_loc) - (mid_loc - min_loc)).abs();

    if width_diff.0 < COUNTER_TOLERANCE && spacing_diff.0 < COUNTER_TOLERANCE {
        let out = by_mid
            .iter()
            .map(|&(_, _, i)| PickedStem {
                val: picked[i].val.clone(),
                counter: true,
            })
            .collect();
        return (Some(out), false);
    }
    let near = width_diff.0 < COUNTER_NEAR_MISS && spacing_diff.0 < COUNTER_NEAR_MISS;
    (None, near)
}

/// `AddBBoxHV`: fallback pair derived from the glyph's bounding box, used
/// when nothing survived picking on this axis.
pub fn bbox_fallback(path: &Path, horizontal: bool) -> HintVal {
    let bbox = path.bbox();
    let (loc1, loc2) = if horizontal {
        (bbox.ll.y, bbox.ur.y)
    } else {
        (bbox.ll.x, bbox.ur.x)
    };
    HintVal {
        loc1,
        loc2,
        seg1: crate::segment::SegId(0),
        seg2: crate::segment::SegId(0),
        val: Fixed(BBOX_FALLBACK_VAL),
        init_val: Fixed(BBOX_FALLBACK_VAL),
        spc: Fixed::ZERO,
        ghost: false,
        pruned: false,
        merge: false,
        best: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegId;

    fn mk(loc1: i32, loc2: i32, val: i32, spc: i32) -> HintVal {
        HintVal {
            loc1: Fixed::from_int(loc1),
            loc2: Fixed::from_int(loc2),
            seg1: SegId(0),
            seg2: SegId(1),
            val: Fixed::from_int(val),
            init_val: Fixed::from_int(val),
            spc: Fixed::from_int(spc),
            ghost: false,
            pruned: false,
            merge: false,
            best: None,
        }
    }

    #[test]
    fn pick_axis_drops_conflicting_pairs() {
        let mut list = ValList::new();
        list.insert_unconditional(mk(0, 100, 50, 0));
        list.insert_unconditional(mk(50, 150, 10, 0));
        list.insert_unconditional(mk(500, 600, 40, 0));
        let segs = SegmentStore::new();
        let result = pick_axis(&list, &segs);
        assert_eq!(result.picked.len(), 2);
    }

    #[test]
    fn counter_triad_accepts_equal_spacing() {
        let picked = vec![
            PickedStem { val: mk(50, 100, 10, 0), counter: false },
            PickedStem { val: mk(200, 250, 10, 0), counter: false },
            PickedStem { val: mk(350, 400, 10, 0), counter: false },
        ];
        let (triad, _) = use_counter(&picked);
        assert!(triad.is_some());
    }
}
