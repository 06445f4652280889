// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Per-glyph orchestration (§4.K)
//!
//! `hint_glyph` is the top-level entry point: parse → repair/flex → generate
//! segments → evaluate → prune/merge → pick → resolve remaining conflicts →
//! plan hint substitution → emit, retrying the whole pass (bounded) whenever
//! a repair or conflict-resolution step structurally changed the path.
//! `hint_masters` runs that pipeline once on a "source" master and transfers
//! the resulting hint topology onto the rest (§4.J). Grounded on `control.c`'s
//! `AutoHintGlyph`/`AutoHintGlyphs` and `auto.c`'s `AutoExtraHints` driver
//! loop; the source's process-wide globals (arena, segment lists, picks,
//! callback pointers) become fields threaded through this module's functions
//! instead, per the design notes in `spec.md` §9.

use crate::bez;
use crate::editor;
use crate::error::{Error, HintingError};
use crate::eval::{self, EvalParams};
use crate::fontinfo::FontInfo;
use crate::hint::HintPoint;
use crate::mm;
use crate::path::{EltKind, Path};
use crate::pick::{self, PickResult, PickedStem};
use crate::prune;
use crate::report::{Level, Observer};
use crate::segment::{self, SegmentStore};
use crate::substitute;

/// Tunable numeric parameters the source hardcodes as globals (`gMinDist`,
/// `gBandMargin`, …); most of those live as named constants next to the
/// component that uses them (§4's per-section thresholds), but the two
/// cross-cutting knobs an embedder plausibly wants to vary — pair-evaluation
/// pruning aggressiveness and the retry budget — are exposed here.
#[derive(Clone, Debug)]
pub struct HintParams {
    /// Parameters forwarded to [`crate::eval::eval_v`]/[`crate::eval::eval_h`].
    pub eval: EvalParams,
    /// Bound on editor-triggered restarts of the per-glyph pipeline (§4.K,
    /// §7: "at most twice"). Total attempts is `max_retries + 1`.
    pub max_retries: u32,
    /// When `false`, skips every path-mutating pass (`pre_check`,
    /// `normalize_curves`, `clip_sharp_angles`, `auto_add_flex`, conflict
    /// splitting) so the emitted path's coordinates are byte-identical to
    /// the input (§8 "Path-preservation"). Hints are still computed from
    /// the unedited outline.
    pub allow_edit: bool,
}

impl Default for HintParams {
    fn default() -> HintParams {
        HintParams {
            eval: EvalParams::default(),
            max_retries: 2,
            allow_edit: true,
        }
    }
}

/// Weight below which a conflicting link is considered weak enough to drop
/// outright rather than splitting the curve (`TryResolveConflict`'s
/// `FixInt(50)` threshold, §4.H).
const WEAK_LINK_VALUE: i32 = 50 * 256;
/// Ratio the stronger of two conflicting links must exceed the weaker by
/// before the weaker is dropped unconditionally (`val1->vVal > val2->vVal *
/// 20`).
const WEAK_LINK_RATIO: i64 = 20;

/// One axis's evaluation → prune → merge → pick results for a single pass.
struct AxisPicks {
    list: eval::ValList,
    result: PickResult,
}

fn run_axis(
    path: &Path,
    segs: &SegmentStore,
    font: &FontInfo,
    params: &HintParams,
    horizontal: bool,
) -> AxisPicks {
    let mut list = if horizontal {
        eval::eval_h(path, segs, font, &params.eval)
    } else {
        eval::eval_v(path, segs, font, &params.eval)
    };
    prune::prune(&mut list, segs, font, horizontal);
    prune::merge_vals(&mut list);
    prune::rem_flares(&mut list, font);
    let result = if horizontal { pick::pick_h(&list, segs) } else { pick::pick_v(&list, segs) };
    AxisPicks { list, result }
}

/// Apply the counter-hint branch (§4.C/§4.G `UseCounter`) when the glyph
/// name is listed, falling back to the normal pick with a warning if no
/// acceptable triad is found.
fn finalize_picks(result: PickResult, font: &FontInfo, name: &str, horizontal: bool, observer: &dyn Observer) -> PickResult {
    let PickResult { picked, rejects } = result;
    let is_counter_glyph = if horizontal { font.is_h_counter_glyph(name) } else { font.is_v_counter_glyph(name) };
    if is_counter_glyph {
        let (triad, near_miss) = pick::use_counter(&picked);
        if let Some(accepted) = triad {
            return PickResult { picked: accepted, rejects };
        }
        if near_miss {
            observer.report(Level::Warning, "counter-hint triad near miss; falling back to normal picking");
        } else {
            observer.report(Level::Warning, "counter-hint glyph has no acceptable triad; falling back to normal picking");
        }
    }
    PickResult { picked, rejects }
}

/// Resolve picker conflicts recorded on path elements with more than one
/// segment link whose picked values disagree (`TryResolveConflict`, §4.H):
/// drop the weaker link outright when it is cheap enough to lose, otherwise
/// split the curve so each half carries one link. Returns whether the path
/// was structurally changed (forcing a restart).
fn resolve_structural_conflicts(
    path: &mut Path,
    segs: &SegmentStore,
    h_picks: &PickResult,
    v_picks: &PickResult,
    font: &FontInfo,
) -> bool {
    let mut changed = false;
    let ids: Vec<_> = path.iter().map(|(id, _)| id).collect();
    for id in ids {
        if path.get(id).kind != EltKind::Curve {
            continue;
        }
        changed |= resolve_axis_conflict(path, segs, h_picks, font, id, true);
        changed |= resolve_axis_conflict(path, segs, v_picks, font, id, false);
    }
    changed
}

fn resolve_axis_conflict(
    path: &mut Path,
    segs: &SegmentStore,
    picks: &PickResult,
    font: &FontInfo,
    id: crate::path::ElementId,
    horizontal: bool,
) -> bool {
    let links = if horizontal { path.get(id).hs.clone() } else { path.get(id).vs.clone() };
    if links.len() < 2 {
        return false;
    }
    let seg1 = links[0];
    let seg2 = links[1];
    let val1 = picks.picked.iter().find(|p| p.val.seg1 == seg1 || p.val.seg2 == seg1);
    let val2 = picks.picked.iter().find(|p| p.val.seg1 == seg2 || p.val.seg2 == seg2);
    let (Some(v1), Some(v2)) = (val1, val2) else { return false };
    // Both links resolve to the same picked stem: no conflict.
    if v1.val.loc1 == v2.val.loc1 && v1.val.loc2 == v2.val.loc2 {
        return false;
    }
    let ok_to_drop = |loc: crate::fixed::Fixed, spc: crate::fixed::Fixed| {
        !horizontal || spc.0 <= 0 || !font.in_blue_band(loc)
    };
    let loc1 = segs.get(seg1).loc;
    let loc2 = segs.get(seg2).loc;
    if v1.val.val.0 < WEAK_LINK_VALUE && ok_to_drop(loc1, v1.val.spc) {
        let list = if horizontal { &mut path.get_mut(id).hs } else { &mut path.get_mut(id).vs };
        list.retain(|&s| s != seg1);
        return false;
    }
    if v2.val.val.0 < WEAK_LINK_VALUE
        && (v1.val.val.0 as i64) > (v2.val.val.0 as i64) * WEAK_LINK_RATIO
        && ok_to_drop(loc2, v2.val.spc)
    {
        let list = if horizontal { &mut path.get_mut(id).hs } else { &mut path.get_mut(id).vs };
        list.retain(|&s| s != seg2);
        return false;
    }
    editor::resolve_conflict_by_split(path, id, seg1, seg2, horizontal)
}

/// Report stem and zone diagnostics for the axis's final picks (§6
/// `report_h_stem`/`report_v_stem`/`report_stem_zone`).
fn report_axis(picks: &PickResult, font: &FontInfo, name: &str, horizontal: bool, observer: &dyn Observer) {
    for p in &picks.picked {
        let (a, b) = (p.val.loc1.to_f64(), p.val.loc2.to_f64());
        if horizontal {
            observer.report_h_stem(p.val.loc2.to_f64(), p.val.loc1.to_f64(), name);
        } else {
            observer.report_v_stem(p.val.loc2.to_f64(), p.val.loc1.to_f64(), name);
        }
        if font.in_blue_band(p.val.loc1) || font.in_blue_band(p.val.loc2) {
            observer.report_stem_zone(b.max(a), a.min(b), name);
        }
    }
}

/// Run one attempt of the §4.K pipeline body (segment generation through
/// hint substitution planning) on an already repaired path. Returns the
/// emitted buckets and whether a residual conflict forced a structural
/// change (meaning the caller should restart once more, budget permitting).
fn hint_pass(
    path: &mut Path,
    font: &FontInfo,
    name: &str,
    params: &HintParams,
    observer: &dyn Observer,
) -> (Vec<Vec<HintPoint>>, bool) {
    let mut segs = SegmentStore::new();
    segment::gen_vpts(path, &mut segs);
    segment::gen_hpts(path, &mut segs, font);

    let v_axis = run_axis(path, &segs, font, params, false);
    let h_axis = run_axis(path, &segs, font, params, true);

    let mut v_picks = finalize_picks(v_axis.result, font, name, false, observer);
    let mut h_picks = finalize_picks(h_axis.result, font, name, true, observer);

    if v_picks.picked.is_empty() {
        v_picks.picked.push(PickedStem { val: pick::bbox_fallback(path, false), counter: false });
        observer.report(Level::Warning, "no vertical stem survived picking; using bbox fallback");
    }
    if h_picks.picked.is_empty() {
        h_picks.picked.push(PickedStem { val: pick::bbox_fallback(path, true), counter: false });
        observer.report(Level::Warning, "no horizontal stem survived picking; using bbox fallback");
    }

    let mut conflict_changed = false;
    if params.allow_edit {
        conflict_changed = resolve_structural_conflicts(path, &segs, &h_picks, &v_picks, font);
    }

    report_axis(&h_picks, font, name, true, observer);
    report_axis(&v_picks, font, name, false, observer);

    let buckets = substitute::auto_extra_hints(
        path,
        &segs,
        &h_axis.list,
        &h_picks.picked,
        &h_picks.rejects,
        &v_axis.list,
        &v_picks.picked,
        &v_picks.rejects,
    );
    substitute::rem_promoted_hints(path);
    (buckets, conflict_changed)
}

/// Verify the structural invariant of §3: every subpath opened by a `Move`
/// has a matching `Close`, and the path is non-empty.
fn check_structure(path: &Path) -> Result<(), HintingError> {
    if path.is_empty() {
        return Err(HintingError::EmptyPath);
    }
    for (id, elt) in path.iter() {
        if elt.kind == EltKind::Move && path.get_closed_by(id).is_none() {
            return Err(HintingError::UnclosedSubpath(id));
        }
    }
    Ok(())
}

/// Hint one glyph end-to-end (§4.K): parse the bez outline, repair/flex it,
/// generate and evaluate candidate stems, pick a non-conflicting set, plan
/// hint substitution, and emit the re-serialized bez text.
pub fn hint_glyph(bez_text: &str, font: &FontInfo, observer: &dyn Observer, params: &HintParams) -> Result<String, Error> {
    let name = bez::parser::glyph_name(bez_text).unwrap_or_default();
    let mut path = bez::parse(bez_text)?;
    let buckets = hint_path(&mut path, font, &name, observer, params)?;
    Ok(bez::write(&name, &path, &buckets))
}

/// Run the §4.K retry loop on an already-parsed path, returning the emitted
/// hint buckets (bucket 0 first). Shared by [`hint_glyph`] and
/// [`hint_masters`] (the latter runs this once, on the source master).
pub fn hint_path(
    path: &mut Path,
    font: &FontInfo,
    name: &str,
    observer: &dyn Observer,
    params: &HintParams,
) -> Result<Vec<Vec<HintPoint>>, Error> {
    check_structure(path)?;

    for attempt in 0..=params.max_retries {
        let is_last_attempt = attempt == params.max_retries;
        let mut structural_change = false;

        if params.allow_edit {
            structural_change |= editor::pre_check(path, observer).changed;
            structural_change |= editor::normalize_curves(path, observer).changed;
            structural_change |= editor::clip_sharp_angles(path, observer).changed;
            if font.flex_ok {
                editor::auto_add_flex(path, font.flex_strict);
            }
        }

        if structural_change && !is_last_attempt {
            observer.report_retry();
            continue;
        }

        let (buckets, conflict_changed) = hint_pass(path, font, name, params, observer);
        if conflict_changed && !is_last_attempt {
            observer.report_retry();
            continue;
        }
        return Ok(buckets);
    }
    unreachable!("loop always returns on its last iteration");
}

/// Hint a multiple-master glyph (§4.J): the first path in `masters` is fully
/// hinted end-to-end; its hint topology is then replayed onto every other
/// master via [`crate::mm`]. Returns one hinted bez output per master, in
/// the same order as `masters`/`bez_texts`.
pub fn hint_masters(
    bez_texts: &[&str],
    font: &FontInfo,
    observer: &dyn Observer,
    params: &HintParams,
) -> Result<Vec<String>, Error> {
    if bez_texts.is_empty() {
        return Ok(Vec::new());
    }
    let name = bez::parser::glyph_name(bez_texts[0]).unwrap_or_default();
    let mut masters: Vec<Path> = bez_texts.iter().map(|t| bez::parse(t)).collect::<Result<_, _>>()?;

    mm::reconcile_topology(&mut masters)?;

    // The source master's outline must not be structurally edited here: the
    // other masters share its topology only because `reconcile_topology`
    // just aligned them, and the editor (§4.H) has no way to replay its
    // repairs on paths it never sees. Hinting with editing disabled keeps
    // every master's element count and ordering identical so the recorded
    // origins resolve on all of them.
    let transfer_params = HintParams { allow_edit: false, ..params.clone() };
    let source = masters[0].clone();
    let buckets = hint_path(&mut masters[0], font, &name, observer, &transfer_params)?;

    let origins = record_origins(&source, &buckets);

    let mut outputs = Vec::with_capacity(masters.len());
    outputs.push(bez::write(&name, &masters[0], &buckets));

    for other in &masters[1..] {
        let transferred = transfer_buckets(&source, other, &buckets, &origins);
        outputs.push(bez::write(&name, other, &transferred));
    }
    Ok(outputs)
}

/// For each hint point in each bucket, classify and record where its two
/// coordinates came from on the source master (§4.J `GetPointType`).
fn record_origins(source: &Path, buckets: &[Vec<HintPoint>]) -> Vec<Vec<(mm::HintOrigin, mm::HintOrigin)>> {
    buckets
        .iter()
        .map(|bucket| {
            bucket
                .iter()
                .map(|p| {
                    let horizontal = !matches!(p.code, crate::hint::HintCode::Y);
                    (classify(source, horizontal, p.v1), classify(source, horizontal, p.v2))
                })
                .collect()
        })
        .collect()
}

/// Find the path element whose endpoint range brackets `value` most tightly
/// and classify the point type against it; ghosts (no element produced the
/// coordinate) fall back to [`mm::PointType::Ghost`].
fn classify(path: &Path, horizontal: bool, value: crate::fixed::Fixed) -> mm::HintOrigin {
    let mut best: Option<(crate::path::ElementId, crate::fixed::Fixed)> = None;
    for (id, elt) in path.iter() {
        if matches!(elt.kind, EltKind::Move | EltKind::Close) {
            continue;
        }
        let (start, end) = path.end_points(id);
        let (lo, hi) = if horizontal { (start.y.min(end.y), start.y.max(end.y)) } else { (start.x.min(end.x), start.x.max(end.x)) };
        if value < lo || value > hi {
            continue;
        }
        let width = hi - lo;
        if best.map(|(_, w)| width < w).unwrap_or(true) {
            best = Some((id, width));
        }
    }
    match best {
        Some((id, _)) => mm::HintOrigin {
            element: id,
            point_type: mm::classify_point_type(path, id, horizontal, value),
            horizontal,
        },
        None => mm::HintOrigin {
            element: path.head().unwrap_or(crate::path::ElementId(0)),
            point_type: mm::PointType::Ghost,
            horizontal,
        },
    }
}

/// Replay `buckets`' recorded origins onto `other`, synthesizing each hint
/// point's coordinates via [`mm::transfer_value`] (§4.J).
fn transfer_buckets(
    source: &Path,
    other: &Path,
    buckets: &[Vec<HintPoint>],
    origins: &[Vec<(mm::HintOrigin, mm::HintOrigin)>],
) -> Vec<Vec<HintPoint>> {
    buckets
        .iter()
        .zip(origins)
        .map(|(bucket, origin_bucket)| {
            bucket
                .iter()
                .zip(origin_bucket)
                .map(|(p, (o1, o2))| {
                    let v1 = mm::transfer_value(source, other, *o1, p.v1);
                    let v2 = mm::transfer_value(source, other, *o2, p.v2);
                    HintPoint { code: p.code, v1, v2 }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullObserver;

    fn square_bez() -> &'static str {
        "% sq\nsc\n0 0 mt\n500 0 dt\n500 500 dt\n0 500 dt\ncp\ned\n"
    }

    fn square_font() -> FontInfo {
        let mut fi = FontInfo::new();
        fi.bot_bands.push(crate::fontinfo::Band::new(Fixed::from_int(0), Fixed::from_int(-10)));
        fi.top_bands.push(crate::fontinfo::Band::new(Fixed::from_int(500), Fixed::from_int(510)));
        fi.h_stems.push(Fixed::from_int(500));
        fi.v_stems.push(Fixed::from_int(500));
        fi
    }

    use crate::fixed::Fixed;

    #[test]
    fn hints_a_simple_square() {
        let font = square_font();
        let obs = NullObserver;
        let params = HintParams::default();
        let out = hint_glyph(square_bez(), &font, &obs, &params).unwrap();
        assert!(out.contains("rb") || out.contains("ry"));
        assert!(out.starts_with("% sq"));
        assert!(out.trim_end().ends_with("ed"));
    }

    #[test]
    fn determinism_same_input_same_output() {
        let font = square_font();
        let obs = NullObserver;
        let params = HintParams::default();
        let a = hint_glyph(square_bez(), &font, &obs, &params).unwrap();
        let b = hint_glyph(square_bez(), &font, &obs, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_path_is_fatal() {
        let font = FontInfo::new();
        let obs = NullObserver;
        let params = HintParams::default();
        let err = hint_glyph("sc\ned\n", &font, &obs, &params).unwrap_err();
        assert!(matches!(err, Error::Hinting(HintingError::EmptyPath)));
    }

    #[test]
    fn allow_edit_false_preserves_coordinates() {
        // A degenerate closepath would normally be nudged by `pre_check`;
        // with editing disabled the coordinates must survive unchanged.
        let bez = "% g\nsc\n0 0 mt\n100 0 dt\n100 100 dt\n0 100 dt\ncp\ned\n";
        let font = square_font();
        let obs = NullObserver;
        let params = HintParams { allow_edit: false, ..HintParams::default() };
        let mut path = bez::parse(bez).unwrap();
        let before: Vec<_> = path.iter().map(|(_, e)| (e.x, e.y)).collect();
        let _ = hint_path(&mut path, &font, "g", &obs, &params).unwrap();
        let after: Vec<_> = path.iter().map(|(_, e)| (e.x, e.y)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn multiple_masters_preserve_element_count() {
        let font = FontInfo::new();
        let obs = NullObserver;
        let params = HintParams::default();
        let a = "% g\nsc\n0 0 mt\n100 0 dt\n100 100 dt\n0 100 dt\ncp\ned\n";
        let b = "% g\nsc\n0 0 mt\n200 0 dt\n200 300 dt\n0 300 dt\ncp\ned\n";
        let outs = hint_masters(&[a, b], &font, &obs, &params).unwrap();
        assert_eq!(outs.len(), 2);
        let pa = bez::parse(&outs[0]).unwrap();
        let pb = bez::parse(&outs[1]).unwrap();
        assert_eq!(pa.len(), pb.len());
    }
}
