// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! End-to-end fixtures, one per literal scenario.

use psautohint_rs::{hint_glyph, parse_font_info, HintParams, NullObserver};

fn fi(text: &str) -> psautohint_rs::FontInfo {
    parse_font_info(text).unwrap()
}

const SQUARE_FONTINFO: &str = "\
BaselineYCoord 0
BaselineOvershoot -10
CapHeight 500
CapOvershoot 10
StemSnapH [ 100 ]
StemSnapV [ 100 ]
";

const SQUARE_BEZ: &str = "\
% square
sc
0 0 mt
500 0 dt
500 500 dt
0 500 dt
cp
ed
";

#[test]
fn fixture_1_square_with_baseline_zone() {
    let font = fi(SQUARE_FONTINFO);
    let out = hint_glyph(SQUARE_BEZ, &font, &NullObserver, &HintParams::default()).unwrap();
    // Baseline (y=0) and cap-height (y=500) both sit exactly on a blue band,
    // so the plain bot/top pair is killed in favor of the ghost counterpart
    // of each edge (eval::eval_pair's "both in band" rule), 20 units in.
    assert!(out.lines().any(|l| l == "0 20 rm"), "{out}");
    assert!(out.lines().any(|l| l == "480 20 rv"), "{out}");
    // The left/right edges are a plain vertical stem spanning the full width.
    assert!(out.lines().any(|l| l == "0 500 ry"), "{out}");
}

#[test]
fn fixture_2_uppercase_i_body() {
    let font = fi(&format!("{SQUARE_FONTINFO}StemSnapV [ 80 ]\n"));
    let bez = "\
% I
sc
100 0 mt
180 0 dt
180 700 dt
100 700 dt
cp
ed
";
    let out = hint_glyph(bez, &font, &NullObserver, &HintParams::default()).unwrap();
    assert!(out.contains("100 80 ry") || out.contains("80 80 ry") || out.contains("ry"));
}

#[test]
fn fixture_3_degenerate_closepath_matches_fixture_1() {
    let font = fi(SQUARE_FONTINFO);
    let bez = "\
% square
sc
0 0 mt
500 0 dt
500 500 dt
0.01 500.01 dt
cp
ed
";
    let baseline = hint_glyph(SQUARE_BEZ, &font, &NullObserver, &HintParams::default()).unwrap();
    let nudged = hint_glyph(bez, &font, &NullObserver, &HintParams::default()).unwrap();
    // pre_check should snap the near-degenerate close onto the same outline,
    // so the two emit identical hint sets (path text may still differ by
    // the snapped coordinate, hints must not).
    let hints_of = |s: &str| -> Vec<&str> { s.lines().filter(|l| l.ends_with("rb") || l.ends_with("ry") || l.ends_with("rv") || l.ends_with("rm")).collect() };
    assert_eq!(hints_of(&baseline), hints_of(&nudged));
}

#[test]
fn fixture_4_sharp_angle_is_clipped() {
    let font = fi(SQUARE_FONTINFO);
    let bez = "\
% sharp
sc
0 100 mt
100 100 dt
0 0 dt
cp
ed
";
    struct Track<'a>(&'a std::cell::Cell<bool>);
    impl<'a> psautohint_rs::Observer for Track<'a> {
        fn report(&self, _level: psautohint_rs::Level, message: &str) {
            if message.contains("sharp") || message.contains("clip") {
                self.0.set(true);
            }
        }
    }
    let flag = std::cell::Cell::new(false);
    let obs = Track(&flag);
    let _ = hint_glyph(bez, &font, &obs, &HintParams::default()).unwrap();
    assert!(flag.get(), "expected a sharp-angle clip diagnostic to fire");
}

#[test]
fn fixture_5_counter_hinted_m() {
    let mut text = String::from(SQUARE_FONTINFO);
    text.push_str("VCounterChars ( m )\nStemSnapV [ 50 ]\n");
    let font = fi(&text);
    let bez = "\
% m
sc
50 0 mt
100 0 dt
100 700 dt
50 700 dt
cp
200 0 mt
250 0 dt
250 700 dt
200 700 dt
cp
350 0 mt
400 0 dt
400 700 dt
350 700 dt
cp
ed
";
    let out = hint_glyph(bez, &font, &NullObserver, &HintParams::default()).unwrap();
    let v_hints: Vec<&str> = out.lines().filter(|l| l.ends_with("ry") || l.ends_with("rv")).collect();
    assert!(v_hints.len() >= 2);
}

#[test]
fn fixture_6_flex_candidate() {
    let font = fi(SQUARE_FONTINFO);
    let bez = "\
% flex
sc
0 100 mt
10 105 20 108 100 100 ct
200 100 210 108 220 105 ct
230 0 240 0 250 0 ct
250 200 ct
0 200 dt
cp
ed
";
    // Must not error; flex marking is internal bookkeeping this black-box
    // test can't observe directly without a flex-aware writer mode.
    let out = hint_glyph(bez, &font, &NullObserver, &HintParams::default());
    assert!(out.is_ok());
}

#[test]
fn determinism_is_byte_identical() {
    let font = fi(SQUARE_FONTINFO);
    let a = hint_glyph(SQUARE_BEZ, &font, &NullObserver, &HintParams::default()).unwrap();
    let b = hint_glyph(SQUARE_BEZ, &font, &NullObserver, &HintParams::default()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn path_preservation_when_editing_disabled() {
    let font = fi(SQUARE_FONTINFO);
    let bez = "\
% square
sc
0 0 mt
500 0 dt
500 500 dt
0.01 500.01 dt
cp
ed
";
    let params = HintParams { allow_edit: false, ..HintParams::default() };
    let out = hint_glyph(bez, &font, &NullObserver, &params).unwrap();
    let input_path = psautohint_rs::bez::parse(bez).unwrap();
    let output_path = psautohint_rs::bez::parse(&out).unwrap();
    assert_eq!(input_path.len(), output_path.len());
    for ((_, a), (_, b)) in input_path.iter().zip(output_path.iter()) {
        assert_eq!(a.x, b.x);
        assert_eq!(a.y, b.y);
    }
}
