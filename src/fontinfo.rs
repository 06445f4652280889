// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Per-font metric and alignment-zone model (§3, §4.C)
//!
//! `FontInfo` is built once per font (or once per glyph call, for simple
//! embedders) from the flat key-value text format (§6, parsed by
//! [`crate::fontinfo_parse`]) and is read-only thereafter: it is `Clone`
//! (cheap — a handful of small `Vec`s) so that parallel callers can each hold
//! their own copy without synchronization, matching the "no shared mutable
//! state" requirement of §5.

use crate::fixed::Fixed;

/// A top or bottom alignment band: `(overshoot, base)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Band {
    pub overshoot: Fixed,
    pub base: Fixed,
}

impl Band {
    pub fn new(base: Fixed, overshoot: Fixed) -> Band {
        Band { overshoot, base }
    }

    fn lo(&self) -> Fixed {
        self.base.min(self.overshoot)
    }
    fn hi(&self) -> Fixed {
        self.base.max(self.overshoot)
    }
}

/// Outcome of testing a coordinate against a font's alignment bands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneTest {
    /// Inside `[base - blue_fuzz, overshoot + blue_fuzz]` of some band.
    InZone,
    /// Within 6 units below or above a band, but not in it — a near miss,
    /// worth a diagnostic.
    NearMiss,
    None,
}

/// Alignment zones, known stem widths, flex permission, and counter-hint
/// glyph lists, parsed once from a font's `fontinfo` text (§3 `FontInfo`).
#[derive(Clone, Debug, Default)]
pub struct FontInfo {
    pub top_bands: Vec<Band>,
    pub bot_bands: Vec<Band>,
    pub blue_fuzz: Fixed,

    pub h_stems: Vec<Fixed>,
    pub v_stems: Vec<Fixed>,

    pub flex_ok: bool,
    pub flex_strict: bool,

    pub h_counter_chars: Vec<String>,
    pub v_counter_chars: Vec<String>,
}

/// Default blue fuzz, per §6 (`BlueFuzz`, default 1 unit).
pub const DEFAULT_BLUE_FUZZ: i32 = 1;

/// Distance (units) defining a "near miss" below/above a band (§4.C).
const NEAR_MISS_RANGE: i32 = 6;
/// Distance (units) defining a near miss on a known stem width (§4.C).
const STEM_NEAR_MISS_RANGE: i32 = 2;

impl FontInfo {
    pub fn new() -> FontInfo {
        FontInfo {
            blue_fuzz: Fixed::from_int(DEFAULT_BLUE_FUZZ),
            ..Default::default()
        }
    }

    fn test_bands(&self, loc: Fixed, bands: &[Band]) -> ZoneTest {
        for b in bands {
            let lo = b.lo() - self.blue_fuzz;
            let hi = b.hi() + self.blue_fuzz;
            if loc >= lo && loc <= hi {
                return ZoneTest::InZone;
            }
            let near_lo = b.lo() - Fixed::from_int(NEAR_MISS_RANGE);
            let near_hi = b.hi() + Fixed::from_int(NEAR_MISS_RANGE);
            if loc >= near_lo && loc <= near_hi {
                return ZoneTest::NearMiss;
            }
        }
        ZoneTest::None
    }

    /// Test a horizontal (y) coordinate against the bottom bands.
    pub fn test_bot_band(&self, y: Fixed) -> ZoneTest {
        self.test_bands(y, &self.bot_bands)
    }

    /// Test a horizontal (y) coordinate against the top bands.
    pub fn test_top_band(&self, y: Fixed) -> ZoneTest {
        self.test_bands(y, &self.top_bands)
    }

    pub fn in_blue_band(&self, y: Fixed) -> bool {
        matches!(self.test_bot_band(y), ZoneTest::InZone) || matches!(self.test_top_band(y), ZoneTest::InZone)
    }

    /// Does `width` exactly match a declared stem width? Returns
    /// `(exact, near_miss)`.
    fn stem_match(width: Fixed, stems: &[Fixed]) -> (bool, bool) {
        let w = width.abs();
        let mut near = false;
        for &s in stems {
            if w == s {
                return (true, false);
            }
            if (w - s).abs().0 <= STEM_NEAR_MISS_RANGE * 256 {
                near = true;
            }
        }
        (false, near)
    }

    pub fn h_stem_match(&self, width: Fixed) -> (bool, bool) {
        Self::stem_match(width, &self.h_stems)
    }
    pub fn v_stem_match(&self, width: Fixed) -> (bool, bool) {
        Self::stem_match(width, &self.v_stems)
    }

    pub fn is_v_counter_glyph(&self, name: &str) -> bool {
        self.v_counter_chars.iter().any(|n| n == name)
    }
    pub fn is_h_counter_glyph(&self, name: &str) -> bool {
        self.h_counter_chars.iter().any(|n| n == name)
    }

    /// Largest declared stem width on an axis, used to derive the
    /// "big distance" threshold in pair evaluation (§4.E).
    pub fn max_h_stem(&self) -> Fixed {
        self.h_stems.iter().copied().fold(Fixed::ZERO, Fixed::max)
    }
    pub fn max_v_stem(&self) -> Fixed {
        self.v_stems.iter().copied().fold(Fixed::ZERO, Fixed::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_test_classifies_in_zone_and_near_miss() {
        let mut fi = FontInfo::new();
        fi.bot_bands.push(Band::new(Fixed::from_int(0), Fixed::from_int(-10)));
        assert_eq!(fi.test_bot_band(Fixed::from_int(0)), ZoneTest::InZone);
        assert_eq!(fi.test_bot_band(Fixed::from_int(-13)), ZoneTest::InZone);
        assert_eq!(fi.test_bot_band(Fixed::from_int(-18)), ZoneTest::NearMiss);
        assert_eq!(fi.test_bot_band(Fixed::from_int(-30)), ZoneTest::None);
    }

    #[test]
    fn stem_match_exact_and_near() {
        let mut fi = FontInfo::new();
        fi.h_stems.push(Fixed::from_int(100));
        assert_eq!(fi.h_stem_match(Fixed::from_int(100)), (true, false));
        assert_eq!(fi.h_stem_match(Fixed::from_int(101)), (false, true));
        assert_eq!(fi.h_stem_match(Fixed::from_int(200)), (false, false));
    }
}
