// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Font-info text → [`FontInfo`] (§6)
//!
//! The format is a flat `key value` list, one pair per logical entry, values
//! either a bare token, a `[ ... ]` integer array (`DominantV`/`StemSnapV`
//! and friends), or a `( ... )` parenthesized name list (`VCounterChars`).
//! Grounded on `fontinfo.c`'s `GetFontInfo`/`ParseStems`/
//! `AddCounterHintGlyphs`, which this mirrors key-by-key.

use std::collections::HashMap;

use crate::error::FontInfoParseError;
use crate::fixed::Fixed;
use crate::fontinfo::{Band, FontInfo, DEFAULT_BLUE_FUZZ};

/// Tokenize into `key`, raw-value pairs. A value is either the remainder of
/// the line up to the next recognized key, or (for `[`/`(`) everything up to
/// the matching closing bracket, which may span multiple lines.
fn tokenize(text: &str) -> Result<HashMap<String, String>, FontInfoParseError> {
    let mut entries = HashMap::new();
    let mut line = 1usize;

    // Split the whole text into whitespace-delimited tokens while tracking
    // line numbers, then group each key with the token(s) that follow it.
    let mut tokens: Vec<(usize, &str)> = Vec::new();
    let mut start: Option<usize> = None;
    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push((line, &text[s..i]));
            }
            if ch == '\n' {
                line += 1;
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push((line, &text[s..text.len()]));
    }

    let mut i = 0;
    while i < tokens.len() {
        let (key_line, key) = tokens[i];
        i += 1;
        if i >= tokens.len() {
            return Err(FontInfoParseError::MalformedLine {
                line: key_line,
                text: key.to_string(),
            });
        }
        let (_, first) = tokens[i];
        if first.starts_with('[') {
            let mut collected = String::new();
            loop {
                if i >= tokens.len() {
                    return Err(FontInfoParseError::UnterminatedArray {
                        key: key.to_string(),
                        line: key_line,
                    });
                }
                let (_, tok) = tokens[i];
                collected.push_str(tok);
                collected.push(' ');
                i += 1;
                if tok.ends_with(']') {
                    break;
                }
            }
            entries.insert(key.to_string(), collected.trim().to_string());
        } else if first.starts_with('(') {
            let mut collected = String::new();
            loop {
                if i >= tokens.len() {
                    return Err(FontInfoParseError::UnterminatedList {
                        key: key.to_string(),
                        line: key_line,
                    });
                }
                let (_, tok) = tokens[i];
                collected.push_str(tok);
                collected.push(' ');
                i += 1;
                if tok.ends_with(')') {
                    break;
                }
            }
            entries.insert(key.to_string(), collected.trim().to_string());
        } else {
            entries.insert(key.to_string(), first.to_string());
            i += 1;
        }
    }
    Ok(entries)
}

fn int_value(entries: &HashMap<String, String>, key: &str) -> Result<Option<i32>, FontInfoParseError> {
    match entries.get(key) {
        None => Ok(None),
        Some(v) => v.parse::<i32>().map(Some).map_err(|_| FontInfoParseError::InvalidInteger {
            key: key.to_string(),
            value: v.clone(),
        }),
    }
}

fn bool_value(entries: &HashMap<String, String>, key: &str, default: bool) -> bool {
    match entries.get(key).map(|s| s.as_str()) {
        None => default,
        Some("") => default,
        Some("false") => false,
        Some(_) => true,
    }
}

fn band(entries: &HashMap<String, String>, base_key: &str, overshoot_key: &str) -> Result<Option<Band>, FontInfoParseError> {
    let base = int_value(entries, base_key)?;
    let overshoot = int_value(entries, overshoot_key)?;
    match (base, overshoot) {
        (Some(b), Some(o)) => Ok(Some(Band::new(Fixed::from_int(b), Fixed::from_int(b + o)))),
        _ => Ok(None),
    }
}

fn int_array(entries: &HashMap<String, String>, key: &str) -> Result<Vec<Fixed>, FontInfoParseError> {
    let Some(raw) = entries.get(key) else {
        return Ok(Vec::new());
    };
    let inner = raw.trim_start_matches('[').trim_end_matches(']');
    let mut out = Vec::new();
    for tok in inner.split_whitespace() {
        let n: i32 = tok.parse().map_err(|_| FontInfoParseError::InvalidInteger {
            key: key.to_string(),
            value: tok.to_string(),
        })?;
        out.push(Fixed::from_int(n));
    }
    Ok(out)
}

fn name_list(entries: &HashMap<String, String>, key: &str) -> Vec<String> {
    let Some(raw) = entries.get(key) else {
        return Vec::new();
    };
    let inner = raw.trim_start_matches('(').trim_end_matches(')');
    inner.split_whitespace().map(|s| s.to_string()).collect()
}

/// Parse flat font-info text (§6) into a [`FontInfo`].
///
/// `StemSnapH`/`StemSnapV` take priority over `DominantH`/`DominantV` when
/// both are present (`fontinfo.c` only falls back to `Dominant*` when the
/// snap list came back empty).
pub fn parse(text: &str) -> Result<FontInfo, FontInfoParseError> {
    let entries = tokenize(text)?;
    let mut fi = FontInfo::new();

    fi.h_stems = int_array(&entries, "StemSnapH")?;
    if fi.h_stems.is_empty() {
        fi.h_stems = int_array(&entries, "DominantH")?;
    }
    fi.v_stems = int_array(&entries, "StemSnapV")?;
    if fi.v_stems.is_empty() {
        fi.v_stems = int_array(&entries, "DominantV")?;
    }

    fi.flex_ok = bool_value(&entries, "FlexOK", false);
    fi.flex_strict = bool_value(&entries, "FlexStrict", true);

    if let Some(fuzz) = int_value(&entries, "BlueFuzz")? {
        fi.blue_fuzz = Fixed::from_int(fuzz);
    } else {
        fi.blue_fuzz = Fixed::from_int(DEFAULT_BLUE_FUZZ);
    }

    fi.v_counter_chars = name_list(&entries, "VCounterChars");
    fi.h_counter_chars = name_list(&entries, "HCounterChars");

    // Bottom bands: baseline family + descender.
    for (base_key, over_key) in [
        ("BaselineYCoord", "BaselineOvershoot"),
        ("Baseline5", "Baseline5Overshoot"),
        ("Baseline6", "Baseline6Overshoot"),
        ("SuperiorBaseline", "SuperiorOvershoot"),
        ("OrdinalBaseline", "OrdinalOvershoot"),
        ("DescenderHeight", "DescenderOvershoot"),
    ] {
        if let Some(b) = band(&entries, base_key, over_key)? {
            fi.bot_bands.push(b);
        }
    }

    // Top bands: cap/lowercase/ascender family.
    for (base_key, over_key) in [
        ("CapHeight", "CapOvershoot"),
        ("LcHeight", "LcOvershoot"),
        ("AscenderHeight", "AscenderOvershoot"),
    ] {
        if let Some(b) = band(&entries, base_key, over_key)? {
            fi.top_bands.push(b);
        }
    }

    Ok(fi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bands_and_stems() {
        let text = "BaselineYCoord 0\nBaselineOvershoot -10\nCapHeight 700\nCapOvershoot 10\nStemSnapH [ 40 60 ]\nBlueFuzz 2\n";
        let fi = parse(text).unwrap();
        assert_eq!(fi.bot_bands.len(), 1);
        assert_eq!(fi.top_bands.len(), 1);
        assert_eq!(fi.h_stems, vec![Fixed::from_int(40), Fixed::from_int(60)]);
        assert_eq!(fi.blue_fuzz, Fixed::from_int(2));
    }

    #[test]
    fn dominant_is_fallback_for_stem_snap() {
        let text = "DominantV [ 90 ]\n";
        let fi = parse(text).unwrap();
        assert_eq!(fi.v_stems, vec![Fixed::from_int(90)]);
    }

    #[test]
    fn counter_chars_parsed_from_paren_list() {
        let text = "VCounterChars ( m M w W )\n";
        let fi = parse(text).unwrap();
        assert_eq!(fi.v_counter_chars, vec!["m", "M", "w", "W"]);
    }

    #[test]
    fn flex_ok_defaults_false_unless_set() {
        assert!(!parse("").unwrap().flex_ok);
        assert!(parse("FlexOK true\n").unwrap().flex_ok);
        assert!(!parse("FlexOK false\n").unwrap().flex_ok);
    }

    #[test]
    fn invalid_integer_is_reported() {
        let text = "BlueFuzz notanumber\n";
        assert!(matches!(parse(text), Err(FontInfoParseError::InvalidInteger { .. })));
    }
}
