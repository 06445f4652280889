// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Hinted [`Path`] + hint buckets → bez text (§6)
//!
//! Grounded on `write.c`: a hint pair is written as its minimum coordinate
//! followed by the *width* (`max - min`), not the maximum — `WritePointItem`
//! computes `y0` then `y1 - y0` before emitting `rb`/`rv`, and the same for
//! `x0`/`x1 - x0` before `ry`/`rm`. Path elements are emitted with relative
//! operators (`rdt`/`hdt`/`vdt`/`rct`) to match the source's preference for
//! the shorter axis-constrained form whenever a delta is exactly zero on one
//! axis.

use crate::fixed::Fixed;
use crate::hint::{HintCode, HintPoint};
use crate::path::{EltKind, Path};

fn fmt_num(v: Fixed) -> String {
    let whole = v.0 / 256;
    let frac = (v.0 - whole * 256).abs();
    if frac == 0 {
        return whole.to_string();
    }
    // At most 2 fractional decimal digits (§6), rounded from 1/256ths.
    let hundredths = (frac as i64 * 100 + 128) / 256;
    format!("{whole}.{hundredths:02}")
}

fn write_hint(out: &mut String, p: &HintPoint) {
    let (lo, hi) = (p.v1.min(p.v2), p.v1.max(p.v2));
    let width = hi - lo;
    out.push_str(&fmt_num(lo));
    out.push(' ');
    out.push_str(&fmt_num(width));
    out.push_str(" r");
    out.push(p.code.as_char());
    out.push('\n');
}

fn write_bucket(out: &mut String, bucket: &[HintPoint]) {
    for p in bucket {
        write_hint(out, p);
    }
}

/// Emit one operator with its (already relative, where applicable) operands.
fn emit(out: &mut String, nums: &[Fixed], op: &str) {
    for n in nums {
        out.push_str(&fmt_num(*n));
        out.push(' ');
    }
    out.push_str(op);
    out.push('\n');
}

/// Write a hinted path plus its substitution buckets as bez text. `buckets`
/// is the `Vec<Vec<HintPoint>>` produced by
/// [`crate::substitute::auto_extra_hints`]; `buckets[0]` is emitted before
/// `sc` and every other bucket is wrapped in a `beginsubr`/`endsubr`
/// substitution block at the path element that triggers it.
pub fn write(glyph_name: &str, path: &Path, buckets: &[Vec<HintPoint>]) -> String {
    let mut out = String::new();
    out.push_str("% ");
    out.push_str(glyph_name);
    out.push('\n');

    if let Some(bucket0) = buckets.first() {
        write_bucket(&mut out, bucket0);
    }
    out.push_str("sc\n");

    let mut cur = (Fixed::ZERO, Fixed::ZERO);
    for (_, elt) in path.iter() {
        match elt.kind {
            EltKind::Move => {
                emit(&mut out, &[elt.x, elt.y], "mt");
                cur = (elt.x, elt.y);
            }
            EltKind::Line => {
                let (dx, dy) = (elt.x - cur.0, elt.y - cur.1);
                if dx == Fixed::ZERO {
                    emit(&mut out, &[dy], "vdt");
                } else if dy == Fixed::ZERO {
                    emit(&mut out, &[dx], "hdt");
                } else {
                    emit(&mut out, &[dx, dy], "rdt");
                }
                cur = (elt.x, elt.y);
            }
            EltKind::Curve => {
                let d1 = (elt.x1 - cur.0, elt.y1 - cur.1);
                let d2 = (elt.x2 - elt.x1, elt.y2 - elt.y1);
                let d3 = (elt.x - elt.x2, elt.y - elt.y2);
                emit(&mut out, &[d1.0, d1.1, d2.0, d2.1, d3.0, d3.1], "rct");
                cur = (elt.x, elt.y);
            }
            EltKind::Close => {
                out.push_str("cp\n");
            }
        }
        if elt.new_hints != 0 {
            if let Some(bucket) = buckets.get(elt.new_hints as usize) {
                out.push_str("beginsubr snc\n");
                write_bucket(&mut out, bucket);
                out.push_str("endsubr enc\n");
                out.push_str("newcolors\n");
            }
        }
    }

    out.push_str("ed\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::EltKind;

    #[test]
    fn hint_pair_written_as_min_and_width() {
        let mut out = String::new();
        let p = HintPoint { code: HintCode::B, v1: Fixed::from_int(10), v2: Fixed::from_int(90) };
        write_hint(&mut out, &p);
        assert_eq!(out, "10 80 rb\n");
    }

    #[test]
    fn square_round_trips_through_parser() {
        let mut path = Path::new();
        path.append_move_or_line(EltKind::Move, Fixed::from_int(0), Fixed::from_int(0));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(100), Fixed::from_int(0));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(100), Fixed::from_int(100));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(0), Fixed::from_int(100));
        path.append_close();

        let text = write("A", &path, &[]);
        let reparsed = super::super::parser::parse(&text).unwrap();
        assert_eq!(reparsed.count_subpaths(), 1);
        assert_eq!(reparsed.len(), path.len());
    }

    #[test]
    fn axis_aligned_line_uses_hdt() {
        let mut path = Path::new();
        path.append_move_or_line(EltKind::Move, Fixed::from_int(0), Fixed::from_int(0));
        path.append_move_or_line(EltKind::Line, Fixed::from_int(50), Fixed::from_int(0));
        let text = write("A", &path, &[]);
        assert!(text.contains("hdt"));
    }
}
