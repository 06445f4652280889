// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! bez text → [`Path`] (§6)
//!
//! A small stack-based interpreter, grounded on `read.c`'s `DoName`/`Pop`/
//! `Push` dispatch: every operator pops its operands off a numeric stack (in
//! the same order the source does) and appends a [`PathElement`]. Existing
//! hint annotations on the input (`rb`/`ry`/`rv`/`rm` pairs, `beginsubr snc
//! ... endsubr enc`, `newcolors`) are recognized and discarded — the engine
//! always re-derives its own hints — matching `read.c`'s `Pop2()` treatment
//! of the `r*` operators.

use crate::error::BezParseError;
use crate::fixed::Fixed;
use crate::path::{EltKind, Path};

const STACK_MAX: usize = 48;

/// Comments (`% ...`) are stripped before tokenizing.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let stripped = match line.find('%') {
            Some(i) => &line[..i],
            None => line,
        };
        out.push_str(stripped);
        out.push('\n');
    }
    out
}

/// The glyph name, taken from the first `%`-comment of the input (`read.c`'s
/// `gGlyphName`), if present.
pub fn glyph_name(text: &str) -> Option<String> {
    for line in text.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix('%') {
            let name = rest.trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

struct Interp {
    stack: Vec<Fixed>,
    cur: (Fixed, Fixed),
    flex: bool,
    started: bool,
    ended: bool,
    path: Path,
    line: usize,
    op: String,
}

impl Interp {
    fn pop(&mut self) -> Result<Fixed, BezParseError> {
        self.stack.pop().ok_or(BezParseError::StackUnderflow {
            op: self.op.to_string(),
            line: self.line,
        })
    }

    fn pop2(&mut self) -> Result<(Fixed, Fixed), BezParseError> {
        let y = self.pop()?;
        let x = self.pop()?;
        Ok((x, y))
    }

    fn push(&mut self, v: Fixed) -> Result<(), BezParseError> {
        if self.stack.len() >= STACK_MAX {
            return Err(BezParseError::StackOverflow { count: self.stack.len() });
        }
        self.stack.push(v);
        Ok(())
    }

    fn moveto(&mut self, x: Fixed, y: Fixed) {
        self.cur = (x, y);
        self.path.append_move_or_line(EltKind::Move, x, y);
    }
    fn lineto(&mut self, x: Fixed, y: Fixed) {
        self.cur = (x, y);
        self.path.append_move_or_line(EltKind::Line, x, y);
    }
    fn curveto(&mut self, c1: (Fixed, Fixed), c2: (Fixed, Fixed), c3: (Fixed, Fixed)) {
        self.cur = c3;
        self.path.append_curve(c1.0, c1.1, c2.0, c2.1, c3.0, c3.1);
    }

    /// Relative curve (`Rct`): each operand is a delta from the position
    /// reached by the previous one, not from the curve's start.
    fn rcurveto(&mut self, d1: (Fixed, Fixed), d2: (Fixed, Fixed), d3: (Fixed, Fixed)) {
        let c1 = (self.cur.0 + d1.0, self.cur.1 + d1.1);
        let c2 = (c1.0 + d2.0, c1.1 + d2.1);
        let c3 = (c2.0 + d3.0, c2.1 + d3.1);
        self.curveto(c1, c2, c3);
    }
}

/// Parse a fixed-point decimal with at most 2 fractional digits, or a plain
/// integer (§6).
fn parse_number(tok: &str, line: usize) -> Result<Fixed, BezParseError> {
    if let Ok(n) = tok.parse::<i32>() {
        return Ok(Fixed::from_int(n));
    }
    if let Ok(f) = tok.parse::<f64>() {
        return Ok(Fixed::from_f64(f));
    }
    Err(BezParseError::BadNumber {
        literal: tok.to_string(),
        line,
    })
}

/// Parse bez text into a [`Path`] (§6). Hint-substitution preambles and
/// pre-existing hint pairs are recognized and dropped; the engine re-derives
/// its own hints from the resulting outline.
pub fn parse(text: &str) -> Result<Path, BezParseError> {
    let cleaned = strip_comments(text);
    let mut interp = Interp {
        stack: Vec::with_capacity(STACK_MAX),
        cur: (Fixed::ZERO, Fixed::ZERO),
        flex: false,
        started: false,
        ended: false,
        path: Path::new(),
        line: 1,
        op: String::new(),
    };

    for (lineno, line) in cleaned.lines().enumerate() {
        interp.line = lineno + 1;
        for tok in line.split_whitespace() {
            interp.op = tok.to_string();
            dispatch(&mut interp, tok)?;
        }
    }

    if interp.started && !interp.ended {
        return Err(BezParseError::UnmatchedEnd);
    }
    Ok(interp.path)
}

fn dispatch(interp: &mut Interp, tok: &str) -> Result<(), BezParseError> {
    match tok {
        "sc" => {
            interp.started = true;
            Ok(())
        }
        "ed" => {
            interp.ended = true;
            Ok(())
        }
        "mt" => {
            let (x, y) = interp.pop2()?;
            interp.moveto(x, y);
            Ok(())
        }
        "rmt" => {
            let (dx, dy) = interp.pop2()?;
            if !interp.flex {
                let (x, y) = (interp.cur.0 + dx, interp.cur.1 + dy);
                interp.moveto(x, y);
            }
            Ok(())
        }
        "hmt" => {
            let dx = interp.pop()?;
            let (x, y) = (interp.cur.0 + dx, interp.cur.1);
            interp.moveto(x, y);
            Ok(())
        }
        "vmt" => {
            let dy = interp.pop()?;
            let (x, y) = (interp.cur.0, interp.cur.1 + dy);
            interp.moveto(x, y);
            Ok(())
        }
        "dt" => {
            let (x, y) = interp.pop2()?;
            interp.lineto(x, y);
            Ok(())
        }
        "rdt" => {
            let (dx, dy) = interp.pop2()?;
            let (x, y) = (interp.cur.0 + dx, interp.cur.1 + dy);
            interp.lineto(x, y);
            Ok(())
        }
        "hdt" => {
            let dx = interp.pop()?;
            let (x, y) = (interp.cur.0 + dx, interp.cur.1);
            interp.lineto(x, y);
            Ok(())
        }
        "vdt" => {
            let dy = interp.pop()?;
            let (x, y) = (interp.cur.0, interp.cur.1 + dy);
            interp.lineto(x, y);
            Ok(())
        }
        "ct" => {
            let c3 = interp.pop2()?;
            let c2 = interp.pop2()?;
            let c1 = interp.pop2()?;
            interp.curveto(c1, c2, c3);
            Ok(())
        }
        "rct" => {
            let d3 = interp.pop2()?;
            let d2 = interp.pop2()?;
            let d1 = interp.pop2()?;
            interp.rcurveto(d1, d2, d3);
            Ok(())
        }
        "hvct" => {
            // c1 = (dx1, 0); c2 = (dx2, dy2); c3 = (0, dy3).
            let dy3 = interp.pop()?;
            let d2 = interp.pop2()?;
            let dx1 = interp.pop()?;
            interp.rcurveto((dx1, Fixed::ZERO), d2, (Fixed::ZERO, dy3));
            Ok(())
        }
        "vhct" => {
            // c1 = (0, dy1); c2 = (dx2, dy2); c3 = (dx3, 0).
            let dx3 = interp.pop()?;
            let d2 = interp.pop2()?;
            let dy1 = interp.pop()?;
            interp.rcurveto((Fixed::ZERO, dy1), d2, (dx3, Fixed::ZERO));
            Ok(())
        }
        "cp" => {
            if interp.path.tail().is_none() {
                return Err(BezParseError::CloseWithoutMove);
            }
            interp.path.append_close();
            Ok(())
        }
        "div" => {
            let b = interp.pop()?;
            let a = interp.pop()?;
            if b == Fixed::ZERO {
                return Err(BezParseError::BadNumber {
                    literal: "div by zero".to_string(),
                    line: interp.line,
                });
            }
            interp.push(a.div(b))
        }
        "preflx1" | "preflx2" => {
            interp.flex = true;
            Ok(())
        }
        "flx" => {
            // 7 historical rmoveto-equivalent pairs worth of operands precede
            // the two relative curves in the source's `flx` operator; the
            // first 5 scalars are legacy flex-height bookkeeping this parser
            // doesn't need, so they're discarded like `read.c`'s `psFLX`.
            for _ in 0..5 {
                interp.pop()?;
            }
            let d6 = interp.pop2()?;
            let d5 = interp.pop2()?;
            let d4 = interp.pop2()?;
            let d3 = interp.pop2()?;
            let d2 = interp.pop2()?;
            let d1 = interp.pop2()?;
            interp.rcurveto(d1, d2, d3);
            interp.rcurveto(d4, d5, d6);
            interp.flex = false;
            Ok(())
        }
        "sol" | "eol" => Ok(()),
        "beginsubr" | "endsubr" | "snc" | "enc" | "newcolors" => Ok(()),
        "id" => {
            interp.pop()?;
            Ok(())
        }
        "rb" | "ry" | "rv" | "rm" => {
            // Pre-existing hint pair: drop both operands (`read.c`'s
            // `Pop2()` for the `r*` hint operators).
            interp.pop()?;
            interp.pop()?;
            Ok(())
        }
        _ => {
            // Bare numeric literal: push it.
            let v = parse_number(tok, interp.line)?;
            interp.push(v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_square() {
        let bez = "% A\nsc\n0 0 mt\n500 0 dt\n500 500 dt\n0 500 dt\ncp\ned\n";
        let path = parse(bez).unwrap();
        assert_eq!(path.count_subpaths(), 1);
        assert_eq!(path.len(), 5); // mt + 3*dt + cp
    }

    #[test]
    fn glyph_name_from_leading_comment() {
        let bez = "% A\nsc\n0 0 mt\ncp\ned\n";
        assert_eq!(glyph_name(bez).as_deref(), Some("A"));
    }

    #[test]
    fn relative_operators_accumulate() {
        let bez = "sc\n100 100 mt\n50 0 rdt\n0 50 rdt\ncp\ned\n";
        let path = parse(bez).unwrap();
        let ids: Vec<_> = path.iter().map(|(id, _)| id).collect();
        let second = path.get(ids[1]);
        assert_eq!(second.x, Fixed::from_int(150));
        assert_eq!(second.y, Fixed::from_int(100));
    }

    #[test]
    fn close_without_move_errors() {
        let bez = "sc\ncp\ned\n";
        assert!(matches!(parse(bez), Err(BezParseError::CloseWithoutMove)));
    }

    #[test]
    fn hint_pairs_are_dropped() {
        let bez = "sc\n0 50 rb\n0 0 mt\n100 0 dt\ncp\ned\n";
        let path = parse(bez).unwrap();
        assert_eq!(path.len(), 3);
    }
}
