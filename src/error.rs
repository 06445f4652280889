// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Error taxonomy (§7)
//!
//! Four kinds in the source: ParseFail, Fatal, Nonfatal diagnostic, and
//! Cancel (never constructed — §7 "Cancel: never"). Nonfatal diagnostics
//! never become an `Error`; they flow through [`crate::report::Observer`]
//! at [`crate::report::Level::Warning`] and never interrupt the pipeline.

use thiserror::Error;

/// Bez text failed to parse (`ParseFail`, §7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BezParseError {
    #[error("unexpected token {token:?} at line {line}")]
    UnexpectedToken { token: String, line: usize },
    #[error("operand stack underflow for operator {op:?} at line {line}")]
    StackUnderflow { op: String, line: usize },
    #[error("operand stack has {count} leftover values at end of glyph")]
    StackOverflow { count: usize },
    #[error("malformed fixed-point literal {literal:?} at line {line}")]
    BadNumber { literal: String, line: usize },
    #[error("glyph body ended ('ed') without a matching 'sc'")]
    UnmatchedEnd,
    #[error("'cp' with no open subpath")]
    CloseWithoutMove,
}

/// Font-info text failed to parse (`ParseFail`, §7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FontInfoParseError {
    #[error("malformed key-value line {line}: {text:?}")]
    MalformedLine { line: usize, text: String },
    #[error("unterminated array for key {key:?} starting at line {line}")]
    UnterminatedArray { key: String, line: usize },
    #[error("unterminated name list for key {key:?} starting at line {line}")]
    UnterminatedList { key: String, line: usize },
    #[error("invalid integer {value:?} for key {key:?}")]
    InvalidInteger { key: String, value: String },
}

/// Resource exhaustion or structural impossibility (`Fatal`, §7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HintingError {
    #[error("glyph path has no subpaths to hint")]
    EmptyPath,
    #[error("path element {0:?} opens a subpath with no matching closepath")]
    UnclosedSubpath(crate::path::ElementId),
    #[error("possible infinite loop detected while walking the path (all-tiny subpath)")]
    PathLoop,
    #[error("multiple-master inputs have mismatched path topology: {0}")]
    TopologyMismatch(String),
}

/// Top-level error returned by [`crate::context::hint_glyph`] /
/// [`crate::context::hint_masters`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Bez(#[from] BezParseError),
    #[error(transparent)]
    FontInfo(#[from] FontInfoParseError),
    #[error(transparent)]
    Hinting(#[from] HintingError),
}
