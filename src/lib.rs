// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Automatic PostScript/Type1 glyph hinting engine
//!
//! Given a glyph outline (as bez text, §6) and a font's alignment-zone and
//! stem-width model ([`FontInfo`]), this crate derives the horizontal and
//! vertical hints — and, for multiple-master fonts, the hint-substitution
//! ("new colors") points required to keep hints consistent across masters
//! with differing outlines but matching topology.
//!
//! The pipeline is driven by [`hint_glyph`] (single master) or
//! [`hint_masters`] (a multiple-master family), both built from the modules
//! below:
//!
//! - [`path`]: the doubly-linked outline representation hints are computed
//!   against and, where §4.I permits, locally repaired.
//! - [`segment`]: turns path elements into the four ordered H/V segment
//!   lists candidate stems are built from.
//! - [`eval`]: scores every plausible stem as a weighted [`eval::HintVal`].
//! - [`prune`]/[`pick`]: collapse near-duplicate candidates and greedily
//!   select a non-conflicting set per axis.
//! - [`editor`]: the bounded set of structural repairs (§4.I) the
//!   orchestration loop may apply between hinting attempts.
//! - [`substitute`]: hint-substitution planning (§4.J) once a stable pick is
//!   reached.
//! - [`mm`]: point-provenance classification and value transfer for
//!   multiple-master hint reuse (§4.L).
//! - [`context`]: orchestration (§4.K) tying the above into `hint_glyph`/
//!   `hint_masters`.
//!
//! Diagnostics are reported through the [`Observer`] trait rather than
//! returned inline, so embedders can route them to a log, a UI, or nowhere
//! ([`NullObserver`]) without threading extra plumbing through the pipeline.

mod conv;
mod fixed;
mod geometry;
mod path;
mod fontinfo;
mod fontinfo_parse;
mod segment;
mod eval;
mod prune;
mod pick;
mod editor;
mod substitute;
mod mm;
mod hint;
mod report;
mod error;
mod context;

pub mod bez;

pub use context::{hint_glyph, hint_masters, HintParams};
pub use error::{BezParseError, Error, FontInfoParseError, HintingError};
pub use fixed::Fixed;
pub use fontinfo::{Band, FontInfo};
pub use fontinfo_parse::parse as parse_font_info;
pub use hint::{HintCode, HintPoint};
pub use path::Path;
pub use report::{Level, LoggingObserver, NullObserver, Observer};
