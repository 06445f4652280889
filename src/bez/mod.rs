// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! The textual "bez" curve/line format (§6)
//!
//! Out of the core's algorithmic scope per `spec.md` §1 ("a competent
//! implementer writes them in hours"), but a real crate ships the collaborator
//! alongside the engine it feeds, so both directions are implemented here:
//! [`parser`] turns bez text into a [`crate::path::Path`], [`writer`] turns a
//! hinted path plus its emitted hint buckets back into bez text. Grounded on
//! `read.c`/`write.c` in `original_source`.

pub mod parser;
pub mod writer;

pub use parser::parse;
pub use writer::write;
