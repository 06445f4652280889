// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Caller-visible diagnostics (§6 callbacks, §9 design notes)
//!
//! The source exposes `report`/`report_h_stem`/`report_v_stem`/
//! `report_char_zone`/`report_stem_zone`/`report_retry` as raw callback
//! pointers into process-wide globals. The rewrite collects them into one
//! [`Observer`] trait implemented by the embedder; `Context` (§4.K) invokes
//! it synchronously and never buffers diagnostics itself, matching §5's
//! "string buffers are owned by the core and valid only during the call"
//! contract (the `&str`s here borrow from short-lived formatting — an
//! embedder that needs to keep one must copy it).

/// Severity of a [`Observer::report`] diagnostic (§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

/// Caller-supplied sink for hinting diagnostics and stem/zone reports.
///
/// Every method has a default no-op body, matching the source's treatment
/// of reporting modes as optional (`gDoStems`/`gDoAligns` toggles): an
/// embedder only overrides what it cares about. Implementations must be
/// reentrant if the caller hints glyphs in parallel across `Context`s (§5) —
/// each call arrives from its own thread, never concurrently on one thread.
pub trait Observer {
    /// A free-form diagnostic at the given severity (`report`, §6).
    fn report(&self, _level: Level, _message: &str) {}

    /// A horizontal stem was chosen: `(top, bot)` in font units, plus the
    /// glyph name (`report_h_stem`, stem-reporting mode).
    fn report_h_stem(&self, _top: f64, _bot: f64, _name: &str) {}

    /// A vertical stem was chosen: `(right, left)` in font units
    /// (`report_v_stem`).
    fn report_v_stem(&self, _right: f64, _left: f64, _name: &str) {}

    /// A character (glyph) extreme fell in/near an alignment zone
    /// (`report_char_zone`, zone-reporting mode).
    fn report_char_zone(&self, _top: f64, _bot: f64, _name: &str) {}

    /// A stem edge fell in/near an alignment zone (`report_stem_zone`).
    fn report_stem_zone(&self, _top: f64, _bot: f64, _name: &str) {}

    /// The core is about to restart the per-glyph pipeline; the caller
    /// should discard reports buffered since the last call to this method
    /// (`report_retry`).
    fn report_retry(&self) {}
}

/// An [`Observer`] that discards everything — the default when a caller has
/// no use for diagnostics.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl Observer for NullObserver {}

/// An [`Observer`] that forwards `report` to the [`log`] crate at the
/// matching level and drops stem/zone/retry notifications — a reasonable
/// default for embedders that only want a log line on diagnostics (§1.R).
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingObserver;

impl Observer for LoggingObserver {
    fn report(&self, level: Level, message: &str) {
        match level {
            Level::Debug => log::debug!("{message}"),
            Level::Info => log::info!("{message}"),
            Level::Warning => log::warn!("{message}"),
            Level::Error => log::error!("{message}"),
        }
    }
}
