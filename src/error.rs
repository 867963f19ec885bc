//! Engine error types
//!
//! Mirrors the recoverable/fatal split from the design: most anomalies a host
//! program can trigger (missing shadow, unknown width) are resolved silently
//! deeper in the stack and never reach here. What does reach here are the
//! handful of conditions §7 of the design calls genuinely impossible.

use std::io;
use thiserror::Error;

/// Errors surfaced by the shadow-execution engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An instrumentation-level invariant was violated: e.g. a temp slot
    /// was stored into while the static tracker still considered it
    /// `Single`/`Double`, or a shadow temp was constructed with an
    /// unsupported lane count. These indicate a bug in the emitter or
    /// executor, never host-program behaviour.
    #[error("shadow engine invariant violated: {0}")]
    Invariant(&'static str),

    /// The report file could not be opened for writing. The run continues;
    /// no report is written.
    #[error("failed to open report file: {0}")]
    ReportIo(#[from] io::Error),
}

impl EngineError {
    /// Build an [`EngineError::Invariant`] from a static description.
    pub const fn invariant(msg: &'static str) -> Self {
        Self::Invariant(msg)
    }
}

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;
