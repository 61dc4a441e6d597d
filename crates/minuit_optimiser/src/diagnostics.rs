//! Diagnostics reporting.
//!
//! The algorithms never log through a global: every noteworthy event (a
//! matrix forced positive-definite, a failed Hesse, a contour point that
//! could not be found, ...) is packaged as a [`Diagnostic`] and handed to
//! the [`DiagnosticSink`] of the current run.
//!
//! - [`TracingSink`] forwards to `tracing` under the `minuit` target (default)
//! - [`CollectingSink`] records diagnostics for later inspection
//! - [`NullSink`] discards them

use std::sync::Mutex;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Progress detail.
    Debug,
    /// Noteworthy but expected event.
    Info,
    /// Degraded result (fallback taken, limit reached).
    Warn,
}

/// A single diagnostic record.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Severity.
    pub level: Level,
    /// Component that emitted the record, e.g. `"MnHesse"`.
    pub source: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Debug-level record.
    pub fn debug(source: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: Level::Debug,
            source,
            message: message.into(),
        }
    }

    /// Info-level record.
    pub fn info(source: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            source,
            message: message.into(),
        }
    }

    /// Warning-level record.
    pub fn warn(source: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: Level::Warn,
            source,
            message: message.into(),
        }
    }
}

/// Receiver of diagnostics.
///
/// Sinks are shared by reference across a run (and across threads when
/// MINOS errors are computed in parallel), hence `Send + Sync`.
pub trait DiagnosticSink: Send + Sync {
    /// Handle one record.
    fn emit(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, d: Diagnostic) {
        match d.level {
            Level::Debug => tracing::debug!(target: "minuit", source = d.source, "{}", d.message),
            Level::Info => tracing::info!(target: "minuit", source = d.source, "{}", d.message),
            Level::Warn => tracing::warn!(target: "minuit", source = d.source, "{}", d.message),
        }
    }
}

/// Discards all diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _diagnostic: Diagnostic) {}
}

/// Records diagnostics in memory.
///
/// # Examples
///
/// ```
/// use minuit_optimiser::diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, Level};
///
/// let sink = CollectingSink::new();
/// sink.emit(Diagnostic::warn("MnHesse", "matrix inversion fails"));
/// assert_eq!(sink.len(), 1);
/// assert!(sink.contains("MnHesse", Level::Warn));
/// ```
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded diagnostics.
    pub fn records(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    /// Number of recorded diagnostics.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// True if a record from `source` at `level` or above exists.
    pub fn contains(&self, source: &str, level: Level) -> bool {
        self.lock()
            .iter()
            .any(|d| d.source == source && d.level >= level)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.lock().push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_filters_by_level() {
        let sink = CollectingSink::new();
        sink.emit(Diagnostic::debug("MnSeedGenerator", "seed"));
        sink.emit(Diagnostic::info("MnHesse", "done"));
        assert!(sink.contains("MnHesse", Level::Info));
        assert!(!sink.contains("MnHesse", Level::Warn));
        assert!(sink.contains("MnSeedGenerator", Level::Debug));
        assert_eq!(sink.records()[1].message, "done");
    }

    #[test]
    fn test_null_and_tracing_sinks_accept_records() {
        NullSink.emit(Diagnostic::warn("x", "ignored"));
        TracingSink.emit(Diagnostic::warn("x", "forwarded"));
    }
}
