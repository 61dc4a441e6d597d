//! Per-run evaluation context.
//!
//! [`MnFcn`] wraps the user objective for one minimisation run: it maps
//! internal vectors to external ones, counts calls, carries the error
//! definition and owns the route to the diagnostics sink.

use std::cell::Cell;

use minuit_core::{Fcn, UserTransformation};

use crate::diagnostics::{Diagnostic, DiagnosticSink};

/// Objective evaluated in internal coordinates.
pub struct MnFcn<'a, F: Fcn + ?Sized> {
    fcn: &'a F,
    trafo: &'a UserTransformation,
    error_def: f64,
    calls: Cell<usize>,
    sink: &'a dyn DiagnosticSink,
}

impl<'a, F: Fcn + ?Sized> MnFcn<'a, F> {
    /// New context with a zero call counter.
    pub fn new(
        fcn: &'a F,
        trafo: &'a UserTransformation,
        error_def: f64,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        Self {
            fcn,
            trafo,
            error_def,
            calls: Cell::new(0),
            sink,
        }
    }

    /// Start counting from `calls` (continuing a previous run).
    pub fn with_initial_calls(self, calls: usize) -> Self {
        self.calls.set(calls);
        self
    }

    /// Objective at the internal point `internal`.
    pub fn value(&self, internal: &[f64]) -> f64 {
        self.calls.set(self.calls.get() + 1);
        self.fcn.value(&self.trafo.transform(internal))
    }

    /// Objective at an external point (counts as a call).
    pub fn value_external(&self, external: &[f64]) -> f64 {
        self.calls.set(self.calls.get() + 1);
        self.fcn.value(external)
    }

    /// Number of objective calls so far.
    pub fn num_calls(&self) -> usize {
        self.calls.get()
    }

    /// Error definition `up`.
    pub fn error_def(&self) -> f64 {
        self.error_def
    }

    /// The wrapped objective.
    pub fn fcn(&self) -> &'a F {
        self.fcn
    }

    /// The transformation in effect.
    pub fn trafo(&self) -> &'a UserTransformation {
        self.trafo
    }

    /// The diagnostics sink of this run.
    pub fn sink(&self) -> &'a dyn DiagnosticSink {
        self.sink
    }

    /// Report a diagnostic.
    pub fn report(&self, diagnostic: Diagnostic) {
        self.sink.emit(diagnostic);
    }

    /// Report a warning.
    pub fn warn(&self, source: &'static str, message: impl Into<String>) {
        self.report(Diagnostic::warn(source, message));
    }

    /// Report an informational message.
    pub fn info(&self, source: &'static str, message: impl Into<String>) {
        self.report(Diagnostic::info(source, message));
    }

    /// Report a debug message.
    pub fn debug(&self, source: &'static str, message: impl Into<String>) {
        self.report(Diagnostic::debug(source, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingSink, Level};
    use minuit_core::Parameter;

    #[test]
    fn test_counts_calls_and_transforms() {
        let mut trafo = UserTransformation::new();
        trafo.add(Parameter::new("a", 1.0, 0.1)).unwrap();
        trafo.add(Parameter::constant("b", 10.0)).unwrap();
        let sink = CollectingSink::new();
        let f = |x: &[f64]| x[0] + x[1];
        let mfcn = MnFcn::new(&f, &trafo, 1.0, &sink);

        assert_eq!(mfcn.value(&[2.0]), 12.0);
        assert_eq!(mfcn.value_external(&[1.0, 1.0]), 2.0);
        assert_eq!(mfcn.num_calls(), 2);

        mfcn.warn("test", "message");
        assert!(sink.contains("test", Level::Warn));
    }

    #[test]
    fn test_initial_calls() {
        let trafo = UserTransformation::new();
        let sink = CollectingSink::new();
        let f = |_: &[f64]| 0.0;
        let mfcn = MnFcn::new(&f, &trafo, 0.5, &sink).with_initial_calls(40);
        assert_eq!(mfcn.value(&[]), 0.0);
        assert_eq!(mfcn.num_calls(), 41);
        assert_eq!(mfcn.error_def(), 0.5);
    }
}
