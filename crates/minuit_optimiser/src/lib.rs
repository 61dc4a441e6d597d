//! # minuit_optimiser: MINUIT Minimisation and Error Analysis
//!
//! ## Layer 2 Role
//!
//! Builds on `minuit_core` (L1) to minimise scalar objectives of bounded or
//! unbounded parameters and to analyse the uncertainties at the minimum:
//! - MIGRAD variable-metric minimisation (`minimizers`)
//! - Nelder-Mead SIMPLEX and the combined MIGRAD/SIMPLEX strategy
//! - Hesse second-derivative matrix (`hessian`)
//! - MINOS asymmetric errors and two-parameter contours (`analysis`)
//! - One-dimensional parameter scans (`scan`)
//! - A stateful front end, [`Minuit`] (`application`)
//!
//! ## Diagnostics
//!
//! Algorithms never log directly. They report [`diagnostics::Diagnostic`]
//! records to a [`diagnostics::DiagnosticSink`]; the default
//! [`diagnostics::TracingSink`] forwards them to `tracing` under the
//! `minuit` target.
//!
//! ## Usage Examples
//!
//! ```rust
//! use minuit_optimiser::prelude::*;
//!
//! let chi2 = |p: &[f64]| (p[0] - 3.0).powi(2) + 10.0 * (p[1] + 1.0).powi(2);
//!
//! let mut start = UserParameterState::new();
//! start.add("x", 0.0, 1.0).unwrap();
//! start.add_limited("y", 0.0, 1.0, -5.0, 5.0).unwrap();
//!
//! let mut minuit = Minuit::new(&chi2, start).with_strategy(Strategy::medium());
//! let min = minuit.minimize(0, 0.1).unwrap();
//! assert!(min.is_valid());
//!
//! let errors = minuit.minos(&min, "x", 1.0).unwrap();
//! assert!((errors.upper() - 1.0).abs() < 1e-2);
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel` (default): MINOS for several parameters on rayon threads
//! - `serde`: serialisation of configuration and result tags

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod analysis;
pub mod application;
pub mod config;
pub mod diagnostics;
pub mod fcn;
pub mod gradient;
pub mod hessian;
pub mod minimizers;
pub mod scan;
pub mod state;
pub mod strategy;
pub mod user;

pub use analysis::{Contours, ContoursError, CrossOutcome, Minos, MinosError, MnCross};
pub use application::Minuit;
pub use config::MinimizerConfig;
pub use hessian::Hesse;
pub use minimizers::{minimize, Algorithm};
pub use scan::Scan;
pub use state::{FunctionMinimum, TerminalCondition};
pub use strategy::Strategy;
pub use user::UserParameterState;

pub use minuit_core::{Fcn, FcnWithGradient, MinuitError, ParameterKey};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::analysis::{Contours, Minos};
    pub use crate::application::Minuit;
    pub use crate::config::MinimizerConfig;
    pub use crate::diagnostics::{DiagnosticSink, NullSink, TracingSink};
    pub use crate::hessian::Hesse;
    pub use crate::minimizers::{minimize, Algorithm};
    pub use crate::scan::Scan;
    pub use crate::state::FunctionMinimum;
    pub use crate::strategy::Strategy;
    pub use crate::user::UserParameterState;
    pub use minuit_core::{Fcn, FcnWithGradient, MinuitError};
}
