//! # minuit_core: Numeric Foundation for the MINUIT Engine
//!
//! ## Layer 1 (Foundation) Role
//!
//! minuit_core is the bottom layer of the minimisation workspace, providing:
//! - Machine precision determination (`math::precision`)
//! - Packed symmetric matrices with inversion and eigenvalues (`math::sym_matrix`)
//! - Dense vector helpers (`math::vector`)
//! - Three-point parabola fitting (`math::parabola`)
//! - User parameters and the external/internal transformation (`types`)
//! - The objective function abstraction (`traits::Fcn`)
//! - Error types: `MinuitError`, `MatrixError` (`types::error`)
//!
//! ## Minimal Dependencies
//!
//! Layer 1 has no dependencies on other minuit_* crates:
//! - num-traits: generic floating-point code for the precision measurement
//! - thiserror: structured errors
//! - serde: serialisation support (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use minuit_core::types::{Parameter, UserTransformation};
//!
//! let mut trafo = UserTransformation::default();
//! trafo.add(Parameter::new("x", 0.5, 0.1)).unwrap();
//! trafo.add(Parameter::with_limits("y", 1.0, 0.1, 0.0, 2.0).unwrap()).unwrap();
//!
//! let internal = trafo.ext2int(1, 1.5);
//! # assert!((trafo.int2ext(1, internal) - 1.5).abs() < 1e-8);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation for parameters, bounds and matrices

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod math;
pub mod traits;
pub mod types;

pub use math::{MachinePrecision, SymMatrix};
pub use traits::{Fcn, FcnWithGradient};
pub use types::{Bounds, MatrixError, MinuitError, Parameter, ParameterKey, UserTransformation};
