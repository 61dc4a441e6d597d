//! Parameter, transformation and error types.
//!
//! This module provides:
//! - `parameter`: external parameters, their bounds and the `ParameterKey` lookup trait
//! - `transformation`: the bounded/unbounded mapping between external and internal vectors
//! - `error`: structured error types for structural failures and matrix algebra
//!
//! # Re-exports
//!
//! [`Parameter`], [`Bounds`], [`ParameterKey`], [`UserTransformation`],
//! [`MinuitError`] and [`MatrixError`] are re-exported at this level.

pub mod error;
pub mod parameter;
pub mod transformation;

pub use error::{MatrixError, MinuitError};
pub use parameter::{Bounds, Parameter, ParameterKey};
pub use transformation::UserTransformation;
