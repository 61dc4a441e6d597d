//! Error types for structured error handling.
//!
//! This module provides:
//! - `MinuitError`: structural errors raised at the engine's call sites
//!   (unknown parameters, invalid limits, non-finite input, ...)
//! - `MatrixError`: failures of symmetric matrix algebra
//!
//! Numerical degeneracy inside the algorithms is never an error: it is
//! recorded as status flags on the returned states.

use thiserror::Error;

/// Failures of packed symmetric matrix operations.
///
/// # Examples
/// ```
/// use minuit_core::types::MatrixError;
///
/// assert_eq!(format!("{}", MatrixError::Singular), "Matrix is singular");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    /// Inversion hit a non-positive diagonal or a vanishing pivot.
    #[error("Matrix is singular")]
    Singular,

    /// Jacobi rotations did not converge.
    #[error("Eigenvalue iteration did not converge after {sweeps} sweeps")]
    EigenvalueNoConvergence {
        /// Number of sweeps attempted
        sweeps: usize,
    },
}

/// Structural errors reported by the engine.
///
/// # Variants
/// - `UnknownParameter`: no parameter with the given name
/// - `DuplicateParameter`: a parameter with that name already exists
/// - `IndexOutOfRange`: parameter index beyond the declared set
/// - `ParameterFixed`: the operation requires a free parameter
/// - `ParameterConst`: constant parameters cannot be released or varied
/// - `InvalidLimits`: equal or non-finite bounds
/// - `NonFinite`: NaN or infinite value supplied
/// - `DimensionMismatch`: vector or matrix of the wrong size
/// - `InvalidMinimum`: error analysis requested on an invalid minimum
/// - `InvalidArgument`: any other rejected argument
/// - `Matrix`: wrapped matrix error
///
/// # Examples
/// ```
/// use minuit_core::types::MinuitError;
///
/// let err = MinuitError::unknown_parameter("sigma");
/// assert_eq!(format!("{}", err), "Unknown parameter: sigma");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MinuitError {
    /// No parameter with the given name.
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// A parameter with the given name is already declared.
    #[error("Duplicate parameter name: {0}")]
    DuplicateParameter(String),

    /// Parameter index beyond the declared set.
    #[error("Parameter index {index} out of range (have {len} parameters)")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of declared parameters
        len: usize,
    },

    /// The operation requires a free parameter.
    #[error("Parameter {0} is fixed")]
    ParameterFixed(String),

    /// Constant parameters cannot be released or varied.
    #[error("Parameter {0} is constant")]
    ParameterConst(String),

    /// Limits coincide or are not finite.
    #[error("Invalid limits for {name}: lower = {lower}, upper = {upper}")]
    InvalidLimits {
        /// Parameter name
        name: String,
        /// Requested lower limit
        lower: f64,
        /// Requested upper limit
        upper: f64,
    },

    /// NaN or infinite value.
    #[error("Non-finite value {value} for {name}")]
    NonFinite {
        /// What the value was for
        name: String,
        /// Offending value
        value: f64,
    },

    /// Vector or matrix of the wrong size.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Supplied dimension
        actual: usize,
    },

    /// Error analysis requires a valid minimum.
    #[error("Function minimum is not valid")]
    InvalidMinimum,

    /// Any other rejected argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Wrapped matrix error.
    #[error("Matrix error: {0}")]
    Matrix(#[from] MatrixError),
}

impl MinuitError {
    /// Create an unknown-parameter error.
    pub fn unknown_parameter(name: impl Into<String>) -> Self {
        Self::UnknownParameter(name.into())
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a non-finite value error.
    pub fn non_finite(name: impl Into<String>, value: f64) -> Self {
        Self::NonFinite {
            name: name.into(),
            value,
        }
    }
}
