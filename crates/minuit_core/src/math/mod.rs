//! Numerical building blocks for the minimiser.
//!
//! This module provides:
//! - `precision`: machine epsilon measurement and the derived `eps2`
//! - `sym_matrix`: packed symmetric matrix storage and algebra
//! - `vector`: small dense vector helpers
//! - `parabola`: parabola through three points

pub mod parabola;
pub mod precision;
pub mod sym_matrix;
pub mod vector;

pub use parabola::Parabola;
pub use precision::MachinePrecision;
pub use sym_matrix::SymMatrix;
