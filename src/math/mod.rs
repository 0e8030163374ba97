//! Mathematical utilities: multi-response least squares.

pub mod ols;

pub use ols::*;
