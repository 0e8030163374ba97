//! Model fitting, prediction, and recommendation search.
//!
//! Responsibilities:
//!
//! - refit a group's multivariate regression and persist the batch (`regression`)
//! - raw and baseline-anchored predictions (`predict`)
//! - exhaustive design-grid enumeration (`grid`)
//! - weighted target-matching search over the grid (`recommend`)

pub mod grid;
pub mod predict;
pub mod recommend;
pub mod regression;

pub use grid::*;
pub use predict::*;
pub use recommend::*;
pub use regression::*;
