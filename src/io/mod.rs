//! Input/output helpers.
//!
//! - CSV sample import + validation (`import`)
//! - result exports (CSV/JSON) (`export`)

pub mod export;
pub mod import;

pub use export::*;
pub use import::*;
