//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - design-parameter and smoke-yield vectors (`DesignParams`, `SmokeYields`)
//! - stored entities (`Sample`, `CoefficientSet`)
//! - recommendation inputs/outputs (`Target`, `SearchRanges`, `Recommendation`)

pub mod types;

pub use types::*;
