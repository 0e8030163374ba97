//! Typed error surface for the whole crate.
//!
//! Every failure the core can produce is one of these variants; nothing is
//! swallowed. The one documented exception is division by zero inside
//! prediction scaling, which degrades to `0.0` instead of erroring (see
//! `fit::predict::safe_divide`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or non-finite numeric input (sample fields, parameter
    /// vectors, range bounds).
    #[error("invalid input: {0}")]
    Validation(String),

    /// Not enough usable samples in a group to pose the regression.
    #[error(
        "group '{group}' has {have} usable sample(s); at least {need} are required to fit the model"
    )]
    InsufficientData {
        group: String,
        have: usize,
        need: usize,
    },

    /// The least-squares solve failed or produced non-finite coefficients.
    #[error("regression for group '{group}' is singular: {detail}")]
    RegressionSingular { group: String, detail: String },

    /// A referenced group, sample, batch, or coefficient set does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The recommendation grid would enumerate more candidates than allowed.
    #[error(
        "search grid has {candidates} combinations which exceeds the ceiling of {ceiling}; \
         widen the steps or narrow the ranges"
    )]
    ExcessiveSearchSpace { candidates: u128, ceiling: u64 },

    /// Sample code already present within its group.
    #[error("sample code '{code}' already exists in group '{group}'")]
    DuplicateCode { group: String, code: String },

    /// Embedded database failure.
    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Filesystem failure (imports, exports).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV-level parse failure during import.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failure during export.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Process exit code for the binary.
    ///
    /// 2 = bad input, 3 = not enough data / missing entity, 4 = numeric
    /// failure, 5 = store or filesystem failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Validation(_)
            | Error::ExcessiveSearchSpace { .. }
            | Error::DuplicateCode { .. } => 2,
            Error::InsufficientData { .. } | Error::NotFound(_) => 3,
            Error::RegressionSingular { .. } => 4,
            Error::Store(_) | Error::Io(_) | Error::Csv(_) | Error::Json(_) => 5,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
