//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and grid search
//! - exported to JSON/CSV
//! - reloaded later for comparisons

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of design parameters (regression predictors).
pub const PREDICTOR_COUNT: usize = 5;

/// Number of smoke-yield responses (tar, nicotine, CO).
pub const RESPONSE_COUNT: usize = 3;

/// The five auxiliary-material design parameters of one specimen.
///
/// `to_array` fixes the predictor order used *everywhere* — design-matrix
/// columns, stored coefficient columns, and prediction dot products must all
/// agree on it:
///
/// 0. filter ventilation
/// 1. filter pressure drop
/// 2. paper permeability
/// 3. paper basis weight
/// 4. citrate content
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesignParams {
    /// Filter ventilation (fraction in the numeric core; entered as a percent).
    pub filter_ventilation: f64,
    /// Filter pressure drop. Integer-valued in source units, carried as f64.
    pub filter_pressure_drop: f64,
    /// Cigarette-paper air permeability.
    pub permeability: f64,
    /// Cigarette-paper basis weight (grammage).
    pub basis_weight: f64,
    /// Citrate content (fraction in the numeric core; entered as a percent).
    pub citrate: f64,
}

impl DesignParams {
    pub fn to_array(self) -> [f64; PREDICTOR_COUNT] {
        [
            self.filter_ventilation,
            self.filter_pressure_drop,
            self.permeability,
            self.basis_weight,
            self.citrate,
        ]
    }

    pub fn from_array(values: [f64; PREDICTOR_COUNT]) -> Self {
        Self {
            filter_ventilation: values[0],
            filter_pressure_drop: values[1],
            permeability: values[2],
            basis_weight: values[3],
            citrate: values[4],
        }
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Short labels in predictor order, for headers and reports.
    pub fn labels() -> [&'static str; PREDICTOR_COUNT] {
        [
            "filter_ventilation",
            "filter_pressure_drop",
            "permeability",
            "basis_weight",
            "citrate",
        ]
    }
}

/// The three measured (or predicted) smoke-yield outputs.
///
/// Also reused as a per-response weight vector for recommendation targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmokeYields {
    pub tar: f64,
    pub nicotine: f64,
    pub co: f64,
}

impl SmokeYields {
    pub fn get(&self, response: ResponseKind) -> f64 {
        match response {
            ResponseKind::Tar => self.tar,
            ResponseKind::Nicotine => self.nicotine,
            ResponseKind::Co => self.co,
        }
    }

    pub fn set(&mut self, response: ResponseKind, value: f64) {
        match response {
            ResponseKind::Tar => self.tar = value,
            ResponseKind::Nicotine => self.nicotine = value,
            ResponseKind::Co => self.co = value,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.tar.is_finite() && self.nicotine.is_finite() && self.co.is_finite()
    }
}

/// One smoke-yield response variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Tar,
    Nicotine,
    Co,
}

impl ResponseKind {
    /// Canonical ordering: tar, nicotine, CO. Response-matrix columns and
    /// coefficient batches follow this order.
    pub const ALL: [ResponseKind; RESPONSE_COUNT] =
        [ResponseKind::Tar, ResponseKind::Nicotine, ResponseKind::Co];

    /// Stable tag used in the database `response` column.
    pub fn tag(self) -> &'static str {
        match self {
            ResponseKind::Tar => "tar",
            ResponseKind::Nicotine => "nicotine",
            ResponseKind::Co => "co",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "tar" => Ok(ResponseKind::Tar),
            "nicotine" => Ok(ResponseKind::Nicotine),
            "co" => Ok(ResponseKind::Co),
            other => Err(Error::Validation(format!(
                "unknown response tag '{other}'"
            ))),
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ResponseKind::Tar => "tar",
            ResponseKind::Nicotine => "nicotine",
            ResponseKind::Co => "CO",
        }
    }
}

/// A sample as supplied by a caller (import or manual entry), before the
/// store assigns identity and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSample {
    pub group: String,
    /// Specimen code; unique within its group.
    pub code: String,
    pub params: DesignParams,
    pub yields: SmokeYields,
}

impl NewSample {
    /// A sample participates in regression only if every numeric field is
    /// finite. Enforced on the way *into* the store.
    pub fn validate(&self) -> Result<()> {
        if self.group.trim().is_empty() {
            return Err(Error::Validation("sample group name is empty".into()));
        }
        if self.code.trim().is_empty() {
            return Err(Error::Validation(format!(
                "sample in group '{}' has an empty code",
                self.group
            )));
        }
        if !self.params.is_finite() || !self.yields.is_finite() {
            return Err(Error::Validation(format!(
                "sample '{}' in group '{}' has a non-finite numeric field",
                self.code, self.group
            )));
        }
        Ok(())
    }
}

/// A stored sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub id: i64,
    pub group: String,
    pub code: String,
    pub params: DesignParams,
    pub yields: SmokeYields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sample {
    /// View this sample as a prediction baseline (known measured yields).
    pub fn as_baseline(&self) -> Baseline {
        Baseline {
            params: self.params,
            measured: self.yields,
        }
    }
}

/// One response variable's fitted linear model for a (group, batch).
///
/// The reserved potassium-ratio coefficient lives only in the database schema
/// (always NULL); it is never computed and never read by prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientSet {
    pub group: String,
    pub batch: i64,
    pub response: ResponseKind,
    pub intercept: f64,
    /// Predictor coefficients in `DesignParams::to_array` order.
    pub coefficients: [f64; PREDICTOR_COUNT],
}

/// The three coefficient sets produced by one regression run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientBatch {
    pub group: String,
    pub batch: i64,
    /// One set per response, in `ResponseKind::ALL` order.
    sets: [CoefficientSet; RESPONSE_COUNT],
}

impl CoefficientBatch {
    /// Assemble a batch from loose sets, enforcing the one-set-per-response
    /// invariant.
    pub fn from_sets(group: &str, batch: i64, sets: Vec<CoefficientSet>) -> Result<Self> {
        let mut slots: [Option<CoefficientSet>; RESPONSE_COUNT] = [None, None, None];
        for set in sets {
            if set.group != group || set.batch != batch {
                return Err(Error::Validation(format!(
                    "coefficient set for '{}' batch {} mixed into batch {} of '{}'",
                    set.group, set.batch, batch, group
                )));
            }
            let idx = ResponseKind::ALL
                .iter()
                .position(|r| *r == set.response)
                .unwrap_or_default();
            if slots[idx].is_some() {
                return Err(Error::Validation(format!(
                    "duplicate {} coefficient set in batch {} of '{}'",
                    set.response.display_name(),
                    batch,
                    group
                )));
            }
            slots[idx] = Some(set);
        }
        match slots {
            [Some(tar), Some(nicotine), Some(co)] => Ok(Self {
                group: group.to_string(),
                batch,
                sets: [tar, nicotine, co],
            }),
            _ => Err(Error::NotFound(format!(
                "complete coefficient batch {batch} for group '{group}'"
            ))),
        }
    }

    pub fn for_response(&self, response: ResponseKind) -> &CoefficientSet {
        // ALL order matches the sets array by construction.
        let idx = ResponseKind::ALL
            .iter()
            .position(|r| *r == response)
            .unwrap_or_default();
        &self.sets[idx]
    }

    pub fn sets(&self) -> &[CoefficientSet; RESPONSE_COUNT] {
        &self.sets
    }
}

/// A reference specimen with known measured yields, used to anchor
/// ratio-scaled predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baseline {
    pub params: DesignParams,
    pub measured: SmokeYields,
}

/// Desired yields plus per-response importance weights for the
/// recommendation search.
///
/// Weights must be nonnegative; the core does not require them to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Target {
    pub yields: SmokeYields,
    pub weights: SmokeYields,
}

impl Target {
    pub fn validate(&self) -> Result<()> {
        if !self.yields.is_finite() {
            return Err(Error::Validation("target yields must be finite".into()));
        }
        if !self.weights.is_finite()
            || ResponseKind::ALL.iter().any(|r| self.weights.get(*r) < 0.0)
        {
            return Err(Error::Validation(
                "target weights must be finite and nonnegative".into(),
            ));
        }
        Ok(())
    }
}

/// Closed interval plus step for one search axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// Per-parameter ranges for the recommendation grid, in predictor order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchRanges {
    pub filter_ventilation: AxisRange,
    pub filter_pressure_drop: AxisRange,
    pub permeability: AxisRange,
    pub basis_weight: AxisRange,
    pub citrate: AxisRange,
}

impl SearchRanges {
    pub fn to_array(self) -> [AxisRange; PREDICTOR_COUNT] {
        [
            self.filter_ventilation,
            self.filter_pressure_drop,
            self.permeability,
            self.basis_weight,
            self.citrate,
        ]
    }
}

/// One ranked recommendation: a candidate design, its anchored predicted
/// yields, and its weighted deviation from target (lower is better).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub params: DesignParams,
    pub predicted: SmokeYields,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> DesignParams {
        DesignParams {
            filter_ventilation: 0.25,
            filter_pressure_drop: 1100.0,
            permeability: 60.0,
            basis_weight: 28.0,
            citrate: 0.01,
        }
    }

    #[test]
    fn param_array_round_trips_in_order() {
        let p = params();
        let arr = p.to_array();
        assert_eq!(arr[0], p.filter_ventilation);
        assert_eq!(arr[4], p.citrate);
        assert_eq!(DesignParams::from_array(arr), p);
    }

    #[test]
    fn response_tags_round_trip() {
        for r in ResponseKind::ALL {
            assert_eq!(ResponseKind::from_tag(r.tag()).unwrap(), r);
        }
        assert!(ResponseKind::from_tag("potassium").is_err());
    }

    #[test]
    fn new_sample_rejects_non_finite_fields() {
        let mut sample = NewSample {
            group: "A1".into(),
            code: "A1-001".into(),
            params: params(),
            yields: SmokeYields {
                tar: 10.0,
                nicotine: 0.9,
                co: 11.0,
            },
        };
        assert!(sample.validate().is_ok());
        sample.params.permeability = f64::NAN;
        assert!(sample.validate().is_err());
    }

    #[test]
    fn coefficient_batch_requires_all_three_responses() {
        let set = |response| CoefficientSet {
            group: "A1".into(),
            batch: 0,
            response,
            intercept: 1.0,
            coefficients: [0.0; PREDICTOR_COUNT],
        };
        let err = CoefficientBatch::from_sets(
            "A1",
            0,
            vec![set(ResponseKind::Tar), set(ResponseKind::Co)],
        );
        assert!(err.is_err());

        let ok = CoefficientBatch::from_sets(
            "A1",
            0,
            vec![
                set(ResponseKind::Co),
                set(ResponseKind::Tar),
                set(ResponseKind::Nicotine),
            ],
        )
        .unwrap();
        assert_eq!(ok.for_response(ResponseKind::Co).response, ResponseKind::Co);
    }
}
