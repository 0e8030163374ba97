//! Shared command flows used by the CLI front-end.
//!
//! Keeping these in one place avoids duplicating the core workflows:
//! load baseline -> resolve coefficient batch -> predict/search
//!
//! The CLI can then focus on presentation (printing and export flags).

use tracing::info;

use crate::domain::{
    Baseline, CoefficientBatch, DesignParams, Recommendation, Sample, SmokeYields, Target,
};
use crate::error::{Error, Result};
use crate::fit::{self, RecommendInput, fraction_to_percent, predict_scaled};
use crate::store::Store;

/// All computed outputs of one scaled prediction.
#[derive(Debug, Clone)]
pub struct PredictOutput {
    pub baseline: Baseline,
    pub candidate: DesignParams,
    pub batch: i64,
    pub predicted: SmokeYields,
}

/// All computed outputs of one recommendation run.
#[derive(Debug, Clone)]
pub struct RecommendOutput {
    pub group: String,
    pub batch: i64,
    pub input: RecommendInput,
    pub recommendations: Vec<Recommendation>,
}

/// Find a baseline sample by exact code within a group.
pub fn load_baseline(store: &Store, group: &str, code: &str) -> Result<Sample> {
    store
        .find_by_code(group, code)?
        .into_iter()
        .find(|s| s.code == code)
        .ok_or_else(|| Error::NotFound(format!("baseline sample '{code}' in group '{group}'")))
}

/// Resolve an explicit batch number, or fall back to the group's latest.
pub fn load_batch(store: &Store, group: &str, batch: Option<i64>) -> Result<CoefficientBatch> {
    match batch {
        Some(number) => store.coefficient_batch(group, number),
        None => store.latest_coefficient_batch(group),
    }
}

/// Scaled prediction for a candidate design against a stored baseline.
pub fn run_predict(
    store: &Store,
    group: &str,
    baseline_code: &str,
    batch: Option<i64>,
    candidate: DesignParams,
) -> Result<PredictOutput> {
    if !candidate.is_finite() {
        return Err(Error::Validation(
            "candidate parameters must be finite".into(),
        ));
    }
    let baseline = load_baseline(store, group, baseline_code)?.as_baseline();
    let coefficients = load_batch(store, group, batch)?;
    let predicted = predict_scaled(&baseline, candidate, &coefficients);

    info!(
        group,
        batch = coefficients.batch,
        baseline = baseline_code,
        "scaled prediction computed"
    );
    Ok(PredictOutput {
        baseline,
        candidate,
        batch: coefficients.batch,
        predicted,
    })
}

/// Grid-search recommendation anchored on a stored baseline.
///
/// The stored baseline keeps ventilation/citrate as fractions; the search
/// API speaks the percent entry convention, so the params are converted on
/// the way in (the search converts them back internally).
pub fn run_recommend(
    store: &Store,
    group: &str,
    baseline_code: &str,
    batch: Option<i64>,
    target: Target,
    input_builder: impl FnOnce(Baseline, Target) -> RecommendInput,
) -> Result<RecommendOutput> {
    let stored = load_baseline(store, group, baseline_code)?.as_baseline();
    let baseline = Baseline {
        params: fraction_to_percent(stored.params),
        measured: stored.measured,
    };
    let coefficients = load_batch(store, group, batch)?;

    let input = input_builder(baseline, target);
    let recommendations = fit::recommend(&input, &coefficients)?;

    Ok(RecommendOutput {
        group: group.to_string(),
        batch: coefficients.batch,
        input,
        recommendations,
    })
}
