//! Regression refit orchestration.
//!
//! A refit is always a full refit: every sample currently in the group feeds
//! one design matrix, one SVD solve produces coefficients for all three
//! responses, and the resulting coefficient sets are persisted atomically
//! under the group's next batch number.

use nalgebra::DMatrix;
use tracing::info;

use crate::domain::{
    CoefficientBatch, CoefficientSet, PREDICTOR_COUNT, ResponseKind, Sample,
};
use crate::error::{Error, Result};
use crate::math::solve_least_squares;
use crate::store::Store;

/// Minimum samples for a well-posed fit: five predictors plus the intercept.
pub const MIN_SAMPLES: usize = PREDICTOR_COUNT + 1;

/// Outcome of one regression run.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub group: String,
    pub batch: i64,
    pub n_samples: usize,
    pub coefficients: CoefficientBatch,
}

/// Refit a group's model and persist the new coefficient batch.
///
/// Batch numbering is per group: 0 for a never-fit group, otherwise the
/// stored maximum plus one. The three coefficient rows are inserted in one
/// transaction; a failed solve persists nothing.
pub fn fit_group(store: &mut Store, group: &str) -> Result<FitOutcome> {
    let samples = store.samples_in_group(group)?;
    if samples.is_empty() {
        return Err(Error::NotFound(format!("group '{group}'")));
    }
    if samples.len() < MIN_SAMPLES {
        return Err(Error::InsufficientData {
            group: group.to_string(),
            have: samples.len(),
            need: MIN_SAMPLES,
        });
    }

    let batch = store.latest_batch(group)?.map_or(0, |b| b + 1);
    let coefficients = solve_group(group, batch, &samples)?;
    store.insert_coefficient_batch(&coefficients)?;

    info!(
        group,
        batch,
        n_samples = samples.len(),
        "regression refit persisted"
    );

    Ok(FitOutcome {
        group: group.to_string(),
        batch,
        n_samples: samples.len(),
        coefficients,
    })
}

/// Build the design/response matrices and solve for all responses at once.
///
/// X is n×6 (five predictors plus a trailing constant column), Y is n×3, so
/// the 6×3 solution block has predictor coefficients in rows 0..5 and the
/// intercept in the last row.
fn solve_group(group: &str, batch: i64, samples: &[Sample]) -> Result<CoefficientBatch> {
    let n = samples.len();
    let mut x = DMatrix::zeros(n, PREDICTOR_COUNT + 1);
    let mut y = DMatrix::zeros(n, ResponseKind::ALL.len());
    for (row, sample) in samples.iter().enumerate() {
        for (col, value) in sample.params.to_array().iter().enumerate() {
            x[(row, col)] = *value;
        }
        x[(row, PREDICTOR_COUNT)] = 1.0;
        for (col, response) in ResponseKind::ALL.iter().enumerate() {
            y[(row, col)] = sample.yields.get(*response);
        }
    }

    // Rank-deficient designs get the SVD least-norm solution; only a solve
    // that cannot produce finite coefficients is an error. NaN coefficients
    // must never reach the store.
    let w = solve_least_squares(&x, &y).ok_or_else(|| Error::RegressionSingular {
        group: group.to_string(),
        detail: "least-squares solve produced no finite coefficient set".into(),
    })?;

    let sets = ResponseKind::ALL
        .iter()
        .enumerate()
        .map(|(col, &response)| {
            let mut coefficients = [0.0; PREDICTOR_COUNT];
            for (i, coeff) in coefficients.iter_mut().enumerate() {
                *coeff = w[(i, col)];
            }
            CoefficientSet {
                group: group.to_string(),
                batch,
                response,
                intercept: w[(PREDICTOR_COUNT, col)],
                coefficients,
            }
        })
        .collect();

    CoefficientBatch::from_sets(group, batch, sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DesignParams, NewSample, SmokeYields};
    use crate::fit::predict::predict_raw;

    /// Diagonal predictor design `[t,t,t,t,t]` with exact responses
    /// `tar = 2a + 3b + c + 10`, `nicotine = 0.1a + 0.05`, `co = a+b+c+d+e`.
    fn seed_diagonal_group(store: &mut Store, group: &str, n: usize) {
        for i in 0..n {
            let t = i as f64;
            let sample = NewSample {
                group: group.into(),
                code: format!("{group}-{i:03}"),
                params: DesignParams::from_array([t; PREDICTOR_COUNT]),
                yields: SmokeYields {
                    tar: 2.0 * t + 3.0 * t + t + 10.0,
                    nicotine: 0.1 * t + 0.05,
                    co: 5.0 * t,
                },
            };
            store.create_sample(&sample).unwrap();
        }
    }

    #[test]
    fn refit_needs_at_least_six_samples() {
        let mut store = Store::open_in_memory().unwrap();
        seed_diagonal_group(&mut store, "A1", 5);
        let err = fit_group(&mut store, "A1").unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientData {
                have: 5,
                need: 6,
                ..
            }
        ));
    }

    #[test]
    fn refit_of_missing_group_is_not_found() {
        let mut store = Store::open_in_memory().unwrap();
        assert!(matches!(
            fit_group(&mut store, "missing").unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn exact_linear_data_is_reproduced_on_a_held_out_point() {
        let mut store = Store::open_in_memory().unwrap();
        seed_diagonal_group(&mut store, "A1", 6);

        let outcome = fit_group(&mut store, "A1").unwrap();
        assert_eq!(outcome.batch, 0);
        assert_eq!(outcome.n_samples, 6);

        let held_out = DesignParams::from_array([6.0; PREDICTOR_COUNT]);
        let batch = &outcome.coefficients;
        let tar = predict_raw(held_out, batch.for_response(ResponseKind::Tar));
        let nicotine = predict_raw(held_out, batch.for_response(ResponseKind::Nicotine));
        let co = predict_raw(held_out, batch.for_response(ResponseKind::Co));
        assert!((tar - (2.0 * 6.0 + 3.0 * 6.0 + 6.0 + 10.0)).abs() < 1e-6);
        assert!((nicotine - (0.1 * 6.0 + 0.05)).abs() < 1e-6);
        assert!((co - 30.0).abs() < 1e-6);
    }

    #[test]
    fn batches_number_sequentially_and_store_three_sets() {
        let mut store = Store::open_in_memory().unwrap();
        seed_diagonal_group(&mut store, "A1", 6);

        let first = fit_group(&mut store, "A1").unwrap();
        let second = fit_group(&mut store, "A1").unwrap();
        assert_eq!(first.batch, 0);
        assert_eq!(second.batch, 1);
        assert_eq!(store.latest_batch("A1").unwrap(), Some(1));

        // Each persisted batch is complete and reload-identical.
        let reloaded = store.coefficient_batch("A1", 1).unwrap();
        assert_eq!(reloaded, second.coefficients);
    }

    #[test]
    fn batch_numbering_is_independent_per_group() {
        let mut store = Store::open_in_memory().unwrap();
        seed_diagonal_group(&mut store, "A1", 6);
        seed_diagonal_group(&mut store, "B2", 6);

        fit_group(&mut store, "A1").unwrap();
        fit_group(&mut store, "A1").unwrap();
        let b = fit_group(&mut store, "B2").unwrap();
        assert_eq!(b.batch, 0);
    }
}
