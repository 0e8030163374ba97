//! Forward prediction.
//!
//! Two modes:
//!
//! - `predict_raw` — the model's affine output, used internally and for
//!   solver validation
//! - `predict_scaled` — the end-user mode: raw predictions for baseline and
//!   candidate, then the candidate/baseline ratio applied to the baseline's
//!   *measured* yields. Anchoring to a known-true measurement corrects the
//!   systematic bias of trusting the raw model output directly.

use crate::domain::{Baseline, CoefficientBatch, CoefficientSet, DesignParams, SmokeYields};

/// Division that degrades to zero on zero or non-finite denominators.
///
/// This is a deliberate, documented policy carried from the source system:
/// a baseline whose raw prediction is 0 yields a 0 scaled prediction, not an
/// error. Keep this quirk; callers depend on it.
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        numerator / denominator
    }
}

/// Round to 2 decimal places for user-facing yield values.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Raw affine prediction for one response: intercept + Σ paramᵢ·coeffᵢ.
/// No clamping.
pub fn predict_raw(params: DesignParams, set: &CoefficientSet) -> f64 {
    let p = params.to_array();
    let mut acc = set.intercept;
    for (value, coeff) in p.iter().zip(set.coefficients.iter()) {
        acc += value * coeff;
    }
    acc
}

/// Raw predictions for all three responses.
pub fn predict_all(params: DesignParams, batch: &CoefficientBatch) -> SmokeYields {
    let mut out = SmokeYields {
        tar: 0.0,
        nicotine: 0.0,
        co: 0.0,
    };
    for set in batch.sets() {
        out.set(set.response, predict_raw(params, set));
    }
    out
}

/// Baseline-anchored prediction for a candidate design.
///
/// Per response: `measured_baseline * (raw(candidate) / raw(baseline))`,
/// rounded to 2 decimals. The ratio degrades to 0 when the baseline's raw
/// prediction is 0 or non-finite (see `safe_divide`).
pub fn predict_scaled(
    baseline: &Baseline,
    candidate: DesignParams,
    batch: &CoefficientBatch,
) -> SmokeYields {
    let base = predict_all(baseline.params, batch);
    let cand = predict_all(candidate, batch);

    let mut out = SmokeYields {
        tar: 0.0,
        nicotine: 0.0,
        co: 0.0,
    };
    for set in batch.sets() {
        let r = set.response;
        let ratio = safe_divide(cand.get(r), base.get(r));
        out.set(r, round2(baseline.measured.get(r) * ratio));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CoefficientSet, PREDICTOR_COUNT, ResponseKind};

    fn set(response: ResponseKind, intercept: f64, coefficients: [f64; PREDICTOR_COUNT]) -> CoefficientSet {
        CoefficientSet {
            group: "A1".into(),
            batch: 0,
            response,
            intercept,
            coefficients,
        }
    }

    fn batch() -> CoefficientBatch {
        CoefficientBatch::from_sets(
            "A1",
            0,
            vec![
                set(ResponseKind::Tar, 10.0, [2.0, 3.0, 1.0, 0.0, 0.0]),
                set(ResponseKind::Nicotine, 0.5, [0.1, 0.0, 0.0, 0.2, 0.0]),
                set(ResponseKind::Co, 4.0, [1.0, 1.0, 1.0, 1.0, 1.0]),
            ],
        )
        .unwrap()
    }

    fn params(values: [f64; PREDICTOR_COUNT]) -> DesignParams {
        DesignParams::from_array(values)
    }

    #[test]
    fn safe_divide_degrades_to_zero() {
        assert_eq!(safe_divide(3.0, 0.0), 0.0);
        assert_eq!(safe_divide(3.0, f64::NAN), 0.0);
        assert_eq!(safe_divide(3.0, f64::INFINITY), 0.0);
        assert_eq!(safe_divide(3.0, 2.0), 1.5);
        assert_eq!(safe_divide(0.0, 2.0), 0.0);
    }

    #[test]
    fn predict_raw_is_the_affine_dot_product() {
        let s = set(ResponseKind::Tar, 10.0, [2.0, 3.0, 1.0, 0.0, 0.0]);
        let p = params([1.0, 2.0, 3.0, 4.0, 5.0]);
        // 10 + 2*1 + 3*2 + 1*3 = 21, order preserved pairwise.
        assert_eq!(predict_raw(p, &s), 21.0);
    }

    #[test]
    fn scaled_prediction_of_the_baseline_is_its_measurement() {
        let b = batch();
        let baseline = Baseline {
            params: params([1.0, 2.0, 3.0, 4.0, 5.0]),
            measured: SmokeYields {
                tar: 9.87,
                nicotine: 0.91,
                co: 11.23,
            },
        };
        let out = predict_scaled(&baseline, baseline.params, &b);
        assert_eq!(out.tar, 9.87);
        assert_eq!(out.nicotine, 0.91);
        assert_eq!(out.co, 11.23);
    }

    #[test]
    fn zero_baseline_prediction_degrades_to_zero_yield() {
        // Tar model evaluates to exactly 0 at this baseline.
        let b = CoefficientBatch::from_sets(
            "A1",
            0,
            vec![
                set(ResponseKind::Tar, -2.0, [2.0, 0.0, 0.0, 0.0, 0.0]),
                set(ResponseKind::Nicotine, 0.5, [0.0; PREDICTOR_COUNT]),
                set(ResponseKind::Co, 4.0, [0.0; PREDICTOR_COUNT]),
            ],
        )
        .unwrap();
        let baseline = Baseline {
            params: params([1.0, 0.0, 0.0, 0.0, 0.0]),
            measured: SmokeYields {
                tar: 10.0,
                nicotine: 0.9,
                co: 11.0,
            },
        };
        let out = predict_scaled(&baseline, params([2.0, 0.0, 0.0, 0.0, 0.0]), &b);
        assert_eq!(out.tar, 0.0);
        // Constant models ratio to 1; measurements pass through.
        assert_eq!(out.nicotine, 0.9);
        assert_eq!(out.co, 11.0);
    }

    #[test]
    fn scaled_predictions_are_rounded_to_two_decimals() {
        let b = batch();
        let baseline = Baseline {
            params: params([1.0, 1.0, 1.0, 1.0, 1.0]),
            measured: SmokeYields {
                tar: 10.0,
                nicotine: 1.0,
                co: 10.0,
            },
        };
        let out = predict_scaled(&baseline, params([1.1, 1.0, 1.0, 1.0, 1.0]), &b);
        for r in ResponseKind::ALL {
            let v = out.get(r);
            assert_eq!(v, round2(v));
        }
    }
}
