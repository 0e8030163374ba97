//! Inverse recommendation: search the feasible design region for parameter
//! combinations whose predicted yields best match a target.
//!
//! The search anchors on a baseline specimen the same way `predict_scaled`
//! does, but factors the anchoring differently so the per-candidate work is
//! one dot product per response:
//!
//! ```text
//! scale[r] = measured_baseline[r] / raw(baseline)[r]        (once per run)
//! score    = Σ_r weight[r] * |scale[r]·raw(candidate)[r] / target[r] - 1|
//! ```
//!
//! Candidates are scored in parallel and ranked ascending; a lower score is
//! a closer match.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::{
    AxisRange, Baseline, CoefficientBatch, DesignParams, Recommendation, ResponseKind,
    SearchRanges, SmokeYields, Target,
};
use crate::error::{Error, Result};
use crate::fit::grid::SearchGrid;
use crate::fit::predict::{predict_all, round2, safe_divide};

/// Default number of ranked candidates returned.
pub const DEFAULT_TOP_N: usize = 100;

/// Default ceiling on the enumerated grid size.
pub const DEFAULT_MAX_CANDIDATES: u64 = 5_000_000;

/// One recommendation request.
///
/// Filter ventilation and citrate arrive as whole-number percentages (the
/// entry convention of the formulation sheets); the search converts them to
/// fractions internally and reports results back in percent.
#[derive(Debug, Clone)]
pub struct RecommendInput {
    pub baseline: Baseline,
    pub target: Target,
    pub ranges: SearchRanges,
    pub top_n: usize,
    pub max_candidates: u64,
}

impl RecommendInput {
    pub fn new(baseline: Baseline, target: Target, ranges: SearchRanges) -> Self {
        Self {
            baseline,
            target,
            ranges,
            top_n: DEFAULT_TOP_N,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

/// Run the grid search and return the best candidates, ascending by score.
pub fn recommend(
    input: &RecommendInput,
    batch: &CoefficientBatch,
) -> Result<Vec<Recommendation>> {
    input.target.validate()?;
    if !input.baseline.params.is_finite() || !input.baseline.measured.is_finite() {
        return Err(Error::Validation(
            "baseline parameters and measured yields must be finite".into(),
        ));
    }
    if input.top_n == 0 {
        return Err(Error::Validation("top_n must be at least 1".into()));
    }

    // The same percent→fraction conversion must hit the baseline and the
    // range bounds before any computation; mixing units here silently skews
    // every score.
    let baseline = Baseline {
        params: percent_to_fraction(input.baseline.params),
        measured: input.baseline.measured,
    };
    let ranges = normalize_ranges(input.ranges);

    let grid = SearchGrid::new(ranges, input.max_candidates)?;
    let total = grid.candidate_count() as usize;
    debug!(candidates = total, "enumerating design grid");

    // Per-run anchoring factors, shared read-only by all workers.
    let base_pred = predict_all(baseline.params, batch);
    let mut scale = SmokeYields {
        tar: 0.0,
        nicotine: 0.0,
        co: 0.0,
    };
    for r in ResponseKind::ALL {
        scale.set(r, safe_divide(baseline.measured.get(r), base_pred.get(r)));
    }

    let mut scored: Vec<Recommendation> = (0..total)
        .into_par_iter()
        .filter_map(|index| {
            let params = grid.candidate(index);
            let cand_pred = predict_all(params, batch);

            let mut score = 0.0;
            let mut predicted = SmokeYields {
                tar: 0.0,
                nicotine: 0.0,
                co: 0.0,
            };
            for r in ResponseKind::ALL {
                let anchored = scale.get(r) * cand_pred.get(r);
                predicted.set(r, round2(anchored));
                let ratio = safe_divide(anchored, input.target.yields.get(r));
                score += input.target.weights.get(r) * (ratio - 1.0).abs();
            }

            // A non-finite score means the candidate is meaningless, not
            // that the search failed; drop it.
            score.is_finite().then(|| Recommendation {
                params: fraction_to_percent(params),
                predicted,
                score,
            })
        })
        .collect();

    scored.sort_by(|a, b| a.score.total_cmp(&b.score));
    scored.truncate(input.top_n);

    info!(
        group = %batch.group,
        batch = batch.batch,
        candidates = total,
        returned = scored.len(),
        "recommendation search complete"
    );
    Ok(scored)
}

/// Percent→fraction conversion for the two percent-entered parameters.
pub fn percent_to_fraction(params: DesignParams) -> DesignParams {
    DesignParams {
        filter_ventilation: params.filter_ventilation / 100.0,
        citrate: params.citrate / 100.0,
        ..params
    }
}

/// Inverse of `percent_to_fraction`, for reporting results in entry units.
pub fn fraction_to_percent(params: DesignParams) -> DesignParams {
    DesignParams {
        filter_ventilation: params.filter_ventilation * 100.0,
        citrate: params.citrate * 100.0,
        ..params
    }
}

fn normalize_ranges(ranges: SearchRanges) -> SearchRanges {
    let scale = |r: AxisRange| AxisRange {
        min: r.min / 100.0,
        max: r.max / 100.0,
        step: r.step / 100.0,
    };
    SearchRanges {
        filter_ventilation: scale(ranges.filter_ventilation),
        citrate: scale(ranges.citrate),
        ..ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CoefficientSet;

    /// Simple exact models over user-unit magnitudes: after the percent
    /// normalization ventilation contributes as a fraction.
    fn batch() -> CoefficientBatch {
        let set = |response, intercept, coefficients| CoefficientSet {
            group: "A1".into(),
            batch: 0,
            response,
            intercept,
            coefficients,
        };
        CoefficientBatch::from_sets(
            "A1",
            0,
            vec![
                set(ResponseKind::Tar, 2.0, [-10.0, 0.005, 0.02, 0.1, 40.0]),
                set(ResponseKind::Nicotine, 0.2, [-1.0, 0.0005, 0.002, 0.01, 4.0]),
                set(ResponseKind::Co, 3.0, [-8.0, 0.004, 0.03, 0.05, 20.0]),
            ],
        )
        .unwrap()
    }

    fn baseline() -> Baseline {
        Baseline {
            // Percent units for ventilation (25%) and citrate (1%).
            params: DesignParams {
                filter_ventilation: 25.0,
                filter_pressure_drop: 1100.0,
                permeability: 60.0,
                basis_weight: 28.0,
                citrate: 1.0,
            },
            measured: SmokeYields {
                tar: 10.2,
                nicotine: 0.93,
                co: 11.4,
            },
        }
    }

    fn degenerate_ranges(p: DesignParams) -> SearchRanges {
        let fixed = |v| AxisRange {
            min: v,
            max: v,
            step: 1.0,
        };
        SearchRanges {
            filter_ventilation: fixed(p.filter_ventilation),
            filter_pressure_drop: fixed(p.filter_pressure_drop),
            permeability: fixed(p.permeability),
            basis_weight: fixed(p.basis_weight),
            citrate: fixed(p.citrate),
        }
    }

    #[test]
    fn degenerate_range_at_the_baseline_matches_its_measurement() {
        let b = batch();
        let base = baseline();
        let target = Target {
            yields: base.measured,
            weights: SmokeYields {
                tar: 0.5,
                nicotine: 0.3,
                co: 0.2,
            },
        };
        let input = RecommendInput::new(base, target, degenerate_ranges(base.params));

        let out = recommend(&input, &b).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].score < 1e-9);
        // Params are reported back in entry units.
        assert!((out[0].params.filter_ventilation - 25.0).abs() < 1e-9);
        assert!((out[0].params.citrate - 1.0).abs() < 1e-9);
        assert_eq!(out[0].predicted.tar, base.measured.tar);
    }

    #[test]
    fn results_are_sorted_ascending_and_truncated() {
        let b = batch();
        let base = baseline();
        let target = Target {
            yields: base.measured,
            weights: SmokeYields {
                tar: 1.0,
                nicotine: 1.0,
                co: 1.0,
            },
        };
        let mut ranges = degenerate_ranges(base.params);
        ranges.filter_ventilation = AxisRange {
            min: 15.0,
            max: 35.0,
            step: 5.0,
        };
        ranges.permeability = AxisRange {
            min: 40.0,
            max: 80.0,
            step: 10.0,
        };
        let mut input = RecommendInput::new(base, target, ranges);
        input.top_n = 10;

        let out = recommend(&input, &b).unwrap();
        assert_eq!(out.len(), 10);
        for pair in out.windows(2) {
            assert!(pair[0].score <= pair[1].score);
        }
        // The baseline point itself is in the grid and must win.
        assert!(out[0].score < 1e-9);
        assert!((out[0].params.filter_ventilation - 25.0).abs() < 1e-9);
        assert!((out[0].params.permeability - 60.0).abs() < 1e-9);
    }

    #[test]
    fn weights_steer_the_ranking() {
        let b = batch();
        let base = baseline();
        // Ask for a large tar reduction; ventilation is the dominant tar lever.
        let target = Target {
            yields: SmokeYields {
                tar: 8.0,
                nicotine: base.measured.nicotine,
                co: base.measured.co,
            },
            weights: SmokeYields {
                tar: 1.0,
                nicotine: 0.0,
                co: 0.0,
            },
        };
        let mut ranges = degenerate_ranges(base.params);
        ranges.filter_ventilation = AxisRange {
            min: 25.0,
            max: 45.0,
            step: 5.0,
        };
        let input = RecommendInput::new(base, target, ranges);

        let out = recommend(&input, &b).unwrap();
        // With only tar weighted, the winner must not be the no-change point.
        assert!(out[0].params.filter_ventilation > 25.0);
        assert!(out[0].predicted.tar < base.measured.tar);
    }

    #[test]
    fn oversized_grid_fails_fast() {
        let b = batch();
        let base = baseline();
        let target = Target {
            yields: base.measured,
            weights: SmokeYields {
                tar: 1.0,
                nicotine: 1.0,
                co: 1.0,
            },
        };
        let mut ranges = degenerate_ranges(base.params);
        ranges.permeability = AxisRange {
            min: 0.0,
            max: 100.0,
            step: 1.0,
        };
        let mut input = RecommendInput::new(base, target, ranges);
        input.max_candidates = 50;

        assert!(matches!(
            recommend(&input, &b).unwrap_err(),
            Error::ExcessiveSearchSpace { ceiling: 50, .. }
        ));
    }

    #[test]
    fn negative_weights_are_rejected() {
        let b = batch();
        let base = baseline();
        let target = Target {
            yields: base.measured,
            weights: SmokeYields {
                tar: -0.1,
                nicotine: 0.5,
                co: 0.5,
            },
        };
        let input = RecommendInput::new(base, target, degenerate_ranges(base.params));
        assert!(matches!(
            recommend(&input, &b).unwrap_err(),
            Error::Validation(_)
        ));
    }
}
