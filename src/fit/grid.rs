//! Design-grid generation.
//!
//! The recommendation search enumerates the full Cartesian product of five
//! per-parameter grids. Why exhaustive enumeration?
//!
//! - it is deterministic given the same ranges/steps
//! - the objective is cheap (one dot product per response), so modest grids
//!   evaluate quickly
//! - it cannot miss the optimum inside the caller's feasible region
//!
//! The product can still explode for tiny steps, so sizing is strictly
//! count-first: every axis's point count is computed in `u128` (saturating),
//! the product is checked against the ceiling, and only then are the axis
//! vectors materialized. A pathological-but-valid range (e.g. a span of
//! 1e300 with a 1e-3 step) must fail with `ExcessiveSearchSpace` before a
//! single point is allocated. Candidates are decoded from a flat index
//! instead of materializing the product eagerly.

use crate::domain::{AxisRange, DesignParams, PREDICTOR_COUNT, SearchRanges};
use crate::error::{Error, Result};

/// Relative tolerance for including the upper endpoint of an axis.
const ENDPOINT_TOLERANCE: f64 = 1e-9;

/// Number of points on one axis: `floor((max - min) / step) + 1`, with the
/// upper endpoint included within floating tolerance. A degenerate
/// `min == max` axis has one point.
///
/// The count saturates at `u128::MAX` when the span/step ratio exceeds what
/// `u128` can hold; callers compare against a ceiling, so saturation only
/// ever makes an absurd grid look absurd.
pub fn axis_point_count(range: AxisRange) -> Result<u128> {
    let AxisRange { min, max, step } = range;
    if !(min.is_finite() && max.is_finite() && step.is_finite()) {
        return Err(Error::Validation(format!(
            "axis range must be finite: min={min}, max={max}, step={step}"
        )));
    }
    if max < min {
        return Err(Error::Validation(format!(
            "axis range has max < min: [{min}, {max}]"
        )));
    }
    if step <= 0.0 {
        return Err(Error::Validation(format!(
            "axis step must be > 0, got {step}"
        )));
    }

    let span = max - min;
    let tolerance = ENDPOINT_TOLERANCE * span.abs().max(1.0);
    let count = ((span + tolerance) / step).floor() + 1.0;
    if !count.is_finite() || count >= u128::MAX as f64 {
        return Ok(u128::MAX);
    }
    Ok(count as u128)
}

/// Materialize one axis. Only called after the grid-wide ceiling check, so
/// `count` is known to be an allocatable size.
fn build_axis(range: AxisRange, count: usize) -> Vec<f64> {
    let mut points = Vec::with_capacity(count);
    for i in 0..count {
        points.push(range.min + range.step * i as f64);
    }
    points
}

/// The precomputed five-axis search grid.
#[derive(Debug)]
pub struct SearchGrid {
    axes: [Vec<f64>; PREDICTOR_COUNT],
}

impl SearchGrid {
    /// Validate the ranges, check the total candidate count against
    /// `ceiling`, and materialize the axes — in that order.
    pub fn new(ranges: SearchRanges, ceiling: u64) -> Result<Self> {
        let r = ranges.to_array();
        let mut counts = [0u128; PREDICTOR_COUNT];
        for (count, range) in counts.iter_mut().zip(r.iter()) {
            *count = axis_point_count(*range)?;
        }

        let candidates = counts
            .iter()
            .fold(1u128, |acc, count| acc.saturating_mul(*count));
        if candidates > ceiling as u128 {
            return Err(Error::ExcessiveSearchSpace { candidates, ceiling });
        }

        // Every axis count divides the (ceiling-bounded) product, so the
        // usize casts and allocations below cannot overflow.
        Ok(Self {
            axes: [
                build_axis(r[0], counts[0] as usize),
                build_axis(r[1], counts[1] as usize),
                build_axis(r[2], counts[2] as usize),
                build_axis(r[3], counts[3] as usize),
                build_axis(r[4], counts[4] as usize),
            ],
        })
    }

    /// Total candidate count across all five axes.
    pub fn candidate_count(&self) -> u128 {
        self.axes.iter().map(|axis| axis.len() as u128).product()
    }

    /// Decode a flat candidate index into a parameter vector.
    ///
    /// Index layout is row-major over the axes in predictor order; callers
    /// iterate `0..candidate_count()` (ceiling-bounded at construction, so
    /// the count fits in `usize`).
    pub fn candidate(&self, mut index: usize) -> DesignParams {
        let mut values = [0.0; PREDICTOR_COUNT];
        for axis_idx in (0..PREDICTOR_COUNT).rev() {
            let axis = &self.axes[axis_idx];
            values[axis_idx] = axis[index % axis.len()];
            index /= axis.len();
        }
        DesignParams::from_array(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: f64, max: f64, step: f64) -> AxisRange {
        AxisRange { min, max, step }
    }

    fn axis_points(r: AxisRange) -> Result<Vec<f64>> {
        let count = axis_point_count(r)?;
        Ok(build_axis(r, count as usize))
    }

    #[test]
    fn axis_count_is_floor_span_over_step_plus_one() {
        assert_eq!(axis_point_count(range(0.0, 1.0, 0.3)).unwrap(), 4);
        let points = axis_points(range(0.0, 1.0, 0.3)).unwrap();
        // floor(1.0/0.3) + 1 = 4 points: 0.0, 0.3, 0.6, 0.9
        assert_eq!(points.len(), 4);
        assert!((points[3] - 0.9).abs() < 1e-12);
        assert!(points.iter().all(|p| *p <= 1.0));
    }

    #[test]
    fn axis_includes_endpoint_reached_within_tolerance() {
        // 0.1 steps accumulate floating error; 2.0 must still be included.
        let points = axis_points(range(1.0, 2.0, 0.1)).unwrap();
        assert_eq!(points.len(), 11);
        assert!((points[10] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_axis_has_one_point() {
        let points = axis_points(range(25.0, 25.0, 5.0)).unwrap();
        assert_eq!(points, vec![25.0]);
    }

    #[test]
    fn invalid_axes_are_rejected() {
        assert!(axis_point_count(range(1.0, 0.0, 0.1)).is_err());
        assert!(axis_point_count(range(0.0, 1.0, 0.0)).is_err());
        assert!(axis_point_count(range(0.0, 1.0, -0.5)).is_err());
        assert!(axis_point_count(range(0.0, f64::INFINITY, 1.0)).is_err());
    }

    #[test]
    fn astronomical_axis_count_saturates_instead_of_overflowing() {
        // ~1e303 points: far beyond u128, must saturate, not wrap or panic.
        assert_eq!(
            axis_point_count(range(0.0, 1e300, 1e-3)).unwrap(),
            u128::MAX
        );
        // ~1e12 points: representable, but never worth allocating.
        let count = axis_point_count(range(0.0, 1e9, 1e-3)).unwrap();
        assert!(count > 1_000_000_000_000 - 2 && count < 1_100_000_000_000);
    }

    fn ranges(axis: AxisRange) -> SearchRanges {
        SearchRanges {
            filter_ventilation: axis,
            filter_pressure_drop: axis,
            permeability: axis,
            basis_weight: axis,
            citrate: axis,
        }
    }

    #[test]
    fn candidate_count_is_the_product_of_axis_sizes() {
        // 3 points per axis, 5 axes.
        let grid = SearchGrid::new(ranges(range(0.0, 1.0, 0.5)), 243).unwrap();
        assert_eq!(grid.candidate_count(), 243);
        assert!(matches!(
            SearchGrid::new(ranges(range(0.0, 1.0, 0.5)), 242).unwrap_err(),
            Error::ExcessiveSearchSpace {
                candidates: 243,
                ceiling: 242
            }
        ));
    }

    #[test]
    fn huge_axis_fails_fast_without_materializing() {
        // A finite, individually valid range whose point count dwarfs any
        // ceiling. Construction must return ExcessiveSearchSpace before
        // allocating a single axis point (and without count overflow).
        let mut r = ranges(range(25.0, 25.0, 1.0));
        r.permeability = range(0.0, 1e300, 1e-3);
        assert!(matches!(
            SearchGrid::new(r, u64::MAX).unwrap_err(),
            Error::ExcessiveSearchSpace {
                candidates: u128::MAX,
                ..
            }
        ));

        // Mid-sized blowup (~1e12 candidates) takes the same early exit.
        let mut r = ranges(range(25.0, 25.0, 1.0));
        r.permeability = range(0.0, 1e9, 1e-3);
        assert!(matches!(
            SearchGrid::new(r, 5_000_000).unwrap_err(),
            Error::ExcessiveSearchSpace {
                ceiling: 5_000_000,
                ..
            }
        ));
    }

    #[test]
    fn flat_index_decoding_walks_the_last_axis_fastest() {
        let grid = SearchGrid::new(ranges(range(0.0, 1.0, 1.0)), 32).unwrap();
        let first = grid.candidate(0).to_array();
        assert_eq!(first, [0.0; PREDICTOR_COUNT]);
        let second = grid.candidate(1).to_array();
        assert_eq!(second, [0.0, 0.0, 0.0, 0.0, 1.0]);
        let last = grid.candidate(31).to_array();
        assert_eq!(last, [1.0; PREDICTOR_COUNT]);
    }

    #[test]
    fn decoding_covers_every_combination_exactly_once() {
        let grid = SearchGrid::new(ranges(range(0.0, 2.0, 1.0)), 243).unwrap();
        let total = grid.candidate_count() as usize;
        let mut seen = std::collections::HashSet::new();
        for i in 0..total {
            let key: Vec<i64> = grid
                .candidate(i)
                .to_array()
                .iter()
                .map(|v| v.round() as i64)
                .collect();
            assert!(seen.insert(key));
        }
        assert_eq!(seen.len(), 243);
    }
}
