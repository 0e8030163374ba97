//! Export computed results to CSV/JSON.
//!
//! The CSV exports are meant to be easy to consume in spreadsheets; the JSON
//! export is the machine-readable record of a whole recommendation run.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Baseline, DesignParams, Recommendation, SearchRanges, SmokeYields, Target};
use crate::error::{Error, Result};

/// Write ranked recommendations to a CSV file.
///
/// Parameters are in entry units (percent for ventilation/citrate), matching
/// the terminal report.
pub fn write_recommendations_csv(path: &Path, recommendations: &[Recommendation]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        Error::Validation(format!(
            "failed to create export CSV '{}': {e}",
            path.display()
        ))
    })?;

    writeln!(
        file,
        "rank,filter_ventilation,filter_pressure_drop,permeability,basis_weight,citrate,\
         pred_tar,pred_nicotine,pred_co,score"
    )?;
    for (rank, rec) in recommendations.iter().enumerate() {
        let p = rec.params;
        let y = rec.predicted;
        writeln!(
            file,
            "{},{:.4},{:.4},{:.4},{:.4},{:.4},{:.2},{:.2},{:.2},{:.6}",
            rank + 1,
            p.filter_ventilation,
            p.filter_pressure_drop,
            p.permeability,
            p.basis_weight,
            p.citrate,
            y.tar,
            y.nicotine,
            y.co,
            rec.score,
        )?;
    }
    Ok(())
}

/// Write a single scaled prediction to a CSV file (one row).
pub fn write_prediction_csv(
    path: &Path,
    baseline: &Baseline,
    candidate: DesignParams,
    predicted: SmokeYields,
) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        Error::Validation(format!(
            "failed to create export CSV '{}': {e}",
            path.display()
        ))
    })?;

    writeln!(
        file,
        "filter_ventilation,filter_pressure_drop,permeability,basis_weight,citrate,\
         base_tar,base_nicotine,base_co,pred_tar,pred_nicotine,pred_co"
    )?;
    writeln!(
        file,
        "{:.4},{:.4},{:.4},{:.4},{:.4},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
        candidate.filter_ventilation,
        candidate.filter_pressure_drop,
        candidate.permeability,
        candidate.basis_weight,
        candidate.citrate,
        baseline.measured.tar,
        baseline.measured.nicotine,
        baseline.measured.co,
        predicted.tar,
        predicted.nicotine,
        predicted.co,
    )?;
    Ok(())
}

/// Machine-readable record of a recommendation run.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationRun {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub group: String,
    pub batch: i64,
    pub baseline: Baseline,
    pub target: Target,
    pub ranges: SearchRanges,
    pub recommendations: Vec<Recommendation>,
}

/// Write a recommendation run as a JSON document.
pub fn write_recommendation_json(path: &Path, run: &RecommendationRun) -> Result<()> {
    let file = File::create(path).map_err(|e| {
        Error::Validation(format!(
            "failed to create export JSON '{}': {e}",
            path.display()
        ))
    })?;
    serde_json::to_writer_pretty(file, run)?;
    Ok(())
}
