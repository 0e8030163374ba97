//! Command-line parsing for the formulation modeling tool.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the store/modeling code.
//!
//! Unit conventions at this boundary:
//! - samples (import/add/predict) use stored units: ventilation and citrate
//!   as fractions, pressure drop in source units
//! - `recommend` follows the formulation-sheet convention: ventilation and
//!   citrate ranges are entered as whole-number percentages and converted
//!   internally

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::AxisRange;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "auxfit",
    version,
    about = "Auxiliary-material formulation modeling and design recommendation"
)]
pub struct Cli {
    /// Path to the embedded sample/coefficient database.
    #[arg(long, global = true, default_value = "auxfit.db")]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Bulk-import samples for one group from a CSV file (all-or-nothing).
    Import(ImportArgs),
    /// Add a single sample.
    Add(AddArgs),
    /// List sample groups, most recently touched first.
    Groups,
    /// List samples in a group, optionally filtered by a code fragment.
    Samples(SamplesArgs),
    /// Delete one sample by id, or a whole group.
    Delete(DeleteArgs),
    /// Refit the regression for a group, producing a new coefficient batch.
    Fit(GroupArg),
    /// Show a group's coefficient batch (latest unless --batch is given).
    Coeffs(CoeffsArgs),
    /// Predict scaled smoke yields for a candidate design.
    Predict(PredictArgs),
    /// Search a design-parameter grid for the best matches to target yields.
    Recommend(RecommendArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Group (specimen/model name) the samples belong to.
    #[arg(short, long)]
    pub group: String,

    /// CSV file with columns: code, filter_ventilation, filter_pressure_drop,
    /// permeability, basis_weight, citrate, tar, nicotine, co.
    pub csv: PathBuf,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(short, long)]
    pub group: String,

    /// Specimen code, unique within the group.
    #[arg(long)]
    pub code: String,

    #[arg(long)]
    pub ventilation: f64,
    #[arg(long)]
    pub pressure_drop: f64,
    #[arg(long)]
    pub permeability: f64,
    #[arg(long)]
    pub basis_weight: f64,
    #[arg(long)]
    pub citrate: f64,

    #[arg(long)]
    pub tar: f64,
    #[arg(long)]
    pub nicotine: f64,
    #[arg(long)]
    pub co: f64,
}

#[derive(Debug, Args)]
pub struct SamplesArgs {
    #[arg(short, long)]
    pub group: String,

    /// Fuzzy code filter (substring match).
    #[arg(long)]
    pub code: Option<String>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Sample id to delete.
    #[arg(long, conflicts_with = "group")]
    pub id: Option<i64>,

    /// Group to delete entirely (samples and coefficients).
    #[arg(short, long)]
    pub group: Option<String>,
}

#[derive(Debug, Args)]
pub struct GroupArg {
    #[arg(short, long)]
    pub group: String,
}

#[derive(Debug, Args)]
pub struct CoeffsArgs {
    #[arg(short, long)]
    pub group: String,

    /// Batch number; defaults to the latest batch.
    #[arg(long)]
    pub batch: Option<i64>,
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    #[arg(short, long)]
    pub group: String,

    /// Code of the stored baseline sample (known measured yields).
    #[arg(short, long)]
    pub baseline: String,

    /// Batch number; defaults to the latest batch.
    #[arg(long)]
    pub batch: Option<i64>,

    #[arg(long)]
    pub ventilation: f64,
    #[arg(long)]
    pub pressure_drop: f64,
    #[arg(long)]
    pub permeability: f64,
    #[arg(long)]
    pub basis_weight: f64,
    #[arg(long)]
    pub citrate: f64,

    /// Optional CSV export of the prediction.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RecommendArgs {
    #[arg(short, long)]
    pub group: String,

    /// Code of the stored baseline sample.
    #[arg(short, long)]
    pub baseline: String,

    /// Batch number; defaults to the latest batch.
    #[arg(long)]
    pub batch: Option<i64>,

    /// Target yields.
    #[arg(long)]
    pub tar: f64,
    #[arg(long)]
    pub nicotine: f64,
    #[arg(long)]
    pub co: f64,

    /// Per-response weights (nonnegative; larger = more important).
    #[arg(long, default_value_t = 1.0)]
    pub weight_tar: f64,
    #[arg(long, default_value_t = 1.0)]
    pub weight_nicotine: f64,
    #[arg(long, default_value_t = 1.0)]
    pub weight_co: f64,

    /// Search ranges as `min:max:step` (or a single value for a fixed axis).
    /// Ventilation and citrate are in whole-number percent.
    #[arg(long, value_parser = parse_axis_range)]
    pub ventilation: AxisRange,
    #[arg(long, value_parser = parse_axis_range)]
    pub pressure_drop: AxisRange,
    #[arg(long, value_parser = parse_axis_range)]
    pub permeability: AxisRange,
    #[arg(long, value_parser = parse_axis_range)]
    pub basis_weight: AxisRange,
    #[arg(long, value_parser = parse_axis_range)]
    pub citrate: AxisRange,

    /// Number of ranked candidates to return.
    #[arg(long, default_value_t = crate::fit::DEFAULT_TOP_N)]
    pub top: usize,

    /// Ceiling on the enumerated grid size.
    #[arg(long, default_value_t = crate::fit::DEFAULT_MAX_CANDIDATES)]
    pub max_candidates: u64,

    /// Optional CSV export of the ranked candidates.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Optional JSON export of the full run.
    #[arg(long)]
    pub export_json: Option<PathBuf>,
}

/// Parse `min:max:step`, `min:max` (step 1), or a single fixed value.
pub fn parse_axis_range(text: &str) -> Result<AxisRange, String> {
    let parts: Vec<&str> = text.split(':').collect();
    let number = |s: &str| -> Result<f64, String> {
        s.trim()
            .parse::<f64>()
            .map_err(|_| format!("'{s}' is not a number in range '{text}'"))
    };
    match parts.as_slice() {
        [value] => {
            let v = number(value)?;
            Ok(AxisRange {
                min: v,
                max: v,
                step: 1.0,
            })
        }
        [min, max] => Ok(AxisRange {
            min: number(min)?,
            max: number(max)?,
            step: 1.0,
        }),
        [min, max, step] => Ok(AxisRange {
            min: number(min)?,
            max: number(max)?,
            step: number(step)?,
        }),
        _ => Err(format!(
            "range '{text}' must be 'min:max:step', 'min:max', or a single value"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_range_parses_all_forms() {
        assert_eq!(
            parse_axis_range("15:35:5").unwrap(),
            AxisRange {
                min: 15.0,
                max: 35.0,
                step: 5.0
            }
        );
        assert_eq!(
            parse_axis_range("15:35").unwrap(),
            AxisRange {
                min: 15.0,
                max: 35.0,
                step: 1.0
            }
        );
        assert_eq!(
            parse_axis_range("1100").unwrap(),
            AxisRange {
                min: 1100.0,
                max: 1100.0,
                step: 1.0
            }
        );
        assert!(parse_axis_range("a:b:c").is_err());
        assert!(parse_axis_range("1:2:3:4").is_err());
    }

    #[test]
    fn cli_parses_a_recommend_invocation() {
        let cli = Cli::try_parse_from([
            "auxfit",
            "recommend",
            "--group",
            "A1",
            "--baseline",
            "A1-001",
            "--tar",
            "9.0",
            "--nicotine",
            "0.9",
            "--co",
            "10.5",
            "--ventilation",
            "15:35:5",
            "--pressure-drop",
            "1100",
            "--permeability",
            "40:80:10",
            "--basis-weight",
            "28",
            "--citrate",
            "0.5:2:0.5",
            "--top",
            "10",
        ])
        .unwrap();
        match cli.command {
            Command::Recommend(args) => {
                assert_eq!(args.group, "A1");
                assert_eq!(args.top, 10);
                assert_eq!(args.ventilation.step, 5.0);
                assert_eq!(args.pressure_drop.min, args.pressure_drop.max);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
