//! CSV sample import.
//!
//! This module turns a formulation-sheet CSV into validated `NewSample`
//! records ready for a bulk store insert.
//!
//! Design goals:
//! - **Strict schema**: every column is required; missing columns fail early
//!   with a clear message
//! - **All-or-nothing**: the first malformed row aborts the whole import and
//!   names its line — partial imports are worse than failed ones here,
//!   because a half-loaded group silently changes the next refit
//! - **Separation of concerns**: no store or fitting logic in this module

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{DesignParams, NewSample, SmokeYields};
use crate::error::{Error, Result};

/// Required columns. `code` is the specimen code; the rest are the numeric
/// fields in storage order.
const REQUIRED_COLUMNS: [&str; 9] = [
    "code",
    "filter_ventilation",
    "filter_pressure_drop",
    "permeability",
    "basis_weight",
    "citrate",
    "tar",
    "nicotine",
    "co",
];

/// Read and validate a sample CSV for one group.
pub fn read_samples_csv(path: &Path, group: &str) -> Result<Vec<NewSample>> {
    let file = File::open(path).map_err(|e| {
        Error::Validation(format!("failed to open CSV '{}': {e}", path.display()))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    let header_map = build_header_map(&headers);
    for column in REQUIRED_COLUMNS {
        if !header_map.contains_key(column) {
            return Err(Error::Validation(format!(
                "CSV '{}' is missing required column '{column}'",
                path.display()
            )));
        }
    }

    let mut samples = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header row and CSV lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| {
            Error::Validation(format!("CSV parse error at line {line}: {e}"))
        })?;
        let sample = parse_row(&record, &header_map, group)
            .map_err(|e| Error::Validation(format!("line {line}: {e}")))?;
        samples.push(sample);
    }

    if samples.is_empty() {
        return Err(Error::Validation(format!(
            "CSV '{}' contains no sample rows",
            path.display()
        )));
    }
    Ok(samples)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().to_ascii_lowercase(), idx))
        .collect()
}

fn field<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    column: &str,
) -> std::result::Result<&'a str, String> {
    header_map
        .get(column)
        .and_then(|idx| record.get(*idx))
        .filter(|text| !text.is_empty())
        .ok_or_else(|| format!("missing value for '{column}'"))
}

fn numeric_field(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    column: &str,
) -> std::result::Result<f64, String> {
    let text = field(record, header_map, column)?;
    let value: f64 = text
        .parse()
        .map_err(|_| format!("'{column}' is not a number: '{text}'"))?;
    if !value.is_finite() {
        return Err(format!("'{column}' is not finite: '{text}'"));
    }
    Ok(value)
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    group: &str,
) -> std::result::Result<NewSample, String> {
    let code = field(record, header_map, "code")?.to_string();
    let mut values = [0.0; 8];
    for (i, column) in REQUIRED_COLUMNS[1..].iter().enumerate() {
        values[i] = numeric_field(record, header_map, column)?;
    }
    Ok(NewSample {
        group: group.to_string(),
        code,
        params: DesignParams {
            filter_ventilation: values[0],
            filter_pressure_drop: values[1],
            permeability: values[2],
            basis_weight: values[3],
            citrate: values[4],
        },
        yields: SmokeYields {
            tar: values[5],
            nicotine: values[6],
            co: values[7],
        },
    })
}
