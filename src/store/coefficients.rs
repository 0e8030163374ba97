//! Coefficient-batch persistence.
//!
//! Regression output is append-only: three rows (one per response) per
//! (group, batch), written atomically, never updated. The `c_potassium`
//! column is reserved schema space and always NULL.

use chrono::Utc;
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};

use crate::domain::{CoefficientBatch, CoefficientSet, PREDICTOR_COUNT, ResponseKind};
use crate::error::{Error, Result};

use super::{Store, format_decimal, format_timestamp, parse_decimal};

impl Store {
    /// Persist one regression run's coefficient sets in a single transaction.
    ///
    /// The batch number is a per-group monotonic counter; the expected next
    /// value is re-checked inside the transaction so a stale caller cannot
    /// interleave batches out of order.
    pub fn insert_coefficient_batch(&mut self, batch: &CoefficientBatch) -> Result<()> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let current: Option<i64> = tx
                .query_row(
                    "SELECT MAX(batch) FROM coefficient_sets WHERE group_name = ?1",
                    params![&batch.group],
                    |row| row.get(0),
                )
                .optional()?
                .flatten();
            let expected = current.map_or(0, |b| b + 1);
            if batch.batch != expected {
                return Err(Error::Validation(format!(
                    "batch {} for group '{}' is out of sequence (expected {expected})",
                    batch.batch, batch.group
                )));
            }
            let ts = format_timestamp(Utc::now());
            let mut stmt = tx.prepare(
                "INSERT INTO coefficient_sets
                     (group_name, batch, response, intercept,
                      c_filter_ventilation, c_filter_pressure_drop, c_permeability,
                      c_basis_weight, c_citrate, c_potassium, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, ?10)",
            )?;
            for set in batch.sets() {
                let c = set.coefficients;
                stmt.execute(params![
                    &set.group,
                    set.batch,
                    set.response.tag(),
                    format_decimal(set.intercept),
                    format_decimal(c[0]),
                    format_decimal(c[1]),
                    format_decimal(c[2]),
                    format_decimal(c[3]),
                    format_decimal(c[4]),
                    ts,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Load the three coefficient sets for (group, batch).
    pub fn coefficient_batch(&self, group: &str, batch: i64) -> Result<CoefficientBatch> {
        let mut stmt = self.conn().prepare(
            "SELECT response, intercept,
                    c_filter_ventilation, c_filter_pressure_drop, c_permeability,
                    c_basis_weight, c_citrate
             FROM coefficient_sets
             WHERE group_name = ?1 AND batch = ?2",
        )?;
        let raws = stmt
            .query_map(params![group, batch], read_coefficient_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        if raws.is_empty() {
            return Err(Error::NotFound(format!(
                "coefficient batch {batch} for group '{group}'"
            )));
        }
        let sets = raws
            .into_iter()
            .map(|raw| raw.into_set(group, batch))
            .collect::<Result<Vec<_>>>()?;
        CoefficientBatch::from_sets(group, batch, sets)
    }

    /// Latest (and therefore current) batch for a group, newest coefficients
    /// win. `None` if the group has never been fit.
    pub fn latest_batch(&self, group: &str) -> Result<Option<i64>> {
        let max: Option<i64> = self
            .conn()
            .query_row(
                "SELECT MAX(batch) FROM coefficient_sets WHERE group_name = ?1",
                params![group],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        Ok(max)
    }

    /// The latest coefficient batch for a group, or `NotFound` if the group
    /// has never been fit.
    pub fn latest_coefficient_batch(&self, group: &str) -> Result<CoefficientBatch> {
        match self.latest_batch(group)? {
            Some(batch) => self.coefficient_batch(group, batch),
            None => Err(Error::NotFound(format!(
                "fitted coefficients for group '{group}'"
            ))),
        }
    }

    /// Remove every coefficient set recorded for a group, across all
    /// batches. Returns the number of rows removed; a never-fit group
    /// removes zero rows and is not an error.
    pub fn delete_coefficients(&mut self, group: &str) -> Result<usize> {
        Ok(delete_for_group(self.conn(), group)?)
    }
}

/// Shared by `delete_coefficients` and the sample-side cascades, which run
/// it inside their own transactions.
pub(crate) fn delete_for_group(
    conn: &rusqlite::Connection,
    group: &str,
) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM coefficient_sets WHERE group_name = ?1",
        params![group],
    )
}

struct RawCoefficients {
    response: String,
    intercept: String,
    coefficients: [String; PREDICTOR_COUNT],
}

fn read_coefficient_row(row: &Row<'_>) -> rusqlite::Result<RawCoefficients> {
    Ok(RawCoefficients {
        response: row.get(0)?,
        intercept: row.get(1)?,
        coefficients: [
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ],
    })
}

impl RawCoefficients {
    fn into_set(self, group: &str, batch: i64) -> Result<CoefficientSet> {
        let response = ResponseKind::from_tag(&self.response)?;
        let mut coefficients = [0.0; PREDICTOR_COUNT];
        for (i, text) in self.coefficients.iter().enumerate() {
            coefficients[i] = parse_decimal("coefficient", text)?;
        }
        Ok(CoefficientSet {
            group: group.to_string(),
            batch,
            response,
            intercept: parse_decimal("intercept", &self.intercept)?,
            coefficients,
        })
    }
}
