//! Sample CRUD and grouped queries.

use chrono::Utc;
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};

use crate::domain::{DesignParams, NewSample, Sample, SmokeYields};
use crate::error::{Error, Result};

use super::{Store, format_decimal, format_timestamp, parse_decimal, parse_timestamp};

/// Columns selected for every sample query, in `row_to_sample` order.
const SAMPLE_COLUMNS: &str = "id, group_name, code, filter_ventilation, filter_pressure_drop, \
     permeability, basis_weight, citrate, tar, nicotine, co, created_at, updated_at";

impl Store {
    /// Insert one sample, assigning its id and timestamps.
    pub fn create_sample(&mut self, sample: &NewSample) -> Result<Sample> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let created = insert_sample_tx(&tx, sample)?;
        tx.commit()?;
        Ok(created)
    }

    /// Insert a batch of samples in one transaction (all-or-nothing).
    ///
    /// The first invalid or duplicate row aborts the whole batch; the error
    /// names the offending sample.
    pub fn create_samples(&mut self, samples: &[NewSample]) -> Result<Vec<Sample>> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut created = Vec::with_capacity(samples.len());
        for sample in samples {
            created.push(insert_sample_tx(&tx, sample)?);
        }
        tx.commit()?;
        Ok(created)
    }

    pub fn sample(&self, id: i64) -> Result<Sample> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {SAMPLE_COLUMNS} FROM samples WHERE id = ?1"),
                params![id],
                read_sample_row,
            )
            .optional()?;
        match row {
            Some(raw) => raw.into_sample(),
            None => Err(Error::NotFound(format!("sample {id}"))),
        }
    }

    /// All samples in a group, newest first.
    pub fn samples_in_group(&self, group: &str) -> Result<Vec<Sample>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {SAMPLE_COLUMNS} FROM samples
             WHERE group_name = ?1
             ORDER BY created_at DESC, id DESC"
        ))?;
        let raws = stmt
            .query_map(params![group], read_sample_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawSample::into_sample).collect()
    }

    /// Fuzzy code lookup within a group (`LIKE %fragment%`), newest first.
    pub fn find_by_code(&self, group: &str, code_fragment: &str) -> Result<Vec<Sample>> {
        let pattern = format!("%{code_fragment}%");
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {SAMPLE_COLUMNS} FROM samples
             WHERE group_name = ?1 AND code LIKE ?2
             ORDER BY created_at DESC, id DESC"
        ))?;
        let raws = stmt
            .query_map(params![group, pattern], read_sample_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawSample::into_sample).collect()
    }

    /// Distinct group names, ordered by most recently added sample.
    pub fn groups(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT group_name FROM samples
             GROUP BY group_name
             ORDER BY MAX(created_at) DESC, MAX(id) DESC",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Delete one sample. Removing the last sample of a group also removes
    /// that group's coefficient sets, in the same transaction.
    pub fn delete_sample(&mut self, id: i64) -> Result<()> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let group: Option<String> = tx
            .query_row(
                "SELECT group_name FROM samples WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(group) = group else {
            return Err(Error::NotFound(format!("sample {id}")));
        };
        tx.execute("DELETE FROM samples WHERE id = ?1", params![id])?;
        let remaining: i64 = tx.query_row(
            "SELECT COUNT(*) FROM samples WHERE group_name = ?1",
            params![&group],
            |row| row.get(0),
        )?;
        if remaining == 0 {
            super::coefficients::delete_for_group(&tx, &group)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Delete a whole group: all samples plus its coefficient sets.
    /// Returns the number of samples removed.
    pub fn delete_group(&mut self, group: &str) -> Result<usize> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = tx.execute("DELETE FROM samples WHERE group_name = ?1", params![group])?;
        if removed == 0 {
            return Err(Error::NotFound(format!("group '{group}'")));
        }
        super::coefficients::delete_for_group(&tx, group)?;
        tx.commit()?;
        Ok(removed)
    }
}

fn insert_sample_tx(tx: &rusqlite::Transaction<'_>, sample: &NewSample) -> Result<Sample> {
    sample.validate()?;

    // Explicit pre-check instead of decoding SQLite constraint errors; the
    // store assumes single-writer semantics so this cannot race.
    let exists: Option<i64> = tx
        .query_row(
            "SELECT id FROM samples WHERE group_name = ?1 AND code = ?2",
            params![&sample.group, &sample.code],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_some() {
        return Err(Error::DuplicateCode {
            group: sample.group.clone(),
            code: sample.code.clone(),
        });
    }

    let now = Utc::now();
    let ts = format_timestamp(now);
    let p = sample.params;
    let y = sample.yields;
    tx.execute(
        "INSERT INTO samples (group_name, code, filter_ventilation, filter_pressure_drop,
                              permeability, basis_weight, citrate, tar, nicotine, co,
                              created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            &sample.group,
            &sample.code,
            format_decimal(p.filter_ventilation),
            format_decimal(p.filter_pressure_drop),
            format_decimal(p.permeability),
            format_decimal(p.basis_weight),
            format_decimal(p.citrate),
            format_decimal(y.tar),
            format_decimal(y.nicotine),
            format_decimal(y.co),
            ts,
        ],
    )?;
    let id = tx.last_insert_rowid();

    Ok(Sample {
        id,
        group: sample.group.clone(),
        code: sample.code.clone(),
        params: sample.params,
        yields: sample.yields,
        created_at: now,
        updated_at: now,
    })
}

/// Textual row image; parsed into a `Sample` outside the rusqlite closure so
/// parse failures surface as our own `Validation` errors.
struct RawSample {
    id: i64,
    group: String,
    code: String,
    fields: [String; 8],
    created_at: String,
    updated_at: String,
}

fn read_sample_row(row: &Row<'_>) -> rusqlite::Result<RawSample> {
    Ok(RawSample {
        id: row.get(0)?,
        group: row.get(1)?,
        code: row.get(2)?,
        fields: [
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
            row.get(9)?,
            row.get(10)?,
        ],
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

impl RawSample {
    fn into_sample(self) -> Result<Sample> {
        let labels = [
            "filter_ventilation",
            "filter_pressure_drop",
            "permeability",
            "basis_weight",
            "citrate",
            "tar",
            "nicotine",
            "co",
        ];
        let mut values = [0.0; 8];
        for (i, (label, text)) in labels.iter().zip(self.fields.iter()).enumerate() {
            values[i] = parse_decimal(label, text)?;
        }
        Ok(Sample {
            id: self.id,
            group: self.group,
            code: self.code,
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
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
        })
    }
}
