//! Embedded persistence for samples and fitted coefficients.
//!
//! One SQLite database holds two tables:
//!
//! - `samples` — measured specimens, grouped by group name
//! - `coefficient_sets` — regression output, three rows per (group, batch)
//!
//! Conventions:
//! - numeric fields are stored as decimal TEXT and parsed to `f64` at this
//!   boundary; nothing outside `store` touches the textual representation
//! - every multi-row write runs inside an explicit transaction
//! - all constructors return an explicitly owned `Store`; tests get isolation
//!   from `open_in_memory()`

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::error::{Error, Result};

pub mod coefficients;
pub mod samples;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS samples (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_name TEXT NOT NULL,
    code TEXT NOT NULL,
    filter_ventilation TEXT NOT NULL,
    filter_pressure_drop TEXT NOT NULL,
    permeability TEXT NOT NULL,
    basis_weight TEXT NOT NULL,
    citrate TEXT NOT NULL,
    tar TEXT NOT NULL,
    nicotine TEXT NOT NULL,
    co TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(group_name, code)
);
CREATE INDEX IF NOT EXISTS idx_samples_group ON samples(group_name);

CREATE TABLE IF NOT EXISTS coefficient_sets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_name TEXT NOT NULL,
    batch INTEGER NOT NULL,
    response TEXT NOT NULL,
    intercept TEXT NOT NULL,
    c_filter_ventilation TEXT NOT NULL,
    c_filter_pressure_drop TEXT NOT NULL,
    c_permeability TEXT NOT NULL,
    c_basis_weight TEXT NOT NULL,
    c_citrate TEXT NOT NULL,
    c_potassium TEXT,
    created_at TEXT NOT NULL,
    UNIQUE(group_name, batch, response)
);
CREATE INDEX IF NOT EXISTS idx_coefficient_sets_group ON coefficient_sets(group_name);
";

/// Handle to the embedded database. Owns the connection; cloneable handles
/// are deliberately not provided (single-writer semantics).
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open a fresh in-memory database. Used by tests for isolation.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

/// Render a float as decimal text. Rust's `Display` for `f64` is the
/// shortest string that parses back to the same bits, so storage loses
/// nothing beyond double precision.
pub(crate) fn format_decimal(value: f64) -> String {
    format!("{value}")
}

/// Parse a stored decimal-text field into a finite `f64`.
pub(crate) fn parse_decimal(field: &str, text: &str) -> Result<f64> {
    let value: f64 = text.trim().parse().map_err(|_| {
        Error::Validation(format!("field '{field}' is not a decimal number: '{text}'"))
    })?;
    if !value.is_finite() {
        return Err(Error::Validation(format!(
            "field '{field}' is not finite: '{text}'"
        )));
    }
    Ok(value)
}

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

pub(crate) fn parse_timestamp(field: &str, text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Validation(format!("field '{field}' is not a timestamp: {e}")))
}
