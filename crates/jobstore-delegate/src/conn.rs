//! The connectivity seam delegates talk to.
//!
//! Parameter positions are 1-based (as in `?1`), column positions are
//! 0-based (as in `row.get(0)`), matching rusqlite.

use serde::Serialize;
use thiserror::Error;

use crate::value::SqlValue;

/// Failure reported by the underlying driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("column {position} out of range (row has {width} columns)")]
    ColumnOutOfRange { position: usize, width: usize },

    #[error("column {position} holds text that is not valid UTF-8: {source}")]
    InvalidText {
        position: usize,
        source: std::str::Utf8Error,
    },

    #[error("{0}")]
    Other(String),
}

/// Product identification reported by a live connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseMetadata {
    /// e.g. "PostgreSQL", "DB2/LINUXX8664", "SQLite".
    pub product_name: String,
    pub product_version: String,
    /// Parsed major version, when the driver reports one.
    pub major_version: Option<u32>,
}

impl DatabaseMetadata {
    pub fn new(product_name: impl Into<String>, product_version: impl Into<String>) -> Self {
        let product_version = product_version.into();
        let major_version = parse_major(&product_version);
        Self {
            product_name: product_name.into(),
            product_version,
            major_version,
        }
    }

    pub fn with_major_version(mut self, major: u32) -> Self {
        self.major_version = Some(major);
        self
    }
}

/// Leading digits of a dotted version string ("11.5.8" → 11).
fn parse_major(version: &str) -> Option<u32> {
    let digits: String = version
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// One result row, fully materialised.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    pub fn column(&self, position: usize) -> Result<&SqlValue, DriverError> {
        self.values
            .get(position)
            .ok_or(DriverError::ColumnOutOfRange {
                position,
                width: self.values.len(),
            })
    }
}

/// A prepared statement. Owned by one caller for the duration of one call.
pub trait Statement {
    fn bind(&mut self, position: usize, value: SqlValue) -> Result<(), DriverError>;

    /// Cap the number of rows `query` returns. SQL text stays untouched.
    fn set_max_rows(&mut self, max_rows: usize);

    /// Run a DML statement, returning the affected row count.
    fn execute(&mut self) -> Result<usize, DriverError>;

    fn query(&mut self) -> Result<Vec<Row>, DriverError>;
}

pub trait Connection {
    fn prepare<'c>(&'c self, sql: &str) -> Result<Box<dyn Statement + 'c>, DriverError>;

    fn metadata(&self) -> Result<DatabaseMetadata, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_version_parsed_from_dotted_string() {
        assert_eq!(DatabaseMetadata::new("PostgreSQL", "16.2").major_version, Some(16));
        assert_eq!(DatabaseMetadata::new("SQLite", "3.46.0").major_version, Some(3));
        assert_eq!(DatabaseMetadata::new("DB2/NT", "SQL11058").major_version, None);
        assert_eq!(
            DatabaseMetadata::new("DB2/NT", "SQL11058")
                .with_major_version(11)
                .major_version,
            Some(11)
        );
    }

    #[test]
    fn out_of_range_column_is_an_error() {
        let row = Row::new(vec![SqlValue::Int(1)]);
        assert_eq!(row.column(0).unwrap(), &SqlValue::Int(1));
        assert!(matches!(
            row.column(3),
            Err(DriverError::ColumnOutOfRange { position: 3, width: 1 })
        ));
    }
}
