use chrono::{DateTime, Duration, Utc};
use jobstore_core::types::{truncate_to_millis, JobDataMap, JobKey, TriggerKey, TriggerState};
use tracing::debug;

use crate::conn::{Connection, DriverError, Row, Statement};
use crate::delegate::DriverDelegate;
use crate::error::{DelegateError, Result};
use crate::marshal::MarshalError;
use crate::value::SqlValue;

/// A statement parameter. Booleans stay logical until bind time so they go
/// through [`DriverDelegate::bind_boolean`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Param {
    Value(SqlValue),
    Bool(bool),
}

pub(crate) fn val(value: impl Into<SqlValue>) -> Param {
    Param::Value(value.into())
}

pub(crate) fn flag(value: bool) -> Param {
    Param::Bool(value)
}

/// One persistence operation in flight: carries the operation name and the
/// delegate so every error is reported with both.
pub(crate) struct Call<'d, D: ?Sized> {
    delegate: &'d D,
    operation: &'static str,
}

impl<'d, D: DriverDelegate + ?Sized> Call<'d, D> {
    pub fn new(delegate: &'d D, operation: &'static str) -> Self {
        Self {
            delegate,
            operation,
        }
    }

    pub fn driver(&self, source: DriverError) -> DelegateError {
        DelegateError::Statement {
            operation: self.operation,
            dialect: self.delegate.dialect().to_string(),
            source,
        }
    }

    pub fn marshal(&self, source: MarshalError) -> DelegateError {
        DelegateError::Marshal {
            operation: self.operation,
            dialect: self.delegate.dialect().to_string(),
            source,
        }
    }

    pub fn corrupt(&self, detail: impl Into<String>) -> DelegateError {
        DelegateError::CorruptRow {
            operation: self.operation,
            dialect: self.delegate.dialect().to_string(),
            detail: detail.into(),
        }
    }

    fn serialization(&self, source: jobstore_core::CoreError) -> DelegateError {
        DelegateError::Serialization {
            operation: self.operation,
            dialect: self.delegate.dialect().to_string(),
            source,
        }
    }

    fn prepare<'c>(
        &self,
        conn: &'c dyn Connection,
        template: &str,
        params: Vec<Param>,
    ) -> Result<Box<dyn Statement + 'c>> {
        let sql = self.delegate.sql(template);
        debug!(
            operation = self.operation,
            dialect = self.delegate.dialect(),
            params = params.len(),
            "prepare statement"
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| self.driver(e))?;
        for (i, param) in params.into_iter().enumerate() {
            let position = i + 1;
            match param {
                Param::Value(v) => stmt.bind(position, v).map_err(|e| self.driver(e))?,
                Param::Bool(b) => self
                    .delegate
                    .bind_boolean(stmt.as_mut(), position, b)
                    .map_err(|e| e.with_operation(self.operation))?,
            }
        }
        Ok(stmt)
    }

    /// Run a DML statement and return the affected row count.
    pub fn execute(&self, conn: &dyn Connection, template: &str, params: Vec<Param>) -> Result<usize> {
        let mut stmt = self.prepare(conn, template, params)?;
        stmt.execute().map_err(|e| self.driver(e))
    }

    pub fn query(&self, conn: &dyn Connection, template: &str, params: Vec<Param>) -> Result<Vec<Row>> {
        let mut stmt = self.prepare(conn, template, params)?;
        stmt.query().map_err(|e| self.driver(e))
    }

    pub fn query_limited(
        &self,
        conn: &dyn Connection,
        template: &str,
        params: Vec<Param>,
        max_rows: usize,
    ) -> Result<Vec<Row>> {
        let mut stmt = self.prepare(conn, template, params)?;
        stmt.set_max_rows(max_rows);
        stmt.query().map_err(|e| self.driver(e))
    }

    // --- encoding -----------------------------------------------------------

    /// A stored timestamp. Values finer than a millisecond are a marshal error.
    pub fn timestamp_param(&self, value: Option<DateTime<Utc>>) -> Result<Param> {
        self.delegate
            .marshaller()
            .encode_timestamp(value)
            .map(Param::Value)
            .map_err(|e| self.marshal(e))
    }

    /// Bound for `column <= ?`, rounded down to store precision.
    pub fn at_most_param(&self, bound: DateTime<Utc>) -> Result<Param> {
        self.timestamp_param(Some(truncate_to_millis(bound)))
    }

    /// Bound for `column >= ?` or `column < ?`, rounded up to store precision.
    pub fn at_least_param(&self, bound: DateTime<Utc>) -> Result<Param> {
        let floor = truncate_to_millis(bound);
        let ceil = if floor == bound {
            floor
        } else {
            floor + Duration::milliseconds(1)
        };
        self.timestamp_param(Some(ceil))
    }

    pub fn bytes_param(&self, value: Option<&[u8]>) -> Param {
        Param::Value(self.delegate.marshaller().encode_bytes(value))
    }

    pub fn job_data_param(&self, data: &JobDataMap) -> Result<Param> {
        let bytes = data.to_bytes().map_err(|e| self.serialization(e))?;
        Ok(self.bytes_param(Some(bytes.as_slice())))
    }

    // --- decoding -----------------------------------------------------------

    fn column<'r>(&self, row: &'r Row, position: usize) -> Result<&'r SqlValue> {
        row.column(position).map_err(|e| self.driver(e))
    }

    pub fn text(&self, row: &Row, position: usize) -> Result<String> {
        match self.column(row, position)? {
            SqlValue::Text(s) => Ok(s.clone()),
            other => Err(self.corrupt(format!(
                "column {position}: expected text, found {}",
                other.type_name()
            ))),
        }
    }

    pub fn opt_text(&self, row: &Row, position: usize) -> Result<Option<String>> {
        match self.column(row, position)? {
            SqlValue::Null => Ok(None),
            _ => self.text(row, position).map(Some),
        }
    }

    pub fn int(&self, row: &Row, position: usize) -> Result<i64> {
        match self.column(row, position)? {
            SqlValue::Int(i) => Ok(*i),
            other => Err(self.corrupt(format!(
                "column {position}: expected integer, found {}",
                other.type_name()
            ))),
        }
    }

    /// Integer narrowed to `i32`, with NULL read as `default`.
    pub fn i32_or(&self, row: &Row, position: usize, default: i32) -> Result<i32> {
        if self.column(row, position)?.is_null() {
            return Ok(default);
        }
        let wide = self.int(row, position)?;
        i32::try_from(wide)
            .map_err(|_| self.corrupt(format!("column {position}: {wide} does not fit in i32")))
    }

    pub fn boolean(&self, row: &Row, position: usize) -> Result<bool> {
        self.delegate
            .read_boolean(row, position)
            .map_err(|e| e.with_operation(self.operation))
    }

    /// NULL reads as `false`; used for nullable flag columns.
    pub fn boolean_or_false(&self, row: &Row, position: usize) -> Result<bool> {
        if self.column(row, position)?.is_null() {
            return Ok(false);
        }
        self.boolean(row, position)
    }

    pub fn opt_timestamp(&self, row: &Row, position: usize) -> Result<Option<DateTime<Utc>>> {
        let value = self.column(row, position)?;
        self.delegate
            .marshaller()
            .decode_timestamp(value)
            .map_err(|e| self.marshal(e))
    }

    pub fn timestamp(&self, row: &Row, position: usize) -> Result<DateTime<Utc>> {
        self.opt_timestamp(row, position)?
            .ok_or_else(|| self.corrupt(format!("column {position}: timestamp is NULL")))
    }

    pub fn opt_bytes(&self, row: &Row, position: usize) -> Result<Option<Vec<u8>>> {
        let value = self.column(row, position)?;
        self.delegate
            .marshaller()
            .decode_bytes(value)
            .map_err(|e| self.marshal(e))
    }

    pub fn job_data(&self, row: &Row, position: usize) -> Result<JobDataMap> {
        let bytes = self.opt_bytes(row, position)?.unwrap_or_default();
        JobDataMap::from_bytes(&bytes).map_err(|e| self.serialization(e))
    }

    pub fn state(&self, row: &Row, position: usize) -> Result<TriggerState> {
        let text = self.text(row, position)?;
        text.parse().map_err(|_| {
            self.corrupt(format!("column {position}: unknown trigger state {text:?}"))
        })
    }

    pub fn job_key(&self, row: &Row, name: usize, group: usize) -> Result<JobKey> {
        JobKey::new(self.text(row, name)?, self.text(row, group)?)
            .map_err(|e| self.corrupt(e.to_string()))
    }

    pub fn trigger_key(&self, row: &Row, name: usize, group: usize) -> Result<TriggerKey> {
        TriggerKey::new(self.text(row, name)?, self.text(row, group)?)
            .map_err(|e| self.corrupt(e.to_string()))
    }

    /// First column of the single row a `COUNT(..)` query returns.
    pub fn count(&self, rows: &[Row]) -> Result<u64> {
        let row = rows
            .first()
            .ok_or_else(|| self.corrupt("count query returned no rows"))?;
        let n = self.int(row, 0)?;
        u64::try_from(n).map_err(|_| self.corrupt(format!("negative count {n}")))
    }

    /// Every row's first column as text.
    pub fn texts(&self, rows: &[Row]) -> Result<Vec<String>> {
        rows.iter().map(|row| self.text(row, 0)).collect()
    }
}
