use std::path::Path;

use rusqlite::types::{Null, ValueRef};

use crate::conn::{Connection, DatabaseMetadata, DriverError, Row, Statement};
use crate::value::SqlValue;

/// Product name SQLite reports through [`Connection::metadata`].
pub const SQLITE_PRODUCT_NAME: &str = "SQLite";

/// [`Connection`] backed by a rusqlite connection.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    pub fn new(conn: rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let conn = rusqlite::Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Self::new(conn))
    }

    pub fn open_in_memory() -> Result<Self, DriverError> {
        Ok(Self::new(rusqlite::Connection::open_in_memory()?))
    }

    /// The wrapped rusqlite connection, for schema setup and transactions.
    pub fn raw(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl Connection for SqliteConnection {
    fn prepare<'c>(&'c self, sql: &str) -> Result<Box<dyn Statement + 'c>, DriverError> {
        let stmt = self.conn.prepare(sql)?;
        Ok(Box::new(SqliteStatement {
            stmt,
            max_rows: None,
        }))
    }

    fn metadata(&self) -> Result<DatabaseMetadata, DriverError> {
        Ok(DatabaseMetadata::new(SQLITE_PRODUCT_NAME, rusqlite::version()))
    }
}

struct SqliteStatement<'c> {
    stmt: rusqlite::Statement<'c>,
    max_rows: Option<usize>,
}

impl Statement for SqliteStatement<'_> {
    fn bind(&mut self, position: usize, value: SqlValue) -> Result<(), DriverError> {
        match value {
            SqlValue::Null => self.stmt.raw_bind_parameter(position, Null)?,
            SqlValue::Bool(b) => self.stmt.raw_bind_parameter(position, b)?,
            SqlValue::Int(i) => self.stmt.raw_bind_parameter(position, i)?,
            SqlValue::Real(f) => self.stmt.raw_bind_parameter(position, f)?,
            SqlValue::Text(s) => self.stmt.raw_bind_parameter(position, s)?,
            SqlValue::Blob(b) => self.stmt.raw_bind_parameter(position, b)?,
        }
        Ok(())
    }

    fn set_max_rows(&mut self, max_rows: usize) {
        self.max_rows = Some(max_rows);
    }

    fn execute(&mut self) -> Result<usize, DriverError> {
        Ok(self.stmt.raw_execute()?)
    }

    fn query(&mut self) -> Result<Vec<Row>, DriverError> {
        let width = self.stmt.column_count();
        let limit = self.max_rows;
        let mut rows = self.stmt.raw_query();
        let mut out = Vec::new();
        loop {
            if limit.is_some_and(|max| out.len() >= max) {
                break;
            }
            let Some(row) = rows.next()? else {
                break;
            };
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(from_value_ref(i, row.get_ref(i)?)?);
            }
            out.push(Row::new(values));
        }
        Ok(out)
    }
}

fn from_value_ref(position: usize, value: ValueRef<'_>) -> Result<SqlValue, DriverError> {
    Ok(match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Int(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(t) => {
            let text = std::str::from_utf8(t)
                .map_err(|source| DriverError::InvalidText { position, source })?;
            SqlValue::Text(text.to_string())
        }
        ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
    })
}
