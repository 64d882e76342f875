// In-memory connection that records every prepared statement and bind, and
// replays queued result sets in order.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use jobstore_core::StoreConfig;
use jobstore_delegate::{
    Connection, DatabaseMetadata, DriverError, Row, SqlValue, Statement,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Prepared {
    pub sql: String,
    pub binds: Vec<(usize, SqlValue)>,
    pub max_rows: Option<usize>,
}

pub struct RecordingConnection {
    metadata: DatabaseMetadata,
    log: RefCell<Vec<Prepared>>,
    results: RefCell<VecDeque<Vec<Row>>>,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self::with_product("RecordingDB", "1.0")
    }

    pub fn with_product(name: &str, version: &str) -> Self {
        Self {
            metadata: DatabaseMetadata::new(name, version),
            log: RefCell::new(Vec::new()),
            results: RefCell::new(VecDeque::new()),
        }
    }

    /// Result set returned by the next `query`.
    pub fn push_rows(&self, rows: Vec<Vec<SqlValue>>) {
        self.results
            .borrow_mut()
            .push_back(rows.into_iter().map(Row::new).collect());
    }

    pub fn log(&self) -> Vec<Prepared> {
        self.log.borrow().clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.borrow().iter().map(|p| p.sql.clone()).collect()
    }

    pub fn last(&self) -> Prepared {
        self.log.borrow().last().cloned().unwrap_or_default()
    }
}

struct RecordingStatement<'c> {
    conn: &'c RecordingConnection,
    index: usize,
}

impl Statement for RecordingStatement<'_> {
    fn bind(&mut self, position: usize, value: SqlValue) -> Result<(), DriverError> {
        self.conn.log.borrow_mut()[self.index].binds.push((position, value));
        Ok(())
    }

    fn set_max_rows(&mut self, max_rows: usize) {
        self.conn.log.borrow_mut()[self.index].max_rows = Some(max_rows);
    }

    fn execute(&mut self) -> Result<usize, DriverError> {
        Ok(1)
    }

    fn query(&mut self) -> Result<Vec<Row>, DriverError> {
        let mut rows = self.conn.results.borrow_mut().pop_front().unwrap_or_default();
        if let Some(max) = self.conn.log.borrow()[self.index].max_rows {
            rows.truncate(max);
        }
        Ok(rows)
    }
}

impl Connection for RecordingConnection {
    fn prepare<'c>(&'c self, sql: &str) -> Result<Box<dyn Statement + 'c>, DriverError> {
        let mut log = self.log.borrow_mut();
        log.push(Prepared {
            sql: sql.to_string(),
            ..Prepared::default()
        });
        Ok(Box::new(RecordingStatement {
            conn: self,
            index: log.len() - 1,
        }))
    }

    fn metadata(&self) -> Result<DatabaseMetadata, DriverError> {
        Ok(self.metadata.clone())
    }
}

/// Connection whose every statement fails to prepare.
pub struct FailingConnection;

impl Connection for FailingConnection {
    fn prepare<'c>(&'c self, _sql: &str) -> Result<Box<dyn Statement + 'c>, DriverError> {
        Err(DriverError::Other("connection reset".into()))
    }

    fn metadata(&self) -> Result<DatabaseMetadata, DriverError> {
        Err(DriverError::Other("connection reset".into()))
    }
}

pub fn store_config(delegate: Option<&str>) -> StoreConfig {
    StoreConfig {
        driver_delegate: delegate.map(str::to_string),
        ..StoreConfig::default()
    }
}
