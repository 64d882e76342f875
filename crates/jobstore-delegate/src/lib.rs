//! `jobstore-delegate`: dialect-aware persistence for the job store.
//!
//! # Overview
//!
//! Store operations go through a [`DriverDelegate`], which turns logical
//! values (booleans, binary payloads, timestamps) into the wire values a
//! particular database expects and back. The delegate is picked once at
//! startup by the [`DelegateRegistry`] and held in a [`DelegateBinding`].
//!
//! # Dialects
//!
//! | Dialect                | Booleans on the wire |
//! |------------------------|----------------------|
//! | Standard, PostgreSQL, MSSQL, Oracle, HSQLDB, Sybase | native boolean |
//! | DB2v6, DB2v7, DB2v8, SQLite | integer `1` / `0` |
//!
//! Statement text is the same for every dialect.

pub mod conn;
pub mod db;
pub mod delegate;
pub mod dialect;
pub mod error;
pub mod marshal;
pub mod resolver;
pub mod sql;
pub mod sqlite;
pub mod store;
pub mod value;

pub use conn::{Connection, DatabaseMetadata, DriverError, Row, Statement};
pub use delegate::{DelegateSettings, DriverDelegate, StdDelegate};
pub use dialect::Dialect;
pub use error::{ConfigurationError, DelegateError, Result, StoreError};
pub use marshal::{IntegerBooleanMarshaller, MarshalError, StandardMarshaller, TypeMarshaller};
pub use resolver::{DelegateDescriptor, DelegateFactory, DelegateRegistry, Implementation, ResolvedDelegate};
pub use sqlite::SqliteConnection;
pub use store::DelegateBinding;
pub use value::{LogicalType, LogicalValue, SqlValue};
