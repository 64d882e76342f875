//! `jobstore-core`: configuration, domain types and errors shared by the
//! job store crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{JobStoreConfig, StoreConfig};
pub use error::{CoreError, Result};
