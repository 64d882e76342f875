use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

pub const DEFAULT_TABLE_PREFIX: &str = "jobstore_";
pub const DEFAULT_INSTANCE_ID: &str = "NON_CLUSTERED";
pub const DEFAULT_SCHEDULER_NAME: &str = "main";
/// Instance id value that asks the store to generate a unique id at startup.
pub const AUTO_INSTANCE_ID: &str = "AUTO";

/// Top-level config (jobstore.toml + JOBSTORE_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStoreConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Settings the store hands to delegate resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Namespaces rows when several schedulers share one set of tables.
    #[serde(default = "default_scheduler_name")]
    pub scheduler_name: String,
    /// Written into fired-trigger and check-in rows. `AUTO` generates one.
    #[serde(default = "default_instance_id")]
    pub instance_id: String,
    /// Prepended to every table name in generated SQL.
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    /// Forces explicit delegate selection (e.g. "DB2v8"). When unset the
    /// delegate is inferred from the connected database's product name.
    #[serde(default)]
    pub driver_delegate: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            scheduler_name: default_scheduler_name(),
            instance_id: default_instance_id(),
            table_prefix: default_table_prefix(),
            driver_delegate: None,
        }
    }
}

impl StoreConfig {
    /// The configured delegate identifier, with blank values treated as unset.
    pub fn driver_delegate(&self) -> Option<&str> {
        self.driver_delegate
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Instance id with `AUTO` expanded to a fresh UUIDv7.
    pub fn resolved_instance_id(&self) -> String {
        if self.instance_id.eq_ignore_ascii_case(AUTO_INSTANCE_ID) {
            Uuid::now_v7().simple().to_string()
        } else {
            self.instance_id.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.scheduler_name.trim().is_empty() {
            return Err(CoreError::Config("store.scheduler_name must not be empty".into()));
        }
        if self.instance_id.trim().is_empty() {
            return Err(CoreError::Config("store.instance_id must not be empty".into()));
        }
        let prefix_ok = !self.table_prefix.is_empty()
            && self
                .table_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !prefix_ok {
            return Err(CoreError::Config(format!(
                "store.table_prefix must match [A-Za-z0-9_]+, got {:?}",
                self.table_prefix
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_scheduler_name() -> String {
    DEFAULT_SCHEDULER_NAME.to_string()
}
fn default_instance_id() -> String {
    DEFAULT_INSTANCE_ID.to_string()
}
fn default_table_prefix() -> String {
    DEFAULT_TABLE_PREFIX.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.jobstore/jobstore.db", home)
}

impl JobStoreConfig {
    /// Load config from a TOML file with JOBSTORE_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `JOBSTORE_STORE__DRIVER_DELEGATE=DB2v8`. A missing file is not an
    /// error; every field has a default.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::from_figment(Figment::new().merge(Toml::file(&path)))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: JobStoreConfig = figment
            .merge(Env::prefixed("JOBSTORE_").split("__"))
            .extract()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        config.store.validate()?;
        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.jobstore/jobstore.toml", home)
}
