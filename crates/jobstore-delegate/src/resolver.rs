//! Startup-time selection and construction of the store's driver delegate.
//!
//! An explicitly configured identifier wins. Without one the connection's
//! product signature is looked up in [`PRODUCT_SIGNATURES`]. Anything that
//! cannot be matched is a [`ConfigurationError`].
//!
//! [`PRODUCT_SIGNATURES`]: crate::dialect::PRODUCT_SIGNATURES

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use jobstore_core::StoreConfig;
use serde::Serialize;
use tracing::{info, warn};

use crate::conn::DatabaseMetadata;
use crate::delegate::{DelegateSettings, DriverDelegate, StdDelegate};
use crate::dialect::{normalize_identifier, Dialect};
use crate::error::ConfigurationError;

/// Builds a plugin delegate from the store's settings.
pub trait DelegateFactory: Send + Sync {
    fn create(
        &self,
        settings: DelegateSettings,
    ) -> Result<Arc<dyn DriverDelegate>, ConfigurationError>;
}

impl<F> DelegateFactory for F
where
    F: Fn(DelegateSettings) -> Result<Arc<dyn DriverDelegate>, ConfigurationError> + Send + Sync,
{
    fn create(
        &self,
        settings: DelegateSettings,
    ) -> Result<Arc<dyn DriverDelegate>, ConfigurationError> {
        self(settings)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Implementation {
    Builtin(Dialect),
    /// Registered identifier of the plugin that produced the delegate.
    Plugin(String),
}

/// What was bound and with which settings. Suitable for logs and CLI output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelegateDescriptor {
    pub dialect: String,
    pub implementation: Implementation,
    pub marshaller: &'static str,
    #[serde(flatten)]
    pub settings: DelegateSettings,
}

pub struct ResolvedDelegate {
    pub descriptor: DelegateDescriptor,
    pub delegate: Arc<dyn DriverDelegate>,
}

impl fmt::Debug for ResolvedDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedDelegate")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

struct Plugin {
    identifier: String,
    factory: Box<dyn DelegateFactory>,
}

/// Built-in dialects plus any plugin factories registered at startup.
#[derive(Default)]
pub struct DelegateRegistry {
    /// Keyed by lowercased normalized identifier.
    plugins: HashMap<String, Plugin>,
}

impl DelegateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin dialect.
    ///
    /// Identifiers follow the same matching rules as built-ins and must not
    /// collide with a built-in identifier, alias or an earlier plugin.
    pub fn register(
        &mut self,
        identifier: &str,
        factory: impl DelegateFactory + 'static,
    ) -> Result<(), ConfigurationError> {
        let normalized = normalize_identifier(identifier);
        if normalized.is_empty() {
            return Err(ConfigurationError::new(format!(
                "plugin identifier {identifier:?} is empty"
            )));
        }
        if let Some(dialect) = Dialect::from_identifier(&normalized) {
            return Err(ConfigurationError::new(format!(
                "plugin identifier {normalized:?} collides with built-in dialect {dialect}"
            )));
        }
        let key = normalized.to_ascii_lowercase();
        if let Some(existing) = self.plugins.get(&key) {
            return Err(ConfigurationError::new(format!(
                "plugin identifier {normalized:?} is already registered as {:?}",
                existing.identifier
            )));
        }
        info!(plugin = %normalized, "registering driver delegate plugin");
        self.plugins.insert(
            key,
            Plugin {
                identifier: normalized,
                factory: Box::new(factory),
            },
        );
        Ok(())
    }

    /// Registered plugin identifiers, sorted.
    pub fn plugin_identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.plugins.values().map(|p| p.identifier.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Resolve and construct the delegate for `config`.
    ///
    /// `metadata` is consulted only when no delegate is configured. On error
    /// nothing is constructed.
    pub fn resolve(
        &self,
        config: &StoreConfig,
        metadata: Option<&DatabaseMetadata>,
    ) -> Result<ResolvedDelegate, ConfigurationError> {
        let result = self.try_resolve(config, metadata);
        match &result {
            Ok(resolved) => info!(
                dialect = %resolved.descriptor.dialect,
                marshaller = resolved.descriptor.marshaller,
                scheduler = %resolved.descriptor.settings.scheduler_name,
                instance = %resolved.descriptor.settings.instance_id,
                "driver delegate resolved"
            ),
            Err(e) => warn!(error = %e, "driver delegate resolution failed"),
        }
        result
    }

    fn try_resolve(
        &self,
        config: &StoreConfig,
        metadata: Option<&DatabaseMetadata>,
    ) -> Result<ResolvedDelegate, ConfigurationError> {
        config
            .validate()
            .map_err(|e| ConfigurationError::new(e.to_string()))?;
        let settings = DelegateSettings::from_store_config(config);

        match config.driver_delegate() {
            Some(identifier) => self.resolve_explicit(identifier, settings),
            None => {
                let meta = metadata.ok_or_else(|| {
                    ConfigurationError::new(
                        "no driver delegate configured and no database metadata available \
                         to detect one; set store.driver_delegate",
                    )
                })?;
                let dialect = Dialect::from_metadata(meta).ok_or_else(|| {
                    ConfigurationError::new(format!(
                        "no driver delegate configured and database product {:?} version {:?} \
                         is not supported; set store.driver_delegate explicitly",
                        meta.product_name, meta.product_version
                    ))
                })?;
                Ok(builtin(dialect, settings))
            }
        }
    }

    fn resolve_explicit(
        &self,
        identifier: &str,
        settings: DelegateSettings,
    ) -> Result<ResolvedDelegate, ConfigurationError> {
        if let Some(dialect) = Dialect::from_identifier(identifier) {
            return Ok(builtin(dialect, settings));
        }

        let key = normalize_identifier(identifier).to_ascii_lowercase();
        let plugin = self.plugins.get(&key).ok_or_else(|| {
            ConfigurationError::new(format!(
                "unknown driver delegate {identifier:?}; built-in dialects are {}",
                builtin_list()
            ))
        })?;
        let delegate = plugin.factory.create(settings).map_err(|e| {
            ConfigurationError::new(format!(
                "driver delegate plugin {:?} failed to initialise: {}",
                plugin.identifier, e.message
            ))
        })?;
        Ok(ResolvedDelegate {
            descriptor: DelegateDescriptor {
                dialect: delegate.dialect().to_string(),
                implementation: Implementation::Plugin(plugin.identifier.clone()),
                marshaller: delegate.marshaller().name(),
                settings: delegate.settings().clone(),
            },
            delegate,
        })
    }
}

fn builtin(dialect: Dialect, settings: DelegateSettings) -> ResolvedDelegate {
    let delegate = StdDelegate::for_dialect(dialect, settings.clone());
    ResolvedDelegate {
        descriptor: DelegateDescriptor {
            dialect: dialect.identifier().to_string(),
            implementation: Implementation::Builtin(dialect),
            marshaller: delegate.marshaller().name(),
            settings,
        },
        delegate: Arc::new(delegate),
    }
}

fn builtin_list() -> String {
    Dialect::ALL
        .iter()
        .map(Dialect::identifier)
        .collect::<Vec<_>>()
        .join(", ")
}
