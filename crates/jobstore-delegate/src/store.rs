//! The store's delegate slot: unresolved until startup binds it, released at
//! shutdown.

use std::sync::Arc;

use jobstore_core::StoreConfig;
use tracing::info;

use crate::conn::DatabaseMetadata;
use crate::delegate::DriverDelegate;
use crate::error::StoreError;
use crate::resolver::{DelegateDescriptor, DelegateRegistry};

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Unresolved,
    Bound {
        descriptor: DelegateDescriptor,
        delegate: Arc<dyn DriverDelegate>,
    },
    Released,
}

/// Holds the single delegate a store uses for its lifetime.
#[derive(Debug, Default)]
pub struct DelegateBinding {
    slot: Slot,
}

impl DelegateBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the delegate and bind it. Runs once; a failed attempt leaves
    /// the binding unresolved.
    pub fn bind(
        &mut self,
        registry: &DelegateRegistry,
        config: &StoreConfig,
        metadata: Option<&DatabaseMetadata>,
    ) -> Result<&DelegateDescriptor, StoreError> {
        match &self.slot {
            Slot::Unresolved => {}
            Slot::Bound { descriptor, .. } => {
                return Err(StoreError::AlreadyBound {
                    dialect: descriptor.dialect.clone(),
                })
            }
            Slot::Released => return Err(StoreError::Released),
        }
        let resolved = registry.resolve(config, metadata)?;
        self.slot = Slot::Bound {
            descriptor: resolved.descriptor,
            delegate: resolved.delegate,
        };
        self.descriptor()
    }

    /// Shared handle to the bound delegate.
    pub fn delegate(&self) -> Result<Arc<dyn DriverDelegate>, StoreError> {
        match &self.slot {
            Slot::Bound { delegate, .. } => Ok(Arc::clone(delegate)),
            Slot::Unresolved => Err(StoreError::NotBound),
            Slot::Released => Err(StoreError::Released),
        }
    }

    pub fn descriptor(&self) -> Result<&DelegateDescriptor, StoreError> {
        match &self.slot {
            Slot::Bound { descriptor, .. } => Ok(descriptor),
            Slot::Unresolved => Err(StoreError::NotBound),
            Slot::Released => Err(StoreError::Released),
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.slot, Slot::Bound { .. })
    }

    /// Drop the delegate at shutdown. Handles cloned earlier stay valid until
    /// their owners drop them. Releasing twice is a no-op.
    pub fn release(&mut self) {
        if let Slot::Bound { descriptor, .. } = &self.slot {
            info!(dialect = %descriptor.dialect, "driver delegate released");
        }
        self.slot = Slot::Released;
    }
}
