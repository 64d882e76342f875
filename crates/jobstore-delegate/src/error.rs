use thiserror::Error;

use crate::conn::DriverError;
use crate::marshal::MarshalError;

/// No valid driver delegate could be bound at store startup.
///
/// Unrecoverable at this layer: the store must not start, and the failure is
/// never retried. Carries a message for the operator and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("driver delegate configuration error: {message}")]
pub struct ConfigurationError {
    pub message: String,
}

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure of a persistence operation issued through a delegate.
#[derive(Debug, Error)]
pub enum DelegateError {
    /// The driver rejected or failed a statement.
    #[error("{operation} failed on {dialect}: {source}")]
    Statement {
        operation: &'static str,
        dialect: String,
        #[source]
        source: DriverError,
    },

    /// A column value fell outside its logical type's domain.
    #[error("{operation} on {dialect}: {source}")]
    Marshal {
        operation: &'static str,
        dialect: String,
        #[source]
        source: MarshalError,
    },

    /// A data map could not be converted to or from its stored form.
    #[error("{operation} on {dialect}: {source}")]
    Serialization {
        operation: &'static str,
        dialect: String,
        #[source]
        source: jobstore_core::CoreError,
    },

    /// A stored row holds a value the domain model cannot represent.
    #[error("{operation} on {dialect}: corrupt row: {detail}")]
    CorruptRow {
        operation: &'static str,
        dialect: String,
        detail: String,
    },
}

impl DelegateError {
    pub fn operation(&self) -> &'static str {
        match self {
            DelegateError::Statement { operation, .. }
            | DelegateError::Marshal { operation, .. }
            | DelegateError::Serialization { operation, .. }
            | DelegateError::CorruptRow { operation, .. } => *operation,
        }
    }

    /// Re-attribute an error raised by a helper to the enclosing operation.
    pub(crate) fn with_operation(mut self, op: &'static str) -> Self {
        match &mut self {
            DelegateError::Statement { operation, .. }
            | DelegateError::Marshal { operation, .. }
            | DelegateError::Serialization { operation, .. }
            | DelegateError::CorruptRow { operation, .. } => *operation = op,
        }
        self
    }

    pub fn dialect(&self) -> &str {
        match self {
            DelegateError::Statement { dialect, .. }
            | DelegateError::Marshal { dialect, .. }
            | DelegateError::Serialization { dialect, .. }
            | DelegateError::CorruptRow { dialect, .. } => dialect,
        }
    }
}

pub type Result<T> = std::result::Result<T, DelegateError>;

/// Misuse of the store's delegate binding lifecycle.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("a driver delegate is already bound ({dialect}); resolution runs once per store")]
    AlreadyBound { dialect: String },

    #[error("no driver delegate is bound yet")]
    NotBound,

    #[error("the store has been shut down and its driver delegate released")]
    Released,
}
