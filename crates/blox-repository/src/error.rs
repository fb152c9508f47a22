//! Error types for repository operations.

use std::fmt;

use thiserror::Error;

/// Boxed cause carried by [`RepositoryError::Internal`].
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The kind of record an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceType {
    Environment,
    EnvironmentRevision,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => f.write_str("environment"),
            Self::EnvironmentRevision => f.write_str("environment revision"),
        }
    }
}

/// Errors that can occur during repository operations.
///
/// `NotFound`, `AlreadyExists` and `InvalidParameter` are raised by the
/// repository itself. Everything the store reports is wrapped in `Internal`;
/// the cause is kept for diagnostics only and is not part of the contract.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested record does not exist (or was never committed).
    #[error("{resource} with id {id} could not be found")]
    NotFound { resource: ResourceType, id: String },

    /// A create collided with a committed record.
    #[error("{resource} with id {id} already exists")]
    AlreadyExists { resource: ResourceType, id: String },

    /// The caller broke a precondition of the operation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A store failure, a conflicting concurrent write, or an unreadable
    /// record.
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Cause>,
    },
}

impl RepositoryError {
    pub fn not_found(resource: ResourceType, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn already_exists(resource: ResourceType, id: impl fmt::Display) -> Self {
        Self::AlreadyExists {
            resource,
            id: id.to_string(),
        }
    }

    /// Wrap an underlying failure.
    pub fn internal(message: impl Into<String>, source: impl Into<Cause>) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Convenience type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
