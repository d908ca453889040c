//! Error types for the AppShare operator

use thiserror::Error;

/// Main error type for operator operations
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error (fetch, create or update failed)
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Operator configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The AppShare spec failed validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A managed object is already controlled by another owner
    #[error("Ownership conflict: {0}")]
    OwnershipConflict(String),

    /// An object lacks metadata the operator needs (name, namespace, uid)
    #[error("Object is missing {0}")]
    MissingObjectKey(&'static str),
}

impl Error {
    /// Whether retrying the pass soon may succeed.
    ///
    /// Validation and ownership errors need a user to change something, so
    /// they are retried on the slow schedule.
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::KubeError(kube::Error::Api(resp)) => {
                resp.code == 409 || resp.code == 429 || resp.code >= 500
            }
            Error::KubeError(_) => true,
            Error::SerializationError(_) => false,
            Error::ConfigError(_) => false,
            Error::ValidationError(_) => false,
            Error::OwnershipConflict(_) => false,
            Error::MissingObjectKey(_) => false,
        }
    }

    /// Short category name used as a metric label
    pub fn metric_label(&self) -> &'static str {
        match self {
            Error::KubeError(_) => "kube",
            Error::SerializationError(_) => "serialization",
            Error::ConfigError(_) => "config",
            Error::ValidationError(_) => "validation",
            Error::OwnershipConflict(_) => "ownership",
            Error::MissingObjectKey(_) => "metadata",
        }
    }
}

/// Result type alias for operator operations
pub type Result<T, E = Error> = std::result::Result<T, E>;
