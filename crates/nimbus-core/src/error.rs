//! Error types for Nimbus

use thiserror::Error;

/// Main error type for Nimbus operations
#[derive(Error, Debug)]
pub enum NimbusError {
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error with context
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A provider call failed (auth, network, quota, malformed response)
    #[error("{api} request failed: {message}")]
    Provider { api: String, message: String },

    /// The provider API backing a check is not enabled for the project
    #[error("{0} API not enabled")]
    ApiDisabled(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A check did not finish within its time budget
    #[error("check timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Failure while writing an export artifact
    #[error("Export error: {0}")]
    Export(String),
}

impl NimbusError {
    /// Build a provider fault for the named API
    pub fn provider(api: impl Into<String>, message: impl Into<String>) -> Self {
        NimbusError::Provider {
            api: api.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for NimbusError {
    fn from(err: serde_json::Error) -> Self {
        NimbusError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for NimbusError {
    fn from(err: csv::Error) -> Self {
        NimbusError::Export(err.to_string())
    }
}

/// Result type alias for Nimbus operations
pub type Result<T> = std::result::Result<T, NimbusError>;
