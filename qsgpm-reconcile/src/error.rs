//! Error types shared by every qsgpm operation.

use thiserror::Error;

/// Errors produced while loading configuration or reconciling a namespace.
#[derive(Error, Debug)]
pub enum QsgpmError {
    /// Configuration could not be read, parsed, or validated.
    #[error("{0}")]
    Config(String),

    /// The running build does not satisfy `required_version`.
    #[error("version {version} does not satisfy constraints required_version: {constraint}")]
    VersionMismatch { version: String, constraint: String },

    /// A remote QuickSight or STS call failed.
    #[error("{operation} failed: {message}")]
    Aws { operation: String, message: String },

    /// A paginator was asked for a page after it was exhausted.
    #[error("no more pages available")]
    NoMorePages,

    #[error("failed to serialize request: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QsgpmError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn aws(operation: &str, message: impl Into<String>) -> Self {
        Self::Aws {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Prefix a configuration error with the location it came from,
    /// e.g. `rules[1]: user: ...`.
    #[must_use]
    pub fn context(self, prefix: &str) -> Self {
        match self {
            Self::Config(message) => Self::Config(format!("{prefix}: {message}")),
            other => other,
        }
    }
}

pub type QsgpmResult<T> = Result<T, QsgpmError>;
