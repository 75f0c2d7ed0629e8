//! Error types for Stacksmith.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("duplicate identifier: {0}")]
    Duplicate(String),

    #[error("stack '{consumer}' references stack '{producer}' which is not declared before it")]
    DependencyOrder { consumer: String, producer: String },

    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("stack '{stack}' has no output named '{output}'")]
    UnknownOutput { stack: String, output: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("deployment failed: {0}")]
    DeploymentFailed(String),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
