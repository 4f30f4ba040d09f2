//! Provisioning backend error types

use thiserror::Error;

/// Errors a provisioning backend may return.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("resource already exists: {0}")]
    ResourceAlreadyExists(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("backend does not support resource kind: {0}")]
    UnsupportedResource(String),

    #[error("invalid resource configuration: {0}")]
    InvalidConfig(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
