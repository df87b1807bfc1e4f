//! Cloud provider error types

use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Resource {resource} is still referenced by: {dependents}")]
    DependencyViolation {
        resource: String,
        dependents: String,
    },

    #[error("Unresolved reference in {resource}: {reference}")]
    UnresolvedReference { resource: String, reference: String },

    #[error("Invalid resource graph: {0}")]
    InvalidGraph(#[from] stackplan_core::StackError),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
