//! Local provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocalError {
    #[error("Missing input {input} of {resource}")]
    MissingInput { resource: String, input: String },

    #[error("No subnet with id {0} has been applied")]
    SubnetNotFound(String),

    #[error("No free address left in {0}")]
    AddressExhausted(String),

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid CIDR block: {0}")]
    InvalidCidr(#[from] stackplan_core::StackError),

    #[error("Cloud error: {0}")]
    CloudError(#[from] stackplan_cloud::CloudError),
}

pub type Result<T> = std::result::Result<T, LocalError>;
