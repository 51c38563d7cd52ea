//! Domain-level errors raised by warehouse rules
//!
//! These carry no transport concerns; the backend maps them onto HTTP responses.

use thiserror::Error;

/// Errors produced by domain rules (ledger, workflow, statistics)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },

    #[error("outbound request already processed, current status: {status}")]
    AlreadyDecided { status: String },

    #[error("quantity overflow on {field}")]
    QuantityOverflow { field: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
