//! Billing domain errors

use thiserror::Error;

use core_kernel::{Capability, MoneyError};

/// Errors that can occur in the billing domain
///
/// Every variant is surfaced to the caller; a failed operation never leaves a
/// partially written invoice or payment behind.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Malformed or missing input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced invoice or record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record exists but is not in a state that allows the operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A concurrent update won the race; the caller may retry
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The actor lacks the capability for this operation
    #[error("Forbidden: missing capability {0}")]
    Forbidden(Capability),

    /// The store failed; the transaction was rolled back
    #[error("Storage error: {0}")]
    Storage(String),

    /// Calculation error
    #[error("Calculation error: {0}")]
    Money(#[from] MoneyError),
}

impl BillingError {
    pub fn validation(message: impl Into<String>) -> Self {
        BillingError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        BillingError::NotFound(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        BillingError::InvalidState(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        BillingError::Conflict(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        BillingError::Storage(message.into())
    }

    /// Returns true if repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, BillingError::Conflict(_))
    }
}
