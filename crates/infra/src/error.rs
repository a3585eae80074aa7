//! Caller-facing error for ledger operations.

use thiserror::Error;

use farmstock_core::{DomainError, FarmerOrderId, ItemId};

use crate::store::StoreError;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Every way a ledger call can fail.
///
/// All variants except `Publish` mean nothing was committed. `Publish` is
/// returned after a successful commit when the bus refused an event.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate farmer order line: {0}")]
    DuplicateFarmerOrder(FarmerOrderId),

    #[error("insufficient stock: requested {requested_kg} kg, available {available_kg} kg")]
    InsufficientStock { requested_kg: f64, available_kg: f64 },

    #[error("line is not sold by unit")]
    NotSoldByUnit,

    #[error("pricing unresolved for item {0}")]
    PricingUnresolved(ItemId),

    /// Compare-and-swap retries exhausted.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Committed, but publication failed (at-least-once; a retry may duplicate).
    #[error("publish failed: {0}")]
    Publish(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => LedgerError::Validation(msg),
            DomainError::InvalidId(msg) => LedgerError::Validation(msg),
            DomainError::InvariantViolation(msg) => LedgerError::InvariantViolation(msg),
            DomainError::NotFound => LedgerError::NotFound("stock line".to_string()),
            DomainError::DuplicateFarmerOrder(id) => LedgerError::DuplicateFarmerOrder(id),
            DomainError::InsufficientStock {
                requested_kg,
                available_kg,
            } => LedgerError::InsufficientStock {
                requested_kg,
                available_kg,
            },
            DomainError::NotSoldByUnit => LedgerError::NotSoldByUnit,
            DomainError::PricingUnresolved(id) => LedgerError::PricingUnresolved(id),
            DomainError::Conflict(msg) => LedgerError::Conflict(msg),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DocumentNotFound(id) => LedgerError::NotFound(format!("stock document {id}")),
            StoreError::LineNotFound(id) => LedgerError::NotFound(format!("stock line {id}")),
            StoreError::DuplicateLine(id) => LedgerError::DuplicateFarmerOrder(id),
            StoreError::VersionMismatch(msg) => LedgerError::Conflict(msg),
            other @ StoreError::Backend(_) => LedgerError::Store(other),
        }
    }
}
