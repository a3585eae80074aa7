//! Domain error model.

use thiserror::Error;

use crate::id::{FarmerOrderId, ItemId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic business failures only. Every variant means "nothing was
/// mutated"; storage and transport failures live in the infrastructure crate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Input rejected before any mutation (zero/non-finite delta, bad ids).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant would be violated (e.g. leaving the `removed` state).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Unknown stock document or farmer order line.
    #[error("not found")]
    NotFound,

    /// The document already holds a line for this farmer order.
    #[error("duplicate farmer order line: {0}")]
    DuplicateFarmerOrder(FarmerOrderId),

    /// A reservation would drive the available quantity below zero.
    #[error("insufficient stock: requested {requested_kg} kg, available {available_kg} kg")]
    InsufficientStock { requested_kg: f64, available_kg: f64 },

    /// Unit-based adjustment on a kg-only line or one without an average weight.
    #[error("line is not sold by unit")]
    NotSoldByUnit,

    /// The catalog could not provide a price per kg for the item.
    #[error("pricing unresolved for item {0}")]
    PricingUnresolved(ItemId),

    /// Stale version / compare-and-swap retries exhausted.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn insufficient_stock(requested_kg: f64, available_kg: f64) -> Self {
        Self::InsufficientStock {
            requested_kg,
            available_kg,
        }
    }
}
