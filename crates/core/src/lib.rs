//! `farmstock-core` — shared building blocks for the stock ledger.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the domain error taxonomy and the version tokens
//! used for optimistic concurrency.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{FarmerId, FarmerOrderId, ItemId, LogisticsCenterId, StockDocumentId};
