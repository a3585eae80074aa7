//! Stock document storage boundary.
//!
//! Defines the per-line compare-and-swap contract the ledger relies on, plus an
//! in-memory implementation.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryStockStore;
pub use r#trait::{StockStore, StoreError};
