use chrono::{DateTime, Utc};
use thiserror::Error;

use farmstock_core::{ExpectedVersion, FarmerOrderId, LogisticsCenterId, StockDocumentId};
use farmstock_stock::{DocumentKey, StockDocument, StockLine};
use std::sync::Arc;

/// Stock store operation error.
///
/// Infrastructure failures, as opposed to the deterministic domain errors a
/// line's `handle()` returns.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("stock document not found: {0}")]
    DocumentNotFound(StockDocumentId),

    #[error("stock line not found: {0}")]
    LineNotFound(FarmerOrderId),

    #[error("duplicate stock line for farmer order {0}")]
    DuplicateLine(FarmerOrderId),

    /// The line changed since it was read (compare-and-swap lost).
    #[error("version mismatch: {0}")]
    VersionMismatch(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Storage of stock documents with per-line compare-and-swap.
///
/// ## Consistency contract
///
/// - at most one document per `DocumentKey` (find-or-create is idempotent)
/// - lines are independent: no operation needs cross-line atomicity
/// - `compare_and_swap_line` writes iff the stored line's version equals
///   `expected`; it is the only way a line's quantity or status changes
/// - snapshots returned by reads are copies; mutating them changes nothing
pub trait StockStore: Send + Sync {
    /// Return the document for `key`, creating an empty one if needed.
    fn find_or_create(&self, key: DocumentKey) -> Result<StockDocument, StoreError>;

    fn get_by_key(&self, key: &DocumentKey) -> Result<Option<StockDocument>, StoreError>;

    fn get_by_id(&self, id: StockDocumentId) -> Result<Option<StockDocument>, StoreError>;

    /// Documents of one center dated on/after `from`'s UTC day, ascending by
    /// (date, shift), at most `limit`.
    fn list_upcoming(
        &self,
        logistics_center_id: LogisticsCenterId,
        from: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<StockDocument>, StoreError>;

    /// Returns the version the line was stored at; re-added lines never
    /// reuse a version issued before their removal.
    fn insert_line(&self, document_id: StockDocumentId, line: StockLine) -> Result<u64, StoreError>;

    fn remove_line(
        &self,
        document_id: StockDocumentId,
        farmer_order_id: FarmerOrderId,
    ) -> Result<StockLine, StoreError>;

    /// Read one line; its `version()` is the token for a later CAS.
    fn load_line(
        &self,
        document_id: StockDocumentId,
        farmer_order_id: FarmerOrderId,
    ) -> Result<StockLine, StoreError>;

    fn compare_and_swap_line(
        &self,
        document_id: StockDocumentId,
        candidate: StockLine,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError>;
}

impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    fn find_or_create(&self, key: DocumentKey) -> Result<StockDocument, StoreError> {
        (**self).find_or_create(key)
    }

    fn get_by_key(&self, key: &DocumentKey) -> Result<Option<StockDocument>, StoreError> {
        (**self).get_by_key(key)
    }

    fn get_by_id(&self, id: StockDocumentId) -> Result<Option<StockDocument>, StoreError> {
        (**self).get_by_id(id)
    }

    fn list_upcoming(
        &self,
        logistics_center_id: LogisticsCenterId,
        from: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<StockDocument>, StoreError> {
        (**self).list_upcoming(logistics_center_id, from, limit)
    }

    fn insert_line(&self, document_id: StockDocumentId, line: StockLine) -> Result<u64, StoreError> {
        (**self).insert_line(document_id, line)
    }

    fn remove_line(
        &self,
        document_id: StockDocumentId,
        farmer_order_id: FarmerOrderId,
    ) -> Result<StockLine, StoreError> {
        (**self).remove_line(document_id, farmer_order_id)
    }

    fn load_line(
        &self,
        document_id: StockDocumentId,
        farmer_order_id: FarmerOrderId,
    ) -> Result<StockLine, StoreError> {
        (**self).load_line(document_id, farmer_order_id)
    }

    fn compare_and_swap_line(
        &self,
        document_id: StockDocumentId,
        candidate: StockLine,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        (**self).compare_and_swap_line(document_id, candidate, expected)
    }
}
