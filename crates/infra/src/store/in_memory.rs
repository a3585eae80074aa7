use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use farmstock_core::{
    DomainError, Entity, ExpectedVersion, FarmerOrderId, LogisticsCenterId, StockDocumentId,
};
use farmstock_stock::{DocumentKey, StockDocument, StockLine, normalize_to_utc_midnight};

use super::r#trait::{StockStore, StoreError};

#[derive(Debug, Default)]
struct Documents {
    by_id: HashMap<StockDocumentId, StockDocument>,
    by_key: HashMap<DocumentKey, StockDocumentId>,
}

/// In-memory stock store.
///
/// Intended for tests/dev and single-node deployments. Reads take the shared
/// lock; each write takes the exclusive lock for exactly one check-and-write.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    inner: RwLock<Documents>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self) -> usize {
        self.inner.read().map(|d| d.by_id.len()).unwrap_or(0)
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

fn line_error(err: DomainError, farmer_order_id: FarmerOrderId) -> StoreError {
    match err {
        DomainError::NotFound => StoreError::LineNotFound(farmer_order_id),
        DomainError::DuplicateFarmerOrder(id) => StoreError::DuplicateLine(id),
        DomainError::Conflict(msg) => StoreError::VersionMismatch(msg),
        other => StoreError::Backend(other.to_string()),
    }
}

impl StockStore for InMemoryStockStore {
    fn find_or_create(&self, key: DocumentKey) -> Result<StockDocument, StoreError> {
        if let Some(existing) = self.get_by_key(&key)? {
            return Ok(existing);
        }

        let mut docs = self.inner.write().map_err(|_| poisoned())?;
        // Re-check under the write lock: another caller may have created it.
        if let Some(id) = docs.by_key.get(&key).copied() {
            return docs
                .by_id
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::Backend(format!("key index points at missing document {id}")));
        }

        let document = StockDocument::new(StockDocumentId::new(), key, Utc::now());
        let id = *document.id();
        docs.by_key.insert(key, id);
        docs.by_id.insert(id, document.clone());
        Ok(document)
    }

    fn get_by_key(&self, key: &DocumentKey) -> Result<Option<StockDocument>, StoreError> {
        let docs = self.inner.read().map_err(|_| poisoned())?;
        Ok(docs.by_key.get(key).and_then(|id| docs.by_id.get(id)).cloned())
    }

    fn get_by_id(&self, id: StockDocumentId) -> Result<Option<StockDocument>, StoreError> {
        let docs = self.inner.read().map_err(|_| poisoned())?;
        Ok(docs.by_id.get(&id).cloned())
    }

    fn list_upcoming(
        &self,
        logistics_center_id: LogisticsCenterId,
        from: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<StockDocument>, StoreError> {
        let from_day = normalize_to_utc_midnight(from);
        let docs = self.inner.read().map_err(|_| poisoned())?;

        let mut upcoming: Vec<&StockDocument> = docs
            .by_id
            .values()
            .filter(|d| {
                d.key().logistics_center_id() == logistics_center_id && d.key().available_date() >= from_day
            })
            .collect();
        upcoming.sort_by_key(|d| d.key().schedule_order());

        Ok(upcoming.into_iter().take(limit).cloned().collect())
    }

    fn insert_line(&self, document_id: StockDocumentId, line: StockLine) -> Result<u64, StoreError> {
        let farmer_order_id = line.farmer_order_id();
        let mut docs = self.inner.write().map_err(|_| poisoned())?;
        let document = docs
            .by_id
            .get_mut(&document_id)
            .ok_or(StoreError::DocumentNotFound(document_id))?;
        document
            .insert_line(line, Utc::now())
            .map_err(|e| line_error(e, farmer_order_id))
    }

    fn remove_line(
        &self,
        document_id: StockDocumentId,
        farmer_order_id: FarmerOrderId,
    ) -> Result<StockLine, StoreError> {
        let mut docs = self.inner.write().map_err(|_| poisoned())?;
        let document = docs
            .by_id
            .get_mut(&document_id)
            .ok_or(StoreError::DocumentNotFound(document_id))?;
        document
            .remove_line(farmer_order_id, Utc::now())
            .map_err(|e| line_error(e, farmer_order_id))
    }

    fn load_line(
        &self,
        document_id: StockDocumentId,
        farmer_order_id: FarmerOrderId,
    ) -> Result<StockLine, StoreError> {
        let docs = self.inner.read().map_err(|_| poisoned())?;
        let document = docs
            .by_id
            .get(&document_id)
            .ok_or(StoreError::DocumentNotFound(document_id))?;
        document
            .line(farmer_order_id)
            .cloned()
            .ok_or(StoreError::LineNotFound(farmer_order_id))
    }

    fn compare_and_swap_line(
        &self,
        document_id: StockDocumentId,
        candidate: StockLine,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        let farmer_order_id = candidate.farmer_order_id();
        let mut docs = self.inner.write().map_err(|_| poisoned())?;
        let document = docs
            .by_id
            .get_mut(&document_id)
            .ok_or(StoreError::DocumentNotFound(document_id))?;
        document
            .compare_and_swap_line(candidate, expected, Utc::now())
            .map_err(|e| line_error(e, farmer_order_id))
    }
}
