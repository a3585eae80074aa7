use serde::{Deserialize, Serialize};
use uuid::Uuid;

use farmstock_core::{FarmerOrderId, StockDocumentId};

/// Envelope for a published stock event.
///
/// A stream is one stock line: `(document_id, farmer_order_id)`.
/// `line_version` is the line's version *after* the event was applied, so a
/// consumer can drop replays whose version it has already seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    document_id: StockDocumentId,
    farmer_order_id: FarmerOrderId,
    line_version: u64,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        document_id: StockDocumentId,
        farmer_order_id: FarmerOrderId,
        line_version: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            document_id,
            farmer_order_id,
            line_version,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn document_id(&self) -> StockDocumentId {
        self.document_id
    }

    pub fn farmer_order_id(&self) -> FarmerOrderId {
        self.farmer_order_id
    }

    pub fn line_version(&self) -> u64 {
        self.line_version
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}
