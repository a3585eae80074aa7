use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use farmstock_catalog::UnitMode;
use farmstock_core::{FarmerOrderId, ItemId};
use farmstock_events::Event;

use crate::status::LineStatus;

/// Event: the available quantity of a line changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableKgAdjusted {
    pub farmer_order_id: FarmerOrderId,
    /// Delta as requested by the caller (before clamping).
    pub requested_delta_kg: f64,
    pub previous_kg: f64,
    pub current_kg: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a line moved to another lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub farmer_order_id: FarmerOrderId,
    pub from: LineStatus,
    pub to: LineStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Events a stock line emits about itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LineEvent {
    AvailableKgAdjusted(AvailableKgAdjusted),
    StatusChanged(StatusChanged),
}

/// Event: a farmer order was folded into a stock document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAdded {
    pub farmer_order_id: FarmerOrderId,
    pub item_id: ItemId,
    pub committed_kg: f64,
    pub unit_mode: UnitMode,
    pub price_per_kg: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: an operator deleted a line from its document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRemoved {
    pub farmer_order_id: FarmerOrderId,
    pub remaining_kg: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Everything published on the stock event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StockEvent {
    LineAdded(LineAdded),
    AvailableKgAdjusted(AvailableKgAdjusted),
    StatusChanged(StatusChanged),
    LineRemoved(LineRemoved),
}

impl From<LineEvent> for StockEvent {
    fn from(value: LineEvent) -> Self {
        match value {
            LineEvent::AvailableKgAdjusted(e) => StockEvent::AvailableKgAdjusted(e),
            LineEvent::StatusChanged(e) => StockEvent::StatusChanged(e),
        }
    }
}

impl StockEvent {
    pub fn farmer_order_id(&self) -> FarmerOrderId {
        match self {
            StockEvent::LineAdded(e) => e.farmer_order_id,
            StockEvent::AvailableKgAdjusted(e) => e.farmer_order_id,
            StockEvent::StatusChanged(e) => e.farmer_order_id,
            StockEvent::LineRemoved(e) => e.farmer_order_id,
        }
    }
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::LineAdded(_) => "stock.line.added",
            StockEvent::AvailableKgAdjusted(_) => "stock.line.adjusted",
            StockEvent::StatusChanged(_) => "stock.line.status_changed",
            StockEvent::LineRemoved(_) => "stock.line.removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::LineAdded(e) => e.occurred_at,
            StockEvent::AvailableKgAdjusted(e) => e.occurred_at,
            StockEvent::StatusChanged(e) => e.occurred_at,
            StockEvent::LineRemoved(e) => e.occurred_at,
        }
    }
}
