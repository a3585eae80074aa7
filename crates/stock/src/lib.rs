//! Available-market-stock domain (pure, no IO).
//!
//! A `StockDocument` aggregates, per logistics center / date / shift, one
//! `StockLine` per farmer-order commitment. Lines track how many kilograms
//! remain sellable and derive a conservative unit count for items sold by
//! the piece or bundle.

pub mod builder;
pub mod conversion;
pub mod document;
pub mod event;
pub mod line;
pub mod shift;
pub mod status;

pub use builder::{EstimateDefaults, FarmerOrderApproval, build_stock_line};
pub use conversion::{
    conservative_units_from_kg, delta_kg_to_grams, effective_unit_weight_kg, grams_to_kg, kg_to_grams, round_kg,
    units_to_kg_delta,
};
pub use document::{DocumentKey, DocumentSummary, StockDocument, normalize_to_utc_midnight};
pub use event::{AvailableKgAdjusted, LineAdded, LineEvent, LineRemoved, StatusChanged, StockEvent};
pub use line::{
    AdjustAvailableKg, AdjustmentOutcome, ChangeStatus, FarmerProvenance, LineCommand, StockLine,
    UnitEstimates,
};
pub use shift::{ShiftName, ShiftWindow, ShiftWindowProvider};
pub use status::LineStatus;

pub use farmstock_catalog::UnitMode;
