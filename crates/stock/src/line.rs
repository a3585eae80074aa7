use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use farmstock_catalog::UnitMode;
use farmstock_core::{Aggregate, AggregateRoot, DomainError, FarmerId, FarmerOrderId, ItemId};

use crate::conversion::{
    conservative_units_from_kg, delta_kg_to_grams, grams_to_kg, kg_to_grams, round_kg, units_to_kg_delta,
};
use crate::event::{AvailableKgAdjusted, LineEvent, StatusChanged};
use crate::status::LineStatus;

/// Who committed the produce. Immutable after the line is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmerProvenance {
    pub farmer_id: FarmerId,
    pub farmer_name: String,
    pub farm_name: String,
    pub farm_logo: Option<String>,
}

/// Unit weight statistics and the derived sellable-unit estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitEstimates {
    pub(crate) avg_weight_per_unit_kg: Option<f64>,
    pub(crate) sd_kg: f64,
    pub(crate) unit_bundle_size: u32,
    pub(crate) z_score: f64,
    pub(crate) shrinkage_pct: f64,
    pub(crate) available_units_estimate: Option<u64>,
}

impl UnitEstimates {
    pub fn avg_weight_per_unit_kg(&self) -> Option<f64> {
        self.avg_weight_per_unit_kg
    }

    pub fn sd_kg(&self) -> f64 {
        self.sd_kg
    }

    pub fn unit_bundle_size(&self) -> u32 {
        self.unit_bundle_size
    }

    pub fn z_score(&self) -> f64 {
        self.z_score
    }

    pub fn shrinkage_pct(&self) -> f64 {
        self.shrinkage_pct
    }

    pub fn available_units_estimate(&self) -> Option<u64> {
        self.available_units_estimate
    }

    fn units_for_kg(&self, kg: f64) -> Option<u64> {
        self.avg_weight_per_unit_kg.map(|avg| {
            conservative_units_from_kg(
                kg,
                avg,
                self.sd_kg,
                self.z_score,
                self.shrinkage_pct,
                self.unit_bundle_size,
            )
        })
    }

    fn kg_for_units(&self, units_delta: i64) -> Option<f64> {
        self.avg_weight_per_unit_kg.map(|avg| {
            units_to_kg_delta(
                units_delta,
                avg,
                self.sd_kg,
                self.z_score,
                self.shrinkage_pct,
                self.unit_bundle_size,
            )
        })
    }
}

/// One farmer order's sellable remainder within a stock document.
///
/// Invariant: `0 <= current_available_quantity_kg <= original_committed_quantity_kg`,
/// and `available_units_estimate` always equals the conservative conversion of
/// the current kilograms (or is `None` for kg-only lines / unknown weights).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLine {
    pub(crate) farmer_order_id: FarmerOrderId,
    pub(crate) item_id: ItemId,
    pub(crate) display_name: String,
    pub(crate) category: String,
    pub(crate) image_url: Option<String>,
    pub(crate) price_per_kg: f64,
    pub(crate) price_per_unit: Option<f64>,
    pub(crate) original_committed_quantity_kg: f64,
    pub(crate) current_available_quantity_kg: f64,
    pub(crate) unit_mode: UnitMode,
    pub(crate) estimates: UnitEstimates,
    pub(crate) status: LineStatus,
    pub(crate) provenance: FarmerProvenance,
    pub(crate) version: u64,
}

impl StockLine {
    pub fn farmer_order_id(&self) -> FarmerOrderId {
        self.farmer_order_id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn price_per_kg(&self) -> f64 {
        self.price_per_kg
    }

    pub fn price_per_unit(&self) -> Option<f64> {
        self.price_per_unit
    }

    pub fn original_committed_quantity_kg(&self) -> f64 {
        self.original_committed_quantity_kg
    }

    pub fn current_available_quantity_kg(&self) -> f64 {
        self.current_available_quantity_kg
    }

    pub fn unit_mode(&self) -> UnitMode {
        self.unit_mode
    }

    pub fn estimates(&self) -> &UnitEstimates {
        &self.estimates
    }

    pub fn available_units_estimate(&self) -> Option<u64> {
        self.estimates.available_units_estimate
    }

    pub fn status(&self) -> LineStatus {
        self.status
    }

    pub fn provenance(&self) -> &FarmerProvenance {
        &self.provenance
    }

    /// Whether whole-unit adjustments are possible on this line.
    pub fn sold_by_unit(&self) -> bool {
        self.unit_mode.sells_by_unit() && self.estimates.avg_weight_per_unit_kg.is_some()
    }

    /// Kilogram delta for a unit delta, using this line's own weight model.
    ///
    /// `Ok(0.0)` means less than one bundle was requested.
    pub fn kg_delta_for_units(&self, units_delta: i64) -> Result<f64, DomainError> {
        if !self.sold_by_unit() {
            return Err(DomainError::NotSoldByUnit);
        }
        self.estimates
            .kg_for_units(units_delta)
            .ok_or(DomainError::NotSoldByUnit)
    }

    /// Recompute the unit estimate from the current kilograms.
    pub(crate) fn refresh_estimate(&mut self) {
        self.estimates.available_units_estimate = if self.unit_mode.sells_by_unit() {
            self.estimates.units_for_kg(self.current_available_quantity_kg)
        } else {
            None
        };
    }

    /// Snapshot of the values a caller sees after an adjustment.
    pub fn outcome(&self, previous_kg: f64) -> AdjustmentOutcome {
        AdjustmentOutcome {
            farmer_order_id: self.farmer_order_id,
            previous_available_kg: previous_kg,
            current_available_quantity_kg: self.current_available_quantity_kg,
            applied_delta_kg: round_kg(self.current_available_quantity_kg - previous_kg),
            available_units_estimate: self.estimates.available_units_estimate,
            status: self.status,
            version: self.version,
        }
    }
}

impl AggregateRoot for StockLine {
    type Id = FarmerOrderId;

    fn id(&self) -> &Self::Id {
        &self.farmer_order_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Result of a reserve/release call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentOutcome {
    pub farmer_order_id: FarmerOrderId,
    pub previous_available_kg: f64,
    pub current_available_quantity_kg: f64,
    /// What actually moved after clamping (0 for a no-op).
    pub applied_delta_kg: f64,
    pub available_units_estimate: Option<u64>,
    pub status: LineStatus,
    pub version: u64,
}

/// Command: reserve (`delta_kg < 0`) or release (`delta_kg > 0`) kilograms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustAvailableKg {
    pub delta_kg: f64,
    pub enforce_enough_for_reserve: bool,
    pub auto_soldout: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: explicit status change by an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub status: LineStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LineCommand {
    AdjustAvailableKg(AdjustAvailableKg),
    ChangeStatus(ChangeStatus),
}

impl Aggregate for StockLine {
    type Command = LineCommand;
    type Event = LineEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LineEvent::AvailableKgAdjusted(e) => {
                self.current_available_quantity_kg = e.current_kg;
                self.refresh_estimate();
            }
            LineEvent::StatusChanged(e) => {
                self.status = e.to;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LineCommand::AdjustAvailableKg(cmd) => self.handle_adjust(cmd),
            LineCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
        }
    }
}

impl StockLine {
    fn handle_adjust(&self, cmd: &AdjustAvailableKg) -> Result<Vec<LineEvent>, DomainError> {
        if !cmd.delta_kg.is_finite() || cmd.delta_kg == 0.0 {
            return Err(DomainError::validation("delta_kg must be finite and non-zero"));
        }
        if self.status.is_terminal() {
            return Err(DomainError::invariant("line has been removed"));
        }

        // Whole-gram arithmetic: the check and the write see the same amounts.
        let previous = self.current_available_quantity_kg;
        let delta_g = delta_kg_to_grams(cmd.delta_kg);
        let unclamped_g = kg_to_grams(previous).saturating_add(delta_g);
        if delta_g < 0 && cmd.enforce_enough_for_reserve && unclamped_g < 0 {
            return Err(DomainError::insufficient_stock(-cmd.delta_kg, previous));
        }

        // Over-release clamps to the commitment; over-reserve (unenforced) to zero.
        let committed_g = kg_to_grams(self.original_committed_quantity_kg);
        let next = grams_to_kg(unclamped_g.clamp(0, committed_g));

        let mut events = Vec::with_capacity(2);
        if next != previous {
            events.push(LineEvent::AvailableKgAdjusted(AvailableKgAdjusted {
                farmer_order_id: self.farmer_order_id,
                requested_delta_kg: cmd.delta_kg,
                previous_kg: previous,
                current_kg: next,
                occurred_at: cmd.occurred_at,
            }));
        }
        if cmd.auto_soldout && next == 0.0 && self.status == LineStatus::Active {
            events.push(LineEvent::StatusChanged(StatusChanged {
                farmer_order_id: self.farmer_order_id,
                from: self.status,
                to: LineStatus::SoldOut,
                occurred_at: cmd.occurred_at,
            }));
        }
        Ok(events)
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<LineEvent>, DomainError> {
        if !self
            .status
            .check_transition(cmd.status, self.current_available_quantity_kg)?
        {
            return Ok(vec![]);
        }
        Ok(vec![LineEvent::StatusChanged(StatusChanged {
            farmer_order_id: self.farmer_order_id,
            from: self.status,
            to: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }
}
