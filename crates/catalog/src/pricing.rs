use serde::{Deserialize, Serialize};

use farmstock_core::ItemId;

/// Categories whose price is natively quoted per unit (a dozen eggs, a tub of
/// yogurt) rather than per kilogram.
pub const WEIGHT_VARIABLE_CATEGORIES: &[&str] = &["eggs", "dairy"];

/// How a stock line may be sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitMode {
    Kg,
    Unit,
    Mixed,
}

impl UnitMode {
    pub fn from_flags(by_kg: bool, by_unit: bool) -> Self {
        match (by_kg, by_unit) {
            (true, true) => UnitMode::Mixed,
            (false, true) => UnitMode::Unit,
            // Nothing flagged means the item predates unit selling.
            _ => UnitMode::Kg,
        }
    }

    /// Parse the single enumerated mode string older catalog entries carry.
    pub fn parse_legacy(mode: &str) -> Option<Self> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "kg" | "weight" => Some(UnitMode::Kg),
            "unit" | "units" => Some(UnitMode::Unit),
            "mixed" | "both" => Some(UnitMode::Mixed),
            _ => None,
        }
    }

    pub fn sells_by_unit(self) -> bool {
        matches!(self, UnitMode::Unit | UnitMode::Mixed)
    }
}

impl core::fmt::Display for UnitMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            UnitMode::Kg => "kg",
            UnitMode::Unit => "unit",
            UnitMode::Mixed => "mixed",
        };
        f.write_str(s)
    }
}

/// Sell-mode configuration as the catalog stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SellModes {
    /// Current shape: explicit booleans plus the minimum salable multiple.
    Flags {
        by_kg: bool,
        by_unit: bool,
        unit_bundle_size: u32,
    },
    /// Older entries: one mode string, bundles of one.
    Legacy { mode: String },
}

impl SellModes {
    /// Resolve to a unit mode and a bundle size (always >= 1).
    ///
    /// An unrecognised legacy string falls back to kg-only selling.
    pub fn resolve(&self) -> (UnitMode, u32) {
        match self {
            SellModes::Flags {
                by_kg,
                by_unit,
                unit_bundle_size,
            } => (UnitMode::from_flags(*by_kg, *by_unit), (*unit_bundle_size).max(1)),
            SellModes::Legacy { mode } => (UnitMode::parse_legacy(mode).unwrap_or(UnitMode::Kg), 1),
        }
    }
}

impl Default for SellModes {
    fn default() -> Self {
        SellModes::Flags {
            by_kg: true,
            by_unit: false,
            unit_bundle_size: 1,
        }
    }
}

/// Everything the stock line builder needs to know about an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPricingInfo {
    pub item_id: ItemId,
    pub display_name: String,
    pub category: String,
    pub image_url: Option<String>,
    /// Base price per kg, if the catalog quotes one.
    pub price_per_kg: Option<f64>,
    pub sell_modes: SellModes,
    pub avg_weight_per_unit_kg: Option<f64>,
    pub sd_weight_per_unit_kg: Option<f64>,
    pub price_per_unit_override: Option<f64>,
}

impl CatalogPricingInfo {
    /// Minimal kg-only entry; adjust fields with struct update syntax.
    pub fn new(item_id: ItemId, display_name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            item_id,
            display_name: display_name.into(),
            category: category.into(),
            image_url: None,
            price_per_kg: None,
            sell_modes: SellModes::default(),
            avg_weight_per_unit_kg: None,
            sd_weight_per_unit_kg: None,
            price_per_unit_override: None,
        }
    }

    pub fn is_weight_variable(&self) -> bool {
        WEIGHT_VARIABLE_CATEGORIES
            .iter()
            .any(|c| c.eq_ignore_ascii_case(self.category.trim()))
    }

    /// Average unit weight, only when it is usable for conversions.
    pub fn known_avg_weight_kg(&self) -> Option<f64> {
        self.avg_weight_per_unit_kg.filter(|w| w.is_finite() && *w > 0.0)
    }
}
