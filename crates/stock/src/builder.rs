//! Stock line builder: farmer-order approval + catalog entry -> `StockLine`.

use serde::{Deserialize, Serialize};

use farmstock_catalog::CatalogPricingInfo;
use farmstock_core::{DomainError, DomainResult, FarmerId, FarmerOrderId, ItemId};

use crate::line::{FarmerProvenance, StockLine, UnitEstimates};
use crate::status::LineStatus;

/// Approved farmer order, as handed over by the approval workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerOrderApproval {
    pub farmer_order_id: FarmerOrderId,
    pub item_id: ItemId,
    pub farmer_id: FarmerId,
    pub farmer_name: String,
    pub farm_name: String,
    pub farm_logo: Option<String>,
    pub committed_kg: f64,
}

/// Safety margin applied to every new line's unit estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimateDefaults {
    /// Standard deviations added to the average unit weight (1.28 ≈ 90th percentile).
    pub z_score: f64,
    /// Expected handling loss as a fraction (0.02 = 2%).
    pub shrinkage_pct: f64,
}

impl Default for EstimateDefaults {
    fn default() -> Self {
        Self {
            z_score: 1.28,
            shrinkage_pct: 0.02,
        }
    }
}

fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn valid_price(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

/// Price per kg: the catalog base price, or for weight-variable categories a
/// per-unit price spread over the average unit weight.
pub fn resolve_price_per_kg(info: &CatalogPricingInfo) -> DomainResult<f64> {
    if let Some(base) = valid_price(info.price_per_kg) {
        return Ok(round_money(base));
    }
    if info.is_weight_variable() {
        if let (Some(unit_price), Some(avg)) =
            (valid_price(info.price_per_unit_override), info.known_avg_weight_kg())
        {
            return Ok(round_money(unit_price / avg));
        }
    }
    Err(DomainError::PricingUnresolved(info.item_id))
}

/// Price per unit: explicit override, else derived from the kg price.
pub fn resolve_price_per_unit(info: &CatalogPricingInfo, price_per_kg: f64) -> Option<f64> {
    valid_price(info.price_per_unit_override)
        .or_else(|| info.known_avg_weight_kg().map(|avg| price_per_kg * avg))
        .map(round_money)
}

/// Build a fully populated, `active` line whose available quantity equals the
/// commitment.
pub fn build_stock_line(
    approval: &FarmerOrderApproval,
    info: &CatalogPricingInfo,
    defaults: &EstimateDefaults,
) -> DomainResult<StockLine> {
    if approval.item_id != info.item_id {
        return Err(DomainError::validation(format!(
            "catalog entry {} does not match approved item {}",
            info.item_id, approval.item_id
        )));
    }
    if !approval.committed_kg.is_finite() || approval.committed_kg < 0.0 {
        return Err(DomainError::validation("committed_kg must be a finite, non-negative amount"));
    }

    let price_per_kg = resolve_price_per_kg(info)?;
    let price_per_unit = resolve_price_per_unit(info, price_per_kg);
    let (unit_mode, unit_bundle_size) = info.sell_modes.resolve();
    let committed_kg = crate::conversion::round_kg(approval.committed_kg);

    let estimates = UnitEstimates {
        avg_weight_per_unit_kg: info.known_avg_weight_kg(),
        sd_kg: info
            .sd_weight_per_unit_kg
            .filter(|sd| sd.is_finite() && *sd >= 0.0)
            .unwrap_or(0.0),
        unit_bundle_size,
        z_score: defaults.z_score,
        shrinkage_pct: defaults.shrinkage_pct,
        available_units_estimate: None,
    };

    let mut line = StockLine {
        farmer_order_id: approval.farmer_order_id,
        item_id: info.item_id,
        display_name: info.display_name.clone(),
        category: info.category.clone(),
        image_url: info.image_url.clone(),
        price_per_kg,
        price_per_unit,
        original_committed_quantity_kg: committed_kg,
        current_available_quantity_kg: committed_kg,
        unit_mode,
        estimates,
        status: LineStatus::Active,
        provenance: FarmerProvenance {
            farmer_id: approval.farmer_id,
            farmer_name: approval.farmer_name.clone(),
            farm_name: approval.farm_name.clone(),
            farm_logo: approval.farm_logo.clone(),
        },
        version: 0,
    };
    line.refresh_estimate();
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmstock_catalog::{SellModes, UnitMode};

    fn approval_for(item_id: ItemId, committed_kg: f64) -> FarmerOrderApproval {
        FarmerOrderApproval {
            farmer_order_id: FarmerOrderId::new(),
            item_id,
            farmer_id: FarmerId::new(),
            farmer_name: "Noa Ben-David".to_string(),
            farm_name: "Ben-David Farm".to_string(),
            farm_logo: Some("https://cdn.example/logo.png".to_string()),
            committed_kg,
        }
    }

    #[test]
    fn kg_item_uses_base_price_and_has_no_unit_estimate() {
        let item_id = ItemId::new();
        let info = CatalogPricingInfo {
            price_per_kg: Some(7.499),
            ..CatalogPricingInfo::new(item_id, "Cucumber", "vegetables")
        };

        let line = build_stock_line(&approval_for(item_id, 120.0), &info, &EstimateDefaults::default()).unwrap();

        assert_eq!(line.price_per_kg(), 7.5);
        assert_eq!(line.price_per_unit(), None);
        assert_eq!(line.unit_mode(), UnitMode::Kg);
        assert_eq!(line.status(), LineStatus::Active);
        assert_eq!(line.original_committed_quantity_kg(), 120.0);
        assert_eq!(line.current_available_quantity_kg(), 120.0);
        assert_eq!(line.available_units_estimate(), None);
        assert_eq!(line.provenance().farm_name, "Ben-David Farm");
    }

    #[test]
    fn weight_variable_item_synthesizes_kg_price_from_unit_override() {
        let item_id = ItemId::new();
        let info = CatalogPricingInfo {
            price_per_kg: None,
            price_per_unit_override: Some(1.2),
            avg_weight_per_unit_kg: Some(0.06),
            sell_modes: SellModes::Flags {
                by_kg: false,
                by_unit: true,
                unit_bundle_size: 12,
            },
            ..CatalogPricingInfo::new(item_id, "Eggs M", "eggs")
        };

        let line = build_stock_line(&approval_for(item_id, 30.0), &info, &EstimateDefaults::default()).unwrap();

        assert_eq!(line.price_per_kg(), 20.0);
        assert_eq!(line.price_per_unit(), Some(1.2));
        assert_eq!(line.estimates().unit_bundle_size(), 12);
        assert_eq!(line.available_units_estimate().map(|u| u % 12), Some(0));
    }

    #[test]
    fn unit_price_is_derived_when_not_overridden() {
        let item_id = ItemId::new();
        let info = CatalogPricingInfo {
            price_per_kg: Some(10.0),
            avg_weight_per_unit_kg: Some(0.25),
            sell_modes: SellModes::Legacy { mode: "mixed".into() },
            ..CatalogPricingInfo::new(item_id, "Lettuce", "greens")
        };

        let line = build_stock_line(&approval_for(item_id, 10.0), &info, &EstimateDefaults::default()).unwrap();

        assert_eq!(line.unit_mode(), UnitMode::Mixed);
        assert_eq!(line.price_per_unit(), Some(2.5));
        assert!(line.sold_by_unit());
    }

    #[test]
    fn missing_price_is_pricing_unresolved() {
        let item_id = ItemId::new();
        let info = CatalogPricingInfo::new(item_id, "Mystery", "misc");
        let err = build_stock_line(&approval_for(item_id, 5.0), &info, &EstimateDefaults::default()).unwrap_err();
        assert_eq!(err, DomainError::PricingUnresolved(item_id));
    }

    #[test]
    fn zero_price_is_not_accepted_as_a_price() {
        let item_id = ItemId::new();
        let info = CatalogPricingInfo {
            price_per_kg: Some(0.0),
            ..CatalogPricingInfo::new(item_id, "Free?", "misc")
        };
        assert!(matches!(
            resolve_price_per_kg(&info),
            Err(DomainError::PricingUnresolved(_))
        ));
    }

    #[test]
    fn unit_override_does_not_price_non_weight_variable_items() {
        let item_id = ItemId::new();
        let info = CatalogPricingInfo {
            price_per_unit_override: Some(3.0),
            avg_weight_per_unit_kg: Some(0.3),
            ..CatalogPricingInfo::new(item_id, "Melon", "fruit")
        };
        assert!(resolve_price_per_kg(&info).is_err());
    }

    #[test]
    fn rejects_negative_commitment_and_mismatched_item() {
        let item_id = ItemId::new();
        let info = CatalogPricingInfo {
            price_per_kg: Some(5.0),
            ..CatalogPricingInfo::new(item_id, "Potato", "vegetables")
        };
        let defaults = EstimateDefaults::default();

        assert!(matches!(
            build_stock_line(&approval_for(item_id, -1.0), &info, &defaults),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            build_stock_line(&approval_for(ItemId::new(), 1.0), &info, &defaults),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn unit_mode_without_known_weight_has_no_estimate() {
        let item_id = ItemId::new();
        let info = CatalogPricingInfo {
            price_per_kg: Some(5.0),
            sell_modes: SellModes::Legacy { mode: "unit".into() },
            ..CatalogPricingInfo::new(item_id, "Bunch of herbs", "herbs")
        };

        let line = build_stock_line(&approval_for(item_id, 3.0), &info, &EstimateDefaults::default()).unwrap();
        assert_eq!(line.unit_mode(), UnitMode::Unit);
        assert_eq!(line.available_units_estimate(), None);
        assert!(!line.sold_by_unit());
    }
}
