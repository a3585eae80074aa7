//! Reservation storm against an in-memory ledger.
//!
//! Spins up one document with a single line, lets a handful of threads race
//! to reserve from it and prints the resulting document summary as JSON.
//!
//! ```text
//! FARMSTOCK_TRACE_ADJUSTMENTS=true RUST_LOG=debug cargo run --bin farmstock-storm -- 80 2.5 48
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use tracing::{error, info};

use farmstock_catalog::{CatalogPricingInfo, InMemoryCatalog, SellModes};
use farmstock_core::{FarmerId, FarmerOrderId, ItemId, LogisticsCenterId};
use farmstock_events::{EventEnvelope, InMemoryEventBus};
use farmstock_infra::{InMemoryStockStore, LedgerConfig, LedgerError, StockLedger};
use farmstock_stock::{FarmerOrderApproval, ShiftName, StockEvent};

fn arg_or<T: std::str::FromStr>(args: &[String], idx: usize, default: T) -> T {
    args.get(idx).and_then(|raw| raw.parse().ok()).unwrap_or(default)
}

fn main() {
    farmstock_observability::init();

    let args: Vec<String> = std::env::args().collect();
    let committed_kg: f64 = arg_or(&args, 1, 80.0);
    let reserve_kg: f64 = arg_or(&args, 2, 2.5);
    let callers: usize = arg_or(&args, 3, 48);

    if let Err(e) = run(committed_kg, reserve_kg, callers) {
        error!(error = %e, "storm aborted");
        std::process::exit(1);
    }
}

fn run(committed_kg: f64, reserve_kg: f64, callers: usize) -> Result<(), LedgerError> {
    let config = LedgerConfig::from_env();
    let catalog = Arc::new(InMemoryCatalog::new());
    let bus = Arc::new(InMemoryEventBus::<EventEnvelope<StockEvent>>::new());
    let ledger = StockLedger::new(InMemoryStockStore::new(), catalog.clone(), bus, config);

    let item_id = ItemId::new();
    catalog.upsert(CatalogPricingInfo {
        price_per_kg: Some(22.0),
        sell_modes: SellModes::Flags {
            by_kg: true,
            by_unit: true,
            unit_bundle_size: 12,
        },
        avg_weight_per_unit_kg: Some(0.06),
        sd_weight_per_unit_kg: Some(0.004),
        ..CatalogPricingInfo::new(item_id, "Free-range eggs", "eggs")
    })?;

    let document = ledger.find_or_create(LogisticsCenterId::new(), Utc::now(), ShiftName::Morning)?;
    let doc_id = document.id_typed();
    let line = ledger.add_line_from_approval(
        doc_id,
        &FarmerOrderApproval {
            farmer_order_id: FarmerOrderId::new(),
            item_id,
            farmer_id: FarmerId::new(),
            farmer_name: "Storm Farmer".to_string(),
            farm_name: "Storm Farm".to_string(),
            farm_logo: None,
            committed_kg,
        },
    )?;
    let fo = line.farmer_order_id();
    info!(%doc_id, farmer_order_id = %fo, committed_kg, units = ?line.available_units_estimate(), "line ready");

    let succeeded = AtomicUsize::new(0);
    let insufficient = AtomicUsize::new(0);
    let conflicts = AtomicUsize::new(0);
    std::thread::scope(|s| {
        for _ in 0..callers {
            s.spawn(|| match ledger.reserve_or_release_kg(doc_id, fo, -reserve_kg, true) {
                Ok(_) => {
                    succeeded.fetch_add(1, Ordering::Relaxed);
                }
                Err(LedgerError::InsufficientStock { .. }) => {
                    insufficient.fetch_add(1, Ordering::Relaxed);
                }
                Err(LedgerError::Conflict(_)) => {
                    conflicts.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => error!(error = %e, "reservation failed"),
            });
        }
    });

    let summary = ledger.get_by_id(doc_id)?.summary();
    info!(
        succeeded = succeeded.load(Ordering::Relaxed),
        insufficient = insufficient.load(Ordering::Relaxed),
        conflicts = conflicts.load(Ordering::Relaxed),
        "storm finished"
    );
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "summary not serializable"),
    }
    Ok(())
}
