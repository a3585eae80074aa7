//! Integration tests for the full ledger pipeline.
//!
//! Tests: approval -> catalog -> builder -> store -> CAS adjustments -> bus
//!
//! Verifies:
//! - concurrent reservations never oversell a line
//! - the clamp invariant holds through mixed reserve/release storms
//! - subscribers observe every committed change, in line-version order

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::Utc;

    use farmstock_catalog::{CatalogPricingInfo, InMemoryCatalog, SellModes};
    use farmstock_core::{FarmerId, FarmerOrderId, ItemId, LogisticsCenterId, StockDocumentId};
    use farmstock_events::{EventBus, EventEnvelope, InMemoryEventBus};
    use farmstock_stock::{FarmerOrderApproval, LineStatus, ShiftName, StockEvent};

    use crate::config::LedgerConfig;
    use crate::error::LedgerError;
    use crate::ledger::StockLedger;
    use crate::store::InMemoryStockStore;

    type Bus = InMemoryEventBus<EventEnvelope<StockEvent>>;
    type Ledger = StockLedger<InMemoryStockStore, Arc<InMemoryCatalog>, Arc<Bus>>;

    fn setup() -> (Ledger, Arc<InMemoryCatalog>, Arc<Bus>, StockDocumentId) {
        let catalog = Arc::new(InMemoryCatalog::new());
        let bus = Arc::new(Bus::new());
        let config = LedgerConfig {
            cas_base_delay_ms: 1,
            cas_max_delay_ms: 4,
            ..LedgerConfig::default()
        };
        let ledger = StockLedger::new(InMemoryStockStore::new(), catalog.clone(), bus.clone(), config);
        let doc = ledger
            .find_or_create(LogisticsCenterId::new(), Utc::now(), ShiftName::Afternoon)
            .unwrap();
        (ledger, catalog, bus, doc.id_typed())
    }

    fn add_line(
        ledger: &Ledger,
        catalog: &InMemoryCatalog,
        doc_id: StockDocumentId,
        info: CatalogPricingInfo,
        kg: f64,
    ) -> FarmerOrderId {
        let approval = FarmerOrderApproval {
            farmer_order_id: FarmerOrderId::new(),
            item_id: info.item_id,
            farmer_id: FarmerId::new(),
            farmer_name: "Yael Cohen".to_string(),
            farm_name: "Cohen Greenhouses".to_string(),
            farm_logo: Some("https://cdn.example.org/logos/cohen.png".to_string()),
            committed_kg: kg,
        };
        catalog.upsert(info).unwrap();
        ledger.add_line_from_approval(doc_id, &approval).unwrap().farmer_order_id()
    }

    fn cucumbers() -> CatalogPricingInfo {
        CatalogPricingInfo {
            price_per_kg: Some(5.5),
            ..CatalogPricingInfo::new(ItemId::new(), "Cucumber", "vegetables")
        }
    }

    fn eggs() -> CatalogPricingInfo {
        CatalogPricingInfo {
            price_per_kg: Some(24.0),
            sell_modes: SellModes::Flags {
                by_kg: true,
                by_unit: true,
                unit_bundle_size: 6,
            },
            avg_weight_per_unit_kg: Some(0.06),
            sd_weight_per_unit_kg: Some(0.004),
            ..CatalogPricingInfo::new(ItemId::new(), "Eggs M", "eggs")
        }
    }

    /// Caller-side retry: `Conflict` means "nothing happened, try again".
    fn reserve_until_decided(
        ledger: &Ledger,
        doc_id: StockDocumentId,
        fo: FarmerOrderId,
        kg: f64,
    ) -> Result<(), LedgerError> {
        loop {
            match ledger.reserve_or_release_kg(doc_id, fo, -kg, true) {
                Err(LedgerError::Conflict(_)) => std::thread::yield_now(),
                other => return other.map(|_| ()),
            }
        }
    }

    #[test]
    fn concurrent_reservations_sell_exactly_what_is_available() {
        let (ledger, catalog, _bus, doc_id) = setup();
        let fo = add_line(&ledger, &catalog, doc_id, cucumbers(), 100.0);

        let succeeded = AtomicUsize::new(0);
        let insufficient = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..50 {
                s.spawn(|| match reserve_until_decided(&ledger, doc_id, fo, 3.0) {
                    Ok(()) => {
                        succeeded.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(LedgerError::InsufficientStock { .. }) => {
                        insufficient.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(other) => panic!("unexpected error: {other:?}"),
                });
            }
        });

        assert_eq!(succeeded.load(Ordering::SeqCst), 33);
        assert_eq!(insufficient.load(Ordering::SeqCst), 17);
        let line = ledger.get_line(doc_id, fo).unwrap();
        assert_eq!(line.current_available_quantity_kg(), 1.0);
        assert_eq!(line.status(), LineStatus::Active);
    }

    #[test]
    fn mixed_storm_keeps_every_line_within_bounds() {
        let (ledger, catalog, _bus, doc_id) = setup();
        let lines = [
            add_line(&ledger, &catalog, doc_id, cucumbers(), 20.0),
            add_line(&ledger, &catalog, doc_id, eggs(), 9.0),
        ];

        std::thread::scope(|s| {
            for worker in 0..8usize {
                let ledger = &ledger;
                s.spawn(move || {
                    for step in 0..40usize {
                        let fo = lines[(worker + step) % lines.len()];
                        let result = if (worker + step) % 3 == 0 {
                            ledger.reserve_or_release_kg(doc_id, fo, 2.5, true)
                        } else if step % 2 == 0 {
                            ledger.reserve_or_release_kg(doc_id, fo, -1.75, false)
                        } else {
                            ledger.reserve_or_release_units(doc_id, fo, -6, true)
                        };
                        match result {
                            Ok(outcome) => {
                                assert!(outcome.current_available_quantity_kg >= 0.0);
                            }
                            Err(LedgerError::Conflict(_))
                            | Err(LedgerError::InsufficientStock { .. })
                            | Err(LedgerError::NotSoldByUnit) => {}
                            Err(other) => panic!("unexpected error: {other:?}"),
                        }
                    }
                });
            }
        });

        for fo in lines {
            let line = ledger.get_line(doc_id, fo).unwrap();
            let kg = line.current_available_quantity_kg();
            assert!(kg >= 0.0 && kg <= line.original_committed_quantity_kg(), "{kg}");
        }
    }

    #[test]
    fn subscriber_sees_committed_changes_in_version_order() {
        let (ledger, catalog, bus, doc_id) = setup();

        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
        let subscriber_bus = bus.clone();
        let collector = std::thread::spawn(move || {
            let sub = subscriber_bus.subscribe();
            let _ = ready_tx.send(());
            let mut seen = Vec::new();
            while let Ok(envelope) = sub.recv_timeout(Duration::from_millis(500)) {
                seen.push(envelope);
            }
            seen
        });
        let _ = ready_rx.recv_timeout(Duration::from_secs(1));

        let fo = add_line(&ledger, &catalog, doc_id, cucumbers(), 10.0);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..5 {
                        let _ = reserve_until_decided(&ledger, doc_id, fo, 0.5);
                    }
                });
            }
        });

        let seen = collector.join().unwrap();
        let adjusted: Vec<u64> = seen
            .iter()
            .filter(|e| matches!(e.payload(), StockEvent::AvailableKgAdjusted(_)))
            .map(|e| e.line_version())
            .collect();
        let mut sorted = adjusted.clone();
        sorted.sort_unstable();
        sorted.dedup();

        // 20 reservations of 0.5 kg drain the line exactly.
        assert_eq!(adjusted.len(), 20);
        assert_eq!(sorted.len(), 20);
        let sold_out = seen
            .iter()
            .find(|e| matches!(e.payload(), StockEvent::StatusChanged(change) if change.to == LineStatus::SoldOut))
            .expect("drained line publishes a soldout transition");
        assert_eq!(sold_out.line_version(), 21);
        assert_eq!(ledger.get_line(doc_id, fo).unwrap().current_available_quantity_kg(), 0.0);
    }

    #[test]
    fn reserve_then_release_restores_the_line() {
        let (ledger, catalog, _bus, doc_id) = setup();
        let fo = add_line(&ledger, &catalog, doc_id, eggs(), 7.3);
        let before = ledger.get_line(doc_id, fo).unwrap();

        ledger.reserve_or_release_kg(doc_id, fo, -2.345, true).unwrap();
        let after = ledger.reserve_or_release_kg(doc_id, fo, 2.345, true).unwrap();

        assert_eq!(after.current_available_quantity_kg, before.current_available_quantity_kg());
        assert_eq!(after.available_units_estimate, before.available_units_estimate());
    }

    #[test]
    fn document_summary_tracks_ledger_activity() {
        let (ledger, catalog, _bus, doc_id) = setup();
        let a = add_line(&ledger, &catalog, doc_id, cucumbers(), 12.0);
        let b = add_line(&ledger, &catalog, doc_id, cucumbers(), 4.0);

        ledger.reserve_or_release_kg(doc_id, a, -2.0, true).unwrap();
        ledger.reserve_or_release_kg(doc_id, b, -4.0, true).unwrap();

        let summary = ledger.get_by_id(doc_id).unwrap().summary();
        assert_eq!(summary.line_count, 2);
        assert_eq!(summary.active_line_count, 1);
        assert_eq!(summary.total_committed_kg, 16.0);
        assert_eq!(summary.total_available_kg, 10.0);
    }
}
