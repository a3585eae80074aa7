//! Stock ledger: the caller-facing API over documents and lines.
//!
//! Every line mutation runs through the same pipeline:
//!
//! ```text
//! load line (value + version)
//!   -> handle command (pure; invariants checked against this exact version)
//!   -> apply events to a copy (kg, estimate and status move together)
//!   -> compare-and-swap the copy, conditioned on the loaded version
//!   -> on version mismatch: back off, reload, decide again (bounded)
//!   -> publish the committed events
//! ```
//!
//! Because the decision is re-made against every reloaded version, a
//! reservation can only commit if the stock it checked is still the stock it
//! overwrites. There is no read-decide-write window and no separate clamp step.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use farmstock_catalog::CatalogPricingResolver;
use farmstock_core::{
    Aggregate, AggregateRoot, DomainError, DomainResult, ExpectedVersion, FarmerOrderId,
    LogisticsCenterId, StockDocumentId,
};
use farmstock_events::{EventBus, EventEnvelope};
use farmstock_stock::{
    AdjustAvailableKg, AdjustmentOutcome, ChangeStatus, DocumentKey, FarmerOrderApproval,
    LineAdded, LineCommand, LineEvent, LineRemoved, LineStatus, ShiftName, ShiftWindowProvider,
    StockDocument, StockEvent, StockLine, build_stock_line,
};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::retry::CasRetryPolicy;
use crate::store::{StockStore, StoreError};

/// Available-market-stock ledger.
///
/// Generic over its collaborators so tests run against in-memory parts and
/// deployments can swap in real backends:
///
/// - `S`: document storage with per-line compare-and-swap
/// - `C`: catalog pricing lookup (only used when building lines)
/// - `B`: bus for committed `StockEvent`s
///
/// All methods are synchronous and safe to call from many threads at once.
#[derive(Debug)]
pub struct StockLedger<S, C, B> {
    store: S,
    catalog: C,
    bus: B,
    config: LedgerConfig,
    retry: CasRetryPolicy,
}

impl<S, C, B> StockLedger<S, C, B> {
    pub fn new(store: S, catalog: C, bus: B, config: LedgerConfig) -> Self {
        let retry = config.retry_policy();
        Self {
            store,
            catalog,
            bus,
            config,
            retry,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, C, B> StockLedger<S, C, B>
where
    S: StockStore,
    C: CatalogPricingResolver,
    B: EventBus<EventEnvelope<StockEvent>>,
{
    /// Idempotent: equivalent dates (same UTC day) resolve to one document.
    pub fn find_or_create(
        &self,
        logistics_center_id: LogisticsCenterId,
        available_date: DateTime<Utc>,
        shift: ShiftName,
    ) -> LedgerResult<StockDocument> {
        let key = DocumentKey::new(logistics_center_id, available_date, shift);
        let document = self.store.find_or_create(key)?;
        debug!(
            doc_id = %document.id_typed(),
            lc_id = %logistics_center_id,
            date = %key.available_date().date_naive(),
            shift = %shift,
            "stock document resolved"
        );
        Ok(document)
    }

    pub fn get_by_key(
        &self,
        logistics_center_id: LogisticsCenterId,
        available_date: DateTime<Utc>,
        shift: ShiftName,
    ) -> LedgerResult<StockDocument> {
        let key = DocumentKey::new(logistics_center_id, available_date, shift);
        self.store.get_by_key(&key)?.ok_or_else(|| {
            LedgerError::NotFound(format!(
                "stock document for {logistics_center_id} on {} ({shift})",
                key.available_date().date_naive()
            ))
        })
    }

    pub fn get_by_id(&self, document_id: StockDocumentId) -> LedgerResult<StockDocument> {
        self.store
            .get_by_id(document_id)?
            .ok_or(LedgerError::from(StoreError::DocumentNotFound(document_id)))
    }

    /// Documents dated on/after `from`'s UTC day, ascending by (date, shift).
    pub fn list_upcoming(
        &self,
        logistics_center_id: LogisticsCenterId,
        from: DateTime<Utc>,
        limit: usize,
    ) -> LedgerResult<Vec<StockDocument>> {
        Ok(self.store.list_upcoming(logistics_center_id, from, limit)?)
    }

    /// Existing documents for the next `count` shift windows of a center.
    ///
    /// Windows without a document are skipped; nothing is created.
    pub fn upcoming_for_shifts<P>(
        &self,
        provider: &P,
        logistics_center_id: LogisticsCenterId,
        count: usize,
        from: DateTime<Utc>,
    ) -> LedgerResult<Vec<StockDocument>>
    where
        P: ShiftWindowProvider + ?Sized,
    {
        let windows = provider.next_shifts(logistics_center_id, count, from)?;
        let mut documents = Vec::with_capacity(windows.len());
        for window in windows {
            let key = DocumentKey::new(logistics_center_id, window.date, window.shift);
            if let Some(document) = self.store.get_by_key(&key)? {
                documents.push(document);
            }
        }
        Ok(documents)
    }

    /// One line, including the version a later write would be conditioned on.
    pub fn get_line(
        &self,
        document_id: StockDocumentId,
        farmer_order_id: FarmerOrderId,
    ) -> LedgerResult<StockLine> {
        Ok(self.store.load_line(document_id, farmer_order_id)?)
    }

    /// Append a line produced by the builder.
    pub fn add_line(&self, document_id: StockDocumentId, line: StockLine) -> LedgerResult<()> {
        let added = LineAdded {
            farmer_order_id: line.farmer_order_id(),
            item_id: line.item_id(),
            committed_kg: line.original_committed_quantity_kg(),
            unit_mode: line.unit_mode(),
            price_per_kg: line.price_per_kg(),
            occurred_at: Utc::now(),
        };
        let version = self.store.insert_line(document_id, line)?;
        info!(
            doc_id = %document_id,
            farmer_order_id = %added.farmer_order_id,
            committed_kg = added.committed_kg,
            unit_mode = %added.unit_mode,
            "stock line added"
        );

        self.publish(document_id, added.farmer_order_id, version, StockEvent::LineAdded(added))
    }

    /// Price, build and append a line for an approved farmer order.
    pub fn add_line_from_approval(
        &self,
        document_id: StockDocumentId,
        approval: &FarmerOrderApproval,
    ) -> LedgerResult<StockLine> {
        let info = self.catalog.resolve(approval.item_id)?;
        let line = build_stock_line(approval, &info, &self.config.estimate_defaults())?;
        self.add_line(document_id, line.clone())?;
        Ok(line)
    }

    /// Operator-only hard delete. The adjustment paths never remove lines.
    pub fn remove_line(
        &self,
        document_id: StockDocumentId,
        farmer_order_id: FarmerOrderId,
    ) -> LedgerResult<StockLine> {
        let removed = self.store.remove_line(document_id, farmer_order_id)?;
        info!(
            doc_id = %document_id,
            farmer_order_id = %farmer_order_id,
            remaining_kg = removed.current_available_quantity_kg(),
            "stock line removed"
        );

        let event = StockEvent::LineRemoved(LineRemoved {
            farmer_order_id,
            remaining_kg: removed.current_available_quantity_kg(),
            occurred_at: Utc::now(),
        });
        self.publish(document_id, farmer_order_id, removed.version() + 1, event)?;
        Ok(removed)
    }

    /// Reserve (`delta_kg < 0`) or release (`delta_kg > 0`) kilograms.
    ///
    /// With `enforce_enough_for_reserve`, a reservation larger than what is
    /// available at the moment of the write fails with `InsufficientStock`;
    /// without it, the line clamps to zero. Releases always clamp to the
    /// original commitment.
    pub fn reserve_or_release_kg(
        &self,
        document_id: StockDocumentId,
        farmer_order_id: FarmerOrderId,
        delta_kg: f64,
        enforce_enough_for_reserve: bool,
    ) -> LedgerResult<AdjustmentOutcome> {
        validate_delta_kg(delta_kg)?;
        let auto_soldout = self.config.auto_soldout;

        self.commit(document_id, farmer_order_id, |_| {
            Ok(Some(LineCommand::AdjustAvailableKg(AdjustAvailableKg {
                delta_kg,
                enforce_enough_for_reserve,
                auto_soldout,
                occurred_at: Utc::now(),
            })))
        })
    }

    /// Unit-denominated variant of [`Self::reserve_or_release_kg`].
    ///
    /// Units are rounded down to whole bundles; a request smaller than one
    /// bundle succeeds without touching the line.
    pub fn reserve_or_release_units(
        &self,
        document_id: StockDocumentId,
        farmer_order_id: FarmerOrderId,
        units_delta: i64,
        enforce_enough_for_reserve: bool,
    ) -> LedgerResult<AdjustmentOutcome> {
        if units_delta == 0 {
            return Err(LedgerError::Validation("units_delta must be non-zero".to_string()));
        }
        let auto_soldout = self.config.auto_soldout;

        self.commit(document_id, farmer_order_id, |line| {
            let delta_kg = line.kg_delta_for_units(units_delta)?;
            if delta_kg == 0.0 {
                debug!(
                    farmer_order_id = %farmer_order_id,
                    units_delta,
                    bundle = line.estimates().unit_bundle_size(),
                    "unit request below one bundle, nothing to do"
                );
                return Ok(None);
            }
            Ok(Some(LineCommand::AdjustAvailableKg(AdjustAvailableKg {
                delta_kg,
                enforce_enough_for_reserve,
                auto_soldout,
                occurred_at: Utc::now(),
            })))
        })
    }

    /// Explicit status change. `removed` is terminal; repeating the current
    /// status is a no-op.
    pub fn set_status(
        &self,
        document_id: StockDocumentId,
        farmer_order_id: FarmerOrderId,
        status: LineStatus,
    ) -> LedgerResult<AdjustmentOutcome> {
        self.commit(document_id, farmer_order_id, |_| {
            Ok(Some(LineCommand::ChangeStatus(ChangeStatus {
                status,
                occurred_at: Utc::now(),
            })))
        })
    }

    /// Version-guarded read-decide-write loop shared by every line mutation.
    ///
    /// `decide` runs against each freshly loaded line; `None` means there is
    /// nothing to write.
    fn commit<F>(
        &self,
        document_id: StockDocumentId,
        farmer_order_id: FarmerOrderId,
        decide: F,
    ) -> LedgerResult<AdjustmentOutcome>
    where
        F: Fn(&StockLine) -> DomainResult<Option<LineCommand>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let current = self.store.load_line(document_id, farmer_order_id)?;
            let previous_kg = current.current_available_quantity_kg();
            let base_version = current.version();

            let Some(command) = decide(&current)? else {
                return Ok(current.outcome(previous_kg));
            };
            let events = current.handle(&command)?;
            if events.is_empty() {
                return Ok(current.outcome(previous_kg));
            }

            let mut candidate = current;
            for event in &events {
                candidate.apply(event);
            }

            match self.store.compare_and_swap_line(
                document_id,
                candidate.clone(),
                ExpectedVersion::Exact(base_version),
            ) {
                Ok(()) => {
                    let outcome = candidate.outcome(previous_kg);
                    if self.config.trace_adjustments {
                        info!(
                            doc_id = %document_id,
                            farmer_order_id = %farmer_order_id,
                            previous_kg,
                            current_kg = outcome.current_available_quantity_kg,
                            applied_delta_kg = outcome.applied_delta_kg,
                            units_estimate = ?outcome.available_units_estimate,
                            status = %outcome.status,
                            version = outcome.version,
                            attempt,
                            "stock line committed"
                        );
                    }
                    self.publish_line_events(document_id, farmer_order_id, base_version, events)?;
                    return Ok(outcome);
                }
                Err(StoreError::VersionMismatch(reason)) => {
                    if !self.retry.should_retry(attempt) {
                        warn!(
                            doc_id = %document_id,
                            farmer_order_id = %farmer_order_id,
                            attempt,
                            "compare-and-swap retries exhausted"
                        );
                        return Err(LedgerError::Conflict(format!(
                            "line {farmer_order_id} still contended after {attempt} attempts ({reason})"
                        )));
                    }
                    let delay = self.retry.delay_for_attempt(attempt);
                    debug!(
                        doc_id = %document_id,
                        farmer_order_id = %farmer_order_id,
                        attempt,
                        delay_us = delay.as_micros() as u64,
                        "compare-and-swap lost, retrying"
                    );
                    std::thread::sleep(delay);
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    fn publish_line_events(
        &self,
        document_id: StockDocumentId,
        farmer_order_id: FarmerOrderId,
        base_version: u64,
        events: Vec<LineEvent>,
    ) -> LedgerResult<()> {
        for (offset, event) in events.into_iter().enumerate() {
            let version = base_version + offset as u64 + 1;
            self.publish(document_id, farmer_order_id, version, StockEvent::from(event))?;
        }
        Ok(())
    }

    fn publish(
        &self,
        document_id: StockDocumentId,
        farmer_order_id: FarmerOrderId,
        line_version: u64,
        event: StockEvent,
    ) -> LedgerResult<()> {
        let envelope = EventEnvelope::new(Uuid::now_v7(), document_id, farmer_order_id, line_version, event);
        self.bus.publish(envelope).map_err(|e| {
            warn!(doc_id = %document_id, farmer_order_id = %farmer_order_id, error = ?e, "stock event publish failed");
            LedgerError::Publish(format!("{e:?}"))
        })
    }
}

fn validate_delta_kg(delta_kg: f64) -> DomainResult<()> {
    if !delta_kg.is_finite() || delta_kg == 0.0 {
        return Err(DomainError::validation("delta_kg must be finite and non-zero"));
    }
    Ok(())
}
