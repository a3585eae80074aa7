use std::collections::HashMap;

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;

use farmstock_core::{
    AggregateRoot, DomainError, DomainResult, Entity, ExpectedVersion, FarmerOrderId,
    LogisticsCenterId, StockDocumentId,
};

use crate::line::StockLine;
use crate::shift::ShiftName;
use crate::status::LineStatus;

/// Truncate a timestamp to midnight UTC of the same UTC day.
pub fn normalize_to_utc_midnight(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Natural key of a stock document. The date is always midnight UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DocumentKey {
    logistics_center_id: LogisticsCenterId,
    available_date: DateTime<Utc>,
    shift: ShiftName,
}

impl DocumentKey {
    pub fn new(logistics_center_id: LogisticsCenterId, available_date: DateTime<Utc>, shift: ShiftName) -> Self {
        Self {
            logistics_center_id,
            available_date: normalize_to_utc_midnight(available_date),
            shift,
        }
    }

    pub fn logistics_center_id(&self) -> LogisticsCenterId {
        self.logistics_center_id
    }

    pub fn available_date(&self) -> DateTime<Utc> {
        self.available_date
    }

    pub fn shift(&self) -> ShiftName {
        self.shift
    }

    /// Sort key for "upcoming" listings.
    pub fn schedule_order(&self) -> (DateTime<Utc>, ShiftName) {
        (self.available_date, self.shift)
    }
}

/// Per-document totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub line_count: usize,
    pub active_line_count: usize,
    pub total_committed_kg: f64,
    pub total_available_kg: f64,
}

/// Available market stock for one logistics center, date and shift.
///
/// Lines live in an insertion-ordered arena with an index keyed by farmer
/// order, so a single adjustment touches exactly one entry.
#[derive(Debug, Clone, Serialize)]
pub struct StockDocument {
    id: StockDocumentId,
    key: DocumentKey,
    lines: Vec<StockLine>,
    #[serde(skip)]
    index: HashMap<FarmerOrderId, usize>,
    /// Versions below this were issued to lines that have since been removed.
    min_line_version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StockDocument {
    pub fn new(id: StockDocumentId, key: DocumentKey, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            key,
            lines: Vec::new(),
            index: HashMap::new(),
            min_line_version: 0,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn id_typed(&self) -> StockDocumentId {
        self.id
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn lines(&self) -> &[StockLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn contains(&self, farmer_order_id: FarmerOrderId) -> bool {
        self.index.contains_key(&farmer_order_id)
    }

    pub fn line(&self, farmer_order_id: FarmerOrderId) -> Option<&StockLine> {
        self.index.get(&farmer_order_id).map(|&pos| &self.lines[pos])
    }

    /// Append a freshly built line, returning the version it was stored at.
    ///
    /// A line re-added after a removal starts above every version the removed
    /// line reached, so a token read before the removal can never match again.
    pub fn insert_line(&mut self, mut line: StockLine, at: DateTime<Utc>) -> DomainResult<u64> {
        let farmer_order_id = line.farmer_order_id();
        if self.contains(farmer_order_id) {
            return Err(DomainError::DuplicateFarmerOrder(farmer_order_id));
        }
        line.version = line.version.max(self.min_line_version);
        let version = line.version;
        self.index.insert(farmer_order_id, self.lines.len());
        self.lines.push(line);
        self.updated_at = at;
        Ok(version)
    }

    /// Hard-delete a line, keeping the remaining lines in order.
    pub fn remove_line(&mut self, farmer_order_id: FarmerOrderId, at: DateTime<Utc>) -> DomainResult<StockLine> {
        let pos = self.index.remove(&farmer_order_id).ok_or(DomainError::NotFound)?;
        let removed = self.lines.remove(pos);
        self.min_line_version = self.min_line_version.max(removed.version + 1);
        for (shifted, line) in self.lines.iter().enumerate().skip(pos) {
            self.index.insert(line.farmer_order_id(), shifted);
        }
        self.updated_at = at;
        Ok(removed)
    }

    /// Replace one line iff its stored version still matches `expected`.
    pub fn compare_and_swap_line(
        &mut self,
        candidate: StockLine,
        expected: ExpectedVersion,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let pos = *self
            .index
            .get(&candidate.farmer_order_id())
            .ok_or(DomainError::NotFound)?;
        expected.check(self.lines[pos].version())?;
        self.lines[pos] = candidate;
        self.updated_at = at;
        Ok(())
    }

    pub fn summary(&self) -> DocumentSummary {
        let mut summary = DocumentSummary {
            line_count: self.lines.len(),
            active_line_count: 0,
            total_committed_kg: 0.0,
            total_available_kg: 0.0,
        };
        for line in &self.lines {
            if line.status() == LineStatus::Active {
                summary.active_line_count += 1;
            }
            summary.total_committed_kg += line.original_committed_quantity_kg();
            summary.total_available_kg += line.current_available_quantity_kg();
        }
        summary.total_committed_kg = crate::conversion::round_kg(summary.total_committed_kg);
        summary.total_available_kg = crate::conversion::round_kg(summary.total_available_kg);
        summary
    }
}

impl Entity for StockDocument {
    type Id = StockDocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use farmstock_catalog::CatalogPricingInfo;
    use farmstock_core::{Aggregate, FarmerId, ItemId};

    use crate::builder::{EstimateDefaults, FarmerOrderApproval, build_stock_line};
    use crate::line::{AdjustAvailableKg, LineCommand};

    fn line(committed_kg: f64) -> StockLine {
        let item_id = ItemId::new();
        let info = CatalogPricingInfo {
            price_per_kg: Some(3.0),
            ..CatalogPricingInfo::new(item_id, "Onion", "vegetables")
        };
        let approval = FarmerOrderApproval {
            farmer_order_id: FarmerOrderId::new(),
            item_id,
            farmer_id: FarmerId::new(),
            farmer_name: "Omer".into(),
            farm_name: "Omer's".into(),
            farm_logo: None,
            committed_kg,
        };
        build_stock_line(&approval, &info, &EstimateDefaults::default()).unwrap()
    }

    fn document() -> StockDocument {
        let key = DocumentKey::new(LogisticsCenterId::new(), Utc::now(), ShiftName::Morning);
        StockDocument::new(StockDocumentId::new(), key, Utc::now())
    }

    #[test]
    fn key_dates_are_normalized_to_midnight_utc() {
        let lc = LogisticsCenterId::new();
        let early = Utc.with_ymd_and_hms(2025, 3, 4, 0, 30, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 3, 4, 23, 59, 59).unwrap();

        let a = DocumentKey::new(lc, early, ShiftName::Evening);
        let b = DocumentKey::new(lc, late, ShiftName::Evening);

        assert_eq!(a, b);
        assert_eq!(a.available_date(), Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn duplicate_farmer_order_is_rejected() {
        let mut doc = document();
        let l = line(10.0);
        doc.insert_line(l.clone(), Utc::now()).unwrap();

        let err = doc.insert_line(l.clone(), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::DuplicateFarmerOrder(l.farmer_order_id()));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn remove_keeps_order_and_index_consistent() {
        let mut doc = document();
        let lines: Vec<StockLine> = (1..=4).map(|i| line(f64::from(i))).collect();
        for l in &lines {
            doc.insert_line(l.clone(), Utc::now()).unwrap();
        }

        let removed = doc.remove_line(lines[1].farmer_order_id(), Utc::now()).unwrap();
        assert_eq!(removed.farmer_order_id(), lines[1].farmer_order_id());

        let remaining: Vec<_> = doc.lines().iter().map(|l| l.farmer_order_id()).collect();
        assert_eq!(
            remaining,
            vec![lines[0].farmer_order_id(), lines[2].farmer_order_id(), lines[3].farmer_order_id()]
        );
        for l in [&lines[0], &lines[2], &lines[3]] {
            assert_eq!(doc.line(l.farmer_order_id()).unwrap().farmer_order_id(), l.farmer_order_id());
        }
        assert!(doc.line(lines[1].farmer_order_id()).is_none());
        assert_eq!(
            doc.remove_line(lines[1].farmer_order_id(), Utc::now()).unwrap_err(),
            DomainError::NotFound
        );
    }

    #[test]
    fn stale_compare_and_swap_is_a_conflict() {
        let mut doc = document();
        let original = line(10.0);
        doc.insert_line(original.clone(), Utc::now()).unwrap();

        let mut first = original.clone();
        let events = first
            .handle(&LineCommand::AdjustAvailableKg(AdjustAvailableKg {
                delta_kg: -1.0,
                enforce_enough_for_reserve: true,
                auto_soldout: true,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for e in &events {
            first.apply(e);
        }
        doc.compare_and_swap_line(first.clone(), ExpectedVersion::Exact(original.version()), Utc::now())
            .unwrap();

        // A second writer that read the same original version loses.
        let err = doc
            .compare_and_swap_line(first, ExpectedVersion::Exact(original.version()), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(
            doc.line(original.farmer_order_id()).unwrap().current_available_quantity_kg(),
            9.0
        );
    }

    #[test]
    fn readded_line_does_not_reuse_old_versions() {
        let mut doc = document();
        let original = line(10.0);
        let id = original.farmer_order_id();
        assert_eq!(doc.insert_line(original.clone(), Utc::now()).unwrap(), 0);

        // A writer reads version 0, then the line is removed and re-added.
        let mut stale = original.clone();
        for e in &stale
            .handle(&LineCommand::AdjustAvailableKg(AdjustAvailableKg {
                delta_kg: -4.0,
                enforce_enough_for_reserve: true,
                auto_soldout: true,
                occurred_at: Utc::now(),
            }))
            .unwrap()
        {
            stale.apply(e);
        }
        doc.remove_line(id, Utc::now()).unwrap();
        assert_eq!(doc.insert_line(original, Utc::now()).unwrap(), 1);

        let err = doc
            .compare_and_swap_line(stale, ExpectedVersion::Exact(0), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(doc.line(id).unwrap().current_available_quantity_kg(), 10.0);
        assert_eq!(doc.line(id).unwrap().version(), 1);
    }

    #[test]
    fn summary_totals_lines() {
        let mut doc = document();
        doc.insert_line(line(10.0), Utc::now()).unwrap();
        doc.insert_line(line(2.5), Utc::now()).unwrap();

        let summary = doc.summary();
        assert_eq!(summary.line_count, 2);
        assert_eq!(summary.active_line_count, 2);
        assert_eq!(summary.total_committed_kg, 12.5);
        assert_eq!(summary.total_available_kg, 12.5);
    }
}
