use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use farmstock_core::{DomainError, DomainResult, LogisticsCenterId};

/// Delivery shift within a day. Ordering follows the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftName {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl ShiftName {
    pub const ALL: [ShiftName; 4] = [
        ShiftName::Morning,
        ShiftName::Afternoon,
        ShiftName::Evening,
        ShiftName::Night,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShiftName::Morning => "morning",
            ShiftName::Afternoon => "afternoon",
            ShiftName::Evening => "evening",
            ShiftName::Night => "night",
        }
    }
}

impl core::fmt::Display for ShiftName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ShiftName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ShiftName::ALL
            .into_iter()
            .find(|shift| shift.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::validation(format!("unknown shift '{s}'")))
    }
}

/// One (date, shift) slot of a logistics center's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShiftWindow {
    pub date: DateTime<Utc>,
    pub shift: ShiftName,
}

/// External shift calendar: which slots are coming up for a center.
///
/// The ledger only uses it to pick which stock documents to query.
pub trait ShiftWindowProvider: Send + Sync {
    fn next_shifts(
        &self,
        logistics_center_id: LogisticsCenterId,
        count: usize,
        from: DateTime<Utc>,
    ) -> DomainResult<Vec<ShiftWindow>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifts_order_through_the_day() {
        let mut shifts = vec![ShiftName::Night, ShiftName::Morning, ShiftName::Evening, ShiftName::Afternoon];
        shifts.sort();
        assert_eq!(shifts, ShiftName::ALL.to_vec());
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Evening".parse::<ShiftName>().unwrap(), ShiftName::Evening);
        assert!("brunch".parse::<ShiftName>().is_err());
    }
}
