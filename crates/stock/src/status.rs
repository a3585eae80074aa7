//! Stock line lifecycle.
//!
//! ```text
//! active --(kg reaches 0, auto-soldout)--> soldout
//! active --(explicit, any kg)--> soldout      (operator pause)
//! soldout --(explicit, kg > 0)--> active
//! active/soldout --(explicit)--> removed      (terminal)
//! ```

use serde::{Deserialize, Serialize};

use farmstock_core::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStatus {
    Active,
    #[serde(rename = "soldout")]
    SoldOut,
    Removed,
}

impl LineStatus {
    pub fn is_terminal(self) -> bool {
        self == LineStatus::Removed
    }

    /// Validate an explicit transition.
    ///
    /// Returns `Ok(false)` when `to` equals the current status (nothing to do).
    pub fn check_transition(self, to: LineStatus, available_kg: f64) -> DomainResult<bool> {
        if self == to {
            return Ok(false);
        }
        match (self, to) {
            (LineStatus::Removed, _) => Err(DomainError::invariant("removed lines cannot change status")),
            (LineStatus::SoldOut, LineStatus::Active) if available_kg <= 0.0 => Err(
                DomainError::invariant("cannot reactivate a line with no available quantity"),
            ),
            _ => Ok(true),
        }
    }
}

impl core::fmt::Display for LineStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            LineStatus::Active => "active",
            LineStatus::SoldOut => "soldout",
            LineStatus::Removed => "removed",
        };
        f.write_str(s)
    }
}
