//! Ledger configuration.
//!
//! Values are read once at startup and injected into `StockLedger`; nothing
//! in the engine consults the process environment afterwards.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use farmstock_stock::EstimateDefaults;

use crate::retry::CasRetryPolicy;

const ENV_PREFIX: &str = "FARMSTOCK_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub cas_max_attempts: u32,
    pub cas_base_delay_ms: u64,
    pub cas_max_delay_ms: u64,
    pub cas_jitter: f64,
    /// Flip a line to `soldout` when a reservation drains it.
    pub auto_soldout: bool,
    /// Emit an info record for every committed adjustment.
    pub trace_adjustments: bool,
    pub default_z_score: f64,
    pub default_shrinkage_pct: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let estimate = EstimateDefaults::default();
        Self {
            cas_max_attempts: 5,
            cas_base_delay_ms: 2,
            cas_max_delay_ms: 50,
            cas_jitter: 0.5,
            auto_soldout: true,
            trace_adjustments: false,
            default_z_score: estimate.z_score,
            default_shrinkage_pct: estimate.shrinkage_pct,
        }
    }
}

impl LedgerConfig {
    /// Read `FARMSTOCK_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults and
    /// unparseable ones are reported and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let read = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name).map(|raw| (name, raw))
        };

        override_with(&mut config.cas_max_attempts, read("CAS_MAX_ATTEMPTS"));
        override_with(&mut config.cas_base_delay_ms, read("CAS_BASE_DELAY_MS"));
        override_with(&mut config.cas_max_delay_ms, read("CAS_MAX_DELAY_MS"));
        override_with(&mut config.cas_jitter, read("CAS_JITTER"));
        override_with(&mut config.auto_soldout, read("AUTO_SOLDOUT"));
        override_with(&mut config.trace_adjustments, read("TRACE_ADJUSTMENTS"));
        override_with(&mut config.default_z_score, read("DEFAULT_Z_SCORE"));
        override_with(&mut config.default_shrinkage_pct, read("DEFAULT_SHRINKAGE_PCT"));

        if config.cas_max_attempts == 0 {
            tracing::warn!("FARMSTOCK_CAS_MAX_ATTEMPTS must be at least 1, using 1");
            config.cas_max_attempts = 1;
        }
        if !(0.0..=1.0).contains(&config.cas_jitter) {
            tracing::warn!(jitter = config.cas_jitter, "FARMSTOCK_CAS_JITTER out of range, clamping");
            config.cas_jitter = config.cas_jitter.clamp(0.0, 1.0);
        }

        config
    }

    pub fn retry_policy(&self) -> CasRetryPolicy {
        CasRetryPolicy {
            max_attempts: self.cas_max_attempts.max(1),
            base_delay: Duration::from_millis(self.cas_base_delay_ms),
            max_delay: Duration::from_millis(self.cas_max_delay_ms.max(self.cas_base_delay_ms)),
            jitter: self.cas_jitter,
        }
    }

    pub fn estimate_defaults(&self) -> EstimateDefaults {
        EstimateDefaults {
            z_score: self.default_z_score,
            shrinkage_pct: self.default_shrinkage_pct,
        }
    }
}

fn override_with<T: FromStr>(slot: &mut T, entry: Option<(String, String)>) {
    let Some((name, raw)) = entry else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(variable = %name, value = %raw, "ignoring invalid configuration value"),
    }
}
