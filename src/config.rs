//! Engine parameters loaded from a JSON file.
//!
//! Every field is optional on disk and falls back to its default:
//! ```json
//! {
//!   "min_observed_hours": 19,
//!   "am_peak": { "start": 6, "end": 9 },
//!   "pm_peak": { "start": 15, "end": 18 }
//! }
//! ```
//! Out-of-range values are rejected while deserializing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::analyzers::peak::{HourRange, PeakPeriod, PeakWindow};
use crate::daily::DailyTotalRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub min_observed_hours: DailyTotalRule,
    pub am_peak: HourRange,
    pub pm_peak: HourRange,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_observed_hours: DailyTotalRule::default(),
            am_peak: HourRange::AM_DEFAULT,
            pm_peak: HourRange::PM_DEFAULT,
        }
    }
}

impl EngineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        debug!(?config, "Engine config loaded");
        Ok(config)
    }

    pub fn rule(&self) -> &DailyTotalRule {
        &self.min_observed_hours
    }

    /// The AM and PM windows, in that order.
    pub fn peak_windows(&self) -> [PeakWindow; 2] {
        [
            PeakWindow {
                period: PeakPeriod::Am,
                hours: self.am_peak,
            },
            PeakWindow {
                period: PeakPeriod::Pm,
                hours: self.pm_peak,
            },
        ]
    }
}
