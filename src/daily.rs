//! Daily total under the completeness threshold.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationFault, InsufficientData};
use crate::model::{HOURS_PER_DAY, HourlyCountRow};

pub const DEFAULT_MIN_OBSERVED_HOURS: usize = 19;

/// Minimum number of observed hours for a day to have a total.
///
/// The total is the sum of the observed hours only and replaces any
/// precomputed `daily_total` on the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct DailyTotalRule {
    min_observed_hours: usize,
}

impl DailyTotalRule {
    pub fn new(min_observed_hours: usize) -> Result<Self, ConfigurationFault> {
        if !(1..=HOURS_PER_DAY).contains(&min_observed_hours) {
            return Err(ConfigurationFault::ThresholdOutOfRange(min_observed_hours));
        }
        Ok(Self { min_observed_hours })
    }

    pub fn min_observed_hours(&self) -> usize {
        self.min_observed_hours
    }

    pub fn daily_total(
        &self,
        hours: &[Option<i64>; HOURS_PER_DAY],
    ) -> Result<i64, InsufficientData> {
        let observed = hours.iter().filter(|h| h.is_some()).count();
        if observed < self.min_observed_hours {
            return Err(InsufficientData::IncompleteDay {
                observed,
                required: self.min_observed_hours,
            });
        }
        Ok(saturating_sum(hours.iter().flatten()))
    }

    pub fn row_total(&self, row: &HourlyCountRow) -> Result<i64, InsufficientData> {
        self.daily_total(&row.hours)
    }
}

/// Sum of hourly volumes, clamped at `i64::MAX` instead of overflowing.
pub fn saturating_sum<'a>(volumes: impl IntoIterator<Item = &'a i64>) -> i64 {
    volumes
        .into_iter()
        .fold(0i64, |total, &v| total.saturating_add(v))
}

impl Default for DailyTotalRule {
    fn default() -> Self {
        Self {
            min_observed_hours: DEFAULT_MIN_OBSERVED_HOURS,
        }
    }
}

impl TryFrom<usize> for DailyTotalRule {
    type Error = ConfigurationFault;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DailyTotalRule> for usize {
    fn from(rule: DailyTotalRule) -> Self {
        rule.min_observed_hours
    }
}
