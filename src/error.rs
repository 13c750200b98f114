//! Fault and error types shared by the aggregation engine.
//!
//! Nothing here is fatal. Structural faults exclude a row, insufficient data
//! yields an undefined measure, and configuration faults are raised where a
//! parameter is built.

use chrono::NaiveDate;
use serde::Serialize;

/// An engine parameter that cannot be used.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationFault {
    #[error("hour {0} is outside 0-23")]
    HourOutOfRange(u8),

    #[error("hour range {start}-{end} is inverted")]
    InvertedHourRange { start: u8, end: u8 },

    #[error("cannot parse hour range '{0}', expected START-END")]
    MalformedHourRange(String),

    #[error("completeness threshold {0} is outside 1-24")]
    ThresholdOutOfRange(usize),
}

/// Why a measure could not be computed.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsufficientData {
    #[error("{observed} of 24 hours observed, {required} required")]
    IncompleteDay { observed: usize, required: usize },

    #[error("no contributing rows")]
    NoData,

    #[error("no hour inside the peak window was observed")]
    WindowUnobserved,

    #[error("denominator is zero")]
    ZeroDenominator,
}

/// Structural invariant a count row violates.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FaultKind {
    #[error("day of week {day_of_week} is outside 1-7")]
    DayOfWeekOutOfRange { day_of_week: u32 },

    #[error("day of week {recorded} does not match the date (expected {actual})")]
    DayOfWeekMismatch { recorded: u32, actual: u32 },

    #[error("year/month {year}-{month} does not match the date")]
    CalendarMismatch { year: i32, month: u32 },

    #[error("negative volume {volume} at hour {hour}")]
    NegativeVolume { hour: usize, volume: i64 },

    #[error("unknown classification code {code}")]
    UnknownClassification { code: i32 },

    #[error("unknown traffic direction code {code}")]
    UnknownTrafficDirection { code: i32 },

    #[error("unknown cardinal direction code {code}")]
    UnknownCardinalDirection { code: i32 },
}

/// A row excluded from a computation, reported alongside the result.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("station {station_key} on {count_date}: {kind}")]
pub struct DataIntegrityFault {
    pub station_key: i32,
    pub count_date: NaiveDate,
    pub kind: FaultKind,
}

/// Reference data that cannot be indexed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StationFault {
    #[error("station key {0} appears more than once")]
    DuplicateKey(i32),

    #[error("station id '{0}' appears more than once")]
    DuplicateId(String),
}
