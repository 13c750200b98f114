//! Data types produced by the aggregation views.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::analyzers::peak::{HourRange, PeakPeriod};
use crate::error::{DataIntegrityFault, InsufficientData};
use crate::model::CardinalDirection;

/// A derived number, or the reason it could not be derived.
///
/// `Undefined` is never folded into zero: a measured zero is
/// `Defined { value: 0.0 }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Measure {
    Defined { value: f64 },
    Undefined { reason: InsufficientData },
}

impl Measure {
    pub fn defined(value: f64) -> Self {
        Measure::Defined { value }
    }

    pub fn undefined(reason: InsufficientData) -> Self {
        Measure::Undefined { reason }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Measure::Defined { value } => Some(*value),
            Measure::Undefined { .. } => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Measure::Defined { .. })
    }

    pub fn result(&self) -> Result<f64, InsufficientData> {
        match self {
            Measure::Defined { value } => Ok(*value),
            Measure::Undefined { reason } => Err(*reason),
        }
    }
}

/// Mean volume of one hour within one partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileCell<K> {
    pub group: K,
    pub hour: usize,
    pub mean: Measure,
    pub contributing_rows: usize,
}

/// 24 cells per partition, partitions in first-occurrence order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyProfile<K> {
    pub cells: Vec<ProfileCell<K>>,
    pub faults: Vec<DataIntegrityFault>,
}

/// Mean of per-row peak-window sums across a row set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakVolume {
    pub hours: HourRange,
    pub mean: Measure,
    pub contributing_rows: usize,
    /// Rows with no observed hour inside the window.
    pub unobserved_rows: usize,
    pub faults: Vec<DataIntegrityFault>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakCell<K> {
    pub group: K,
    pub period: PeakPeriod,
    pub hours: HourRange,
    pub mean: Measure,
    pub contributing_rows: usize,
    pub unobserved_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakTable<K> {
    pub cells: Vec<PeakCell<K>>,
    pub faults: Vec<DataIntegrityFault>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnnualMetric {
    /// Annual average daily traffic.
    Aadt,
    /// Average annual weekday traffic, public holidays excluded.
    Aawt,
}

impl fmt::Display for AnnualMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnualMetric::Aadt => f.write_str("AADT"),
            AnnualMetric::Aawt => f.write_str("AAWT"),
        }
    }
}

/// AADT or AAWT for one station and one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualAverage {
    pub station_key: i32,
    pub year: i32,
    pub metric: AnnualMetric,
    pub value: Measure,
    pub qualifying_rows: usize,
    /// Qualifying rows whose daily total was undefined.
    pub incomplete_rows: usize,
    pub faults: Vec<DataIntegrityFault>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeavyVehicleHour {
    pub hour: usize,
    pub all_mean: Measure,
    pub heavy_mean: Measure,
    pub percent: Measure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeavyVehicleProfile {
    pub hours: Vec<HeavyVehicleHour>,
    pub faults: Vec<DataIntegrityFault>,
}

/// Heavy-vehicle share of the mean daily total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeavyVehicleShare {
    pub all_daily_mean: Measure,
    pub heavy_daily_mean: Measure,
    pub percent: Measure,
    pub all_days: usize,
    pub heavy_days: usize,
    pub faults: Vec<DataIntegrityFault>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlySplit {
    pub hour: usize,
    pub first_mean: Measure,
    pub second_mean: Measure,
    pub first_share: Measure,
    pub second_share: Measure,
}

/// Which direction carries more of a peak window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Dominance {
    Dominant {
        direction: CardinalDirection,
        share_percent: f64,
    },
    /// Equal peak volumes; no direction dominates.
    Balanced,
    /// At least one side has no defined peak volume.
    Undetermined,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakSplit {
    pub period: PeakPeriod,
    pub hours: HourRange,
    pub first_peak: Measure,
    pub second_peak: Measure,
    pub dominance: Dominance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionalSplit {
    pub first: CardinalDirection,
    pub second: CardinalDirection,
    pub hourly: Vec<HourlySplit>,
    pub peaks: Vec<PeakSplit>,
    pub faults: Vec<DataIntegrityFault>,
}

/// Completeness of one station's count days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationQuality {
    pub station_key: i32,
    pub total_rows: usize,
    pub faulted_rows: usize,
    pub complete_days: usize,
    pub incomplete_days: usize,
    /// Complete days over valid rows, 0.0 to 1.0.
    pub completeness: Measure,
    pub grade: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub mean_daily_total: Measure,
    pub complete_rows: usize,
    pub incomplete_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTrend {
    pub points: Vec<TrendPoint>,
    pub faults: Vec<DataIntegrityFault>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    pub year: i32,
    pub month: u32,
    pub mean_daily_total: Measure,
    pub complete_rows: usize,
    pub incomplete_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalTrend {
    pub points: Vec<MonthlyPoint>,
    pub faults: Vec<DataIntegrityFault>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyAverage {
    pub hierarchy: String,
    pub stations: usize,
    /// Stations whose annual average was defined.
    pub defined_stations: usize,
    pub mean: Measure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyBenchmark {
    pub year: i32,
    pub metric: AnnualMetric,
    pub hierarchies: Vec<HierarchyAverage>,
    pub faults: Vec<DataIntegrityFault>,
}
