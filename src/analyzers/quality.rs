use tracing::info;

use crate::analyzers::grade::completeness_grade;
use crate::analyzers::types::{Measure, StationQuality};
use crate::daily::DailyTotalRule;
use crate::error::InsufficientData;
use crate::filter::{partition, screen};
use crate::model::HourlyCountRow;

/// Per-station share of count days that meet the completeness threshold.
///
/// Structurally faulty rows are counted separately and left out of the
/// ratio. A station with no valid rows has undefined completeness and an F.
pub fn station_quality<'a, I>(rows: I, rule: &DailyTotalRule) -> Vec<StationQuality>
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    let report: Vec<StationQuality> = partition(rows, |r| r.station_key)
        .into_iter()
        .map(|(station_key, subset)| {
            let total_rows = subset.len();
            let screened = screen(subset);

            let complete_days = screened
                .rows
                .iter()
                .filter(|r| rule.row_total(r).is_ok())
                .count();
            let incomplete_days = screened.rows.len() - complete_days;

            let completeness = if screened.rows.is_empty() {
                Measure::undefined(InsufficientData::NoData)
            } else {
                Measure::defined(complete_days as f64 / screened.rows.len() as f64)
            };
            let grade = completeness.value().map_or("F", completeness_grade);

            StationQuality {
                station_key,
                total_rows,
                faulted_rows: screened.faults.len(),
                complete_days,
                incomplete_days,
                completeness,
                grade,
            }
        })
        .collect();

    info!(stations = report.len(), "Data quality overview computed");
    report
}
