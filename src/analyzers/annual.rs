//! Annual averages (AADT / AAWT) per station and year.
//!
//! Both metrics average the daily totals of "all vehicles" rows. Days whose
//! total is undefined under the [`DailyTotalRule`] are left out of the mean
//! rather than counted as zero. Averaging across years is left to the caller.

use tracing::debug;

use crate::analyzers::types::{AnnualAverage, AnnualMetric};
use crate::analyzers::utility::MeanAccumulator;
use crate::calendar::DayClass;
use crate::daily::DailyTotalRule;
use crate::filter::{partition, screen};
use crate::model::{Classification, HourlyCountRow};

fn qualifies(row: &HourlyCountRow, metric: AnnualMetric) -> bool {
    if row.classification() != Some(Classification::All) {
        return false;
    }
    match metric {
        AnnualMetric::Aadt => true,
        AnnualMetric::Aawt => {
            !row.is_public_holiday && row.day_class() == Ok(DayClass::Weekday)
        }
    }
}

/// Computes `metric` for one station and year from any row set.
///
/// Rows for other stations or years are ignored; only the station/year rows
/// are screened, so their faults are the ones reported.
pub fn annual_average<'a, I>(
    rows: I,
    station_key: i32,
    year: i32,
    metric: AnnualMetric,
    rule: &DailyTotalRule,
) -> AnnualAverage
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    let screened = screen(
        rows.into_iter()
            .filter(|r| r.station_key == station_key && r.year == year),
    );

    let mut acc = MeanAccumulator::default();
    let mut qualifying_rows = 0;
    let mut incomplete_rows = 0;

    for row in screened.rows.iter().filter(|r| qualifies(r, metric)) {
        qualifying_rows += 1;
        match rule.row_total(row) {
            Ok(total) => acc.push(total as f64),
            Err(_) => incomplete_rows += 1,
        }
    }

    debug!(
        station_key,
        year,
        ?metric,
        qualifying_rows,
        incomplete_rows,
        "Annual average computed"
    );

    AnnualAverage {
        station_key,
        year,
        metric,
        value: acc.measure(),
        qualifying_rows,
        incomplete_rows,
        faults: screened.faults,
    }
}

/// Annual average daily traffic.
pub fn aadt<'a, I>(rows: I, station_key: i32, year: i32, rule: &DailyTotalRule) -> AnnualAverage
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    annual_average(rows, station_key, year, AnnualMetric::Aadt, rule)
}

/// Average annual weekday traffic; weekends and public holidays are excluded.
pub fn aawt<'a, I>(rows: I, station_key: i32, year: i32, rule: &DailyTotalRule) -> AnnualAverage
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    annual_average(rows, station_key, year, AnnualMetric::Aawt, rule)
}

/// One result per (station, year) present in `rows`, in first-occurrence order.
pub fn annual_averages<'a, I>(
    rows: I,
    metric: AnnualMetric,
    rule: &DailyTotalRule,
) -> Vec<AnnualAverage>
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    partition(rows, |r| (r.station_key, r.year))
        .into_iter()
        .map(|((station_key, year), subset)| {
            annual_average(subset, station_key, year, metric, rule)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InsufficientData;
    use crate::model::{HOURS_PER_DAY, TrafficDirection};
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// A row whose 24 hours sum to `total`, or an incomplete day when `None`.
    fn row_total(station: i32, date: NaiveDate, total: Option<i64>) -> HourlyCountRow {
        let mut hours = [None; HOURS_PER_DAY];
        match total {
            Some(t) => {
                hours = [Some(0); HOURS_PER_DAY];
                hours[0] = Some(t);
            }
            None => {
                for h in hours.iter_mut().take(10) {
                    *h = Some(50);
                }
            }
        }
        HourlyCountRow::new(station, date, Classification::All, TrafficDirection::Both)
            .with_hours(hours)
    }

    #[test]
    fn test_aadt_excludes_undefined_days() {
        // Four weekdays in March 2023
        let rows = vec![
            row_total(1, day(2023, 3, 6), Some(100)),
            row_total(1, day(2023, 3, 7), Some(150)),
            row_total(1, day(2023, 3, 8), None),
            row_total(1, day(2023, 3, 9), Some(200)),
        ];
        let result = aadt(&rows, 1, 2023, &DailyTotalRule::default());

        assert_eq!(result.value.value(), Some(150.0));
        assert_eq!(result.qualifying_rows, 4);
        assert_eq!(result.incomplete_rows, 1);
    }

    #[test]
    fn test_aadt_only_counts_all_vehicles() {
        let mut heavy = row_total(1, day(2023, 3, 6), Some(900));
        heavy.classification_seq = Classification::Heavy.code();
        let rows = vec![heavy, row_total(1, day(2023, 3, 7), Some(300))];

        let result = aadt(&rows, 1, 2023, &DailyTotalRule::default());
        assert_eq!(result.value.value(), Some(300.0));
        assert_eq!(result.qualifying_rows, 1);
    }

    #[test]
    fn test_aawt_excludes_weekends_and_public_holidays() {
        let rows = vec![
            row_total(1, day(2023, 3, 6), Some(100)),
            // Saturday
            row_total(1, day(2023, 3, 11), Some(1000)),
            // Public holiday on a Monday
            row_total(1, day(2023, 3, 13), Some(5000)).with_holidays(true, false),
            // School holidays still count
            row_total(1, day(2023, 3, 14), Some(300)).with_holidays(false, true),
        ];
        let rule = DailyTotalRule::default();

        assert_eq!(aawt(&rows, 1, 2023, &rule).value.value(), Some(200.0));
        assert_eq!(aadt(&rows, 1, 2023, &rule).value.value(), Some(1600.0));
    }

    #[test]
    fn test_no_qualifying_rows_is_undefined() {
        let rows = vec![row_total(1, day(2023, 3, 6), None)];
        let result = aadt(&rows, 1, 2023, &DailyTotalRule::default());
        assert_eq!(result.value.result(), Err(InsufficientData::NoData));

        let result = aadt(&rows, 1, 2022, &DailyTotalRule::default());
        assert_eq!(result.qualifying_rows, 0);
        assert!(!result.value.is_defined());
    }

    #[test]
    fn test_batch_is_per_station_and_year() {
        let rows = vec![
            row_total(2, day(2022, 12, 30), Some(80)),
            row_total(1, day(2023, 1, 2), Some(100)),
            row_total(2, day(2023, 1, 2), Some(60)),
            row_total(1, day(2023, 1, 3), Some(200)),
        ];
        let results = annual_averages(&rows, AnnualMetric::Aadt, &DailyTotalRule::default());

        let keys: Vec<_> = results.iter().map(|r| (r.station_key, r.year)).collect();
        assert_eq!(keys, vec![(2, 2022), (1, 2023), (2, 2023)]);
        assert_eq!(results[1].value.value(), Some(150.0));
    }

    #[test]
    fn test_faults_are_scoped_to_station_year() {
        let mut bad = row_total(9, day(2023, 3, 6), Some(100));
        bad.day_of_week = 0;
        let rows = vec![bad, row_total(1, day(2023, 3, 6), Some(100))];

        assert!(aadt(&rows, 1, 2023, &DailyTotalRule::default()).faults.is_empty());
        assert_eq!(aadt(&rows, 9, 2023, &DailyTotalRule::default()).faults.len(), 1);
    }
}
