//! Daily and seasonal trends of the "all vehicles" daily total.
//!
//! Light and heavy subset rows are ignored so that a date's mean is never
//! diluted by partial classes counted on the same day.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use crate::analyzers::types::{DailyTrend, MonthlyPoint, SeasonalTrend, TrendPoint};
use crate::analyzers::utility::MeanAccumulator;
use crate::daily::DailyTotalRule;
use crate::filter::screen;
use crate::model::{Classification, HourlyCountRow};

#[derive(Default)]
struct Bucket {
    acc: MeanAccumulator,
    incomplete: usize,
}

fn bucket_totals<'a, K, I, F>(rows: I, rule: &DailyTotalRule, key: F) -> BTreeMap<K, Bucket>
where
    K: Ord,
    I: IntoIterator<Item = &'a HourlyCountRow>,
    F: Fn(&HourlyCountRow) -> K,
{
    let mut buckets: BTreeMap<K, Bucket> = BTreeMap::new();
    let mut other_classes = 0;
    for row in rows {
        if row.classification() != Some(Classification::All) {
            other_classes += 1;
            continue;
        }
        let bucket = buckets.entry(key(row)).or_default();
        match rule.row_total(row) {
            Ok(total) => bucket.acc.push(total as f64),
            Err(_) => bucket.incomplete += 1,
        }
    }
    if other_classes > 0 {
        debug!(other_classes, "Skipped rows that are not all-vehicle counts");
    }
    buckets
}

/// Mean daily total per date, oldest first.
pub fn daily_trend<'a, I>(rows: I, rule: &DailyTotalRule) -> DailyTrend
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    let screened = screen(rows);
    let points = bucket_totals(screened.rows, rule, |r| r.count_date)
        .into_iter()
        .map(|(date, b): (NaiveDate, Bucket)| TrendPoint {
            date,
            mean_daily_total: b.acc.measure(),
            complete_rows: b.acc.count(),
            incomplete_rows: b.incomplete,
        })
        .collect();

    DailyTrend {
        points,
        faults: screened.faults,
    }
}

/// Mean daily total per calendar month, oldest first.
pub fn seasonal_trend<'a, I>(rows: I, rule: &DailyTotalRule) -> SeasonalTrend
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    let screened = screen(rows);
    let points = bucket_totals(screened.rows, rule, |r| (r.year, r.month))
        .into_iter()
        .map(|((year, month), b)| MonthlyPoint {
            year,
            month,
            mean_daily_total: b.acc.measure(),
            complete_rows: b.acc.count(),
            incomplete_rows: b.incomplete,
        })
        .collect();

    SeasonalTrend {
        points,
        faults: screened.faults,
    }
}
