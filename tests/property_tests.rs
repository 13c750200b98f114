//! Property-based tests for the aggregation engine.
//!
//! These tests check invariants that hold for any structurally valid row
//! set, using randomly generated hourly volumes with gaps.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use traffic_metrics::analyzers::directional::directional_split;
use traffic_metrics::analyzers::heavy::heavy_vehicle_profile;
use traffic_metrics::analyzers::peak::{HourRange, PeakPeriod, PeakWindow, peak_volume};
use traffic_metrics::analyzers::profile::hourly_profile;
use traffic_metrics::daily::DailyTotalRule;
use traffic_metrics::error::InsufficientData;
use traffic_metrics::model::{
    CardinalDirection, Classification, HOURS_PER_DAY, HourlyCountRow, TrafficDirection,
};

type Hours = [Option<i64>; HOURS_PER_DAY];

/// 24 hourly volumes, each missing with roughly one-in-four probability.
fn hours_strategy() -> impl Strategy<Value = Hours> {
    prop::collection::vec(prop::option::weighted(0.75, 0i64..5000), HOURS_PER_DAY).prop_map(
        |v| {
            let mut hours = [None; HOURS_PER_DAY];
            hours.copy_from_slice(&v);
            hours
        },
    )
}

/// Consecutive days of rows for one station and class.
fn rows_from(
    days: &[Hours],
    class: Classification,
    cardinal: CardinalDirection,
) -> Vec<HourlyCountRow> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    days.iter()
        .enumerate()
        .map(|(i, hours)| {
            HourlyCountRow::new(1, start + Duration::days(i as i64), class, TrafficDirection::Both)
                .with_cardinal(cardinal)
                .with_hours(*hours)
        })
        .collect()
}

fn am() -> [PeakWindow; 1] {
    [PeakWindow {
        period: PeakPeriod::Am,
        hours: HourRange::AM_DEFAULT,
    }]
}

// =============================================================================
// Property: daily total follows the completeness threshold
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn daily_total_defined_iff_threshold_met(
        hours in hours_strategy(),
        threshold in 1usize..=24
    ) {
        let rule = DailyTotalRule::new(threshold).unwrap();
        let observed = hours.iter().flatten().count();
        let sum: i64 = hours.iter().flatten().sum();

        match rule.daily_total(&hours) {
            Ok(total) => {
                prop_assert!(observed >= threshold);
                prop_assert_eq!(total, sum);
            }
            Err(reason) => {
                prop_assert!(observed < threshold);
                prop_assert_eq!(
                    reason,
                    InsufficientData::IncompleteDay { observed, required: threshold }
                );
            }
        }
    }

    #[test]
    fn default_threshold_is_nineteen(hours in hours_strategy()) {
        let observed = hours.iter().flatten().count();
        let defined = DailyTotalRule::default().daily_total(&hours).is_ok();
        prop_assert_eq!(defined, observed >= 19);
    }
}

// =============================================================================
// Property: profile cells are no-data exactly where no row observed the hour
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn profile_no_data_matches_unobserved_hours(
        days in prop::collection::vec(hours_strategy(), 1..8)
    ) {
        let rows = rows_from(&days, Classification::All, CardinalDirection::North);
        let profile = hourly_profile(&rows, |_| ());

        prop_assert_eq!(profile.cells.len(), HOURS_PER_DAY);
        for cell in &profile.cells {
            let observed = days.iter().filter(|d| d[cell.hour].is_some()).count();
            prop_assert_eq!(cell.contributing_rows, observed);
            if observed == 0 {
                prop_assert_eq!(cell.mean.result(), Err(InsufficientData::NoData));
            } else {
                let mean = cell.mean.value().unwrap();
                prop_assert!(mean.is_finite() && mean >= 0.0);
            }
        }
    }

    #[test]
    fn recomputation_is_identical(
        days in prop::collection::vec(hours_strategy(), 1..8)
    ) {
        let rows = rows_from(&days, Classification::All, CardinalDirection::North);
        let first = hourly_profile(&rows, |r| r.day_of_week);
        let second = hourly_profile(&rows, |r| r.day_of_week);
        prop_assert_eq!(first, second);
    }
}

// =============================================================================
// Property: ratios never produce NaN or infinity
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn heavy_percent_is_finite_or_undefined(
        all in prop::collection::vec(hours_strategy(), 1..4),
        heavy in prop::collection::vec(hours_strategy(), 0..4)
    ) {
        let mut rows = rows_from(&all, Classification::All, CardinalDirection::North);
        rows.extend(rows_from(&heavy, Classification::Heavy, CardinalDirection::North));

        let profile = heavy_vehicle_profile(&rows);
        for hour in &profile.hours {
            if let Some(p) = hour.percent.value() {
                prop_assert!(p.is_finite());
            }
            if hour.all_mean.value() == Some(0.0) {
                prop_assert_eq!(hour.percent.result(), Err(InsufficientData::ZeroDenominator));
            }
        }
    }

    #[test]
    fn directional_shares_sum_to_hundred(
        north in prop::collection::vec(hours_strategy(), 1..4),
        south in prop::collection::vec(hours_strategy(), 1..4)
    ) {
        let mut rows = rows_from(&north, Classification::All, CardinalDirection::North);
        rows.extend(rows_from(&south, Classification::All, CardinalDirection::South));

        let split = directional_split(
            &rows,
            CardinalDirection::North,
            CardinalDirection::South,
            &am(),
        );
        for hour in &split.hourly {
            match (hour.first_share.value(), hour.second_share.value()) {
                (Some(a), Some(b)) => prop_assert!((a + b - 100.0).abs() < 1e-9),
                (None, None) => {}
                other => prop_assert!(false, "one-sided share {:?}", other),
            }
        }
    }
}

#[test]
fn am_peak_mean_of_row_sums() {
    let mut first = [Some(0); HOURS_PER_DAY];
    let mut second = [Some(0); HOURS_PER_DAY];
    for (i, h) in (6..=9).enumerate() {
        first[h] = Some([10, 20, 30, 40][i]);
        second[h] = Some([5, 15, 25, 35][i]);
    }
    let rows = rows_from(&[first, second], Classification::All, CardinalDirection::North);

    let peak = peak_volume(&rows, HourRange::AM_DEFAULT);
    assert_eq!(peak.mean.value(), Some(90.0));
    assert_eq!(peak.contributing_rows, 2);
}
