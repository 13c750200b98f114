//! Heavy-vehicle share of traffic.
//!
//! Inputs are expected to cover a single station and period, from a station
//! that classifies vehicles. Selecting such stations is the caller's job.

use std::collections::BTreeSet;
use tracing::warn;

use crate::analyzers::profile::hour_means;
use crate::analyzers::types::{HeavyVehicleHour, HeavyVehicleProfile, HeavyVehicleShare};
use crate::analyzers::utility::{MeanAccumulator, percent};
use crate::daily::DailyTotalRule;
use crate::filter::{Screened, screen};
use crate::model::{Classification, HourlyCountRow};

fn screen_single_station<'a, I>(rows: I) -> Screened<'a>
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    let screened = screen(rows);
    let stations: BTreeSet<i32> = screened.rows.iter().map(|r| r.station_key).collect();
    if stations.len() > 1 {
        warn!(
            stations = ?stations,
            "Heavy-vehicle ratio computed over more than one station"
        );
    }
    screened
}

fn subset<'a>(rows: &[&'a HourlyCountRow], class: Classification) -> Vec<&'a HourlyCountRow> {
    rows.iter()
        .copied()
        .filter(|r| r.classification() == Some(class))
        .collect()
}

/// Hourly heavy-vehicle percentage: mean heavy volume over mean all-vehicle volume.
pub fn heavy_vehicle_profile<'a, I>(rows: I) -> HeavyVehicleProfile
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    let screened = screen_single_station(rows);
    let all = hour_means(subset(&screened.rows, Classification::All));
    let heavy = hour_means(subset(&screened.rows, Classification::Heavy));

    let hours = all
        .iter()
        .zip(heavy.iter())
        .enumerate()
        .map(|(hour, ((all_mean, _), (heavy_mean, _)))| HeavyVehicleHour {
            hour,
            all_mean: *all_mean,
            heavy_mean: *heavy_mean,
            percent: percent(*heavy_mean, *all_mean),
        })
        .collect();

    HeavyVehicleProfile {
        hours,
        faults: screened.faults,
    }
}

/// Heavy-vehicle percentage of the mean daily total; incomplete days are excluded.
pub fn heavy_vehicle_share<'a, I>(rows: I, rule: &DailyTotalRule) -> HeavyVehicleShare
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    let screened = screen_single_station(rows);

    let daily_mean = |class: Classification| {
        let mut acc = MeanAccumulator::default();
        for row in subset(&screened.rows, class) {
            if let Ok(total) = rule.row_total(row) {
                acc.push(total as f64);
            }
        }
        acc
    };
    let all = daily_mean(Classification::All);
    let heavy = daily_mean(Classification::Heavy);

    HeavyVehicleShare {
        all_daily_mean: all.measure(),
        heavy_daily_mean: heavy.measure(),
        percent: percent(heavy.measure(), all.measure()),
        all_days: all.count(),
        heavy_days: heavy.count(),
        faults: screened.faults,
    }
}
