use std::hash::Hash;
use tracing::debug;

use crate::analyzers::types::{HourlyProfile, Measure, ProfileCell};
use crate::analyzers::utility::MeanAccumulator;
use crate::filter::{partition, screen};
use crate::model::{HOURS_PER_DAY, HourlyCountRow};

/// Per-hour mean and contributor count over a set of screened rows.
///
/// Each row contributes to an hour only where that hour was observed.
pub(crate) fn hour_means<'a, I>(rows: I) -> [(Measure, usize); HOURS_PER_DAY]
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    let mut acc = [MeanAccumulator::default(); HOURS_PER_DAY];
    for row in rows {
        for (hour, volume) in row.hours.iter().enumerate() {
            if let Some(v) = volume {
                acc[hour].push(*v as f64);
            }
        }
    }
    acc.map(|a| (a.measure(), a.count()))
}

/// Averages hourly volumes per partition.
///
/// Every partition gets all 24 hours; an hour nobody observed is
/// [`InsufficientData::NoData`](crate::error::InsufficientData::NoData).
pub fn hourly_profile<'a, I, K, F>(rows: I, group: F) -> HourlyProfile<K>
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
    K: Eq + Hash + Clone,
    F: FnMut(&HourlyCountRow) -> K,
{
    let screened = screen(rows);
    let parts = partition(screened.rows, group);

    let mut cells = Vec::with_capacity(parts.len() * HOURS_PER_DAY);
    for (key, subset) in parts {
        debug!(rows = subset.len(), "Averaging hourly partition");
        for (hour, (mean, contributing_rows)) in hour_means(subset).into_iter().enumerate() {
            cells.push(ProfileCell {
                group: key.clone(),
                hour,
                mean,
                contributing_rows,
            });
        }
    }

    HourlyProfile {
        cells,
        faults: screened.faults,
    }
}

impl<K: PartialEq> HourlyProfile<K> {
    pub fn cell(&self, group: &K, hour: usize) -> Option<&ProfileCell<K>> {
        self.cells
            .iter()
            .find(|c| &c.group == group && c.hour == hour)
    }

    /// Partitions in output order.
    pub fn groups(&self) -> Vec<&K> {
        let mut groups: Vec<&K> = Vec::new();
        for cell in &self.cells {
            if !groups.contains(&&cell.group) {
                groups.push(&cell.group);
            }
        }
        groups
    }

    /// Hour with the greatest defined mean; the earliest hour wins ties.
    pub fn busiest_hour(&self, group: &K) -> Option<(usize, f64)> {
        self.cells
            .iter()
            .filter(|c| &c.group == group)
            .filter_map(|c| c.mean.value().map(|v| (c.hour, v)))
            .fold(None, |best, (hour, v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some((hour, v)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::DayClass;
    use crate::error::InsufficientData;
    use crate::model::{Classification, TrafficDirection};
    use chrono::NaiveDate;

    fn day_row(day: u32, hours: [Option<i64>; HOURS_PER_DAY]) -> HourlyCountRow {
        let date = NaiveDate::from_ymd_opt(2023, 5, day).unwrap();
        HourlyCountRow::new(1, date, Classification::All, TrafficDirection::Both).with_hours(hours)
    }

    #[test]
    fn test_rows_contribute_per_hour() {
        let mut a = [Some(10); HOURS_PER_DAY];
        a[7] = None;
        let b = [Some(20); HOURS_PER_DAY];
        let rows = vec![day_row(1, a), day_row(2, b)];

        let profile = hourly_profile(&rows, |_| ());
        let h7 = profile.cell(&(), 7).unwrap();
        let h8 = profile.cell(&(), 8).unwrap();

        assert_eq!(h7.mean.value(), Some(20.0));
        assert_eq!(h7.contributing_rows, 1);
        assert_eq!(h8.mean.value(), Some(15.0));
        assert_eq!(h8.contributing_rows, 2);
    }

    #[test]
    fn test_unobserved_hour_is_no_data_not_zero() {
        let mut hours = [Some(0); HOURS_PER_DAY];
        hours[3] = None;
        let rows = vec![day_row(1, hours)];

        let profile = hourly_profile(&rows, |_| ());
        assert_eq!(profile.cells.len(), HOURS_PER_DAY);
        assert_eq!(
            profile.cell(&(), 3).unwrap().mean,
            Measure::undefined(InsufficientData::NoData)
        );
        assert_eq!(profile.cell(&(), 4).unwrap().mean.value(), Some(0.0));
    }

    #[test]
    fn test_partition_by_day_class() {
        // 2023-05-01 Monday, 2023-05-06 Saturday
        let rows = vec![
            day_row(1, [Some(100); HOURS_PER_DAY]),
            day_row(6, [Some(40); HOURS_PER_DAY]),
        ];
        let profile = hourly_profile(&rows, |r| r.day_class().ok());

        assert_eq!(
            profile.groups(),
            vec![&Some(DayClass::Weekday), &Some(DayClass::Weekend)]
        );
        assert_eq!(
            profile.cell(&Some(DayClass::Weekend), 12).unwrap().mean.value(),
            Some(40.0)
        );
    }

    #[test]
    fn test_faulted_rows_are_reported() {
        let mut bad = day_row(1, [Some(10); HOURS_PER_DAY]);
        bad.hours[2] = Some(-1);
        let rows = vec![bad, day_row(2, [Some(10); HOURS_PER_DAY])];

        let profile = hourly_profile(&rows, |_| ());
        assert_eq!(profile.faults.len(), 1);
        assert_eq!(profile.cell(&(), 2).unwrap().contributing_rows, 1);
    }

    #[test]
    fn test_busiest_hour() {
        let mut hours = [Some(5); HOURS_PER_DAY];
        hours[8] = Some(90);
        hours[17] = Some(90);
        let rows = vec![day_row(1, hours)];

        let profile = hourly_profile(&rows, |_| ());
        assert_eq!(profile.busiest_hour(&()), Some((8, 90.0)));
    }

    #[test]
    fn test_empty_input_yields_empty_profile() {
        let rows: Vec<HourlyCountRow> = Vec::new();
        let profile = hourly_profile(&rows, |_| ());
        assert!(profile.cells.is_empty());
        assert_eq!(profile.busiest_hour(&()), None);
    }
}
