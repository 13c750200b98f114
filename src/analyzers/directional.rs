use tracing::debug;

use crate::analyzers::peak::{PeakWindow, peak_volume};
use crate::analyzers::profile::hour_means;
use crate::analyzers::types::{DirectionalSplit, Dominance, HourlySplit, Measure, PeakSplit};
use crate::analyzers::utility::share;
use crate::filter::{RowFilter, screen};
use crate::model::{CardinalDirection, HourlyCountRow};

fn dominance(
    first: (CardinalDirection, Measure),
    second: (CardinalDirection, Measure),
) -> Dominance {
    let (a, b) = match (first.1.value(), second.1.value()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Dominance::Undetermined,
    };
    if a == b {
        return Dominance::Balanced;
    }

    let (direction, larger) = if a > b { (first.0, a) } else { (second.0, b) };
    Dominance::Dominant {
        direction,
        share_percent: larger / (a + b) * 100.0,
    }
}

/// Hourly shares and peak dominance between two directions of one
/// station, period and vehicle class.
///
/// `rows` is screened once as a whole, so a row whose cardinal code cannot
/// be decoded is reported in `faults` instead of falling out of both sides.
pub fn directional_split<'a, I>(
    rows: I,
    first: CardinalDirection,
    second: CardinalDirection,
    windows: &[PeakWindow],
) -> DirectionalSplit
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    let screened = screen(rows);
    let a = RowFilter::new()
        .cardinal_directions([first])
        .apply(screened.rows.iter().copied());
    let b = RowFilter::new()
        .cardinal_directions([second])
        .apply(screened.rows.iter().copied());

    let a_means = hour_means(a.iter().copied());
    let b_means = hour_means(b.iter().copied());

    let hourly = (0..a_means.len())
        .map(|hour| {
            let first_mean = a_means[hour].0;
            let second_mean = b_means[hour].0;
            HourlySplit {
                hour,
                first_mean,
                second_mean,
                first_share: share(first_mean, second_mean),
                second_share: share(second_mean, first_mean),
            }
        })
        .collect();

    let peaks = windows
        .iter()
        .map(|window| {
            let first_peak = peak_volume(a.iter().copied(), window.hours).mean;
            let second_peak = peak_volume(b.iter().copied(), window.hours).mean;
            let dominance = dominance((first, first_peak), (second, second_peak));
            debug!(period = %window.period, ?dominance, "Peak dominance");
            PeakSplit {
                period: window.period,
                hours: window.hours,
                first_peak,
                second_peak,
                dominance,
            }
        })
        .collect();

    DirectionalSplit {
        first,
        second,
        hourly,
        peaks,
        faults: screened.faults,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::peak::{HourRange, PeakPeriod};
    use crate::error::{FaultKind, InsufficientData};
    use crate::model::{Classification, HOURS_PER_DAY, TrafficDirection};
    use chrono::NaiveDate;

    fn row(direction: CardinalDirection, am_hour_volume: i64, other: i64) -> HourlyCountRow {
        let date = NaiveDate::from_ymd_opt(2023, 9, 4).unwrap();
        let mut hours = [Some(other); HOURS_PER_DAY];
        for h in 6..=9 {
            hours[h] = Some(am_hour_volume);
        }
        HourlyCountRow::new(2, date, Classification::All, TrafficDirection::Prescribed)
            .with_cardinal(direction)
            .with_hours(hours)
    }

    fn am() -> [PeakWindow; 1] {
        [PeakWindow {
            period: PeakPeriod::Am,
            hours: HourRange::AM_DEFAULT,
        }]
    }

    #[test]
    fn test_hourly_share() {
        let rows = vec![
            row(CardinalDirection::North, 300, 30),
            row(CardinalDirection::South, 100, 10),
        ];
        let split = directional_split(
            &rows,
            CardinalDirection::North,
            CardinalDirection::South,
            &am(),
        );

        assert_eq!(split.hourly[7].first_share.value(), Some(75.0));
        assert_eq!(split.hourly[7].second_share.value(), Some(25.0));
        assert_eq!(split.hourly[0].first_share.value(), Some(75.0));
    }

    #[test]
    fn test_dominant_direction() {
        let rows = vec![
            row(CardinalDirection::East, 300, 0),
            row(CardinalDirection::West, 100, 0),
        ];
        let split = directional_split(
            &rows,
            CardinalDirection::East,
            CardinalDirection::West,
            &am(),
        );

        assert_eq!(split.peaks[0].first_peak.value(), Some(1200.0));
        assert_eq!(
            split.peaks[0].dominance,
            Dominance::Dominant {
                direction: CardinalDirection::East,
                share_percent: 75.0
            }
        );
    }

    #[test]
    fn test_equal_peaks_have_no_dominant_direction() {
        // Both directions sum to 500 in the AM window
        let rows = vec![
            row(CardinalDirection::North, 125, 7),
            row(CardinalDirection::South, 125, 3),
        ];
        let split = directional_split(
            &rows,
            CardinalDirection::North,
            CardinalDirection::South,
            &am(),
        );

        assert_eq!(split.peaks[0].first_peak.value(), Some(500.0));
        assert_eq!(split.peaks[0].second_peak.value(), Some(500.0));
        assert_eq!(split.peaks[0].dominance, Dominance::Balanced);
    }

    #[test]
    fn test_zero_volume_hours_are_undefined() {
        let rows = vec![
            row(CardinalDirection::North, 10, 0),
            row(CardinalDirection::South, 10, 0),
        ];
        let split = directional_split(
            &rows,
            CardinalDirection::North,
            CardinalDirection::South,
            &am(),
        );

        assert_eq!(
            split.hourly[0].first_share.result(),
            Err(InsufficientData::ZeroDenominator)
        );
        assert_eq!(split.hourly[7].first_share.value(), Some(50.0));
    }

    #[test]
    fn test_missing_direction_is_undetermined() {
        let rows = vec![row(CardinalDirection::North, 10, 0)];
        let split = directional_split(
            &rows,
            CardinalDirection::North,
            CardinalDirection::South,
            &am(),
        );

        assert_eq!(split.peaks[0].dominance, Dominance::Undetermined);
        assert_eq!(
            split.hourly[7].first_share.result(),
            Err(InsufficientData::NoData)
        );
    }

    #[test]
    fn test_undecodable_rows_are_reported() {
        let mut unknown_cardinal = row(CardinalDirection::North, 50, 5);
        unknown_cardinal.cardinal_direction_seq = Some(2);
        let mut unknown_class = row(CardinalDirection::South, 50, 5);
        unknown_class.classification_seq = 7;
        let rows = vec![
            row(CardinalDirection::North, 10, 1),
            unknown_cardinal,
            unknown_class,
        ];

        let split = directional_split(
            &rows,
            CardinalDirection::North,
            CardinalDirection::South,
            &am(),
        );

        let kinds: Vec<_> = split.faults.iter().map(|f| f.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                FaultKind::UnknownCardinalDirection { code: 2 },
                FaultKind::UnknownClassification { code: 7 },
            ]
        );
        assert_eq!(split.peaks[0].first_peak.value(), Some(40.0));
        assert_eq!(split.peaks[0].dominance, Dominance::Undetermined);
    }
}
