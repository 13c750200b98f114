use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::ops::RangeInclusive;
use std::str::FromStr;
use tracing::debug;

use crate::analyzers::types::{PeakCell, PeakTable, PeakVolume};
use crate::analyzers::utility::MeanAccumulator;
use crate::daily::saturating_sum;
use crate::error::{ConfigurationFault, InsufficientData};
use crate::filter::{partition, screen};
use crate::model::HourlyCountRow;

/// Inclusive range of hours of the day, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawHourRange", into = "RawHourRange")]
pub struct HourRange {
    start: u8,
    end: u8,
}

#[derive(Serialize, Deserialize)]
struct RawHourRange {
    start: u8,
    end: u8,
}

impl HourRange {
    /// 06:00 to 09:59.
    pub const AM_DEFAULT: HourRange = HourRange { start: 6, end: 9 };
    /// 15:00 to 18:59.
    pub const PM_DEFAULT: HourRange = HourRange { start: 15, end: 18 };

    pub fn new(start: u8, end: u8) -> Result<Self, ConfigurationFault> {
        if start > 23 {
            return Err(ConfigurationFault::HourOutOfRange(start));
        }
        if end > 23 {
            return Err(ConfigurationFault::HourOutOfRange(end));
        }
        if start > end {
            return Err(ConfigurationFault::InvertedHourRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn end(&self) -> u8 {
        self.end
    }

    pub fn hours(&self) -> RangeInclusive<usize> {
        self.start as usize..=self.end as usize
    }
}

impl TryFrom<RawHourRange> for HourRange {
    type Error = ConfigurationFault;

    fn try_from(raw: RawHourRange) -> Result<Self, Self::Error> {
        HourRange::new(raw.start, raw.end)
    }
}

impl From<HourRange> for RawHourRange {
    fn from(range: HourRange) -> Self {
        RawHourRange {
            start: range.start,
            end: range.end,
        }
    }
}

impl FromStr for HourRange {
    type Err = ConfigurationFault;

    /// Parses `START-END`, e.g. `6-9`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ConfigurationFault::MalformedHourRange(s.to_string());
        let (start, end) = s.trim().split_once('-').ok_or_else(malformed)?;
        let start = start.trim().parse::<u8>().map_err(|_| malformed())?;
        let end = end.trim().parse::<u8>().map_err(|_| malformed())?;
        HourRange::new(start, end)
    }
}

impl fmt::Display for HourRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PeakPeriod {
    Am,
    Pm,
}

impl fmt::Display for PeakPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeakPeriod::Am => f.write_str("AM"),
            PeakPeriod::Pm => f.write_str("PM"),
        }
    }
}

/// A named peak period and the hours it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeakWindow {
    pub period: PeakPeriod,
    pub hours: HourRange,
}

/// Sum of the observed hours inside `window`.
pub fn row_peak_sum(row: &HourlyCountRow, window: HourRange) -> Result<i64, InsufficientData> {
    let mut observed = row.hours[window.hours()].iter().flatten().peekable();
    if observed.peek().is_none() {
        return Err(InsufficientData::WindowUnobserved);
    }
    Ok(saturating_sum(observed))
}

fn accumulate<'a, I>(rows: I, window: HourRange) -> (MeanAccumulator, usize)
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    let mut acc = MeanAccumulator::default();
    let mut unobserved = 0;
    for row in rows {
        match row_peak_sum(row, window) {
            Ok(sum) => acc.push(sum as f64),
            Err(_) => unobserved += 1,
        }
    }
    (acc, unobserved)
}

/// Mean per-row peak sum over `rows`; rows with an unobserved window are skipped.
pub fn peak_volume<'a, I>(rows: I, window: HourRange) -> PeakVolume
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    let screened = screen(rows);
    let (acc, unobserved_rows) = accumulate(screened.rows, window);

    PeakVolume {
        hours: window,
        mean: acc.measure(),
        contributing_rows: acc.count(),
        unobserved_rows,
        faults: screened.faults,
    }
}

/// Peak volumes for each window within each partition.
pub fn peak_table<'a, I, K, F>(rows: I, windows: &[PeakWindow], group: F) -> PeakTable<K>
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
    K: Eq + Hash + Clone,
    F: FnMut(&HourlyCountRow) -> K,
{
    let screened = screen(rows);
    let parts = partition(screened.rows, group);

    let mut cells = Vec::with_capacity(parts.len() * windows.len());
    for (key, subset) in parts.iter() {
        for window in windows {
            let (acc, unobserved_rows) = accumulate(subset.iter().copied(), window.hours);
            debug!(
                period = %window.period,
                hours = %window.hours,
                contributing = acc.count(),
                unobserved_rows,
                "Peak window aggregated"
            );
            cells.push(PeakCell {
                group: key.clone(),
                period: window.period,
                hours: window.hours,
                mean: acc.measure(),
                contributing_rows: acc.count(),
                unobserved_rows,
            });
        }
    }

    PeakTable {
        cells,
        faults: screened.faults,
    }
}
