//! Output formatting for computed views.
//!
//! Supports pretty JSON (the full result, faults included) and flat CSV
//! tables. Undefined measures are written as empty CSV cells.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::analyzers::types::{
    AnnualAverage, DailyTrend, DirectionalSplit, Dominance, HeavyVehicleProfile,
    HeavyVehicleShare, HierarchyBenchmark, HourlyProfile, Measure, PeakTable, SeasonalTrend,
    StationQuality,
};
use crate::analyzers::utility::share;
use crate::error::DataIntegrityFault;
use crate::filter::DistinctValues;

/// A result that can be flattened into CSV rows.
pub trait Table {
    fn headers(&self) -> Vec<&'static str>;
    fn rows(&self) -> Vec<Vec<String>>;

    /// Rows excluded from the computation. CSV has no column for them.
    fn faults(&self) -> Vec<&DataIntegrityFault> {
        Vec::new()
    }
}

fn sink(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating output {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

/// Writes `value` as pretty-printed JSON to `path`, or stdout when `None`.
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let mut out = sink(path)?;
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    out.flush()?;
    if let Some(path) = path {
        info!(path = %path.display(), "JSON written");
    }
    Ok(())
}

/// Writes `table` as CSV with a header row to `path`, or stdout when `None`.
pub fn write_csv<T: Table>(table: &T, path: Option<&Path>) -> Result<()> {
    let rows = table.rows();
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(sink(path)?);

    writer.write_record(table.headers())?;
    for row in &rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    let faults = table.faults();
    for fault in &faults {
        warn!(
            station_key = fault.station_key,
            count_date = %fault.count_date,
            kind = %fault.kind,
            "Row excluded from CSV table"
        );
    }
    if !faults.is_empty() {
        warn!(
            faults = faults.len(),
            "Excluded rows are listed only in JSON output"
        );
    }

    debug!(rows = rows.len(), "CSV table written");
    if let Some(path) = path {
        info!(path = %path.display(), "CSV written");
    }
    Ok(())
}

fn measure(m: &Measure) -> String {
    m.value().map(|v| v.to_string()).unwrap_or_default()
}

fn hour(h: usize) -> String {
    format!("{h:02}")
}

impl<K: Display> Table for HourlyProfile<K> {
    fn headers(&self) -> Vec<&'static str> {
        vec!["group", "hour", "mean", "contributing_rows"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.cells
            .iter()
            .map(|c| {
                vec![
                    c.group.to_string(),
                    hour(c.hour),
                    measure(&c.mean),
                    c.contributing_rows.to_string(),
                ]
            })
            .collect()
    }

    fn faults(&self) -> Vec<&DataIntegrityFault> {
        self.faults.iter().collect()
    }
}

impl<K: Display> Table for PeakTable<K> {
    fn headers(&self) -> Vec<&'static str> {
        vec![
            "group",
            "period",
            "hours",
            "mean",
            "contributing_rows",
            "unobserved_rows",
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.cells
            .iter()
            .map(|c| {
                vec![
                    c.group.to_string(),
                    c.period.to_string(),
                    c.hours.to_string(),
                    measure(&c.mean),
                    c.contributing_rows.to_string(),
                    c.unobserved_rows.to_string(),
                ]
            })
            .collect()
    }

    fn faults(&self) -> Vec<&DataIntegrityFault> {
        self.faults.iter().collect()
    }
}

impl Table for Vec<AnnualAverage> {
    fn headers(&self) -> Vec<&'static str> {
        vec![
            "station_key",
            "year",
            "metric",
            "value",
            "qualifying_rows",
            "incomplete_rows",
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.iter()
            .map(|a| {
                vec![
                    a.station_key.to_string(),
                    a.year.to_string(),
                    a.metric.to_string(),
                    measure(&a.value),
                    a.qualifying_rows.to_string(),
                    a.incomplete_rows.to_string(),
                ]
            })
            .collect()
    }

    fn faults(&self) -> Vec<&DataIntegrityFault> {
        self.iter().flat_map(|a| a.faults.iter()).collect()
    }
}

impl Table for HeavyVehicleProfile {
    fn headers(&self) -> Vec<&'static str> {
        vec!["hour", "all_mean", "heavy_mean", "percent"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.hours
            .iter()
            .map(|h| {
                vec![
                    hour(h.hour),
                    measure(&h.all_mean),
                    measure(&h.heavy_mean),
                    measure(&h.percent),
                ]
            })
            .collect()
    }

    fn faults(&self) -> Vec<&DataIntegrityFault> {
        self.faults.iter().collect()
    }
}

impl Table for HeavyVehicleShare {
    fn headers(&self) -> Vec<&'static str> {
        vec![
            "all_daily_mean",
            "heavy_daily_mean",
            "percent",
            "all_days",
            "heavy_days",
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        vec![vec![
            measure(&self.all_daily_mean),
            measure(&self.heavy_daily_mean),
            measure(&self.percent),
            self.all_days.to_string(),
            self.heavy_days.to_string(),
        ]]
    }

    fn faults(&self) -> Vec<&DataIntegrityFault> {
        self.faults.iter().collect()
    }
}

/// Hourly rows `00`..`23` followed by one row per peak window.
impl Table for DirectionalSplit {
    fn headers(&self) -> Vec<&'static str> {
        vec![
            "slot",
            "first_direction",
            "second_direction",
            "first_volume",
            "second_volume",
            "first_share",
            "second_share",
            "dominant_direction",
            "dominant_share",
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let first = self.first.to_string();
        let second = self.second.to_string();

        let hourly = self.hourly.iter().map(|h| {
            vec![
                hour(h.hour),
                first.clone(),
                second.clone(),
                measure(&h.first_mean),
                measure(&h.second_mean),
                measure(&h.first_share),
                measure(&h.second_share),
                String::new(),
                String::new(),
            ]
        });

        let peaks = self.peaks.iter().map(|p| {
            let (dominant, dominant_share) = match p.dominance {
                Dominance::Dominant {
                    direction,
                    share_percent,
                } => (direction.to_string(), share_percent.to_string()),
                Dominance::Balanced => ("balanced".to_string(), String::new()),
                Dominance::Undetermined => ("undetermined".to_string(), String::new()),
            };
            vec![
                format!("{} {}", p.period, p.hours),
                first.clone(),
                second.clone(),
                measure(&p.first_peak),
                measure(&p.second_peak),
                measure(&share(p.first_peak, p.second_peak)),
                measure(&share(p.second_peak, p.first_peak)),
                dominant,
                dominant_share,
            ]
        });

        hourly.chain(peaks).collect()
    }

    fn faults(&self) -> Vec<&DataIntegrityFault> {
        self.faults.iter().collect()
    }
}

impl Table for Vec<StationQuality> {
    fn headers(&self) -> Vec<&'static str> {
        vec![
            "station_key",
            "total_rows",
            "faulted_rows",
            "complete_days",
            "incomplete_days",
            "completeness",
            "grade",
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.iter()
            .map(|q| {
                vec![
                    q.station_key.to_string(),
                    q.total_rows.to_string(),
                    q.faulted_rows.to_string(),
                    q.complete_days.to_string(),
                    q.incomplete_days.to_string(),
                    measure(&q.completeness),
                    q.grade.to_string(),
                ]
            })
            .collect()
    }
}

impl Table for DailyTrend {
    fn headers(&self) -> Vec<&'static str> {
        vec![
            "date",
            "mean_daily_total",
            "complete_rows",
            "incomplete_rows",
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.points
            .iter()
            .map(|p| {
                vec![
                    p.date.format("%Y-%m-%d").to_string(),
                    measure(&p.mean_daily_total),
                    p.complete_rows.to_string(),
                    p.incomplete_rows.to_string(),
                ]
            })
            .collect()
    }

    fn faults(&self) -> Vec<&DataIntegrityFault> {
        self.faults.iter().collect()
    }
}

impl Table for SeasonalTrend {
    fn headers(&self) -> Vec<&'static str> {
        vec![
            "year",
            "month",
            "mean_daily_total",
            "complete_rows",
            "incomplete_rows",
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.points
            .iter()
            .map(|p| {
                vec![
                    p.year.to_string(),
                    p.month.to_string(),
                    measure(&p.mean_daily_total),
                    p.complete_rows.to_string(),
                    p.incomplete_rows.to_string(),
                ]
            })
            .collect()
    }

    fn faults(&self) -> Vec<&DataIntegrityFault> {
        self.faults.iter().collect()
    }
}

impl Table for HierarchyBenchmark {
    fn headers(&self) -> Vec<&'static str> {
        vec![
            "year",
            "metric",
            "hierarchy",
            "stations",
            "defined_stations",
            "mean",
        ]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let metric = self.metric.to_string();
        self.hierarchies
            .iter()
            .map(|h| {
                vec![
                    self.year.to_string(),
                    metric.clone(),
                    h.hierarchy.clone(),
                    h.stations.to_string(),
                    h.defined_stations.to_string(),
                    measure(&h.mean),
                ]
            })
            .collect()
    }

    fn faults(&self) -> Vec<&DataIntegrityFault> {
        self.faults.iter().collect()
    }
}

impl Table for DistinctValues {
    fn headers(&self) -> Vec<&'static str> {
        vec!["field", "value"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.values
            .iter()
            .map(|v| vec![self.field.to_string(), v.clone()])
            .collect()
    }
}
