//! CLI entry point for the traffic metrics engine.
//!
//! Loads station and hourly count CSVs, applies the requested filters and
//! prints one aggregation view as JSON or CSV.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use traffic_metrics::analyzers::annual::annual_averages;
use traffic_metrics::analyzers::benchmark::hierarchy_benchmark;
use traffic_metrics::analyzers::directional::directional_split;
use traffic_metrics::analyzers::heavy::{heavy_vehicle_profile, heavy_vehicle_share};
use traffic_metrics::analyzers::peak::{HourRange, peak_table};
use traffic_metrics::analyzers::profile::hourly_profile;
use traffic_metrics::analyzers::quality::station_quality;
use traffic_metrics::analyzers::trend::{daily_trend, seasonal_trend};
use traffic_metrics::analyzers::types::AnnualMetric;
use traffic_metrics::config::EngineConfig;
use traffic_metrics::daily::DailyTotalRule;
use traffic_metrics::filter::{
    GroupBy, RowFilter, StationField, StationFilter, distinct_values, suburbs_for_lgas,
};
use traffic_metrics::input::{load_hourly_counts, load_stations};
use traffic_metrics::model::{
    CardinalDirection, Classification, HourlyCountRow, StationIndex, TrafficDirection,
};
use traffic_metrics::output::{Table, write_csv, write_json};

#[derive(Parser)]
#[command(name = "traffic-metrics")]
#[command(about = "Aggregate hourly traffic counts into profiles, peaks and annual averages", long_about = None)]
struct Cli {
    #[command(flatten)]
    opts: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Station descriptor CSV (optionally .gz)
    #[arg(long, global = true, default_value = "stations.csv")]
    stations: PathBuf,

    /// Hourly count CSV (optionally .gz)
    #[arg(long, global = true, default_value = "hourly_counts.csv")]
    counts: PathBuf,

    /// JSON engine config; CLI overrides take precedence
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only these station keys (repeatable)
    #[arg(long = "station", global = true)]
    station_keys: Vec<i32>,

    /// First count date, inclusive (YYYY-MM-DD)
    #[arg(long, global = true)]
    from: Option<NaiveDate>,

    /// Last count date, inclusive (YYYY-MM-DD)
    #[arg(long, global = true)]
    to: Option<NaiveDate>,

    /// Traffic direction: prescribed, counter, both or a code
    #[arg(long, global = true)]
    direction: Option<TrafficDirection>,

    /// Vehicle classification: all, light, heavy, unclassified or a code
    #[arg(long, global = true)]
    classification: Option<Classification>,

    /// Only stations in this local government area (repeatable)
    #[arg(long, global = true)]
    lga: Vec<String>,

    /// Only stations with this road functional hierarchy (repeatable)
    #[arg(long, global = true)]
    hierarchy: Vec<String>,

    /// Only stations in this suburb (repeatable)
    #[arg(long, global = true)]
    suburb: Vec<String>,

    /// Only stations on this road, by road or common name (repeatable)
    #[arg(long, global = true)]
    road: Vec<String>,

    /// Only stations that do (true) or do not (false) classify vehicles
    #[arg(long, global = true)]
    classifier: Option<bool>,

    /// Only permanent (true) or temporary (false) stations
    #[arg(long, global = true)]
    permanent: Option<bool>,

    /// Only heavy-vehicle checking stations (true) or others (false)
    #[arg(long, global = true)]
    heavy_checking: Option<bool>,

    /// Only stations with at least this quality rating
    #[arg(long, global = true)]
    min_quality: Option<i32>,

    #[arg(long, global = true, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Output file; stdout when omitted
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// AM peak window, e.g. 6-9
    #[arg(long, global = true)]
    am_peak: Option<HourRange>,

    /// PM peak window, e.g. 15-18
    #[arg(long, global = true)]
    pm_peak: Option<HourRange>,

    /// Observed hours needed for a daily total (1-24)
    #[arg(long, global = true)]
    min_observed_hours: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
enum Field {
    Lga,
    Suburb,
    Road,
    Hierarchy,
}

impl From<Field> for StationField {
    fn from(field: Field) -> Self {
        match field {
            Field::Lga => StationField::Lga,
            Field::Suburb => StationField::Suburb,
            Field::Road => StationField::RoadName,
            Field::Hierarchy => StationField::Hierarchy,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Metric {
    Aadt,
    Aawt,
}

impl From<Metric> for AnnualMetric {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::Aadt => AnnualMetric::Aadt,
            Metric::Aawt => AnnualMetric::Aawt,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Mean volume per hour of day
    Profile {
        /// none, day-class, school-term, direction, cardinal, station, year, month, hierarchy
        #[arg(short, long, default_value = "none")]
        group_by: GroupBy,

        /// Log the busiest hour of each group
        #[arg(long, default_value_t = false)]
        busiest: bool,
    },
    /// Mean AM and PM peak-window volumes
    Peaks {
        #[arg(short, long, default_value = "none")]
        group_by: GroupBy,
    },
    /// AADT or AAWT per station and year
    Annual {
        #[arg(short, long, value_enum, default_value_t = Metric::Aadt)]
        metric: Metric,

        /// Only this year
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Heavy-vehicle share for one station
    Heavy {
        /// Share of the mean daily total instead of the hourly profile
        #[arg(long, default_value_t = false)]
        daily: bool,
    },
    /// Hourly and peak split between two cardinal directions
    Directional {
        #[arg(long, default_value = "north")]
        first: CardinalDirection,

        #[arg(long, default_value = "south")]
        second: CardinalDirection,
    },
    /// Per-station completeness and grade
    Quality,
    /// Mean daily total per date
    Trend,
    /// Mean daily total per month
    Seasonal,
    /// Mean annual average per road hierarchy
    Benchmark {
        #[arg(short, long)]
        year: i32,

        #[arg(short, long, value_enum, default_value_t = Metric::Aadt)]
        metric: Metric,
    },
    /// Distinct station attribute values; suburbs are limited to --lga when given
    Values {
        #[arg(value_enum)]
        field: Field,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/traffic_metrics.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("traffic_metrics.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    run(cli)
}

/// Config file (or defaults) with CLI overrides applied.
fn engine_config(opts: &CommonArgs) -> Result<EngineConfig> {
    let mut config = match &opts.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(hours) = opts.min_observed_hours {
        config.min_observed_hours = DailyTotalRule::new(hours)?;
    }
    if let Some(range) = opts.am_peak {
        config.am_peak = range;
    }
    if let Some(range) = opts.pm_peak {
        config.pm_peak = range;
    }
    Ok(config)
}

fn values(list: &[String]) -> Option<BTreeSet<String>> {
    (!list.is_empty()).then(|| list.iter().cloned().collect())
}

/// Station attribute criteria from the common options, if any were given.
fn station_filter(opts: &CommonArgs) -> Option<StationFilter> {
    let filter = StationFilter {
        lgas: values(&opts.lga),
        suburbs: values(&opts.suburb),
        road_names: values(&opts.road),
        hierarchies: values(&opts.hierarchy),
        vehicle_classifier: opts.classifier,
        permanent_station: opts.permanent,
        heavy_vehicle_checking_station: opts.heavy_checking,
        min_quality: opts.min_quality,
    };
    let any = filter.lgas.is_some()
        || filter.suburbs.is_some()
        || filter.road_names.is_some()
        || filter.hierarchies.is_some()
        || filter.vehicle_classifier.is_some()
        || filter.permanent_station.is_some()
        || filter.heavy_vehicle_checking_station.is_some()
        || filter.min_quality.is_some();
    any.then_some(filter)
}

/// Row filter from the common options, station attributes resolved to keys.
fn row_filter(opts: &CommonArgs, stations: &StationIndex) -> RowFilter {
    let mut filter = RowFilter::new();

    let mut keys: Option<BTreeSet<i32>> =
        (!opts.station_keys.is_empty()).then(|| opts.station_keys.iter().copied().collect());

    if let Some(station_filter) = station_filter(opts) {
        let selected = station_filter.select_keys(stations.iter());
        keys = Some(match keys {
            Some(explicit) => explicit.intersection(&selected).copied().collect(),
            None => selected,
        });
    }
    if let Some(keys) = keys {
        if keys.is_empty() {
            warn!("No station matches the station filters");
        }
        filter = filter.stations(keys);
    }

    match (opts.from, opts.to) {
        (Some(from), Some(to)) => filter = filter.between(from, to),
        (Some(from), None) => filter = filter.between(from, NaiveDate::MAX),
        (None, Some(to)) => filter = filter.between(NaiveDate::MIN, to),
        (None, None) => {}
    }
    if let Some(direction) = opts.direction {
        filter = filter.traffic_directions([direction]);
    }
    if let Some(class) = opts.classification {
        filter = filter.classification(class);
    }
    filter
}

fn warn_subset_class(opts: &CommonArgs) {
    if opts.classification.is_some_and(|c| c != Classification::All) {
        warn!("Trends use all-vehicle rows only; --classification selects nothing else");
    }
}

fn emit<T: Serialize + Table>(value: &T, opts: &CommonArgs) -> Result<()> {
    let path = opts.output.as_deref();
    match opts.format {
        Format::Json => write_json(value, path),
        Format::Csv => write_csv(value, path),
    }
}

#[tracing::instrument(skip_all, fields(command = tracing::field::Empty))]
fn run(cli: Cli) -> Result<()> {
    let opts = &cli.opts;
    let config = engine_config(opts).context("building engine config")?;
    let rule = *config.rule();

    let stations = load_stations(&opts.stations)?;

    // Selector lookups need station descriptors only
    if let Commands::Values { field } = &cli.command {
        tracing::Span::current().record("command", "values");
        let field = StationField::from(*field);
        let found = match (field, values(&opts.lga)) {
            (StationField::Suburb, Some(lgas)) => suburbs_for_lgas(stations.iter(), &lgas),
            _ => distinct_values(stations.iter(), field),
        };
        info!(%field, found = found.values.len(), "Distinct values");
        return emit(&found, opts);
    }

    let all_rows = load_hourly_counts(&opts.counts)?;
    let rows: Vec<&HourlyCountRow> = row_filter(opts, &stations).apply(&all_rows);

    info!(
        loaded = all_rows.len(),
        selected = rows.len(),
        min_observed_hours = rule.min_observed_hours(),
        am_peak = %config.am_peak,
        pm_peak = %config.pm_peak,
        "Rows selected"
    );

    match &cli.command {
        Commands::Profile { group_by, busiest } => {
            tracing::Span::current().record("command", "profile");
            let profile =
                hourly_profile(rows.iter().copied(), |r| group_by.key(r, &stations));
            if *busiest {
                for group in profile.groups() {
                    match profile.busiest_hour(group) {
                        Some((hour, mean)) => info!(%group, hour, mean, "Busiest hour"),
                        None => info!(%group, "No observed hours"),
                    }
                }
            }
            emit(&profile, opts)
        }
        Commands::Peaks { group_by } => {
            tracing::Span::current().record("command", "peaks");
            let table = peak_table(rows.iter().copied(), &config.peak_windows(), |r| {
                group_by.key(r, &stations)
            });
            emit(&table, opts)
        }
        Commands::Annual { metric, year } => {
            tracing::Span::current().record("command", "annual");
            let mut averages = annual_averages(rows.iter().copied(), (*metric).into(), &rule);
            if let Some(year) = year {
                averages.retain(|a| a.year == *year);
            }
            emit(&averages, opts)
        }
        Commands::Heavy { daily } => {
            tracing::Span::current().record("command", "heavy");
            if opts.station_keys.len() != 1 {
                warn!("Heavy-vehicle share is meant for a single --station");
            }
            for key in &opts.station_keys {
                if stations.get(*key).is_some_and(|s| !s.vehicle_classifier) {
                    warn!(station_key = key, "Station does not classify vehicles");
                }
            }
            if *daily {
                emit(&heavy_vehicle_share(rows.iter().copied(), &rule), opts)
            } else {
                emit(&heavy_vehicle_profile(rows.iter().copied()), opts)
            }
        }
        Commands::Directional { first, second } => {
            tracing::Span::current().record("command", "directional");
            let split =
                directional_split(rows.iter().copied(), *first, *second, &config.peak_windows());
            emit(&split, opts)
        }
        Commands::Quality => {
            tracing::Span::current().record("command", "quality");
            emit(&station_quality(rows.iter().copied(), &rule), opts)
        }
        Commands::Trend => {
            tracing::Span::current().record("command", "trend");
            warn_subset_class(opts);
            emit(&daily_trend(rows.iter().copied(), &rule), opts)
        }
        Commands::Seasonal => {
            tracing::Span::current().record("command", "seasonal");
            warn_subset_class(opts);
            emit(&seasonal_trend(rows.iter().copied(), &rule), opts)
        }
        Commands::Benchmark { year, metric } => {
            tracing::Span::current().record("command", "benchmark");
            let benchmark = hierarchy_benchmark(
                rows.iter().copied(),
                &stations,
                *year,
                (*metric).into(),
                &rule,
            );
            emit(&benchmark, opts)
        }
        // Answered before the counts were loaded
        Commands::Values { .. } => Ok(()),
    }
}
