//! CSV adapter for station descriptors and hourly count rows.
//!
//! Column names follow the upstream extracts: `station_key`, `station_id`,
//! ..., `wgs84_latitude`, `wgs84_longitude` for stations and `station_key`,
//! `traffic_direction_seq`, ..., `date`, `hour_00` ... `hour_23`,
//! `daily_total` for counts. Empty cells are absent values. Paths ending in
//! `.gz` are decompressed on the fly.

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use flate2::read::GzDecoder;
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

use crate::calendar::iso_day_of_week;
use crate::model::{GeoPoint, HOURS_PER_DAY, HourlyCountRow, Station, StationIndex};

/// Accepts `true`/`false`, `1`/`0`, `t`/`f`, `yes`/`no` and `y`/`n` in any
/// case. An empty cell is `false`.
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "0.0" | "f" | "false" | "n" | "no" => Ok(false),
        "1" | "1.0" | "t" | "true" | "y" | "yes" => Ok(true),
        other => Err(serde::de::Error::custom(format!("invalid flag {other:?}"))),
    }
}

/// `YYYY-MM-DD`, optionally followed by a midnight time component.
fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map(|dt| dt.date())
        .with_context(|| format!("invalid date {raw:?}"))
}

/// Whole-number volume; exports sometimes write integers as `12.0`.
fn parse_volume(raw: &str) -> Result<Option<i64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(Some(v));
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(Some(v as i64)),
        _ => bail!("invalid volume {raw:?}"),
    }
}

fn open(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

#[derive(Debug, Deserialize)]
struct StationRecord {
    station_key: i32,
    station_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    road_name: String,
    full_name: Option<String>,
    common_road_name: Option<String>,
    lga: Option<String>,
    suburb: Option<String>,
    post_code: Option<String>,
    road_functional_hierarchy: Option<String>,
    lane_count: Option<String>,
    road_classification_type: Option<String>,
    device_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    permanent_station: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    vehicle_classifier: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    heavy_vehicle_checking_station: bool,
    quality_rating: Option<i32>,
    wgs84_latitude: Option<f64>,
    wgs84_longitude: Option<f64>,
}

impl From<StationRecord> for Station {
    fn from(r: StationRecord) -> Self {
        let location = match (r.wgs84_latitude, r.wgs84_longitude) {
            (Some(lat), Some(lon)) => {
                let point = GeoPoint::new(lat, lon);
                if point.is_none() {
                    warn!(
                        station_key = r.station_key,
                        latitude = lat,
                        longitude = lon,
                        "Station coordinates out of range, dropping location"
                    );
                }
                point
            }
            _ => None,
        };

        Station {
            station_key: r.station_key,
            station_id: r.station_id,
            name: r.name,
            road_name: r.road_name,
            full_name: r.full_name,
            common_road_name: r.common_road_name,
            lga: r.lga,
            suburb: r.suburb,
            post_code: r.post_code,
            road_functional_hierarchy: r.road_functional_hierarchy,
            lane_count: r.lane_count,
            road_classification_type: r.road_classification_type,
            device_type: r.device_type,
            permanent_station: r.permanent_station,
            vehicle_classifier: r.vehicle_classifier,
            heavy_vehicle_checking_station: r.heavy_vehicle_checking_station,
            quality_rating: r.quality_rating,
            location,
        }
    }
}

/// The non-hourly columns of a count row. Hours are read by position.
#[derive(Debug, Deserialize)]
struct CountRecord {
    station_key: i32,
    traffic_direction_seq: i32,
    cardinal_direction_seq: Option<i32>,
    classification_seq: i32,
    date: String,
    year: Option<i32>,
    month: Option<u32>,
    day_of_week: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    is_public_holiday: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    is_school_holiday: bool,
    daily_total: Option<String>,
}

/// Column index of `hour_00` ... `hour_23`; missing columns read as unmeasured.
fn hour_columns(headers: &StringRecord) -> [Option<usize>; HOURS_PER_DAY] {
    let mut columns = [None; HOURS_PER_DAY];
    for (hour, column) in columns.iter_mut().enumerate() {
        let name = format!("hour_{hour:02}");
        *column = headers.iter().position(|h| h.trim() == name);
    }
    columns
}

/// Reads station descriptors from CSV.
pub fn read_stations<R: Read>(reader: R) -> Result<Vec<Station>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut stations = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        let record: StationRecord =
            result.with_context(|| format!("station record {}", line + 1))?;
        stations.push(Station::from(record));
    }

    Ok(stations)
}

/// Reads hourly count rows from CSV.
///
/// `year`, `month` and `day_of_week` are derived from `date` when their
/// columns are absent or empty; values that are present are kept as
/// supplied so that inconsistent rows surface as faults downstream.
pub fn read_hourly_counts<R: Read>(reader: R) -> Result<Vec<HourlyCountRow>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let columns = hour_columns(&headers);
    if columns.iter().all(Option::is_none) {
        warn!("No hour_XX columns found; every row will be unmeasured");
    }

    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let context = || format!("count record {}", line + 1);
        let raw = result.with_context(context)?;
        let record: CountRecord = raw.deserialize(Some(&headers)).with_context(context)?;

        let count_date = parse_date(&record.date).with_context(context)?;
        let mut hours = [None; HOURS_PER_DAY];
        for (hour, &column) in columns.iter().enumerate() {
            if let Some(cell) = column.and_then(|c| raw.get(c)) {
                hours[hour] = parse_volume(cell)
                    .with_context(|| format!("{} hour_{hour:02}", context()))?;
            }
        }
        let daily_total = match record.daily_total.as_deref() {
            Some(cell) => parse_volume(cell).with_context(context)?,
            None => None,
        };

        rows.push(HourlyCountRow {
            station_key: record.station_key,
            traffic_direction_seq: record.traffic_direction_seq,
            cardinal_direction_seq: record.cardinal_direction_seq,
            classification_seq: record.classification_seq,
            count_date,
            year: record.year.unwrap_or_else(|| count_date.year()),
            month: record.month.unwrap_or_else(|| count_date.month()),
            day_of_week: record
                .day_of_week
                .unwrap_or_else(|| iso_day_of_week(count_date)),
            is_public_holiday: record.is_public_holiday,
            is_school_holiday: record.is_school_holiday,
            hours,
            daily_total,
        });
    }

    Ok(rows)
}

/// Loads and indexes the station file at `path`.
pub fn load_stations(path: impl AsRef<Path>) -> Result<StationIndex> {
    let path = path.as_ref();
    let stations = read_stations(open(path)?)
        .with_context(|| format!("reading stations from {}", path.display()))?;
    let index = StationIndex::from_stations(stations)
        .with_context(|| format!("indexing stations from {}", path.display()))?;
    info!(path = %path.display(), stations = index.len(), "Stations loaded");
    Ok(index)
}

/// Loads the hourly count file at `path`.
pub fn load_hourly_counts(path: impl AsRef<Path>) -> Result<Vec<HourlyCountRow>> {
    let path = path.as_ref();
    let rows = read_hourly_counts(open(path)?)
        .with_context(|| format!("reading hourly counts from {}", path.display()))?;
    info!(path = %path.display(), rows = rows.len(), "Hourly counts loaded");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardinalDirection, Classification};
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::env;
    use std::fs;
    use std::io::Write;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    const STATIONS: &str = "\
station_key,station_id,name,road_name,full_name,common_road_name,lga,suburb,post_code,road_functional_hierarchy,lane_count,road_classification_type,device_type,permanent_station,vehicle_classifier,heavy_vehicle_checking_station,quality_rating,wgs84_latitude,wgs84_longitude
1,T0001,Pacific Hwy,PACIFIC HIGHWAY,,Pacific Highway,Hornsby,Wahroonga,2076,Primary Road,4,Arterial,Loop,true,1,False,5,-33.72,151.12
2,T0002,Local St,SMITH ST,,,Parramatta,Parramatta,2150,,2,,Tube,0,f,no,,95.0,151.0
";

    fn counts_header() -> String {
        let hours: Vec<String> = (0..HOURS_PER_DAY).map(|h| format!("hour_{h:02}")).collect();
        format!(
            "station_key,traffic_direction_seq,cardinal_direction_seq,classification_seq,date,year,month,day_of_week,is_public_holiday,is_school_holiday,{},daily_total",
            hours.join(",")
        )
    }

    fn counts_line(prefix: &str, hours: &[&str], daily_total: &str) -> String {
        let mut cells: Vec<&str> = hours.to_vec();
        cells.resize(HOURS_PER_DAY, "");
        format!("{prefix},{},{daily_total}", cells.join(","))
    }

    #[test]
    fn test_read_stations() {
        let stations = read_stations(STATIONS.as_bytes()).unwrap();
        assert_eq!(stations.len(), 2);

        let s1 = &stations[0];
        assert_eq!(s1.station_id, "T0001");
        assert_eq!(s1.lga.as_deref(), Some("Hornsby"));
        assert_eq!(s1.full_name, None);
        assert!(s1.permanent_station);
        assert!(s1.vehicle_classifier);
        assert!(!s1.heavy_vehicle_checking_station);
        assert_eq!(s1.quality_rating, Some(5));
        assert!(s1.location.is_some());

        let s2 = &stations[1];
        assert!(!s2.vehicle_classifier);
        assert_eq!(s2.road_functional_hierarchy, None);
        // Latitude out of range
        assert_eq!(s2.location, None);
    }

    #[test]
    fn test_read_stations_rejects_bad_flag() {
        let csv = "station_key,station_id,permanent_station\n1,T1,maybe\n";
        assert!(read_stations(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_read_hourly_counts() {
        let csv = format!(
            "{}\n{}\n{}\n",
            counts_header(),
            counts_line(
                "1,1,1,1,2023-03-06,2023,3,1,false,true",
                &["10", "20.0", "", "30"],
                "60"
            ),
            counts_line("1,2,,3,2023-03-07 00:00:00,2023,3,2,0,0", &[], ""),
        );
        let rows = read_hourly_counts(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);

        let r = &rows[0];
        assert_eq!(r.count_date, NaiveDate::from_ymd_opt(2023, 3, 6).unwrap());
        assert_eq!(r.hours[0], Some(10));
        assert_eq!(r.hours[1], Some(20));
        assert_eq!(r.hours[2], None);
        assert_eq!(r.hours[3], Some(30));
        assert_eq!(r.observed_hours(), 3);
        assert_eq!(r.daily_total, Some(60));
        assert_eq!(r.cardinal_direction(), Some(CardinalDirection::North));
        assert!(r.is_school_holiday);
        assert!(r.check().is_ok());

        let r = &rows[1];
        assert_eq!(r.cardinal_direction_seq, None);
        assert_eq!(r.classification(), Some(Classification::Heavy));
        assert_eq!(r.observed_hours(), 0);
        assert_eq!(r.daily_total, None);
    }

    #[test]
    fn test_calendar_columns_are_optional() {
        let csv = "station_key,traffic_direction_seq,classification_seq,date,hour_08\n\
                   4,3,1,2023-12-25,77\n";
        let rows = read_hourly_counts(csv.as_bytes()).unwrap();
        let r = &rows[0];
        assert_eq!((r.year, r.month, r.day_of_week), (2023, 12, 1));
        assert_eq!(r.hours[8], Some(77));
        assert_eq!(r.observed_hours(), 1);
        assert!(r.check().is_ok());
    }

    #[test]
    fn test_supplied_calendar_columns_are_kept() {
        let csv = "station_key,traffic_direction_seq,classification_seq,date,day_of_week\n\
                   4,3,1,2023-12-25,9\n";
        let rows = read_hourly_counts(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].day_of_week, 9);
        assert!(rows[0].check().is_err());
    }

    #[test]
    fn test_invalid_volume_is_an_error() {
        let csv = "station_key,traffic_direction_seq,classification_seq,date,hour_00\n\
                   4,3,1,2023-12-25,lots\n";
        assert!(read_hourly_counts(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_load_gzip_counts() {
        let path = temp_path("traffic_metrics_test_counts.csv.gz");
        let _ = fs::remove_file(&path);

        let csv = format!(
            "{}\n{}\n",
            counts_header(),
            counts_line("7,3,,1,2024-01-02,2024,1,2,0,0", &["5"; 24], "120")
        );
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(csv.as_bytes()).unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let rows = load_hourly_counts(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].observed_hours(), 24);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_stations_rejects_duplicate_ids() {
        let path = temp_path("traffic_metrics_test_dup_stations.csv");
        fs::write(&path, "station_key,station_id\n1,T1\n2,T1\n").unwrap();

        assert!(load_stations(&path).is_err());

        fs::remove_file(&path).unwrap();
    }
}
