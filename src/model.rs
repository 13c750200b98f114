//! Station and hourly-count records as handed over by the data-access layer.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::calendar::iso_day_of_week;
use crate::error::{FaultKind, StationFault};

pub const HOURS_PER_DAY: usize = 24;

/// Vehicle category of a count row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Unclassified,
    All,
    Light,
    Heavy,
}

impl Classification {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Unclassified),
            1 => Some(Self::All),
            2 => Some(Self::Light),
            3 => Some(Self::Heavy),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Unclassified => 0,
            Self::All => 1,
            Self::Light => 2,
            Self::Heavy => 3,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unclassified => "Unclassified",
            Self::All => "All vehicles",
            Self::Light => "Light vehicles",
            Self::Heavy => "Heavy vehicles",
        };
        f.write_str(label)
    }
}

impl FromStr for Classification {
    type Err = String;

    /// Accepts the lowercase name or the numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let parsed = match s.as_str() {
            "unclassified" => Some(Self::Unclassified),
            "all" => Some(Self::All),
            "light" => Some(Self::Light),
            "heavy" => Some(Self::Heavy),
            code => code.parse().ok().and_then(Self::from_code),
        };
        parsed.ok_or_else(|| format!("unknown classification '{s}'"))
    }
}

/// Direction of travel relative to the station's prescribed direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficDirection {
    Prescribed,
    Counter,
    Both,
}

impl TrafficDirection {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Prescribed),
            2 => Some(Self::Counter),
            3 => Some(Self::Both),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Prescribed => 1,
            Self::Counter => 2,
            Self::Both => 3,
        }
    }
}

impl fmt::Display for TrafficDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Prescribed => "Prescribed direction",
            Self::Counter => "Counter direction",
            Self::Both => "Both directions",
        };
        f.write_str(label)
    }
}

impl FromStr for TrafficDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let parsed = match s.as_str() {
            "prescribed" => Some(Self::Prescribed),
            "counter" => Some(Self::Counter),
            "both" => Some(Self::Both),
            code => code.parse().ok().and_then(Self::from_code),
        };
        parsed.ok_or_else(|| format!("unknown traffic direction '{s}'"))
    }
}

/// Compass heading of a counted lane group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardinalDirection {
    North,
    East,
    South,
    West,
    NorthSouth,
    EastWest,
}

impl CardinalDirection {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::North),
            3 => Some(Self::East),
            5 => Some(Self::South),
            7 => Some(Self::West),
            9 => Some(Self::NorthSouth),
            10 => Some(Self::EastWest),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::North => 1,
            Self::East => 3,
            Self::South => 5,
            Self::West => 7,
            Self::NorthSouth => 9,
            Self::EastWest => 10,
        }
    }
}

impl fmt::Display for CardinalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::North => "Northbound",
            Self::East => "Eastbound",
            Self::South => "Southbound",
            Self::West => "Westbound",
            Self::NorthSouth => "North and southbound",
            Self::EastWest => "East and westbound",
        };
        f.write_str(label)
    }
}

impl FromStr for CardinalDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let parsed = match s.as_str() {
            "n" | "north" | "northbound" => Some(Self::North),
            "e" | "east" | "eastbound" => Some(Self::East),
            "s" | "south" | "southbound" => Some(Self::South),
            "w" | "west" | "westbound" => Some(Self::West),
            "ns" | "north-south" => Some(Self::NorthSouth),
            "ew" | "east-west" => Some(Self::EastWest),
            code => code.parse().ok().and_then(Self::from_code),
        };
        parsed.ok_or_else(|| format!("unknown cardinal direction '{s}'"))
    }
}

/// WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Returns `None` unless both coordinates are finite and in range.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

/// Static descriptor of a counting station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub station_key: i32,
    pub station_id: String,
    pub name: String,
    pub road_name: String,
    pub full_name: Option<String>,
    pub common_road_name: Option<String>,
    pub lga: Option<String>,
    pub suburb: Option<String>,
    pub post_code: Option<String>,
    pub road_functional_hierarchy: Option<String>,
    pub lane_count: Option<String>,
    pub road_classification_type: Option<String>,
    pub device_type: Option<String>,
    pub permanent_station: bool,
    pub vehicle_classifier: bool,
    pub heavy_vehicle_checking_station: bool,
    pub quality_rating: Option<i32>,
    pub location: Option<GeoPoint>,
}

impl Station {
    /// A station with only its identifiers set.
    pub fn new(station_key: i32, station_id: impl Into<String>) -> Self {
        Self {
            station_key,
            station_id: station_id.into(),
            name: String::new(),
            road_name: String::new(),
            full_name: None,
            common_road_name: None,
            lga: None,
            suburb: None,
            post_code: None,
            road_functional_hierarchy: None,
            lane_count: None,
            road_classification_type: None,
            device_type: None,
            permanent_station: false,
            vehicle_classifier: false,
            heavy_vehicle_checking_station: false,
            quality_rating: None,
            location: None,
        }
    }
}

/// Stations keyed by surrogate key, with unique public identifiers.
#[derive(Debug, Clone, Default)]
pub struct StationIndex {
    by_key: HashMap<i32, Station>,
    order: Vec<i32>,
}

impl StationIndex {
    pub fn from_stations(
        stations: impl IntoIterator<Item = Station>,
    ) -> Result<Self, StationFault> {
        let mut index = Self::default();
        let mut ids = HashSet::new();

        for station in stations {
            if index.by_key.contains_key(&station.station_key) {
                return Err(StationFault::DuplicateKey(station.station_key));
            }
            if !ids.insert(station.station_id.clone()) {
                return Err(StationFault::DuplicateId(station.station_id));
            }
            index.order.push(station.station_key);
            index.by_key.insert(station.station_key, station);
        }

        Ok(index)
    }

    pub fn get(&self, station_key: i32) -> Option<&Station> {
        self.by_key.get(&station_key)
    }

    pub fn hierarchy(&self, station_key: i32) -> Option<&str> {
        self.get(station_key)
            .and_then(|s| s.road_functional_hierarchy.as_deref())
    }

    /// Stations in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.order.iter().filter_map(|key| self.by_key.get(key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// One day of hourly volumes for a station, direction and vehicle class.
///
/// Codes are kept as supplied; [`HourlyCountRow::check`] reports the first
/// structural invariant the row breaks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyCountRow {
    pub station_key: i32,
    pub traffic_direction_seq: i32,
    pub cardinal_direction_seq: Option<i32>,
    pub classification_seq: i32,
    pub count_date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub day_of_week: u32,
    pub is_public_holiday: bool,
    pub is_school_holiday: bool,
    /// `None` means the hour was not measured.
    pub hours: [Option<i64>; HOURS_PER_DAY],
    pub daily_total: Option<i64>,
}

impl HourlyCountRow {
    /// An unmeasured day with calendar fields derived from `count_date`.
    pub fn new(
        station_key: i32,
        count_date: NaiveDate,
        classification: Classification,
        direction: TrafficDirection,
    ) -> Self {
        Self {
            station_key,
            traffic_direction_seq: direction.code(),
            cardinal_direction_seq: None,
            classification_seq: classification.code(),
            count_date,
            year: count_date.year(),
            month: count_date.month(),
            day_of_week: iso_day_of_week(count_date),
            is_public_holiday: false,
            is_school_holiday: false,
            hours: [None; HOURS_PER_DAY],
            daily_total: None,
        }
    }

    pub fn with_hours(mut self, hours: [Option<i64>; HOURS_PER_DAY]) -> Self {
        self.hours = hours;
        self
    }

    pub fn with_cardinal(mut self, direction: CardinalDirection) -> Self {
        self.cardinal_direction_seq = Some(direction.code());
        self
    }

    pub fn with_holidays(mut self, public_holiday: bool, school_holiday: bool) -> Self {
        self.is_public_holiday = public_holiday;
        self.is_school_holiday = school_holiday;
        self
    }

    pub fn classification(&self) -> Option<Classification> {
        Classification::from_code(self.classification_seq)
    }

    pub fn traffic_direction(&self) -> Option<TrafficDirection> {
        TrafficDirection::from_code(self.traffic_direction_seq)
    }

    pub fn cardinal_direction(&self) -> Option<CardinalDirection> {
        self.cardinal_direction_seq
            .and_then(CardinalDirection::from_code)
    }

    pub fn observed_hours(&self) -> usize {
        self.hours.iter().filter(|h| h.is_some()).count()
    }

    pub fn check(&self) -> Result<(), FaultKind> {
        if !(1..=7).contains(&self.day_of_week) {
            return Err(FaultKind::DayOfWeekOutOfRange {
                day_of_week: self.day_of_week,
            });
        }

        let actual = iso_day_of_week(self.count_date);
        if self.day_of_week != actual {
            return Err(FaultKind::DayOfWeekMismatch {
                recorded: self.day_of_week,
                actual,
            });
        }

        if self.year != self.count_date.year() || self.month != self.count_date.month() {
            return Err(FaultKind::CalendarMismatch {
                year: self.year,
                month: self.month,
            });
        }

        if self.classification().is_none() {
            return Err(FaultKind::UnknownClassification {
                code: self.classification_seq,
            });
        }

        if self.traffic_direction().is_none() {
            return Err(FaultKind::UnknownTrafficDirection {
                code: self.traffic_direction_seq,
            });
        }

        if let Some(code) = self.cardinal_direction_seq {
            if CardinalDirection::from_code(code).is_none() {
                return Err(FaultKind::UnknownCardinalDirection { code });
            }
        }

        for (hour, volume) in self.hours.iter().enumerate() {
            if let Some(v) = *volume {
                if v < 0 {
                    return Err(FaultKind::NegativeVolume { hour, volume: v });
                }
            }
        }

        Ok(())
    }
}
