//! Row screening, attribute filters and partitioning.
//!
//! Filters never mutate or copy rows; they return borrowed subsets that can
//! be filtered again or partitioned. An empty subset is "no data", not an
//! error.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use tracing::warn;

use crate::calendar::{DayClass, SchoolTerm};
use crate::error::{DataIntegrityFault, FaultKind};
use crate::model::{
    CardinalDirection, Classification, HourlyCountRow, Station, StationIndex, TrafficDirection,
};

/// Rows that passed [`HourlyCountRow::check`] and the faults of those that did not.
#[derive(Debug, Default)]
pub struct Screened<'a> {
    pub rows: Vec<&'a HourlyCountRow>,
    pub faults: Vec<DataIntegrityFault>,
}

pub fn screen<'a, I>(rows: I) -> Screened<'a>
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    let mut screened = Screened::default();

    for row in rows {
        match row.check() {
            Ok(()) => screened.rows.push(row),
            Err(kind) => screened.faults.push(DataIntegrityFault {
                station_key: row.station_key,
                count_date: row.count_date,
                kind,
            }),
        }
    }

    if !screened.faults.is_empty() {
        warn!(
            excluded = screened.faults.len(),
            kept = screened.rows.len(),
            "Rows excluded by integrity screening"
        );
    }

    screened
}

fn allows<T: Ord>(set: &Option<BTreeSet<T>>, value: &T) -> bool {
    set.as_ref().is_none_or(|s| s.contains(value))
}

/// Conjunction of optional row criteria. An unset criterion matches every row.
#[derive(Debug, Clone, Default)]
pub struct RowFilter {
    station_keys: Option<BTreeSet<i32>>,
    date_range: Option<(NaiveDate, NaiveDate)>,
    classifications: Option<BTreeSet<Classification>>,
    traffic_directions: Option<BTreeSet<TrafficDirection>>,
    cardinal_directions: Option<BTreeSet<CardinalDirection>>,
    years: Option<BTreeSet<i32>>,
    months: Option<BTreeSet<u32>>,
    day_classes: Option<BTreeSet<DayClass>>,
    school_term: Option<SchoolTerm>,
}

impl RowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stations(mut self, keys: impl IntoIterator<Item = i32>) -> Self {
        self.station_keys = Some(keys.into_iter().collect());
        self
    }

    /// Inclusive on both ends. An inverted range matches nothing.
    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_range = Some((from, to));
        self
    }

    pub fn classifications(mut self, values: impl IntoIterator<Item = Classification>) -> Self {
        self.classifications = Some(values.into_iter().collect());
        self
    }

    pub fn classification(self, value: Classification) -> Self {
        self.classifications([value])
    }

    pub fn traffic_directions(
        mut self,
        values: impl IntoIterator<Item = TrafficDirection>,
    ) -> Self {
        self.traffic_directions = Some(values.into_iter().collect());
        self
    }

    pub fn cardinal_directions(
        mut self,
        values: impl IntoIterator<Item = CardinalDirection>,
    ) -> Self {
        self.cardinal_directions = Some(values.into_iter().collect());
        self
    }

    pub fn years(mut self, values: impl IntoIterator<Item = i32>) -> Self {
        self.years = Some(values.into_iter().collect());
        self
    }

    pub fn months(mut self, values: impl IntoIterator<Item = u32>) -> Self {
        self.months = Some(values.into_iter().collect());
        self
    }

    pub fn day_classes(mut self, values: impl IntoIterator<Item = DayClass>) -> Self {
        self.day_classes = Some(values.into_iter().collect());
        self
    }

    pub fn school_term(mut self, value: SchoolTerm) -> Self {
        self.school_term = Some(value);
        self
    }

    pub fn matches(&self, row: &HourlyCountRow) -> bool {
        if !allows(&self.station_keys, &row.station_key) {
            return false;
        }

        if let Some((from, to)) = self.date_range {
            if row.count_date < from || row.count_date > to {
                return false;
            }
        }

        // Undecodable codes pass code criteria so the analyzer's screening
        // reports the row instead of it vanishing here.
        if let Some(c) = row.classification() {
            if !allows(&self.classifications, &c) {
                return false;
            }
        }

        if let Some(d) = row.traffic_direction() {
            if !allows(&self.traffic_directions, &d) {
                return false;
            }
        }

        if self.cardinal_directions.is_some() {
            match (row.cardinal_direction_seq, row.cardinal_direction()) {
                (Some(_), None) => {}
                (_, Some(d)) if allows(&self.cardinal_directions, &d) => {}
                _ => return false,
            }
        }

        if !allows(&self.years, &row.year) || !allows(&self.months, &row.month) {
            return false;
        }

        if let Ok(class) = row.day_class() {
            if !allows(&self.day_classes, &class) {
                return false;
            }
        }

        if let Some(term) = self.school_term {
            if row.school_term() != term {
                return false;
            }
        }

        true
    }

    pub fn apply<'a, I>(&self, rows: I) -> Vec<&'a HourlyCountRow>
    where
        I: IntoIterator<Item = &'a HourlyCountRow>,
    {
        rows.into_iter().filter(|row| self.matches(row)).collect()
    }
}

/// Station attribute criteria, resolved to station keys for a [`RowFilter`].
#[derive(Debug, Clone, Default)]
pub struct StationFilter {
    pub lgas: Option<BTreeSet<String>>,
    pub suburbs: Option<BTreeSet<String>>,
    /// Matched against both `road_name` and `common_road_name`.
    pub road_names: Option<BTreeSet<String>>,
    pub hierarchies: Option<BTreeSet<String>>,
    pub vehicle_classifier: Option<bool>,
    pub permanent_station: Option<bool>,
    pub heavy_vehicle_checking_station: Option<bool>,
    pub min_quality: Option<i32>,
}

impl StationFilter {
    pub fn matches(&self, station: &Station) -> bool {
        fn attr(set: &Option<BTreeSet<String>>, value: Option<&String>) -> bool {
            match set {
                None => true,
                Some(s) => value.is_some_and(|v| s.contains(v)),
            }
        }

        let road_ok = match &self.road_names {
            None => true,
            Some(names) => {
                names.contains(&station.road_name)
                    || station
                        .common_road_name
                        .as_ref()
                        .is_some_and(|n| names.contains(n))
            }
        };

        let flag_ok = |wanted: Option<bool>, actual: bool| wanted.is_none_or(|w| w == actual);

        road_ok
            && attr(&self.lgas, station.lga.as_ref())
            && attr(&self.suburbs, station.suburb.as_ref())
            && attr(&self.hierarchies, station.road_functional_hierarchy.as_ref())
            && flag_ok(self.vehicle_classifier, station.vehicle_classifier)
            && flag_ok(self.permanent_station, station.permanent_station)
            && flag_ok(
                self.heavy_vehicle_checking_station,
                station.heavy_vehicle_checking_station,
            )
            && self
                .min_quality
                .is_none_or(|min| station.quality_rating.is_some_and(|q| q >= min))
    }

    pub fn select_keys<'a>(
        &self,
        stations: impl IntoIterator<Item = &'a Station>,
    ) -> BTreeSet<i32> {
        stations
            .into_iter()
            .filter(|s| self.matches(s))
            .map(|s| s.station_key)
            .collect()
    }
}

/// Station attribute offered as a selector value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StationField {
    Lga,
    Suburb,
    RoadName,
    Hierarchy,
}

impl StationField {
    fn value<'a>(&self, station: &'a Station) -> Option<&'a str> {
        match self {
            StationField::Lga => station.lga.as_deref(),
            StationField::Suburb => station.suburb.as_deref(),
            StationField::RoadName => Some(station.road_name.as_str()).filter(|n| !n.is_empty()),
            StationField::Hierarchy => station.road_functional_hierarchy.as_deref(),
        }
    }
}

impl fmt::Display for StationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationField::Lga => f.write_str("lga"),
            StationField::Suburb => f.write_str("suburb"),
            StationField::RoadName => f.write_str("road_name"),
            StationField::Hierarchy => f.write_str("hierarchy"),
        }
    }
}

/// Sorted distinct values of one station attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistinctValues {
    pub field: StationField,
    pub values: Vec<String>,
}

/// Distinct non-empty values of `field`, sorted.
pub fn distinct_values<'a>(
    stations: impl IntoIterator<Item = &'a Station>,
    field: StationField,
) -> DistinctValues {
    let values: BTreeSet<&str> = stations.into_iter().filter_map(|s| field.value(s)).collect();
    DistinctValues {
        field,
        values: values.into_iter().map(str::to_string).collect(),
    }
}

/// Distinct suburbs of the stations in any of `lgas`. No LGAs, no suburbs.
pub fn suburbs_for_lgas<'a>(
    stations: impl IntoIterator<Item = &'a Station>,
    lgas: &BTreeSet<String>,
) -> DistinctValues {
    distinct_values(
        stations
            .into_iter()
            .filter(|s| s.lga.as_ref().is_some_and(|l| lgas.contains(l))),
        StationField::Suburb,
    )
}

/// Subsets keyed by partition value, in order of first occurrence.
#[derive(Debug, Clone)]
pub struct Partitions<'a, K> {
    groups: Vec<(K, Vec<&'a HourlyCountRow>)>,
}

impl<'a, K: Eq + Hash + Clone> Partitions<'a, K> {
    pub fn get(&self, key: &K) -> Option<&[&'a HourlyCountRow]> {
        self.groups
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, rows)| rows.as_slice())
    }
}

impl<'a, K> Partitions<'a, K> {
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[&'a HourlyCountRow])> {
        self.groups.iter().map(|(k, rows)| (k, rows.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.groups.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<'a, K> IntoIterator for Partitions<'a, K> {
    type Item = (K, Vec<&'a HourlyCountRow>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

pub fn partition<'a, K, I, F>(rows: I, mut key: F) -> Partitions<'a, K>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = &'a HourlyCountRow>,
    F: FnMut(&HourlyCountRow) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&'a HourlyCountRow>)> = Vec::new();

    for row in rows {
        let k = key(row);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(row),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![row]));
            }
        }
    }

    Partitions { groups }
}

/// Partition value produced by a [`GroupBy`] dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    All,
    DayClass(DayClass),
    SchoolTerm(SchoolTerm),
    TrafficDirection(TrafficDirection),
    CardinalDirection(Option<CardinalDirection>),
    Station(i32),
    Year(i32),
    Month(u32),
    Hierarchy(String),
    /// An unscreened row whose grouping code cannot be decoded.
    Undecodable,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::All => f.write_str("All"),
            GroupKey::DayClass(c) => write!(f, "{c}"),
            GroupKey::SchoolTerm(t) => write!(f, "{t}"),
            GroupKey::TrafficDirection(d) => write!(f, "{d}"),
            GroupKey::CardinalDirection(Some(d)) => write!(f, "{d}"),
            GroupKey::CardinalDirection(None) => f.write_str("Unspecified"),
            GroupKey::Station(k) => write!(f, "{k}"),
            GroupKey::Year(y) => write!(f, "{y}"),
            GroupKey::Month(m) => write!(f, "{m}"),
            GroupKey::Hierarchy(h) => f.write_str(h),
            GroupKey::Undecodable => f.write_str("Undecodable"),
        }
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub const UNKNOWN_HIERARCHY: &str = "Unknown";

/// Built-in partition dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupBy {
    #[default]
    None,
    DayClass,
    SchoolTerm,
    TrafficDirection,
    CardinalDirection,
    Station,
    Year,
    Month,
    Hierarchy,
}

impl GroupBy {
    /// Partition value of a row. Hierarchy comes from `stations`.
    ///
    /// Analyzers screen rows before grouping. A row that skipped screening
    /// and carries an undecodable day or direction code gets its own
    /// [`GroupKey::Undecodable`] partition rather than joining another.
    pub fn key(&self, row: &HourlyCountRow, stations: &StationIndex) -> GroupKey {
        match self {
            GroupBy::None => GroupKey::All,
            GroupBy::DayClass => match row.day_class() {
                Ok(class) => GroupKey::DayClass(class),
                Err(kind) => undecodable(row, kind),
            },
            GroupBy::SchoolTerm => GroupKey::SchoolTerm(row.school_term()),
            GroupBy::TrafficDirection => match row.traffic_direction() {
                Some(d) => GroupKey::TrafficDirection(d),
                None => undecodable(
                    row,
                    FaultKind::UnknownTrafficDirection {
                        code: row.traffic_direction_seq,
                    },
                ),
            },
            GroupBy::CardinalDirection => {
                match (row.cardinal_direction_seq, row.cardinal_direction()) {
                    (Some(code), None) => {
                        undecodable(row, FaultKind::UnknownCardinalDirection { code })
                    }
                    (_, direction) => GroupKey::CardinalDirection(direction),
                }
            }
            GroupBy::Station => GroupKey::Station(row.station_key),
            GroupBy::Year => GroupKey::Year(row.year),
            GroupBy::Month => GroupKey::Month(row.month),
            GroupBy::Hierarchy => GroupKey::Hierarchy(
                stations
                    .hierarchy(row.station_key)
                    .unwrap_or(UNKNOWN_HIERARCHY)
                    .to_string(),
            ),
        }
    }
}

fn undecodable(row: &HourlyCountRow, kind: FaultKind) -> GroupKey {
    warn!(
        station_key = row.station_key,
        count_date = %row.count_date,
        %kind,
        "Grouping an unscreened row"
    );
    GroupKey::Undecodable
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "all" => Ok(GroupBy::None),
            "day-class" | "period" => Ok(GroupBy::DayClass),
            "school-term" => Ok(GroupBy::SchoolTerm),
            "direction" => Ok(GroupBy::TrafficDirection),
            "cardinal" => Ok(GroupBy::CardinalDirection),
            "station" => Ok(GroupBy::Station),
            "year" => Ok(GroupBy::Year),
            "month" => Ok(GroupBy::Month),
            "hierarchy" => Ok(GroupBy::Hierarchy),
            other => Err(format!("unknown grouping '{other}'")),
        }
    }
}
