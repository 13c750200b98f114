//! Calendar classification of count days.
//!
//! Two independent tags are derived per row: a [`DayClass`] (weekday, weekend
//! or public holiday) and a [`SchoolTerm`]. They are never merged, so a row
//! can be a weekday during school holidays.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FaultKind;
use crate::model::HourlyCountRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayClass {
    Weekday,
    Weekend,
    PublicHoliday,
}

impl fmt::Display for DayClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Weekday => "Weekday",
            Self::Weekend => "Weekend",
            Self::PublicHoliday => "Public holiday",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchoolTerm {
    SchoolHoliday,
    TermTime,
}

impl fmt::Display for SchoolTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SchoolHoliday => "School holiday",
            Self::TermTime => "Term time",
        };
        f.write_str(label)
    }
}

/// ISO day number, 1 = Monday through 7 = Sunday.
pub fn iso_day_of_week(date: NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}

/// Classifies a day from its ISO day number and public-holiday flag.
///
/// A public holiday wins over the day number, but an out-of-range day number
/// is still a fault even when the holiday flag is set.
pub fn classify_day(day_of_week: u32, is_public_holiday: bool) -> Result<DayClass, FaultKind> {
    match day_of_week {
        1..=7 if is_public_holiday => Ok(DayClass::PublicHoliday),
        1..=5 => Ok(DayClass::Weekday),
        6 | 7 => Ok(DayClass::Weekend),
        _ => Err(FaultKind::DayOfWeekOutOfRange { day_of_week }),
    }
}

pub fn school_term(is_school_holiday: bool) -> SchoolTerm {
    if is_school_holiday {
        SchoolTerm::SchoolHoliday
    } else {
        SchoolTerm::TermTime
    }
}

impl HourlyCountRow {
    pub fn day_class(&self) -> Result<DayClass, FaultKind> {
        classify_day(self.day_of_week, self.is_public_holiday)
    }

    pub fn school_term(&self) -> SchoolTerm {
        school_term(self.is_school_holiday)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_and_weekend() {
        for day in 1..=5 {
            assert_eq!(classify_day(day, false), Ok(DayClass::Weekday));
        }
        assert_eq!(classify_day(6, false), Ok(DayClass::Weekend));
        assert_eq!(classify_day(7, false), Ok(DayClass::Weekend));
    }

    #[test]
    fn test_public_holiday_overrides_day() {
        assert_eq!(classify_day(3, true), Ok(DayClass::PublicHoliday));
        assert_eq!(classify_day(7, true), Ok(DayClass::PublicHoliday));
    }

    #[test]
    fn test_out_of_range_day_is_fault() {
        assert_eq!(
            classify_day(0, false),
            Err(FaultKind::DayOfWeekOutOfRange { day_of_week: 0 })
        );
        assert_eq!(
            classify_day(8, true),
            Err(FaultKind::DayOfWeekOutOfRange { day_of_week: 8 })
        );
    }

    #[test]
    fn test_school_term_is_independent() {
        assert_eq!(school_term(true), SchoolTerm::SchoolHoliday);
        assert_eq!(school_term(false), SchoolTerm::TermTime);
        // Weekday during school holidays keeps both tags
        assert_eq!(classify_day(2, false), Ok(DayClass::Weekday));
    }

    #[test]
    fn test_iso_day_of_week() {
        // 2024-01-01 was a Monday, 2024-01-07 a Sunday
        assert_eq!(iso_day_of_week(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()), 1);
        assert_eq!(iso_day_of_week(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()), 7);
    }
}
