//! Partition key derivation.
//!
//! Every record belongs to exactly one partition, and subscriptions filter
//! on partition equality. Calendar entries are partitioned by month
//! (`YYYY-MM`), map annotations by a `room:map` pair.

use std::fmt;

use chrono::{Datelike, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{ShiftboardError, ShiftboardResult};

const MAP_SEPARATOR: char = ':';

/// Opaque partition identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(String);

impl PartitionKey {
    pub fn month(month: Month) -> Self {
        PartitionKey(month.to_string())
    }

    /// Partition for one map inside one room.
    pub fn map(room: &str, map: &str) -> ShiftboardResult<Self> {
        let room = map_component("room", room)?;
        let map = map_component("map", map)?;
        Ok(PartitionKey(format!("{room}{MAP_SEPARATOR}{map}")))
    }

    /// Wrap a key read back from a store without re-deriving it.
    pub fn from_stored(raw: &str) -> Self {
        PartitionKey(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn map_component<'a>(what: &str, value: &'a str) -> ShiftboardResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ShiftboardError::InvalidInput(format!("{what} must not be empty")));
    }
    if value.contains(MAP_SEPARATOR) {
        return Err(ShiftboardError::InvalidInput(format!(
            "{what} '{value}' must not contain '{MAP_SEPARATOR}'"
        )));
    }
    Ok(value)
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> ShiftboardResult<Self> {
        if !(1..=9999).contains(&year) {
            return Err(ShiftboardError::InvalidInput(format!(
                "Year {year} is out of range"
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(ShiftboardError::InvalidInput(format!(
                "Month {month} is out of range"
            )));
        }
        Ok(Month { year, month })
    }

    /// The month containing today's local date.
    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Month {
            year: today.year(),
            month: today.month(),
        }
    }

    /// Parse `YYYY-MM`.
    pub fn parse(s: &str) -> ShiftboardResult<Self> {
        let invalid =
            || ShiftboardError::InvalidInput(format!("Invalid month '{s}'. Expected YYYY-MM"));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Month::new(year, month)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Number of days in this month, leap years included.
    pub fn days(&self) -> u32 {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        // Both dates are valid for any month accepted by `new`.
        match (
            NaiveDate::from_ymd_opt(self.year, self.month, 1),
            NaiveDate::from_ymd_opt(next_year, next_month, 1),
        ) {
            (Some(first), Some(next)) => (next - first).num_days() as u32,
            _ => 31,
        }
    }

    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Month {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Month {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn pred(&self) -> Self {
        if self.month == 1 {
            Month {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Month {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn partition(&self) -> PartitionKey {
        PartitionKey::month(*self)
    }

    pub fn weekday_of(&self, day: u32) -> Option<Weekday> {
        NaiveDate::from_ymd_opt(self.year, self.month, day).map(|d| d.weekday())
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A validated `YYYY-MM-DD` date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDate {
    month: Month,
    day: u32,
}

impl CalendarDate {
    /// Parse a three-component date string.
    ///
    /// Fails with `InvalidInput` when the string does not have exactly three
    /// `-`-separated numeric components, or when the day does not exist in
    /// that month.
    pub fn parse(s: &str) -> ShiftboardResult<Self> {
        let parts: Vec<&str> = s.trim().split('-').collect();
        let [year, month, day] = parts.as_slice() else {
            return Err(ShiftboardError::InvalidInput(format!(
                "Invalid date format '{s}'. Expected YYYY-MM-DD"
            )));
        };

        let number = |part: &str| {
            part.trim().parse::<i64>().map_err(|_| {
                ShiftboardError::InvalidInput(format!("Invalid date component '{part}' in '{s}'"))
            })
        };
        let (year, month, day) = (number(*year)?, number(*month)?, number(*day)?);

        let year = i32::try_from(year)
            .map_err(|_| ShiftboardError::InvalidInput(format!("Year {year} is out of range")))?;
        let month = u32::try_from(month).map_err(|_| {
            ShiftboardError::InvalidInput(format!("Month {month} is out of range"))
        })?;
        let month = Month::new(year, month)?;

        let last_day = month.days();
        if day < 1 || day > i64::from(last_day) {
            return Err(ShiftboardError::InvalidInput(format!(
                "{month} only has {last_day} days"
            )));
        }

        Ok(CalendarDate {
            month,
            day: day as u32,
        })
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn partition(&self) -> PartitionKey {
        self.month.partition()
    }

    pub fn weekday(&self) -> Weekday {
        self.month
            .weekday_of(self.day)
            .unwrap_or(Weekday::Mon)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{:02}", self.month, self.day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_month_dates_share_a_partition() {
        let a = CalendarDate::parse("2025-12-02").unwrap();
        let b = CalendarDate::parse("2025-12-31").unwrap();
        let c = CalendarDate::parse("2026-01-01").unwrap();

        assert_eq!(a.partition(), b.partition());
        assert_ne!(b.partition(), c.partition());
        assert_eq!(a.partition().as_str(), "2025-12");
    }

    #[test]
    fn rejects_malformed_dates() {
        for bad in ["", "2025-12", "2025-12-01-01", "2025-xx-01", "2025-12-", "abcd-01-02"] {
            assert!(
                matches!(CalendarDate::parse(bad), Err(ShiftboardError::InvalidInput(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_days_past_end_of_month() {
        assert!(CalendarDate::parse("2025-04-31").is_err());
        assert!(CalendarDate::parse("2025-02-29").is_err());
        assert!(CalendarDate::parse("2025-02-00").is_err());
        assert!(CalendarDate::parse("2024-02-29").is_ok());
        assert!(CalendarDate::parse("2025-13-01").is_err());
    }

    #[test]
    fn month_lengths_account_for_leap_years() {
        assert_eq!(Month::new(2024, 2).unwrap().days(), 29);
        assert_eq!(Month::new(2025, 2).unwrap().days(), 28);
        assert_eq!(Month::new(1900, 2).unwrap().days(), 28);
        assert_eq!(Month::new(2000, 2).unwrap().days(), 29);
        assert_eq!(Month::new(2025, 12).unwrap().days(), 31);
        assert_eq!(Month::new(2025, 11).unwrap().days(), 30);
    }

    #[test]
    fn weekday_of_date() {
        assert_eq!(
            CalendarDate::parse("2025-12-25").unwrap().weekday(),
            Weekday::Thu
        );
        assert_eq!(Month::new(2025, 11).unwrap().weekday_of(31), None);
    }

    #[test]
    fn month_navigation_rolls_over_years() {
        let dec = Month::new(2025, 12).unwrap();
        assert_eq!(dec.succ().to_string(), "2026-01");
        assert_eq!(dec.succ().pred(), dec);
        assert_eq!(Month::new(2026, 1).unwrap().pred().to_string(), "2025-12");
    }

    #[test]
    fn month_parse_roundtrips_display() {
        let month = Month::parse("2025-03").unwrap();
        assert_eq!(month.to_string(), "2025-03");
        assert!(Month::parse("2025").is_err());
        assert!(Month::parse("2025-0").is_err());
    }

    #[test]
    fn map_keys_are_injective() {
        let a = PartitionKey::map("alpha", "dust").unwrap();
        let b = PartitionKey::map(" alpha ", "dust").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, PartitionKey::map("alpha", "mirage").unwrap());
        assert!(PartitionKey::map("al:pha", "dust").is_err());
        assert!(PartitionKey::map("", "dust").is_err());
    }
}
