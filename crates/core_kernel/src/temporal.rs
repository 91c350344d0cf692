//! Calendar types for rule validity and clinic-local dates
//!
//! Business rules carry an optional validity window expressed in calendar
//! days. A calculation is dated in the clinic's own timezone, so a request
//! received at 23:30 UTC may already belong to the next day in Tehran.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid window: start {start} must not be after end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// An inclusive range of calendar days, open on either side when unset
///
/// A rule valid from 2024-03-21 to 2025-03-20 applies on both of those days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidityWindow {
    /// First day the window covers
    #[serde(default)]
    pub start: Option<NaiveDate>,
    /// Last day the window covers
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl ValidityWindow {
    /// Creates a window, rejecting an end that precedes the start
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, TemporalError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(TemporalError::InvalidWindow { start, end });
            }
        }
        Ok(Self { start, end })
    }

    /// A window with no bounds
    pub fn always() -> Self {
        Self::default()
    }

    /// A window bounded on both sides
    pub fn between(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        Self::new(Some(start), Some(end))
    }

    /// Returns true if the given day falls inside the window
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    /// Returns true if the window has no bounds
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Timezone in which a clinic dates its calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClinicTimezone(pub Tz);

impl ClinicTimezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Converts an instant to the clinic's calendar day
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }

    /// The clinic's current calendar day
    pub fn today(&self) -> NaiveDate {
        self.local_date(Utc::now())
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }
}

impl Default for ClinicTimezone {
    fn default() -> Self {
        Self(chrono_tz::Asia::Tehran)
    }
}

impl FromStr for ClinicTimezone {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s.trim())
            .map(ClinicTimezone)
            .map_err(|_| TemporalError::UnknownTimezone(s.to_string()))
    }
}

impl Serialize for ClinicTimezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for ClinicTimezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_is_inclusive_on_both_ends() {
        let window = ValidityWindow::between(date(2024, 3, 21), date(2025, 3, 20)).unwrap();
        assert!(window.contains(date(2024, 3, 21)));
        assert!(window.contains(date(2025, 3, 20)));
        assert!(!window.contains(date(2024, 3, 20)));
        assert!(!window.contains(date(2025, 3, 21)));
    }

    #[test]
    fn test_open_window_contains_everything() {
        let window = ValidityWindow::always();
        assert!(window.is_unbounded());
        assert!(window.contains(date(1990, 1, 1)));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let result = ValidityWindow::between(date(2025, 1, 2), date(2025, 1, 1));
        assert!(matches!(result, Err(TemporalError::InvalidWindow { .. })));
    }

    #[test]
    fn test_local_date_crosses_midnight() {
        let tz = ClinicTimezone::default();
        let late_utc = Utc.with_ymd_and_hms(2024, 6, 1, 22, 0, 0).unwrap();
        assert_eq!(tz.local_date(late_utc), date(2024, 6, 2));
    }

    #[test]
    fn test_timezone_parsing() {
        let tz: ClinicTimezone = "Asia/Tehran".parse().unwrap();
        assert_eq!(tz.name(), "Asia/Tehran");
        assert!("Mars/Olympus".parse::<ClinicTimezone>().is_err());
    }
}
