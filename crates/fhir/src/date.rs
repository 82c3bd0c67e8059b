//! FHIR `date` / `dateTime` values.
//!
//! FHIR dates may be partial (`1992`, `1992-03`) and dateTimes carry a UTC offset whenever a
//! time is present. [`FhirDate`] keeps the calendar components separately from the instant so
//! that a date-only value is never shifted across midnight by a timezone conversion.

use crate::{FhirError, FhirResult};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A parsed FHIR `date`, `dateTime` or `instant`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FhirDate {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
    instant: Option<DateTime<FixedOffset>>,
    raw: String,
}

impl FhirDate {
    /// Parse a FHIR date or dateTime string.
    ///
    /// Accepted forms: `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, and `YYYY-MM-DDThh:mm:ss[.f+](Z|±hh:mm)`.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidDate`] for anything else, including out-of-range months or
    /// days and times without an offset.
    pub fn parse(input: &str) -> FhirResult<Self> {
        let raw = input.trim();
        let invalid = || FhirError::InvalidDate(raw.to_string());

        let (date_part, time_part) = match raw.split_once('T') {
            Some((date, time)) => (date, Some(time)),
            None => (raw, None),
        };

        let mut parts = date_part.split('-');
        let year = parts
            .next()
            .filter(|y| y.len() == 4)
            .and_then(parse_digits)
            .ok_or_else(invalid)? as i32;
        let month = match parts.next() {
            Some(m) => Some(
                Some(m)
                    .filter(|m| m.len() == 2)
                    .and_then(parse_digits)
                    .filter(|m| (1..=12).contains(m))
                    .ok_or_else(invalid)?,
            ),
            None => None,
        };
        let day = match parts.next() {
            Some(d) => Some(
                Some(d)
                    .filter(|d| d.len() == 2)
                    .and_then(parse_digits)
                    .filter(|d| (1..=31).contains(d))
                    .ok_or_else(invalid)?,
            ),
            None => None,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }

        let instant = match time_part {
            Some(_) if day.is_none() => return Err(invalid()),
            Some(_) => Some(DateTime::parse_from_rfc3339(raw).map_err(|_| invalid())?),
            None => None,
        };

        Ok(Self {
            year,
            month,
            day,
            instant,
            raw: raw.to_string(),
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    pub fn day(&self) -> Option<u32> {
        self.day
    }

    /// The instant, present only when the source value carried a time of day.
    pub fn instant(&self) -> Option<DateTime<FixedOffset>> {
        self.instant
    }

    pub fn has_time(&self) -> bool {
        self.instant.is_some()
    }

    /// The value exactly as it appeared on the wire (trimmed).
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl FromStr for FhirDate {
    type Err = FhirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FhirDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for FhirDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for FhirDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        FhirDate::parse(&s).map_err(serde::de::Error::custom)
    }
}
