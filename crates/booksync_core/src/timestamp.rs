//! Millisecond-precision UTC timestamps.
//!
//! Every timestamp that crosses the wire is rendered in one canonical form:
//! RFC 3339, UTC, `Z` suffix, exactly three fractional digits
//! (`2024-01-10T00:00:00.000Z`). Values are truncated to millisecond
//! precision on construction, so rendering and re-parsing is lossless.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Timelike, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Naive date-time layouts accepted by [`Timestamp::parse`], read as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

/// Offset-carrying layouts that RFC 3339 parsing rejects.
const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    // `Date.prototype.toString()`, once the zone name is stripped.
    "%a %b %d %Y %H:%M:%S GMT%z",
];

/// Calendar date layouts, read as UTC midnight. `%b` also accepts full
/// month names when parsing.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%b %d, %Y", "%d %b %Y"];

/// Error returned when a string is not a recognizable point in time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseTimestampError {
    /// The input was empty or whitespace.
    #[error("empty timestamp")]
    Empty,

    /// The input matched none of the accepted layouts.
    #[error("unrecognized timestamp: {input:?}")]
    Unrecognized {
        /// The rejected input.
        input: String,
    },
}

/// A point in time, UTC, with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current instant.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Wraps a chrono date-time, truncating to whole milliseconds.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let millis = dt.nanosecond() / 1_000_000 * 1_000_000;
        Self(dt.with_nanosecond(millis).unwrap_or(dt))
    }

    /// Builds a timestamp from Unix milliseconds.
    ///
    /// Returns `None` outside the representable calendar range.
    #[must_use]
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Returns Unix milliseconds.
    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Returns the underlying chrono value.
    #[must_use]
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Renders the canonical wire form.
    #[must_use]
    pub fn to_canonical(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Parses a caller-supplied date or date-time.
    ///
    /// Accepted inputs, in order of preference:
    /// - RFC 3339 (`2024-01-05T10:00:00Z`, `2024-01-05T10:00:00+02:00`)
    /// - RFC 2822 (`Fri, 05 Jan 2024 10:00:00 GMT`)
    /// - ISO date-time with a space separator and an offset
    /// - ISO date-time without an offset, read as UTC
    /// - a calendar date (`2024-01-05`, `2024/01/05`, `Jan 5, 2024`), read
    ///   as UTC midnight
    /// - an ISO year or year-month (`2024`, `2024-01`), read as the start of
    ///   that period
    pub fn parse(input: &str) -> Result<Self, ParseTimestampError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ParseTimestampError::Empty);
        }
        let s = strip_zone_name(s);

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::from_datetime(dt.with_timezone(&Utc)));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Ok(Self::from_datetime(dt.with_timezone(&Utc)));
        }
        for format in OFFSET_DATETIME_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, format) {
                return Ok(Self::from_datetime(dt.with_timezone(&Utc)));
            }
        }
        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(Self::from_datetime(naive.and_utc()));
            }
        }
        let date = DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
            .or_else(|| parse_iso_partial(s));
        if let Some(midnight) = date.and_then(|d| d.and_hms_opt(0, 0, 0)) {
            return Ok(Self::from_datetime(midnight.and_utc()));
        }

        Err(ParseTimestampError::Unrecognized {
            input: input.trim().to_string(),
        })
    }
}

/// Drops a trailing parenthesized zone name, as in
/// `... GMT+0000 (Coordinated Universal Time)`.
fn strip_zone_name(s: &str) -> &str {
    match s.rfind(" (") {
        Some(idx) if s.ends_with(')') => s[..idx].trim_end(),
        _ => s,
    }
}

/// `YYYY` or `YYYY-MM`, resolved to the first day of the period.
fn parse_iso_partial(s: &str) -> Option<NaiveDate> {
    let (year, month) = match s.split_once('-') {
        Some((year, month)) => (year, Some(month)),
        None => (s, None),
    };
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let month = match month {
        Some(m) if m.len() == 2 && m.bytes().all(|b| b.is_ascii_digit()) => m.parse().ok()?,
        Some(_) => return None,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, 1)
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl FromStr for Timestamp {
    type Err = ParseTimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TimestampVisitor;

        impl Visitor<'_> for TimestampVisitor {
            type Value = Timestamp;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a date or date-time string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Timestamp, E> {
                Timestamp::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(TimestampVisitor)
    }
}
