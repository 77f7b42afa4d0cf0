//! Time handling utilities for satellite product searches.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Search window for archive queries.
///
/// Both ends are inclusive and held in UTC. `start <= end` is enforced on
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeParseError> {
        if end < start {
            return Err(TimeParseError::InvertedWindow {
                start: isoformat(&start),
                end: isoformat(&end),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse a window from two ISO 8601 strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, TimeParseError> {
        Self::new(parse_iso8601(start)?, parse_iso8601(end)?)
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Parse an ISO 8601 timestamp.
///
/// Accepts RFC 3339 (with offset or `Z`), naive date-times with optional
/// fractional seconds (assumed UTC) and plain dates (midnight UTC).
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// Format a timestamp as `YYYY-MM-DDTHH:MM:SS`, appending microseconds only
/// when the sub-second part is non-zero. No offset suffix is written.
pub fn isoformat(dt: &DateTime<Utc>) -> String {
    format!(
        "{}{}",
        dt.format("%Y-%m-%dT%H:%M:%S"),
        fractional_suffix(dt.nanosecond())
    )
}

/// Time-of-day part of [`isoformat`] (`HH:MM:SS[.ffffff]`).
pub fn isoformat_time(dt: &DateTime<Utc>) -> String {
    format!("{}{}", dt.format("%H:%M:%S"), fractional_suffix(dt.nanosecond()))
}

fn fractional_suffix(nanos: u32) -> String {
    // Leap-second nanos (>= 1e9) fold onto the last microsecond.
    let micros = (nanos / 1_000).min(999_999);
    if micros == 0 {
        String::new()
    } else {
        format!(".{:06}", micros)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Time window ends before it starts: {start} > {end}")]
    InvertedWindow { start: String, end: String },
}
