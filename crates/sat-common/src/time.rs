//! Time handling for acquisition windows.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// An inclusive acquisition time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Build a range from two date or datetime strings.
    ///
    /// A date-only end is extended to the last microsecond of that day so
    /// that `2024-06-01..2024-06-01` covers the whole day.
    pub fn from_strings(start: &str, end: &str) -> Result<Self, TimeParseError> {
        let start_dt = parse_datetime(start)?;
        let end_dt = if is_date_only(end) {
            parse_datetime(end)? + chrono::Duration::days(1) - chrono::Duration::microseconds(1)
        } else {
            parse_datetime(end)?
        };
        if start_dt > end_dt {
            return Err(TimeParseError::Inverted {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self::new(start_dt, end_dt))
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }

    /// STAC `datetime` interval string. Sub-second bounds keep their
    /// fraction.
    pub fn to_interval(&self) -> String {
        format!(
            "{}/{}",
            self.start.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.end.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        )
    }

    /// Short form used in logs and error context.
    pub fn summary(&self) -> String {
        format!(
            "{}/{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// UTC calendar day of an acquisition.
pub fn acquisition_day(dt: &DateTime<Utc>) -> NaiveDate {
    dt.date_naive()
}

fn is_date_only(s: &str) -> bool {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").is_ok()
}

/// Parse an ISO 8601 datetime, a naive datetime (assumed UTC) or a bare date.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Start {start} is after end {end}")]
    Inverted { start: String, end: String },
}
