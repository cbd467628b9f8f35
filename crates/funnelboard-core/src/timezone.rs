//! Civil-time normalization.
//!
//! Every timestamp entering the pipeline is reduced to a calendar date in one
//! configured zone (UTC-3 unless configured otherwise). The same conversion is
//! used for grouping keys and for request-range boundaries, so filtering and
//! bucketing always agree on which day a point belongs to.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::CoreError;

/// Brasília civil time, three hours west of UTC.
pub const DEFAULT_OFFSET_SECS: i32 = -3 * 3600;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CivilZone {
    /// Constant offset from UTC, in seconds east.
    Fixed { offset_secs: i32 },
    Named(chrono_tz::Tz),
}

impl Default for CivilZone {
    fn default() -> Self {
        CivilZone::Fixed {
            offset_secs: DEFAULT_OFFSET_SECS,
        }
    }
}

impl fmt::Display for CivilZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CivilZone::Fixed { offset_secs } => {
                let sign = if *offset_secs < 0 { '-' } else { '+' };
                let abs = offset_secs.unsigned_abs();
                write!(f, "{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
            }
            CivilZone::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

impl CivilZone {
    /// Parse `±HH:MM`, `UTC`/`Z`, or an IANA zone name.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
            return Ok(CivilZone::Fixed { offset_secs: 0 });
        }
        if let Some(offset_secs) = parse_offset(trimmed) {
            return Ok(CivilZone::Fixed { offset_secs });
        }
        trimmed
            .parse::<chrono_tz::Tz>()
            .map(CivilZone::Named)
            .map_err(|_| CoreError::InvalidTimezone(raw.to_string()))
    }

    /// Wall-clock time in this zone for the given instant.
    pub fn localize(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            CivilZone::Fixed { offset_secs } => match FixedOffset::east_opt(*offset_secs) {
                Some(offset) => instant.with_timezone(&offset).naive_local(),
                None => instant.naive_utc(),
            },
            CivilZone::Named(tz) => instant.with_timezone(tz).naive_local(),
        }
    }

    /// Normalize a raw timestamp string into civil date and time.
    ///
    /// Bare dates are already civil. Timestamps carrying `Z` or an explicit
    /// offset are converted into this zone. Timestamps without an offset are
    /// taken as civil wall-clock time.
    pub fn normalize(&self, raw: &str) -> Result<CivilDateTime, CoreError> {
        let trimmed = raw.trim();

        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(CivilDateTime { date, time: None });
        }

        let with_offset = DateTime::parse_from_rfc3339(trimmed)
            .or_else(|_| DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%:z"));
        if let Ok(instant) = with_offset {
            let local = self.localize(instant.with_timezone(&Utc));
            return Ok(CivilDateTime {
                date: local.date(),
                time: Some(local.time()),
            });
        }

        NAIVE_DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
            .map(|local| CivilDateTime {
                date: local.date(),
                time: Some(local.time()),
            })
            .ok_or_else(|| CoreError::MalformedDate(raw.to_string()))
    }

    /// Shorthand for the calendar day of a raw timestamp.
    pub fn civil_date(&self, raw: &str) -> Result<NaiveDate, CoreError> {
        self.normalize(raw).map(|c| c.date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilDateTime {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
}

impl CivilDateTime {
    /// `YYYY-MM-DD`
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// `HH:MM`, when the source carried a time component.
    pub fn time_label(&self) -> Option<String> {
        self.time.map(|t| t.format("%H:%M").to_string())
    }
}

fn parse_offset(raw: &str) -> Option<i32> {
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}
