//! Dashboard data model.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;
use crate::timezone::CivilZone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeriesKind {
    Sessions,
    Leads,
    Clients,
    Conversions,
    /// Any type the pipeline does not know. Points of this kind are ignored.
    Unknown,
}

impl SeriesKind {
    pub const FETCHABLE: [SeriesKind; 3] =
        [SeriesKind::Sessions, SeriesKind::Leads, SeriesKind::Clients];

    /// Accepts plural and singular spellings, case-insensitively. `events` is
    /// the older name of the clients series.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sessions" | "session" => SeriesKind::Sessions,
            "leads" | "lead" => SeriesKind::Leads,
            "clients" | "client" | "events" | "event" => SeriesKind::Clients,
            "conversions" | "conversion" => SeriesKind::Conversions,
            _ => SeriesKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKind::Sessions => "sessions",
            SeriesKind::Leads => "leads",
            SeriesKind::Clients => "clients",
            SeriesKind::Conversions => "conversions",
            SeriesKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SeriesKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SeriesKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(SeriesKind::Unknown, SeriesKind::parse))
    }
}

/// One count reported by a data source for one timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDataPoint {
    pub date: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub count: u64,
    #[serde(rename = "type", default = "unknown_kind")]
    pub kind: SeriesKind,
}

impl RawDataPoint {
    pub fn new(date: impl Into<String>, count: u64, kind: SeriesKind) -> Self {
        Self {
            date: date.into(),
            count,
            kind,
        }
    }
}

fn unknown_kind() -> SeriesKind {
    SeriesKind::Unknown
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or(0, count_from_value))
}

/// Coerce an upstream count into a non-negative integer. Anything that is not
/// a usable number counts as zero.
pub fn count_from_value(value: &serde_json::Value) -> u64 {
    match value {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f > 0.0)
                .map_or(0, |f| f.trunc() as u64)
        }),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f > 0.0)
            .map_or(0, |f| f.trunc() as u64),
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeFrame {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl TimeFrame {
    /// Case-insensitive; a missing or empty value means `Daily`.
    pub fn parse(raw: Option<&str>) -> Result<Self, CoreError> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(TimeFrame::Daily);
        };
        match raw.to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(TimeFrame::Daily),
            "weekly" | "week" => Ok(TimeFrame::Weekly),
            "monthly" | "month" => Ok(TimeFrame::Monthly),
            "yearly" | "year" => Ok(TimeFrame::Yearly),
            _ => Err(CoreError::UnknownTimeFrame(raw.to_string())),
        }
    }
}

/// Request-level date range, as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl DateRange {
    pub fn new(from: Option<&str>, to: Option<&str>) -> Self {
        Self {
            from: from.map(str::to_string),
            to: to.map(str::to_string),
        }
    }

    /// Resolve both bounds to civil dates. Empty strings count as absent; any
    /// other unparseable bound is a request error.
    pub fn resolve(&self, zone: &CivilZone) -> Result<ResolvedRange, CoreError> {
        let from = resolve_bound(self.from.as_deref(), "from", zone)?;
        let to = resolve_bound(self.to.as_deref(), "to", zone)?;
        if let (Some(from), Some(to)) = (from, to) {
            if to < from {
                return Err(CoreError::ReversedRange);
            }
        }
        Ok(ResolvedRange { from, to })
    }

    pub fn is_unbounded(&self) -> bool {
        present(self.from.as_deref()).is_none() && present(self.to.as_deref()).is_none()
    }
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn resolve_bound(
    raw: Option<&str>,
    field: &'static str,
    zone: &CivilZone,
) -> Result<Option<NaiveDate>, CoreError> {
    present(raw)
        .map(|value| {
            zone.civil_date(value)
                .map_err(|_| CoreError::InvalidRequestRange {
                    field,
                    value: value.to_string(),
                })
        })
        .transpose()
}

/// Inclusive civil-date bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ResolvedRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// The dashboard's `cardType` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeriesSelection {
    #[default]
    All,
    Only(SeriesKind),
}

impl SeriesSelection {
    pub fn parse(raw: Option<&str>) -> Result<Self, CoreError> {
        let Some(raw) = present(raw) else {
            return Ok(SeriesSelection::All);
        };
        if raw.eq_ignore_ascii_case("all") {
            return Ok(SeriesSelection::All);
        }
        match SeriesKind::parse(raw) {
            SeriesKind::Unknown => Err(CoreError::UnknownSelection(raw.to_string())),
            kind => Ok(SeriesSelection::Only(kind)),
        }
    }

    /// Upstream sources needed to serve this selection.
    pub fn sources(&self) -> Vec<SeriesKind> {
        match self {
            SeriesSelection::All => SeriesKind::FETCHABLE.to_vec(),
            SeriesSelection::Only(SeriesKind::Conversions) => {
                vec![SeriesKind::Leads, SeriesKind::Clients]
            }
            SeriesSelection::Only(kind) => vec![*kind],
        }
    }

    pub fn includes(&self, kind: SeriesKind) -> bool {
        match self {
            SeriesSelection::All => true,
            SeriesSelection::Only(only) => *only == kind,
        }
    }
}

/// Per-day counts for one civil date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyBucket {
    pub period: NaiveDate,
    pub leads: u64,
    pub clients: u64,
    pub sessions: u64,
    pub conversions: u64,
}

impl DailyBucket {
    pub fn empty(period: NaiveDate) -> Self {
        Self {
            period,
            leads: 0,
            clients: 0,
            sessions: 0,
            conversions: 0,
        }
    }

    /// Add `count` to the field for `kind`. Unknown kinds are ignored.
    pub fn add(&mut self, kind: SeriesKind, count: u64) {
        match kind {
            SeriesKind::Sessions => self.sessions = self.sessions.saturating_add(count),
            SeriesKind::Leads => self.leads = self.leads.saturating_add(count),
            SeriesKind::Clients => self.clients = self.clients.saturating_add(count),
            SeriesKind::Conversions => {
                self.conversions = self.conversions.saturating_add(count)
            }
            SeriesKind::Unknown => {}
        }
    }
}

/// A week, month or year of summed daily buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedBucket {
    /// Week-start date, `yyyy-MM` or `yyyy`.
    pub period: String,
    pub leads: u64,
    pub clients: u64,
    pub sessions: u64,
    pub conversions: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Final, display-ready row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRecord {
    pub period: String,
    pub leads: u64,
    pub clients: u64,
    pub sessions: u64,
    pub conversions: u64,
    /// First civil date covered by the row. Orders rows; never serialized.
    #[serde(skip)]
    pub sort_key: NaiveDate,
}

impl OutputRecord {
    /// Zero every field the selection does not show.
    pub fn mask(&mut self, selection: SeriesSelection) {
        if !selection.includes(SeriesKind::Leads) {
            self.leads = 0;
        }
        if !selection.includes(SeriesKind::Clients) {
            self.clients = 0;
        }
        if !selection.includes(SeriesKind::Sessions) {
            self.sessions = 0;
        }
        if !selection.includes(SeriesKind::Conversions) {
            self.conversions = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_point_decodes_leniently() {
        let p: RawDataPoint =
            serde_json::from_value(json!({"date": "2025-01-01", "type": "lead"})).expect("decode");
        assert_eq!(p.count, 0);
        assert_eq!(p.kind, SeriesKind::Leads);

        let p: RawDataPoint =
            serde_json::from_value(json!({"date": "2025-01-01", "count": 7.9, "type": "surveys"}))
                .expect("decode");
        assert_eq!(p.count, 7);
        assert_eq!(p.kind, SeriesKind::Unknown);

        let p: RawDataPoint =
            serde_json::from_value(json!({"date": "2025-01-01", "count": -4, "type": "sessions"}))
                .expect("decode");
        assert_eq!(p.count, 0);
    }

    #[test]
    fn time_frame_parse_defaults_to_daily() {
        assert_eq!(TimeFrame::parse(None).expect("tf"), TimeFrame::Daily);
        assert_eq!(TimeFrame::parse(Some("")).expect("tf"), TimeFrame::Daily);
        assert_eq!(TimeFrame::parse(Some("weekly")).expect("tf"), TimeFrame::Weekly);
        assert_eq!(TimeFrame::parse(Some("Monthly")).expect("tf"), TimeFrame::Monthly);
        assert!(TimeFrame::parse(Some("hourly")).is_err());
    }

    #[test]
    fn range_resolves_timestamps_in_civil_zone() {
        let range = DateRange::new(
            Some("2025-01-01T00:00:00-03:00"),
            Some("2025-01-31T23:59:59-03:00"),
        );
        let resolved = range.resolve(&CivilZone::default()).expect("resolve");
        assert_eq!(resolved.from, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(resolved.to, NaiveDate::from_ymd_opt(2025, 1, 31));
    }

    #[test]
    fn range_rejects_garbage_and_reversed_bounds() {
        let zone = CivilZone::default();
        assert!(matches!(
            DateRange::new(Some("not-a-date"), None).resolve(&zone),
            Err(CoreError::InvalidRequestRange { field: "from", .. })
        ));
        assert_eq!(
            DateRange::new(Some("2025-02-01"), Some("2025-01-01")).resolve(&zone),
            Err(CoreError::ReversedRange)
        );
    }

    #[test]
    fn empty_bounds_are_unbounded() {
        let range = DateRange::new(Some(""), Some("  "));
        assert!(range.is_unbounded());
        assert_eq!(
            range.resolve(&CivilZone::default()).expect("resolve"),
            ResolvedRange::unbounded()
        );
    }

    #[test]
    fn selection_maps_to_sources() {
        assert_eq!(
            SeriesSelection::parse(None).expect("sel").sources(),
            SeriesKind::FETCHABLE.to_vec()
        );
        assert_eq!(
            SeriesSelection::parse(Some("conversion")).expect("sel").sources(),
            vec![SeriesKind::Leads, SeriesKind::Clients]
        );
        assert_eq!(
            SeriesSelection::parse(Some("session")).expect("sel"),
            SeriesSelection::Only(SeriesKind::Sessions)
        );
        assert!(SeriesSelection::parse(Some("surveys")).is_err());
        assert_eq!(SeriesKind::parse("Events"), SeriesKind::Clients);
    }

    #[test]
    fn mask_keeps_only_selected_field() {
        let mut record = OutputRecord {
            period: "01/01/2025".to_string(),
            leads: 5,
            clients: 2,
            sessions: 50,
            conversions: 40,
            sort_key: NaiveDate::from_ymd_opt(2025, 1, 1).expect("date"),
        };
        record.mask(SeriesSelection::Only(SeriesKind::Conversions));
        assert_eq!(
            (record.leads, record.clients, record.sessions, record.conversions),
            (0, 0, 0, 40)
        );
    }
}
