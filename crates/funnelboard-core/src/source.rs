//! Upstream data-source abstraction.

use serde_json::Value;

use crate::series::{count_from_value, RawDataPoint, SeriesKind};

/// Request window forwarded to a source. Bounds are passed through verbatim;
/// an absent pair asks for all history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchWindow {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl FetchWindow {
    pub fn new(from: Option<&str>, to: Option<&str>) -> Self {
        let keep = |raw: Option<&str>| {
            raw.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            from: keep(from),
            to: keep(to),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Anything that can return the raw points of one series.
///
/// Implementations return an error when the source is unavailable; an empty
/// series is `Ok(vec![])`.
#[async_trait::async_trait]
pub trait SeriesSource: Send + Sync + 'static {
    async fn fetch(&self, kind: SeriesKind, window: &FetchWindow)
        -> anyhow::Result<Vec<RawDataPoint>>;
}

/// Decode one series payload.
///
/// Two shapes are understood: an array of `{date, count}` objects and an
/// object with a `periods` map of `date -> count`. Every decoded point is
/// tagged with `kind`, whatever the payload says. Anything else decodes to an
/// empty series.
pub fn decode_series_payload(kind: SeriesKind, payload: &Value) -> Vec<RawDataPoint> {
    match payload {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let date = item.get("date")?.as_str()?;
                let count = item.get("count").map_or(0, count_from_value);
                Some(RawDataPoint::new(date, count, kind))
            })
            .collect(),
        Value::Object(map) => match map.get("periods") {
            Some(Value::Object(periods)) => periods
                .iter()
                .map(|(date, count)| {
                    RawDataPoint::new(date.as_str(), count_from_value(count), kind)
                })
                .collect(),
            Some(nested @ Value::Array(_)) => decode_series_payload(kind, nested),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_array_payload() {
        let payload = json!([
            {"date": "2025-01-01", "count": 4},
            {"date": "2025-01-02", "count": "7"},
            {"date": "2025-01-03"},
            {"count": 9}
        ]);
        let points = decode_series_payload(SeriesKind::Leads, &payload);
        let view: Vec<_> = points.iter().map(|p| (p.date.as_str(), p.count)).collect();
        assert_eq!(
            view,
            vec![("2025-01-01", 4), ("2025-01-02", 7), ("2025-01-03", 0)]
        );
        assert!(points.iter().all(|p| p.kind == SeriesKind::Leads));
    }

    #[test]
    fn decodes_periods_payload() {
        let payload = json!({"periods": {"2025-01-02": 3, "2025-01-01": null}});
        let points = decode_series_payload(SeriesKind::Sessions, &payload);
        assert_eq!(points.len(), 2);
        assert!(points
            .iter()
            .any(|p| p.date == "2025-01-02" && p.count == 3));
        assert!(points
            .iter()
            .any(|p| p.date == "2025-01-01" && p.count == 0));
    }

    #[test]
    fn unknown_shapes_are_empty() {
        assert!(decode_series_payload(SeriesKind::Clients, &json!({"total": 3})).is_empty());
        assert!(decode_series_payload(SeriesKind::Clients, &json!("oops")).is_empty());
        assert!(decode_series_payload(SeriesKind::Clients, &json!(null)).is_empty());
    }

    #[test]
    fn window_ignores_blank_bounds() {
        let window = FetchWindow::new(Some(" "), None);
        assert!(window.is_unbounded());
        let window = FetchWindow::new(Some("2025-01-01"), Some("2025-01-31"));
        assert_eq!(window.from.as_deref(), Some("2025-01-01"));
    }
}
