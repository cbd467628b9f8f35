//! Daily bucketing and week/month/year re-bucketing.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use tracing::warn;

use crate::aggregate::ConversionSource;
use crate::series::{DailyBucket, GroupedBucket, RawDataPoint, ResolvedRange, TimeFrame};
use crate::timezone::CivilZone;

/// Daily buckets keyed by civil date. Iteration order is chronological.
pub type DailyBuckets = BTreeMap<NaiveDate, DailyBucket>;

#[derive(Debug, Default)]
pub struct BucketReport {
    pub buckets: DailyBuckets,
    /// Raw date strings that could not be parsed.
    pub malformed: Vec<String>,
}

/// Group raw points into one bucket per civil day.
///
/// Counts for the same day and type accumulate. A point of unknown type still
/// opens a bucket for its day but contributes nothing. Points with malformed
/// dates are dropped and reported. The request range is not applied here:
/// days outside it still anchor the gap filler and are removed afterwards by
/// [`clip_to_range`].
pub fn bucket_daily(points: &[RawDataPoint], zone: &CivilZone) -> BucketReport {
    let mut report = BucketReport::default();
    for point in points {
        let date = match zone.civil_date(&point.date) {
            Ok(date) => date,
            Err(e) => {
                warn!(error = %e, series = %point.kind, "dropping point with malformed date");
                report.malformed.push(point.date.clone());
                continue;
            }
        };
        report
            .buckets
            .entry(date)
            .or_insert_with(|| DailyBucket::empty(date))
            .add(point.kind, point.count);
    }
    report
}

/// Remove every bucket whose day falls outside `range`. Returns how many
/// were removed.
pub fn clip_to_range(buckets: &mut DailyBuckets, range: &ResolvedRange) -> usize {
    let before = buckets.len();
    buckets.retain(|date, _| range.contains(*date));
    before - buckets.len()
}

/// First civil date of the group containing `date`. Weeks start on Monday.
pub fn group_start(date: NaiveDate, time_frame: TimeFrame) -> NaiveDate {
    match time_frame {
        TimeFrame::Daily => date,
        TimeFrame::Weekly => {
            date - chrono::Duration::days(i64::from(date.weekday().num_days_from_monday()))
        }
        TimeFrame::Monthly => date.with_day(1).unwrap_or(date),
        TimeFrame::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
    }
}

/// Stable text key of the group starting at `start`.
pub fn group_key(start: NaiveDate, time_frame: TimeFrame) -> String {
    match time_frame {
        TimeFrame::Daily | TimeFrame::Weekly => start.format("%Y-%m-%d").to_string(),
        TimeFrame::Monthly => start.format("%Y-%m").to_string(),
        TimeFrame::Yearly => start.format("%Y").to_string(),
    }
}

/// Re-bucket daily buckets into `time_frame` groups, in chronological order.
///
/// Counts are summed. A derived conversion rate is recomputed from the summed
/// counts, never summed or averaged; counted conversions are summed.
pub fn group_buckets(
    daily: &DailyBuckets,
    time_frame: TimeFrame,
    conversion: ConversionSource,
) -> Vec<GroupedBucket> {
    let mut groups: BTreeMap<NaiveDate, GroupedBucket> = BTreeMap::new();
    for (date, bucket) in daily {
        let start = group_start(*date, time_frame);
        let group = groups.entry(start).or_insert_with(|| GroupedBucket {
            period: group_key(start, time_frame),
            leads: 0,
            clients: 0,
            sessions: 0,
            conversions: 0,
            start_date: *date,
            end_date: *date,
        });
        group.leads = group.leads.saturating_add(bucket.leads);
        group.clients = group.clients.saturating_add(bucket.clients);
        group.sessions = group.sessions.saturating_add(bucket.sessions);
        group.conversions = group.conversions.saturating_add(bucket.conversions);
        group.start_date = group.start_date.min(*date);
        group.end_date = group.end_date.max(*date);
    }

    groups
        .into_values()
        .map(|mut group| {
            group.conversions =
                conversion.resolve(group.sessions, group.leads, group.clients, group.conversions);
            group
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ConversionFunnel;
    use crate::series::SeriesKind;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn point(date: &str, count: u64, kind: SeriesKind) -> RawDataPoint {
        RawDataPoint::new(date, count, kind)
    }

    fn daily(rows: &[(NaiveDate, u64, u64)]) -> DailyBuckets {
        rows.iter()
            .map(|(date, leads, sessions)| {
                let mut b = DailyBucket::empty(*date);
                b.leads = *leads;
                b.sessions = *sessions;
                (*date, b)
            })
            .collect()
    }

    #[test]
    fn same_day_and_type_accumulates() {
        let points = vec![
            point("2025-01-01", 3, SeriesKind::Leads),
            point("2025-01-01T10:00:00-03:00", 4, SeriesKind::Leads),
            point("2025-01-01", 9, SeriesKind::Sessions),
        ];
        let report = bucket_daily(&points, &CivilZone::default());
        let bucket = report.buckets[&ymd(2025, 1, 1)];
        assert_eq!(bucket.leads, 7);
        assert_eq!(bucket.sessions, 9);
        assert_eq!(report.buckets.len(), 1);
    }

    #[test]
    fn bucketing_is_idempotent() {
        let points = vec![
            point("2025-01-01", 3, SeriesKind::Leads),
            point("2025-01-04", 2, SeriesKind::Clients),
        ];
        let zone = CivilZone::default();
        let first = bucket_daily(&points, &zone);
        let second = bucket_daily(&points, &zone);
        assert_eq!(first.buckets, second.buckets);
    }

    #[test]
    fn unknown_type_opens_empty_bucket() {
        let points = vec![point("2025-01-02", 50, SeriesKind::Unknown)];
        let report = bucket_daily(&points, &CivilZone::default());
        assert_eq!(
            report.buckets[&ymd(2025, 1, 2)],
            DailyBucket::empty(ymd(2025, 1, 2))
        );
    }

    #[test]
    fn malformed_points_are_dropped_but_out_of_range_days_are_kept() {
        let points = vec![
            point("not a date", 1, SeriesKind::Leads),
            point("2024-12-31", 1, SeriesKind::Leads),
            point("2025-01-01", 1, SeriesKind::Leads),
        ];
        let report = bucket_daily(&points, &CivilZone::default());
        assert_eq!(report.malformed, vec!["not a date".to_string()]);
        assert_eq!(report.buckets.len(), 2);
    }

    #[test]
    fn clipping_removes_days_outside_the_range() {
        let mut buckets = daily(&[
            (ymd(2024, 12, 31), 1, 1),
            (ymd(2025, 1, 1), 1, 1),
            (ymd(2025, 1, 31), 1, 1),
            (ymd(2025, 2, 1), 1, 1),
        ]);
        let range = ResolvedRange::between(ymd(2025, 1, 1), ymd(2025, 1, 31));
        assert_eq!(clip_to_range(&mut buckets, &range), 2);
        let keys: Vec<_> = buckets.keys().copied().collect();
        assert_eq!(keys, vec![ymd(2025, 1, 1), ymd(2025, 1, 31)]);

        assert_eq!(clip_to_range(&mut buckets, &ResolvedRange::unbounded()), 0);
    }

    #[test]
    fn utc_evening_lands_on_previous_civil_day() {
        let points = vec![point("2025-02-01T02:00:00Z", 1, SeriesKind::Sessions)];
        let report = bucket_daily(&points, &CivilZone::default());
        assert!(report.buckets.contains_key(&ymd(2025, 1, 31)));
    }

    #[test]
    fn weeks_start_on_monday() {
        // 2025-01-05 is a Sunday.
        assert_eq!(group_start(ymd(2025, 1, 5), TimeFrame::Weekly), ymd(2024, 12, 30));
        assert_eq!(group_start(ymd(2025, 1, 6), TimeFrame::Weekly), ymd(2025, 1, 6));
        assert_eq!(group_start(ymd(2025, 3, 17), TimeFrame::Monthly), ymd(2025, 3, 1));
        assert_eq!(group_start(ymd(2025, 3, 17), TimeFrame::Yearly), ymd(2025, 1, 1));
    }

    #[test]
    fn grouped_conversions_are_recomputed_not_averaged() {
        // 2025-01-06 is a Monday; both days share a week.
        let buckets = daily(&[(ymd(2025, 1, 6), 5, 10), (ymd(2025, 1, 7), 0, 0)]);
        let grouped = group_buckets(
            &buckets,
            TimeFrame::Weekly,
            ConversionSource::Derived(ConversionFunnel::SessionToLead),
        );
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].conversions, 50);
        assert_eq!(grouped[0].period, "2025-01-06");
        assert_eq!(grouped[0].start_date, ymd(2025, 1, 6));
        assert_eq!(grouped[0].end_date, ymd(2025, 1, 7));
    }

    #[test]
    fn grouped_conversions_weight_by_volume() {
        let buckets = daily(&[(ymd(2025, 1, 6), 1, 10), (ymd(2025, 1, 7), 90, 90)]);
        let grouped = group_buckets(
            &buckets,
            TimeFrame::Weekly,
            ConversionSource::Derived(ConversionFunnel::SessionToLead),
        );
        // 91/100, where averaging the daily rates (10% and 100%) would give 55.
        assert_eq!(grouped[0].conversions, 91);
    }

    #[test]
    fn counted_conversions_are_summed() {
        let mut buckets = daily(&[(ymd(2025, 1, 1), 0, 0), (ymd(2025, 1, 20), 0, 0)]);
        for b in buckets.values_mut() {
            b.conversions = 3;
        }
        let grouped = group_buckets(&buckets, TimeFrame::Monthly, ConversionSource::Counted);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].period, "2025-01");
        assert_eq!(grouped[0].conversions, 6);
    }

    #[test]
    fn groups_come_out_chronologically() {
        let buckets = daily(&[
            (ymd(2024, 12, 31), 1, 1),
            (ymd(2025, 1, 1), 1, 1),
            (ymd(2025, 2, 1), 1, 1),
        ]);
        let grouped = group_buckets(&buckets, TimeFrame::Yearly, ConversionSource::Counted);
        let keys: Vec<_> = grouped.iter().map(|g| g.period.as_str()).collect();
        assert_eq!(keys, vec!["2024", "2025"]);
    }
}
