//! Period labels and chronological ordering.
//!
//! Labels are lossy (`DD/MM - DD/MM` has no year, month abbreviations do not
//! sort lexically), so every record carries the first civil date it covers
//! and ordering uses that date, never the label.

use chrono::{Datelike, NaiveDate};

use crate::bucket::DailyBuckets;
use crate::series::{GroupedBucket, OutputRecord, TimeFrame};

const MONTHS_EN: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const MONTHS_PT: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MonthLocale {
    #[default]
    English,
    Portuguese,
}

impl MonthLocale {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en_us" => Some(MonthLocale::English),
            "pt" | "pt-br" | "pt_br" => Some(MonthLocale::Portuguese),
            _ => None,
        }
    }

    pub fn abbreviation(&self, month: u32) -> &'static str {
        let table = match self {
            MonthLocale::English => &MONTHS_EN,
            MonthLocale::Portuguese => &MONTHS_PT,
        };
        table[(month.clamp(1, 12) - 1) as usize]
    }
}

/// Display label for the period starting at `start`.
pub fn format_period(start: NaiveDate, time_frame: TimeFrame, locale: MonthLocale) -> String {
    match time_frame {
        TimeFrame::Daily => start.format("%d/%m/%Y").to_string(),
        TimeFrame::Weekly => {
            let monday = crate::bucket::group_start(start, TimeFrame::Weekly);
            let sunday = monday + chrono::Duration::days(6);
            format!("{} - {}", monday.format("%d/%m"), sunday.format("%d/%m"))
        }
        TimeFrame::Monthly => format!("{} {:04}", locale.abbreviation(start.month()), start.year()),
        TimeFrame::Yearly => format!("{:04}", start.year()),
    }
}

/// Inverse of the `Daily` label.
pub fn parse_daily_label(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(label.trim(), "%d/%m/%Y").ok()
}

/// One record per daily bucket, labelled `DD/MM/YYYY`.
pub fn daily_records(buckets: &DailyBuckets) -> Vec<OutputRecord> {
    buckets
        .values()
        .map(|b| OutputRecord {
            period: format_period(b.period, TimeFrame::Daily, MonthLocale::default()),
            leads: b.leads,
            clients: b.clients,
            sessions: b.sessions,
            conversions: b.conversions,
            sort_key: b.period,
        })
        .collect()
}

/// One record per group. The group's start and end dates are dropped; only
/// the sort key survives.
pub fn grouped_records(
    groups: Vec<GroupedBucket>,
    time_frame: TimeFrame,
    locale: MonthLocale,
) -> Vec<OutputRecord> {
    groups
        .into_iter()
        .map(|g| {
            let sort_key = crate::bucket::group_start(g.start_date, time_frame);
            OutputRecord {
                period: format_period(sort_key, time_frame, locale),
                leads: g.leads,
                clients: g.clients,
                sessions: g.sessions,
                conversions: g.conversions,
                sort_key,
            }
        })
        .collect()
}

/// Stable ascending sort by each record's underlying date.
pub fn sort_chronological(records: &mut [OutputRecord]) {
    records.sort_by_key(|r| r.sort_key);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn record(period: &str, sort_key: NaiveDate) -> OutputRecord {
        OutputRecord {
            period: period.to_string(),
            leads: 0,
            clients: 0,
            sessions: 0,
            conversions: 0,
            sort_key,
        }
    }

    #[test]
    fn labels_per_time_frame() {
        let d = ymd(2025, 3, 5); // Wednesday
        let en = MonthLocale::English;
        assert_eq!(format_period(d, TimeFrame::Daily, en), "05/03/2025");
        assert_eq!(format_period(d, TimeFrame::Weekly, en), "03/03 - 09/03");
        assert_eq!(format_period(d, TimeFrame::Monthly, en), "Mar 2025");
        assert_eq!(format_period(d, TimeFrame::Yearly, en), "2025");
    }

    #[test]
    fn portuguese_month_abbreviations() {
        let pt = MonthLocale::Portuguese;
        assert_eq!(format_period(ymd(2025, 2, 1), TimeFrame::Monthly, pt), "Fev 2025");
        assert_eq!(format_period(ymd(2025, 12, 1), TimeFrame::Monthly, pt), "Dez 2025");
        assert_eq!(MonthLocale::parse("pt-BR"), Some(MonthLocale::Portuguese));
        assert_eq!(MonthLocale::parse("fr"), None);
    }

    #[test]
    fn weekly_label_spans_year_boundary() {
        assert_eq!(
            format_period(ymd(2025, 1, 1), TimeFrame::Weekly, MonthLocale::English),
            "30/12 - 05/01"
        );
    }

    #[test]
    fn daily_label_round_trips() {
        let d = ymd(2025, 3, 5);
        let label = format_period(d, TimeFrame::Daily, MonthLocale::English);
        assert_eq!(parse_daily_label(&label), Some(d));
    }

    #[test]
    fn sorts_by_date_not_by_label() {
        let mut records = vec![
            record("Mar 2025", ymd(2025, 3, 1)),
            record("Dec 2024", ymd(2024, 12, 1)),
            record("Apr 2025", ymd(2025, 4, 1)),
        ];
        sort_chronological(&mut records);
        let labels: Vec<_> = records.iter().map(|r| r.period.as_str()).collect();
        assert_eq!(labels, vec!["Dec 2024", "Mar 2025", "Apr 2025"]);
    }

    #[test]
    fn weekly_sort_survives_december_to_january() {
        let mut records = vec![
            record("06/01 - 12/01", ymd(2025, 1, 6)),
            record("23/12 - 29/12", ymd(2024, 12, 23)),
            record("30/12 - 05/01", ymd(2024, 12, 30)),
        ];
        sort_chronological(&mut records);
        let labels: Vec<_> = records.iter().map(|r| r.period.as_str()).collect();
        assert_eq!(
            labels,
            vec!["23/12 - 29/12", "30/12 - 05/01", "06/01 - 12/01"]
        );
    }
}
