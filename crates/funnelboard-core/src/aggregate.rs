//! Metric aggregation: conversion-rate derivation and range totals.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::bucket::DailyBuckets;
use crate::error::CoreError;
use crate::series::{RawDataPoint, SeriesKind};
use crate::timezone::CivilZone;

/// Which pair of series a conversion rate is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionFunnel {
    /// `leads / sessions`
    SessionToLead,
    /// `clients / leads`
    LeadToClient,
}

impl ConversionFunnel {
    pub fn parse(raw: Option<&str>) -> Result<Option<Self>, CoreError> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        match raw.to_ascii_lowercase().as_str() {
            "session_lead" | "sessions_leads" => Ok(Some(ConversionFunnel::SessionToLead)),
            "lead_client" | "leads_clients" => Ok(Some(ConversionFunnel::LeadToClient)),
            _ => Err(CoreError::UnknownFunnel(raw.to_string())),
        }
    }

    /// Rounded percentage for one set of counts.
    pub fn rate(&self, sessions: u64, leads: u64, clients: u64) -> u64 {
        match self {
            ConversionFunnel::SessionToLead => conversion_rate(leads, sessions),
            ConversionFunnel::LeadToClient => conversion_rate(clients, leads),
        }
    }
}

/// How the `conversions` field of a bucket gets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionSource {
    /// A ratio of two other fields; recomputed after every summation.
    Derived(ConversionFunnel),
    /// An additive count supplied directly by the data.
    Counted,
}

impl ConversionSource {
    /// An explicit funnel wins. Otherwise leads+clients selects the
    /// lead→client funnel, sessions+leads the session→lead funnel, and
    /// anything else leaves conversions as a plain count.
    pub fn infer(explicit: Option<ConversionFunnel>, present: &BTreeSet<SeriesKind>) -> Self {
        if let Some(funnel) = explicit {
            return ConversionSource::Derived(funnel);
        }
        let has = |kind: SeriesKind| present.contains(&kind);
        if has(SeriesKind::Leads) && has(SeriesKind::Clients) {
            ConversionSource::Derived(ConversionFunnel::LeadToClient)
        } else if has(SeriesKind::Sessions) && has(SeriesKind::Leads) {
            ConversionSource::Derived(ConversionFunnel::SessionToLead)
        } else {
            ConversionSource::Counted
        }
    }

    /// Final conversions value for summed counts. `counted` is the summed
    /// raw conversions, used only when nothing is derived.
    pub fn resolve(&self, sessions: u64, leads: u64, clients: u64, counted: u64) -> u64 {
        match self {
            ConversionSource::Derived(funnel) => funnel.rate(sessions, leads, clients),
            ConversionSource::Counted => counted,
        }
    }
}

/// `round(100 * numerator / denominator)`, half away from zero, and 0 when
/// the denominator is 0.
pub fn conversion_rate(numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return 0;
    }
    let num = u128::from(numerator);
    let den = u128::from(denominator);
    let rounded = (200 * num + den) / (2 * den);
    u64::try_from(rounded).unwrap_or(u64::MAX)
}

/// Recompute `conversions` for every daily bucket.
pub fn apply_daily(buckets: &mut DailyBuckets, source: ConversionSource) {
    for bucket in buckets.values_mut() {
        bucket.conversions = source.resolve(
            bucket.sessions,
            bucket.leads,
            bucket.clients,
            bucket.conversions,
        );
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub sessions: u64,
    pub leads: u64,
    pub clients: u64,
    pub conversions: u64,
}

/// Range totals, with conversions recomputed from the summed counts.
///
/// Expects raw (not yet derived) daily buckets.
pub fn summarize(buckets: &DailyBuckets, source: ConversionSource) -> Totals {
    let mut totals = buckets.values().fold(Totals::default(), |mut acc, b| {
        acc.sessions = acc.sessions.saturating_add(b.sessions);
        acc.leads = acc.leads.saturating_add(b.leads);
        acc.clients = acc.clients.saturating_add(b.clients);
        acc.conversions = acc.conversions.saturating_add(b.conversions);
        acc
    });
    totals.conversions = source.resolve(
        totals.sessions,
        totals.leads,
        totals.clients,
        totals.conversions,
    );
    totals
}

/// One `conversions` point per civil date seen in either series, holding the
/// percentage of leads that became clients that day.
///
/// Points whose dates cannot be parsed are skipped.
pub fn lead_client_conversion_points(
    leads: &[RawDataPoint],
    clients: &[RawDataPoint],
    zone: &CivilZone,
) -> Vec<RawDataPoint> {
    let mut per_day: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    for point in leads {
        if let Ok(date) = zone.civil_date(&point.date) {
            let entry = per_day.entry(date).or_default();
            entry.0 = entry.0.saturating_add(point.count);
        }
    }
    for point in clients {
        if let Ok(date) = zone.civil_date(&point.date) {
            let entry = per_day.entry(date).or_default();
            entry.1 = entry.1.saturating_add(point.count);
        }
    }
    per_day
        .into_iter()
        .map(|(date, (leads, clients))| {
            RawDataPoint::new(
                date.format("%Y-%m-%d").to_string(),
                conversion_rate(clients, leads),
                SeriesKind::Conversions,
            )
        })
        .collect()
}
