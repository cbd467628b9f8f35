//! End-to-end aggregation over one request's raw points.
//!
//! Phases run in a fixed order and each is total over its input; the only
//! failure a point can cause is being dropped for a malformed date.

use std::fmt;

use tracing::debug;

use crate::aggregate::{self, ConversionSource, Totals};
use crate::bucket::{self, DailyBuckets};
use crate::format::{self, MonthLocale};
use crate::gapfill;
use crate::series::{
    OutputRecord, RawDataPoint, ResolvedRange, SeriesKind, SeriesSelection, TimeFrame,
};
use crate::timezone::CivilZone;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Fetching,
    Normalizing,
    Bucketing,
    GapFilling,
    Aggregating,
    Grouping,
    Formatting,
    Sorting,
    Done,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelinePhase::Fetching => "fetching",
            PipelinePhase::Normalizing => "normalizing",
            PipelinePhase::Bucketing => "bucketing",
            PipelinePhase::GapFilling => "gap_filling",
            PipelinePhase::Aggregating => "aggregating",
            PipelinePhase::Grouping => "grouping",
            PipelinePhase::Formatting => "formatting",
            PipelinePhase::Sorting => "sorting",
            PipelinePhase::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub zone: CivilZone,
    pub locale: MonthLocale,
}

#[derive(Debug, Clone)]
pub struct PipelineInput<'a> {
    pub points: &'a [RawDataPoint],
    pub time_frame: TimeFrame,
    pub range: ResolvedRange,
    pub conversion: ConversionSource,
    pub selection: SeriesSelection,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub records: Vec<OutputRecord>,
    /// Raw dates of points dropped as malformed.
    pub malformed: Vec<String>,
    /// Zero buckets synthesized by the gap filler.
    pub filled: usize,
}

impl PipelineOutput {
    pub fn warnings(&self) -> Vec<String> {
        if self.malformed.is_empty() {
            return Vec::new();
        }
        vec![format!(
            "dropped {} point(s) with malformed dates",
            self.malformed.len()
        )]
    }
}

/// Series kinds that actually have points in `points`.
pub fn kinds_present(points: &[RawDataPoint]) -> std::collections::BTreeSet<SeriesKind> {
    points
        .iter()
        .map(|p| p.kind)
        .filter(|k| *k != SeriesKind::Unknown)
        .collect()
}

fn enter(phase: PipelinePhase) {
    debug!(%phase, "pipeline phase");
}

fn daily_buckets(
    input: &PipelineInput<'_>,
    options: &PipelineOptions,
) -> (DailyBuckets, Vec<String>, usize) {
    enter(PipelinePhase::Normalizing);
    enter(PipelinePhase::Bucketing);
    let report = bucket::bucket_daily(input.points, &options.zone);

    enter(PipelinePhase::GapFilling);
    let mut buckets = report.buckets;
    let filled = gapfill::fill_gaps(&mut buckets, &input.range);
    let clipped = bucket::clip_to_range(&mut buckets, &input.range);
    if clipped > 0 {
        debug!(clipped, "dropped days outside the requested range");
    }
    (buckets, report.malformed, filled)
}

/// Run every phase after fetching and return chronologically ordered rows.
pub fn run(input: &PipelineInput<'_>, options: &PipelineOptions) -> PipelineOutput {
    let (mut buckets, malformed, filled) = daily_buckets(input, options);

    enter(PipelinePhase::Aggregating);
    aggregate::apply_daily(&mut buckets, input.conversion);

    let mut records = if input.time_frame == TimeFrame::Daily {
        enter(PipelinePhase::Formatting);
        format::daily_records(&buckets)
    } else {
        enter(PipelinePhase::Grouping);
        let groups = bucket::group_buckets(&buckets, input.time_frame, input.conversion);
        enter(PipelinePhase::Formatting);
        format::grouped_records(groups, input.time_frame, options.locale)
    };

    enter(PipelinePhase::Sorting);
    format::sort_chronological(&mut records);
    for record in &mut records {
        record.mask(input.selection);
    }

    enter(PipelinePhase::Done);
    debug!(
        records = records.len(),
        dropped = malformed.len(),
        filled,
        time_frame = ?input.time_frame,
        "pipeline finished"
    );
    PipelineOutput {
        records,
        malformed,
        filled,
    }
}

/// Range totals over the same bucketed, range-filtered data `run` sees.
pub fn totals(input: &PipelineInput<'_>, options: &PipelineOptions) -> Totals {
    let (buckets, _, _) = daily_buckets(input, options);
    let mut totals = aggregate::summarize(&buckets, input.conversion);
    let selection = input.selection;
    if !selection.includes(SeriesKind::Sessions) {
        totals.sessions = 0;
    }
    if !selection.includes(SeriesKind::Leads) {
        totals.leads = 0;
    }
    if !selection.includes(SeriesKind::Clients) {
        totals.clients = 0;
    }
    if !selection.includes(SeriesKind::Conversions) {
        totals.conversions = 0;
    }
    totals
}
