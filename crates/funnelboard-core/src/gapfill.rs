//! Zero-filling of missing calendar days.

use chrono::NaiveDate;
use tracing::debug;

use crate::bucket::DailyBuckets;
use crate::series::{DailyBucket, ResolvedRange};

/// Minimum number of distinct days before gaps are filled. A single day says
/// nothing about the intended span, so it is never expanded.
pub const MIN_DATES_FOR_FILL: usize = 2;

/// Insert a zero bucket for every missing day between the effective start and
/// end, inclusive. Returns the number of buckets inserted.
///
/// Effective start is the later of the earliest bucket and `range.from`;
/// effective end is the earlier of the latest bucket and `range.to`.
pub fn fill_gaps(buckets: &mut DailyBuckets, range: &ResolvedRange) -> usize {
    if buckets.len() < MIN_DATES_FOR_FILL {
        return 0;
    }
    let (Some(first), Some(last)) = (
        buckets.keys().next().copied(),
        buckets.keys().next_back().copied(),
    ) else {
        return 0;
    };

    let start = range.from.map_or(first, |from| first.max(from));
    let end = range.to.map_or(last, |to| last.min(to));

    let mut inserted = 0;
    let mut current = Some(start);
    while let Some(date) = current.filter(|d| *d <= end) {
        buckets.entry(date).or_insert_with(|| {
            inserted += 1;
            DailyBucket::empty(date)
        });
        current = date.succ_opt();
    }

    debug!(%start, %end, inserted, "filled daily gaps");
    inserted
}

/// Number of calendar days in `[start, end]`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}
