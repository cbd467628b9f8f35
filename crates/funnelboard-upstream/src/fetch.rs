//! Concurrent fetching of the series a request needs.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use funnelboard_core::pipeline::PipelinePhase;
use funnelboard_core::series::{RawDataPoint, SeriesKind};
use funnelboard_core::source::{FetchWindow, SeriesSource};

use crate::error::UpstreamError;

/// Everything the fetch step learned about a request's sources.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Points from every source that answered, in request order.
    pub points: Vec<RawDataPoint>,
    /// Sources that answered, even with an empty series.
    pub fetched: BTreeSet<SeriesKind>,
    /// Sources that could not be reached.
    pub failed: Vec<SeriesKind>,
    pub warnings: Vec<String>,
}

impl FetchOutcome {
    /// True when at least one source was requested and none answered.
    pub fn all_failed(&self) -> bool {
        self.fetched.is_empty() && !self.failed.is_empty()
    }

    pub fn points_of(&self, kind: SeriesKind) -> Vec<RawDataPoint> {
        self.points
            .iter()
            .filter(|p| p.kind == kind)
            .cloned()
            .collect()
    }
}

/// Fetch every kind in `kinds` concurrently.
///
/// A failing source is logged, recorded as a warning and contributes no
/// points; the other sources still count. When `token` fires, outstanding
/// fetches are aborted and [`UpstreamError::Cancelled`] is returned.
pub async fn fetch_series(
    source: Arc<dyn SeriesSource>,
    kinds: &[SeriesKind],
    window: &FetchWindow,
    token: &CancellationToken,
) -> Result<FetchOutcome, UpstreamError> {
    debug!(phase = %PipelinePhase::Fetching, sources = kinds.len(), "pipeline phase");
    let mut tasks = JoinSet::new();
    for (index, kind) in kinds.iter().copied().enumerate() {
        let source = Arc::clone(&source);
        let window = window.clone();
        tasks.spawn(async move { (index, kind, source.fetch(kind, &window).await) });
    }

    let mut results = Vec::with_capacity(kinds.len());
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tasks.abort_all();
                return Err(UpstreamError::Cancelled);
            }
            next = tasks.join_next() => match next {
                Some(Ok(result)) => results.push(result),
                Some(Err(join_err)) => {
                    warn!(error = %join_err, "fetch task failed to complete");
                }
                None => break,
            },
        }
    }
    results.sort_by_key(|(index, _, _)| *index);

    let mut outcome = FetchOutcome::default();
    for (_, kind, result) in results {
        match result {
            Ok(points) => {
                outcome.fetched.insert(kind);
                outcome.points.extend(points);
            }
            Err(e) => {
                warn!(series = %kind, error = %e, "series source unavailable");
                outcome.failed.push(kind);
                outcome.warnings.push(format!("{kind} data unavailable"));
            }
        }
    }
    // A panicked task leaves its kind in neither set.
    for kind in kinds {
        if !outcome.fetched.contains(kind) && !outcome.failed.contains(kind) {
            outcome.failed.push(*kind);
            outcome.warnings.push(format!("{kind} data unavailable"));
        }
    }
    Ok(outcome)
}
