use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use funnelboard_core::aggregate::{lead_client_conversion_points, ConversionSource};
use funnelboard_core::pipeline::{self, PipelineInput};
use funnelboard_core::series::{RawDataPoint, SeriesKind};
use funnelboard_upstream::{fetch_series, FetchOutcome};

use crate::routes::query::{DashboardQuery, DashboardRequest};
use crate::{error::AppError, state::AppState};

/// Wrap `data` in the success envelope, adding `warnings` only when present.
pub(crate) fn envelope(data: Value, warnings: Vec<String>) -> Json<Value> {
    if warnings.is_empty() {
        Json(json!({ "data": data }))
    } else {
        Json(json!({ "data": data, "warnings": warnings }))
    }
}

/// Fetch every source the selection needs.
///
/// The token is cancelled when this future completes or is dropped, so an
/// abandoned request stops its in-flight upstream calls.
async fn fetch_selected(
    state: &AppState,
    request: &DashboardRequest,
) -> Result<FetchOutcome, AppError> {
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    let kinds = request.selection.sources();
    let outcome = fetch_series(Arc::clone(&state.source), &kinds, &request.window, &token)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    if outcome.all_failed() {
        return Err(AppError::Upstream(
            "all selected data sources are unavailable".to_string(),
        ));
    }
    Ok(outcome)
}

/// The funnel follows which sources were fetched, whether or not they
/// returned points, so a quiet range never switches the metric.
fn pipeline_input<'a>(
    request: &DashboardRequest,
    outcome: &'a FetchOutcome,
) -> PipelineInput<'a> {
    PipelineInput {
        points: &outcome.points,
        time_frame: request.time_frame,
        range: request.range,
        conversion: ConversionSource::infer(request.funnel, &outcome.fetched),
        selection: request.selection,
    }
}

/// `GET /api/dashboard`: aggregated, gap-filled rows for one time frame.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let request = query.validate(&state.config.zone)?;
    let outcome = fetch_selected(&state, &request).await?;

    let input = pipeline_input(&request, &outcome);
    let output = pipeline::run(&input, &state.pipeline_options());
    info!(
        records = output.records.len(),
        time_frame = ?request.time_frame,
        conversion = ?input.conversion,
        "dashboard aggregated"
    );

    let mut warnings = outcome.warnings.clone();
    warnings.extend(output.warnings());
    let data = serde_json::to_value(&output.records).map_err(anyhow::Error::from)?;
    Ok(envelope(data, warnings))
}

/// `GET /api/dashboard/summary`: range totals for the cards row.
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let request = query.validate(&state.config.zone)?;
    let outcome = fetch_selected(&state, &request).await?;

    let totals = pipeline::totals(&pipeline_input(&request, &outcome), &state.pipeline_options());
    let data = serde_json::to_value(totals).map_err(anyhow::Error::from)?;
    Ok(envelope(data, outcome.warnings))
}

/// `GET /api/dashboard/data`: the raw points behind the dashboard,
/// restricted to the range and the selection.
///
/// When both leads and clients returned points, one derived `conversions`
/// point per date carries the percentage of leads that became clients.
pub async fn raw_points(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let request = query.validate(&state.config.zone)?;
    let outcome = fetch_selected(&state, &request).await?;
    let zone = state.config.zone;

    let mut dropped = 0usize;
    let mut in_range: Vec<RawDataPoint> = Vec::with_capacity(outcome.points.len());
    for point in &outcome.points {
        match zone.civil_date(&point.date) {
            Ok(date) if request.range.contains(date) => in_range.push(point.clone()),
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, series = %point.kind, "dropping point with malformed date");
                dropped += 1;
            }
        }
    }

    let mut points: Vec<RawDataPoint> = in_range
        .iter()
        .filter(|p| request.selection.includes(p.kind))
        .cloned()
        .collect();

    let of = |kind: SeriesKind| -> Vec<RawDataPoint> {
        in_range.iter().filter(|p| p.kind == kind).cloned().collect()
    };
    let (leads, clients) = (of(SeriesKind::Leads), of(SeriesKind::Clients));
    if request.selection.includes(SeriesKind::Conversions)
        && !leads.is_empty()
        && !clients.is_empty()
    {
        points.extend(lead_client_conversion_points(&leads, &clients, &zone));
    }

    let mut warnings = outcome.warnings;
    if dropped > 0 {
        warnings.push(format!("dropped {dropped} point(s) with malformed dates"));
    }
    let data = serde_json::to_value(&points).map_err(anyhow::Error::from)?;
    Ok(envelope(data, warnings))
}
