use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use funnelboard_core::aggregate::{ConversionFunnel, ConversionSource};
use funnelboard_core::pipeline::{self, kinds_present, PipelineInput};
use funnelboard_core::series::{DateRange, RawDataPoint, SeriesSelection, TimeFrame};

use crate::routes::dashboard::envelope;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ProcessBody {
    #[serde(default)]
    pub data: Vec<RawDataPoint>,
    #[serde(rename = "timeFrame")]
    pub time_frame: Option<String>,
    #[serde(rename = "dateRange", default)]
    pub date_range: Option<DateRange>,
    #[serde(rename = "cardType")]
    pub card_type: Option<String>,
    pub funnel: Option<String>,
}

/// `POST /api/dashboard/process`: run the pipeline over caller-supplied
/// points. Nothing is fetched.
pub async fn process(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProcessBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let range = body
        .date_range
        .unwrap_or_default()
        .resolve(&state.config.zone)?;
    let funnel = ConversionFunnel::parse(body.funnel.as_deref())?;
    let input = PipelineInput {
        points: &body.data,
        time_frame: TimeFrame::parse(body.time_frame.as_deref())?,
        range,
        conversion: ConversionSource::infer(funnel, &kinds_present(&body.data)),
        selection: SeriesSelection::parse(body.card_type.as_deref())?,
    };

    let output = pipeline::run(&input, &state.pipeline_options());
    tracing::debug!(
        points = body.data.len(),
        records = output.records.len(),
        "processed supplied points"
    );
    let data = serde_json::to_value(&output.records).map_err(anyhow::Error::from)?;
    Ok(envelope(data, output.warnings()))
}
