use serde::Deserialize;

use funnelboard_core::aggregate::ConversionFunnel;
use funnelboard_core::series::{DateRange, ResolvedRange, SeriesSelection, TimeFrame};
use funnelboard_core::source::FetchWindow;
use funnelboard_core::timezone::CivilZone;

use crate::error::AppError;

/// Query string shared by the dashboard GET routes.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(rename = "timeFrame")]
    pub time_frame: Option<String>,
    #[serde(rename = "cardType")]
    pub card_type: Option<String>,
    pub funnel: Option<String>,
}

/// A validated dashboard request.
#[derive(Debug, Clone)]
pub(crate) struct DashboardRequest {
    pub range: ResolvedRange,
    pub window: FetchWindow,
    pub time_frame: TimeFrame,
    pub selection: SeriesSelection,
    pub funnel: Option<ConversionFunnel>,
}

impl DashboardQuery {
    /// Validate every parameter. An unusable `from`/`to`, an unknown
    /// `timeFrame`, `cardType` or `funnel` is a 400.
    pub(crate) fn validate(&self, zone: &CivilZone) -> Result<DashboardRequest, AppError> {
        let range = DateRange::new(self.from.as_deref(), self.to.as_deref()).resolve(zone)?;
        Ok(DashboardRequest {
            range,
            window: FetchWindow::new(self.from.as_deref(), self.to.as_deref()),
            time_frame: TimeFrame::parse(self.time_frame.as_deref())?,
            selection: SeriesSelection::parse(self.card_type.as_deref())?,
            funnel: ConversionFunnel::parse(self.funnel.as_deref())?,
        })
    }
}
