use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("malformed date: {0:?}")]
    MalformedDate(String),

    #[error("invalid {field} (expected YYYY-MM-DD or an ISO-8601 timestamp): {value:?}")]
    InvalidRequestRange { field: &'static str, value: String },

    #[error("to must be on or after from")]
    ReversedRange,

    #[error("timeFrame must be one of: Daily, Weekly, Monthly, Yearly")]
    UnknownTimeFrame(String),

    #[error("cardType must be one of: sessions, leads, clients, conversions")]
    UnknownSelection(String),

    #[error("funnel must be one of: session_lead, lead_client")]
    UnknownFunnel(String),

    #[error("invalid timezone: {0:?}")]
    InvalidTimezone(String),
}

impl CoreError {
    /// Errors that come from the caller's request rather than from data.
    pub fn is_request_error(&self) -> bool {
        !matches!(self, CoreError::MalformedDate(_))
    }
}
