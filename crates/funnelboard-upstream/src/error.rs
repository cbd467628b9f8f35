use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("fetch cancelled")]
    Cancelled,

    #[error("invalid API URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl UpstreamError {
    /// Transient failures worth another attempt: network errors, timeouts,
    /// 429 and 5xx responses.
    pub fn is_retriable(&self) -> bool {
        match self {
            UpstreamError::Http(_) | UpstreamError::Timeout { .. } => true,
            UpstreamError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
