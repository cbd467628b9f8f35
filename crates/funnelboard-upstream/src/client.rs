use std::time::Duration;

use reqwest::{Client, Url};
use tracing::debug;

use funnelboard_core::config::Config;
use funnelboard_core::series::{RawDataPoint, SeriesKind};
use funnelboard_core::source::{decode_series_payload, FetchWindow, SeriesSource};

use crate::error::UpstreamError;
use crate::retry::retry_with_backoff;

/// HTTP client for the backend analytics API.
///
/// One GET per series, with a per-attempt timeout and bounded retries on
/// transient failures. Payloads are decoded leniently; see
/// [`decode_series_payload`].
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    backoff: Duration,
}

impl BackendClient {
    /// # Errors
    ///
    /// [`UpstreamError::InvalidUrl`] when `base_url` is not an absolute http(s)
    /// URL, [`UpstreamError::Http`] when the reqwest client cannot be built.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        max_retries: u32,
        backoff: Duration,
    ) -> Result<Self, UpstreamError> {
        let parsed = Url::parse(base_url).map_err(|e| UpstreamError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UpstreamError::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .user_agent(concat!("funnelboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
            backoff,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, UpstreamError> {
        Self::new(
            &config.api_url,
            config.fetch_timeout(),
            config.fetch_retries,
            config.retry_backoff(),
        )
    }

    /// Backend path segment for a fetchable series.
    pub fn endpoint(kind: SeriesKind) -> Option<&'static str> {
        match kind {
            SeriesKind::Sessions => Some("session"),
            SeriesKind::Leads => Some("lead"),
            SeriesKind::Clients => Some("client"),
            SeriesKind::Conversions | SeriesKind::Unknown => None,
        }
    }

    /// Query pairs for a window: all history when unbounded, otherwise the
    /// supplied bounds with per-period counts.
    pub fn query_pairs(window: &FetchWindow) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("count_only", "true".to_string())];
        if window.is_unbounded() {
            pairs.push(("all_data", "true".to_string()));
            return pairs;
        }
        if let Some(from) = &window.from {
            pairs.push(("from", from.clone()));
        }
        if let Some(to) = &window.to {
            pairs.push(("to", to.clone()));
        }
        pairs.push(("period", "true".to_string()));
        pairs
    }

    /// Fetch one series. Conversions have no endpoint of their own and come
    /// back empty.
    pub async fn fetch_series(
        &self,
        kind: SeriesKind,
        window: &FetchWindow,
    ) -> Result<Vec<RawDataPoint>, UpstreamError> {
        let Some(endpoint) = Self::endpoint(kind) else {
            debug!(series = %kind, "series has no backend endpoint");
            return Ok(Vec::new());
        };
        let url = format!("{}/{endpoint}/", self.base_url);
        let query = Self::query_pairs(window);

        let payload = retry_with_backoff(self.max_retries, self.backoff, || {
            let url = url.clone();
            let query = &query;
            async move {
                let response = self
                    .client
                    .get(&url)
                    .query(query)
                    .send()
                    .await
                    .map_err(|e| classify(e, &url))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(UpstreamError::UnexpectedStatus {
                        status: status.as_u16(),
                        url,
                    });
                }

                let body = response.text().await.map_err(|e| classify(e, &url))?;
                serde_json::from_str::<serde_json::Value>(&body).map_err(|source| {
                    UpstreamError::Deserialize {
                        context: url,
                        source,
                    }
                })
            }
        })
        .await?;

        let points = decode_series_payload(kind, &payload);
        debug!(series = %kind, points = points.len(), "fetched series");
        Ok(points)
    }
}

fn classify(err: reqwest::Error, url: &str) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout {
            url: url.to_string(),
        }
    } else {
        UpstreamError::Http(err)
    }
}

#[async_trait::async_trait]
impl SeriesSource for BackendClient {
    async fn fetch(
        &self,
        kind: SeriesKind,
        window: &FetchWindow,
    ) -> anyhow::Result<Vec<RawDataPoint>> {
        Ok(self.fetch_series(kind, window).await?)
    }
}
