//! Bounded retry with a fixed delay between attempts.

use std::future::Future;
use std::time::Duration;

use funnelboard_core::config::MAX_FETCH_RETRIES;

use crate::error::UpstreamError;

/// Run `operation`, retrying retriable failures up to `max_retries` more
/// times (never more than [`MAX_FETCH_RETRIES`]) with `backoff` between
/// attempts. Non-retriable errors return immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff: Duration,
    mut operation: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let max_retries = max_retries.min(MAX_FETCH_RETRIES);
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_retriable() || attempt >= max_retries {
            return Err(err);
        }

        attempt += 1;
        tracing::warn!(
            attempt,
            max_retries,
            backoff_ms = backoff.as_millis() as u64,
            error = %err,
            "upstream fetch failed, retrying"
        );
        tokio::time::sleep(backoff).await;
    }
}
