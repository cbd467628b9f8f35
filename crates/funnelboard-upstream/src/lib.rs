//! HTTP access to the backend analytics API.

pub mod client;
pub mod error;
pub mod fetch;
mod retry;

pub use client::BackendClient;
pub use error::UpstreamError;
pub use fetch::{fetch_series, FetchOutcome};
