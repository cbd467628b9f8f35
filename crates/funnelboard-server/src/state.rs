use std::sync::Arc;

use funnelboard_core::pipeline::PipelineOptions;
use funnelboard_core::source::SeriesSource;

use crate::config::Config;

/// Shared application state injected into every handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Where series come from. The backend HTTP client in production, an
    /// in-memory stub in tests.
    pub source: Arc<dyn SeriesSource>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(source: Arc<dyn SeriesSource>, config: Config) -> Self {
        Self {
            source,
            config: Arc::new(config),
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            zone: self.config.zone,
            locale: self.config.locale,
        }
    }
}
