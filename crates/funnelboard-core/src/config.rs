use std::time::Duration;

use crate::format::MonthLocale;
use crate::timezone::CivilZone;

/// Upper bound on additional fetch attempts after the first one.
pub const MAX_FETCH_RETRIES: u32 = 2;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub api_url: String,
    pub fetch_timeout_ms: u64,
    pub fetch_retries: u32,
    pub retry_backoff_ms: u64,
    pub zone: CivilZone,
    pub locale: MonthLocale,
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            api_url: "http://localhost:8080".to_string(),
            fetch_timeout_ms: 10_000,
            fetch_retries: MAX_FETCH_RETRIES,
            retry_backoff_ms: 500,
            zone: CivilZone::default(),
            locale: MonthLocale::default(),
            cors_origins: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys fall back to defaults;
    /// set but invalid values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            port: match var("FUNNELBOARD_PORT") {
                Some(raw) => raw.parse().map_err(|e| format!("invalid port: {e}"))?,
                None => defaults.port,
            },
            api_url: var("FUNNELBOARD_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            fetch_timeout_ms: match var("FUNNELBOARD_FETCH_TIMEOUT_MS") {
                Some(raw) => raw
                    .parse()
                    .map_err(|e| format!("invalid fetch timeout: {e}"))?,
                None => defaults.fetch_timeout_ms,
            },
            fetch_retries: var("FUNNELBOARD_FETCH_RETRIES")
                .and_then(|raw| raw.parse::<u32>().ok())
                .unwrap_or(defaults.fetch_retries)
                .min(MAX_FETCH_RETRIES),
            retry_backoff_ms: var("FUNNELBOARD_RETRY_BACKOFF_MS")
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.retry_backoff_ms),
            zone: match var("FUNNELBOARD_TIMEZONE") {
                Some(raw) => CivilZone::parse(&raw).map_err(|e| e.to_string())?,
                None => defaults.zone,
            },
            locale: match var("FUNNELBOARD_MONTH_LOCALE") {
                Some(raw) => MonthLocale::parse(&raw)
                    .ok_or_else(|| format!("unsupported month locale: {raw}"))?,
                None => defaults.locale,
            },
            cors_origins: var("FUNNELBOARD_CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
