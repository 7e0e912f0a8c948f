use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_MODEL;
use crate::matching::scan::{DEFAULT_BATCH_WIDTH, DEFAULT_CHUNK_PAUSE};
use crate::matching::ScanOptions;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a number is malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// No URL means extraction results are cached in process memory.
    pub redis_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub scan_batch_width: usize,
    pub scan_chunk_pause_ms: u64,
    /// Needed only to refresh inbox tokens server-side.
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model: optional_env("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            redis_url: optional_env("REDIS_URL"),
            cache_ttl_secs: parse_env("CACHE_TTL_SECS", 3600)?,
            scan_batch_width: parse_env("SCAN_BATCH_WIDTH", DEFAULT_BATCH_WIDTH)?,
            scan_chunk_pause_ms: parse_env(
                "SCAN_CHUNK_PAUSE_MS",
                DEFAULT_CHUNK_PAUSE.as_millis() as u64,
            )?,
            google_client_id: optional_env("GOOGLE_CLIENT_ID"),
            google_client_secret: optional_env("GOOGLE_CLIENT_SECRET"),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Scan options for a request, optionally overriding the batch width.
    pub fn scan_options(&self, batch_width: Option<usize>) -> ScanOptions {
        ScanOptions {
            width: batch_width.unwrap_or(self.scan_batch_width),
            chunk_pause: Duration::from_millis(self.scan_chunk_pause_ms),
            ..ScanOptions::default()
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            gemini_api_key: "key".to_string(),
            gemini_model: DEFAULT_MODEL.to_string(),
            redis_url: None,
            cache_ttl_secs: 3600,
            scan_batch_width: 4,
            scan_chunk_pause_ms: 50,
            google_client_id: None,
            google_client_secret: None,
            port: 8080,
            rust_log: "info".to_string(),
        }
    }

    #[test]
    fn test_scan_options_use_configured_defaults() {
        let options = config().scan_options(None);
        assert_eq!(options.width, 4);
        assert_eq!(options.chunk_pause, Duration::from_millis(50));
    }

    #[test]
    fn test_scan_options_request_width_overrides() {
        assert_eq!(config().scan_options(Some(1)).width, 1);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("JOBFLOW_TEST_WIDTH", "four");
        assert!(parse_env::<usize>("JOBFLOW_TEST_WIDTH", 4).is_err());
        std::env::set_var("JOBFLOW_TEST_WIDTH", " 8 ");
        assert_eq!(parse_env::<usize>("JOBFLOW_TEST_WIDTH", 4).unwrap(), 8);
        std::env::remove_var("JOBFLOW_TEST_WIDTH");
        assert_eq!(parse_env::<usize>("JOBFLOW_TEST_WIDTH", 4).unwrap(), 4);
    }
}
