//! Configuration management for the dashboard and board client

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the health board API, including the `/api` prefix
    pub base_url: String,

    /// How often the dashboard re-fetches health data
    pub poll_interval: Duration,

    /// HTTP timeout for board requests
    pub http_timeout: Duration,

    /// File backing the preference cookie jar
    pub cookie_file: Option<PathBuf>,

    /// Where the rendered dashboard page is written
    pub output_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/api".to_string(),
            poll_interval: Duration::from_millis(30_000),
            http_timeout: Duration::from_secs(10),
            cookie_file: None,
            output_path: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(base_url) = env::var("HEALTH_BOARD_URL") {
            config.base_url = base_url;
        }

        if let Ok(interval) = env::var("POLL_INTERVAL_MS") {
            if let Ok(ms) = interval.parse::<u64>() {
                config.poll_interval = Duration::from_millis(ms);
            }
        }

        if let Ok(timeout) = env::var("HTTP_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.http_timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(cookie_file) = env::var("DASHBOARD_COOKIE_FILE") {
            if !cookie_file.trim().is_empty() {
                config.cookie_file = Some(PathBuf::from(cookie_file));
            }
        }

        if let Ok(output) = env::var("DASHBOARD_OUTPUT") {
            if !output.trim().is_empty() {
                config.output_path = Some(PathBuf::from(output));
            }
        }

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!("base_url must be an http(s) URL, got '{}'", self.base_url));
        }

        if self.poll_interval.is_zero() {
            return Err("poll_interval must be greater than 0".to_string());
        }

        if self.http_timeout.is_zero() {
            return Err("http_timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
