use std::time::Duration;

use config::{Config, File};
pub use config::ConfigError;
use serde::Deserialize;

use crate::consts::{DEFAULT_REQUEST_TIMEOUT_SECS, LEASE_RENEW_INTERVAL};
use crate::exchange::BaseUrl;
use crate::grid::StrategyParameters;

/// Main configuration struct
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Network configuration (env, credentials, endpoints)
    pub network: NetworkConfig,
    /// Strategy parameters (symbol, sizing, budget)
    pub strategy: StrategyParameters,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerSettings,
}

#[derive(Deserialize)]
pub struct NetworkConfig {
    /// Environment: "mainnet" or "testnet"
    pub env: String,
    /// API key, sent as a header on authenticated requests
    pub api_key: String,
    /// API secret used to sign requests.
    /// In production, load this from ENV variables only (APP_NETWORK__API_SECRET)
    pub api_secret: String,
    /// Override of the REST endpoint
    #[serde(default)]
    pub rest_url: Option<String>,
    /// Override of the WebSocket endpoint
    #[serde(default)]
    pub websocket_url: Option<String>,
    /// Per-request timeout for REST calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl NetworkConfig {
    pub fn base_url(&self) -> BaseUrl {
        if self.env.eq_ignore_ascii_case("mainnet") {
            BaseUrl::Mainnet
        } else {
            BaseUrl::Testnet
        }
    }

    pub fn rest_url(&self) -> String {
        self.rest_url
            .clone()
            .unwrap_or_else(|| self.base_url().rest_url().to_string())
    }

    pub fn websocket_url(&self) -> String {
        self.websocket_url
            .clone()
            .unwrap_or_else(|| self.base_url().ws_url().to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl std::fmt::Debug for NetworkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkConfig")
            .field("env", &self.env)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("rest_url", &self.rest_url)
            .field("websocket_url", &self.websocket_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
pub struct RunnerSettings {
    /// Data-stream lease keepalive period
    #[serde(default = "default_renew_interval_secs")]
    pub renew_interval_secs: u64,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            renew_interval_secs: default_renew_interval_secs(),
        }
    }
}

fn default_renew_interval_secs() -> u64 {
    LEASE_RENEW_INTERVAL.as_secs()
}

impl Settings {
    /// Load settings from a configuration file
    pub fn new(config_path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Add configuration file
            .add_source(File::with_name(config_path))
            // Add environment variables (overrides file)
            // e.g. APP_NETWORK__API_SECRET=...
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
