use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// REST API base URL (e.g., "http://localhost:5000/api")
    pub base_url: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Optional bearer token for authenticated endpoints
    #[serde(default)]
    pub auth_token: Option<String>,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// Summary (stats + recent transactions) refresh interval in seconds
    #[serde(default = "default_summary_interval_secs")]
    pub summary_interval_secs: u64,
    /// Chart series refresh interval in seconds
    #[serde(default = "default_chart_interval_secs")]
    pub chart_interval_secs: u64,
    /// Seconds before a set-but-never-cleared interaction flag expires
    #[serde(default = "default_interaction_timeout_secs")]
    pub interaction_timeout_secs: u64,
    /// Warn when more than this many meters report critically low units
    #[serde(default = "default_low_units_warn_threshold")]
    pub low_units_warn_threshold: usize,
}

fn default_summary_interval_secs() -> u64 {
    30
}

fn default_chart_interval_secs() -> u64 {
    120
}

fn default_interaction_timeout_secs() -> u64 {
    30
}

fn default_low_units_warn_threshold() -> usize {
    3
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            summary_interval_secs: default_summary_interval_secs(),
            chart_interval_secs: default_chart_interval_secs(),
            interaction_timeout_secs: default_interaction_timeout_secs(),
            low_units_warn_threshold: default_low_units_warn_threshold(),
        }
    }
}

impl RefreshConfig {
    pub fn summary_interval(&self) -> Duration {
        Duration::from_secs(self.summary_interval_secs.max(1))
    }

    pub fn chart_interval(&self) -> Duration {
        Duration::from_secs(self.chart_interval_secs.max(1))
    }

    pub fn interaction_timeout(&self) -> Duration {
        Duration::from_secs(self.interaction_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("api.request_timeout_ms", 10_000i64)?
            .set_default("refresh.summary_interval_secs", 30i64)?
            .set_default("refresh.chart_interval_secs", 120i64)?
            .set_default("refresh.interaction_timeout_secs", 30i64)?
            .set_default("refresh.low_units_warn_threshold", 3i64)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("METERSYNC_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (METERSYNC_API__BASE_URL, etc.)
            .add_source(
                Environment::with_prefix("METERSYNC")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}
