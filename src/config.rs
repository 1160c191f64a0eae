//! Monitor configuration
//!
//! Loaded from `monitor.toml` / `config/monitor.toml` (both optional), an
//! explicit file given on the command line, then `SM_*` environment variables
//! (`__` separates nested keys, e.g. `SM_REFRESH__DASHBOARD_SECS=30`).

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use event_bus::ReconnectPolicy;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

/// Top-level configuration for the monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// REST base URL, including the `/api` prefix
    pub api_base_url: String,

    /// WebSocket base URL; namespaces are appended as path segments
    pub push_base_url: String,

    /// Per-request timeout; unset means no timeout
    pub request_timeout_secs: Option<u64>,

    pub refresh: RefreshConfig,

    pub buffers: BufferConfig,

    pub reconnect: ReconnectPolicy,

    pub logging: LoggingConfig,

    /// Answer every confirm dialog with this value (headless runs)
    pub auto_confirm: Option<bool>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5000/api".to_string(),
            push_base_url: "ws://127.0.0.1:5000/ws".to_string(),
            request_timeout_secs: None,
            refresh: RefreshConfig::default(),
            buffers: BufferConfig::default(),
            reconnect: ReconnectPolicy::default(),
            logging: LoggingConfig::default(),
            auto_confirm: None,
        }
    }
}

/// Periodic pull intervals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub dashboard_secs: u64,
    pub monitoring_secs: u64,
    pub strategy_secs: u64,
    pub live_ticks_ms: u64,
    pub log_stats_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            dashboard_secs: 15,
            monitoring_secs: 5,
            strategy_secs: 30,
            live_ticks_ms: 1000,
            log_stats_secs: 10,
        }
    }
}

impl RefreshConfig {
    pub fn dashboard(&self) -> Duration {
        Duration::from_secs(self.dashboard_secs)
    }

    pub fn monitoring(&self) -> Duration {
        Duration::from_secs(self.monitoring_secs)
    }

    pub fn strategy(&self) -> Duration {
        Duration::from_secs(self.strategy_secs)
    }

    pub fn live_ticks(&self) -> Duration {
        Duration::from_millis(self.live_ticks_ms)
    }

    pub fn log_stats(&self) -> Duration {
        Duration::from_secs(self.log_stats_secs)
    }
}

/// Capacities of the bounded view-state buffers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub metric_points: usize,
    pub max_logs: usize,
    pub recent_logs: usize,
    pub spread_points: usize,
    pub notifications: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            metric_points: 50,
            max_logs: 1000,
            recent_logs: 100,
            spread_points: 20,
            notifications: 5,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable structured logging (JSON format)
    pub structured: bool,

    /// Log to a daily rolling file in addition to stdout
    pub log_to_file: bool,

    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            structured: false,
            log_to_file: false,
            log_dir: "logs".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Load from the default files, an optional explicit file and the environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name("monitor.toml").required(false))
            .add_source(File::with_name("config/monitor.toml").required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("SM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let monitor_config: MonitorConfig = config.try_deserialize()?;
        monitor_config.validate()?;

        info!("Monitor configuration loaded:");
        info!("  API: {}", monitor_config.api_base_url);
        info!("  Push: {}", monitor_config.push_base_url);
        info!(
            "  Refresh: dashboard {}s, monitoring {}s, strategy {}s",
            monitor_config.refresh.dashboard_secs,
            monitor_config.refresh.monitoring_secs,
            monitor_config.refresh.strategy_secs
        );

        Ok(monitor_config)
    }

    /// Validates the configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.api_base_url)
            .map_err(|err| ConfigError::Message(format!("Invalid api_base_url: {err}")))?;

        let push = Url::parse(&self.push_base_url)
            .map_err(|err| ConfigError::Message(format!("Invalid push_base_url: {err}")))?;
        if !matches!(push.scheme(), "ws" | "wss") {
            return Err(ConfigError::Message(
                "push_base_url must use ws:// or wss://".to_string(),
            ));
        }

        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::Message(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        let refresh = &self.refresh;
        if refresh.dashboard_secs == 0
            || refresh.monitoring_secs == 0
            || refresh.strategy_secs == 0
            || refresh.live_ticks_ms == 0
            || refresh.log_stats_secs == 0
        {
            return Err(ConfigError::Message(
                "Refresh intervals must be greater than 0".to_string(),
            ));
        }

        let buffers = &self.buffers;
        if buffers.metric_points == 0
            || buffers.max_logs == 0
            || buffers.recent_logs == 0
            || buffers.spread_points == 0
            || buffers.notifications == 0
        {
            return Err(ConfigError::Message(
                "Buffer capacities must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
