//! Wire data model
//!
//! These are transient view-state snapshots decoded from pulls and push
//! events. None of them is persisted; each is replaced wholesale when a
//! newer copy arrives.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::time::Timestamp;

/// Standard response envelope: `{success, data | error}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// Severity attached to pushed alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    #[default]
    Warning,
    Error,
    Critical,
}

/// A system alert pushed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertNotice {
    #[serde(default)]
    pub level: AlertLevel,
    pub message: String,
}

impl AlertNotice {
    /// Critical alerts are shown as danger, everything else as warning
    pub fn is_critical(&self) -> bool {
        self.level == AlertLevel::Critical
    }
}

/// A log alert rule fired on the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAlert {
    pub rule_name: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// System metrics
// ---------------------------------------------------------------------------

/// Percent plus absolute bytes for memory or disk
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceUsage {
    pub percent: f64,
    pub used: u64,
    pub total: u64,
}

/// Cumulative network counters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkIo {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// Backend database health
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseStatus {
    pub connected: bool,
    pub version: Option<String>,
    pub uptime: Option<String>,
    pub sessions: Option<u64>,
}

/// A streaming table registered on the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamTable {
    pub name: String,
    #[serde(default)]
    pub exists: bool,
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub last_update: Option<Timestamp>,
}

/// Last-known system figures, replaced wholesale on every update
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSnapshot {
    pub cpu_usage: f64,
    pub memory_usage: ResourceUsage,
    pub disk_usage: ResourceUsage,
    pub network: Option<NetworkIo>,
    #[serde(rename = "dolphindb", alias = "database")]
    pub database: Option<DatabaseStatus>,
    pub stream_tables: Vec<StreamTable>,
}

/// One historical point for the system chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: Timestamp,
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub memory_usage: f64,
    #[serde(default)]
    pub disk_usage: f64,
}

/// Selectable window for metric history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "24h")]
    OneDay,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::OneHour => "1h",
            TimeRange::SixHours => "6h",
            TimeRange::OneDay => "24h",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(TimeRange::OneHour),
            "6h" => Ok(TimeRange::SixHours),
            "24h" => Ok(TimeRange::OneDay),
            other => Err(format!("unknown time range: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard overview
// ---------------------------------------------------------------------------

/// `{connected}` flag for the database card
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkState {
    pub connected: bool,
}

/// `{cpu}` load figure
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadFigure {
    pub cpu: f64,
}

/// `{percent}` usage figure
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentFigure {
    pub percent: f64,
}

/// System cards on the overview page
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSummary {
    #[serde(rename = "dolphindb", alias = "database")]
    pub database: Option<LinkState>,
    pub load: Option<LoadFigure>,
    pub memory: Option<PercentFigure>,
    pub disk: Option<PercentFigure>,
}

/// Strategy totals on the overview page
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySummary {
    pub active_count: u64,
    pub total_pnl: f64,
    pub today_trades: u64,
}

/// Category of an activity feed entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Strategy,
    System,
    Alert,
    Trade,
    Error,
    Info,
    #[serde(other)]
    Other,
}

/// Entry in the recent-activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub message: String,
    pub timestamp: Timestamp,
}

/// One point of the overview load chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadPoint {
    pub timestamp: Timestamp,
    #[serde(default)]
    pub system_load: f64,
    #[serde(default)]
    pub active_strategies: f64,
}

/// Response of `/dashboard/overview`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardOverview {
    pub system: SystemSummary,
    pub strategies: StrategySummary,
    pub stream_tables: Vec<StreamTable>,
    pub recent_activity: Vec<Activity>,
    pub performance: Vec<LoadPoint>,
}

/// Payload of the `dashboard_update` push event
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardUpdate {
    pub system: SystemSummary,
    pub strategies: StrategySummary,
    pub performance: Option<Vec<LoadPoint>>,
}

/// Result of `/system/health_check`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthReport {
    pub issues: Vec<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Strategy page
// ---------------------------------------------------------------------------

/// One (strategy, symbol) cell of the control matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyCell {
    #[serde(alias = "strategy")]
    pub strategy_name: String,
    pub symbol: String,
    #[serde(default)]
    pub enabled: bool,
}

impl StrategyCell {
    pub fn new(strategy_name: impl Into<String>, symbol: impl Into<String>, enabled: bool) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            symbol: symbol.into(),
            enabled,
        }
    }

    /// Identity of the cell
    pub fn key(&self) -> (&str, &str) {
        (&self.strategy_name, &self.symbol)
    }
}

/// Pushed when a cell changes state on the server
pub type StatusChange = StrategyCell;

/// Body of `POST /strategy/toggle`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleRequest {
    pub strategy_name: String,
    pub symbol: String,
}

/// Aggregate P&L / Sharpe point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    pub timestamp: Timestamp,
    #[serde(default)]
    pub total_pnl: f64,
    #[serde(default)]
    pub sharpe_ratio: f64,
}

/// Trading signal emitted by a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    OpenLong,
    OpenShort,
    CloseLong,
    CloseShort,
    NoTrade,
    #[serde(other)]
    Other,
}

impl SignalKind {
    /// Badge colour for the signal list
    pub fn color(&self) -> &'static str {
        match self {
            SignalKind::OpenLong | SignalKind::CloseShort => "success",
            SignalKind::OpenShort | SignalKind::CloseLong => "danger",
            SignalKind::NoTrade => "secondary",
            SignalKind::Other => "info",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::OpenLong => "OPEN_LONG",
            SignalKind::OpenShort => "OPEN_SHORT",
            SignalKind::CloseLong => "CLOSE_LONG",
            SignalKind::CloseShort => "CLOSE_SHORT",
            SignalKind::NoTrade => "NO_TRADE",
            SignalKind::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: Timestamp,
    pub symbol: String,
    pub signal: SignalKind,
    #[serde(default)]
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub direction: Direction,
    #[serde(default)]
    pub qty: f64,
    #[serde(default)]
    pub price: f64,
}

/// Top-of-book tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: Timestamp,
    pub last_price: f64,
    pub bid_price: f64,
    pub ask_price: f64,
    #[serde(default)]
    pub bid_volume: u64,
    #[serde(default)]
    pub ask_volume: u64,
    #[serde(default)]
    pub spread: f64,
    #[serde(default)]
    pub volume: u64,
}

impl Tick {
    /// Spread as a percentage of the last price; `None` when the price is zero
    pub fn spread_pct(&self) -> Option<f64> {
        (self.last_price != 0.0).then(|| self.spread / self.last_price * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadStat {
    pub timestamp: Timestamp,
    #[serde(default)]
    pub spread: f64,
    #[serde(default)]
    pub spread_pct: f64,
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// Severity of a log record; parsed case-insensitively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Lower-case key used for CSS classes and status colours
    pub fn css_class(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" | "fatal" => Ok(LogLevel::Critical),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A single log line from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: LogLevel,
    #[serde(default)]
    pub component: String,
    pub message: String,
    pub timestamp: Timestamp,
}

/// Per-level counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogStats {
    pub total: u64,
    pub info: u64,
    pub warning: u64,
    pub error: u64,
}

impl LogStats {
    /// Count one record
    pub fn record(&mut self, level: LogLevel) {
        self.total += 1;
        match level {
            LogLevel::Info => self.info += 1,
            LogLevel::Warning => self.warning += 1,
            LogLevel::Error => self.error += 1,
            LogLevel::Debug | LogLevel::Critical => {}
        }
    }

    /// Counts in chart order: info, warning, error
    pub fn distribution(&self) -> [f64; 3] {
        [self.info as f64, self.warning as f64, self.error as f64]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_with_error() {
        let env: ApiEnvelope<serde_json::Value> =
            serde_json::from_value(json!({"success": false, "error": "boom"})).unwrap();
        assert!(!env.success);
        assert!(env.data.is_none());
        assert_eq!(env.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_metric_snapshot_defaults() {
        let snap: MetricSnapshot = serde_json::from_value(json!({
            "cpu_usage": 42.5,
            "memory_usage": {"percent": 61.0, "used": 1024, "total": 4096},
            "dolphindb": {"connected": true, "version": "2.00.10"}
        }))
        .unwrap();
        assert_eq!(snap.cpu_usage, 42.5);
        assert_eq!(snap.disk_usage, ResourceUsage::default());
        assert!(snap.database.unwrap().connected);
        assert!(snap.stream_tables.is_empty());
    }

    #[test]
    fn test_log_level_case_insensitive() {
        let record: LogRecord = serde_json::from_value(json!({
            "level": "warning",
            "component": "gateway",
            "message": "slow tick",
            "timestamp": "2024-05-01T09:30:00"
        }))
        .unwrap();
        assert_eq!(record.level, LogLevel::Warning);
        assert_eq!(serde_json::to_value(record.level).unwrap(), json!("WARNING"));
    }

    #[test]
    fn test_unknown_signal_kind() {
        let signal: Signal = serde_json::from_value(json!({
            "timestamp": 1700000000000i64,
            "symbol": "IF2406",
            "signal": "HEDGE",
            "price": 3500.2
        }))
        .unwrap();
        assert_eq!(signal.signal, SignalKind::Other);
        assert_eq!(signal.signal.color(), "info");
    }

    #[test]
    fn test_tick_spread_pct() {
        let tick = Tick {
            timestamp: Timestamp::now(),
            last_price: 200.0,
            bid_price: 199.0,
            ask_price: 201.0,
            bid_volume: 3,
            ask_volume: 4,
            spread: 2.0,
            volume: 10,
        };
        assert_eq!(tick.spread_pct(), Some(1.0));
        assert_eq!(Tick { last_price: 0.0, ..tick }.spread_pct(), None);
    }

    #[test]
    fn test_time_range_round_trip_names() {
        assert_eq!("6h".parse::<TimeRange>().unwrap(), TimeRange::SixHours);
        assert_eq!(TimeRange::OneDay.to_string(), "24h");
        assert!("2d".parse::<TimeRange>().is_err());
    }
}
