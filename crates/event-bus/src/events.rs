//! Closed event unions, one per namespace
//!
//! A push frame is a JSON text message `{"event": <name>, "data": <payload>}`.
//! Each namespace accepts exactly the names listed in its `EVENT_NAMES`;
//! anything else (greetings, events for other pages) is skipped.

use std::fmt;

use monitor_core::{
    AlertNotice, DashboardUpdate, DatabaseStatus, LogRecord, LogStats, MetricSnapshot,
    MonitorError, MonitorResult, PerformancePoint, RuleAlert, StatusChange, StrategyCell,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::namespace::Namespace;

/// Event union bound to a namespace
pub trait PushEvent: DeserializeOwned + Send + fmt::Debug + 'static {
    const NAMESPACE: Namespace;
    /// Wire names accepted by this union, aliases included
    const EVENT_NAMES: &'static [&'static str];

    fn name(&self) -> &'static str;
}

/// Raw frame before it is matched against a union
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Decode a text frame into `E`.
///
/// `Ok(None)` means the frame is well formed but names an event outside the
/// union; a known name with a malformed payload is an error.
pub fn decode_frame<E: PushEvent>(text: &str) -> MonitorResult<Option<E>> {
    let frame: Frame = serde_json::from_str(text)
        .map_err(|err| MonitorError::decode(format!("{}: bad frame: {err}", E::NAMESPACE)))?;

    if !E::EVENT_NAMES.contains(&frame.event.as_str()) {
        debug!(namespace = %E::NAMESPACE, event = %frame.event, "ignoring unhandled push event");
        return Ok(None);
    }

    let event = frame.event.clone();
    serde_json::to_value(frame)
        .and_then(serde_json::from_value::<E>)
        .map(Some)
        .map_err(|err| MonitorError::decode(format!("{}: {event}: {err}", E::NAMESPACE)))
}

/// Events on `/dashboard`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum DashboardEvent {
    DashboardUpdate(DashboardUpdate),
    SystemAlert(AlertNotice),
    QuickStatsUpdate(Value),
}

impl PushEvent for DashboardEvent {
    const NAMESPACE: Namespace = Namespace::Dashboard;
    const EVENT_NAMES: &'static [&'static str] =
        &["dashboard_update", "system_alert", "quick_stats_update"];

    fn name(&self) -> &'static str {
        match self {
            DashboardEvent::DashboardUpdate(_) => "dashboard_update",
            DashboardEvent::SystemAlert(_) => "system_alert",
            DashboardEvent::QuickStatsUpdate(_) => "quick_stats_update",
        }
    }
}

/// Events on `/monitor`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum MonitorEvent {
    #[serde(alias = "system_metrics")]
    SystemMetricsUpdate(MetricSnapshot),
    #[serde(rename = "dolphindb_status_update")]
    DatabaseStatusUpdate(DatabaseStatus),
    AlertTriggered(AlertNotice),
}

impl PushEvent for MonitorEvent {
    const NAMESPACE: Namespace = Namespace::Monitor;
    const EVENT_NAMES: &'static [&'static str] = &[
        "system_metrics_update",
        "system_metrics",
        "dolphindb_status_update",
        "alert_triggered",
    ];

    fn name(&self) -> &'static str {
        match self {
            MonitorEvent::SystemMetricsUpdate(_) => "system_metrics_update",
            MonitorEvent::DatabaseStatusUpdate(_) => "dolphindb_status_update",
            MonitorEvent::AlertTriggered(_) => "alert_triggered",
        }
    }
}

/// Events on `/strategy`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StrategyEvent {
    StrategyMatrixUpdate(Vec<StrategyCell>),
    StrategyPerformanceUpdate(Vec<PerformancePoint>),
    StrategyStatusChange(StatusChange),
    /// Broadcast after another client changed a cell
    StrategyUpdated(StatusChange),
}

impl PushEvent for StrategyEvent {
    const NAMESPACE: Namespace = Namespace::Strategy;
    const EVENT_NAMES: &'static [&'static str] = &[
        "strategy_matrix_update",
        "strategy_performance_update",
        "strategy_status_change",
        "strategy_updated",
    ];

    fn name(&self) -> &'static str {
        match self {
            StrategyEvent::StrategyMatrixUpdate(_) => "strategy_matrix_update",
            StrategyEvent::StrategyPerformanceUpdate(_) => "strategy_performance_update",
            StrategyEvent::StrategyStatusChange(_) => "strategy_status_change",
            StrategyEvent::StrategyUpdated(_) => "strategy_updated",
        }
    }
}

/// Events on `/logs`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum LogsEvent {
    NewLog(LogRecord),
    LogStatsUpdate(LogStats),
    AlertRuleTriggered(RuleAlert),
}

impl PushEvent for LogsEvent {
    const NAMESPACE: Namespace = Namespace::Logs;
    const EVENT_NAMES: &'static [&'static str] =
        &["new_log", "log_stats_update", "alert_rule_triggered"];

    fn name(&self) -> &'static str {
        match self {
            LogsEvent::NewLog(_) => "new_log",
            LogsEvent::LogStatsUpdate(_) => "log_stats_update",
            LogsEvent::AlertRuleTriggered(_) => "alert_rule_triggered",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_core::{AlertLevel, LogLevel};
    use serde_json::json;

    fn text(event: &str, data: Value) -> String {
        Frame::new(event, data).to_text()
    }

    #[test]
    fn test_unknown_event_is_skipped() {
        let decoded = decode_frame::<LogsEvent>(&text("connected", json!({"message": "hi"}))).unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_bad_payload_is_an_error() {
        let err = decode_frame::<LogsEvent>(&text("new_log", json!({"level": 5}))).unwrap_err();
        assert!(matches!(err, MonitorError::Decode(_)));
        assert!(decode_frame::<LogsEvent>("not json").is_err());
    }

    #[test]
    fn test_new_log_decoded() {
        let event = decode_frame::<LogsEvent>(&text(
            "new_log",
            json!({"level": "error", "component": "Risk", "message": "halt", "timestamp": "2024-05-01T10:00:00"}),
        ))
        .unwrap()
        .unwrap();
        match &event {
            LogsEvent::NewLog(record) => assert_eq!(record.level, LogLevel::Error),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(event.name(), "new_log");
    }

    #[test]
    fn test_metrics_alias_and_renamed_database_event() {
        let event = decode_frame::<MonitorEvent>(&text("system_metrics", json!({"cpu_usage": 5.0})))
            .unwrap()
            .unwrap();
        assert_eq!(event.name(), "system_metrics_update");

        let event = decode_frame::<MonitorEvent>(&text(
            "dolphindb_status_update",
            json!({"connected": false}),
        ))
        .unwrap()
        .unwrap();
        assert_eq!(event, MonitorEvent::DatabaseStatusUpdate(DatabaseStatus::default()));
    }

    #[test]
    fn test_strategy_updated_accepts_short_field_name() {
        let event = decode_frame::<StrategyEvent>(&text(
            "strategy_updated",
            json!({"strategy": "momentum", "symbol": "IF2406", "enabled": true, "timestamp": "2024-05-01T10:00:00"}),
        ))
        .unwrap()
        .unwrap();
        assert_eq!(
            event,
            StrategyEvent::StrategyUpdated(StrategyCell::new("momentum", "IF2406", true))
        );
    }

    #[test]
    fn test_system_alert_level_defaults_to_warning() {
        let event = decode_frame::<DashboardEvent>(&text("system_alert", json!({"message": "disk"})))
            .unwrap()
            .unwrap();
        match event {
            DashboardEvent::SystemAlert(alert) => assert_eq!(alert.level, AlertLevel::Warning),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
