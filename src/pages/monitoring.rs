//! System monitoring page: live resource figures and the rolling chart

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use event_bus::MonitorEvent;
use monitor_core::format::{
    format_clock, format_file_size, format_number, format_percent, format_time, html_escape,
    relative_time, NOT_AVAILABLE,
};
use monitor_core::{
    DatabaseStatus, MetricSample, MetricSnapshot, MonitorResult, SeriesWindow, StreamTable,
    TimeRange,
};
use serde_json::json;
use tracing::{debug, warn};
use ui_kit::{ChartColor, ChartConfig, ChartData, ChartKind, Dataset, NotifyLevel, UpdateMode};

use super::{Page, PageContext};

pub const STATUS: &str = "monitoring-connection-status";
pub const CPU_DISPLAY: &str = "cpu-usage-display";
pub const CPU_PROGRESS: &str = "cpu-progress";
pub const MEMORY_DISPLAY: &str = "memory-usage-display";
pub const MEMORY_PROGRESS: &str = "memory-progress";
pub const MEMORY_USED: &str = "memory-used";
pub const MEMORY_TOTAL: &str = "memory-total";
pub const DISK_DISPLAY: &str = "disk-usage-display";
pub const DISK_PROGRESS: &str = "disk-progress";
pub const DISK_USED: &str = "disk-used";
pub const DISK_TOTAL: &str = "disk-total";
pub const NETWORK_SENT: &str = "network-sent";
pub const NETWORK_RECV: &str = "network-recv";
pub const DATABASE_STATUS: &str = "dolphindb-status";
pub const DATABASE_CONNECTION: &str = "dolphindb-connection";
pub const DATABASE_VERSION: &str = "dolphindb-version";
pub const DATABASE_UPTIME: &str = "dolphindb-uptime";
pub const DATABASE_SESSIONS: &str = "dolphindb-sessions";
pub const STREAM_TABLES: &str = "stream-tables-container";
pub const SYSTEM_CHART: &str = "system-performance-chart";
pub const RANGE_1H: &str = "time-range-1h";
pub const RANGE_6H: &str = "time-range-6h";
pub const RANGE_24H: &str = "time-range-24h";

const ALERT_DURATION: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringTimer {
    Refresh,
}

pub enum MonitoringPull {
    Status(MonitorResult<MetricSnapshot>),
    History(TimeRange, MonitorResult<Vec<MetricSample>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringCommand {
    Refresh,
    ChangeTimeRange(TimeRange),
}

#[derive(Debug)]
pub struct MonitoringPage {
    refresh: Duration,
    time_range: TimeRange,
    max_points: usize,
    window: SeriesWindow,
    snapshot: Option<MetricSnapshot>,
}

impl MonitoringPage {
    pub fn new(refresh: Duration, max_points: usize) -> Self {
        Self {
            refresh,
            time_range: TimeRange::default(),
            max_points,
            window: SeriesWindow::new(max_points, 3),
            snapshot: None,
        }
    }

    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    /// CPU, memory and disk series in chart order
    pub fn window(&self) -> &SeriesWindow {
        &self.window
    }

    pub fn snapshot(&self) -> Option<&MetricSnapshot> {
        self.snapshot.as_ref()
    }

    fn load(&self, ctx: &PageContext<Self>) {
        let api = ctx.services.api.clone();
        ctx.spawn_pull(async move { MonitoringPull::Status(api.system_status().await) });
    }

    fn load_history(&self, ctx: &PageContext<Self>) {
        let api = ctx.services.api.clone();
        let range = self.time_range;
        ctx.spawn_pull(async move { MonitoringPull::History(range, api.metrics_history(range).await) });
    }

    /// Cards, database panel, table and one new chart point
    fn apply_snapshot(&mut self, ctx: &PageContext<Self>, snapshot: MetricSnapshot) {
        render_figures(ctx, &snapshot);
        render_database(ctx, snapshot.database.as_ref());
        ctx.services.surface.set_html(
            STREAM_TABLES,
            &render_stream_table(&snapshot.stream_tables, Utc::now()),
        );

        self.window.push(
            format_clock(&Local::now()),
            &[
                snapshot.cpu_usage,
                snapshot.memory_usage.percent,
                snapshot.disk_usage.percent,
            ],
        );
        let series = self.window.snapshot();
        ctx.services
            .charts
            .update_chart(SYSTEM_CHART, UpdateMode::None, |data| data.apply_snapshot(&series));

        self.snapshot = Some(snapshot);
    }

    /// Whole range is charted; the window grows to fit it and live points
    /// then roll over at that size.
    fn apply_history(&mut self, ctx: &PageContext<Self>, samples: &[MetricSample]) {
        self.window = SeriesWindow::new(samples.len().max(self.max_points), 3);
        self.window.replace(samples.iter().map(|sample| {
            (
                format_time(Some(sample.timestamp.as_utc())),
                vec![sample.cpu_usage, sample.memory_usage, sample.disk_usage],
            )
        }));
        let series = self.window.snapshot();
        ctx.services
            .charts
            .update_chart(SYSTEM_CHART, UpdateMode::Default, |data| data.apply_snapshot(&series));
    }
}

impl Page for MonitoringPage {
    type Event = MonitorEvent;
    type Timer = MonitoringTimer;
    type Pull = MonitoringPull;
    type Command = MonitoringCommand;

    const NAME: &'static str = "monitoring";
    const TITLE: &'static str = "System monitoring";
    const STATUS_ANCHOR: &'static str = STATUS;
    const ANCHORS: &'static [&'static str] = &[
        STATUS,
        CPU_DISPLAY,
        CPU_PROGRESS,
        MEMORY_DISPLAY,
        MEMORY_PROGRESS,
        MEMORY_USED,
        MEMORY_TOTAL,
        DISK_DISPLAY,
        DISK_PROGRESS,
        DISK_USED,
        DISK_TOTAL,
        NETWORK_SENT,
        NETWORK_RECV,
        DATABASE_STATUS,
        DATABASE_CONNECTION,
        DATABASE_VERSION,
        DATABASE_UPTIME,
        DATABASE_SESSIONS,
        STREAM_TABLES,
        SYSTEM_CHART,
        RANGE_1H,
        RANGE_6H,
        RANGE_24H,
    ];
    const CHARTS: &'static [&'static str] = &[SYSTEM_CHART];

    fn timers(&self) -> Vec<(MonitoringTimer, Duration)> {
        vec![(MonitoringTimer::Refresh, self.refresh)]
    }

    fn start(&mut self, ctx: &PageContext<Self>) {
        if let Err(err) = ctx.services.charts.create_chart(SYSTEM_CHART, system_chart()) {
            err.log_error("System chart");
        }
        render_range_buttons(ctx, self.time_range);
        self.load(ctx);
    }

    fn on_push(&mut self, ctx: &PageContext<Self>, event: MonitorEvent) {
        match event {
            MonitorEvent::SystemMetricsUpdate(snapshot) => self.apply_snapshot(ctx, snapshot),
            MonitorEvent::DatabaseStatusUpdate(status) => render_database(ctx, Some(&status)),
            MonitorEvent::AlertTriggered(alert) => {
                let level = if alert.is_critical() {
                    NotifyLevel::Danger
                } else {
                    NotifyLevel::Warning
                };
                warn!(level = ?alert.level, message = %alert.message, "alert triggered");
                ctx.services.notifications.show(
                    format!("System alert: {}", alert.message),
                    level,
                    ALERT_DURATION,
                );
            }
        }
    }

    fn on_tick(&mut self, ctx: &PageContext<Self>, timer: MonitoringTimer) {
        match timer {
            MonitoringTimer::Refresh => self.load(ctx),
        }
    }

    fn on_pull(&mut self, ctx: &PageContext<Self>, pulled: MonitoringPull) {
        match pulled {
            MonitoringPull::Status(Ok(snapshot)) => self.apply_snapshot(ctx, snapshot),
            MonitoringPull::Status(Err(err)) => ctx.report("Failed to load system status", &err),
            MonitoringPull::History(range, _) if range != self.time_range => {
                debug!(%range, current = %self.time_range, "stale history dropped");
            }
            MonitoringPull::History(_, Ok(samples)) if samples.is_empty() => {}
            MonitoringPull::History(_, Ok(samples)) => self.apply_history(ctx, &samples),
            MonitoringPull::History(_, Err(err)) => {
                ctx.report("Failed to load metric history", &err)
            }
        }
    }

    fn on_command(&mut self, ctx: &PageContext<Self>, command: MonitoringCommand) {
        match command {
            MonitoringCommand::Refresh => self.load(ctx),
            MonitoringCommand::ChangeTimeRange(range) => {
                self.time_range = range;
                render_range_buttons(ctx, range);
                self.load_history(ctx);
            }
        }
    }
}

fn render_figures(ctx: &PageContext<MonitoringPage>, snapshot: &MetricSnapshot) {
    let surface = &ctx.services.surface;
    let memory = &snapshot.memory_usage;
    let disk = &snapshot.disk_usage;

    surface.set_text(CPU_DISPLAY, &format_percent(Some(snapshot.cpu_usage), 1));
    surface.set_style(CPU_PROGRESS, "width", &progress_width(snapshot.cpu_usage));

    surface.set_text(MEMORY_DISPLAY, &format_percent(Some(memory.percent), 1));
    surface.set_style(MEMORY_PROGRESS, "width", &progress_width(memory.percent));
    surface.set_text(MEMORY_USED, &format_file_size(memory.used));
    surface.set_text(MEMORY_TOTAL, &format_file_size(memory.total));

    surface.set_text(DISK_DISPLAY, &format_percent(Some(disk.percent), 1));
    surface.set_style(DISK_PROGRESS, "width", &progress_width(disk.percent));
    surface.set_text(DISK_USED, &format_file_size(disk.used));
    surface.set_text(DISK_TOTAL, &format_file_size(disk.total));

    if let Some(network) = &snapshot.network {
        surface.set_text(NETWORK_SENT, &format_file_size(network.bytes_sent));
        surface.set_text(NETWORK_RECV, &format_file_size(network.bytes_recv));
    }
}

/// Missing status renders as disconnected; details only when connected
fn render_database(ctx: &PageContext<MonitoringPage>, status: Option<&DatabaseStatus>) {
    let surface = &ctx.services.surface;
    let connected = status.is_some_and(|s| s.connected);

    surface.set_html(DATABASE_STATUS, &render_database_badge(connected));
    surface.set_text(
        DATABASE_CONNECTION,
        if connected { "Connected" } else { "Disconnected" },
    );

    if let Some(status) = status.filter(|s| s.connected) {
        surface.set_text(DATABASE_VERSION, status.version.as_deref().unwrap_or(NOT_AVAILABLE));
        surface.set_text(DATABASE_UPTIME, status.uptime.as_deref().unwrap_or(NOT_AVAILABLE));
        surface.set_text(DATABASE_SESSIONS, &status.sessions.unwrap_or(0).to_string());
    }
}

fn render_range_buttons(ctx: &PageContext<MonitoringPage>, active: TimeRange) {
    let surface = &ctx.services.surface;
    for (anchor, range) in [
        (RANGE_1H, TimeRange::OneHour),
        (RANGE_6H, TimeRange::SixHours),
        (RANGE_24H, TimeRange::OneDay),
    ] {
        surface.set_class(anchor, "active", range == active);
    }
}

pub fn system_chart() -> ChartConfig {
    ChartConfig::new(
        ChartKind::Line,
        ChartData::new(vec![
            Dataset::line("CPU usage (%)", ChartColor::PRIMARY),
            Dataset::line("Memory usage (%)", ChartColor::SUCCESS),
            Dataset::line("Disk usage (%)", ChartColor::WARNING),
        ]),
    )
    .with_options(json!({
        "interaction": { "mode": "index", "intersect": false },
        "scales": {
            "x": { "display": true, "title": { "display": true, "text": "Time" } },
            "y": {
                "display": true,
                "title": { "display": true, "text": "Usage (%)" },
                "min": 0,
                "max": 100
            }
        }
    }))
}

/// CSS width for a progress bar, clamped to 0..=100
pub fn progress_width(percent: f64) -> String {
    let percent = if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    format!("{percent:.1}%")
}

pub fn render_database_badge(connected: bool) -> String {
    let (class, text) = if connected {
        ("status-online", "Online")
    } else {
        ("status-offline", "Offline")
    };
    format!(r#"<span class="status-indicator {class}"></span> {text}"#)
}

pub fn render_stream_table(tables: &[StreamTable], now: DateTime<Utc>) -> String {
    if tables.is_empty() {
        return r#"<div class="text-center text-muted py-3"><i class="fas fa-info-circle"></i> No stream tables</div>"#
            .to_string();
    }

    let mut html = String::from(
        r#"<div class="table-responsive"><table class="table table-sm"><thead><tr><th>Table</th><th>Status</th><th>Rows</th><th>Last update</th></tr></thead><tbody>"#,
    );
    for table in tables {
        let (class, text) = if table.exists {
            ("status-online", "OK")
        } else {
            ("status-offline", "Missing")
        };
        html.push_str(&format!(
            r#"<tr><td><code>{}</code></td><td><span class="status-indicator {class}"></span> {text}</td><td>{}</td><td>{}</td></tr>"#,
            html_escape(&table.name),
            format_number(Some(table.row_count.unwrap_or(0) as f64), 0),
            relative_time(table.last_update.as_ref().map(|ts| ts.as_utc()), now),
        ));
    }
    html.push_str("</tbody></table></div>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use monitor_core::Timestamp;

    #[test]
    fn test_progress_width_clamped() {
        assert_eq!(progress_width(42.34), "42.3%");
        assert_eq!(progress_width(140.0), "100.0%");
        assert_eq!(progress_width(-3.0), "0.0%");
        assert_eq!(progress_width(f64::NAN), "0.0%");
    }

    #[test]
    fn test_stream_table_rows() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let tables = vec![
            StreamTable {
                name: "tick_stream".to_string(),
                exists: true,
                row_count: Some(1_250_000),
                last_update: Some(Timestamp(now - chrono::Duration::hours(2))),
            },
            StreamTable {
                name: "signal<x>".to_string(),
                exists: false,
                row_count: None,
                last_update: None,
            },
        ];

        let html = render_stream_table(&tables, now);
        assert!(html.contains("<code>tick_stream</code>"));
        assert!(html.contains("1,250,000"));
        assert!(html.contains("2 hours ago"));
        assert!(html.contains("signal&lt;x&gt;"));
        assert!(html.contains("status-offline\"></span> Missing"));
        assert!(html.contains("<td>N/A</td>"));
    }

    #[test]
    fn test_empty_stream_table() {
        assert!(render_stream_table(&[], Utc::now()).contains("No stream tables"));
    }

    #[test]
    fn test_database_badge() {
        assert!(render_database_badge(true).contains("status-online"));
        assert!(render_database_badge(false).ends_with("Offline"));
    }

    #[test]
    fn test_system_chart_has_three_series() {
        let config = system_chart();
        let labels: Vec<_> = config.data.datasets.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["CPU usage (%)", "Memory usage (%)", "Disk usage (%)"]);
    }
}
