//! Overview page: system cards, strategy totals, stream tables, activity

use std::time::Duration;

use chrono::{DateTime, Utc};
use event_bus::DashboardEvent;
use monitor_core::format::{
    format_clock, format_number, format_percent, html_escape, load_class, relative_time,
};
use monitor_core::{
    Activity, ActivityKind, DashboardOverview, HealthReport, LoadPoint, MonitorResult,
    StrategySummary, StreamTable, SystemSummary,
};
use serde_json::{json, Value};
use tracing::{info, warn};
use ui_kit::{
    ChartColor, ChartConfig, ChartData, ChartKind, ConfirmOptions, Dataset, NotifyLevel, UpdateMode,
};

use super::{Page, PageContext};

pub const STATUS: &str = "dashboard-connection-status";
pub const DATABASE_STATUS: &str = "ddb-status";
pub const SYSTEM_LOAD: &str = "system-load";
pub const MEMORY_USAGE: &str = "memory-usage";
pub const DISK_USAGE: &str = "disk-usage";
pub const ACTIVE_STRATEGIES: &str = "active-strategies";
pub const TOTAL_PNL: &str = "total-pnl";
pub const TODAY_TRADES: &str = "today-trades";
pub const STREAM_TABLES: &str = "stream-tables-status";
pub const RECENT_ACTIVITY: &str = "recent-activity";
pub const OVERVIEW_CHART: &str = "overview-chart";

const STREAM_TABLE_PREVIEW: usize = 6;
const ACTIVITY_PREVIEW: usize = 5;
const ALERT_DURATION: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardTimer {
    Refresh,
}

pub enum DashboardPull {
    Overview(MonitorResult<DashboardOverview>),
    /// `None` when the confirm was declined
    Restarted(Option<MonitorResult<()>>),
    HealthChecked(MonitorResult<HealthReport>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardCommand {
    Refresh,
    RestartAllStrategies,
    SystemCheck,
}

#[derive(Debug)]
pub struct DashboardPage {
    refresh: Duration,
    overview: Option<DashboardOverview>,
    quick_stats: Option<Value>,
}

impl DashboardPage {
    pub fn new(refresh: Duration) -> Self {
        Self {
            refresh,
            overview: None,
            quick_stats: None,
        }
    }

    /// Last overview received by pull
    pub fn overview(&self) -> Option<&DashboardOverview> {
        self.overview.as_ref()
    }

    pub fn quick_stats(&self) -> Option<&Value> {
        self.quick_stats.as_ref()
    }

    fn load(&self, ctx: &PageContext<Self>) {
        let api = ctx.services.api.clone();
        ctx.spawn_pull(async move { DashboardPull::Overview(api.dashboard_overview().await) });
    }

    fn restart_all(&self, ctx: &PageContext<Self>) {
        let api = ctx.services.api.clone();
        let overlay = ctx.services.overlay.clone();
        ctx.spawn_pull(async move {
            let confirmed = overlay
                .confirm(
                    ConfirmOptions::new("Restart strategies", "Restart all strategies?")
                        .level(NotifyLevel::Warning),
                )
                .await;
            if !confirmed {
                return DashboardPull::Restarted(None);
            }
            DashboardPull::Restarted(Some(api.restart_all_strategies().await))
        });
    }

    fn system_check(&self, ctx: &PageContext<Self>) {
        ctx.services.notifications.info("Running system check...");
        let api = ctx.services.api.clone();
        ctx.spawn_pull(async move { DashboardPull::HealthChecked(api.health_check().await) });
    }
}

impl Page for DashboardPage {
    type Event = DashboardEvent;
    type Timer = DashboardTimer;
    type Pull = DashboardPull;
    type Command = DashboardCommand;

    const NAME: &'static str = "dashboard";
    const TITLE: &'static str = "Dashboard";
    const STATUS_ANCHOR: &'static str = STATUS;
    const ANCHORS: &'static [&'static str] = &[
        STATUS,
        DATABASE_STATUS,
        SYSTEM_LOAD,
        MEMORY_USAGE,
        DISK_USAGE,
        ACTIVE_STRATEGIES,
        TOTAL_PNL,
        TODAY_TRADES,
        STREAM_TABLES,
        RECENT_ACTIVITY,
        OVERVIEW_CHART,
    ];
    const CHARTS: &'static [&'static str] = &[OVERVIEW_CHART];

    fn timers(&self) -> Vec<(DashboardTimer, Duration)> {
        vec![(DashboardTimer::Refresh, self.refresh)]
    }

    fn start(&mut self, ctx: &PageContext<Self>) {
        if let Err(err) = ctx.services.charts.create_chart(OVERVIEW_CHART, overview_chart()) {
            err.log_error("Overview chart");
        }
        self.load(ctx);
    }

    fn on_push(&mut self, ctx: &PageContext<Self>, event: DashboardEvent) {
        match event {
            DashboardEvent::DashboardUpdate(update) => {
                apply_system(ctx, &update.system);
                apply_strategies(ctx, &update.strategies);
                if let Some(performance) = &update.performance {
                    apply_performance(ctx, performance);
                }
            }
            DashboardEvent::SystemAlert(alert) => {
                let level = if alert.is_critical() {
                    NotifyLevel::Danger
                } else {
                    NotifyLevel::Warning
                };
                warn!(message = %alert.message, "system alert");
                ctx.services.notifications.show(
                    format!("System alert: {}", alert.message),
                    level,
                    ALERT_DURATION,
                );
            }
            DashboardEvent::QuickStatsUpdate(stats) => self.quick_stats = Some(stats),
        }
    }

    fn on_tick(&mut self, ctx: &PageContext<Self>, timer: DashboardTimer) {
        match timer {
            DashboardTimer::Refresh => self.load(ctx),
        }
    }

    fn on_pull(&mut self, ctx: &PageContext<Self>, pulled: DashboardPull) {
        match pulled {
            DashboardPull::Overview(Ok(overview)) => {
                apply_system(ctx, &overview.system);
                apply_strategies(ctx, &overview.strategies);
                let surface = &ctx.services.surface;
                surface.set_html(STREAM_TABLES, &render_stream_tables(&overview.stream_tables));
                surface.set_html(
                    RECENT_ACTIVITY,
                    &render_activity(&overview.recent_activity, Utc::now()),
                );
                apply_performance(ctx, &overview.performance);
                self.overview = Some(overview);
            }
            DashboardPull::Overview(Err(err)) => ctx.report("Failed to load overview", &err),
            DashboardPull::Restarted(None) => {}
            DashboardPull::Restarted(Some(Ok(()))) => {
                info!("all strategies restarted");
                ctx.services.notifications.success("All strategies restarted");
                self.load(ctx);
            }
            DashboardPull::Restarted(Some(Err(err))) => {
                ctx.report("Failed to restart strategies", &err)
            }
            DashboardPull::HealthChecked(Ok(report)) => {
                let notifications = &ctx.services.notifications;
                if report.issues.is_empty() {
                    notifications.success("System check complete, everything is healthy");
                } else {
                    notifications.warning(format!(
                        "System check complete, found {} issues",
                        report.issues.len()
                    ));
                }
            }
            DashboardPull::HealthChecked(Err(err)) => ctx.report("System check failed", &err),
        }
    }

    fn on_command(&mut self, ctx: &PageContext<Self>, command: DashboardCommand) {
        match command {
            DashboardCommand::Refresh => self.load(ctx),
            DashboardCommand::RestartAllStrategies => self.restart_all(ctx),
            DashboardCommand::SystemCheck => self.system_check(ctx),
        }
    }
}

fn apply_system(ctx: &PageContext<DashboardPage>, system: &SystemSummary) {
    let surface = &ctx.services.surface;
    if let Some(database) = &system.database {
        surface.set_html(DATABASE_STATUS, &render_database_status(database.connected));
    }
    if let Some(load) = &system.load {
        surface.set_html(SYSTEM_LOAD, &render_load(load.cpu));
    }
    if let Some(memory) = &system.memory {
        surface.set_html(MEMORY_USAGE, &render_load(memory.percent));
    }
    if let Some(disk) = &system.disk {
        surface.set_html(DISK_USAGE, &render_load(disk.percent));
    }
}

fn apply_strategies(ctx: &PageContext<DashboardPage>, strategies: &StrategySummary) {
    let surface = &ctx.services.surface;
    surface.set_text(ACTIVE_STRATEGIES, &strategies.active_count.to_string());
    surface.set_html(TOTAL_PNL, &render_pnl(strategies.total_pnl));
    surface.set_text(TODAY_TRADES, &strategies.today_trades.to_string());
}

/// Empty series leave the chart untouched
fn apply_performance(ctx: &PageContext<DashboardPage>, points: &[LoadPoint]) {
    if points.is_empty() {
        return;
    }
    ctx.services
        .charts
        .update_chart(OVERVIEW_CHART, UpdateMode::None, |data| {
            data.labels = points.iter().map(|p| format_clock(p.timestamp.as_utc())).collect();
            data.set_series(0, points.iter().map(|p| p.system_load).collect());
            data.set_series(1, points.iter().map(|p| p.active_strategies).collect());
        });
}

pub fn overview_chart() -> ChartConfig {
    ChartConfig::new(
        ChartKind::Line,
        ChartData::new(vec![
            Dataset::line("System load", ChartColor::PRIMARY).filled(),
            Dataset::line("Active strategies", ChartColor::SUCCESS).on_axis("y1"),
        ]),
    )
    .with_options(json!({
        "interaction": { "mode": "index", "intersect": false },
        "scales": {
            "x": { "display": true, "title": { "display": true, "text": "Time" } },
            "y": {
                "type": "linear",
                "position": "left",
                "title": { "display": true, "text": "System load (%)" },
                "min": 0,
                "max": 100
            },
            "y1": {
                "type": "linear",
                "position": "right",
                "title": { "display": true, "text": "Active strategies" },
                "grid": { "drawOnChartArea": false },
                "min": 0
            }
        }
    }))
}

pub fn render_database_status(connected: bool) -> String {
    let (icon, class, text) = if connected {
        ("fa-check-circle", "text-success", "Online")
    } else {
        ("fa-times-circle", "text-danger", "Offline")
    };
    format!(r#"<i class="fas {icon} {class}"></i><span class="ms-1">{text}</span>"#)
}

/// Utilisation figure coloured by threshold
pub fn render_load(percent: f64) -> String {
    format!(
        r#"<span class="{}">{}</span>"#,
        load_class(percent),
        format_percent(Some(percent), 1)
    )
}

/// Signed P&L: `+` and green at or above zero
pub fn render_pnl(pnl: f64) -> String {
    let (class, sign) = if pnl >= 0.0 {
        ("text-success", "+")
    } else {
        ("text-danger", "")
    };
    format!(
        r#"<span class="{class}">{sign}{}</span>"#,
        format_number(Some(pnl), 2)
    )
}

pub fn render_stream_tables(tables: &[StreamTable]) -> String {
    if tables.is_empty() {
        return r#"<div class="text-center text-muted py-2"><small>No stream tables</small></div>"#
            .to_string();
    }

    let mut html = String::from(r#"<div class="row g-2">"#);
    for table in tables.iter().take(STREAM_TABLE_PREVIEW) {
        let (class, icon) = if table.exists {
            ("success", "check-circle")
        } else {
            ("danger", "times-circle")
        };
        let name = html_escape(&table.name);
        html.push_str(&format!(
            r#"<div class="col-6"><div class="d-flex align-items-center"><i class="fas fa-{icon} text-{class} me-2"></i><small class="text-truncate" title="{name}">{name}</small></div></div>"#
        ));
    }
    html.push_str("</div>");

    if tables.len() > STREAM_TABLE_PREVIEW {
        html.push_str(&format!(
            r#"<div class="text-center mt-2"><small class="text-muted">+{} more</small></div>"#,
            tables.len() - STREAM_TABLE_PREVIEW
        ));
    }
    html
}

pub fn render_activity(activities: &[Activity], now: DateTime<Utc>) -> String {
    if activities.is_empty() {
        return r#"<div class="text-center text-muted py-3"><small>No recent activity</small></div>"#
            .to_string();
    }

    activities
        .iter()
        .take(ACTIVITY_PREVIEW)
        .map(|activity| {
            format!(
                r#"<div class="d-flex align-items-start mb-2"><i class="fas {} {} me-2 mt-1"></i><div class="flex-grow-1"><div class="small">{}</div><div class="text-muted" style="font-size: 0.75rem;">{}</div></div></div>"#,
                activity_icon(activity.kind),
                activity_color(activity.kind),
                html_escape(&activity.message),
                relative_time(Some(activity.timestamp.as_utc()), now),
            )
        })
        .collect()
}

pub fn activity_icon(kind: ActivityKind) -> &'static str {
    match kind {
        ActivityKind::Strategy => "fa-cogs",
        ActivityKind::System => "fa-server",
        ActivityKind::Alert => "fa-exclamation-triangle",
        ActivityKind::Trade => "fa-exchange-alt",
        ActivityKind::Error => "fa-times-circle",
        ActivityKind::Info => "fa-info-circle",
        ActivityKind::Other => "fa-circle",
    }
}

pub fn activity_color(kind: ActivityKind) -> &'static str {
    match kind {
        ActivityKind::Strategy => "text-primary",
        ActivityKind::System => "text-info",
        ActivityKind::Alert => "text-warning",
        ActivityKind::Trade => "text-success",
        ActivityKind::Error => "text-danger",
        ActivityKind::Info | ActivityKind::Other => "text-muted",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use monitor_core::Timestamp;

    fn table(name: &str, exists: bool) -> StreamTable {
        StreamTable {
            name: name.to_string(),
            exists,
            row_count: None,
            last_update: None,
        }
    }

    #[test]
    fn test_load_thresholds() {
        assert_eq!(render_load(85.0), r#"<span class="text-danger">85.0%</span>"#);
        assert_eq!(render_load(61.0), r#"<span class="text-warning">61.0%</span>"#);
        assert_eq!(render_load(60.0), r#"<span class="text-success">60.0%</span>"#);
    }

    #[test]
    fn test_pnl_sign() {
        assert!(render_pnl(1234.5).contains("+1,234.50"));
        assert!(render_pnl(0.0).contains("text-success"));
        let negative = render_pnl(-20.0);
        assert!(negative.contains("text-danger"));
        assert!(negative.contains(">-20.00<"));
    }

    #[test]
    fn test_stream_tables_preview() {
        let tables: Vec<_> = (0..8).map(|i| table(&format!("tick_{i}"), i % 2 == 0)).collect();
        let html = render_stream_tables(&tables);
        assert!(html.contains("tick_5"));
        assert!(!html.contains("tick_6"));
        assert!(html.contains("+2 more"));
        assert!(html.contains("text-danger"));

        let html = render_stream_tables(&tables[..3]);
        assert!(!html.contains("more"));
        assert!(render_stream_tables(&[]).contains("No stream tables"));
    }

    #[test]
    fn test_activity_preview_and_escaping() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let activities: Vec<_> = (0..7)
            .map(|i| Activity {
                kind: if i == 0 { ActivityKind::Trade } else { ActivityKind::Other },
                message: format!("event <{i}>"),
                timestamp: Timestamp(now - chrono::Duration::minutes(i * 2)),
            })
            .collect();

        let html = render_activity(&activities, now);
        assert!(html.contains("event &lt;0&gt;"));
        assert!(html.contains("event &lt;4&gt;"));
        assert!(!html.contains("event &lt;5&gt;"));
        assert!(html.contains("fa-exchange-alt text-success"));
        assert!(html.contains("just now"));
        assert!(html.contains("8 minutes ago"));
    }

    #[test]
    fn test_database_status() {
        assert!(render_database_status(true).contains("Online"));
        assert!(render_database_status(false).contains("text-danger"));
    }

    #[test]
    fn test_overview_chart_axes() {
        let config = overview_chart();
        assert_eq!(config.data.datasets.len(), 2);
        assert_eq!(config.data.datasets[1].y_axis_id.as_deref(), Some("y1"));
        assert_eq!(config.options["scales"]["y"]["max"], 100);
    }
}
