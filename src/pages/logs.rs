//! Log stream page: bounded store, filters, statistics and export

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use event_bus::LogsEvent;
use monitor_core::format::{format_clock, format_time, html_escape, relative_time, status_color};
use monitor_core::{
    export_logs, highlight_keyword, LogFilter, LogRecord, LogStore, MonitorResult, SeriesWindow,
};
use serde_json::json;
use tracing::{info, warn};
use ui_kit::{
    ChartColor, ChartConfig, ChartData, ChartKind, Dataset, Debouncer, NotifyLevel, UpdateMode,
};

use super::{Page, PageContext};

pub const STATUS: &str = "logs-connection-status";
pub const LOG_STREAM: &str = "log-stream-container";
pub const TOTAL_LOGS: &str = "total-logs";
pub const INFO_LOGS: &str = "info-logs";
pub const WARNING_LOGS: &str = "warning-logs";
pub const ERROR_LOGS: &str = "error-logs";
pub const LEVEL_FILTER: &str = "log-level-filter";
pub const COMPONENT_FILTER: &str = "component-filter";
pub const SEARCH_KEYWORD: &str = "search-keyword";
pub const AUTO_SCROLL_BUTTON: &str = "auto-scroll-btn";
pub const STATS_CHART: &str = "log-stats-chart";
pub const TREND_CHART: &str = "log-trend-chart";

const ALERT_DURATION: Duration = Duration::from_secs(10);
const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
const TREND_POINTS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogsTimer {
    Statistics,
}

pub enum LogsPull {
    Recent(MonitorResult<Vec<LogRecord>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogsCommand {
    Refresh,
    ApplyFilter(LogFilter),
    ClearFilter,
    /// Keystroke in the search box; applied once typing pauses
    SearchKeyword(String),
    ApplyKeyword(String),
    ToggleAutoScroll,
    Export,
}

#[derive(Debug)]
pub struct LogsPage {
    stats_interval: Duration,
    recent_limit: usize,
    store: LogStore,
    auto_scroll: bool,
    trend: SeriesWindow,
    search: Debouncer,
}

impl LogsPage {
    pub fn new(stats_interval: Duration, max_logs: usize, recent_limit: usize) -> Self {
        Self {
            stats_interval,
            recent_limit,
            store: LogStore::new(max_logs),
            auto_scroll: true,
            trend: SeriesWindow::new(TREND_POINTS, 1),
            search: Debouncer::new(SEARCH_DEBOUNCE),
        }
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    fn load(&self, ctx: &PageContext<Self>) {
        let api = ctx.services.api.clone();
        let limit = self.recent_limit;
        ctx.spawn_pull(async move { LogsPull::Recent(api.recent_logs(Some(limit)).await) });
    }

    fn render_stream(&self, ctx: &PageContext<Self>) -> usize {
        let visible = self.store.filtered();
        let keyword = self.store.filter().keyword.as_deref();
        ctx.services
            .surface
            .set_html(LOG_STREAM, &render_log_stream(&visible, keyword, Utc::now()));
        visible.len()
    }

    /// Cards and doughnut from the store's current counters
    fn render_stats(&self, ctx: &PageContext<Self>) {
        let stats = self.store.stats();
        let surface = &ctx.services.surface;
        surface.set_text(TOTAL_LOGS, &stats.total.to_string());
        surface.set_text(INFO_LOGS, &stats.info.to_string());
        surface.set_text(WARNING_LOGS, &stats.warning.to_string());
        surface.set_text(ERROR_LOGS, &stats.error.to_string());
        ctx.services
            .charts
            .update_chart(STATS_CHART, UpdateMode::None, |data| {
                data.set_series(0, stats.distribution().to_vec())
            });
    }

    fn record_trend(&mut self, ctx: &PageContext<Self>) {
        let total = self.store.stats().total as f64;
        self.trend.push(format_clock(&Local::now()), &[total]);
        let series = self.trend.snapshot();
        ctx.services
            .charts
            .update_chart(TREND_CHART, UpdateMode::None, |data| data.apply_snapshot(&series));
    }

    fn render_auto_scroll(&self, ctx: &PageContext<Self>) {
        let surface = &ctx.services.surface;
        let label = if self.auto_scroll {
            r#"<i class="fas fa-pause"></i> Pause scrolling"#
        } else {
            r#"<i class="fas fa-play"></i> Auto scroll"#
        };
        surface.set_html(AUTO_SCROLL_BUTTON, label);
        surface.set_class(AUTO_SCROLL_BUTTON, "btn-warning", self.auto_scroll);
        surface.set_class(AUTO_SCROLL_BUTTON, "btn-success", !self.auto_scroll);
    }

    fn render_filter_inputs(&self, ctx: &PageContext<Self>) {
        let filter = self.store.filter();
        let surface = &ctx.services.surface;
        surface.set_text(LEVEL_FILTER, filter.level.map(|l| l.as_str()).unwrap_or(""));
        surface.set_text(COMPONENT_FILTER, filter.component.as_deref().unwrap_or(""));
        surface.set_text(SEARCH_KEYWORD, filter.keyword.as_deref().unwrap_or(""));
    }

    fn export(&self, ctx: &PageContext<Self>) {
        let visible = self.store.filtered();
        match export_logs(&visible, Utc::now().date_naive()) {
            Ok(file) => {
                info!(filename = %file.filename, records = visible.len(), "📤 logs exported");
                ctx.services.surface.offer_download(&file);
                ctx.services.notifications.success("Logs exported");
            }
            Err(err) => ctx.report("Failed to export logs", &err),
        }
    }
}

impl Page for LogsPage {
    type Event = LogsEvent;
    type Timer = LogsTimer;
    type Pull = LogsPull;
    type Command = LogsCommand;

    const NAME: &'static str = "logs";
    const TITLE: &'static str = "Logs & alerts";
    const STATUS_ANCHOR: &'static str = STATUS;
    const ANCHORS: &'static [&'static str] = &[
        STATUS,
        LOG_STREAM,
        TOTAL_LOGS,
        INFO_LOGS,
        WARNING_LOGS,
        ERROR_LOGS,
        LEVEL_FILTER,
        COMPONENT_FILTER,
        SEARCH_KEYWORD,
        AUTO_SCROLL_BUTTON,
        STATS_CHART,
        TREND_CHART,
    ];
    const CHARTS: &'static [&'static str] = &[STATS_CHART, TREND_CHART];

    fn timers(&self) -> Vec<(LogsTimer, Duration)> {
        vec![(LogsTimer::Statistics, self.stats_interval)]
    }

    fn start(&mut self, ctx: &PageContext<Self>) {
        let charts = &ctx.services.charts;
        if let Err(err) = charts.create_chart(STATS_CHART, stats_chart()) {
            err.log_error("Log statistics chart");
        }
        if let Err(err) = charts.create_chart(TREND_CHART, trend_chart()) {
            err.log_error("Log trend chart");
        }
        self.render_auto_scroll(ctx);
        self.load(ctx);
    }

    fn on_push(&mut self, ctx: &PageContext<Self>, event: LogsEvent) {
        match event {
            LogsEvent::NewLog(record) => {
                self.store.push(record);
                self.render_stats(ctx);
                self.render_stream(ctx);
                if self.auto_scroll {
                    ctx.services.surface.scroll_to_top(LOG_STREAM);
                }
            }
            LogsEvent::LogStatsUpdate(stats) => {
                self.store.set_stats(stats);
                self.render_stats(ctx);
            }
            LogsEvent::AlertRuleTriggered(alert) => {
                warn!(rule = %alert.rule_name, message = %alert.message, "log alert rule triggered");
                ctx.services.notifications.show(
                    format!("Log alert: {} - {}", alert.rule_name, alert.message),
                    NotifyLevel::Warning,
                    ALERT_DURATION,
                );
            }
        }
    }

    fn on_tick(&mut self, ctx: &PageContext<Self>, timer: LogsTimer) {
        match timer {
            LogsTimer::Statistics => {
                let stats = self.store.recompute_stats();
                self.store.set_stats(stats);
                self.render_stats(ctx);
                self.record_trend(ctx);
            }
        }
    }

    fn on_pull(&mut self, ctx: &PageContext<Self>, pulled: LogsPull) {
        match pulled {
            LogsPull::Recent(Ok(records)) => {
                self.store.replace(records);
                self.render_stream(ctx);
                self.render_stats(ctx);
            }
            LogsPull::Recent(Err(err)) => ctx.report("Failed to load logs", &err),
        }
    }

    fn on_command(&mut self, ctx: &PageContext<Self>, command: LogsCommand) {
        match command {
            LogsCommand::Refresh => self.load(ctx),
            LogsCommand::ApplyFilter(filter) => {
                self.search.cancel();
                self.store.set_filter(filter);
                self.render_filter_inputs(ctx);
                let shown = self.render_stream(ctx);
                ctx.services
                    .notifications
                    .info(format!("Filter applied, showing {shown} logs"));
            }
            LogsCommand::ClearFilter => {
                self.search.cancel();
                self.store.clear_filter();
                self.render_filter_inputs(ctx);
                self.render_stream(ctx);
                ctx.services.notifications.info("All filters cleared");
            }
            LogsCommand::SearchKeyword(keyword) => {
                let sender = ctx.sender();
                self.search.call(move || {
                    sender.send(LogsCommand::ApplyKeyword(keyword));
                });
            }
            LogsCommand::ApplyKeyword(keyword) => {
                let current = self.store.filter().clone();
                self.store
                    .set_filter(LogFilter::new(current.level, current.component, Some(keyword)));
                self.render_stream(ctx);
            }
            LogsCommand::ToggleAutoScroll => {
                self.auto_scroll = !self.auto_scroll;
                self.render_auto_scroll(ctx);
                let state = if self.auto_scroll { "enabled" } else { "disabled" };
                ctx.services.notifications.info(format!("Auto scroll {state}"));
            }
            LogsCommand::Export => self.export(ctx),
        }
    }

    fn teardown(&mut self, _ctx: &PageContext<Self>) {
        self.search.cancel();
    }
}

pub fn stats_chart() -> ChartConfig {
    ChartConfig::new(
        ChartKind::Doughnut,
        ChartData::new(vec![Dataset::segments(
            "Log levels",
            &[ChartColor::INFO, ChartColor::WARNING, ChartColor::DANGER],
        )])
        .with_labels(["Info", "Warning", "Error"]),
    )
    .with_options(json!({ "plugins": { "legend": { "position": "bottom" } } }))
}

pub fn trend_chart() -> ChartConfig {
    ChartConfig::new(
        ChartKind::Line,
        ChartData::new(vec![Dataset::line("Log count", ChartColor::PRIMARY).filled()]),
    )
    .with_options(json!({
        "scales": {
            "x": { "display": true, "title": { "display": true, "text": "Time" } },
            "y": {
                "display": true,
                "title": { "display": true, "text": "Log count" },
                "beginAtZero": true
            }
        },
        "plugins": { "legend": { "display": false } }
    }))
}

pub fn render_log_stream(
    records: &[&LogRecord],
    keyword: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    if records.is_empty() {
        return r#"<div class="text-center text-muted py-4"><i class="fas fa-info-circle fa-2x mb-2"></i><p>No logs</p></div>"#
            .to_string();
    }

    records
        .iter()
        .map(|record| render_log_entry(record, keyword, now))
        .collect()
}

pub fn render_log_entry(record: &LogRecord, keyword: Option<&str>, now: DateTime<Utc>) -> String {
    let level = record.level.css_class();
    let component = html_escape(&record.component);
    let timestamp = record.timestamp.as_utc();
    format!(
        r#"<div class="log-entry {level}" data-level="{}" data-component="{component}"><div class="d-flex justify-content-between align-items-start"><div class="flex-grow-1"><div class="d-flex align-items-center mb-1"><span class="badge bg-{} me-2">{}</span><span class="text-muted small">{component}</span><span class="text-muted small ms-auto" title="{}">{}</span></div><div class="log-message">{}</div></div></div></div>"#,
        record.level,
        status_color(level),
        record.level,
        format_time(Some(timestamp)),
        relative_time(Some(timestamp), now),
        highlight_keyword(&record.message, keyword),
    )
}
