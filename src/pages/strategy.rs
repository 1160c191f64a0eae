//! Strategy control page: the strategy x symbol matrix and live market view

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use event_bus::StrategyEvent;
use monitor_core::format::{
    format_clock, format_number, format_time, html_escape, relative_time, NOT_AVAILABLE,
};
use monitor_core::{
    Direction, MatrixStats, MonitorError, MonitorResult, PerformancePoint, Position, Signal,
    SpreadStat, StrategyCell, StrategyMatrix, Tick,
};
use serde_json::json;
use tracing::{debug, info};
use ui_kit::{
    ChartColor, ChartConfig, ChartData, ChartKind, ConfirmOptions, Dataset, NotifyLevel, Throttle,
    UpdateMode,
};

use super::{Page, PageContext};

pub const STATUS: &str = "strategy-connection-status";
pub const MATRIX: &str = "strategy-matrix-container";
pub const TOTAL_STRATEGIES: &str = "total-strategies";
pub const ACTIVE_STRATEGIES: &str = "active-strategies-count";
pub const TOTAL_SYMBOLS: &str = "total-symbols";
pub const ACTIVE_SUBSCRIPTIONS: &str = "active-subscriptions";
pub const SIGNALS: &str = "recent-signals-container";
pub const POSITIONS: &str = "current-positions-container";
pub const LAST_PRICE: &str = "last-price";
pub const BID_PRICE: &str = "bid-price";
pub const ASK_PRICE: &str = "ask-price";
pub const BID_VOLUME: &str = "bid-volume";
pub const ASK_VOLUME: &str = "ask-volume";
pub const SPREAD_VALUE: &str = "spread-value";
pub const SPREAD_PCT: &str = "spread-pct";
pub const TICK_STREAM: &str = "tick-stream";
pub const PERFORMANCE_CHART: &str = "strategy-performance-chart";
pub const SPREAD_CHART: &str = "spread-chart";

const SIGNAL_PREVIEW: usize = 10;
const TICK_PREVIEW: usize = 15;
const FAILURE_NOTICE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyTimer {
    Refresh,
    LiveTicks,
}

pub enum StrategyPull {
    Matrix(MonitorResult<Vec<StrategyCell>>),
    Performance(MonitorResult<Vec<PerformancePoint>>),
    Signals(MonitorResult<Vec<Signal>>),
    Positions(MonitorResult<Vec<Position>>),
    Ticks(MonitorResult<Vec<Tick>>),
    Spread(MonitorResult<Vec<SpreadStat>>),
    Toggled {
        strategy_name: String,
        symbol: String,
        result: MonitorResult<()>,
    },
    /// Enable-all or disable-all; `None` when the confirm was declined
    Bulk {
        enable: bool,
        result: Option<MonitorResult<()>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyCommand {
    Refresh,
    ReloadMatrix,
    Toggle { strategy_name: String, symbol: String },
    EnableAll,
    DisableAll,
}

#[derive(Debug)]
pub struct StrategyPage {
    refresh: Duration,
    live_ticks: Duration,
    spread_points: usize,
    matrix: StrategyMatrix,
    latest_tick: Option<Tick>,
    market_failures: Throttle,
}

impl StrategyPage {
    pub fn new(refresh: Duration, live_ticks: Duration, spread_points: usize) -> Self {
        Self {
            refresh,
            live_ticks,
            spread_points,
            matrix: StrategyMatrix::new(),
            latest_tick: None,
            market_failures: Throttle::new(FAILURE_NOTICE_INTERVAL),
        }
    }

    pub fn matrix(&self) -> &StrategyMatrix {
        &self.matrix
    }

    pub fn latest_tick(&self) -> Option<&Tick> {
        self.latest_tick.as_ref()
    }

    fn load_matrix(&self, ctx: &PageContext<Self>) {
        let api = ctx.services.api.clone();
        ctx.spawn_pull(async move { StrategyPull::Matrix(api.strategy_matrix().await) });
    }

    fn load_ticks(&self, ctx: &PageContext<Self>) {
        let api = ctx.services.api.clone();
        ctx.spawn_pull(async move { StrategyPull::Ticks(api.live_ticks().await) });
    }

    fn refresh_all(&self, ctx: &PageContext<Self>) {
        self.load_matrix(ctx);
        self.load_ticks(ctx);

        let api = ctx.services.api.clone();
        ctx.spawn_pull(async move { StrategyPull::Performance(api.strategy_performance().await) });
        let api = ctx.services.api.clone();
        ctx.spawn_pull(async move { StrategyPull::Signals(api.recent_signals().await) });
        let api = ctx.services.api.clone();
        ctx.spawn_pull(async move { StrategyPull::Positions(api.positions().await) });
        let api = ctx.services.api.clone();
        ctx.spawn_pull(async move { StrategyPull::Spread(api.spread_stats().await) });
    }

    fn toggle(&self, ctx: &PageContext<Self>, strategy_name: String, symbol: String) {
        let api = ctx.services.api.clone();
        ctx.spawn_pull(async move {
            let result = api.toggle_strategy(&strategy_name, &symbol).await;
            StrategyPull::Toggled {
                strategy_name,
                symbol,
                result,
            }
        });
    }

    fn bulk(&self, ctx: &PageContext<Self>, enable: bool) {
        let api = ctx.services.api.clone();
        let overlay = ctx.services.overlay.clone();
        ctx.spawn_pull(async move {
            let (title, message) = if enable {
                ("Enable strategies", "Enable all strategies?")
            } else {
                ("Disable strategies", "Disable all strategies?")
            };
            let confirmed = overlay
                .confirm(ConfirmOptions::new(title, message).level(NotifyLevel::Warning))
                .await;
            if !confirmed {
                return StrategyPull::Bulk { enable, result: None };
            }

            overlay.show_loading(title);
            let result = if enable {
                api.enable_all_strategies().await
            } else {
                api.disable_all_strategies().await
            };
            overlay.hide_loading();
            StrategyPull::Bulk {
                enable,
                result: Some(result),
            }
        });
    }

    fn render_matrix(&self, ctx: &PageContext<Self>) {
        let surface = &ctx.services.surface;
        surface.set_html(MATRIX, &render_matrix(&self.matrix));

        let stats = self.matrix.stats();
        render_stats(ctx, &stats);
    }

    /// Market pulls poll every second; failures are traced every time but
    /// notified at most once per interval.
    fn market_failure(&self, ctx: &PageContext<Self>, context: &str, err: &MonitorError) {
        if self.market_failures.ready() {
            ctx.report(context, err);
        } else {
            debug!(error = %err, "{context}");
        }
    }
}

impl Page for StrategyPage {
    type Event = StrategyEvent;
    type Timer = StrategyTimer;
    type Pull = StrategyPull;
    type Command = StrategyCommand;

    const NAME: &'static str = "strategy";
    const TITLE: &'static str = "Strategy control";
    const STATUS_ANCHOR: &'static str = STATUS;
    const ANCHORS: &'static [&'static str] = &[
        STATUS,
        MATRIX,
        TOTAL_STRATEGIES,
        ACTIVE_STRATEGIES,
        TOTAL_SYMBOLS,
        ACTIVE_SUBSCRIPTIONS,
        SIGNALS,
        POSITIONS,
        LAST_PRICE,
        BID_PRICE,
        ASK_PRICE,
        BID_VOLUME,
        ASK_VOLUME,
        SPREAD_VALUE,
        SPREAD_PCT,
        TICK_STREAM,
        PERFORMANCE_CHART,
        SPREAD_CHART,
    ];
    const CHARTS: &'static [&'static str] = &[PERFORMANCE_CHART, SPREAD_CHART];

    fn timers(&self) -> Vec<(StrategyTimer, Duration)> {
        vec![
            (StrategyTimer::Refresh, self.refresh),
            (StrategyTimer::LiveTicks, self.live_ticks),
        ]
    }

    fn start(&mut self, ctx: &PageContext<Self>) {
        let charts = &ctx.services.charts;
        if let Err(err) = charts.create_chart(PERFORMANCE_CHART, performance_chart()) {
            err.log_error("Performance chart");
        }
        if let Err(err) = charts.create_chart(SPREAD_CHART, spread_chart()) {
            err.log_error("Spread chart");
        }
        self.refresh_all(ctx);
    }

    fn on_push(&mut self, ctx: &PageContext<Self>, event: StrategyEvent) {
        match event {
            StrategyEvent::StrategyMatrixUpdate(cells) => {
                self.matrix.replace(cells);
                self.render_matrix(ctx);
            }
            StrategyEvent::StrategyPerformanceUpdate(points) => apply_performance(ctx, &points),
            StrategyEvent::StrategyStatusChange(change) => {
                let state = if change.enabled { "enabled" } else { "disabled" };
                ctx.services.notifications.info(format!(
                    "Strategy status changed: {}-{} {state}",
                    change.strategy_name, change.symbol
                ));
                self.load_matrix(ctx);
            }
            StrategyEvent::StrategyUpdated(change) => {
                self.matrix
                    .set(&change.strategy_name, &change.symbol, change.enabled);
                self.render_matrix(ctx);
            }
        }
    }

    fn on_tick(&mut self, ctx: &PageContext<Self>, timer: StrategyTimer) {
        match timer {
            StrategyTimer::Refresh => self.refresh_all(ctx),
            StrategyTimer::LiveTicks => self.load_ticks(ctx),
        }
    }

    fn on_pull(&mut self, ctx: &PageContext<Self>, pulled: StrategyPull) {
        let surface = &ctx.services.surface;
        match pulled {
            StrategyPull::Matrix(Ok(cells)) => {
                self.matrix.replace(cells);
                self.render_matrix(ctx);
            }
            StrategyPull::Matrix(Err(err)) => ctx.report("Failed to load strategy matrix", &err),

            StrategyPull::Performance(Ok(points)) => apply_performance(ctx, &points),
            StrategyPull::Performance(Err(err)) => {
                ctx.report("Failed to load strategy performance", &err)
            }

            StrategyPull::Signals(Ok(signals)) if signals.is_empty() => {}
            StrategyPull::Signals(Ok(signals)) => {
                surface.set_html(SIGNALS, &render_signals(&signals, Utc::now()));
            }
            StrategyPull::Signals(Err(err)) => ctx.report("Failed to load signals", &err),

            StrategyPull::Positions(Ok(positions)) => {
                surface.set_html(POSITIONS, &render_positions(&positions));
            }
            StrategyPull::Positions(Err(err)) => ctx.report("Failed to load positions", &err),

            StrategyPull::Ticks(Ok(ticks)) => {
                if let Some(latest) = ticks.first() {
                    render_quote(ctx, latest);
                    surface.set_html(TICK_STREAM, &render_tick_stream(&ticks));
                    surface.scroll_to_top(TICK_STREAM);
                    self.latest_tick = Some(latest.clone());
                }
            }
            StrategyPull::Ticks(Err(err)) => self.market_failure(ctx, "Failed to load live ticks", &err),

            StrategyPull::Spread(Ok(stats)) => {
                apply_spread(ctx, &stats, self.spread_points);
            }
            StrategyPull::Spread(Err(err)) => {
                self.market_failure(ctx, "Failed to load spread statistics", &err)
            }

            StrategyPull::Toggled {
                strategy_name,
                symbol,
                result: Ok(()),
            } => {
                ctx.services
                    .notifications
                    .success(format!("Strategy {strategy_name}-{symbol} updated"));
                if let Some(enabled) = self.matrix.toggle(&strategy_name, &symbol) {
                    info!(strategy = %strategy_name, %symbol, enabled, "strategy toggled");
                    self.render_matrix(ctx);
                }
            }
            StrategyPull::Toggled {
                result: Err(err), ..
            } => ctx.report("Failed to update strategy", &err),

            StrategyPull::Bulk { result: None, .. } => {}
            StrategyPull::Bulk {
                enable,
                result: Some(Ok(())),
            } => {
                let message = if enable {
                    "All strategies enabled"
                } else {
                    "All strategies disabled"
                };
                ctx.services.notifications.success(message);
                self.load_matrix(ctx);
            }
            StrategyPull::Bulk {
                enable,
                result: Some(Err(err)),
            } => {
                let context = if enable {
                    "Failed to enable all strategies"
                } else {
                    "Failed to disable all strategies"
                };
                ctx.report(context, &err);
            }
        }
    }

    fn on_command(&mut self, ctx: &PageContext<Self>, command: StrategyCommand) {
        match command {
            StrategyCommand::Refresh => self.refresh_all(ctx),
            StrategyCommand::ReloadMatrix => self.load_matrix(ctx),
            StrategyCommand::Toggle {
                strategy_name,
                symbol,
            } => self.toggle(ctx, strategy_name, symbol),
            StrategyCommand::EnableAll => self.bulk(ctx, true),
            StrategyCommand::DisableAll => self.bulk(ctx, false),
        }
    }
}

fn render_stats(ctx: &PageContext<StrategyPage>, stats: &MatrixStats) {
    let surface = &ctx.services.surface;
    surface.set_text(TOTAL_STRATEGIES, &stats.total.to_string());
    surface.set_text(ACTIVE_STRATEGIES, &stats.active.to_string());
    surface.set_text(TOTAL_SYMBOLS, &stats.symbols.to_string());
    surface.set_text(ACTIVE_SUBSCRIPTIONS, &stats.active.to_string());
}

fn render_quote(ctx: &PageContext<StrategyPage>, tick: &Tick) {
    let surface = &ctx.services.surface;
    surface.set_text(LAST_PRICE, &format_number(Some(tick.last_price), 2));
    surface.set_text(BID_PRICE, &format_number(Some(tick.bid_price), 2));
    surface.set_text(ASK_PRICE, &format_number(Some(tick.ask_price), 2));
    surface.set_text(BID_VOLUME, &tick.bid_volume.to_string());
    surface.set_text(ASK_VOLUME, &tick.ask_volume.to_string());
    surface.set_text(SPREAD_VALUE, &format_number(Some(tick.spread), 2));
    surface.set_text(SPREAD_PCT, &spread_pct_text(tick));
}

fn apply_performance(ctx: &PageContext<StrategyPage>, points: &[PerformancePoint]) {
    if points.is_empty() {
        return;
    }
    ctx.services
        .charts
        .update_chart(PERFORMANCE_CHART, UpdateMode::None, |data| {
            data.labels = points
                .iter()
                .map(|p| format_time(Some(p.timestamp.as_utc())))
                .collect();
            data.set_series(0, points.iter().map(|p| p.total_pnl).collect());
            data.set_series(1, points.iter().map(|p| p.sharpe_ratio).collect());
        });
}

/// Only the newest `limit` points are charted
fn apply_spread(ctx: &PageContext<StrategyPage>, stats: &[SpreadStat], limit: usize) {
    if stats.is_empty() {
        return;
    }
    let recent = &stats[stats.len().saturating_sub(limit)..];
    ctx.services
        .charts
        .update_chart(SPREAD_CHART, UpdateMode::None, |data| {
            data.labels = recent
                .iter()
                .map(|s| format_time(Some(s.timestamp.as_utc())))
                .collect();
            data.set_series(0, recent.iter().map(|s| s.spread).collect());
            data.set_series(1, recent.iter().map(|s| s.spread_pct).collect());
        });
}

pub fn performance_chart() -> ChartConfig {
    ChartConfig::new(
        ChartKind::Line,
        ChartData::new(vec![
            Dataset::line("Total P&L", ChartColor::PRIMARY).filled(),
            Dataset::line("Sharpe ratio", ChartColor::SUCCESS).on_axis("y1"),
        ]),
    )
    .with_options(dual_axis_options("P&L", "Sharpe ratio"))
}

pub fn spread_chart() -> ChartConfig {
    ChartConfig::new(
        ChartKind::Line,
        ChartData::new(vec![
            Dataset::line("Spread", ChartColor::WARNING).filled(),
            Dataset::line("Spread %", ChartColor::ACCENT).on_axis("y1"),
        ]),
    )
    .with_options(dual_axis_options("Spread", "Spread (%)"))
}

fn dual_axis_options(left: &str, right: &str) -> serde_json::Value {
    json!({
        "interaction": { "mode": "index", "intersect": false },
        "scales": {
            "x": { "display": true, "title": { "display": true, "text": "Time" } },
            "y": {
                "type": "linear",
                "position": "left",
                "title": { "display": true, "text": left }
            },
            "y1": {
                "type": "linear",
                "position": "right",
                "title": { "display": true, "text": right },
                "grid": { "drawOnChartArea": false }
            }
        }
    })
}

/// Strategies as rows, symbols as columns, both in first-seen order
pub fn render_matrix(matrix: &StrategyMatrix) -> String {
    if matrix.is_empty() {
        return r#"<div class="text-center text-muted py-4"><i class="fas fa-info-circle fa-2x mb-2"></i><p>No strategies</p></div>"#
            .to_string();
    }

    let symbols = matrix.symbols();
    let mut html = String::from(
        r#"<div class="table-responsive"><table class="table table-hover"><thead><tr><th>Strategy \ Symbol</th>"#,
    );
    for symbol in &symbols {
        html.push_str(&format!(
            r#"<th class="text-center">{}</th>"#,
            html_escape(symbol)
        ));
    }
    html.push_str("</tr></thead><tbody>");

    for strategy in matrix.strategies() {
        let strategy_attr = html_escape(strategy);
        html.push_str(&format!(r#"<tr><td class="fw-bold">{strategy_attr}</td>"#));
        for symbol in &symbols {
            match matrix.get(strategy, symbol) {
                Some(enabled) => {
                    let (class, text) = if enabled { ("enabled", "ON") } else { ("disabled", "OFF") };
                    html.push_str(&format!(
                        r#"<td class="text-center"><button class="strategy-toggle {class}" data-strategy="{strategy_attr}" data-symbol="{}">{text}</button></td>"#,
                        html_escape(symbol)
                    ));
                }
                None => html.push_str(r#"<td class="text-center text-muted">-</td>"#),
            }
        }
        html.push_str("</tr>");
    }

    html.push_str("</tbody></table></div>");
    html
}

pub fn render_signals(signals: &[Signal], now: DateTime<Utc>) -> String {
    if signals.is_empty() {
        return r#"<div class="text-muted text-center py-3">No signals</div>"#.to_string();
    }

    let mut html = String::from(r#"<div class="list-group list-group-flush">"#);
    for signal in signals.iter().take(SIGNAL_PREVIEW) {
        html.push_str(&format!(
            r#"<div class="list-group-item d-flex justify-content-between align-items-center"><div><span class="badge bg-{} me-2">{}</span><strong>{}</strong><small class="text-muted ms-2">@ {}</small></div><small class="text-muted">{}</small></div>"#,
            signal.signal.color(),
            signal.signal.as_str(),
            html_escape(&signal.symbol),
            format_number(Some(signal.price), 2),
            relative_time(Some(signal.timestamp.as_utc()), now),
        ));
    }
    html.push_str("</div>");
    html
}

pub fn render_positions(positions: &[Position]) -> String {
    if positions.is_empty() {
        return r#"<div class="text-muted text-center py-3">No open positions</div>"#.to_string();
    }

    let mut html = String::from(
        r#"<div class="table-responsive"><table class="table table-sm"><thead><tr><th>Symbol</th><th>Direction</th><th>Qty</th><th>Price</th></tr></thead><tbody>"#,
    );
    for position in positions {
        let (class, icon, label) = match position.direction {
            Direction::Long => ("text-success", "fa-arrow-up", "LONG"),
            Direction::Short => ("text-danger", "fa-arrow-down", "SHORT"),
        };
        html.push_str(&format!(
            r#"<tr><td><strong>{}</strong></td><td><i class="fas {icon} {class}"></i> {label}</td><td>{}</td><td>{}</td></tr>"#,
            html_escape(&position.symbol),
            position.qty,
            format_number(Some(position.price), 2),
        ));
    }
    html.push_str("</tbody></table></div>");
    html
}

/// `"0.123%"`, or `N/A` for a zero price
pub fn spread_pct_text(tick: &Tick) -> String {
    match tick.spread_pct() {
        Some(pct) if pct.is_finite() => format!("{pct:.3}%"),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn render_tick_stream(ticks: &[Tick]) -> String {
    ticks
        .iter()
        .take(TICK_PREVIEW)
        .map(|tick| {
            format!(
                r#"<div class="tick-line mb-1"><span class="text-muted">{}</span> <strong class="text-primary">{}</strong> <span class="text-success">{}({})</span> <span class="text-danger">{}({})</span> <span class="text-warning">±{}({})</span> <span class="text-info">Vol:{}</span></div>"#,
                format_clock(&tick.timestamp.as_utc().with_timezone(&Local)),
                format_number(Some(tick.last_price), 2),
                format_number(Some(tick.bid_price), 2),
                tick.bid_volume,
                format_number(Some(tick.ask_price), 2),
                tick.ask_volume,
                format_number(Some(tick.spread), 2),
                spread_pct_text(tick),
                tick.volume,
            )
        })
        .collect()
}
