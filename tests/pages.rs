//! Page controllers driven end to end: wiremock backend, in-memory push
//! transport and an in-memory surface.

use std::sync::Arc;
use std::time::Duration;

use event_bus::{MemoryTransport, Namespace};
use serde_json::{json, Value};
use strategy_monitor::pages::{dashboard, logs, monitoring, strategy};
use strategy_monitor::prelude::*;
use ui_kit::{MemorySurface, NotifyLevel, UpdateMode};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IDLE: Duration = Duration::from_secs(3600);

struct Harness {
    server: MockServer,
    transport: MemoryTransport,
    surface: Arc<MemorySurface>,
    services: Services,
}

async fn harness<P: Page>() -> Harness {
    let server = MockServer::start().await;
    let config = MonitorConfig {
        api_base_url: format!("{}/api", server.uri()),
        auto_confirm: Some(true),
        ..MonitorConfig::default()
    };
    let transport = MemoryTransport::new();
    let surface = Arc::new(MemorySurface::with_anchors(P::ANCHORS.iter().copied()));
    let services = Services::new(&config, Arc::new(transport.clone()), surface.clone()).unwrap();

    Harness {
        server,
        transport,
        surface,
        services,
    }
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

async fn mock_get(server: &MockServer, route: &str, data: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ok(data))
        .mount(server)
        .await;
}

async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..300 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

fn has_notification(services: &Services, level: NotifyLevel, message: &str) -> bool {
    services
        .notifications
        .active()
        .iter()
        .any(|n| n.level == level && n.message == message)
}

#[tokio::test]
async fn dashboard_renders_overview_and_tears_down() {
    let h = harness::<DashboardPage>().await;
    mock_get(
        &h.server,
        "/api/dashboard/overview",
        json!({
            "system": {
                "dolphindb": { "connected": true },
                "load": { "cpu": 91.0 },
                "memory": { "percent": 40.0 },
                "disk": { "percent": 65.5 }
            },
            "strategies": { "active_count": 3, "total_pnl": 1234.5, "today_trades": 17 },
            "stream_tables": [{ "name": "tick_stream", "exists": true }],
            "recent_activity": [
                { "type": "trade", "message": "filled <BTC>", "timestamp": "2024-05-01T12:00:00Z" }
            ],
            "performance": [
                { "timestamp": "2024-05-01T12:00:00Z", "system_load": 30.0, "active_strategies": 3 },
                { "timestamp": "2024-05-01T12:01:00Z", "system_load": 35.0, "active_strategies": 4 }
            ]
        }),
    )
    .await;

    let page = launch(DashboardPage::new(IDLE), h.services.clone());

    assert!(h.transport.wait_for_subscribers(Namespace::Dashboard, 1).await);
    assert!(eventually(|| h.surface.has_class(dashboard::STATUS, "status-online")).await);
    assert_eq!(h.surface.html(dashboard::STATUS).as_deref(), Some("Connected"));

    assert!(eventually(|| h.surface.html(dashboard::ACTIVE_STRATEGIES).as_deref() == Some("3")).await);
    let pnl = h.surface.html(dashboard::TOTAL_PNL).unwrap();
    assert!(pnl.contains("+1,234.50"));
    assert!(h.surface.html(dashboard::SYSTEM_LOAD).unwrap().contains("text-danger"));
    assert!(h.surface.html(dashboard::DATABASE_STATUS).unwrap().contains("Online"));
    assert!(h.surface.html(dashboard::RECENT_ACTIVITY).unwrap().contains("filled &lt;BTC&gt;"));

    let chart = h.services.charts.get_chart(dashboard::OVERVIEW_CHART).unwrap();
    assert_eq!(chart.data.labels.len(), 2);
    assert_eq!(chart.data.datasets[0].data, vec![30.0, 35.0]);

    let page = page.shutdown().await.unwrap();
    assert_eq!(page.overview().unwrap().strategies.today_trades, 17);
    assert!(h.services.channels.get_connection(Namespace::Dashboard).is_none());
    assert!(h.services.charts.get_chart(dashboard::OVERVIEW_CHART).is_none());
}

#[tokio::test]
async fn dashboard_system_alert_severity() {
    let h = harness::<DashboardPage>().await;
    mock_get(&h.server, "/api/dashboard/overview", json!({})).await;

    let page = launch(DashboardPage::new(IDLE), h.services.clone());
    assert!(h.transport.wait_for_subscribers(Namespace::Dashboard, 1).await);

    h.transport.publish(
        Namespace::Dashboard,
        "system_alert",
        json!({ "level": "critical", "message": "disk full" }),
    );
    h.transport.publish(
        Namespace::Dashboard,
        "system_alert",
        json!({ "level": "warning", "message": "cpu hot" }),
    );

    assert!(eventually(|| has_notification(&h.services, NotifyLevel::Danger, "System alert: disk full")).await);
    assert!(eventually(|| has_notification(&h.services, NotifyLevel::Warning, "System alert: cpu hot")).await);

    page.shutdown().await.unwrap();
}

#[tokio::test]
async fn connection_indicator_follows_server_close_and_reconnect() {
    let h = harness::<LogsPage>().await;
    mock_get(&h.server, "/api/logs/recent", json!([])).await;

    let page = launch(LogsPage::new(IDLE, 100, 50), h.services.clone());
    assert!(h.transport.wait_for_subscribers(Namespace::Logs, 1).await);
    assert!(eventually(|| h.surface.has_class(logs::STATUS, "status-online")).await);

    h.transport.close(Namespace::Logs);
    assert!(eventually(|| h.surface.has_class(logs::STATUS, "status-offline")).await);
    assert_eq!(h.surface.html(logs::STATUS).as_deref(), Some("Disconnected"));

    // first reconnect attempt fires after the base backoff delay
    assert!(eventually(|| h.surface.has_class(logs::STATUS, "status-online")).await);
    assert!(h.transport.open_count() >= 2);

    page.shutdown().await.unwrap();
    assert!(h.services.channels.connected_namespaces().is_empty());
}

#[tokio::test]
async fn logs_push_then_export() {
    let h = harness::<LogsPage>().await;
    Mock::given(method("GET"))
        .and(path("/api/logs/recent"))
        .and(query_param("limit", "50"))
        .respond_with(ok(json!([
            { "level": "INFO", "component": "api", "message": "started", "timestamp": "2024-05-01T11:59:00Z" }
        ])))
        .mount(&h.server)
        .await;

    let page = launch(LogsPage::new(IDLE, 100, 50), h.services.clone());
    assert!(h.transport.wait_for_subscribers(Namespace::Logs, 1).await);
    assert!(eventually(|| h.surface.html(logs::TOTAL_LOGS).as_deref() == Some("1")).await);

    h.transport.publish(
        Namespace::Logs,
        "new_log",
        json!({
            "level": "error",
            "component": "engine",
            "message": "order <rejected>",
            "timestamp": "2024-05-01T12:00:00Z"
        }),
    );
    assert!(eventually(|| h.surface.html(logs::ERROR_LOGS).as_deref() == Some("1")).await);
    assert_eq!(h.surface.html(logs::TOTAL_LOGS).as_deref(), Some("2"));
    let stream = h.surface.html(logs::LOG_STREAM).unwrap();
    assert!(stream.contains("order &lt;rejected&gt;"));
    assert!(h.surface.scroll_resets(logs::LOG_STREAM) >= 1);

    page.send(LogsCommand::Export);
    assert!(eventually(|| !h.surface.downloads().is_empty()).await);

    let file = h.surface.downloads().remove(0);
    assert!(file.filename.starts_with("logs_"));
    assert!(file.filename.ends_with(".json"));
    assert_eq!(file.mime_type, "application/json");
    let exported: Vec<Value> = serde_json::from_str(&file.contents).unwrap();
    assert_eq!(exported.len(), 2);
    assert_eq!(exported[0]["message"], "order <rejected>");
    assert!(has_notification(&h.services, NotifyLevel::Success, "Logs exported"));

    let page = page.shutdown().await.unwrap();
    assert_eq!(page.store().len(), 2);
    assert!(h.services.charts.get_chart(logs::STATS_CHART).is_none());
    assert!(h.services.charts.get_chart(logs::TREND_CHART).is_none());
}

#[tokio::test]
async fn logs_rule_alert_raises_warning() {
    let h = harness::<LogsPage>().await;
    mock_get(&h.server, "/api/logs/recent", json!([])).await;

    let page = launch(LogsPage::new(IDLE, 100, 50), h.services.clone());
    assert!(h.transport.wait_for_subscribers(Namespace::Logs, 1).await);

    h.transport.publish(
        Namespace::Logs,
        "alert_rule_triggered",
        json!({ "rule_name": "error-burst", "message": "5 errors in 1m" }),
    );
    assert!(eventually(|| has_notification(
        &h.services,
        NotifyLevel::Warning,
        "Log alert: error-burst - 5 errors in 1m"
    ))
    .await);

    page.shutdown().await.unwrap();
}

async fn mount_strategy_backend(server: &MockServer) {
    mock_get(
        server,
        "/api/strategy/matrix",
        json!([
            { "strategy_name": "ma_cross", "symbol": "BTC", "enabled": false },
            { "strategy_name": "ma_cross", "symbol": "ETH", "enabled": true }
        ]),
    )
    .await;
    mock_get(server, "/api/strategy/performance", json!([])).await;
    mock_get(server, "/api/strategy/signals", json!([])).await;
    mock_get(server, "/api/strategy/positions", json!([])).await;
    mock_get(server, "/api/market/live_ticks", json!([])).await;
    mock_get(server, "/api/market/spread_stats", json!([])).await;
}

#[tokio::test]
async fn strategy_toggle_flips_cell_on_acknowledgement() {
    let h = harness::<StrategyPage>().await;
    mount_strategy_backend(&h.server).await;
    Mock::given(method("POST"))
        .and(path("/api/strategy/toggle"))
        .and(body_json(json!({ "strategy_name": "ma_cross", "symbol": "BTC" })))
        .respond_with(ok(Value::Null))
        .expect(1)
        .mount(&h.server)
        .await;

    let page = launch(StrategyPage::new(IDLE, IDLE, 20), h.services.clone());
    assert!(eventually(|| h.surface.html(strategy::TOTAL_STRATEGIES).as_deref() == Some("2")).await);
    assert!(h.surface.html(strategy::MATRIX).unwrap().contains("ma_cross"));

    page.send(StrategyCommand::Toggle {
        strategy_name: "ma_cross".to_string(),
        symbol: "BTC".to_string(),
    });
    assert!(eventually(|| has_notification(
        &h.services,
        NotifyLevel::Success,
        "Strategy ma_cross-BTC updated"
    ))
    .await);

    let page = page.shutdown().await.unwrap();
    assert_eq!(page.matrix().get("ma_cross", "BTC"), Some(true));
    assert_eq!(page.matrix().get("ma_cross", "ETH"), Some(true));
}

#[tokio::test]
async fn strategy_rejected_toggle_keeps_cell() {
    let h = harness::<StrategyPage>().await;
    mount_strategy_backend(&h.server).await;
    Mock::given(method("POST"))
        .and(path("/api/strategy/toggle"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": false, "error": "locked" })),
        )
        .mount(&h.server)
        .await;

    let page = launch(StrategyPage::new(IDLE, IDLE, 20), h.services.clone());
    assert!(eventually(|| h.surface.html(strategy::TOTAL_STRATEGIES).as_deref() == Some("2")).await);

    page.send(StrategyCommand::Toggle {
        strategy_name: "ma_cross".to_string(),
        symbol: "BTC".to_string(),
    });
    assert!(eventually(|| h
        .services
        .notifications
        .active()
        .iter()
        .any(|n| n.level == NotifyLevel::Danger && n.message.contains("locked")))
    .await);

    let page = page.shutdown().await.unwrap();
    assert_eq!(page.matrix().get("ma_cross", "BTC"), Some(false));
}

#[tokio::test]
async fn strategy_updated_push_sets_cell() {
    let h = harness::<StrategyPage>().await;
    mount_strategy_backend(&h.server).await;

    let page = launch(StrategyPage::new(IDLE, IDLE, 20), h.services.clone());
    assert!(h.transport.wait_for_subscribers(Namespace::Strategy, 1).await);
    assert!(eventually(|| h.surface.html(strategy::TOTAL_STRATEGIES).as_deref() == Some("2")).await);

    h.transport.publish(
        Namespace::Strategy,
        "strategy_updated",
        json!({ "strategy_name": "ma_cross", "symbol": "ETH", "enabled": false }),
    );
    assert!(eventually(|| h.surface.html(strategy::ACTIVE_STRATEGIES).as_deref() == Some("0")).await);

    let page = page.shutdown().await.unwrap();
    assert_eq!(page.matrix().get("ma_cross", "ETH"), Some(false));
}

fn system_status() -> Value {
    json!({
        "cpu_usage": 42.5,
        "memory_usage": { "percent": 60.0, "used": 1073741824u64, "total": 2147483648u64 },
        "disk_usage": { "percent": 70.0, "used": 0, "total": 0 },
        "dolphindb": { "connected": true, "version": "2.00.10" },
        "stream_tables": []
    })
}

#[tokio::test]
async fn monitoring_status_and_history() {
    let h = harness::<MonitoringPage>().await;
    mock_get(&h.server, "/api/system/status", system_status()).await;
    Mock::given(method("GET"))
        .and(path("/api/system/metrics/history"))
        .and(query_param("time_range", "6h"))
        .respond_with(ok(json!([
            { "timestamp": "2024-05-01T10:00:00Z", "cpu_usage": 10.0, "memory_usage": 20.0, "disk_usage": 30.0 },
            { "timestamp": "2024-05-01T11:00:00Z", "cpu_usage": 11.0, "memory_usage": 21.0, "disk_usage": 31.0 },
            { "timestamp": "2024-05-01T12:00:00Z", "cpu_usage": 12.0, "memory_usage": 22.0, "disk_usage": 32.0 }
        ])))
        .mount(&h.server)
        .await;

    let page = launch(MonitoringPage::new(IDLE, 50), h.services.clone());
    assert!(eventually(|| h.surface.html(monitoring::CPU_DISPLAY).as_deref() == Some("42.5%")).await);
    assert_eq!(h.surface.style(monitoring::CPU_PROGRESS, "width").as_deref(), Some("42.5%"));
    assert_eq!(h.surface.html(monitoring::MEMORY_USED).as_deref(), Some("1.00 GB"));
    assert_eq!(
        h.services.charts.last_update_mode(monitoring::SYSTEM_CHART),
        Some(UpdateMode::None)
    );

    page.send(MonitoringCommand::ChangeTimeRange(monitor_core::TimeRange::SixHours));
    assert!(eventually(|| h
        .services
        .charts
        .get_chart(monitoring::SYSTEM_CHART)
        .map_or(false, |chart| chart.data.datasets[0].data == vec![10.0, 11.0, 12.0]))
    .await);
    assert_eq!(
        h.services.charts.last_update_mode(monitoring::SYSTEM_CHART),
        Some(UpdateMode::Default)
    );

    let page = page.shutdown().await.unwrap();
    assert_eq!(page.time_range(), monitor_core::TimeRange::SixHours);
}

#[tokio::test]
async fn monitoring_history_longer_than_live_window() {
    let h = harness::<MonitoringPage>().await;
    mock_get(&h.server, "/api/system/status", system_status()).await;
    let samples: Vec<Value> = (0..120i64)
        .map(|i| {
            json!({
                "timestamp": 1_700_000_000_000i64 + i * 180_000,
                "cpu_usage": i as f64,
                "memory_usage": 50.0,
                "disk_usage": 70.0
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/api/system/metrics/history"))
        .and(query_param("time_range", "6h"))
        .respond_with(ok(Value::Array(samples)))
        .mount(&h.server)
        .await;

    let page = launch(MonitoringPage::new(IDLE, 50), h.services.clone());
    assert!(eventually(|| h.surface.html(monitoring::CPU_DISPLAY).as_deref() == Some("42.5%")).await);

    page.send(MonitoringCommand::ChangeTimeRange(monitor_core::TimeRange::SixHours));
    assert!(eventually(|| h
        .services
        .charts
        .get_chart(monitoring::SYSTEM_CHART)
        .map_or(false, |chart| chart.data.labels.len() == 120))
    .await);

    let chart = h.services.charts.get_chart(monitoring::SYSTEM_CHART).unwrap();
    assert_eq!(chart.data.datasets[0].data.first(), Some(&0.0));
    assert_eq!(chart.data.datasets[0].data.last(), Some(&119.0));

    let page = page.shutdown().await.unwrap();
    assert_eq!(page.window().len(), 120);
}
