use std::sync::Arc;

use serde_json::json;
use ui_kit::{
    ChartColor, ChartConfig, ChartData, ChartKind, ChartRegistry, Dataset, MemorySurface,
    NotificationCenter, Overlay, Surface, UpdateMode, BODY,
};

#[tokio::test]
async fn test_services_share_one_document() {
    let surface = Arc::new(MemorySurface::with_anchors(["system-chart", "cpu-usage"]));
    let charts = ChartRegistry::new(surface.clone());
    let notifications = NotificationCenter::new(surface.clone(), 5);
    let overlay = Overlay::new(surface.clone(), Some(false));

    surface.set_text("cpu-usage", "42.0%");
    charts
        .create_chart(
            "system-chart",
            ChartConfig::new(
                ChartKind::Line,
                ChartData::new(vec![Dataset::line("CPU", ChartColor::PRIMARY)]),
            ),
        )
        .unwrap();
    charts.update_chart("system-chart", UpdateMode::None, |data| {
        data.labels.push("10:00:00".into());
        data.set_series(0, vec![42.0]);
    });
    notifications.danger("Load failed: HTTP 500");
    overlay.show_loading("Refreshing");

    let doc = surface.render_document("System monitoring");
    assert!(doc.contains("<title>System monitoring</title>"));
    assert!(doc.contains("<div id=\"cpu-usage\">42.0%</div>"));
    assert!(doc.contains("<canvas id=\"system-chart\""));
    assert!(doc.contains("alert-danger"));
    assert!(doc.contains("Refreshing"));

    assert_eq!(
        surface.chart("system-chart").unwrap()["data"]["labels"],
        json!(["10:00:00"])
    );
    assert!(surface.children(BODY).len() >= 4);
}
