//! Chart registry keyed by anchor id
//!
//! Charts are stored as their full JSON-serialisable config and redrawn on
//! the surface after every update. Only creation reports a missing anchor;
//! updating or destroying an unknown chart does nothing.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use monitor_core::{MonitorError, MonitorResult, SeriesSnapshot};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::surface::Surface;

/// Palette shared by every page
pub struct ChartColor;

impl ChartColor {
    pub const PRIMARY: &'static str = "rgb(54, 162, 235)";
    pub const PRIMARY_FILL: &'static str = "rgba(54, 162, 235, 0.1)";
    pub const SUCCESS: &'static str = "rgb(75, 192, 192)";
    pub const SUCCESS_FILL: &'static str = "rgba(75, 192, 192, 0.1)";
    pub const WARNING: &'static str = "rgb(255, 205, 86)";
    pub const WARNING_FILL: &'static str = "rgba(255, 205, 86, 0.1)";
    pub const DANGER: &'static str = "rgb(255, 99, 132)";
    pub const DANGER_FILL: &'static str = "rgba(255, 99, 132, 0.1)";
    pub const INFO: &'static str = "rgb(23, 162, 184)";
    pub const INFO_FILL: &'static str = "rgba(23, 162, 184, 0.1)";
    pub const ACCENT: &'static str = "rgb(153, 102, 255)";
    pub const ACCENT_FILL: &'static str = "rgba(153, 102, 255, 0.1)";

    /// Translucent fill matching a stroke colour
    pub fn fill_for(stroke: &str) -> &'static str {
        match stroke {
            Self::PRIMARY => Self::PRIMARY_FILL,
            Self::SUCCESS => Self::SUCCESS_FILL,
            Self::WARNING => Self::WARNING_FILL,
            Self::DANGER => Self::DANGER_FILL,
            Self::INFO => Self::INFO_FILL,
            Self::ACCENT => Self::ACCENT_FILL,
            _ => "rgba(0, 0, 0, 0.05)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Doughnut,
    Pie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Animated redraw
    #[default]
    Default,
    /// Redraw without animation
    None,
}

/// One stroke or a colour per data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Paint {
    Solid(String),
    PerPoint(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Paint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Paint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(rename = "yAxisID", skip_serializing_if = "Option::is_none")]
    pub y_axis_id: Option<String>,
}

impl Dataset {
    /// Smoothed line in `color` with a matching translucent fill
    pub fn line(label: impl Into<String>, color: &str) -> Self {
        Self {
            label: label.into(),
            data: Vec::new(),
            border_color: Some(Paint::Solid(color.to_string())),
            background_color: Some(Paint::Solid(ChartColor::fill_for(color).to_string())),
            tension: Some(0.4),
            fill: None,
            y_axis_id: None,
        }
    }

    /// Slice per value, one colour each
    pub fn segments(label: impl Into<String>, colors: &[&str]) -> Self {
        Self {
            label: label.into(),
            data: vec![0.0; colors.len()],
            border_color: None,
            background_color: Some(Paint::PerPoint(colors.iter().map(|c| c.to_string()).collect())),
            tension: None,
            fill: None,
            y_axis_id: None,
        }
    }

    pub fn on_axis(mut self, axis: &str) -> Self {
        self.y_axis_id = Some(axis.to_string());
        self
    }

    pub fn filled(mut self) -> Self {
        self.fill = Some(true);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl ChartData {
    pub fn new(datasets: Vec<Dataset>) -> Self {
        Self {
            labels: Vec::new(),
            datasets,
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Replace one dataset's values; ignored when `index` is out of range
    pub fn set_series(&mut self, index: usize, values: Vec<f64>) {
        if let Some(dataset) = self.datasets.get_mut(index) {
            dataset.data = values;
        }
    }

    /// Copy labels and columns from a series window, column i into dataset i
    pub fn apply_snapshot(&mut self, snapshot: &SeriesSnapshot) {
        self.labels = snapshot.labels.clone();
        for (index, column) in snapshot.columns.iter().enumerate() {
            self.set_series(index, column.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: ChartData,
    #[serde(default)]
    pub options: Value,
}

impl ChartConfig {
    pub fn new(kind: ChartKind, data: ChartData) -> Self {
        Self {
            kind,
            data,
            options: Value::Null,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }
}

/// Options applied under every chart's own options
pub fn default_options() -> Value {
    json!({
        "responsive": true,
        "maintainAspectRatio": false,
        "plugins": { "legend": { "position": "top" } }
    })
}

/// Top-level merge: keys in `overrides` replace the defaults wholesale
pub fn merge_options(defaults: Value, overrides: &Value) -> Value {
    let mut merged = match defaults {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    if let Value::Object(extra) = overrides {
        for (key, value) in extra {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

#[derive(Debug, Clone)]
struct ChartInstance {
    config: ChartConfig,
    last_mode: UpdateMode,
    redraws: u64,
}

/// Live charts keyed by anchor id
#[derive(Clone)]
pub struct ChartRegistry {
    surface: Arc<dyn Surface>,
    charts: Arc<Mutex<IndexMap<String, ChartInstance>>>,
}

impl fmt::Debug for ChartRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartRegistry")
            .field("charts", &self.chart_ids())
            .finish_non_exhaustive()
    }
}

impl ChartRegistry {
    pub fn new(surface: Arc<dyn Surface>) -> Self {
        Self {
            surface,
            charts: Arc::new(Mutex::new(IndexMap::new())),
        }
    }

    /// Create (or replace) the chart on `anchor`
    pub fn create_chart(&self, anchor: &str, config: ChartConfig) -> MonitorResult<()> {
        if !self.surface.has_anchor(anchor) {
            return Err(MonitorError::missing_anchor(anchor));
        }

        let options = merge_options(default_options(), &config.options);
        let config = ChartConfig { options, ..config };
        self.draw(anchor, &config, UpdateMode::Default);
        self.charts.lock().insert(
            anchor.to_string(),
            ChartInstance {
                config,
                last_mode: UpdateMode::Default,
                redraws: 0,
            },
        );
        debug!(anchor, "chart created");
        Ok(())
    }

    /// Replace the chart's data wholesale
    pub fn update_chart_data(&self, anchor: &str, data: ChartData, mode: UpdateMode) -> bool {
        self.update_chart(anchor, mode, |current| *current = data)
    }

    /// Mutate the chart's data in place and redraw
    pub fn update_chart<F>(&self, anchor: &str, mode: UpdateMode, f: F) -> bool
    where
        F: FnOnce(&mut ChartData),
    {
        let config = {
            let mut charts = self.charts.lock();
            let Some(instance) = charts.get_mut(anchor) else {
                return false;
            };
            f(&mut instance.config.data);
            instance.last_mode = mode;
            instance.redraws += 1;
            instance.config.clone()
        };
        self.draw(anchor, &config, mode);
        true
    }

    pub fn get_chart(&self, anchor: &str) -> Option<ChartConfig> {
        self.charts.lock().get(anchor).map(|instance| instance.config.clone())
    }

    /// Mode used by the most recent update
    pub fn last_update_mode(&self, anchor: &str) -> Option<UpdateMode> {
        self.charts.lock().get(anchor).map(|instance| instance.last_mode)
    }

    pub fn redraw_count(&self, anchor: &str) -> u64 {
        self.charts.lock().get(anchor).map_or(0, |instance| instance.redraws)
    }

    pub fn destroy_chart(&self, anchor: &str) -> bool {
        let removed = self.charts.lock().shift_remove(anchor).is_some();
        if removed {
            self.surface.clear_chart(anchor);
            debug!(anchor, "chart destroyed");
        }
        removed
    }

    pub fn destroy_all_charts(&self) {
        let anchors: Vec<String> = self.charts.lock().drain(..).map(|(anchor, _)| anchor).collect();
        for anchor in anchors {
            self.surface.clear_chart(&anchor);
        }
    }

    pub fn chart_ids(&self) -> Vec<String> {
        self.charts.lock().keys().cloned().collect()
    }

    fn draw(&self, anchor: &str, config: &ChartConfig, mode: UpdateMode) {
        let mut value = serde_json::to_value(config).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.insert("updateMode".to_string(), json!(mode));
        }
        self.surface.draw_chart(anchor, &value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;

    fn registry() -> (Arc<MemorySurface>, ChartRegistry) {
        let surface = Arc::new(MemorySurface::with_anchors(["cpu-chart", "log-chart"]));
        let registry = ChartRegistry::new(surface.clone());
        (surface, registry)
    }

    fn line_config() -> ChartConfig {
        ChartConfig::new(
            ChartKind::Line,
            ChartData::new(vec![Dataset::line("CPU", ChartColor::PRIMARY)]),
        )
    }

    #[test]
    fn test_missing_anchor_fails() {
        let (_surface, registry) = registry();
        let err = registry.create_chart("nowhere", line_config()).unwrap_err();
        assert!(matches!(err, MonitorError::MissingAnchor(ref id) if id == "nowhere"));
        assert!(registry.chart_ids().is_empty());
    }

    #[test]
    fn test_options_shallow_merge() {
        let (_surface, registry) = registry();
        let config = line_config().with_options(json!({
            "plugins": { "title": { "display": true } },
            "maintainAspectRatio": true
        }));
        registry.create_chart("cpu-chart", config).unwrap();

        let options = registry.get_chart("cpu-chart").unwrap().options;
        assert_eq!(options["responsive"], json!(true));
        assert_eq!(options["maintainAspectRatio"], json!(true));
        // nested objects are replaced, not merged
        assert!(options["plugins"].get("legend").is_none());
    }

    #[test]
    fn test_update_redraws_surface() {
        let (surface, registry) = registry();
        registry.create_chart("cpu-chart", line_config()).unwrap();
        assert!(registry.update_chart("cpu-chart", UpdateMode::None, |data| {
            data.labels = vec!["10:00:00".into()];
            data.set_series(0, vec![42.0]);
        }));

        let drawn = surface.chart("cpu-chart").unwrap();
        assert_eq!(drawn["data"]["datasets"][0]["data"], json!([42.0]));
        assert_eq!(drawn["updateMode"], json!("none"));
        assert_eq!(drawn["data"]["datasets"][0]["borderColor"], json!(ChartColor::PRIMARY));
        assert_eq!(registry.redraw_count("cpu-chart"), 1);
    }

    #[test]
    fn test_unknown_chart_updates_are_noops() {
        let (_surface, registry) = registry();
        assert!(!registry.update_chart_data("cpu-chart", ChartData::default(), UpdateMode::Default));
        assert!(!registry.destroy_chart("cpu-chart"));
    }

    #[test]
    fn test_destroy_all_clears_surface() {
        let (surface, registry) = registry();
        registry.create_chart("cpu-chart", line_config()).unwrap();
        registry
            .create_chart(
                "log-chart",
                ChartConfig::new(
                    ChartKind::Doughnut,
                    ChartData::new(vec![Dataset::segments("Levels", &[ChartColor::INFO, ChartColor::WARNING])]),
                ),
            )
            .unwrap();
        registry.destroy_all_charts();
        assert!(registry.chart_ids().is_empty());
        assert!(surface.chart("cpu-chart").is_none());
        assert!(surface.chart("log-chart").is_none());
    }

    #[test]
    fn test_apply_snapshot() {
        let mut data = ChartData::new(vec![
            Dataset::line("CPU", ChartColor::PRIMARY),
            Dataset::line("Memory", ChartColor::SUCCESS),
        ]);
        data.apply_snapshot(&SeriesSnapshot {
            labels: vec!["a".into(), "b".into()],
            columns: vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
        });
        assert_eq!(data.labels, vec!["a", "b"]);
        assert_eq!(data.datasets[1].data, vec![3.0, 4.0]);
        assert_eq!(data.datasets.len(), 2);
    }
}
