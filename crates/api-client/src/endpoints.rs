//! Typed calls for each backend resource the pages pull

use monitor_core::{
    DashboardOverview, HealthReport, LogRecord, MetricSample, MetricSnapshot, MonitorResult,
    PerformancePoint, Position, Signal, SpreadStat, StrategyCell, Tick, TimeRange, ToggleRequest,
};
use crate::client::{unwrap_envelope, ApiClient};

impl ApiClient {
    pub async fn dashboard_overview(&self) -> MonitorResult<DashboardOverview> {
        self.get_data("/dashboard/overview", &[]).await
    }

    pub async fn restart_all_strategies(&self) -> MonitorResult<()> {
        self.trigger("/strategy/restart_all").await
    }

    pub async fn health_check(&self) -> MonitorResult<HealthReport> {
        let path = "/system/health_check";
        let report: Option<HealthReport> = unwrap_envelope(path, self.post_empty(path).await?)?;
        Ok(report.unwrap_or_default())
    }

    pub async fn system_status(&self) -> MonitorResult<MetricSnapshot> {
        self.get_data("/system/status", &[]).await
    }

    pub async fn metrics_history(&self, range: TimeRange) -> MonitorResult<Vec<MetricSample>> {
        let samples: Option<Vec<MetricSample>> = self
            .get_data("/system/metrics/history", &[("time_range", Some(range.to_string()))])
            .await?;
        Ok(samples.unwrap_or_default())
    }

    pub async fn strategy_matrix(&self) -> MonitorResult<Vec<StrategyCell>> {
        let cells: Option<Vec<StrategyCell>> = self.get_data("/strategy/matrix", &[]).await?;
        Ok(cells.unwrap_or_default())
    }

    /// Ask the server to flip one cell; only succeeds on acknowledgement
    pub async fn toggle_strategy(&self, strategy_name: &str, symbol: &str) -> MonitorResult<()> {
        let request = ToggleRequest {
            strategy_name: strategy_name.to_string(),
            symbol: symbol.to_string(),
        };
        self.post_ack("/strategy/toggle", &request).await
    }

    pub async fn enable_all_strategies(&self) -> MonitorResult<()> {
        self.trigger("/strategy/enable_all").await
    }

    pub async fn disable_all_strategies(&self) -> MonitorResult<()> {
        self.trigger("/strategy/disable_all").await
    }

    pub async fn strategy_performance(&self) -> MonitorResult<Vec<PerformancePoint>> {
        let points: Option<Vec<PerformancePoint>> = self.get_data("/strategy/performance", &[]).await?;
        Ok(points.unwrap_or_default())
    }

    pub async fn recent_signals(&self) -> MonitorResult<Vec<Signal>> {
        let signals: Option<Vec<Signal>> = self.get_data("/strategy/signals", &[]).await?;
        Ok(signals.unwrap_or_default())
    }

    pub async fn positions(&self) -> MonitorResult<Vec<Position>> {
        let positions: Option<Vec<Position>> = self.get_data("/strategy/positions", &[]).await?;
        Ok(positions.unwrap_or_default())
    }

    /// Latest ticks, newest first
    pub async fn live_ticks(&self) -> MonitorResult<Vec<Tick>> {
        let ticks: Option<Vec<Tick>> = self.get_data("/market/live_ticks", &[]).await?;
        Ok(ticks.unwrap_or_default())
    }

    /// Spread history, oldest first
    pub async fn spread_stats(&self) -> MonitorResult<Vec<SpreadStat>> {
        let stats: Option<Vec<SpreadStat>> = self.get_data("/market/spread_stats", &[]).await?;
        Ok(stats.unwrap_or_default())
    }

    /// Most recent log records, newest first
    pub async fn recent_logs(&self, limit: Option<usize>) -> MonitorResult<Vec<LogRecord>> {
        let records: Option<Vec<LogRecord>> = self
            .get_data("/logs/recent", &[("limit", limit.map(|l| l.to_string()))])
            .await?;
        Ok(records.unwrap_or_default())
    }

    /// Body-less action endpoint that only reports success
    async fn trigger(&self, path: &str) -> MonitorResult<()> {
        let _: serde_json::Value = unwrap_envelope(path, self.post_empty(path).await?)?;
        Ok(())
    }
}
