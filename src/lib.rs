//! # strategy-monitor
//!
//! Presentation layer for a trading-strategy monitoring backend. Four page
//! controllers (dashboard, monitoring, strategy, logs) pull state over HTTP,
//! subscribe to per-page push namespaces and render into a [`ui_kit::Surface`].
//!
//! The workspace is split into:
//! - `monitor-core`: wire types, formatting, bounded buffers, log store
//! - `api-client`: the `{success, data | error}` REST wrapper
//! - `event-bus`: namespace-keyed push connections with reconnect
//! - `ui-kit`: surface, notifications, overlays and the chart registry
//!
//! ```no_run
//! use std::sync::Arc;
//! use strategy_monitor::prelude::*;
//! use ui_kit::MemorySurface;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = MonitorConfig::load(None)?;
//! let surface = Arc::new(MemorySurface::with_anchors(DashboardPage::ANCHORS.iter().copied()));
//! let services = Services::connect(&config, surface)?;
//!
//! let page = launch(DashboardPage::new(config.refresh.dashboard()), services);
//! page.send(DashboardCommand::SystemCheck);
//! page.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod app;
pub mod config;
pub mod pages;

/// Re-exports for convenience
pub mod prelude {
    pub use crate::app::Services;
    pub use crate::config::MonitorConfig;
    pub use crate::pages::dashboard::DashboardCommand;
    pub use crate::pages::logs::LogsCommand;
    pub use crate::pages::monitoring::MonitoringCommand;
    pub use crate::pages::strategy::StrategyCommand;
    pub use crate::pages::{
        launch, ConnectionStatus, DashboardPage, LogsPage, MonitoringPage, Page, PageHandle,
        StrategyPage,
    };
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build information
pub const BUILD_INFO: &str = concat!(
    "strategy-monitor v",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_REPOSITORY"),
    ")"
);
