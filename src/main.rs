//! strategy-monitor binary
//!
//! Runs the page controllers headless against a live backend and can dump
//! the rendered document, print a status summary or export recent logs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use api_client::{ApiClient, ApiClientConfig};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use monitor_core::format::{format_file_size, format_percent};
use monitor_core::export_logs;
use strategy_monitor::config::{LoggingConfig, MonitorConfig};
use strategy_monitor::prelude::*;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use ui_kit::MemorySurface;

#[derive(Parser)]
#[command(author, version, about = "Trading strategy monitor")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Override the configured log level
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run page controllers until Ctrl+C
    Run {
        #[arg(short, long, value_enum, default_value_t = PageSelection::All)]
        page: PageSelection,

        /// Write the rendered document here on shutdown
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Print the current system status once
    Status,
    /// Download recent logs as `logs_<date>.json`
    ExportLogs {
        #[arg(long, default_value_t = 100)]
        limit: usize,

        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PageSelection {
    Dashboard,
    Monitoring,
    Strategy,
    Logs,
    All,
}

impl PageSelection {
    fn includes(self, other: PageSelection) -> bool {
        self == PageSelection::All || self == other
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    let mut config = MonitorConfig::load(args.config.as_deref())?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    let _guard = init_tracing(&config.logging)?;

    info!("📈 Starting strategy-monitor v{}", env!("CARGO_PKG_VERSION"));
    info!("🔗 API: {} | push: {}", config.api_base_url, config.push_base_url);

    match args.command {
        Command::Run { page, snapshot } => run(&config, page, snapshot.as_deref()).await,
        Command::Status => status(&config).await,
        Command::ExportLogs { limit, out_dir } => export(&config, limit, &out_dir).await,
    }
}

async fn run(config: &MonitorConfig, selection: PageSelection, snapshot: Option<&Path>) -> Result<()> {
    let surface = Arc::new(MemorySurface::new());
    if selection.includes(PageSelection::Dashboard) {
        surface.add_anchors(DashboardPage::ANCHORS.iter().copied());
    }
    if selection.includes(PageSelection::Monitoring) {
        surface.add_anchors(MonitoringPage::ANCHORS.iter().copied());
    }
    if selection.includes(PageSelection::Strategy) {
        surface.add_anchors(StrategyPage::ANCHORS.iter().copied());
    }
    if selection.includes(PageSelection::Logs) {
        surface.add_anchors(LogsPage::ANCHORS.iter().copied());
    }

    let services = Services::connect(config, surface.clone())?;

    let dashboard = selection
        .includes(PageSelection::Dashboard)
        .then(|| launch(DashboardPage::new(config.refresh.dashboard()), services.clone()));
    let monitoring = selection.includes(PageSelection::Monitoring).then(|| {
        launch(
            MonitoringPage::new(config.refresh.monitoring(), config.buffers.metric_points),
            services.clone(),
        )
    });
    let strategy = selection.includes(PageSelection::Strategy).then(|| {
        launch(
            StrategyPage::new(
                config.refresh.strategy(),
                config.refresh.live_ticks(),
                config.buffers.spread_points,
            ),
            services.clone(),
        )
    });
    let logs = selection.includes(PageSelection::Logs).then(|| {
        launch(
            LogsPage::new(
                config.refresh.log_stats(),
                config.buffers.max_logs,
                config.buffers.recent_logs,
            ),
            services.clone(),
        )
    });

    info!("✅ Pages running, press Ctrl+C to stop");
    setup_shutdown_handler().await;

    if let Some(handle) = dashboard {
        shutdown_page(handle).await;
    }
    if let Some(handle) = monitoring {
        shutdown_page(handle).await;
    }
    if let Some(handle) = strategy {
        shutdown_page(handle).await;
    }
    if let Some(handle) = logs {
        shutdown_page(handle).await;
    }
    services.channels.disconnect_all();

    if let Some(path) = snapshot {
        std::fs::write(path, surface.render_document("Strategy Monitor"))
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        info!("📝 Snapshot written to {}", path.display());
    }

    info!("👋 strategy-monitor stopped");
    Ok(())
}

async fn shutdown_page<P: Page>(handle: PageHandle<P>) {
    match handle.shutdown().await {
        Ok(_) => info!(page = P::NAME, "page stopped"),
        Err(err) => warn!(page = P::NAME, error = %err, "page task ended abnormally"),
    }
}

fn api_client(config: &MonitorConfig) -> Result<ApiClient> {
    Ok(ApiClient::new(ApiClientConfig {
        base_url: config.api_base_url.clone(),
        timeout: config.request_timeout(),
    })?)
}

async fn status(config: &MonitorConfig) -> Result<()> {
    let api = api_client(config)?;
    let snapshot = api.system_status().await.context("failed to load system status")?;

    println!("CPU     {}", format_percent(Some(snapshot.cpu_usage), 1));
    println!(
        "Memory  {} ({} / {})",
        format_percent(Some(snapshot.memory_usage.percent), 1),
        format_file_size(snapshot.memory_usage.used),
        format_file_size(snapshot.memory_usage.total)
    );
    println!(
        "Disk    {} ({} / {})",
        format_percent(Some(snapshot.disk_usage.percent), 1),
        format_file_size(snapshot.disk_usage.used),
        format_file_size(snapshot.disk_usage.total)
    );
    if let Some(network) = snapshot.network {
        println!(
            "Network sent {} / recv {}",
            format_file_size(network.bytes_sent),
            format_file_size(network.bytes_recv)
        );
    }
    match &snapshot.database {
        Some(db) if db.connected => println!(
            "Database connected (version {})",
            db.version.as_deref().unwrap_or("unknown")
        ),
        _ => println!("Database disconnected"),
    }
    let live = snapshot.stream_tables.iter().filter(|t| t.exists).count();
    println!("Streams {live}/{} tables present", snapshot.stream_tables.len());

    Ok(())
}

async fn export(config: &MonitorConfig, limit: usize, out_dir: &Path) -> Result<()> {
    let api = api_client(config)?;
    let records = api
        .recent_logs(Some(limit))
        .await
        .context("failed to load recent logs")?;

    let refs: Vec<_> = records.iter().collect();
    let file = export_logs(&refs, Utc::now().date_naive())?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let path = out_dir.join(&file.filename);
    std::fs::write(&path, file.contents)
        .with_context(|| format!("failed to write {}", path.display()))?;

    info!("💾 Exported {} log entries to {}", records.len(), path.display());
    Ok(())
}

/// Install the global subscriber; the returned guard flushes the file writer
fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let level_filter = match logging.level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };
    let filter = || EnvFilter::from_default_env().add_directive(level_filter.into());

    let json_stdout = logging.structured.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter())
    });
    let plain_stdout = (!logging.structured).then(|| fmt::layer().with_filter(filter()));

    let (file_layer, guard) = if logging.log_to_file {
        let appender = tracing_appender::rolling::daily(&logging.log_dir, "strategy-monitor.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter());
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(json_stdout)
        .with(plain_stdout)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

async fn setup_shutdown_handler() {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("📡 Received shutdown signal (Ctrl+C)");
        }
        Err(err) => {
            error!("💥 Failed to listen for shutdown signal: {:?}", err);
        }
    }
}
