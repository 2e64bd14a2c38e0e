/// Version injected at compile time via INSPECTOR_MOCK_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("INSPECTOR_MOCK_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use inspector_mock::config::Config;
use inspector_mock::server::{create_router, AppState};
use inspector_mock::service::regions::RegionRegistry;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// In-memory mock of the Amazon Inspector API
#[derive(Parser, Debug)]
#[command(name = "inspector-mock", version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Region used when a request carries no credential scope
    #[arg(short, long)]
    region: Option<String>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Write logs to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// CLI > config file > info
fn effective_log_level(args: &Args, config: &Config) -> LogLevel {
    args.log_level
        .or_else(|| {
            config
                .log_level
                .as_deref()
                .and_then(|level| LogLevel::from_str(level, true).ok())
        })
        .unwrap_or(LogLevel::Info)
}

fn setup_logging(level: LogLevel, log_file: Option<&Path>) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    let (non_blocking, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {:?}", parent))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(log_file.is_none())
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("inspector-mock {} started with log level: {:?}", VERSION, level);
    if let Some(path) = log_file {
        tracing::info!("Log file: {:?}", path);
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let _log_guard = setup_logging(effective_log_level(&args, &config), args.log_file.as_deref())?;

    // Reported only now that a subscriber is installed
    if let Some(e) = config_error {
        tracing::warn!("Ignoring config file, using defaults: {:#}", e);
    }

    let host = config.effective_host(args.host.as_deref());
    let port = config.effective_port(args.port);
    let default_region = config.effective_default_region(args.region.as_deref());
    let regions = config.effective_regions();
    let account_id = config.effective_account_id();

    tracing::info!("Using account: {}, default region: {}", account_id, default_region);

    let registry = RegionRegistry::new(regions.as_slice(), &default_region, &account_id);
    let app = create_router(AppState::new(registry));

    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;

    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
