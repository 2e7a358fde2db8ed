//! Tracing setup: stderr for every command, plus a per-session log file
//! under `paths.logs` for analysis runs

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use kariba_core::ConfigResolver;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// An open session log and the level it records at.
#[derive(Debug)]
pub struct SessionLog {
    pub path: PathBuf,
    pub file: File,
    pub level: LevelFilter,
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` when verbose.
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }))
}

/// Stderr layer shared by the bootstrap and the final subscriber.
pub fn stderr_layer<S>(verbose: bool) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter(verbose))
}

/// Subscriber used while the configuration is loading, before the log
/// directory is known.
pub fn bootstrap_subscriber(verbose: bool) -> impl Subscriber + Send + Sync + 'static {
    use tracing_subscriber::layer::SubscriberExt;

    tracing_subscriber::registry().with(stderr_layer::<Registry>(verbose))
}

/// Install the global subscriber.
pub fn init(verbose: bool, session: Option<SessionLog>) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let file_layer = session.map(|log| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(log.file))
            .with_filter(log.level)
    });

    tracing_subscriber::registry()
        .with(stderr_layer::<Registry>(verbose))
        .with(file_layer)
        .init();
}

/// Map `debug.log_level` (`DEBUG`, `INFO`, `WARNING`, `ERROR`, `CRITICAL`,
/// any case) to a level; unknown names mean `INFO`.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" => LevelFilter::TRACE,
        "DEBUG" => LevelFilter::DEBUG,
        "WARN" | "WARNING" => LevelFilter::WARN,
        "ERROR" | "CRITICAL" => LevelFilter::ERROR,
        "OFF" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// `<logs>/wind_analysis_<YYYYmmdd_HHMMSS>.log`
pub fn session_log_path(logs_dir: &Path, now: DateTime<Local>) -> PathBuf {
    logs_dir.join(format!("wind_analysis_{}.log", now.format("%Y%m%d_%H%M%S")))
}

/// Create the session log under `paths.logs`.
pub fn open_session_log(config: &ConfigResolver) -> Result<SessionLog> {
    let logs_dir = config
        .get_path("logs")
        .ok_or_else(|| anyhow::anyhow!("paths.logs is not configured"))?;
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create {}", logs_dir.display()))?;

    let path = session_log_path(&logs_dir, Local::now());
    let file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;

    Ok(SessionLog {
        path,
        file,
        level: parse_level(config.get_str("debug.log_level").unwrap_or("INFO")),
    })
}
