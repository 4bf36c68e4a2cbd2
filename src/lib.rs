pub mod api;
pub mod cli;
pub mod models;
pub mod services;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::OnceLock;
use tracing::{info, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt,
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use cli::{Cli, Commands};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

/// Initialize logging: a per-session log file plus stderr for warnings.
/// `verbose` lets every enabled event through to stderr.
pub fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if env_flag("SKRIVPARTNER_DISABLE_FILE_LOG") {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer(verbose))
            .try_init();
        return;
    }

    let logs_dir = match std::env::var("SKRIVPARTNER_LOG_DIR") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => get_logs_dir(),
    };

    if let Err(e) = fs::create_dir_all(&logs_dir) {
        eprintln!("Failed to create logs directory: {}", e);
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer(verbose))
            .try_init();
        return;
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_filename = format!("skrivpartner_{}.log", timestamp);

    let file_appender = rolling::never(&logs_dir, &log_filename);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(file_guard);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer(verbose))
        .try_init();

    info!(version = env!("CARGO_PKG_VERSION"), log_file = %logs_dir.join(&log_filename).display(), "logging.initialized");

    if !env_flag("SKRIVPARTNER_DISABLE_LOG_CLEANUP") {
        cleanup_old_logs(&logs_dir, 30);
    }
}

// stdout carries the result panel, so console logs go to stderr
fn console_layer<S>(verbose: bool) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let level = if verbose { LevelFilter::TRACE } else { LevelFilter::WARN };
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(verbose)
        .with_filter(level)
}

fn get_logs_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("skrivpartner").join("logs");
    }
    PathBuf::from("logs")
}

fn cleanup_old_logs(logs_dir: &Path, keep: usize) {
    let mut entries: Vec<_> = match fs::read_dir(logs_dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(_) => return,
    };

    entries.retain(|e| {
        let name = e.file_name().to_string_lossy().to_string();
        name.starts_with("skrivpartner_") && name.ends_with(".log")
    });

    if entries.len() <= keep {
        return;
    }

    entries.sort_by_key(|e| e.file_name());

    let remove_count = entries.len().saturating_sub(keep);
    for entry in entries.into_iter().take(remove_count) {
        let _ = fs::remove_file(entry.path());
    }
}

/// Dispatch one CLI invocation.
pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let store = api::open_store(cli.config_dir.clone())?;

    match cli.command {
        Commands::Optimize(args) => api::optimize_text(&store, cli.provider.as_deref(), cli.json, args).await,
        Commands::Config { command } => {
            api::run_config(&store, command, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_keeps_newest_logs() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("skrivpartner_2026010{}_000000.log", i)), "").unwrap();
        }
        fs::write(dir.path().join("other.log"), "").unwrap();

        cleanup_old_logs(dir.path(), 2);

        let mut left: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        left.sort();
        assert_eq!(
            left,
            [
                "other.log",
                "skrivpartner_20260103_000000.log",
                "skrivpartner_20260104_000000.log"
            ]
        );
    }
}
