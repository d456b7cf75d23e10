use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::SyncError;

const DEFAULT_FILTER: &str = "info";

pub fn init_tracing() -> Result<(), SyncError> {
    init_tracing_with_service("ticketsync")
}

/// Install the global subscriber: stderr output filtered by `TICKETSYNC_LOG`
/// (or `RUST_LOG`), plus a debug-level file log when `TICKETSYNC_LOG_FILE` is set.
pub fn init_tracing_with_service(service_name: &str) -> Result<(), SyncError> {
    let file_logging = std::env::var("TICKETSYNC_LOG_FILE").ok();

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter());

    let registry = tracing_subscriber::registry().with(stderr_layer);

    let installed = if let Some(log_path) = file_logging {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);

        let installed = registry.with(file_layer).try_init();
        eprintln!("File logging enabled: {}", log_path);
        installed
    } else {
        registry.try_init()
    };

    if installed.is_err() {
        tracing::debug!(service = service_name, "tracing subscriber already installed");
    } else {
        tracing::debug!(service = service_name, "tracing initialized");
    }
    Ok(())
}

fn env_filter() -> EnvFilter {
    let directives = std::env::var("TICKETSYNC_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
