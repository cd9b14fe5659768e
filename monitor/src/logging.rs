//! Tracing subscriber setup: console plus an optional log file

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// The console honours `RUST_LOG`, falling back to `logging.level`. The file
/// layer, when configured, records everything at debug and above.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let console_filter = EnvFilter::builder()
        .parse_lossy(std::env::var("RUST_LOG").unwrap_or_else(|_| config.level.clone()));

    let console = tracing_subscriber::fmt::layer()
        .compact()
        .with_filter(console_filter);

    let file = if config.file.is_empty() {
        None
    } else {
        let path = Path::new(&config.file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {:?}", parent))?;
        }
        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {:?}", path))?;

        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true)
                .with_writer(Mutex::new(writer))
                .with_filter(EnvFilter::new("debug")),
        )
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
