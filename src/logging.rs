// Logging
// tracing subscriber setup for headless and interactive runs

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Where log records go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Headless runs
    Stderr,
    /// Appended to a file; the only way to see logs while the TUI owns the screen
    File(PathBuf),
    /// Interactive runs without a log file
    Discard,
}

impl LogTarget {
    /// Pick a target from the run mode and an optional log file
    pub fn select(interactive: bool, log_file: Option<PathBuf>) -> Self {
        match (log_file, interactive) {
            (Some(path), _) => LogTarget::File(path),
            (None, false) => LogTarget::Stderr,
            (None, true) => LogTarget::Discard,
        }
    }
}

/// Install the global subscriber
///
/// The level comes from `RUST_LOG`, defaulting to `info`.
pub fn init(target: &LogTarget) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Invalid log filter")?;

    let (writer, ansi) = match target {
        LogTarget::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            (BoxMakeWriter::new(Arc::new(file)), false)
        }
        LogTarget::Discard => (BoxMakeWriter::new(std::io::sink), false),
    };

    let fmt_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(())
}
