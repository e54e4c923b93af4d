//! File-backed `tracing` setup. The terminal belongs to the TUI, so log lines
//! always go to a file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Overrides the configured filter directive when set.
pub const LOG_ENV: &str = "LIBRARY_CATALOG_LOG";

/// Install the global subscriber writing to `path`.
pub fn init_logging(config: &LogConfig, path: &Path) -> Result<()> {
    let writer = open_log_file(path)?;
    let filter = build_filter(config, std::env::var(LOG_ENV).ok().as_deref())?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter)
        .try_init()
        .context("failed to install log subscriber")
}

/// A set override replaces the config level outright and must parse on its own.
fn build_filter(config: &LogConfig, level_override: Option<&str>) -> Result<EnvFilter> {
    match level_override {
        Some(value) => {
            EnvFilter::try_new(value).with_context(|| format!("invalid {LOG_ENV} {value:?}"))
        }
        None => EnvFilter::try_new(&config.level)
            .with_context(|| format!("invalid log level {:?}", config.level)),
    }
}

/// Shared append-only handle handed to the fmt layer.
#[derive(Clone)]
struct LogFileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn open_log_file(path: &Path) -> Result<LogFileWriter> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create log directory")?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    Ok(LogFileWriter {
        file: Arc::new(Mutex::new(file)),
    })
}
