//! Logging setup
//!
//! Console output goes to stderr, filtered by `RUST_LOG` (default `info`).
//! When a log directory is configured, events are also appended to a daily
//! file `curator.YYYY-MM-DD.log` shared by every run of that day; the run id
//! on the root span tells the runs apart.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use tracing::span::EnteredSpan;
use tracing::info_span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::fs::permissions::{normalize_or_warn, DIR_MODE, FILE_MODE};

const LOG_PREFIX: &str = "curator";

/// Keeps the run span entered; hold it until `main` returns.
pub struct LogGuard {
    pub run_id: Uuid,
    pub log_path: Option<PathBuf>,
    _span: EnteredSpan,
}

pub fn daily_log_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{LOG_PREFIX}.{}.log", date.format("%Y-%m-%d")))
}

/// Open (or create) the day's log file for appending and open up its mode.
pub fn open_daily_log(dir: &Path, date: NaiveDate) -> io::Result<(File, PathBuf)> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        normalize_or_warn(dir, DIR_MODE);
    }
    let path = daily_log_path(dir, date);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    normalize_or_warn(&path, FILE_MODE);
    Ok((file, path))
}

/// Install the global subscriber and enter the run span.
///
/// Fails if a subscriber is already installed or the log file cannot be
/// opened.
pub fn init(log_dir: Option<&Path>) -> Result<LogGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    let (file_layer, log_path) = match log_dir {
        Some(dir) => {
            let (file, path) = open_daily_log(dir, Local::now().date_naive())
                .with_context(|| format!("failed to open log file in {}", dir.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))?;

    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id).entered();

    Ok(LogGuard {
        run_id,
        log_path,
        _span: span,
    })
}
