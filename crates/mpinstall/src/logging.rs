//! Log subscriber setup.
//!
//! Everything goes to stderr. With `--tee` a second, ANSI-free layer
//! appends the same events to `mpinstall-<YYYYmmddHHMM>.log`, which
//! includes the output of every external command.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Name of the tee log file for a run started at `now`.
pub fn log_file_name(now: DateTime<Local>) -> String {
    format!("mpinstall-{}.log", now.format("%Y%m%d%H%M"))
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "mpinstall=debug"
    } else if quiet {
        "mpinstall=warn"
    } else {
        "mpinstall=info"
    }
}

/// Installs the global subscriber. Returns the tee file path when one was
/// opened.
pub fn init(verbose: bool, quiet: bool, tee_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_ansi(mpinstall_ui::terminal::is_stderr_tty());

    let (file_layer, path) = match tee_dir {
        Some(dir) => {
            let path = dir.join(log_file_name(Local::now()));
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_target(false)
                .with_ansi(false);
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("failed to initialize logging")?;

    Ok(path)
}
