// ============================================================================
// gstframes-cli/src/logging.rs
// ============================================================================
//
// LOGGING: Console and File Log Dispatch
//
// The core library logs through the `log` facade only. This module installs
// the backend for the CLI with `fern`: colored, level-tagged lines on stderr
// and, optionally, plain timestamped lines in a log file.
//
// LEVELS:
// - default: info for gstframes crates, warn for everything else
// - --verbose: debug for gstframes crates

use anyhow::{Context, Result};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::path::{Path, PathBuf};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
///
/// Used to name log files created inside a log directory.
///
/// # Example
/// ```
/// let log_filename = format!("gstframes_{}.log", gstframes_cli::logging::get_timestamp());
/// assert!(log_filename.starts_with("gstframes_"));
/// ```
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Resolves `--log-file`: a directory gets a timestamped file inside it.
pub fn log_file_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(format!("gstframes_{}.log", get_timestamp()))
    } else {
        path.to_path_buf()
    }
}

/// Installs the global logger.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::BrightBlack);

    let console = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!("[{}] {}", colors.color(record.level()), message))
        })
        .chain(std::io::stderr());

    let mut root = fern::Dispatch::new()
        .level(LevelFilter::Warn)
        .level_for("gstframes", level)
        .level_for("gstframes_cli", level)
        .level_for("gstframes_core", level)
        .chain(console);

    if let Some(path) = log_file {
        let path = log_file_path(path);
        let file = fern::log_file(&path)
            .with_context(|| format!("Failed to open log file '{}'", path.display()))?;
        root = root.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{} [{}] {}: {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                        record.level(),
                        record.target(),
                        message
                    ))
                })
                .chain(file),
        );
    }

    root.apply().context("Failed to install logger")?;
    Ok(())
}
