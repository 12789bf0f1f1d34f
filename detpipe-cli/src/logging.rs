// ============================================================================
// detpipe-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: console or file logging for a CLI run
//
// Console logging goes through env_logger on stderr so stdout carries only
// command output. With a log directory the engine's log4rs file logger is
// installed instead.
//
// USAGE:
// - default: info level
// - --verbose: debug level
// - RUST_LOG=trace etc. overrides both for console logging

use anyhow::Context;
use detpipe_core::{setup_file_logging, timestamped_log_file};
use log::LevelFilter;
use std::path::{Path, PathBuf};

use crate::error::CliResult;

/// Installs the global logger.
///
/// Returns the log file path when logging to a file.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) -> CliResult<Option<PathBuf>> {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    if let Some(log_dir) = log_dir {
        let log_file = timestamped_log_file(log_dir);
        setup_file_logging(&log_file, level)
            .with_context(|| format!("Failed to set up logging to '{}'", log_file.display()))?;
        return Ok(Some(log_file));
    }

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .try_init()
        .context("Failed to initialize console logging")?;
    Ok(None)
}
