// ============================================================================
// detpipe-core/src/file_logging.rs
// ============================================================================
//
// FILE LOGGING: log4rs setup for engine runs
//
// Writes every log record at or above the requested level to a single file.
// The stages only use the `log` macros, so any other logger can be installed
// instead when the engine is embedded.

use anyhow::Result;
use log::LevelFilter;
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use std::path::{Path, PathBuf};

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {m}{n}";

/// Installs a file logger as the global logger.
///
/// The parent directory of `log_file` is created if needed. Fails when a
/// global logger is already installed.
pub fn setup_file_logging(log_file: &Path, log_level: LevelFilter) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build(log_file)?;

    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file_appender)))
        .build(Root::builder().appender("file").build(log_level))?;

    log4rs::init_config(config)?;
    Ok(())
}

/// Path of a new log file in `log_dir`, named after the current local time,
/// e.g. `detpipe_20240131_174502.log`.
pub fn timestamped_log_file(log_dir: &Path) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    log_dir.join(format!("detpipe_{timestamp}.log"))
}
