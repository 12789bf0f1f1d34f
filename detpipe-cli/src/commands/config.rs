//! The `config` command: the effective engine configuration.

use anyhow::Context;
use detpipe_core::EngineConfig;
use log::info;
use std::path::Path;

use crate::cli::ConfigArgs;
use crate::error::CliResult;
use crate::output::write_json;

/// Loads the configuration file when given, otherwise the defaults with
/// `DETPIPE_*` overrides. Either way the result is validated.
pub fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load configuration '{}'", path.display())),
        None => {
            let config = EngineConfig::default();
            config.validate().context("Invalid configuration from environment")?;
            Ok(config)
        }
    }
}

pub fn run_config(args: &ConfigArgs, config: &EngineConfig) -> CliResult<()> {
    if let Some(path) = &args.save {
        config
            .save(path)
            .with_context(|| format!("Failed to save configuration to '{}'", path.display()))?;
        info!("Configuration saved to {}", path.display());
    }
    write_json(config, None)
}
