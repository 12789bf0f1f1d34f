//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of one subcommand.

pub mod config;
pub mod pad;
pub mod plan;
pub mod run;

pub use config::run_config;
pub use pad::run_pad;
pub use plan::run_plan;
pub use run::run_job;
