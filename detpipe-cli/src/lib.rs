// detpipe-cli/src/lib.rs
//
// Library portion of the detpipe CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands};
pub use commands::config::load_config;
pub use error::{CliResult, exit_code};
pub use logging::init_logging;
