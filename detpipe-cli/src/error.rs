// ============================================================================
// detpipe-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Result type and exit codes for the CLI
//
// Commands return `anyhow` errors with file and command context attached.
// The engine's `CoreError` stays reachable through downcasting, which is how
// exit codes tell bad input apart from processing failures.

use detpipe_core::CoreError;
use detpipe_core::geometry::PaddingError;

/// Result type for CLI commands.
pub type CliResult<T> = anyhow::Result<T>;

/// Exit code for input the engine rejected: unreadable JSON, invalid
/// configuration, bad padding values or responses that do not belong to
/// the job.
pub const EXIT_INVALID_INPUT: i32 = 2;

/// Exit code for every other failure.
pub const EXIT_FAILURE: i32 = 1;

/// Maps a command error to the process exit code.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<serde_json::Error>().is_some() || error.downcast_ref::<PaddingError>().is_some() {
        return EXIT_INVALID_INPUT;
    }
    match error.downcast_ref::<CoreError>() {
        Some(CoreError::Json(_) | CoreError::Config(_) | CoreError::InvalidInput(_) | CoreError::Padding(_)) => {
            EXIT_INVALID_INPUT
        }
        _ => EXIT_FAILURE,
    }
}
