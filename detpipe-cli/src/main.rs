// ============================================================================
// detpipe-cli/src/main.rs
// ============================================================================
//
// Entry point of the `detpipe` binary.
//
// Parses arguments, sets up logging, loads the engine configuration and
// dispatches to the subcommand. Errors are printed to stderr with their
// context chain and mapped to an exit code.

use clap::Parser;
use console::style;
use std::process;

use detpipe_cli::commands::{run_config, run_job, run_pad, run_plan};
use detpipe_cli::{Cli, CliResult, Commands, exit_code, init_logging, load_config};

fn run(cli: Cli) -> CliResult<()> {
    if let Some(log_file) = init_logging(cli.verbose, cli.log_dir.as_deref())? {
        eprintln!("Logging to {}", log_file.display());
    }

    match cli.command {
        Commands::Plan(args) => run_plan(&args, load_config(cli.config.as_deref())?),
        Commands::Run(args) => run_job(&args, load_config(cli.config.as_deref())?),
        Commands::Config(args) => run_config(&args, &load_config(cli.config.as_deref())?),
        Commands::Pad(args) => run_pad(&args),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        process::exit(exit_code(&e));
    }
}
