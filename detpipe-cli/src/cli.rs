// ============================================================================
// detpipe-cli/src/cli.rs
// ============================================================================
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Detpipe: detection pipeline stage engine",
    long_about = "Plans detection segments for a job and runs recorded detector responses \
                  through aggregation, geometry and track merging via detpipe-core."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log at debug level (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write the log to a timestamped file in this directory instead of the console
    #[arg(long, global = true, value_name = "LOG_DIR", env = "DETPIPE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Engine configuration file (JSON). Defaults and DETPIPE_* variables apply otherwise.
    #[arg(short, long, global = true, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plans the detection segments of one task of a job
    Plan(PlanArgs),
    /// Aggregates recorded detector responses and runs geometry and merging
    Run(RunArgs),
    /// Pads a single detection and clips it to the frame
    Pad(PadArgs),
    /// Prints the effective engine configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Job description (JSON)
    #[arg(value_name = "JOB_FILE")]
    pub job: PathBuf,

    /// Index of the task to plan
    #[arg(short, long, default_value_t = 0)]
    pub task: usize,

    /// Tracks of earlier tasks (JSON array), needed when planning a later task
    #[arg(long, value_name = "TRACKS_FILE")]
    pub tracks: Option<PathBuf>,

    /// Write the segments here instead of stdout
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Job description (JSON)
    #[arg(value_name = "JOB_FILE")]
    pub job: PathBuf,

    /// Detector responses for every task (JSON array)
    #[arg(short, long, value_name = "RESPONSES_FILE")]
    pub responses: PathBuf,

    /// Write the job report here instead of stdout
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PadArgs {
    /// Detection box as X,Y,WIDTH,HEIGHT
    #[arg(long = "box", value_name = "X,Y,W,H", value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub bounding_box: Vec<i32>,

    /// Frame size as WIDTHxHEIGHT
    #[arg(long, value_name = "WxH", value_parser = parse_frame_size)]
    pub frame: (i32, i32),

    /// Horizontal padding in pixels or percent of the width (e.g. 10, -5, 25%)
    #[arg(short = 'x', long, default_value = "0", allow_hyphen_values = true)]
    pub padding_x: String,

    /// Vertical padding in pixels or percent of the height
    #[arg(short = 'y', long, default_value = "0", allow_hyphen_values = true)]
    pub padding_y: String,

    /// Clockwise rotation of the detection in degrees
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub rotation: f64,

    /// The detection is horizontally flipped
    #[arg(long)]
    pub flip: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Also write the configuration to this file
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,
}

fn parse_frame_size(value: &str) -> Result<(i32, i32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<i32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("invalid frame dimension '{part}'"))
    };
    Ok((parse(width)?, parse(height)?))
}
