// ============================================================================
// detpipe-cli/src/output.rs
// ============================================================================
//
// OUTPUT: JSON documents on stdout or in files, styled summaries on stderr

use anyhow::Context;
use console::style;
use detpipe_core::JobReport;
use detpipe_core::model::{JobIssue, Severity};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::error::CliResult;

/// Reads and parses a JSON document.
///
/// `what` names the document in error messages.
pub fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> CliResult<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {what} '{}'", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {what} '{}'", path.display()))
}

/// Writes `value` as pretty-printed JSON to `output`, or to stdout.
pub fn write_json<T: Serialize + ?Sized>(value: &T, output: Option<&Path>) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json + "\n").with_context(|| format!("Failed to write '{}'", path.display()))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

pub fn print_heading(text: &str) {
    eprintln!("{}", style(format!("===== {text} =====")).bold());
}

pub fn print_info<T: Display>(label: &str, value: T) {
    eprintln!("  {}: {}", style(label).cyan(), value);
}

pub fn print_issue(issue: &JobIssue) {
    let marker = match issue.severity {
        Severity::Warning => style("⚠").yellow().bold(),
        Severity::Error => style("✗").red().bold(),
    };
    eprintln!("  {} [media {}] {}: {}", marker, issue.media_id, issue.issue_code, issue.message);
}

/// Summary of a finished run for the terminal.
pub fn print_run_summary(report: &JobReport) {
    print_heading(&format!("Job {}", report.job_id));
    let track_count: usize = report.tracks.values().map(|tracks| tracks.len()).sum();
    print_info("Media", report.tracks.len());
    print_info("Tracks", track_count);
    print_info("Detection errors", report.errors.len());
    for (action, millis) in &report.timings.processing_time_ms {
        print_info(&format!("Processing time ({action})"), format!("{millis} ms"));
    }
    for error in &report.errors {
        eprintln!(
            "  {} [media {}] {} {}: {}",
            style("✗").red().bold(),
            error.media_id,
            error.source,
            error.code,
            error.message
        );
    }
    for issue in &report.issues {
        print_issue(issue);
    }
    if report.errors.is_empty() && report.issues.is_empty() {
        eprintln!("  {} No errors or warnings", style("✓").green().bold());
    }
}
