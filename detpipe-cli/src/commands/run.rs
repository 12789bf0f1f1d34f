//! The `run` command: recorded detector responses through every task.

use anyhow::Context;
use detpipe_core::model::JobDescriptor;
use detpipe_core::{DetectionResponse, EngineConfig, InMemoryJobStore, JobReport, StagePipeline, TaskReport};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde::Serialize;

use crate::cli::RunArgs;
use crate::error::CliResult;
use crate::output::{print_run_summary, read_json, write_json};

/// Document written by `run`.
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub report: JobReport,
    pub tasks: Vec<TaskReport>,
}

fn task_progress(task_count: usize) -> ProgressBar {
    let bar = ProgressBar::new(task_count as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} tasks {msg}") {
        bar.set_style(style.progress_chars("#>."));
    }
    bar
}

pub fn run_job(args: &RunArgs, config: EngineConfig) -> CliResult<()> {
    let job: JobDescriptor = read_json(&args.job, "job description")?;
    let responses: Vec<DetectionResponse> = read_json(&args.responses, "detector responses")?;
    info!(
        "Running job {} with {} tasks over {} media ({} responses)",
        job.id,
        job.tasks.len(),
        job.media.len(),
        responses.len()
    );

    let pipeline = StagePipeline::new(config);
    let state = InMemoryJobStore::new();
    let progress = task_progress(job.tasks.len());
    let mut tasks = Vec::with_capacity(job.tasks.len());

    for (task_index, task) in job.tasks.iter().enumerate() {
        progress.set_message(task.name.clone());
        let report = pipeline
            .run_task(&job, task_index, &responses, &state)
            .with_context(|| format!("Failed to run task {task_index} ('{}') of job {}", task.name, job.id))?;
        if report.responses_aggregated == 0 && report.responses_ignored == 0 {
            warn!("No responses for task {task_index} ('{}')", task.name);
        }
        tasks.push(report);
        progress.inc(1);
    }
    progress.finish_and_clear();

    let report = pipeline.report(&job, &state)?;
    print_run_summary(&report);
    write_json(&RunOutput { report, tasks }, args.output.as_deref())
}
