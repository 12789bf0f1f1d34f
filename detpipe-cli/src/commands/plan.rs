//! The `plan` command: segments for one task of a job.

use anyhow::Context;
use detpipe_core::model::{JobDescriptor, Track};
use detpipe_core::{EngineConfig, InMemoryJobStore, JobStateStore, StagePipeline};
use log::info;

use crate::cli::PlanArgs;
use crate::error::CliResult;
use crate::output::{print_issue, read_json, write_json};

pub fn run_plan(args: &PlanArgs, config: EngineConfig) -> CliResult<()> {
    let job: JobDescriptor = read_json(&args.job, "job description")?;
    let pipeline = StagePipeline::new(config);
    let state = InMemoryJobStore::new();

    if let Some(path) = &args.tracks {
        let tracks: Vec<Track> = read_json(path, "tracks")?;
        info!("Loaded {} tracks of earlier tasks from {}", tracks.len(), path.display());
        for track in tracks {
            state.add_track(track)?;
        }
    }

    let segments = pipeline
        .plan(&job, args.task, &state)
        .with_context(|| format!("Failed to plan task {} of job {}", args.task, job.id))?;

    for media in &job.media {
        for issue in state.media_snapshot(job.id, media.id)?.issues {
            print_issue(&issue);
        }
    }

    write_json(&segments, args.output.as_deref())
}
