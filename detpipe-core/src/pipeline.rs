// ============================================================================
// detpipe-core/src/pipeline.rs
// ============================================================================
//
// STAGE PIPELINE: Running one task of a job through every stage
//
// The pipeline owns one instance of each stage, configured from the engine
// configuration, and runs them in order for a task:
//
//   plan -> (detection components) -> aggregate -> transform -> merge
//
// Detection itself happens elsewhere; the pipeline hands out the planned
// segments and later receives the responses. Aggregation, transformation and
// merging are parallelised across media with rayon. Each medium is only ever
// touched by one worker at a time.

use log::info;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::aggregation::{merge_detection_errors, AggregationOutcome, DetectionAggregator, DetectionResponse, MergedIssue};
use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult};
use crate::geometry::{GeometryTransformer, TransformSummary};
use crate::merging::{MergeSummary, TrackMerger};
use crate::model::{JobDescriptor, JobIssue, Segment, Track};
use crate::properties::JobPropertyStore;
use crate::segmenting::SegmentPlanner;
use crate::store::{ActionTimings, InMemoryJobStore, JobStateStore};

/// Counts for one task run through the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub task_index: usize,
    pub responses_aggregated: usize,
    pub responses_ignored: usize,
    pub tracks_added: usize,
    pub detections_discarded: usize,
    pub segments_failed: usize,
    pub geometry: TransformSummary,
    pub merging: MergeSummary,
}

/// Everything recorded for a job, as handed to the job owner.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobReport {
    pub job_id: i64,
    /// Tracks of every task and action, by media id
    pub tracks: BTreeMap<i64, BTreeSet<Track>>,
    pub errors: Vec<MergedIssue>,
    pub issues: Vec<JobIssue>,
    pub timings: ActionTimings,
}

#[derive(Debug, Clone)]
pub struct StagePipeline {
    config: EngineConfig,
    planner: SegmentPlanner,
    aggregator: DetectionAggregator,
    transformer: GeometryTransformer,
    merger: TrackMerger,
}

impl Default for StagePipeline {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl StagePipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            planner: SegmentPlanner::new(config.segmenting.clone()),
            aggregator: DetectionAggregator::new(config.detection.confidence_threshold),
            transformer: GeometryTransformer::from_config(&config.detection),
            merger: TrackMerger::from_config(config.track_merging.clone()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Property layers of a job, with the engine configuration as system layer.
    pub fn property_store<'a>(&self, job: &'a JobDescriptor) -> JobPropertyStore<'a> {
        JobPropertyStore::new(job, self.config.system_properties())
    }

    /// Plans the segments of one task.
    pub fn plan(&self, job: &JobDescriptor, task_index: usize, state: &dyn JobStateStore) -> CoreResult<Vec<Segment>> {
        let properties = self.property_store(job);
        self.planner.plan_task(job, task_index, &properties, state)
    }

    /// Aggregates the responses of one task.
    ///
    /// Responses are grouped by medium; groups are processed in parallel and
    /// each group in order.
    pub fn aggregate(
        &self,
        job: &JobDescriptor,
        task_index: usize,
        responses: &[DetectionResponse],
        state: &dyn JobStateStore,
    ) -> CoreResult<TaskReport> {
        if let Some(foreign) = responses.iter().find(|r| r.segment.job_id != job.id) {
            return Err(CoreError::InvalidInput(format!(
                "Response for job {} handed to job {}",
                foreign.segment.job_id, job.id
            )));
        }

        let mut by_media: BTreeMap<i64, Vec<&DetectionResponse>> = BTreeMap::new();
        for response in responses.iter().filter(|r| r.segment.task_index == task_index) {
            by_media.entry(response.segment.media_id).or_default().push(response);
        }

        let properties = self.property_store(job);
        let outcomes = by_media
            .into_par_iter()
            .map(|(_, group)| {
                group
                    .into_iter()
                    .map(|response| self.aggregator.on_response(job, &properties, state, response))
                    .collect::<CoreResult<Vec<_>>>()
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let mut report = TaskReport {
            task_index,
            ..TaskReport::default()
        };
        for outcome in outcomes.into_iter().flatten() {
            match outcome {
                AggregationOutcome::Duplicate => report.responses_ignored += 1,
                AggregationOutcome::Aggregated {
                    tracks_added,
                    detections_discarded,
                    error_recorded,
                } => {
                    report.responses_aggregated += 1;
                    report.tracks_added += tracks_added;
                    report.detections_discarded += detections_discarded;
                    report.segments_failed += usize::from(error_recorded);
                }
            }
        }
        Ok(report)
    }

    /// Runs the geometry and merging stages for every medium of a task.
    pub fn finish_task(
        &self,
        job: &JobDescriptor,
        task_index: usize,
        state: &dyn JobStateStore,
    ) -> CoreResult<(TransformSummary, MergeSummary)> {
        let properties = self.property_store(job);
        let summaries = job
            .media
            .par_iter()
            .map(|media| {
                let geometry = self
                    .transformer
                    .transform_media(job, media, task_index, &properties, state)?;
                let merging = self.merger.merge_media(job, media, task_index, &properties, state)?;
                Ok((geometry, merging))
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let mut geometry = TransformSummary::default();
        let mut merging = MergeSummary::default();
        for (g, m) in summaries {
            geometry += g;
            merging.tracks_before += m.tracks_before;
            merging.tracks_after += m.tracks_after;
        }
        Ok((geometry, merging))
    }

    /// Aggregates the responses of a task and then runs the geometry and
    /// merging stages on the result.
    pub fn run_task(
        &self,
        job: &JobDescriptor,
        task_index: usize,
        responses: &[DetectionResponse],
        state: &dyn JobStateStore,
    ) -> CoreResult<TaskReport> {
        let mut report = self.aggregate(job, task_index, responses, state)?;
        let (geometry, merging) = self.finish_task(job, task_index, state)?;
        report.geometry = geometry;
        report.merging = merging;

        info!(
            "[Job {}|{}] Aggregated {} responses ({} ignored), {} tracks after merging",
            job.id, task_index, report.responses_aggregated, report.responses_ignored, merging.tracks_after
        );
        Ok(report)
    }

    /// Collects the tracks, errors, warnings and timings recorded for a job.
    pub fn report(&self, job: &JobDescriptor, state: &InMemoryJobStore) -> CoreResult<JobReport> {
        let mut report = JobReport {
            job_id: job.id,
            timings: state.action_timings(job.id)?,
            ..JobReport::default()
        };

        let mut errors = Vec::new();
        for media in &job.media {
            let snapshot = state.media_snapshot(job.id, media.id)?;
            errors.extend(snapshot.detection_errors);
            report.issues.extend(snapshot.issues);
            report.tracks.insert(media.id, snapshot.tracks);
        }
        report.errors = merge_detection_errors(job, &errors);
        Ok(report)
    }
}
