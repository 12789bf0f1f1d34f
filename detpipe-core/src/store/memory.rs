// ============================================================================
// detpipe-core/src/store/memory.rs
// ============================================================================
//
// IN-MEMORY JOB STORE: Job state held in process memory
//
// State is partitioned per (job, media) so that different media of the same
// job can be updated from different threads without contending on one lock.
// Action timings are job-wide and sit behind their own mutex.

use log::trace;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use super::{JobStateStore, StoreError, StoreResult};
use crate::constants::IssueCode;
use crate::model::{DetectionProcessingError, JobIssue, SegmentId, Severity, Track};

/// Everything recorded for one medium of a job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MediaState {
    pub tracks: BTreeSet<Track>,
    pub detection_errors: BTreeSet<DetectionProcessingError>,
    pub issues: BTreeSet<JobIssue>,
    #[serde(skip)]
    pub processed_segments: BTreeSet<SegmentId>,
}

/// Processing time bookkeeping for the actions of one job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionTimings {
    pub processing_time_ms: BTreeMap<String, i64>,
    pub missing_processing_time: BTreeSet<String>,
}

type SharedMediaState = Arc<Mutex<MediaState>>;

#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    media: RwLock<HashMap<(i64, i64), SharedMediaState>>,
    timings: Mutex<HashMap<i64, ActionTimings>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn media_state(&self, job_id: i64, media_id: i64) -> StoreResult<SharedMediaState> {
        {
            let media = self.media.read().map_err(|_| StoreError::Poisoned)?;
            if let Some(state) = media.get(&(job_id, media_id)) {
                return Ok(Arc::clone(state));
            }
        }
        let mut media = self.media.write().map_err(|_| StoreError::Poisoned)?;
        Ok(Arc::clone(media.entry((job_id, media_id)).or_default()))
    }

    fn with_media<T>(
        &self,
        job_id: i64,
        media_id: i64,
        f: impl FnOnce(&mut MediaState) -> T,
    ) -> StoreResult<T> {
        let state = self.media_state(job_id, media_id)?;
        let mut guard = state.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut guard))
    }

    fn with_timings<T>(&self, job_id: i64, f: impl FnOnce(&mut ActionTimings) -> T) -> StoreResult<T> {
        let mut timings = self.timings.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(timings.entry(job_id).or_default()))
    }

    fn add_issue(
        &self,
        job_id: i64,
        media_id: i64,
        severity: Severity,
        issue_code: IssueCode,
        message: &str,
    ) -> StoreResult<()> {
        let issue = JobIssue {
            job_id,
            media_id,
            severity,
            issue_code,
            message: message.to_string(),
        };
        self.with_media(job_id, media_id, |state| {
            state.issues.insert(issue);
        })
    }

    /// Copy of everything recorded for one medium.
    pub fn media_snapshot(&self, job_id: i64, media_id: i64) -> StoreResult<MediaState> {
        self.with_media(job_id, media_id, |state| state.clone())
    }

    pub fn action_timings(&self, job_id: i64) -> StoreResult<ActionTimings> {
        self.with_timings(job_id, |timings| timings.clone())
    }
}

impl JobStateStore for InMemoryJobStore {
    fn add_track(&self, track: Track) -> StoreResult<()> {
        trace!(
            "[Job {}|{}|{}] Storing {} track for media {} [{}, {}]",
            track.job_id,
            track.task_index,
            track.action_index,
            track.track_type,
            track.media_id,
            track.start_frame,
            track.end_frame
        );
        self.with_media(track.job_id, track.media_id, |state| {
            state.tracks.insert(track);
        })
    }

    fn set_tracks(
        &self,
        job_id: i64,
        media_id: i64,
        task_index: usize,
        action_index: usize,
        tracks: BTreeSet<Track>,
    ) -> StoreResult<()> {
        self.with_media(job_id, media_id, |state| {
            state
                .tracks
                .retain(|t| t.task_index != task_index || t.action_index != action_index);
            state.tracks.extend(tracks);
        })
    }

    fn get_tracks(
        &self,
        job_id: i64,
        media_id: i64,
        task_index: usize,
        action_index: usize,
    ) -> StoreResult<BTreeSet<Track>> {
        self.with_media(job_id, media_id, |state| {
            state
                .tracks
                .iter()
                .filter(|t| t.task_index == task_index && t.action_index == action_index)
                .cloned()
                .collect()
        })
    }

    fn add_detection_processing_error(&self, error: DetectionProcessingError) -> StoreResult<()> {
        self.with_media(error.job_id, error.media_id, |state| {
            state.detection_errors.insert(error);
        })
    }

    fn add_processing_time(&self, job_id: i64, action_name: &str, millis: i64) -> StoreResult<()> {
        self.with_timings(job_id, |timings| {
            *timings.processing_time_ms.entry(action_name.to_string()).or_default() += millis;
        })
    }

    fn report_missing_processing_time(&self, job_id: i64, action_name: &str) -> StoreResult<()> {
        self.with_timings(job_id, |timings| {
            timings.missing_processing_time.insert(action_name.to_string());
        })
    }

    fn add_warning(&self, job_id: i64, media_id: i64, issue_code: IssueCode, message: &str) -> StoreResult<()> {
        self.add_issue(job_id, media_id, Severity::Warning, issue_code, message)
    }

    fn add_error(&self, job_id: i64, media_id: i64, issue_code: IssueCode, message: &str) -> StoreResult<()> {
        self.add_issue(job_id, media_id, Severity::Error, issue_code, message)
    }

    fn mark_segment_processed(&self, segment: SegmentId) -> StoreResult<bool> {
        self.with_media(segment.job_id, segment.media_id, |state| {
            state.processed_segments.insert(segment)
        })
    }

    fn clear_segment_processed(&self, segment: SegmentId) -> StoreResult<()> {
        self.with_media(segment.job_id, segment.media_id, |state| {
            state.processed_segments.remove(&segment);
        })
    }
}
