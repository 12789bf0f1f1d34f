//! Job state storage used by the stages.
//!
//! The stages only ever talk to [`JobStateStore`]; persistence is someone
//! else's concern. [`InMemoryJobStore`] backs the command line tool and the
//! tests.

mod memory;

use std::collections::BTreeSet;
use thiserror::Error;

use crate::constants::IssueCode;
use crate::model::{DetectionProcessingError, SegmentId, Track};

pub use memory::{ActionTimings, InMemoryJobStore, MediaState};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job state lock was poisoned")]
    Poisoned,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Mutable state of in-progress jobs.
///
/// Implementations must accept concurrent calls for different media of the
/// same job. Calls for one medium, task and action come from a single writer.
pub trait JobStateStore: Send + Sync {
    fn add_track(&self, track: Track) -> StoreResult<()>;

    /// Replaces every track of one (media, task, action).
    fn set_tracks(
        &self,
        job_id: i64,
        media_id: i64,
        task_index: usize,
        action_index: usize,
        tracks: BTreeSet<Track>,
    ) -> StoreResult<()>;

    fn get_tracks(
        &self,
        job_id: i64,
        media_id: i64,
        task_index: usize,
        action_index: usize,
    ) -> StoreResult<BTreeSet<Track>>;

    fn add_detection_processing_error(&self, error: DetectionProcessingError) -> StoreResult<()>;

    fn add_processing_time(&self, job_id: i64, action_name: &str, millis: i64) -> StoreResult<()>;

    fn report_missing_processing_time(&self, job_id: i64, action_name: &str) -> StoreResult<()>;

    fn add_warning(&self, job_id: i64, media_id: i64, issue_code: IssueCode, message: &str) -> StoreResult<()>;

    fn add_error(&self, job_id: i64, media_id: i64, issue_code: IssueCode, message: &str) -> StoreResult<()>;

    /// Records that a segment's response was aggregated.
    ///
    /// Returns `false` when the segment had already been recorded.
    fn mark_segment_processed(&self, segment: SegmentId) -> StoreResult<bool>;

    /// Forgets a segment recorded by `mark_segment_processed`, so that a
    /// redelivered response is aggregated again.
    fn clear_segment_processed(&self, segment: SegmentId) -> StoreResult<()>;
}
