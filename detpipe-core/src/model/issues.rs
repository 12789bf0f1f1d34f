//! Errors and warnings recorded against a job.

use serde::{Deserialize, Serialize};

use crate::constants::IssueCode;

/// An upstream detector failure scoped to a frame/time range of one medium.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DetectionProcessingError {
    pub job_id: i64,
    pub media_id: i64,
    pub task_index: usize,
    pub action_index: usize,
    pub start_frame: i32,
    pub stop_frame: i32,
    pub start_time: i64,
    pub stop_time: i64,
    pub error_code: String,
    pub error_message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A medium-level warning or error reported to the job owner.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobIssue {
    pub job_id: i64,
    pub media_id: i64,
    pub severity: Severity,
    pub issue_code: IssueCode,
    pub message: String,
}
