//! Job, task and action descriptions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::media::Media;

/// A configured use of one detection algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub algorithm: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Action {
    pub fn new(name: impl Into<String>, algorithm: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            algorithm: algorithm.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}

/// A pipeline stage: actions that run in parallel over every medium.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub actions: Vec<Action>,
    /// Markup and other non-detection tasks do not count when deciding
    /// whether a task is the first detection task.
    #[serde(default = "default_true")]
    pub detection: bool,
}

fn default_true() -> bool {
    true
}

/// An inclusive frame range supplied with a job to restrict detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: i32,
    pub end: i32,
}

impl FrameRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> i64 {
        i64::from(self.end) - i64::from(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Everything the engine needs to know about a batch job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: i64,
    #[serde(default)]
    pub job_properties: BTreeMap<String, String>,
    /// Job-level overrides keyed by algorithm name
    #[serde(default)]
    pub algorithm_properties: BTreeMap<String, BTreeMap<String, String>>,
    pub media: Vec<Media>,
    pub tasks: Vec<Task>,
    /// Frame ranges to use instead of whole media on the first detection task
    #[serde(default)]
    pub segment_frame_boundaries: Vec<FrameRange>,
}

impl JobDescriptor {
    pub fn media(&self, media_id: i64) -> Option<&Media> {
        self.media.iter().find(|media| media.id == media_id)
    }

    /// Whether `task_index` is the first task of the pipeline that runs detection.
    pub fn is_first_detection_task(&self, task_index: usize) -> bool {
        self.tasks
            .iter()
            .position(|task| task.detection)
            .is_none_or(|first| task_index <= first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, detection: bool) -> Task {
        Task {
            name: name.to_string(),
            actions: vec![Action::new(format!("{name} ACTION"), name)],
            detection,
        }
    }

    #[test]
    fn first_detection_task_skips_leading_non_detection_tasks() {
        let job = JobDescriptor {
            id: 1,
            job_properties: BTreeMap::new(),
            algorithm_properties: BTreeMap::new(),
            media: vec![],
            tasks: vec![task("EXTRACT", false), task("FACE", true), task("CLASSIFY", true)],
            segment_frame_boundaries: vec![],
        };
        assert!(job.is_first_detection_task(0));
        assert!(job.is_first_detection_task(1));
        assert!(!job.is_first_detection_task(2));
    }
}
