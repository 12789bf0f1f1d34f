//! Detection work units.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::media::MediaType;
use super::track::Track;

/// Identity of one segment. Responses are deduplicated on this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId {
    pub job_id: i64,
    pub media_id: i64,
    pub task_index: usize,
    pub action_index: usize,
    /// Position of the segment in the plan of its (media, task, action)
    pub segment_index: usize,
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Job {}|{}|{}] Media {} segment {}",
            self.job_id, self.task_index, self.action_index, self.media_id, self.segment_index
        )
    }
}

/// The portion of a medium covered by a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentRange {
    /// Inclusive frame range of a video
    Frames { start: i32, stop: i32 },
    /// Inclusive time range in milliseconds, `stop == -1` meaning end of medium
    Time { start: i64, stop: i64 },
    /// The whole medium (images and generic media)
    Whole,
}

impl SegmentRange {
    pub fn frames(&self) -> (i32, i32) {
        match *self {
            SegmentRange::Frames { start, stop } => (start, stop),
            _ => (0, 0),
        }
    }

    pub fn times(&self) -> (i64, i64) {
        match *self {
            SegmentRange::Time { start, stop } => (start, stop),
            _ => (0, 0),
        }
    }
}

/// A unit of detection work for one medium and one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub action_name: String,
    pub algorithm: String,
    pub media_type: MediaType,
    pub range: SegmentRange,
    /// Fully resolved properties sent with the request
    pub properties: BTreeMap<String, String>,
    pub media_metadata: BTreeMap<String, String>,
    /// Track from the previous task when feed-forward is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_forward_track: Option<Track>,
}
