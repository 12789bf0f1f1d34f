//! Detection results as returned by detection components for one segment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::DetectionErrorCode;
use crate::model::{Detection, SegmentId, SegmentRange};

/// One object location in a frame or image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationResult {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: f32,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl LocationResult {
    pub fn to_detection(&self, media_offset_frame: i32, media_offset_time: i64) -> Detection {
        Detection::new(
            self.x,
            self.y,
            self.width,
            self.height,
            self.confidence,
            media_offset_frame,
            media_offset_time,
            self.properties.clone(),
        )
    }
}

/// A track found in a video segment, with locations keyed by frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoTrackResult {
    pub detection_type: String,
    pub start_frame: i32,
    pub stop_frame: i32,
    #[serde(default = "unknown_confidence")]
    pub confidence: f32,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub frame_locations: BTreeMap<i32, LocationResult>,
}

/// A track found in an audio segment. Times are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrackResult {
    pub detection_type: String,
    pub start_time: i64,
    pub stop_time: i64,
    pub confidence: f32,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageLocationsResult {
    pub detection_type: String,
    #[serde(default)]
    pub locations: Vec<LocationResult>,
}

/// A result for media without frames or time, such as documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericTrackResult {
    pub detection_type: String,
    pub confidence: f32,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Everything a detection component reported for one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub segment: SegmentId,
    pub action_name: String,
    pub range: SegmentRange,
    #[serde(default)]
    pub error: DetectionErrorCode,
    #[serde(default)]
    pub error_message: String,
    /// Time the component spent on the segment, when it reported one
    #[serde(default)]
    pub processing_time_ms: Option<i64>,
    #[serde(default)]
    pub video_tracks: Vec<VideoTrackResult>,
    #[serde(default)]
    pub audio_tracks: Vec<AudioTrackResult>,
    #[serde(default)]
    pub image_locations: Vec<ImageLocationsResult>,
    #[serde(default)]
    pub generic_tracks: Vec<GenericTrackResult>,
}

impl DetectionResponse {
    /// An empty, successful response for a segment.
    pub fn new(segment: SegmentId, action_name: impl Into<String>, range: SegmentRange) -> Self {
        Self {
            segment,
            action_name: action_name.into(),
            range,
            error: DetectionErrorCode::NoDetectionError,
            error_message: String::new(),
            processing_time_ms: None,
            video_tracks: Vec::new(),
            audio_tracks: Vec::new(),
            image_locations: Vec::new(),
            generic_tracks: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: DetectionErrorCode, message: impl Into<String>) -> Self {
        self.error = error;
        self.error_message = message.into();
        self
    }

    pub fn with_processing_time(mut self, millis: i64) -> Self {
        self.processing_time_ms = Some(millis);
        self
    }

    pub fn has_results(&self) -> bool {
        !(self.video_tracks.is_empty()
            && self.audio_tracks.is_empty()
            && self.image_locations.is_empty()
            && self.generic_tracks.is_empty())
    }
}

fn unknown_confidence() -> f32 {
    -1.0
}
