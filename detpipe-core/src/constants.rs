//! Property names, issue codes and detector error codes shared across the engine.
//!
//! Property names are the exact keys exchanged with detection components and
//! stored in the property layers, so they are kept as string constants rather
//! than an enum.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---- Frame transform group ----

pub const ROTATION: &str = "ROTATION";
pub const HORIZONTAL_FLIP: &str = "HORIZONTAL_FLIP";
pub const AUTO_ROTATE: &str = "AUTO_ROTATE";
pub const AUTO_FLIP: &str = "AUTO_FLIP";
pub const SEARCH_REGION_ENABLE_DETECTION: &str = "SEARCH_REGION_ENABLE_DETECTION";
pub const SEARCH_REGION_TOP_LEFT_X_DETECTION: &str = "SEARCH_REGION_TOP_LEFT_X_DETECTION";
pub const SEARCH_REGION_TOP_LEFT_Y_DETECTION: &str = "SEARCH_REGION_TOP_LEFT_Y_DETECTION";
pub const SEARCH_REGION_BOTTOM_RIGHT_X_DETECTION: &str = "SEARCH_REGION_BOTTOM_RIGHT_X_DETECTION";
pub const SEARCH_REGION_BOTTOM_RIGHT_Y_DETECTION: &str = "SEARCH_REGION_BOTTOM_RIGHT_Y_DETECTION";

/// Properties that override as a unit: a layer that sets any of them hides
/// every member set at lower layers.
pub const FRAME_TRANSFORM_PROPERTIES: [&str; 9] = [
    ROTATION,
    HORIZONTAL_FLIP,
    SEARCH_REGION_ENABLE_DETECTION,
    SEARCH_REGION_TOP_LEFT_X_DETECTION,
    SEARCH_REGION_TOP_LEFT_Y_DETECTION,
    SEARCH_REGION_BOTTOM_RIGHT_X_DETECTION,
    SEARCH_REGION_BOTTOM_RIGHT_Y_DETECTION,
    AUTO_ROTATE,
    AUTO_FLIP,
];

// ---- Sampling ----

pub const MEDIA_SAMPLING_INTERVAL: &str = "MEDIA_SAMPLING_INTERVAL";
pub const FRAME_RATE_CAP: &str = "FRAME_RATE_CAP";

// ---- Segmenting ----

pub const TARGET_SEGMENT_LENGTH: &str = "TARGET_SEGMENT_LENGTH";
pub const MINIMUM_SEGMENT_LENGTH: &str = "MINIMUM_SEGMENT_LENGTH";
pub const VFR_TARGET_SEGMENT_LENGTH: &str = "VFR_TARGET_SEGMENT_LENGTH";
pub const VFR_MINIMUM_SEGMENT_LENGTH: &str = "VFR_MINIMUM_SEGMENT_LENGTH";
pub const MINIMUM_GAP_BETWEEN_SEGMENTS: &str = "MINIMUM_GAP_BETWEEN_SEGMENTS";
pub const SOURCE_MEDIA_ONLY: &str = "SOURCE_MEDIA_ONLY";
pub const DERIVATIVE_MEDIA_ONLY: &str = "DERIVATIVE_MEDIA_ONLY";
pub const FEED_FORWARD_TYPE: &str = "FEED_FORWARD_TYPE";
pub const FEED_FORWARD_TOP_CONFIDENCE_COUNT: &str = "FEED_FORWARD_TOP_CONFIDENCE_COUNT";

/// Accepted values of `FEED_FORWARD_TYPE`.
pub const FEED_FORWARD_TYPES: [&str; 4] = ["NONE", "FRAME", "SUPERSET_REGION", "REGION"];

// ---- Aggregation ----

pub const CONFIDENCE_THRESHOLD: &str = "CONFIDENCE_THRESHOLD";

// ---- Geometry ----

pub const DETECTION_PADDING_X: &str = "DETECTION_PADDING_X";
pub const DETECTION_PADDING_Y: &str = "DETECTION_PADDING_Y";
pub const SHRUNK_TO_NOTHING: &str = "SHRUNK_TO_NOTHING";

// ---- Track merging ----

pub const MERGE_TRACKS: &str = "MERGE_TRACKS";
pub const MIN_GAP_BETWEEN_TRACKS: &str = "MIN_GAP_BETWEEN_TRACKS";
pub const MIN_TRACK_LENGTH: &str = "MIN_TRACK_LENGTH";

// ---- Media metadata ----

pub const META_FPS: &str = "FPS";
pub const META_FRAME_WIDTH: &str = "FRAME_WIDTH";
pub const META_FRAME_HEIGHT: &str = "FRAME_HEIGHT";
pub const META_HAS_CONSTANT_FRAME_RATE: &str = "HAS_CONSTANT_FRAME_RATE";

/// Track type whose detections never take part in geometry or merging decisions.
pub const SPEECH_TRACK_TYPE: &str = "SPEECH";

/// Category attached to a job warning or medium-level error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    InvalidDetection,
    Padding,
    FrameCount,
    Other,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::InvalidDetection => "INVALID_DETECTION",
            IssueCode::Padding => "PADDING",
            IssueCode::FrameCount => "FRAME_COUNT",
            IssueCode::Other => "OTHER",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error codes reported by detection components in a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionErrorCode {
    #[default]
    NoDetectionError,
    DetectionNotInitialized,
    UnsupportedDataType,
    CouldNotOpenDatafile,
    CouldNotReadDatafile,
    FileWriteError,
    BadFrameSize,
    DetectionFailed,
    InvalidProperty,
    MissingProperty,
    MemoryAllocationFailed,
    GpuError,
    NetworkError,
    CouldNotReadMedia,
    RequestCancelled,
    OtherDetectionErrorType,
}

impl DetectionErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionErrorCode::NoDetectionError => "NO_DETECTION_ERROR",
            DetectionErrorCode::DetectionNotInitialized => "DETECTION_NOT_INITIALIZED",
            DetectionErrorCode::UnsupportedDataType => "UNSUPPORTED_DATA_TYPE",
            DetectionErrorCode::CouldNotOpenDatafile => "COULD_NOT_OPEN_DATAFILE",
            DetectionErrorCode::CouldNotReadDatafile => "COULD_NOT_READ_DATAFILE",
            DetectionErrorCode::FileWriteError => "FILE_WRITE_ERROR",
            DetectionErrorCode::BadFrameSize => "BAD_FRAME_SIZE",
            DetectionErrorCode::DetectionFailed => "DETECTION_FAILED",
            DetectionErrorCode::InvalidProperty => "INVALID_PROPERTY",
            DetectionErrorCode::MissingProperty => "MISSING_PROPERTY",
            DetectionErrorCode::MemoryAllocationFailed => "MEMORY_ALLOCATION_FAILED",
            DetectionErrorCode::GpuError => "GPU_ERROR",
            DetectionErrorCode::NetworkError => "NETWORK_ERROR",
            DetectionErrorCode::CouldNotReadMedia => "COULD_NOT_READ_MEDIA",
            DetectionErrorCode::RequestCancelled => "REQUEST_CANCELLED",
            DetectionErrorCode::OtherDetectionErrorType => "OTHER_DETECTION_ERROR_TYPE",
        }
    }

    pub fn is_error(&self) -> bool {
        *self != DetectionErrorCode::NoDetectionError
    }
}

impl fmt::Display for DetectionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_serialize_as_wire_names() {
        let json = serde_json::to_string(&DetectionErrorCode::RequestCancelled).unwrap();
        assert_eq!(json, "\"REQUEST_CANCELLED\"");
        let code: DetectionErrorCode = serde_json::from_str("\"BAD_FRAME_SIZE\"").unwrap();
        assert_eq!(code, DetectionErrorCode::BadFrameSize);
        assert_eq!(code.as_str(), "BAD_FRAME_SIZE");
    }

    #[test]
    fn issue_code_display_matches_serde() {
        let json = serde_json::to_string(&IssueCode::InvalidDetection).unwrap();
        assert_eq!(json, format!("\"{}\"", IssueCode::InvalidDetection));
    }
}
