//! Engine configuration: the system layer of the property cascade.
//!
//! Every value here is the lowest-priority default for a property that
//! actions, jobs, algorithms and media may override. Defaults can be changed
//! through `DETPIPE_*` environment variables or a JSON configuration file.

mod builder;
pub mod utils;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::constants::*;
use crate::error::{CoreError, CoreResult};
use crate::geometry::PaddingSpec;
use utils::*;

pub use builder::EngineConfigBuilder;

// Default constants

/// Preferred number of frames per video segment.
pub const DEFAULT_TARGET_SEGMENT_LENGTH: i32 = 5000;

/// Shortest segment the planner produces, except for a lone short medium.
pub const DEFAULT_MIN_SEGMENT_LENGTH: i32 = 20;

/// Segment lengths for variable frame rate video, where seeking is costly.
pub const DEFAULT_VFR_TARGET_SEGMENT_LENGTH: i32 = 200;
pub const DEFAULT_VFR_MIN_SEGMENT_LENGTH: i32 = 20;

/// Frame ranges closer than this are planned as one range.
pub const DEFAULT_MIN_GAP_BETWEEN_SEGMENTS: i32 = 10;

pub const DEFAULT_SAMPLING_INTERVAL: i32 = 1;

/// Frame rate cap; -1 disables it.
pub const DEFAULT_FRAME_RATE_CAP: i32 = -1;

pub const DEFAULT_MIN_GAP_BETWEEN_TRACKS: i32 = 2;
pub const DEFAULT_MIN_TRACK_LENGTH: i32 = 1;

/// Intersection over union required between the touching detections of two
/// tracks before they merge.
pub const DEFAULT_TRACK_OVERLAP_THRESHOLD: f64 = 0.6;

/// Keeps every detection.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = -1.0;

/// Track types whose detections are never removed as ill-formed.
pub const DEFAULT_ILLFORMED_EXEMPT_TYPES: [&str; 1] = [SPEECH_TRACK_TYPE];

/// Segmenting defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentingConfig {
    pub target_segment_length: i32,
    pub min_segment_length: i32,
    pub vfr_target_segment_length: i32,
    pub vfr_min_segment_length: i32,
    pub min_gap_between_segments: i32,
    pub sampling_interval: i32,
    pub frame_rate_cap: i32,
}

/// Track merging defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackMergingConfig {
    pub merge_tracks: bool,
    pub min_gap_between_tracks: i32,
    pub min_track_length: i32,
    pub track_overlap_threshold: f64,
}

/// Aggregation and geometry defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub confidence_threshold: f64,
    pub padding_x: String,
    pub padding_y: String,
    pub illformed_exempt_types: Vec<String>,
}

impl Default for SegmentingConfig {
    fn default() -> Self {
        Self {
            target_segment_length: get_env_i32("DETPIPE_TARGET_SEGMENT_LENGTH", DEFAULT_TARGET_SEGMENT_LENGTH),
            min_segment_length: get_env_i32("DETPIPE_MIN_SEGMENT_LENGTH", DEFAULT_MIN_SEGMENT_LENGTH),
            vfr_target_segment_length: get_env_i32(
                "DETPIPE_VFR_TARGET_SEGMENT_LENGTH",
                DEFAULT_VFR_TARGET_SEGMENT_LENGTH,
            ),
            vfr_min_segment_length: get_env_i32("DETPIPE_VFR_MIN_SEGMENT_LENGTH", DEFAULT_VFR_MIN_SEGMENT_LENGTH),
            min_gap_between_segments: get_env_i32(
                "DETPIPE_MIN_GAP_BETWEEN_SEGMENTS",
                DEFAULT_MIN_GAP_BETWEEN_SEGMENTS,
            ),
            sampling_interval: get_env_i32("DETPIPE_SAMPLING_INTERVAL", DEFAULT_SAMPLING_INTERVAL),
            frame_rate_cap: get_env_i32("DETPIPE_FRAME_RATE_CAP", DEFAULT_FRAME_RATE_CAP),
        }
    }
}

impl Default for TrackMergingConfig {
    fn default() -> Self {
        Self {
            merge_tracks: get_env_bool("DETPIPE_MERGE_TRACKS", false),
            min_gap_between_tracks: get_env_i32("DETPIPE_MIN_GAP_BETWEEN_TRACKS", DEFAULT_MIN_GAP_BETWEEN_TRACKS),
            min_track_length: get_env_i32("DETPIPE_MIN_TRACK_LENGTH", DEFAULT_MIN_TRACK_LENGTH),
            track_overlap_threshold: get_env_f64(
                "DETPIPE_TRACK_OVERLAP_THRESHOLD",
                DEFAULT_TRACK_OVERLAP_THRESHOLD,
            ),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: get_env_f64("DETPIPE_CONFIDENCE_THRESHOLD", DEFAULT_CONFIDENCE_THRESHOLD),
            padding_x: get_env_string("DETPIPE_PADDING_X", "0"),
            padding_y: get_env_string("DETPIPE_PADDING_Y", "0"),
            illformed_exempt_types: get_env_list("DETPIPE_ILLFORMED_EXEMPT_TYPES", &DEFAULT_ILLFORMED_EXEMPT_TYPES),
        }
    }
}

/// Main configuration structure for the detpipe-core library.
///
/// # Examples
///
/// ```rust
/// use detpipe_core::config::EngineConfigBuilder;
///
/// let config = EngineConfigBuilder::new()
///     .target_segment_length(1000)
///     .merge_tracks(true)
///     .min_gap_between_tracks(4)
///     .build();
/// assert_eq!(config.system_properties()["TARGET_SEGMENT_LENGTH"], "1000");
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub segmenting: SegmentingConfig,
    pub track_merging: TrackMergingConfig,
    pub detection: DetectionConfig,
}

impl EngineConfig {
    /// Loads a configuration from a JSON file. Sections and fields missing from
    /// the file fall back to their defaults.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Rejects values that no property cascade could make sense of.
    pub fn validate(&self) -> CoreResult<()> {
        let seg = &self.segmenting;
        if seg.min_segment_length < 1 || seg.vfr_min_segment_length < 1 {
            return Err(CoreError::Config("minimum segment lengths must be at least 1".to_string()));
        }
        if seg.sampling_interval < 1 {
            return Err(CoreError::Config(format!(
                "sampling interval must be at least 1, got {}",
                seg.sampling_interval
            )));
        }
        if seg.min_gap_between_segments < 0 {
            return Err(CoreError::Config("minimum gap between segments must not be negative".to_string()));
        }
        let threshold = self.track_merging.track_overlap_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(CoreError::Config(format!(
                "track overlap threshold must be within [0, 1], got {threshold}"
            )));
        }
        PaddingSpec::for_property(DETECTION_PADDING_X, &self.detection.padding_x)?;
        PaddingSpec::for_property(DETECTION_PADDING_Y, &self.detection.padding_y)?;
        Ok(())
    }

    /// Renders the defaults as the system layer of the property cascade.
    pub fn system_properties(&self) -> BTreeMap<String, String> {
        let seg = &self.segmenting;
        let merging = &self.track_merging;
        let detection = &self.detection;
        [
            (TARGET_SEGMENT_LENGTH, seg.target_segment_length.to_string()),
            (MINIMUM_SEGMENT_LENGTH, seg.min_segment_length.to_string()),
            (VFR_TARGET_SEGMENT_LENGTH, seg.vfr_target_segment_length.to_string()),
            (VFR_MINIMUM_SEGMENT_LENGTH, seg.vfr_min_segment_length.to_string()),
            (MINIMUM_GAP_BETWEEN_SEGMENTS, seg.min_gap_between_segments.to_string()),
            (MEDIA_SAMPLING_INTERVAL, seg.sampling_interval.to_string()),
            (FRAME_RATE_CAP, seg.frame_rate_cap.to_string()),
            (MERGE_TRACKS, merging.merge_tracks.to_string()),
            (MIN_GAP_BETWEEN_TRACKS, merging.min_gap_between_tracks.to_string()),
            (MIN_TRACK_LENGTH, merging.min_track_length.to_string()),
            (CONFIDENCE_THRESHOLD, detection.confidence_threshold.to_string()),
            (DETECTION_PADDING_X, detection.padding_x.clone()),
            (DETECTION_PADDING_Y, detection.padding_y.clone()),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
    }

    /// Whether ill-formed detections of this track type are kept.
    pub fn is_exempt_from_illformed_removal(&self, track_type: &str) -> bool {
        self.detection
            .illformed_exempt_types
            .iter()
            .any(|exempt| exempt.eq_ignore_ascii_case(track_type))
    }
}
