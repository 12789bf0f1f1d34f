// ============================================================================
// detpipe-core/src/geometry/processor.rs
// ============================================================================
//
// GEOMETRY STAGE: Cleaning up and padding the tracks of a task
//
// Runs after every response of a task has been aggregated. For each image or
// video medium and each action, ill-formed detections are dropped first and
// the survivors are then padded when the action asks for padding. Each kind
// of problem found is reported once per medium as a job warning listing the
// affected frames.

use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::ops::AddAssign;

use super::{ill_formed_cause, pad, IllFormedCause, PaddingSpec};
use crate::aggregation::error_ranges::format_frames;
use crate::config::{DetectionConfig, DEFAULT_ILLFORMED_EXEMPT_TYPES};
use crate::constants::{IssueCode, DETECTION_PADDING_X, DETECTION_PADDING_Y};
use crate::error::CoreResult;
use crate::model::{Detection, JobDescriptor, Media, MediaType, Track};
use crate::properties::{PropertyLayers, PropertyStore};
use crate::store::JobStateStore;

/// Counts of what the geometry stage changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransformSummary {
    pub removed_detections: usize,
    pub dropped_tracks: usize,
    pub padded_tracks: usize,
    pub shrunk_detections: usize,
}

impl AddAssign for TransformSummary {
    fn add_assign(&mut self, other: Self) {
        self.removed_detections += other.removed_detections;
        self.dropped_tracks += other.dropped_tracks;
        self.padded_tracks += other.padded_tracks;
        self.shrunk_detections += other.shrunk_detections;
    }
}

/// Result of removing ill-formed detections from a set of tracks.
#[derive(Debug, Clone, Default)]
pub struct IllFormedRemoval {
    pub tracks: BTreeSet<Track>,
    pub removed_detections: usize,
    pub dropped_tracks: usize,
    pub zero_size_frames: Vec<i32>,
    pub outside_frame_frames: Vec<i32>,
}

impl IllFormedRemoval {
    pub fn changed(&self) -> bool {
        self.removed_detections > 0
    }
}

#[derive(Debug, Clone)]
pub struct GeometryTransformer {
    illformed_exempt_types: Vec<String>,
}

impl Default for GeometryTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_ILLFORMED_EXEMPT_TYPES.iter().map(|t| t.to_string()).collect())
    }
}

impl GeometryTransformer {
    pub fn new(illformed_exempt_types: Vec<String>) -> Self {
        Self { illformed_exempt_types }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.illformed_exempt_types.clone())
    }

    pub fn is_exempt(&self, track_type: &str) -> bool {
        self.illformed_exempt_types
            .iter()
            .any(|exempt| exempt.eq_ignore_ascii_case(track_type))
    }

    /// Drops ill-formed detections from tracks whose type is not exempt.
    ///
    /// Bounds are recomputed for tracks that lost detections and tracks left
    /// empty are dropped. The exemption is checked against each track's own
    /// type rather than one type for the whole set, since the tracks of one
    /// action may mix types (e.g. `FACE` and `SPEECH`).
    pub fn remove_ill_formed_detections(
        &self,
        frame_width: i32,
        frame_height: i32,
        tracks: BTreeSet<Track>,
    ) -> IllFormedRemoval {
        let mut removal = IllFormedRemoval::default();

        for mut track in tracks {
            if self.is_exempt(&track.track_type) {
                removal.tracks.insert(track);
                continue;
            }

            let removed = track.retain_detections(|detection| {
                match ill_formed_cause(detection, frame_width, frame_height) {
                    None => true,
                    Some(IllFormedCause::ZeroSize) => {
                        removal.zero_size_frames.push(detection.media_offset_frame);
                        false
                    }
                    Some(IllFormedCause::OutsideFrame) => {
                        removal.outside_frame_frames.push(detection.media_offset_frame);
                        false
                    }
                }
            });
            removal.removed_detections += removed;

            if track.is_empty() {
                warn!(
                    "[Job {}|{}|{}] Dropping {} track [{}, {}] of media {}: every detection was ill-formed",
                    track.job_id,
                    track.task_index,
                    track.action_index,
                    track.track_type,
                    track.start_frame,
                    track.end_frame,
                    track.media_id
                );
                removal.dropped_tracks += 1;
            } else {
                removal.tracks.insert(track);
            }
        }
        removal
    }

    /// Pads every detection and exemplar of the tracks.
    ///
    /// Returns the padded tracks and the frames of detections that were
    /// shrunk to nothing. Track bounds are left as they are.
    pub fn pad_tracks(
        &self,
        x_padding: &PaddingSpec,
        y_padding: &PaddingSpec,
        frame_width: i32,
        frame_height: i32,
        tracks: BTreeSet<Track>,
    ) -> (BTreeSet<Track>, Vec<i32>) {
        let mut shrunk_frames = Vec::new();
        let pad_one = |detection: &Detection| pad(x_padding, y_padding, frame_width, frame_height, detection);

        let padded = tracks
            .into_iter()
            .map(|mut track| {
                let detections: BTreeSet<Detection> = track.detections.iter().map(pad_one).collect();
                shrunk_frames.extend(
                    detections
                        .iter()
                        .filter(|d| d.is_shrunk_to_nothing())
                        .map(|d| d.media_offset_frame),
                );
                track.detections = detections;
                track.exemplar = track.exemplar.as_ref().map(pad_one);
                track
            })
            .collect();
        (padded, shrunk_frames)
    }

    /// Removes ill-formed detections and applies padding for every action of
    /// one task on one medium.
    ///
    /// Only non-failed image and video media with a known frame size are
    /// processed. Job state is rewritten only for actions whose tracks
    /// changed.
    pub fn transform_media(
        &self,
        job: &JobDescriptor,
        media: &Media,
        task_index: usize,
        property_store: &dyn PropertyStore,
        state: &dyn JobStateStore,
    ) -> CoreResult<TransformSummary> {
        let mut summary = TransformSummary::default();
        if media.failed || !matches!(media.media_type, MediaType::Image | MediaType::Video) {
            return Ok(summary);
        }
        let Some((frame_width, frame_height)) = media.frame_size() else {
            warn!(
                "[Job {}|{}] Media {} has no frame size, skipping detection geometry checks",
                job.id, task_index, media.id
            );
            return Ok(summary);
        };
        let Some(task) = job.tasks.get(task_index) else {
            return Ok(summary);
        };

        for (action_index, action) in task.actions.iter().enumerate() {
            let tracks = state.get_tracks(job.id, media.id, task_index, action_index)?;
            if tracks.is_empty() {
                continue;
            }

            let removal = self.remove_ill_formed_detections(frame_width, frame_height, tracks);
            if let Some(frames) = format_frames(removal.zero_size_frames.iter().copied()) {
                let message = format!(
                    "Dropped one or more ill-formed detection regions with width or height equal to 0. {frames}"
                );
                state.add_warning(job.id, media.id, IssueCode::InvalidDetection, &message)?;
            }
            if let Some(frames) = format_frames(removal.outside_frame_frames.iter().copied()) {
                let message = format!(
                    "Dropped one or more ill-formed detection regions with bounding box completely outside frame. {frames}"
                );
                state.add_warning(job.id, media.id, IssueCode::InvalidDetection, &message)?;
            }
            summary.removed_detections += removal.removed_detections;
            summary.dropped_tracks += removal.dropped_tracks;
            let changed = removal.changed();
            let tracks = removal.tracks;
            if changed {
                state.set_tracks(job.id, media.id, task_index, action_index, tracks.clone())?;
            }

            let layers = PropertyLayers::gather(property_store, job.id, media.id, action)?;
            let x_padding =
                PaddingSpec::for_property(DETECTION_PADDING_X, layers.get(DETECTION_PADDING_X).unwrap_or("0"))?;
            let y_padding =
                PaddingSpec::for_property(DETECTION_PADDING_Y, layers.get(DETECTION_PADDING_Y).unwrap_or("0"))?;

            if x_padding.is_zero() && y_padding.is_zero() {
                continue;
            }

            debug!(
                "[Job {}|{}|{}] Padding {} tracks of media {} by ({}, {})",
                job.id,
                task_index,
                action_index,
                tracks.len(),
                media.id,
                x_padding,
                y_padding
            );
            summary.padded_tracks += tracks.len();
            let (padded, shrunk_frames) =
                self.pad_tracks(&x_padding, &y_padding, frame_width, frame_height, tracks);
            summary.shrunk_detections += shrunk_frames.len();
            if let Some(frames) = format_frames(shrunk_frames) {
                let message = format!(
                    "Shrunk one or more detection regions to nothing. 1-pixel detection regions used instead. {frames}"
                );
                state.add_warning(job.id, media.id, IssueCode::Padding, &message)?;
            }
            state.set_tracks(job.id, media.id, task_index, action_index, padded)?;
        }

        if summary != TransformSummary::default() {
            info!(
                "[Job {}|{}] Media {}: removed {} ill-formed detections, padded {} tracks",
                job.id, task_index, media.id, summary.removed_detections, summary.padded_tracks
            );
        }
        Ok(summary)
    }

    /// Runs [`GeometryTransformer::transform_media`] over every medium of the task.
    pub fn transform_task(
        &self,
        job: &JobDescriptor,
        task_index: usize,
        property_store: &dyn PropertyStore,
        state: &dyn JobStateStore,
    ) -> CoreResult<TransformSummary> {
        let mut summary = TransformSummary::default();
        for media in &job.media {
            summary += self.transform_media(job, media, task_index, property_store, state)?;
        }
        Ok(summary)
    }
}
