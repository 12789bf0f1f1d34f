// ============================================================================
// detpipe-core/src/aggregation/mod.rs
// ============================================================================
//
// DETECTION AGGREGATION: Turning segment responses into job tracks
//
// Responses arrive one per segment, in any order and possibly more than once.
// Each new response is converted into tracks for its (media, task, action),
// filtered by the action's confidence threshold and stored. Failed segments
// become detection processing errors over the segment's range. Replayed
// responses are recognised by their segment identity and ignored.
//
// KEY COMPONENTS:
// - DetectionAggregator: handles one response at a time
// - response: the shape of a component's response
// - error_ranges: frame range summaries for error and warning messages

pub mod error_ranges;
mod response;

use log::{debug, trace, warn};
use serde::Serialize;

use crate::config::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::constants::{DetectionErrorCode, CONFIDENCE_THRESHOLD};
use crate::error::{CoreError, CoreResult};
use crate::model::{Action, Detection, DetectionProcessingError, JobDescriptor, Media, SegmentRange, Track};
use crate::properties::{PropertyLayers, PropertyStore};
use crate::store::JobStateStore;

pub use error_ranges::{format_frame_ranges, format_frames, merge_detection_errors, MergedIssue};
pub use response::{
    AudioTrackResult, DetectionResponse, GenericTrackResult, ImageLocationsResult, LocationResult, VideoTrackResult,
};

/// What happened to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AggregationOutcome {
    /// The segment had already been aggregated
    Duplicate,
    Aggregated {
        tracks_added: usize,
        detections_discarded: usize,
        error_recorded: bool,
    },
}

#[derive(Debug, Clone)]
pub struct DetectionAggregator {
    default_confidence_threshold: f64,
}

impl Default for DetectionAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl DetectionAggregator {
    /// Creates an aggregator using `default_confidence_threshold` when the
    /// threshold property cannot be parsed.
    pub fn new(default_confidence_threshold: f64) -> Self {
        Self {
            default_confidence_threshold,
        }
    }

    /// Aggregates one segment response into the job state.
    ///
    /// # Arguments
    ///
    /// * `job` - The job the segment belongs to
    /// * `property_store` - Source of the action's property layers
    /// * `state` - Job state receiving tracks, errors and timings
    /// * `response` - The component's response
    ///
    /// # Returns
    ///
    /// * `AggregationOutcome::Duplicate` when the segment was seen before
    /// * `AggregationOutcome::Aggregated` with counts otherwise
    pub fn on_response(
        &self,
        job: &JobDescriptor,
        property_store: &dyn PropertyStore,
        state: &dyn JobStateStore,
        response: &DetectionResponse,
    ) -> CoreResult<AggregationOutcome> {
        let id = response.segment;
        if id.job_id != job.id {
            return Err(CoreError::InvalidInput(format!(
                "Response for job {} handed to job {}",
                id.job_id, job.id
            )));
        }
        let media = job.media(id.media_id).ok_or(CoreError::UnknownMedia {
            job_id: job.id,
            media_id: id.media_id,
        })?;
        let action = job
            .tasks
            .get(id.task_index)
            .and_then(|task| task.actions.get(id.action_index))
            .ok_or_else(|| {
                CoreError::InvalidInput(format!(
                    "Job {} has no action {} in task {}",
                    job.id, id.action_index, id.task_index
                ))
            })?;

        if !state.mark_segment_processed(id)? {
            debug!("{id}: response already aggregated, ignoring the replay");
            return Ok(AggregationOutcome::Duplicate);
        }
        debug!("{id}: response received for {:?}. Action: '{}'.", response.range, response.action_name);

        let outcome = self.aggregate(job, media, action, property_store, state, response);
        if outcome.is_err() {
            // Leave the segment open for redelivery.
            state.clear_segment_processed(id)?;
        }
        outcome
    }

    fn aggregate(
        &self,
        job: &JobDescriptor,
        media: &Media,
        action: &Action,
        property_store: &dyn PropertyStore,
        state: &dyn JobStateStore,
        response: &DetectionResponse,
    ) -> CoreResult<AggregationOutcome> {
        let id = response.segment;

        let tracks = if response.has_results() {
            let layers = PropertyLayers::gather(property_store, job.id, media.id, action)?;
            let threshold = self.confidence_threshold(&layers);
            let (tracks, discarded) = build_tracks(job.id, media, response, threshold);
            trace!("{id}: built {} tracks, discarded {discarded} detections below {threshold}", tracks.len());
            Some((tracks, discarded))
        } else {
            None
        };

        // Tracks and errors land in sets, so a retry after a failure further
        // down rewrites them unchanged. Processing time is additive and goes last.
        let (tracks_added, detections_discarded) = match tracks {
            Some((tracks, discarded)) => {
                let added = tracks.len();
                for track in tracks {
                    state.add_track(track)?;
                }
                (added, discarded)
            }
            None => {
                debug!("{id}: no tracks were found");
                (0, 0)
            }
        };

        let error_recorded = response.error.is_error();
        if error_recorded {
            self.record_error(job.id, media, response, state)?;
        }

        self.record_processing_time(job.id, &action.name, response, state)?;

        Ok(AggregationOutcome::Aggregated {
            tracks_added,
            detections_discarded,
            error_recorded,
        })
    }

    fn confidence_threshold(&self, layers: &PropertyLayers) -> f64 {
        match layers.get_parsed::<f64>(CONFIDENCE_THRESHOLD) {
            Ok(Some(threshold)) => threshold,
            Ok(None) => self.default_confidence_threshold,
            Err(e) => {
                warn!("{e}. Value should be numeric, using {}.", self.default_confidence_threshold);
                self.default_confidence_threshold
            }
        }
    }

    fn record_processing_time(
        &self,
        job_id: i64,
        action_name: &str,
        response: &DetectionResponse,
        state: &dyn JobStateStore,
    ) -> CoreResult<()> {
        match response.processing_time_ms {
            Some(millis) if response.error != DetectionErrorCode::RequestCancelled => {
                state.add_processing_time(job_id, action_name, millis)?;
            }
            _ => state.report_missing_processing_time(job_id, action_name)?,
        }
        Ok(())
    }

    fn record_error(
        &self,
        job_id: i64,
        media: &Media,
        response: &DetectionResponse,
        state: &dyn JobStateStore,
    ) -> CoreResult<()> {
        let id = response.segment;
        let fps = media.fps();
        let ((start_frame, stop_frame), (start_time, stop_time)) = match response.range {
            SegmentRange::Frames { start, stop } => {
                ((start, stop), (frame_to_time(start, fps), frame_to_time(stop, fps)))
            }
            SegmentRange::Time { start, stop } => {
                // -1 marks the end of the medium in both systems
                let stop_frame = if stop < 0 { -1 } else { time_to_frame(stop, fps) };
                ((time_to_frame(start, fps), stop_frame), (start, stop))
            }
            SegmentRange::Whole => ((0, 0), (0, 0)),
        };

        if response.error == DetectionErrorCode::RequestCancelled {
            debug!("{id}: detection request was cancelled");
        } else {
            warn!(
                "{id}: encountered a detection error while processing [{start_frame}, {stop_frame}]: {} {}",
                response.error, response.error_message
            );
        }

        state.add_detection_processing_error(DetectionProcessingError {
            job_id,
            media_id: id.media_id,
            task_index: id.task_index,
            action_index: id.action_index,
            start_frame,
            stop_frame,
            start_time,
            stop_time,
            error_code: response.error.to_string(),
            error_message: response.error_message.clone(),
        })?;
        Ok(())
    }
}

/// Converts every result of a response into tracks, keeping detections with
/// a confidence of at least `threshold`.
///
/// Returns the non-empty tracks and the number of detections discarded.
pub fn build_tracks(job_id: i64, media: &Media, response: &DetectionResponse, threshold: f64) -> (Vec<Track>, usize) {
    let id = response.segment;
    let fps = media.fps();
    let keep = |confidence: f32| f64::from(confidence) >= threshold;
    let new_track = |detection_type: &str| Track::new(job_id, id.media_id, id.task_index, id.action_index, detection_type);

    let mut tracks = Vec::new();
    let mut discarded = 0;

    for result in &response.video_tracks {
        let mut track = new_track(&result.detection_type)
            .with_bounds(
                result.start_frame,
                result.stop_frame,
                frame_to_time(result.start_frame, fps),
                frame_to_time(result.stop_frame, fps),
            )
            .with_confidence(result.confidence)
            .with_properties(result.properties.clone());
        for (&frame, location) in &result.frame_locations {
            if keep(location.confidence) {
                track.add_detection(location.to_detection(frame, frame_to_time(frame, fps)));
            } else {
                discarded += 1;
            }
        }
        if !track.is_empty() {
            track.select_exemplar();
            tracks.push(track);
        }
    }

    for result in &response.audio_tracks {
        if !keep(result.confidence) {
            discarded += 1;
            continue;
        }
        let start_frame = time_to_frame(result.start_time, fps);
        let detection = Detection::new(
            0,
            0,
            0,
            0,
            result.confidence,
            start_frame,
            result.start_time,
            result.properties.clone(),
        );
        let mut track = new_track(&result.detection_type)
            .with_bounds(
                start_frame,
                time_to_frame(result.stop_time, fps),
                result.start_time,
                result.stop_time,
            )
            .with_confidence(result.confidence)
            .with_properties(result.properties.clone());
        track.add_detection(detection);
        track.select_exemplar();
        tracks.push(track);
    }

    for result in &response.image_locations {
        for location in &result.locations {
            if !keep(location.confidence) {
                discarded += 1;
                continue;
            }
            let track = new_track(&result.detection_type)
                .with_confidence(location.confidence)
                .with_detections([location.to_detection(0, 0)]);
            tracks.push(track);
        }
    }

    for result in &response.generic_tracks {
        if !keep(result.confidence) {
            discarded += 1;
            continue;
        }
        let detection = Detection::new(0, 0, 0, 0, result.confidence, -1, 0, result.properties.clone());
        let track = new_track(&result.detection_type)
            .with_confidence(result.confidence)
            .with_properties(result.properties.clone())
            .with_detections([detection]);
        tracks.push(track);
    }

    (tracks, discarded)
}

/// Milliseconds from the start of a video to `frame`, 0 when the frame rate
/// is unknown.
fn frame_to_time(frame: i32, fps: Option<f64>) -> i64 {
    fps.map_or(0, |fps| (f64::from(frame) * 1000.0 / fps).round() as i64)
}

fn time_to_frame(millis: i64, fps: Option<f64>) -> i32 {
    fps.map_or(0, |fps| (millis as f64 * fps / 1000.0).round() as i32)
}
