// ============================================================================
// detpipe-core/src/segmenting/mod.rs
// ============================================================================
//
// SEGMENT PLANNING: Splitting media into detection work units
//
// For every medium of a job and every action of the current task, the planner
// resolves the action's properties, works out which frame or time ranges need
// detection and cuts them into segments of a manageable size.
//
// KEY COMPONENTS:
// - SegmentPlanner: plans one (media, action) pair or a whole task
// - SegmentingPlan: the numeric segmenting parameters of one medium
// - ranges: frame range combination and splitting
//
// The first detection task looks at whole media (or the frame boundaries
// supplied with the job). Later tasks only look where the previous task found
// something, either one segment per previous track (feed-forward) or the
// previous tracks' frame ranges combined and re-split.

pub mod ranges;

use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::config::SegmentingConfig;
use crate::constants::*;
use crate::error::CoreResult;
use crate::model::{
    Action, FrameRange, JobDescriptor, Media, MediaType, Segment, SegmentId, SegmentRange, Track,
};
use crate::properties::{PropertyError, PropertyLayers, PropertyStore};
use crate::store::JobStateStore;

pub use ranges::create_segments;

#[derive(Debug, Error)]
pub enum SegmentationError {
    #[error("The length of video media {media_id} is unknown")]
    UnknownVideoLength { media_id: i64 },

    #[error("Task {task_index} does not exist in job {job_id}")]
    UnknownTask { job_id: i64, task_index: usize },

    #[error(transparent)]
    Property(#[from] PropertyError),
}

pub type SegmentationResult<T> = std::result::Result<T, SegmentationError>;

/// Where in the job an action is being planned.
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    pub job_id: i64,
    pub task_index: usize,
    pub action_index: usize,
    pub action: &'a Action,
    pub is_first_detection_task: bool,
    /// Tracks of the previous task's first action for this medium
    pub previous_tracks: &'a BTreeSet<Track>,
    /// Frame ranges supplied with the job, used on the first detection task
    pub segment_frame_boundaries: &'a [FrameRange],
}

/// Numeric segmenting parameters resolved for one medium and action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentingPlan {
    pub target_segment_length: i32,
    pub min_segment_length: i32,
    pub frame_interval: i32,
    pub min_gap_between_segments: i32,
}

impl SegmentingPlan {
    /// Resolves the plan from the property layers.
    ///
    /// Segment lengths that fail to parse fall back to the system defaults
    /// with a warning. Variable frame rate media use the VFR lengths.
    pub fn resolve(layers: &PropertyLayers, media: &Media, defaults: &SegmentingConfig) -> SegmentationResult<Self> {
        let fps = media.fps().unwrap_or(1.0);
        let frame_interval = layers.frame_interval(fps)?;

        let min_gap_between_segments =
            int_property(layers, MINIMUM_GAP_BETWEEN_SEGMENTS, defaults.min_gap_between_segments);

        let (target_segment_length, min_segment_length) = if media.has_constant_frame_rate() {
            (
                int_property(layers, TARGET_SEGMENT_LENGTH, defaults.target_segment_length),
                int_property(layers, MINIMUM_SEGMENT_LENGTH, defaults.min_segment_length),
            )
        } else {
            (
                int_property(layers, VFR_TARGET_SEGMENT_LENGTH, defaults.vfr_target_segment_length),
                int_property(layers, VFR_MINIMUM_SEGMENT_LENGTH, defaults.vfr_min_segment_length),
            )
        };

        Ok(Self {
            target_segment_length,
            min_segment_length,
            frame_interval,
            min_gap_between_segments,
        })
    }
}

fn int_property(layers: &PropertyLayers, name: &str, default: i32) -> i32 {
    match layers.get_parsed::<i32>(name) {
        Ok(Some(value)) => value,
        Ok(None) => default,
        Err(e) => {
            warn!("{e}. Defaulting to '{default}'.");
            default
        }
    }
}

/// Whether a `FEED_FORWARD_TYPE` value turns feed-forward on.
///
/// Unknown types disable feed-forward with a warning.
pub fn feed_forward_enabled(properties: &BTreeMap<String, String>) -> bool {
    let feed_forward_type = properties
        .get(FEED_FORWARD_TYPE)
        .map(|value| value.trim().to_uppercase())
        .unwrap_or_else(|| "NONE".to_string());

    if !FEED_FORWARD_TYPES.contains(&feed_forward_type.as_str()) {
        warn!("Unknown feed forward type: {feed_forward_type}. Disabling feed forward.");
        return false;
    }
    feed_forward_type != "NONE"
}

/// Plans detection segments.
#[derive(Debug, Clone, Default)]
pub struct SegmentPlanner {
    defaults: SegmentingConfig,
}

impl SegmentPlanner {
    /// Creates a planner that falls back to `defaults` for unparsable
    /// segmenting properties.
    pub fn new(defaults: SegmentingConfig) -> Self {
        Self { defaults }
    }

    /// Plans the segments of one medium for one action.
    ///
    /// # Arguments
    ///
    /// * `media` - The medium to plan
    /// * `context` - Job position, action and previous tracks
    /// * `layers` - Property layers for this (job, media, action)
    ///
    /// # Returns
    ///
    /// * Segments in dispatch order, empty when the action does not apply
    ///   to the medium or there is nothing to look at
    /// * `SegmentationError::UnknownVideoLength` for video without a frame count
    pub fn plan(
        &self,
        media: &Media,
        context: &ActionContext<'_>,
        layers: &PropertyLayers,
    ) -> SegmentationResult<Vec<Segment>> {
        if !applies_to(media, layers) {
            debug!(
                "[Job {}|{}|{}] Action '{}' does not apply to media {}",
                context.job_id, context.task_index, context.action_index, context.action.name, media.id
            );
            return Ok(Vec::new());
        }

        let mut properties = layers.resolve_all();
        if context.is_first_detection_task {
            properties.remove(FEED_FORWARD_TYPE);
            properties.remove(FEED_FORWARD_TOP_CONFIDENCE_COUNT);
        }
        let feed_forward = !context.is_first_detection_task && feed_forward_enabled(&properties);
        let top_count = if feed_forward {
            int_property(layers, FEED_FORWARD_TOP_CONFIDENCE_COUNT, 0)
        } else {
            0
        };

        let ranges: Vec<(SegmentRange, Option<Track>)> = match media.media_type {
            MediaType::Video => {
                let length = media
                    .length
                    .ok_or(SegmentationError::UnknownVideoLength { media_id: media.id })?;
                let plan = SegmentingPlan::resolve(layers, media, &self.defaults)?;
                properties.insert(MEDIA_SAMPLING_INTERVAL.to_string(), plan.frame_interval.to_string());
                properties.remove(FRAME_RATE_CAP);
                debug!("Segmenting plan for media {}: {:?}", media.id, plan);
                self.video_ranges(media.id, length, &plan, context, feed_forward, top_count)
            }
            MediaType::Audio => whole_or_per_track(context, feed_forward, top_count, |track| {
                SegmentRange::Time {
                    start: track.map_or(0, |t| t.start_time),
                    stop: track.map_or(-1, |t| t.end_time),
                }
            }),
            MediaType::Image | MediaType::Unknown => {
                whole_or_per_track(context, feed_forward, top_count, |_| SegmentRange::Whole)
            }
        };

        let segments: Vec<Segment> = ranges
            .into_iter()
            .enumerate()
            .map(|(segment_index, (range, feed_forward_track))| Segment {
                id: SegmentId {
                    job_id: context.job_id,
                    media_id: media.id,
                    task_index: context.task_index,
                    action_index: context.action_index,
                    segment_index,
                },
                action_name: context.action.name.clone(),
                algorithm: context.action.algorithm.clone(),
                media_type: media.media_type,
                range,
                properties: properties.clone(),
                media_metadata: media.metadata.clone(),
                feed_forward_track,
            })
            .collect();

        debug!(
            "[Job {}|{}|{}] Created {} work units for media {}",
            context.job_id,
            context.task_index,
            context.action_index,
            segments.len(),
            media.id
        );
        Ok(segments)
    }

    fn video_ranges(
        &self,
        media_id: i64,
        length: i64,
        plan: &SegmentingPlan,
        context: &ActionContext<'_>,
        feed_forward: bool,
        top_count: i32,
    ) -> Vec<(SegmentRange, Option<Track>)> {
        if feed_forward {
            return context
                .previous_tracks
                .iter()
                .map(|track| {
                    let range = SegmentRange::Frames {
                        start: track.start_frame,
                        stop: track.end_frame,
                    };
                    (range, Some(feed_forward_track(track, top_count)))
                })
                .collect();
        }

        let inputs: Vec<FrameRange> = if context.is_first_detection_task {
            let last_frame = i32::try_from(length - 1).unwrap_or(i32::MAX);
            if last_frame < 0 {
                warn!("Media {media_id} has no frames; no segments were created");
                return Vec::new();
            }
            if context.segment_frame_boundaries.is_empty() {
                vec![FrameRange::new(0, last_frame)]
            } else {
                context
                    .segment_frame_boundaries
                    .iter()
                    .filter(|range| range.start <= last_frame && !range.is_empty())
                    .map(|range| FrameRange::new(range.start.max(0), range.end.min(last_frame)))
                    .collect()
            }
        } else {
            context
                .previous_tracks
                .iter()
                .map(|track| FrameRange::new(track.start_frame, track.end_frame))
                .collect()
        };

        create_segments(
            &inputs,
            plan.target_segment_length,
            plan.min_segment_length,
            plan.min_gap_between_segments,
        )
        .into_iter()
        .map(|range| {
            (
                SegmentRange::Frames {
                    start: range.start,
                    stop: range.end,
                },
                None,
            )
        })
        .collect()
    }

    /// Plans every medium and action of one task.
    ///
    /// Failed media are skipped. A planning error for one medium is recorded
    /// against that medium and planning continues with the next one.
    pub fn plan_task(
        &self,
        job: &JobDescriptor,
        task_index: usize,
        property_store: &dyn PropertyStore,
        state: &dyn JobStateStore,
    ) -> CoreResult<Vec<Segment>> {
        let task = job.tasks.get(task_index).ok_or(SegmentationError::UnknownTask {
            job_id: job.id,
            task_index,
        })?;
        let is_first_detection_task = job.is_first_detection_task(task_index);
        let mut segments = Vec::new();

        for media in &job.media {
            if media.failed {
                warn!("Skipping media {} - it is in an error state.", media.id);
                continue;
            }

            let previous_tracks = if is_first_detection_task || task_index == 0 {
                BTreeSet::new()
            } else {
                state.get_tracks(job.id, media.id, task_index - 1, 0)?
            };

            for (action_index, action) in task.actions.iter().enumerate() {
                let context = ActionContext {
                    job_id: job.id,
                    task_index,
                    action_index,
                    action,
                    is_first_detection_task,
                    previous_tracks: &previous_tracks,
                    segment_frame_boundaries: &job.segment_frame_boundaries,
                };
                let planned = PropertyLayers::gather(property_store, job.id, media.id, action)
                    .map_err(SegmentationError::from)
                    .and_then(|layers| self.plan(media, &context, &layers));

                match planned {
                    Ok(planned) => segments.extend(planned),
                    Err(e) => {
                        warn!("[Job {}|{}|{}] Media {}: {}", job.id, task_index, action_index, media.id, e);
                        state.add_error(job.id, media.id, IssueCode::Other, &e.to_string())?;
                        break;
                    }
                }
            }
        }

        info!(
            "[Job {}|{}] Planned {} segments for task '{}'",
            job.id,
            task_index,
            segments.len(),
            task.name
        );
        Ok(segments)
    }
}

/// Applies the `SOURCE_MEDIA_ONLY` and `DERIVATIVE_MEDIA_ONLY` restrictions.
fn applies_to(media: &Media, layers: &PropertyLayers) -> bool {
    if media.is_derivative() {
        !layers.get_bool(SOURCE_MEDIA_ONLY)
    } else {
        !layers.get_bool(DERIVATIVE_MEDIA_ONLY)
    }
}

fn whole_or_per_track<F>(
    context: &ActionContext<'_>,
    feed_forward: bool,
    top_count: i32,
    range_for: F,
) -> Vec<(SegmentRange, Option<Track>)>
where
    F: Fn(Option<&Track>) -> SegmentRange,
{
    if context.is_first_detection_task {
        vec![(range_for(None), None)]
    } else if feed_forward {
        context
            .previous_tracks
            .iter()
            .map(|track| (range_for(Some(track)), Some(feed_forward_track(track, top_count))))
            .collect()
    } else if context.previous_tracks.is_empty() {
        Vec::new()
    } else {
        vec![(range_for(None), None)]
    }
}

/// Copy of a track to feed forward, keeping only the `top_count` most
/// confident detections when `top_count` is positive.
fn feed_forward_track(track: &Track, top_count: i32) -> Track {
    let Ok(top_count) = usize::try_from(top_count) else {
        return track.clone();
    };
    if top_count == 0 || track.detections.len() <= top_count {
        return track.clone();
    }

    let mut ranked: Vec<_> = track.detections.iter().collect();
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let kept: BTreeSet<_> = ranked.into_iter().take(top_count).cloned().collect();

    let mut reduced = track.clone();
    reduced.detections = kept;
    reduced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Detection;
    use crate::properties::Layer;

    fn video(length: i64) -> Media {
        Media::new(3, MediaType::Video)
            .with_length(length)
            .with_metadata(META_FPS, "30")
            .with_metadata(META_HAS_CONSTANT_FRAME_RATE, "true")
    }

    fn layers() -> PropertyLayers {
        PropertyLayers::new(
            crate::config::EngineConfig::default().system_properties(),
            BTreeMap::new(),
            BTreeMap::new(),
            BTreeMap::new(),
            BTreeMap::new(),
        )
    }

    fn context<'a>(action: &'a Action, previous: &'a BTreeSet<Track>, first: bool) -> ActionContext<'a> {
        ActionContext {
            job_id: 1,
            task_index: if first { 0 } else { 1 },
            action_index: 0,
            action,
            is_first_detection_task: first,
            previous_tracks: previous,
            segment_frame_boundaries: &[],
        }
    }

    fn track(start: i32, end: i32) -> Track {
        let detections = [start, end]
            .into_iter()
            .map(|frame| Detection::new(0, 0, 5, 5, 0.5, frame, 0, BTreeMap::new()));
        Track::new(1, 3, 0, 0, "FACE").with_detections(detections)
    }

    #[test]
    fn first_task_splits_whole_video() {
        let action = Action::new("A", "FACECV");
        let none = BTreeSet::new();
        let layers = layers()
            .with(Layer::Action, TARGET_SEGMENT_LENGTH, "100")
            .with(Layer::Action, MINIMUM_SEGMENT_LENGTH, "20");
        let segments = SegmentPlanner::default()
            .plan(&video(250), &context(&action, &none, true), &layers)
            .unwrap();
        let frames: Vec<_> = segments.iter().map(|s| s.range.frames()).collect();
        assert_eq!(frames, vec![(0, 99), (100, 199), (200, 249)]);
        assert_eq!(segments[2].id.segment_index, 2);
    }

    #[test]
    fn sampling_interval_is_carried_in_properties() {
        let action = Action::new("A", "FACECV");
        let none = BTreeSet::new();
        let layers = layers()
            .with(Layer::System, MEDIA_SAMPLING_INTERVAL, "7")
            .with(Layer::System, FRAME_RATE_CAP, "5");
        let segments = SegmentPlanner::default()
            .plan(&video(10), &context(&action, &none, true), &layers)
            .unwrap();
        assert_eq!(segments[0].properties[MEDIA_SAMPLING_INTERVAL], "6");
        assert!(!segments[0].properties.contains_key(FRAME_RATE_CAP));
    }

    #[test]
    fn unknown_video_length_is_an_error() {
        let action = Action::new("A", "FACECV");
        let none = BTreeSet::new();
        let media = Media::new(3, MediaType::Video);
        let result = SegmentPlanner::default().plan(&media, &context(&action, &none, true), &layers());
        assert!(matches!(result, Err(SegmentationError::UnknownVideoLength { media_id: 3 })));
    }

    #[test]
    fn variable_frame_rate_uses_vfr_lengths() {
        let action = Action::new("A", "FACECV");
        let none = BTreeSet::new();
        let media = Media::new(3, MediaType::Video).with_length(500);
        let segments = SegmentPlanner::default()
            .plan(&media, &context(&action, &none, true), &layers())
            .unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].range.frames(), (0, 199));
    }

    #[test]
    fn later_task_uses_previous_tracks() {
        let action = Action::new("A", "FACECV");
        let previous: BTreeSet<_> = [track(0, 10), track(15, 30), track(100, 120)].into_iter().collect();
        let segments = SegmentPlanner::default()
            .plan(&video(1000), &context(&action, &previous, false), &layers())
            .unwrap();
        let frames: Vec<_> = segments.iter().map(|s| s.range.frames()).collect();
        assert_eq!(frames, vec![(0, 30), (100, 120)]);
    }

    #[test]
    fn feed_forward_creates_one_segment_per_track() {
        let action = Action::new("A", "FACECV").with_property(FEED_FORWARD_TYPE, "region");
        let previous: BTreeSet<_> = [track(0, 10), track(15, 30)].into_iter().collect();
        let layers = layers().with(Layer::Action, FEED_FORWARD_TYPE, "region");
        let segments = SegmentPlanner::default()
            .plan(&video(1000), &context(&action, &previous, false), &layers)
            .unwrap();
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.feed_forward_track.is_some()));
        assert_eq!(segments[1].range.frames(), (15, 30));
    }

    #[test]
    fn unknown_feed_forward_type_is_disabled() {
        let mut properties = BTreeMap::new();
        properties.insert(FEED_FORWARD_TYPE.to_string(), "SIDEWAYS".to_string());
        assert!(!feed_forward_enabled(&properties));
        properties.insert(FEED_FORWARD_TYPE.to_string(), "frame".to_string());
        assert!(feed_forward_enabled(&properties));
    }

    #[test]
    fn first_task_strips_feed_forward_properties() {
        let action = Action::new("A", "FACECV");
        let none = BTreeSet::new();
        let layers = layers()
            .with(Layer::Job, FEED_FORWARD_TYPE, "FRAME")
            .with(Layer::Job, FEED_FORWARD_TOP_CONFIDENCE_COUNT, "2");
        let segments = SegmentPlanner::default()
            .plan(&video(10), &context(&action, &none, true), &layers)
            .unwrap();
        assert!(!segments[0].properties.contains_key(FEED_FORWARD_TYPE));
        assert!(!segments[0].properties.contains_key(FEED_FORWARD_TOP_CONFIDENCE_COUNT));
    }

    #[test]
    fn derivative_media_restrictions() {
        let action = Action::new("A", "OCR");
        let none = BTreeSet::new();
        let parent = Media::new(1, MediaType::Image);
        let mut child = Media::new(2, MediaType::Image);
        child.parent_id = Some(1);

        let planner = SegmentPlanner::default();
        let source_only = layers().with(Layer::Action, SOURCE_MEDIA_ONLY, "TRUE");
        assert_eq!(planner.plan(&parent, &context(&action, &none, true), &source_only).unwrap().len(), 1);
        assert!(planner.plan(&child, &context(&action, &none, true), &source_only).unwrap().is_empty());

        let derivative_only = layers().with(Layer::Action, DERIVATIVE_MEDIA_ONLY, "true");
        assert!(planner.plan(&parent, &context(&action, &none, true), &derivative_only).unwrap().is_empty());
        assert_eq!(planner.plan(&child, &context(&action, &none, true), &derivative_only).unwrap().len(), 1);

        assert_eq!(planner.plan(&child, &context(&action, &none, true), &layers()).unwrap().len(), 1);
    }

    #[test]
    fn audio_first_task_covers_whole_medium() {
        let action = Action::new("A", "SPHINX");
        let none = BTreeSet::new();
        let media = Media::new(4, MediaType::Audio);
        let segments = SegmentPlanner::default()
            .plan(&media, &context(&action, &none, true), &layers())
            .unwrap();
        assert_eq!(segments[0].range, SegmentRange::Time { start: 0, stop: -1 });
    }

    #[test]
    fn feed_forward_top_confidence_count() {
        let detections = (0..5).map(|i| Detection::new(0, 0, 5, 5, i as f32 / 10.0, i, 0, BTreeMap::new()));
        let track = Track::new(1, 3, 0, 0, "FACE").with_detections(detections);
        let reduced = feed_forward_track(&track, 2);
        let frames: Vec<_> = reduced.detections.iter().map(|d| d.media_offset_frame).collect();
        assert_eq!(frames, vec![3, 4]);
        assert_eq!(feed_forward_track(&track, 0).detections.len(), 5);
    }
}
