// ============================================================================
// detpipe-core/src/merging/mod.rs
// ============================================================================
//
// TRACK MERGING: Joining fragments of the same object and pruning short tracks
//
// Detectors work segment by segment, so one object seen across a segment
// boundary comes back as several tracks. When merging is enabled for an
// action, tracks separated by a small enough gap whose touching detections
// overlap are joined. Tracks shorter than the minimum length are then
// removed whether or not merging ran.
//
// KEY COMPONENTS:
// - TrackMergingPlan: merging parameters resolved for one medium and action
// - TrackMerger: the merge and prune passes
// - spatial: the pluggable spatial compatibility check

pub mod spatial;

use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::TrackMergingConfig;
use crate::constants::{MERGE_TRACKS, MIN_GAP_BETWEEN_TRACKS, MIN_TRACK_LENGTH};
use crate::error::CoreResult;
use crate::model::{JobDescriptor, Media, Track};
use crate::properties::{PropertyLayers, PropertyResult, PropertyStore};
use crate::store::JobStateStore;

pub use spatial::{intersection_over_union, IouPredicate, SpatialPredicate};

/// Merging parameters for one medium and action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackMergingPlan {
    pub sampling_interval: i32,
    pub min_track_length: i32,
    pub merge_tracks: bool,
    pub min_gap_between_tracks: i32,
}

impl TrackMergingPlan {
    /// The plan used when any merging property is unusable: no merging and
    /// no length filtering.
    pub const DISABLED: TrackMergingPlan = TrackMergingPlan {
        sampling_interval: 1,
        min_track_length: 1,
        merge_tracks: false,
        min_gap_between_tracks: 1,
    };

    /// Resolves the plan from the property layers of one medium and action.
    ///
    /// Any property that fails to parse disables both merging and length
    /// filtering with a warning.
    pub fn resolve(layers: &PropertyLayers, media: &Media, defaults: &TrackMergingConfig) -> Self {
        match Self::try_resolve(layers, media, defaults) {
            Ok(plan) => plan,
            Err(e) => {
                warn!("{e}. Disabling track merging and minimum track length for media {}.", media.id);
                Self::DISABLED
            }
        }
    }

    fn try_resolve(layers: &PropertyLayers, media: &Media, defaults: &TrackMergingConfig) -> PropertyResult<Self> {
        let sampling_interval = layers.frame_interval(media.fps().unwrap_or(1.0))?;
        let min_track_length = layers.get_parsed::<i32>(MIN_TRACK_LENGTH)?.unwrap_or(defaults.min_track_length);
        let min_gap_between_tracks = layers
            .get_parsed::<i32>(MIN_GAP_BETWEEN_TRACKS)?
            .unwrap_or(defaults.min_gap_between_tracks);
        let merge_tracks = match layers.get(MERGE_TRACKS) {
            Some(_) => layers.get_bool(MERGE_TRACKS),
            None => defaults.merge_tracks,
        };

        Ok(Self {
            sampling_interval,
            min_track_length,
            merge_tracks,
            min_gap_between_tracks,
        })
    }
}

/// What the merger did to the tracks of one medium.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub tracks_before: usize,
    pub tracks_after: usize,
}

#[derive(Debug, Clone)]
pub struct TrackMerger<P = IouPredicate> {
    defaults: TrackMergingConfig,
    predicate: P,
}

impl Default for TrackMerger<IouPredicate> {
    fn default() -> Self {
        Self::from_config(TrackMergingConfig::default())
    }
}

impl TrackMerger<IouPredicate> {
    /// A merger comparing tracks by intersection over union with the
    /// configured threshold.
    pub fn from_config(defaults: TrackMergingConfig) -> Self {
        let predicate = IouPredicate::new(defaults.track_overlap_threshold);
        Self::new(defaults, predicate)
    }
}

impl<P: SpatialPredicate> TrackMerger<P> {
    pub fn new(defaults: TrackMergingConfig, predicate: P) -> Self {
        Self { defaults, predicate }
    }

    /// Merges adjacent compatible tracks and drops short ones.
    ///
    /// # Arguments
    ///
    /// * `tracks` - Tracks of one medium, task and action
    /// * `min_gap_between_tracks` - Largest frame gap between tracks that may merge
    /// * `merge_enabled` - Whether to merge at all
    /// * `min_track_length` - Tracks spanning fewer frames are removed
    ///
    /// # Returns
    ///
    /// * The remaining tracks
    pub fn merge(
        &self,
        tracks: BTreeSet<Track>,
        min_gap_between_tracks: i32,
        merge_enabled: bool,
        min_track_length: i32,
    ) -> BTreeSet<Track> {
        let tracks = if merge_enabled {
            self.combine(tracks, min_gap_between_tracks)
        } else {
            tracks
        };

        if min_track_length <= 1 {
            return tracks;
        }
        tracks
            .into_iter()
            .filter(|track| track.frame_span() >= i64::from(min_track_length))
            .collect()
    }

    /// Repeatedly joins the earliest track with the first later track it may
    /// merge with, until no more merges are possible.
    fn combine(&self, tracks: BTreeSet<Track>, min_gap: i32) -> BTreeSet<Track> {
        let mut pending: Vec<Track> = tracks.into_iter().collect();
        let mut done = BTreeSet::new();

        while !pending.is_empty() {
            let current = pending.remove(0);
            let candidate = pending.iter().position(|candidate| {
                current.end_frame < candidate.start_frame
                    && i64::from(candidate.start_frame) - i64::from(current.end_frame) <= i64::from(min_gap)
                    && self.predicate.compatible(&current, candidate)
            });

            match candidate {
                Some(index) => {
                    let later = pending.remove(index);
                    pending.insert(0, merge_pair(&current, &later));
                }
                None => {
                    done.insert(current);
                }
            }
        }
        done
    }

    /// Merges and prunes the tracks of every action of one task on one
    /// medium, as configured by each action's properties.
    pub fn merge_media(
        &self,
        job: &JobDescriptor,
        media: &Media,
        task_index: usize,
        property_store: &dyn PropertyStore,
        state: &dyn JobStateStore,
    ) -> CoreResult<MergeSummary> {
        let mut summary = MergeSummary::default();
        let Some(task) = job.tasks.get(task_index) else {
            return Ok(summary);
        };
        if media.failed {
            debug!(
                "[Job {}|{}] Media {} is in an error state and is not a candidate for merging.",
                job.id, task_index, media.id
            );
            return Ok(summary);
        }

        for (action_index, action) in task.actions.iter().enumerate() {
            let layers = PropertyLayers::gather(property_store, job.id, media.id, action)?;
            let plan = TrackMergingPlan::resolve(&layers, media, &self.defaults);
            let tracks = state.get_tracks(job.id, media.id, task_index, action_index)?;
            let before = tracks.len();
            summary.tracks_before += before;

            if !plan.merge_tracks && plan.min_track_length <= 1 {
                debug!(
                    "[Job {}|{}|{}] Neither track merging nor minimum track length requested for media {}.",
                    job.id, task_index, action_index, media.id
                );
                summary.tracks_after += before;
                continue;
            }

            let merged = self.merge(
                tracks,
                plan.min_gap_between_tracks,
                plan.merge_tracks,
                plan.min_track_length,
            );
            debug!(
                "[Job {}|{}|{}] Reduced {} tracks to {} in media {}.",
                job.id,
                task_index,
                action_index,
                before,
                merged.len(),
                media.id
            );
            summary.tracks_after += merged.len();
            state.set_tracks(job.id, media.id, task_index, action_index, merged)?;
        }
        Ok(summary)
    }
}

/// Joins two tracks, `earlier` ending before `later` starts.
///
/// The result spans both, keeps the higher confidence and combines the
/// track properties. Values that differ are joined as `"<earlier>; <later>"`.
pub fn merge_pair(earlier: &Track, later: &Track) -> Track {
    let mut merged = Track::new(
        earlier.job_id,
        earlier.media_id,
        earlier.task_index,
        earlier.action_index,
        earlier.track_type.clone(),
    )
    .with_bounds(earlier.start_frame, later.end_frame, earlier.start_time, later.end_time)
    .with_confidence(earlier.confidence.max(later.confidence))
    .with_properties(merge_properties(&earlier.track_properties, &later.track_properties));

    merged.detections = earlier.detections.union(&later.detections).cloned().collect();
    merged.select_exemplar();
    merged
}

fn merge_properties(earlier: &BTreeMap<String, String>, later: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut merged = earlier.clone();
    for (key, value) in later {
        merged
            .entry(key.clone())
            .and_modify(|existing| {
                if existing != value {
                    *existing = format!("{existing}; {value}");
                }
            })
            .or_insert_with(|| value.clone());
    }
    merged
}
