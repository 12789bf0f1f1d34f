//! Tracks: ordered detections believed to depict one object instance.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use super::detection::Detection;

/// An ordered sequence of detections of one object within a medium.
///
/// Start and end offsets are inclusive and always bound every contained
/// detection. Methods that add or remove detections keep that invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub job_id: i64,
    pub media_id: i64,
    pub task_index: usize,
    pub action_index: usize,
    pub start_frame: i32,
    pub end_frame: i32,
    pub start_time: i64,
    pub end_time: i64,
    pub track_type: String,
    /// Track-level confidence, independent of the detection confidences
    pub confidence: f32,
    #[serde(default)]
    pub detections: BTreeSet<Detection>,
    #[serde(default)]
    pub track_properties: BTreeMap<String, String>,
    #[serde(default)]
    pub exemplar: Option<Detection>,
}

impl Track {
    /// Creates an empty track with zeroed bounds.
    pub fn new(
        job_id: i64,
        media_id: i64,
        task_index: usize,
        action_index: usize,
        track_type: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            media_id,
            task_index,
            action_index,
            start_frame: 0,
            end_frame: 0,
            start_time: 0,
            end_time: 0,
            track_type: track_type.into(),
            confidence: -1.0,
            detections: BTreeSet::new(),
            track_properties: BTreeMap::new(),
            exemplar: None,
        }
    }

    /// Sets the reported bounds of the track.
    pub fn with_bounds(mut self, start_frame: i32, end_frame: i32, start_time: i64, end_time: i64) -> Self {
        self.start_frame = start_frame;
        self.end_frame = end_frame;
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.track_properties = properties;
        self
    }

    /// Adds every detection, selects the exemplar and fits the bounds to the
    /// detections.
    pub fn with_detections(mut self, detections: impl IntoIterator<Item = Detection>) -> Self {
        self.detections.extend(detections);
        self.recompute_bounds();
        self.select_exemplar();
        self
    }

    /// Inserts a detection, widening the bounds when it falls outside them.
    ///
    /// The bounds must already be meaningful (see [`Track::with_bounds`]);
    /// use [`Track::with_detections`] to derive them from the detections.
    pub fn add_detection(&mut self, detection: Detection) {
        self.start_frame = self.start_frame.min(detection.media_offset_frame);
        self.end_frame = self.end_frame.max(detection.media_offset_frame);
        self.start_time = self.start_time.min(detection.media_offset_time);
        self.end_time = self.end_time.max(detection.media_offset_time);
        self.detections.insert(detection);
    }

    /// Keeps the detections matching `keep` and returns how many were removed.
    ///
    /// Bounds are recomputed from the survivors when anything was removed.
    pub fn retain_detections<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&Detection) -> bool,
    {
        let before = self.detections.len();
        self.detections.retain(keep);
        let removed = before - self.detections.len();
        if removed > 0 {
            self.recompute_bounds();
            if let Some(exemplar) = &self.exemplar {
                if !self.detections.contains(exemplar) {
                    self.select_exemplar();
                }
            }
        }
        removed
    }

    /// Replaces all detections, keeping the bounds consistent.
    pub fn replace_detections(&mut self, detections: BTreeSet<Detection>) {
        self.detections = detections;
        self.recompute_bounds();
    }

    /// Sets the bounds from the first and last detection.
    pub fn recompute_bounds(&mut self) {
        if let (Some(first), Some(last)) = (self.detections.first(), self.detections.last()) {
            self.start_frame = first.media_offset_frame;
            self.end_frame = last.media_offset_frame;
            self.start_time = first.media_offset_time;
            self.end_time = last.media_offset_time;
        }
    }

    /// Picks the highest-confidence detection as exemplar, the earliest on ties.
    pub fn select_exemplar(&mut self) {
        let mut best: Option<&Detection> = None;
        for detection in &self.detections {
            if best.is_none_or(|current| detection.confidence > current.confidence) {
                best = Some(detection);
            }
        }
        self.exemplar = best.cloned();
    }

    /// Number of frames covered, counting both inclusive ends.
    pub fn frame_span(&self) -> i64 {
        i64::from(self.end_frame) - i64::from(self.start_frame) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    fn order_key(&self) -> (i64, i64, usize, usize, i32, i64, i32, i64) {
        (
            self.job_id,
            self.media_id,
            self.task_index,
            self.action_index,
            self.start_frame,
            self.start_time,
            self.end_frame,
            self.end_time,
        )
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Track {}

impl PartialOrd for Track {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Track {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key()
            .cmp(&other.order_key())
            .then_with(|| self.track_type.cmp(&other.track_type))
            .then_with(|| self.confidence.total_cmp(&other.confidence))
            .then_with(|| self.detections.cmp(&other.detections))
            .then_with(|| self.track_properties.cmp(&other.track_properties))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(frame: i32, confidence: f32) -> Detection {
        Detection::new(0, 0, 10, 10, confidence, frame, i64::from(frame) * 100, BTreeMap::new())
    }

    #[test]
    fn bounds_follow_detections() {
        let track = Track::new(1, 2, 0, 0, "FACE")
            .with_detections(vec![detection(7, 0.5), detection(3, 0.2), detection(5, 0.9)]);
        assert_eq!((track.start_frame, track.end_frame), (3, 7));
        assert_eq!((track.start_time, track.end_time), (300, 700));
        assert_eq!(track.exemplar.as_ref().map(|d| d.media_offset_frame), Some(5));
    }

    #[test]
    fn retain_recomputes_bounds_and_exemplar() {
        let mut track = Track::new(1, 2, 0, 0, "FACE")
            .with_detections(vec![detection(1, 0.9), detection(2, 0.1), detection(3, 0.3)]);
        let removed = track.retain_detections(|d| d.media_offset_frame != 1);
        assert_eq!(removed, 1);
        assert_eq!((track.start_frame, track.end_frame), (2, 3));
        assert_eq!(track.exemplar.as_ref().map(|d| d.media_offset_frame), Some(3));
    }

    #[test]
    fn add_detection_widens_reported_bounds() {
        let mut track = Track::new(1, 2, 0, 0, "FACE").with_bounds(10, 20, 1000, 2000);
        track.add_detection(detection(25, 0.4));
        assert_eq!((track.start_frame, track.end_frame), (10, 25));
        assert_eq!(track.frame_span(), 16);
    }

    #[test]
    fn exemplar_prefers_earliest_on_ties() {
        let track = Track::new(1, 2, 0, 0, "FACE")
            .with_detections(vec![detection(4, 0.5), detection(2, 0.5)]);
        assert_eq!(track.exemplar.map(|d| d.media_offset_frame), Some(2));
    }
}
