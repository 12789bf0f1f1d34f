//! Spatial compatibility checks for track merging.

use crate::config::DEFAULT_TRACK_OVERLAP_THRESHOLD;
use crate::constants::SPEECH_TRACK_TYPE;
use crate::model::{Detection, Track};

/// Decides whether two temporally adjacent tracks may depict the same object.
pub trait SpatialPredicate: Send + Sync {
    /// `earlier` ends before `later` starts.
    fn compatible(&self, earlier: &Track, later: &Track) -> bool;
}

/// Compares the last detection of the earlier track with the first detection
/// of the later one and requires their intersection over union to exceed a
/// threshold.
///
/// Tracks of different types never merge, and neither do speech tracks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IouPredicate {
    threshold: f64,
}

impl IouPredicate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for IouPredicate {
    fn default() -> Self {
        Self::new(DEFAULT_TRACK_OVERLAP_THRESHOLD)
    }
}

impl SpatialPredicate for IouPredicate {
    fn compatible(&self, earlier: &Track, later: &Track) -> bool {
        if !earlier.track_type.eq_ignore_ascii_case(&later.track_type)
            || earlier.track_type.eq_ignore_ascii_case(SPEECH_TRACK_TYPE)
        {
            return false;
        }
        match (earlier.detections.last(), later.detections.first()) {
            (Some(end), Some(start)) => intersection_over_union(end, start) > self.threshold,
            _ => false,
        }
    }
}

/// Intersection over union of two axis-aligned boxes, 0 when either is empty.
pub fn intersection_over_union(a: &Detection, b: &Detection) -> f64 {
    if !a.has_area() || !b.has_area() {
        return 0.0;
    }
    let (ax0, ay0, ax1, ay1) = corners(a);
    let (bx0, by0, bx1, by1) = corners(b);

    let width = (ax1.min(bx1) - ax0.max(bx0)).max(0);
    let height = (ay1.min(by1) - ay0.max(by0)).max(0);
    let intersection = (width * height) as f64;
    if intersection == 0.0 {
        return 0.0;
    }
    let union = area(a) + area(b) - intersection;
    intersection / union
}

fn corners(d: &Detection) -> (i64, i64, i64, i64) {
    let (x, y) = (i64::from(d.x), i64::from(d.y));
    (x, y, x + i64::from(d.width), y + i64::from(d.height))
}

fn area(d: &Detection) -> f64 {
    (i64::from(d.width) * i64::from(d.height)) as f64
}
