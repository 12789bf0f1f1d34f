//! A single detected object location.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::constants::{HORIZONTAL_FLIP, ROTATION, SHRUNK_TO_NOTHING};

/// An object location reported by a detection component.
///
/// `x`, `y`, `width` and `height` describe an axis-aligned box in the
/// coordinate system obtained by rotating the frame by the detection's
/// `ROTATION` property and mirroring it when `HORIZONTAL_FLIP` is true.
/// `(x, y)` is the box corner that the frame origin maps to in that system.
///
/// Ordering and equality consider the media offsets, the box and the
/// properties. Confidence is deliberately left out so that two reports of the
/// same box at the same offset collapse into one entry of a track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: f32,
    /// Frame offset within the medium, -1 for media without frames
    pub media_offset_frame: i32,
    /// Time offset within the medium in milliseconds
    pub media_offset_time: i64,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Detection {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        confidence: f32,
        media_offset_frame: i32,
        media_offset_time: i64,
        properties: BTreeMap<String, String>,
    ) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
            media_offset_frame,
            media_offset_time,
            properties,
        }
    }

    /// Rotation in degrees from the `ROTATION` property, 0 when absent or unparsable.
    pub fn rotation(&self) -> f64 {
        self.properties
            .get(ROTATION)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    /// Whether the `HORIZONTAL_FLIP` property is set to true.
    pub fn horizontal_flip(&self) -> bool {
        self.properties
            .get(HORIZONTAL_FLIP)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    }

    pub fn is_shrunk_to_nothing(&self) -> bool {
        self.properties
            .get(SHRUNK_TO_NOTHING)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }

    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Returns a copy of this detection with a different box.
    pub fn with_box(&self, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            ..self.clone()
        }
    }

    fn order_key(&self) -> (i32, i64, i32, i32, i32, i32) {
        (
            self.media_offset_frame,
            self.media_offset_time,
            self.x,
            self.y,
            self.width,
            self.height,
        )
    }
}

impl PartialEq for Detection {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Detection {}

impl PartialOrd for Detection {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Detection {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key()
            .cmp(&other.order_key())
            .then_with(|| self.properties.cmp(&other.properties))
    }
}
