//! Mapping between frame coordinates and a detection's local coordinates.
//!
//! A detection box is axis-aligned in its local system: the frame mirrored
//! horizontally (when `HORIZONTAL_FLIP` is set) and then rotated by
//! `ROTATION` degrees. Multiples of 90 degrees use exact sine and cosine so
//! that orthogonal rotations stay on whole pixels.

use crate::model::Detection;

/// A 2D point in floating-point pixel coordinates.
pub type Point = (f64, f64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransform {
    cos: f64,
    sin: f64,
    flip: bool,
}

impl FrameTransform {
    pub fn new(rotation_degrees: f64, flip: bool) -> Self {
        let (cos, sin) = cos_sin(rotation_degrees);
        Self { cos, sin, flip }
    }

    /// The transform described by a detection's `ROTATION` and
    /// `HORIZONTAL_FLIP` properties.
    pub fn for_detection(detection: &Detection) -> Self {
        Self::new(detection.rotation(), detection.horizontal_flip())
    }

    pub fn is_identity(&self) -> bool {
        self.cos == 1.0 && self.sin == 0.0 && !self.flip
    }

    /// Whether box edges stay parallel to the frame edges.
    pub fn is_orthogonal(&self) -> bool {
        self.cos == 0.0 || self.sin == 0.0
    }

    /// Frame coordinates to local coordinates.
    pub fn apply(&self, (x, y): Point) -> Point {
        let x = if self.flip { -x } else { x };
        (x * self.cos - y * self.sin, x * self.sin + y * self.cos)
    }

    /// Local coordinates to frame coordinates.
    pub fn invert(&self, (x, y): Point) -> Point {
        let rx = x * self.cos + y * self.sin;
        let ry = -x * self.sin + y * self.cos;
        (if self.flip { -rx } else { rx }, ry)
    }

    /// Bounding box of the whole frame in local coordinates, as
    /// `(min_x, min_y, max_x, max_y)`.
    pub fn frame_bounds(&self, frame_width: i32, frame_height: i32) -> (f64, f64, f64, f64) {
        let (w, h) = (f64::from(frame_width), f64::from(frame_height));
        let corners = [(0.0, 0.0), (0.0, h), (w, 0.0), (w, h)].map(|corner| self.apply(corner));

        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        )
    }

    /// Corners of a local box `(x, y, width, height)` in frame coordinates,
    /// in drawing order.
    pub fn box_corners(&self, x: f64, y: f64, width: f64, height: f64) -> [Point; 4] {
        [(x, y), (x + width, y), (x + width, y + height), (x, y + height)].map(|corner| self.invert(corner))
    }
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self::new(0.0, false)
    }
}

fn cos_sin(degrees: f64) -> (f64, f64) {
    if degrees.fract() == 0.0 && degrees % 90.0 == 0.0 {
        match degrees.rem_euclid(360.0) as i32 {
            0 => return (1.0, 0.0),
            90 => return (0.0, 1.0),
            180 => return (-1.0, 0.0),
            270 => return (0.0, -1.0),
            _ => {}
        }
    }
    let radians = degrees.to_radians();
    (radians.cos(), radians.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthogonal_rotations_are_exact() {
        let t = FrameTransform::new(90.0, false);
        assert_eq!(t.apply((3.0, 4.0)), (-4.0, 3.0));
        assert_eq!(t.invert((-4.0, 3.0)), (3.0, 4.0));
        assert!(t.is_orthogonal());

        let t = FrameTransform::new(-90.0, false);
        assert_eq!(t.apply((3.0, 4.0)), (4.0, -3.0));
    }

    #[test]
    fn flip_mirrors_before_rotating() {
        let t = FrameTransform::new(0.0, true);
        assert_eq!(t.apply((3.0, 4.0)), (-3.0, 4.0));
        assert_eq!(t.invert((-3.0, 4.0)), (3.0, 4.0));
        assert_eq!(t.frame_bounds(640, 480), (-640.0, 0.0, 0.0, 480.0));
    }

    #[test]
    fn invert_undoes_apply() {
        let t = FrameTransform::new(18.74, true);
        let (x, y) = t.invert(t.apply((96.0, 140.0)));
        assert!((x - 96.0).abs() < 1e-9);
        assert!((y - 140.0).abs() < 1e-9);
        assert!(!t.is_orthogonal());
    }

    #[test]
    fn frame_bounds_after_half_turn() {
        let t = FrameTransform::new(180.0, false);
        assert_eq!(t.frame_bounds(640, 480), (-640.0, -480.0, 0.0, 0.0));
    }
}
