// ============================================================================
// detpipe-core/src/geometry/mod.rs
// ============================================================================
//
// DETECTION GEOMETRY: Padding, clipping and validity of detection boxes
//
// Detection boxes live in a rotated (and possibly mirrored) coordinate system
// described by the detection's ROTATION and HORIZONTAL_FLIP properties. All
// operations here work in that local system and clip against the true frame,
// so the transform properties themselves are never modified.
//
// KEY COMPONENTS:
// - PaddingSpec: pixel or percentage padding for one axis
// - pad / clip: grow, shrink and clip one detection
// - is_ill_formed: zero-size boxes and boxes with no pixel inside the frame
// - GeometryTransformer: applies the above to the tracks of a task

mod clip;
mod padding;
mod processor;
mod transform;

use thiserror::Error;

use crate::constants::SHRUNK_TO_NOTHING;
use crate::model::Detection;

pub use clip::{clip_to_frame, polygon_area};
pub use padding::PaddingSpec;
pub use processor::{GeometryTransformer, TransformSummary};
pub use transform::{FrameTransform, Point};

#[derive(Debug, Error)]
pub enum PaddingError {
    #[error("Invalid padding value '{value}': expected an optional '-', digits and an optional '%'")]
    Invalid { value: String },

    #[error("The {property} property was set to \"{value}\", but that value is not a valid padding")]
    InvalidProperty { property: String, value: String },

    #[error(
        "The {property} property was set to \"{value}\", but that would result in empty detections. \
         When specified as a percentage, padding values must be > -50%."
    )]
    EmptyDetections { property: String, value: String },
}

/// Why a detection was considered ill-formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IllFormedCause {
    /// Width or height is zero or negative
    ZeroSize,
    /// No pixel of the box lies inside the frame
    OutsideFrame,
}

/// Pads a detection along its local axes and clips it to the frame.
///
/// Padding of zero on both axes returns the detection unchanged. A dimension
/// that ends up empty becomes one pixel and the detection is tagged with
/// `SHRUNK_TO_NOTHING=TRUE`.
///
/// # Arguments
///
/// * `x_padding` - Padding applied to the left and right of the box
/// * `y_padding` - Padding applied to the top and bottom of the box
/// * `frame_width` - Width of the frame the detection was found in
/// * `frame_height` - Height of the frame
/// * `detection` - The detection to pad
///
/// # Returns
///
/// * The padded detection, with every property other than the box kept
pub fn pad(
    x_padding: &PaddingSpec,
    y_padding: &PaddingSpec,
    frame_width: i32,
    frame_height: i32,
    detection: &Detection,
) -> Detection {
    if x_padding.is_zero() && y_padding.is_zero() {
        return detection.clone();
    }
    resize(x_padding, y_padding, frame_width, frame_height, detection)
}

/// Clips a detection to the frame without padding it.
///
/// Clipping an already clipped detection returns it unchanged. For rotations
/// that are not multiples of 90 degrees the corners of a clipped box land
/// between whole pixels, so a box that overhangs the frame by no more than
/// that rounding is taken as already clipped.
pub fn clip(frame_width: i32, frame_height: i32, detection: &Detection) -> Detection {
    let transform = FrameTransform::for_detection(detection);
    if !transform.is_orthogonal() && within_rounding_of_frame(&transform, frame_width, frame_height, detection) {
        return detection.clone();
    }
    let none = PaddingSpec::default();
    resize(&none, &none, frame_width, frame_height, detection)
}

/// Rounding the frame origin of a box moves it by at most half a pixel on
/// each frame axis, which is this far along either local axis.
const ORIGIN_ROUNDING: f64 = std::f64::consts::FRAC_1_SQRT_2 + 1e-9;

/// Whether the local box stays inside the frame bounds widened by the
/// rounding `resize` applies: the rounded origin on the near sides, plus the
/// rounded up size on the far sides.
fn within_rounding_of_frame(
    transform: &FrameTransform,
    frame_width: i32,
    frame_height: i32,
    detection: &Detection,
) -> bool {
    let (left, top) = transform.apply((f64::from(detection.x), f64::from(detection.y)));
    let right = left + f64::from(detection.width);
    let bottom = top + f64::from(detection.height);
    let (frame_x0, frame_y0, frame_x1, frame_y1) = transform.frame_bounds(frame_width, frame_height);

    left >= frame_x0 - ORIGIN_ROUNDING
        && top >= frame_y0 - ORIGIN_ROUNDING
        && right <= frame_x1 + 1.0 + ORIGIN_ROUNDING
        && bottom <= frame_y1 + 1.0 + ORIGIN_ROUNDING
}

/// Parses both padding values and pads the detection.
pub fn pad_detection(
    x_padding: &str,
    y_padding: &str,
    frame_width: i32,
    frame_height: i32,
    detection: &Detection,
) -> Result<Detection, PaddingError> {
    let x_padding = PaddingSpec::parse(x_padding)?;
    let y_padding = PaddingSpec::parse(y_padding)?;
    Ok(pad(&x_padding, &y_padding, frame_width, frame_height, detection))
}

fn resize(
    x_padding: &PaddingSpec,
    y_padding: &PaddingSpec,
    frame_width: i32,
    frame_height: i32,
    detection: &Detection,
) -> Detection {
    let transform = FrameTransform::for_detection(detection);
    let (width, height) = (f64::from(detection.width), f64::from(detection.height));
    let (local_x, local_y) = transform.apply((f64::from(detection.x), f64::from(detection.y)));

    let dx = x_padding.offset(width);
    let dy = y_padding.offset(height);
    let (left, top) = (local_x - dx, local_y - dy);
    let (right, bottom) = (left + width + 2.0 * dx, top + height + 2.0 * dy);

    let (frame_x0, frame_y0, frame_x1, frame_y1) = transform.frame_bounds(frame_width, frame_height);
    let x0 = left.max(frame_x0);
    let x1 = right.min(frame_x1);
    let y0 = top.max(frame_y0);
    let y1 = bottom.min(frame_y1);

    let (origin_x, origin_y) = transform.invert((x0, y0));
    let x = round_half_up(origin_x);
    let y = round_half_up(origin_y);
    let mut new_width = (x1 - x0).ceil() as i32;
    let mut new_height = (y1 - y0).ceil() as i32;

    let mut shrunk = false;
    if new_width <= 0 {
        new_width = 1;
        shrunk = true;
    }
    if new_height <= 0 {
        new_height = 1;
        shrunk = true;
    }

    let mut result = detection.with_box(x, y, new_width, new_height);
    if shrunk {
        result.properties.insert(SHRUNK_TO_NOTHING.to_string(), "TRUE".to_string());
    }
    result
}

fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Returns why a detection is ill-formed, if it is.
///
/// A box whose rotated outline overlaps the frame in a single row or column
/// of pixels is still well-formed; one that only touches the frame edge is
/// not.
pub fn ill_formed_cause(detection: &Detection, frame_width: i32, frame_height: i32) -> Option<IllFormedCause> {
    if !detection.has_area() {
        return Some(IllFormedCause::ZeroSize);
    }

    let transform = FrameTransform::for_detection(detection);
    let (x, y) = transform.apply((f64::from(detection.x), f64::from(detection.y)));
    let outline = transform.box_corners(x, y, f64::from(detection.width), f64::from(detection.height));
    let visible = clip_to_frame(&outline, frame_width, frame_height);

    if visible.len() < 3 || polygon_area(&visible) <= 0.0 {
        Some(IllFormedCause::OutsideFrame)
    } else {
        None
    }
}

pub fn is_ill_formed(detection: &Detection, frame_width: i32, frame_height: i32) -> bool {
    ill_formed_cause(detection, frame_width, frame_height).is_some()
}
