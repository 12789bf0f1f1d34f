//! Property resolution across the five override layers.
//!
//! A property value is looked up, from highest to lowest priority, in the
//! media, algorithm, job, action and system layers. Two groups of properties
//! get special treatment:
//!
//! * the frame-transform group (rotation, flip, search region, auto
//!   rotate/flip) is taken as a unit from the highest layer that sets any of
//!   its members,
//! * the sampling pair (`MEDIA_SAMPLING_INTERVAL`, `FRAME_RATE_CAP`) is
//!   resolved member by member and then negotiated into a single frame
//!   interval, see [`PropertyLayers::frame_interval`].

mod layers;
mod sampling;
mod store;

use thiserror::Error;

pub use layers::{Layer, PropertyLayers, ResolvedProperty};
pub use store::{JobPropertyStore, PropertyStore};

#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("Property {name} has invalid value '{value}' at the {layer} layer")]
    InvalidValue { name: String, value: String, layer: Layer },

    #[error("Unknown job {0}")]
    UnknownJob(i64),

    #[error("Unknown media {0}")]
    UnknownMedia(i64),
}

pub type PropertyResult<T> = std::result::Result<T, PropertyError>;
