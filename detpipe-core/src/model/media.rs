//! Media descriptors as seen by the stage engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{META_FPS, META_FRAME_HEIGHT, META_FRAME_WIDTH, META_HAS_CONSTANT_FRAME_RATE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    Video,
    Image,
    Audio,
    Unknown,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaType::Video => "VIDEO",
            MediaType::Image => "IMAGE",
            MediaType::Audio => "AUDIO",
            MediaType::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// One medium of a job, already inspected by an external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub id: i64,
    /// Set for derivative media extracted from another medium
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub uri: String,
    pub media_type: MediaType,
    #[serde(default)]
    pub mime_type: String,
    /// Frame count for video, duration in milliseconds for audio
    #[serde(default)]
    pub length: Option<i64>,
    /// Inspection results such as FPS and frame size
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Media-specific property overrides supplied with the job
    #[serde(default)]
    pub media_properties: BTreeMap<String, String>,
    /// Media that could not be retrieved or inspected
    #[serde(default)]
    pub failed: bool,
}

impl Media {
    pub fn new(id: i64, media_type: MediaType) -> Self {
        Self {
            id,
            parent_id: None,
            uri: String::new(),
            media_type,
            mime_type: String::new(),
            length: None,
            metadata: BTreeMap::new(),
            media_properties: BTreeMap::new(),
            failed: false,
        }
    }

    pub fn with_length(mut self, length: i64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn with_property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.media_properties.insert(key.to_string(), value.into());
        self
    }

    pub fn is_derivative(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn fps(&self) -> Option<f64> {
        self.metadata
            .get(META_FPS)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|fps| *fps > 0.0)
    }

    /// Frame width and height from the inspection metadata.
    pub fn frame_size(&self) -> Option<(i32, i32)> {
        let width = self.metadata.get(META_FRAME_WIDTH)?.trim().parse().ok()?;
        let height = self.metadata.get(META_FRAME_HEIGHT)?.trim().parse().ok()?;
        Some((width, height))
    }

    pub fn has_constant_frame_rate(&self) -> bool {
        self.metadata
            .get(META_HAS_CONSTANT_FRAME_RATE)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    }
}
