// ============================================================================
// detpipe-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Crate-wide error type
//
// Each stage defines its own error enum next to the code that raises it.
// CoreError wraps them so that callers crossing stage boundaries (the stage
// pipeline, the CLI) can use a single Result type with `?`.

use thiserror::Error;

use crate::geometry::PaddingError;
use crate::properties::PropertyError;
use crate::segmenting::SegmentationError;
use crate::store::StoreError;

/// Custom error types for detpipe
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Property error: {0}")]
    Property(#[from] PropertyError),

    #[error("Segmentation error: {0}")]
    Segmentation(#[from] SegmentationError),

    #[error("Padding error: {0}")]
    Padding(#[from] PaddingError),

    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    #[error("Unknown media {media_id} in job {job_id}")]
    UnknownMedia { job_id: i64, media_id: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for detpipe operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;
