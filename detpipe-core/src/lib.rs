//! Core library for the stages of a media detection pipeline.
//!
//! A job runs a sequence of tasks over a set of media. For every task this
//! crate plans detection segments, aggregates the responses of detection
//! components into tracks, cleans up and pads the detection geometry and
//! merges track fragments. Detection itself, message transport and job
//! persistence are left to the embedding application.
//!
//! ## Usage Example
//!
//! ```rust
//! use detpipe_core::{EngineConfig, InMemoryJobStore, JobDescriptor, StagePipeline};
//! use detpipe_core::model::{Action, Media, MediaType, Task};
//!
//! let job = JobDescriptor {
//!     id: 1,
//!     job_properties: Default::default(),
//!     algorithm_properties: Default::default(),
//!     media: vec![Media::new(1, MediaType::Video).with_length(12_000)],
//!     tasks: vec![Task {
//!         name: "FACE DETECTION".to_string(),
//!         actions: vec![Action::new("FACE ACTION", "FACECV")],
//!         detection: true,
//!     }],
//!     segment_frame_boundaries: Vec::new(),
//! };
//!
//! let pipeline = StagePipeline::new(EngineConfig::default());
//! let state = InMemoryJobStore::new();
//! let segments = pipeline.plan(&job, 0, &state).unwrap();
//! assert!(!segments.is_empty());
//! ```

pub mod aggregation;
pub mod config;
pub mod constants;
pub mod error;
pub mod file_logging;
pub mod geometry;
pub mod merging;
pub mod model;
pub mod pipeline;
pub mod properties;
pub mod segmenting;
pub mod store;

// Re-exports for public API
pub use aggregation::{AggregationOutcome, DetectionAggregator, DetectionResponse};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::{CoreError, CoreResult};
pub use file_logging::{setup_file_logging, timestamped_log_file};
pub use geometry::{GeometryTransformer, PaddingSpec, is_ill_formed, pad, pad_detection};
pub use merging::{IouPredicate, SpatialPredicate, TrackMerger};
pub use model::{Detection, JobDescriptor, Segment, Track};
pub use pipeline::{JobReport, StagePipeline, TaskReport};
pub use properties::{JobPropertyStore, PropertyLayers, PropertyStore};
pub use segmenting::SegmentPlanner;
pub use store::{InMemoryJobStore, JobStateStore};
