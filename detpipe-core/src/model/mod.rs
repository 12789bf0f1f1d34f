//! Data model shared by every stage.

mod detection;
mod issues;
mod job;
mod media;
mod segment;
mod track;

pub use detection::Detection;
pub use issues::{DetectionProcessingError, JobIssue, Severity};
pub use job::{Action, FrameRange, JobDescriptor, Task};
pub use media::{Media, MediaType};
pub use segment::{Segment, SegmentId, SegmentRange};
pub use track::Track;
