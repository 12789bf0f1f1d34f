//! Frame range summaries for warnings and detection errors.
//!
//! Repeated errors over many segments of a video are reported as one issue
//! whose message lists the affected frames, e.g. `"(Frames: 0 - 19, 50 - 59)"`.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{DetectionProcessingError, FrameRange, JobDescriptor, MediaType};

/// Sorts the ranges and joins those that overlap or touch.
pub fn coalesce(ranges: impl IntoIterator<Item = FrameRange>) -> Vec<FrameRange> {
    let mut sorted: Vec<FrameRange> = ranges.into_iter().filter(|r| !r.is_empty()).collect();
    sorted.sort();

    let mut result: Vec<FrameRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match result.last_mut() {
            Some(last) if i64::from(range.start) <= i64::from(last.end) + 1 => {
                last.end = last.end.max(range.end);
            }
            _ => result.push(range),
        }
    }
    result
}

/// Formats coalesced ranges as `"(Frames: a - b, c - d)"`.
pub fn format_frame_ranges(ranges: impl IntoIterator<Item = FrameRange>) -> Option<String> {
    let ranges = coalesce(ranges);
    if ranges.is_empty() {
        return None;
    }
    let joined = ranges
        .iter()
        .map(|r| format!("{} - {}", r.start, r.end))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!("(Frames: {joined})"))
}

/// Formats individual frame numbers, see [`format_frame_ranges`].
pub fn format_frames(frames: impl IntoIterator<Item = i32>) -> Option<String> {
    format_frame_ranges(frames.into_iter().map(|frame| FrameRange::new(frame, frame)))
}

/// A detection error as reported to the job owner.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MergedIssue {
    pub media_id: i64,
    /// Algorithm that reported the error
    pub source: String,
    pub code: String,
    pub message: String,
}

/// Groups detection errors into issues.
///
/// For video, errors with the same source, code and message become one issue
/// with the affected frame ranges appended to the message. Other media keep
/// one issue per error.
pub fn merge_detection_errors<'a>(
    job: &JobDescriptor,
    errors: impl IntoIterator<Item = &'a DetectionProcessingError>,
) -> Vec<MergedIssue> {
    let mut grouped: BTreeMap<MergedIssue, Vec<FrameRange>> = BTreeMap::new();
    let mut issues = Vec::new();

    for error in errors {
        let source = job
            .tasks
            .get(error.task_index)
            .and_then(|task| task.actions.get(error.action_index))
            .map(|action| action.algorithm.clone())
            .unwrap_or_default();
        let issue = MergedIssue {
            media_id: error.media_id,
            source,
            code: error.error_code.clone(),
            message: error.error_message.clone(),
        };

        let is_video = job
            .media(error.media_id)
            .is_some_and(|media| media.media_type == MediaType::Video);
        if is_video {
            grouped
                .entry(issue)
                .or_default()
                .push(FrameRange::new(error.start_frame, error.stop_frame));
        } else {
            issues.push(issue);
        }
    }

    for (mut issue, ranges) in grouped {
        if let Some(frames) = format_frame_ranges(ranges) {
            issue.message = format!("{} {}", issue.message, frames);
        }
        issues.push(issue);
    }
    issues.sort();
    issues.dedup();
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, Media, Task};

    fn error(media_id: i64, start: i32, stop: i32, message: &str) -> DetectionProcessingError {
        DetectionProcessingError {
            job_id: 1,
            media_id,
            task_index: 0,
            action_index: 0,
            start_frame: start,
            stop_frame: stop,
            start_time: 0,
            stop_time: 0,
            error_code: "BAD_FRAME_SIZE".to_string(),
            error_message: message.to_string(),
        }
    }

    fn job() -> JobDescriptor {
        JobDescriptor {
            id: 1,
            job_properties: BTreeMap::new(),
            algorithm_properties: BTreeMap::new(),
            media: vec![
                Media::new(1, MediaType::Video).with_length(100),
                Media::new(2, MediaType::Image),
            ],
            tasks: vec![Task {
                name: "TASK".to_string(),
                actions: vec![Action::new("ACTION", "FACECV")],
                detection: true,
            }],
            segment_frame_boundaries: Vec::new(),
        }
    }

    #[test]
    fn formats_frames() {
        assert_eq!(format_frames([0, 1, 2, 5]).as_deref(), Some("(Frames: 0 - 2, 5 - 5)"));
        assert_eq!(format_frames(Vec::new()), None);
    }

    #[test]
    fn adjacent_ranges_join() {
        let ranges = [FrameRange::new(10, 19), FrameRange::new(0, 9), FrameRange::new(30, 49)];
        assert_eq!(format_frame_ranges(ranges).as_deref(), Some("(Frames: 0 - 19, 30 - 49)"));
    }

    #[test]
    fn video_errors_are_merged() {
        let errors = vec![error(1, 0, 9, "em1"), error(1, 10, 19, "em1"), error(1, 50, 59, "em2")];
        let issues = merge_detection_errors(&job(), &errors);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].message, "em1 (Frames: 0 - 19)");
        assert_eq!(issues[1].message, "em2 (Frames: 50 - 59)");
        assert_eq!(issues[0].source, "FACECV");
    }

    #[test]
    fn image_errors_are_not_merged() {
        let errors = vec![error(2, 0, 0, "em1")];
        let issues = merge_detection_errors(&job(), &errors);
        assert_eq!(issues[0].message, "em1");
    }
}
