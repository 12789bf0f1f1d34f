//! Tests for planning detection segments over whole jobs

use detpipe_core::config::{EngineConfig, EngineConfigBuilder};
use detpipe_core::constants::*;
use detpipe_core::model::{
    Action, Detection, FrameRange, JobDescriptor, Media, MediaType, SegmentRange, Task, Track,
};
use detpipe_core::store::{InMemoryJobStore, JobStateStore};
use detpipe_core::StagePipeline;
use std::collections::BTreeMap;

fn task(name: &str, action: Action) -> Task {
    Task {
        name: name.to_string(),
        actions: vec![action],
        detection: true,
    }
}

fn video(id: i64, length: i64) -> Media {
    Media::new(id, MediaType::Video)
        .with_length(length)
        .with_metadata(META_FPS, "30")
        .with_metadata(META_HAS_CONSTANT_FRAME_RATE, "true")
}

fn job(media: Vec<Media>, tasks: Vec<Task>) -> JobDescriptor {
    JobDescriptor {
        id: 5,
        job_properties: BTreeMap::new(),
        algorithm_properties: BTreeMap::new(),
        media,
        tasks,
        segment_frame_boundaries: Vec::new(),
    }
}

fn config() -> EngineConfig {
    EngineConfigBuilder::new()
        .segment_lengths(100, 20)
        .min_gap_between_segments(10)
        .sampling_interval(7)
        .frame_rate_cap(5)
        .build()
}

fn frames(range: &SegmentRange) -> (i32, i32) {
    range.frames()
}

#[test]
fn test_first_task_covers_whole_media() {
    let job = job(
        vec![video(1, 250), Media::new(2, MediaType::Image), Media::new(3, MediaType::Audio)],
        vec![task("FACE", Action::new("FACE ACTION", "FACECV"))],
    );
    let pipeline = StagePipeline::new(config());
    let state = InMemoryJobStore::new();

    let segments = pipeline.plan(&job, 0, &state).unwrap();
    let video_ranges: Vec<_> = segments.iter().filter(|s| s.id.media_id == 1).map(|s| frames(&s.range)).collect();
    assert_eq!(video_ranges, vec![(0, 99), (100, 199), (200, 249)]);

    let video_segment = segments.iter().find(|s| s.id.media_id == 1).unwrap();
    assert_eq!(video_segment.properties[MEDIA_SAMPLING_INTERVAL], "6");
    assert!(!video_segment.properties.contains_key(FRAME_RATE_CAP));

    let image = segments.iter().find(|s| s.id.media_id == 2).unwrap();
    assert_eq!(image.range, SegmentRange::Whole);
    let audio = segments.iter().find(|s| s.id.media_id == 3).unwrap();
    assert_eq!(audio.range, SegmentRange::Time { start: 0, stop: -1 });
}

#[test]
fn test_unknown_length_is_recorded_and_other_media_continue() {
    let job = job(
        vec![Media::new(1, MediaType::Video), video(2, 50)],
        vec![task("FACE", Action::new("FACE ACTION", "FACECV"))],
    );
    let pipeline = StagePipeline::new(config());
    let state = InMemoryJobStore::new();

    let segments = pipeline.plan(&job, 0, &state).unwrap();
    assert!(segments.iter().all(|s| s.id.media_id == 2));
    assert_eq!(segments.len(), 1);

    let issues = state.media_snapshot(5, 1).unwrap().issues;
    let issue = issues.first().unwrap();
    assert_eq!(issue.issue_code, IssueCode::Other);
    assert!(issue.message.contains("unknown"));
}

#[test]
fn test_user_boundaries_restrict_the_first_task() {
    let mut job = job(vec![video(1, 1000)], vec![task("FACE", Action::new("FACE ACTION", "FACECV"))]);
    job.segment_frame_boundaries = vec![FrameRange::new(900, 2000), FrameRange::new(10, 40), FrameRange::new(45, 60)];
    let pipeline = StagePipeline::new(config());
    let state = InMemoryJobStore::new();

    let ranges: Vec<_> = pipeline
        .plan(&job, 0, &state)
        .unwrap()
        .iter()
        .map(|s| frames(&s.range))
        .collect();
    assert_eq!(ranges, vec![(10, 60), (900, 999)]);
}

#[test]
fn test_later_tasks_follow_previous_tracks() {
    let job = job(
        vec![video(1, 1000)],
        vec![
            task("PERSON", Action::new("PERSON ACTION", "PERSONCV")),
            task("FACE", Action::new("FACE ACTION", "FACECV")),
            task(
                "CLASSIFY",
                Action::new("CLASSIFY ACTION", "CLASSIFIER").with_property(FEED_FORWARD_TYPE, "REGION"),
            ),
        ],
    );
    let pipeline = StagePipeline::new(config());
    let state = InMemoryJobStore::new();

    for (start, end) in [(100, 150), (155, 170), (600, 620)] {
        let detections = [start, end].map(|frame| Detection::new(0, 0, 10, 10, 0.9, frame, 0, BTreeMap::new()));
        state
            .add_track(Track::new(5, 1, 0, 0, "PERSON").with_detections(detections))
            .unwrap();
    }

    let ranges: Vec<_> = pipeline
        .plan(&job, 1, &state)
        .unwrap()
        .iter()
        .map(|s| frames(&s.range))
        .collect();
    assert_eq!(ranges, vec![(100, 170), (600, 620)]);

    let track = Track::new(5, 1, 1, 0, "FACE")
        .with_detections([Detection::new(0, 0, 10, 10, 0.9, 300, 0, BTreeMap::new())]);
    state.add_track(track).unwrap();
    let segments = pipeline.plan(&job, 2, &state).unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(frames(&segments[0].range), (300, 300));
    assert!(segments[0].feed_forward_track.is_some());
}

#[test]
fn test_source_and_derivative_restrictions() {
    let mut derivative = Media::new(2, MediaType::Image);
    derivative.parent_id = Some(1);
    let job = job(
        vec![video(1, 30), derivative],
        vec![task(
            "OCR",
            Action::new("OCR ACTION", "OCR").with_property(DERIVATIVE_MEDIA_ONLY, "TRUE"),
        )],
    );
    let pipeline = StagePipeline::new(config());
    let state = InMemoryJobStore::new();

    let segments = pipeline.plan(&job, 0, &state).unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].id.media_id, 2);
}
