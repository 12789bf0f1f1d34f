//! End-to-end tests running whole tasks through the stage pipeline

use detpipe_core::aggregation::{ImageLocationsResult, LocationResult, VideoTrackResult};
use detpipe_core::config::EngineConfigBuilder;
use detpipe_core::constants::*;
use detpipe_core::model::{Action, JobDescriptor, Media, MediaType, Segment, Task};
use detpipe_core::{DetectionResponse, InMemoryJobStore, StagePipeline};
use std::collections::BTreeMap;

fn location(x: i32, y: i32, size: i32, confidence: f32) -> LocationResult {
    LocationResult {
        x,
        y,
        width: size,
        height: size,
        confidence,
        properties: BTreeMap::new(),
    }
}

fn job() -> JobDescriptor {
    JobDescriptor {
        id: 21,
        job_properties: [(CONFIDENCE_THRESHOLD.to_string(), "0.5".to_string())].into_iter().collect(),
        algorithm_properties: BTreeMap::new(),
        media: vec![
            Media::new(1, MediaType::Video)
                .with_length(100)
                .with_metadata(META_FPS, "25")
                .with_metadata(META_HAS_CONSTANT_FRAME_RATE, "true")
                .with_metadata(META_FRAME_WIDTH, "640")
                .with_metadata(META_FRAME_HEIGHT, "480"),
            Media::new(2, MediaType::Image)
                .with_metadata(META_FRAME_WIDTH, "100")
                .with_metadata(META_FRAME_HEIGHT, "100"),
        ],
        tasks: vec![Task {
            name: "FACE".to_string(),
            actions: vec![Action::new("FACE ACTION", "FACECV")],
            detection: true,
        }],
        segment_frame_boundaries: Vec::new(),
    }
}

fn responses(segments: &[Segment]) -> Vec<DetectionResponse> {
    let mut result = Vec::new();
    for segment in segments {
        let response = DetectionResponse::new(segment.id, &segment.action_name, segment.range);
        let response = match (segment.id.media_id, segment.id.segment_index) {
            (1, 0) => {
                let mut response = response.with_processing_time(20);
                response.video_tracks.push(VideoTrackResult {
                    detection_type: "FACE".to_string(),
                    start_frame: 10,
                    stop_frame: 30,
                    confidence: 0.9,
                    properties: BTreeMap::new(),
                    frame_locations: [
                        (10, location(600, 400, 100, 0.9)),
                        (20, location(600, 400, 100, 0.8)),
                        (30, location(600, 400, 100, 0.1)),
                    ]
                    .into_iter()
                    .collect(),
                });
                response
            }
            (1, _) => response
                .with_error(DetectionErrorCode::DetectionFailed, "boom")
                .with_processing_time(30),
            _ => {
                let mut response = response;
                response.image_locations.push(ImageLocationsResult {
                    detection_type: "FACE".to_string(),
                    locations: vec![location(10, 10, 0, 0.9), location(5, 5, 20, 0.9)],
                });
                response
            }
        };
        result.push(response);
    }
    result
}

fn pipeline() -> StagePipeline {
    StagePipeline::new(EngineConfigBuilder::new().segment_lengths(50, 10).build())
}

#[test]
fn test_task_produces_tracks_errors_and_timings() {
    let pipeline = pipeline();
    let job = job();
    let state = InMemoryJobStore::new();

    let segments = pipeline.plan(&job, 0, &state).unwrap();
    assert_eq!(segments.len(), 3);

    let report = pipeline.run_task(&job, 0, &responses(&segments), &state).unwrap();
    assert_eq!(report.responses_aggregated, 3);
    assert_eq!(report.responses_ignored, 0);
    assert_eq!(report.tracks_added, 3);
    assert_eq!(report.detections_discarded, 1);
    assert_eq!(report.segments_failed, 1);
    assert_eq!(report.geometry.removed_detections, 1);
    assert_eq!(report.geometry.dropped_tracks, 1);

    let job_report = pipeline.report(&job, &state).unwrap();
    let video = job_report.tracks[&1].first().unwrap();
    assert_eq!((video.start_frame, video.end_frame), (10, 30));
    assert_eq!((video.start_time, video.end_time), (400, 1200));
    assert_eq!(video.detections.len(), 2);
    assert_eq!(job_report.tracks[&2].len(), 1);

    assert_eq!(job_report.errors.len(), 1);
    let error = &job_report.errors[0];
    assert_eq!(error.source, "FACECV");
    assert_eq!(error.code, "DETECTION_FAILED");
    assert_eq!(error.message, "boom (Frames: 50 - 99)");

    assert_eq!(job_report.timings.processing_time_ms["FACE ACTION"], 50);
    assert!(job_report.timings.missing_processing_time.contains("FACE ACTION"));

    assert!(job_report
        .issues
        .iter()
        .any(|issue| issue.media_id == 2 && issue.issue_code == IssueCode::InvalidDetection));

    let json = serde_json::to_value(&job_report).unwrap();
    assert_eq!(json["job_id"], 21);
}

#[test]
fn test_replayed_responses_change_nothing() {
    let pipeline = pipeline();
    let job = job();
    let state = InMemoryJobStore::new();
    let segments = pipeline.plan(&job, 0, &state).unwrap();
    let responses = responses(&segments);

    pipeline.run_task(&job, 0, &responses, &state).unwrap();
    let before = pipeline.report(&job, &state).unwrap();

    let replay = pipeline.aggregate(&job, 0, &responses, &state).unwrap();
    assert_eq!(replay.responses_ignored, 3);
    assert_eq!(replay.tracks_added, 0);

    let after = pipeline.report(&job, &state).unwrap();
    assert_eq!(before.tracks, after.tracks);
    assert_eq!(before.errors, after.errors);
    assert_eq!(before.timings.processing_time_ms, after.timings.processing_time_ms);
}

#[test]
fn test_responses_for_other_jobs_are_rejected() {
    let pipeline = pipeline();
    let job = job();
    let state = InMemoryJobStore::new();
    let segments = pipeline.plan(&job, 0, &state).unwrap();
    let mut responses = responses(&segments);
    responses[0].segment.job_id = 99;

    assert!(pipeline.aggregate(&job, 0, &responses, &state).is_err());
}
