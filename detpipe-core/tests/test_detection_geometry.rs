//! Tests for ill-formed detection removal and padding over job state

use detpipe_core::constants::*;
use detpipe_core::geometry::GeometryTransformer;
use detpipe_core::model::{Action, Detection, JobDescriptor, Media, MediaType, Task, Track};
use detpipe_core::store::{InMemoryJobStore, JobStateStore};
use detpipe_core::{pad_detection, JobPropertyStore};
use std::collections::BTreeMap;

fn detection(frame: i32, x: i32, y: i32, width: i32, height: i32) -> Detection {
    Detection::new(x, y, width, height, 0.9, frame, 0, BTreeMap::new())
}

fn job(action: Action) -> JobDescriptor {
    JobDescriptor {
        id: 11,
        job_properties: BTreeMap::new(),
        algorithm_properties: BTreeMap::new(),
        media: vec![
            Media::new(1, MediaType::Video)
                .with_length(10)
                .with_metadata(META_FRAME_WIDTH, "640")
                .with_metadata(META_FRAME_HEIGHT, "480"),
            Media::new(2, MediaType::Audio),
        ],
        tasks: vec![Task {
            name: "FACE".to_string(),
            actions: vec![action],
            detection: true,
        }],
        segment_frame_boundaries: Vec::new(),
    }
}

fn store_tracks(state: &InMemoryJobStore) {
    let tracks = [
        Track::new(11, 1, 0, 0, "FACE").with_detections([
            detection(0, 100, 100, 50, 50),
            detection(1, 0, 0, 0, 10),
            detection(2, 700, 500, 10, 10),
        ]),
        Track::new(11, 1, 0, 0, SPEECH_TRACK_TYPE).with_detections([detection(3, 10, 10, 0, 5)]),
        Track::new(11, 1, 0, 0, "FACE").with_detections([detection(5, -100, -100, 20, 20)]),
    ];
    for track in tracks {
        state.add_track(track).unwrap();
    }
}

#[test]
fn test_removal_and_padding_update_job_state() {
    let action = Action::new("FACE ACTION", "FACECV")
        .with_property(DETECTION_PADDING_X, "10")
        .with_property(DETECTION_PADDING_Y, "0");
    let job = job(action);
    let properties = JobPropertyStore::new(&job, BTreeMap::new());
    let state = InMemoryJobStore::new();
    store_tracks(&state);

    let transformer = GeometryTransformer::default();
    let summary = transformer.transform_task(&job, 0, &properties, &state).unwrap();
    assert_eq!(summary.removed_detections, 3);
    assert_eq!(summary.dropped_tracks, 1);
    assert_eq!(summary.padded_tracks, 2);
    assert_eq!(summary.shrunk_detections, 0);

    let tracks = state.get_tracks(11, 1, 0, 0).unwrap();
    assert_eq!(tracks.len(), 2);
    let face = tracks.iter().find(|t| t.track_type == "FACE").unwrap();
    let boxes: Vec<_> = face.detections.iter().map(|d| (d.x, d.y, d.width, d.height)).collect();
    assert_eq!(boxes, vec![(90, 100, 70, 50)]);
    assert_eq!((face.start_frame, face.end_frame), (0, 0));
    let exemplar = face.exemplar.as_ref().unwrap();
    assert_eq!((exemplar.x, exemplar.width), (90, 70));

    let messages: Vec<_> = state
        .media_snapshot(11, 1)
        .unwrap()
        .issues
        .into_iter()
        .map(|issue| (issue.issue_code, issue.message))
        .collect();
    assert!(messages.contains(&(
        IssueCode::InvalidDetection,
        "Dropped one or more ill-formed detection regions with width or height equal to 0. (Frames: 1 - 1)"
            .to_string()
    )));
    assert!(messages.contains(&(
        IssueCode::InvalidDetection,
        "Dropped one or more ill-formed detection regions with bounding box completely outside frame. (Frames: 2 - 2, 5 - 5)"
            .to_string()
    )));
}

#[test]
fn test_shrinking_is_reported() {
    let action = Action::new("FACE ACTION", "FACECV").with_property(DETECTION_PADDING_X, "-30");
    let job = job(action);
    let properties = JobPropertyStore::new(&job, BTreeMap::new());
    let state = InMemoryJobStore::new();
    state
        .add_track(Track::new(11, 1, 0, 0, "FACE").with_detections([detection(4, 100, 100, 50, 50)]))
        .unwrap();

    let summary = GeometryTransformer::default()
        .transform_task(&job, 0, &properties, &state)
        .unwrap();
    assert_eq!(summary.shrunk_detections, 1);

    let track = state.get_tracks(11, 1, 0, 0).unwrap().into_iter().next().unwrap();
    let padded = track.detections.first().unwrap();
    assert_eq!((padded.width, padded.height), (1, 50));
    assert!(padded.is_shrunk_to_nothing());

    let issues = state.media_snapshot(11, 1).unwrap().issues;
    assert!(issues.iter().any(|issue| issue.issue_code == IssueCode::Padding
        && issue.message.ends_with("1-pixel detection regions used instead. (Frames: 4 - 4)")));
}

#[test]
fn test_invalid_padding_property_fails_the_task() {
    let action = Action::new("FACE ACTION", "FACECV").with_property(DETECTION_PADDING_Y, "-50%");
    let job = job(action);
    let properties = JobPropertyStore::new(&job, BTreeMap::new());
    let state = InMemoryJobStore::new();
    store_tracks(&state);

    let err = GeometryTransformer::default()
        .transform_task(&job, 0, &properties, &state)
        .unwrap_err();
    assert!(err.to_string().contains("must be > -50%"));

    let tracks = state.get_tracks(11, 1, 0, 0).unwrap();
    assert_eq!(tracks.len(), 2);
    let face = tracks.iter().find(|t| t.track_type == "FACE").unwrap();
    assert_eq!(face.detections.len(), 1);
}

#[test]
fn test_untouched_tracks_are_left_alone() {
    let job = job(Action::new("FACE ACTION", "FACECV"));
    let properties = JobPropertyStore::new(&job, BTreeMap::new());
    let state = InMemoryJobStore::new();
    let track = Track::new(11, 1, 0, 0, "FACE").with_detections([detection(0, 10, 10, 20, 20)]);
    state.add_track(track.clone()).unwrap();

    let summary = GeometryTransformer::default()
        .transform_task(&job, 0, &properties, &state)
        .unwrap();
    assert_eq!(summary, Default::default());
    assert_eq!(state.get_tracks(11, 1, 0, 0).unwrap().into_iter().collect::<Vec<_>>(), vec![track]);
}

#[test]
fn test_pad_detection_rejects_malformed_values() {
    let d = detection(0, 10, 10, 20, 20);
    assert!(pad_detection("10px", "0", 640, 480, &d).is_err());
    assert!(pad_detection("0", "%", 640, 480, &d).is_err());
    assert!(pad_detection("", " ", 640, 480, &d).is_ok());
}
