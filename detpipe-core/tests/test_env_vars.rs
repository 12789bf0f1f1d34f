use detpipe_core::config::EngineConfig;
use detpipe_core::constants::{FRAME_RATE_CAP, MERGE_TRACKS, TARGET_SEGMENT_LENGTH};
use std::env;

const VARS: [&str; 5] = [
    "DETPIPE_TARGET_SEGMENT_LENGTH",
    "DETPIPE_FRAME_RATE_CAP",
    "DETPIPE_MERGE_TRACKS",
    "DETPIPE_TRACK_OVERLAP_THRESHOLD",
    "DETPIPE_ILLFORMED_EXEMPT_TYPES",
];

fn clear_vars() {
    for var in VARS {
        // SAFETY: this is the only test in this binary touching the environment.
        unsafe { env::remove_var(var) };
    }
}

#[test]
fn test_env_var_overrides() {
    clear_vars();

    let defaults = EngineConfig::default();
    assert_eq!(defaults.segmenting.target_segment_length, 5000);
    assert!(!defaults.track_merging.merge_tracks);

    // SAFETY: see clear_vars.
    unsafe {
        env::set_var("DETPIPE_TARGET_SEGMENT_LENGTH", "750");
        env::set_var("DETPIPE_FRAME_RATE_CAP", "5");
        env::set_var("DETPIPE_MERGE_TRACKS", "TRUE");
        env::set_var("DETPIPE_TRACK_OVERLAP_THRESHOLD", "0.25");
        env::set_var("DETPIPE_ILLFORMED_EXEMPT_TYPES", "SPEECH, TEXT");
    }

    let config = EngineConfig::default();
    assert_eq!(config.segmenting.target_segment_length, 750);
    assert_eq!(config.segmenting.frame_rate_cap, 5);
    assert!(config.track_merging.merge_tracks);
    assert_eq!(config.track_merging.track_overlap_threshold, 0.25);
    assert!(config.is_exempt_from_illformed_removal("text"));

    let system = config.system_properties();
    assert_eq!(system[TARGET_SEGMENT_LENGTH], "750");
    assert_eq!(system[FRAME_RATE_CAP], "5");
    assert_eq!(system[MERGE_TRACKS], "true");

    // Unparsable values fall back to the defaults.
    unsafe { env::set_var("DETPIPE_TARGET_SEGMENT_LENGTH", "lots") };
    assert_eq!(EngineConfig::default().segmenting.target_segment_length, 5000);

    clear_vars();
}
