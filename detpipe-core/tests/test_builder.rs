use detpipe_core::config::{EngineConfig, EngineConfigBuilder};
use detpipe_core::constants::*;

#[test]
fn test_builder_pattern() {
    let config = EngineConfigBuilder::new()
        .segment_lengths(400, 40)
        .vfr_segment_lengths(100, 10)
        .min_gap_between_segments(5)
        .sampling_interval(3)
        .confidence_threshold(0.4)
        .min_gap_between_tracks(6)
        .build();

    assert_eq!(config.segmenting.target_segment_length, 400);
    assert_eq!(config.segmenting.vfr_min_segment_length, 10);
    assert!(config.validate().is_ok());

    let system = config.system_properties();
    assert_eq!(system[TARGET_SEGMENT_LENGTH], "400");
    assert_eq!(system[MINIMUM_SEGMENT_LENGTH], "40");
    assert_eq!(system[VFR_TARGET_SEGMENT_LENGTH], "100");
    assert_eq!(system[MINIMUM_GAP_BETWEEN_SEGMENTS], "5");
    assert_eq!(system[MEDIA_SAMPLING_INTERVAL], "3");
    assert_eq!(system[CONFIDENCE_THRESHOLD], "0.4");
    assert_eq!(system[MIN_GAP_BETWEEN_TRACKS], "6");
}

#[test]
fn test_builder_starts_from_defaults() {
    assert_eq!(EngineConfigBuilder::new().build(), EngineConfig::default());
}

#[test]
fn test_builder_rejects_invalid_values_on_validate() {
    let config = EngineConfigBuilder::new().sampling_interval(0).build();
    assert!(config.validate().is_err());

    let config = EngineConfigBuilder::new().segment_lengths(100, 0).build();
    assert!(config.validate().is_err());
}
