// ============================================================================
// detpipe-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for EngineConfig
//
// Starts from the environment-aware defaults and lets callers override the
// individual system-level values with a fluent API.

use super::EngineConfig;

/// Builder for creating EngineConfig instances.
///
/// # Examples
///
/// ```rust
/// use detpipe_core::config::EngineConfigBuilder;
///
/// let config = EngineConfigBuilder::new()
///     .segment_lengths(200, 20)
///     .frame_rate_cap(5)
///     .confidence_threshold(0.5)
///     .build();
/// assert_eq!(config.segmenting.target_segment_length, 200);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Creates a new builder seeded with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the preferred segment length for constant frame rate video.
    ///
    /// # Arguments
    ///
    /// * `frames` - Target number of frames per segment; 0 or less disables splitting
    ///
    /// # Returns
    ///
    /// * The builder instance for method chaining
    pub fn target_segment_length(mut self, frames: i32) -> Self {
        self.config.segmenting.target_segment_length = frames;
        self
    }

    /// Sets both constant frame rate segment lengths.
    ///
    /// # Arguments
    ///
    /// * `target` - Target number of frames per segment
    /// * `minimum` - Shortest allowed trailing segment
    ///
    /// # Returns
    ///
    /// * The builder instance for method chaining
    pub fn segment_lengths(mut self, target: i32, minimum: i32) -> Self {
        self.config.segmenting.target_segment_length = target;
        self.config.segmenting.min_segment_length = minimum;
        self
    }

    /// Sets both variable frame rate segment lengths.
    pub fn vfr_segment_lengths(mut self, target: i32, minimum: i32) -> Self {
        self.config.segmenting.vfr_target_segment_length = target;
        self.config.segmenting.vfr_min_segment_length = minimum;
        self
    }

    /// Sets the gap below which neighbouring frame ranges are planned together.
    pub fn min_gap_between_segments(mut self, frames: i32) -> Self {
        self.config.segmenting.min_gap_between_segments = frames;
        self
    }

    /// Sets the default sampling interval.
    ///
    /// # Arguments
    ///
    /// * `interval` - Process every Nth frame
    ///
    /// # Returns
    ///
    /// * The builder instance for method chaining
    pub fn sampling_interval(mut self, interval: i32) -> Self {
        self.config.segmenting.sampling_interval = interval;
        self
    }

    /// Sets the default frame rate cap; -1 disables it.
    pub fn frame_rate_cap(mut self, cap: i32) -> Self {
        self.config.segmenting.frame_rate_cap = cap;
        self
    }

    /// Enables or disables track merging by default.
    pub fn merge_tracks(mut self, enabled: bool) -> Self {
        self.config.track_merging.merge_tracks = enabled;
        self
    }

    /// Sets the default maximum frame gap between merged tracks.
    pub fn min_gap_between_tracks(mut self, frames: i32) -> Self {
        self.config.track_merging.min_gap_between_tracks = frames;
        self
    }

    /// Sets the default minimum track length in frames.
    pub fn min_track_length(mut self, frames: i32) -> Self {
        self.config.track_merging.min_track_length = frames;
        self
    }

    /// Sets the overlap (intersection over union) required for a merge.
    ///
    /// # Arguments
    ///
    /// * `threshold` - Value in [0, 1]; overlap must be strictly greater
    ///
    /// # Returns
    ///
    /// * The builder instance for method chaining
    pub fn track_overlap_threshold(mut self, threshold: f64) -> Self {
        self.config.track_merging.track_overlap_threshold = threshold;
        self
    }

    /// Sets the default confidence threshold.
    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.config.detection.confidence_threshold = threshold;
        self
    }

    /// Sets the default detection padding specs.
    ///
    /// # Arguments
    ///
    /// * `x` - Horizontal padding such as "25%" or "-10"
    /// * `y` - Vertical padding
    ///
    /// # Returns
    ///
    /// * The builder instance for method chaining
    pub fn padding(mut self, x: &str, y: &str) -> Self {
        self.config.detection.padding_x = x.to_string();
        self.config.detection.padding_y = y.to_string();
        self
    }

    /// Replaces the track types exempt from ill-formed detection removal.
    pub fn illformed_exempt_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.detection.illformed_exempt_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> EngineConfig {
        self.config
    }
}
