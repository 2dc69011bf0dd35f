//! Frame graph configuration.

/// Number of frames in flight used when none is configured.
pub const DEFAULT_FRAME_COUNT: usize = 2;

/// Configuration for a [`FrameGraph`](crate::FrameGraph).
///
/// # Example
///
/// ```ignore
/// let config = FrameGraphConfig::default()
///     .with_frame_count(3)
///     .with_trace_schedule(true);
/// let graph = FrameGraph::new(device, views, config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGraphConfig {
    /// Copies allocated for buffered resources.
    pub frame_count: usize,
    /// Transition a resource straight into the combined state of consecutive
    /// graphics-queue reads instead of once per reader.
    pub merge_graphics_reads: bool,
    /// Log every compiled schedule at debug level.
    pub trace_schedule: bool,
}

impl Default for FrameGraphConfig {
    fn default() -> Self {
        Self {
            frame_count: DEFAULT_FRAME_COUNT,
            merge_graphics_reads: true,
            trace_schedule: false,
        }
    }
}

impl FrameGraphConfig {
    /// Set the number of frames in flight. Clamped to at least 1.
    pub fn with_frame_count(mut self, frame_count: usize) -> Self {
        self.frame_count = frame_count.max(1);
        self
    }

    /// Enable or disable graphics read merging.
    pub fn with_merge_graphics_reads(mut self, merge: bool) -> Self {
        self.merge_graphics_reads = merge;
        self
    }

    /// Enable or disable schedule tracing.
    pub fn with_trace_schedule(mut self, trace: bool) -> Self {
        self.trace_schedule = trace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FrameGraphConfig::default();
        assert_eq!(config.frame_count, DEFAULT_FRAME_COUNT);
        assert!(config.merge_graphics_reads);
        assert!(!config.trace_schedule);
    }

    #[test]
    fn test_frame_count_is_clamped() {
        let config = FrameGraphConfig::default().with_frame_count(0);
        assert_eq!(config.frame_count, 1);
    }
}
