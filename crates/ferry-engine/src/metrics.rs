//! Per-decode performance metrics.
//!
//! [`DecodeMetrics`] captures timing and memory data for one batch so
//! hosts can log or aggregate it.

/// Timing and memory metrics collected during a single decode.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeMetrics {
    /// Time spent planning, placing and committing the arena layout.
    pub commit_us: u64,
    /// Time spent inside the guest's decode export.
    pub call_us: u64,
    /// Wall-clock time for the whole batch, from declaration to a
    /// resolved result view.
    pub total_us: u64,
    /// Bytes the guest memory grew by during the batch, host and guest
    /// growth combined.
    pub grown_bytes: usize,
    /// Whether the guest grew its memory during the call.
    pub guest_grew: bool,
    /// Length of the decoded output in bytes.
    pub output_bytes: u32,
    /// Whether the batch reused the existing scratch region.
    pub scratch_reused: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = DecodeMetrics::default();
        assert_eq!(m.commit_us, 0);
        assert_eq!(m.call_us, 0);
        assert_eq!(m.total_us, 0);
        assert_eq!(m.grown_bytes, 0);
        assert!(!m.guest_grew);
        assert_eq!(m.output_bytes, 0);
        assert!(!m.scratch_reused);
    }
}
