/// Total samples requested from each reduction dispatch
pub const DEFAULT_SAMPLE_COUNT: u32 = 500_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleBudget {
    pub total: u32,
}

impl Default for SampleBudget {
    fn default() -> Self {
        Self {
            total: DEFAULT_SAMPLE_COUNT,
        }
    }
}

impl SampleBudget {
    pub fn new(total: u32) -> Self {
        Self { total }
    }

    /// Samples each lane accumulates before emitting its partial statistic.
    ///
    /// `total / lanes + 1`, which over-provisions by one lane-round even when
    /// the division is exact.
    pub fn samples_per_lane(&self, lane_count: usize) -> u32 {
        debug_assert!(lane_count > 0);
        (self.total as usize / lane_count.max(1)) as u32 + 1
    }
}
