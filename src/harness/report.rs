use std::fmt;
use std::time::Duration;

use crate::registry::{GeneratorVariant, Statistic};

/// Wall-clock latency of one single-lane throughput dispatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingRecord {
    pub variant: GeneratorVariant,
    pub elapsed: Duration,
}

impl TimingRecord {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_nanos() as f64 / 1_000_000.0
    }
}

impl fmt::Display for TimingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} finished in {} ms.", self.variant, self.elapsed_ms())
    }
}

/// Aggregated statistic for one generator variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultRecord {
    pub variant: GeneratorVariant,
    pub statistic: Statistic,
    pub value: f32,
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} produced {} {}", self.variant, self.statistic, self.value)
    }
}

/// Receives records as the harness produces them
pub trait ReportSink {
    fn timing(&mut self, record: &TimingRecord);

    fn result(&mut self, record: &ResultRecord);

    /// End of a block of related records
    fn section_break(&mut self) {}
}

/// Collects records in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub timings: Vec<TimingRecord>,
    pub results: Vec<ResultRecord>,
    pub section_breaks: usize,
}

impl ReportSink for CollectingSink {
    fn timing(&mut self, record: &TimingRecord) {
        self.timings.push(*record);
    }

    fn result(&mut self, record: &ResultRecord) {
        self.results.push(*record);
    }

    fn section_break(&mut self) {
        self.section_breaks += 1;
    }
}
