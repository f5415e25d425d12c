use std::time::Instant;

use crate::error::HarnessResult;
use crate::gpu::device::ComputeDevice;
use crate::gpu::kernels::Dispatch;
use crate::harness::budget::SampleBudget;
use crate::harness::report::{ReportSink, TimingRecord};
use crate::registry::GeneratorVariant;

/// Time one single-lane throughput dispatch per variant.
///
/// Arguments are bound before the clock starts, so the measured window is
/// submission plus generation on one lane until the queue drains. This is
/// latency, not device bandwidth.
pub fn run_timing<D: ComputeDevice>(
    device: &D,
    budget: &SampleBudget,
    sink: &mut dyn ReportSink,
) -> HarnessResult<Vec<TimingRecord>> {
    log::info!("[Timing] Timing {} samples on a single lane per variant", budget.total);

    let mut records = Vec::with_capacity(GeneratorVariant::ALL.len());
    for variant in GeneratorVariant::ALL {
        let dispatch = Dispatch::Throughput {
            mode: variant.mode(),
            sample_count: budget.total,
        };
        device.bind(&dispatch)?;

        let start = Instant::now();
        device.enqueue(&dispatch)?;
        device.finish()?;
        let elapsed = start.elapsed();

        let record = TimingRecord { variant, elapsed };
        sink.timing(&record);
        records.push(record);
    }
    sink.section_break();

    Ok(records)
}
