//! Benchmark and reduction harnesses
//!
//! The sections run strictly one after another on a single queue. The
//! reduction sections share one output buffer, allocated after the device
//! is ready and released when this module's `run` returns.

pub mod aggregate;
pub mod budget;
pub mod correlation;
pub mod moments;
pub mod report;
pub mod timing;

pub use aggregate::lane_mean;
pub use budget::{SampleBudget, DEFAULT_SAMPLE_COUNT};
pub use correlation::run_correlation;
pub use moments::run_moments;
pub use report::{CollectingSink, ReportSink, ResultRecord, TimingRecord};
pub use timing::run_timing;

use crate::error::HarnessResult;
use crate::gpu::device::ComputeDevice;
use crate::gpu::program::{load_source, Program};
use crate::memory::OutputBuffer;
use crate::BenchConfig;

/// Load and build the kernel program, connect a device, then run every
/// enabled section.
///
/// `connect` is only called once the program has built, so source and build
/// failures never touch the device.
pub fn run<D, F>(config: &BenchConfig, connect: F, sink: &mut dyn ReportSink) -> HarnessResult<()>
where
    D: ComputeDevice,
    F: FnOnce(&Program) -> HarnessResult<D>,
{
    let source = load_source(&config.kernel_path)?;
    let program = Program::from_wgsl(&source)?;
    let device = connect(&program)?;

    let sections = config.sections;
    if sections.timing {
        run_timing(&device, &config.budget, sink)?;
    }

    if sections.moments || sections.correlation {
        let mut output = OutputBuffer::allocate(&device)?;
        let samples_per_lane = config.budget.samples_per_lane(output.lane_count());

        if sections.moments {
            run_moments(&device, &mut output, samples_per_lane, sink)?;
        }
        if sections.correlation {
            run_correlation(&device, &mut output, samples_per_lane, sink)?;
        }
    }

    log::info!("[Harness] All sections complete");
    Ok(())
}
