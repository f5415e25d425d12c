use crate::error::HarnessResult;
use crate::gpu::device::ComputeDevice;
use crate::gpu::kernels::Dispatch;
use crate::harness::aggregate::lane_mean;
use crate::harness::report::{ReportSink, ResultRecord};
use crate::memory::OutputBuffer;
use crate::registry::{GeneratorVariant, MomentOrder, Statistic};

/// Reduce every (variant, moment order) pair into one scalar.
///
/// Variants form the outer loop and moment orders the inner one. Each
/// dispatch is drained and read back before the next rebinds the shared
/// buffer.
pub fn run_moments<D: ComputeDevice>(
    device: &D,
    output: &mut OutputBuffer<D::Output>,
    samples_per_lane: u32,
    sink: &mut dyn ReportSink,
) -> HarnessResult<Vec<ResultRecord>> {
    let lanes = output.lane_count();
    log::info!(
        "[Moments] {} lanes x {} samples per lane",
        lanes,
        samples_per_lane
    );

    let mut records = Vec::with_capacity(GeneratorVariant::ALL.len() * MomentOrder::ALL.len());
    for variant in GeneratorVariant::ALL {
        for order in MomentOrder::ALL {
            device.dispatch(Dispatch::Moment {
                output: output.device(),
                order: order.ordinal(),
                mode: variant.mode(),
                samples_per_lane,
                lanes: lanes as u32,
            })?;
            device.finish()?;

            let cells = output.read_back(device)?;
            let value = lane_mean(cells, lanes);
            log::debug!("[Moments] {} {} = {}", variant, order, value);

            let record = ResultRecord {
                variant,
                statistic: Statistic::Moment(order),
                value,
            };
            sink.result(&record);
            records.push(record);
        }
        sink.section_break();
    }

    Ok(records)
}
