use crate::error::HarnessResult;
use crate::gpu::device::ComputeDevice;
use crate::gpu::kernels::Dispatch;
use crate::harness::aggregate::lane_mean;
use crate::harness::report::{ReportSink, ResultRecord};
use crate::memory::OutputBuffer;
use crate::registry::{GeneratorVariant, Statistic};

/// Reduce each variant's serial correlation into one scalar
pub fn run_correlation<D: ComputeDevice>(
    device: &D,
    output: &mut OutputBuffer<D::Output>,
    samples_per_lane: u32,
    sink: &mut dyn ReportSink,
) -> HarnessResult<Vec<ResultRecord>> {
    let lanes = output.lane_count();
    log::info!("[Correlation] {} lanes x {} samples per lane", lanes, samples_per_lane);

    let mut records = Vec::with_capacity(GeneratorVariant::ALL.len());
    for variant in GeneratorVariant::ALL {
        device.dispatch(Dispatch::Correlation {
            output: output.device(),
            mode: variant.mode(),
            samples_per_lane,
            lanes: lanes as u32,
        })?;
        device.finish()?;

        let value = lane_mean(output.read_back(device)?, lanes);
        let record = ResultRecord {
            variant,
            statistic: Statistic::Correlation,
            value,
        };
        sink.result(&record);
        records.push(record);
    }
    sink.section_break();

    Ok(records)
}
