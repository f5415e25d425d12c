//! Shared output region for the reduction harnesses
//!
//! One host region and one device region, sized to the lane capacity both
//! reduction kernels can schedule in a single dispatch. The host side is
//! over-allocated to a multiple of 64 cells; only the first `lane_count`
//! cells are ever bound, read back or aggregated.

use crate::error::{api_error, ApiStatus, HarnessResult};
use crate::gpu::device::ComputeDevice;
use crate::gpu::kernels::Kernel;
use crate::memory::aligned::PageAlignedCells;

/// Host allocation granularity in cells
pub const CAPACITY_GRANULE: usize = 64;

/// Smallest multiple of 64 that holds `lane_count` cells
pub fn padded_capacity(lane_count: usize) -> usize {
    lane_count.div_ceil(CAPACITY_GRANULE) * CAPACITY_GRANULE
}

pub struct OutputBuffer<O> {
    lane_count: usize,
    host: PageAlignedCells,
    device: O,
}

impl<O> OutputBuffer<O> {
    /// Size the region to `device`'s lane capacity and allocate both halves
    pub fn allocate<D>(device: &D) -> HarnessResult<Self>
    where
        D: ComputeDevice<Output = O>,
    {
        let moment_lanes = device.max_lanes(Kernel::Moment)?;
        let correlation_lanes = device.max_lanes(Kernel::Correlation)?;
        let lane_count = moment_lanes.min(correlation_lanes);
        if lane_count == 0 {
            return Err(api_error(
                "get work group size",
                ApiStatus::InvalidWorkSize,
                "reduction kernels report zero schedulable lanes",
            ));
        }

        let capacity = padded_capacity(lane_count as usize);
        log::info!(
            "[OutputBuffer] {} lanes (test_moment {}, test_correlation {}), {} cells allocated",
            lane_count,
            moment_lanes,
            correlation_lanes,
            capacity
        );

        let host = PageAlignedCells::new(capacity)?;
        let device = device.create_output(lane_count, capacity as u32)?;

        Ok(Self {
            lane_count: lane_count as usize,
            host,
            device,
        })
    }

    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    pub fn padded_capacity(&self) -> usize {
        self.host.len()
    }

    pub fn device(&self) -> &O {
        &self.device
    }

    /// The whole host array, padding included
    pub fn cells(&self) -> &[f32] {
        self.host.as_slice()
    }

    pub fn cells_mut(&mut self) -> &mut [f32] {
        self.host.as_mut_slice()
    }

    /// Host cells written by the last read-back
    pub fn lanes(&self) -> &[f32] {
        &self.host.as_slice()[..self.lane_count]
    }

    /// Blocking read-back of exactly `lane_count` cells into the host region
    pub fn read_back<D>(&mut self, device: &D) -> HarnessResult<&[f32]>
    where
        D: ComputeDevice<Output = O>,
    {
        let lanes = self.lane_count;
        device.read_back(&self.device, &mut self.host.as_mut_slice()[..lanes])?;
        Ok(self.lanes())
    }
}

impl<O> std::fmt::Debug for OutputBuffer<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputBuffer")
            .field("lane_count", &self.lane_count)
            .field("padded_capacity", &self.host.len())
            .finish()
    }
}
