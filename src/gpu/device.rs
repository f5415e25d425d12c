use crate::error::HarnessResult;
use crate::gpu::kernels::{Dispatch, Kernel};

/// Command submission interface the harnesses drive
///
/// Calls execute in submission order on a single queue. `bind` and `enqueue`
/// never wait for the device; `finish` and `read_back` block until it has
/// drained.
pub trait ComputeDevice {
    /// Device-side half of the shared output region
    type Output;

    /// Largest number of lanes one dispatch of `kernel` may use
    fn max_lanes(&self, kernel: Kernel) -> HarnessResult<u32>;

    /// Create the device region backing `capacity` cells, of which the first
    /// `lanes` are bound to the reduction kernels
    fn create_output(&self, lanes: u32, capacity: u32) -> HarnessResult<Self::Output>;

    /// Validate `dispatch` against the kernel's capacity and write its
    /// arguments to the kernel's bindings
    fn bind(&self, dispatch: &Dispatch<'_, Self::Output>) -> HarnessResult<()>;

    /// Submit a dispatch whose arguments are already bound
    fn enqueue(&self, dispatch: &Dispatch<'_, Self::Output>) -> HarnessResult<()>;

    fn dispatch(&self, dispatch: Dispatch<'_, Self::Output>) -> HarnessResult<()> {
        self.bind(&dispatch)?;
        self.enqueue(&dispatch)
    }

    /// Block until every submitted dispatch has completed
    fn finish(&self) -> HarnessResult<()>;

    /// Blocking copy of the bound lanes into `dst`; `dst.len()` is the lane count
    fn read_back(&self, output: &Self::Output, dst: &mut [f32]) -> HarnessResult<()>;
}
