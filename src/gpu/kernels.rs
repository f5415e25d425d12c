//! Kernel library protocol
//!
//! Entry point names, binding slots and the uniform layouts the host binds
//! before each dispatch. The field order of each params struct is the
//! kernel's argument order; the output buffer is always binding 0.

/// Entry points the harness needs from the kernel library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    Throughput,
    Moment,
    Correlation,
}

impl Kernel {
    pub fn entry_point(self) -> &'static str {
        match self {
            Kernel::Throughput => "speed_test",
            Kernel::Moment => "test_moment",
            Kernel::Correlation => "test_correlation",
        }
    }
}

impl std::fmt::Display for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.entry_point())
    }
}

// Binding slots in @group(0)
pub const OUTPUT_BINDING: u32 = 0;
pub const MOMENT_PARAMS_BINDING: u32 = 1;
pub const CORRELATION_PARAMS_BINDING: u32 = 2;
pub const THROUGHPUT_PARAMS_BINDING: u32 = 3;
pub const THROUGHPUT_SINK_BINDING: u32 = 4;

/// Group holding per-run state shared by every kernel
pub const RUN_GROUP: u32 = 1;
pub const RUN_PARAMS_BINDING: u32 = 0;

/// `speed_test` arguments: (generator mode, total sample count)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ThroughputParams {
    pub mode: u32,
    pub sample_count: u32,
    pub _padding: [u32; 2],
}

/// `test_moment` arguments after the output buffer: (moment order, generator mode, samples per lane)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MomentParams {
    pub order: u32,
    pub mode: u32,
    pub samples_per_lane: u32,
    pub _padding: u32,
}

/// `test_correlation` arguments after the output buffer: (generator mode, samples per lane)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CorrelationParams {
    pub mode: u32,
    pub samples_per_lane: u32,
    pub _padding: [u32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RunParams {
    pub seed: u32,
    pub _padding: [u32; 3],
}

/// One fully bound kernel invocation
#[derive(Debug)]
pub enum Dispatch<'a, O> {
    /// Single-lane generation of `sample_count` variates
    Throughput { mode: u32, sample_count: u32 },
    Moment {
        output: &'a O,
        order: u32,
        mode: u32,
        samples_per_lane: u32,
        lanes: u32,
    },
    Correlation {
        output: &'a O,
        mode: u32,
        samples_per_lane: u32,
        lanes: u32,
    },
}

impl<'a, O> Dispatch<'a, O> {
    pub fn kernel(&self) -> Kernel {
        match self {
            Dispatch::Throughput { .. } => Kernel::Throughput,
            Dispatch::Moment { .. } => Kernel::Moment,
            Dispatch::Correlation { .. } => Kernel::Correlation,
        }
    }

    /// Global problem size in lanes
    pub fn global_size(&self) -> u32 {
        match self {
            Dispatch::Throughput { .. } => 1,
            Dispatch::Moment { lanes, .. } | Dispatch::Correlation { lanes, .. } => *lanes,
        }
    }
}
