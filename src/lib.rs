//! Throughput and moment checks for Gaussian generators on a compute device.
//!
//! Three generator variants (hexagonal Marsaglia polar, Marsaglia polar,
//! Box-Muller) are timed on a single lane, then reduced across every lane the
//! device can schedule into mean, variance, skewness and serial correlation.

pub mod error;
pub mod gpu;
pub mod harness;
pub mod memory;
pub mod registry;

use std::path::PathBuf;

pub use error::{ApiStatus, HarnessError, HarnessResult};
pub use gpu::{ComputeDevice, GpuContext, Program, WgpuDevice};
pub use harness::{run, ReportSink, ResultRecord, SampleBudget, TimingRecord};
pub use memory::OutputBuffer;
pub use registry::{GeneratorVariant, MomentOrder, Statistic};

/// Kernel library loaded when no path is given
pub const DEFAULT_KERNEL_PATH: &str = "kernels/randomness.wgsl";

/// Harness sections compiled into this build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sections {
    pub timing: bool,
    pub moments: bool,
    pub correlation: bool,
}

impl Sections {
    pub const ALL: Sections = Sections {
        timing: true,
        moments: true,
        correlation: true,
    };
}

impl Default for Sections {
    fn default() -> Self {
        Self {
            timing: cfg!(feature = "speed-test"),
            moments: cfg!(feature = "moment-tests"),
            correlation: cfg!(feature = "correlation-test"),
        }
    }
}

/// Main harness configuration
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub kernel_path: PathBuf,
    pub budget: SampleBudget,
    pub sections: Sections,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            kernel_path: PathBuf::from(DEFAULT_KERNEL_PATH),
            budget: SampleBudget::default(),
            sections: Sections::default(),
        }
    }
}

impl BenchConfig {
    pub fn with_kernel_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.kernel_path = path.into();
        self
    }

    pub fn with_sections(mut self, sections: Sections) -> Self {
        self.sections = sections;
        self
    }
}
