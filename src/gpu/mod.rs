//! Compute device access
//!
//! Program loading, the kernel argument protocol, and the wgpu backend behind
//! the `ComputeDevice` interface the harnesses drive.

pub mod context;
pub mod device;
pub mod kernels;
pub mod program;
pub mod wgpu_device;

pub use context::GpuContext;
pub use device::ComputeDevice;
pub use kernels::{Dispatch, Kernel};
pub use program::{load_source, EntryPoint, Program};
pub use wgpu_device::{DeviceOutput, WgpuDevice};
