//! Host memory for device read-backs
//!
//! A page-aligned host region paired with the device buffer the reduction
//! kernels write into.

pub mod aligned;
pub mod output_buffer;

pub use aligned::{PageAlignedCells, PAGE_ALIGN};
pub use output_buffer::{padded_capacity, OutputBuffer, CAPACITY_GRANULE};
