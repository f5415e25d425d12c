//! Harness error handling
//!
//! Every failure in the harness is fatal. The variants mirror the stage that
//! failed so the binary can report it and exit nonzero.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for harness operation results
pub type HarnessResult<T> = Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Could not load kernel source from {}: {source}", .path.display())]
    SourceLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not build program.\n{log}")]
    Build { log: String },

    #[error("Kernel entry point '{name}' not found in program")]
    EntryPointNotFound { name: String },

    #[error("{call} failed with status {}: {status}: {detail}", .status.code())]
    Api {
        call: &'static str,
        status: ApiStatus,
        detail: String,
    },

    #[error("Could not allocate memory for output buffer ({bytes} bytes, {align}-byte aligned)")]
    Allocation { bytes: usize, align: usize },
}

/// Status reported by a failing device call.
///
/// wgpu reports typed errors rather than status codes, so each class gets a
/// stable negative code for the diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApiStatus {
    #[error("no compatible adapter")]
    AdapterUnavailable,

    #[error("device request rejected")]
    DeviceRequest,

    #[error("validation error")]
    Validation,

    #[error("out of device memory")]
    OutOfMemory,

    #[error("buffer map failed")]
    BufferMap,

    #[error("invalid work size")]
    InvalidWorkSize,
}

impl ApiStatus {
    pub fn code(self) -> i32 {
        match self {
            ApiStatus::AdapterUnavailable => -1,
            ApiStatus::DeviceRequest => -2,
            ApiStatus::Validation => -3,
            ApiStatus::OutOfMemory => -4,
            ApiStatus::BufferMap => -5,
            ApiStatus::InvalidWorkSize => -6,
        }
    }
}

/// Create a device API error
pub fn api_error(call: &'static str, status: ApiStatus, detail: impl std::fmt::Display) -> HarnessError {
    HarnessError::Api {
        call,
        status,
        detail: detail.to_string(),
    }
}

impl From<&wgpu::Error> for ApiStatus {
    fn from(error: &wgpu::Error) -> Self {
        match error {
            wgpu::Error::OutOfMemory { .. } => ApiStatus::OutOfMemory,
            _ => ApiStatus::Validation,
        }
    }
}
