//! Kernel program loading
//!
//! Source is parsed and validated on the host with naga before any device is
//! touched, so build failures surface with the complete diagnostic log.

use std::path::Path;
use wgpu::naga;

use crate::error::{HarnessError, HarnessResult};

/// Read kernel source text from disk
pub fn load_source(path: &Path) -> HarnessResult<String> {
    let source = std::fs::read_to_string(path).map_err(|source| HarnessError::SourceLoad {
        path: path.to_path_buf(),
        source,
    })?;

    log::info!("[Program] Loaded {} bytes of kernel source from {}", source.len(), path.display());
    Ok(source)
}

/// Compute entry point declared by the program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: String,
    pub workgroup_size: [u32; 3],
}

impl EntryPoint {
    /// Invocations in one workgroup
    pub fn lanes_per_group(&self) -> u32 {
        self.workgroup_size.iter().product()
    }
}

/// Validated kernel program
#[derive(Debug)]
pub struct Program {
    source: String,
    entry_points: Vec<EntryPoint>,
}

impl Program {
    /// Parse and validate WGSL source
    pub fn from_wgsl(source: &str) -> HarnessResult<Self> {
        let module = naga::front::wgsl::parse_str(source).map_err(|error| HarnessError::Build {
            log: error.emit_to_string(source),
        })?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|error| HarnessError::Build {
                log: validation_log(error.into_inner()),
            })?;

        let entry_points: Vec<EntryPoint> = module
            .entry_points
            .iter()
            .filter(|ep| ep.stage == naga::ShaderStage::Compute)
            .map(|ep| EntryPoint {
                name: ep.name.clone(),
                workgroup_size: ep.workgroup_size,
            })
            .collect();

        log::info!(
            "[Program] Built program with {} compute entry point(s): {}",
            entry_points.len(),
            entry_points.iter().map(|ep| ep.name.as_str()).collect::<Vec<_>>().join(", ")
        );

        Ok(Self {
            source: source.to_string(),
            entry_points,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn entry_points(&self) -> impl Iterator<Item = &EntryPoint> {
        self.entry_points.iter()
    }

    /// Look up a compute entry point by name
    pub fn entry_point(&self, name: &str) -> HarnessResult<&EntryPoint> {
        self.entry_points
            .iter()
            .find(|ep| ep.name == name)
            .ok_or_else(|| HarnessError::EntryPointNotFound { name: name.to_string() })
    }
}

/// Render a validation error with its whole cause chain
fn validation_log(error: naga::valid::ValidationError) -> String {
    let mut log = format!("error: {}\n", error);
    let mut cause = std::error::Error::source(&error);
    while let Some(inner) = cause {
        log.push_str(&format!("  caused by: {}\n", inner));
        cause = std::error::Error::source(inner);
    }
    log
}
