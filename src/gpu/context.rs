use std::sync::Arc;

use crate::error::{api_error, ApiStatus, HarnessResult};

/// Process-wide device and queue, acquired once at startup
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    pub fn acquire() -> HarnessResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| {
            api_error(
                "request_adapter",
                ApiStatus::AdapterUnavailable,
                "no adapter supports compute on this system",
            )
        })?;

        let adapter_info = adapter.get_info();
        log::info!(
            "[GpuContext] Using adapter {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.backend,
            adapter_info.device_type
        );

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Randomness Harness Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|e| api_error("request_device", ApiStatus::DeviceRequest, e))?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
        })
    }

    /// Run `f` inside validation and out-of-memory error scopes
    ///
    /// A captured `wgpu::Error` becomes an API error naming `call`.
    pub fn scoped<T>(&self, call: &'static str, f: impl FnOnce(&wgpu::Device) -> T) -> HarnessResult<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let value = f(&self.device);

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        match validation.or(out_of_memory) {
            Some(error) => {
                log::error!("[GpuContext] {} failed: {}", call, error);
                Err(api_error(call, ApiStatus::from(&error), error))
            }
            None => Ok(value),
        }
    }

    /// Block until all submitted work has completed
    pub fn wait_idle(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }
}
