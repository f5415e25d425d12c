//! wgpu implementation of the command submission interface
//!
//! One compute pipeline per protocol entry point, each with an explicit bind
//! group layout. Scalar arguments live in one uniform per kernel which is
//! rewritten before every dispatch; queue ordering guarantees the write lands
//! before the dispatch that reads it.

use bytemuck::Zeroable;
use std::num::NonZeroU64;
use std::sync::Arc;
use wgpu::util::DeviceExt;

use crate::error::{api_error, ApiStatus, HarnessResult};
use crate::gpu::context::GpuContext;
use crate::gpu::device::ComputeDevice;
use crate::gpu::kernels::{
    CorrelationParams, Dispatch, Kernel, MomentParams, RunParams, ThroughputParams, CORRELATION_PARAMS_BINDING,
    MOMENT_PARAMS_BINDING, OUTPUT_BINDING, RUN_GROUP, RUN_PARAMS_BINDING, THROUGHPUT_PARAMS_BINDING,
    THROUGHPUT_SINK_BINDING,
};
use crate::gpu::program::{EntryPoint, Program};

const CELL_BYTES: u64 = std::mem::size_of::<f32>() as u64;

struct KernelPipeline {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    workgroup_size: [u32; 3],
}

/// Device half of the shared output region
pub struct DeviceOutput {
    storage: wgpu::Buffer,
    staging: wgpu::Buffer,
    lanes: u32,
    moment_bind_group: wgpu::BindGroup,
    correlation_bind_group: wgpu::BindGroup,
}

pub struct WgpuDevice {
    context: GpuContext,

    throughput: KernelPipeline,
    moment: KernelPipeline,
    correlation: KernelPipeline,

    throughput_params: wgpu::Buffer,
    moment_params: wgpu::Buffer,
    correlation_params: wgpu::Buffer,

    throughput_bind_group: wgpu::BindGroup,
    run_bind_group: wgpu::BindGroup,
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_buffer<T: bytemuck::Pod>(device: &wgpu::Device, label: &str, value: &T) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(value),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

impl WgpuDevice {
    /// Compile `program` on the device and build the three kernel pipelines
    pub fn new(context: GpuContext, program: &Program, seed: u32) -> HarnessResult<Self> {
        let throughput_entry = program.entry_point(Kernel::Throughput.entry_point())?;
        let moment_entry = program.entry_point(Kernel::Moment.entry_point())?;
        let correlation_entry = program.entry_point(Kernel::Correlation.entry_point())?;
        check_workgroup_shape(Kernel::Throughput, &throughput_entry)?;
        check_workgroup_shape(Kernel::Moment, &moment_entry)?;
        check_workgroup_shape(Kernel::Correlation, &correlation_entry)?;

        let shader = context.scoped("create_shader_module", |device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Randomness Kernels"),
                source: wgpu::ShaderSource::Wgsl(program.source().into()),
            })
        })?;

        let run_layout = context.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Run Bind Group Layout"),
            entries: &[uniform_entry(RUN_PARAMS_BINDING)],
        });

        let build = |kernel: Kernel, workgroup_size: [u32; 3], entries: &[wgpu::BindGroupLayoutEntry]| {
            context.scoped("create_compute_pipeline", |device| {
                let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&format!("{} Bind Group Layout", kernel)),
                    entries,
                });
                let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(&format!("{} Pipeline Layout", kernel)),
                    bind_group_layouts: &[&layout, &run_layout],
                    push_constant_ranges: &[],
                });
                let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(&format!("{} Pipeline", kernel)),
                    layout: Some(&pipeline_layout),
                    module: &shader,
                    entry_point: kernel.entry_point(),
                });
                KernelPipeline {
                    pipeline,
                    layout,
                    workgroup_size,
                }
            })
        };

        let throughput = build(
            Kernel::Throughput,
            throughput_entry.workgroup_size,
            &[uniform_entry(THROUGHPUT_PARAMS_BINDING), storage_entry(THROUGHPUT_SINK_BINDING)],
        )?;
        let moment = build(
            Kernel::Moment,
            moment_entry.workgroup_size,
            &[storage_entry(OUTPUT_BINDING), uniform_entry(MOMENT_PARAMS_BINDING)],
        )?;
        let correlation = build(
            Kernel::Correlation,
            correlation_entry.workgroup_size,
            &[storage_entry(OUTPUT_BINDING), uniform_entry(CORRELATION_PARAMS_BINDING)],
        )?;

        let device = &context.device;
        let throughput_params = uniform_buffer(device, "Throughput Params", &ThroughputParams::zeroed());
        let moment_params = uniform_buffer(device, "Moment Params", &MomentParams::zeroed());
        let correlation_params = uniform_buffer(device, "Correlation Params", &CorrelationParams::zeroed());
        let run_params = uniform_buffer(
            device,
            "Run Params",
            &RunParams {
                seed,
                _padding: [0; 3],
            },
        );

        // Keeps the throughput kernel's accumulator observable
        let sink = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Throughput Sink"),
            size: CELL_BYTES,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let throughput_bind_group = context.scoped("create_bind_group", |device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Throughput Bind Group"),
                layout: &throughput.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: THROUGHPUT_PARAMS_BINDING,
                        resource: throughput_params.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: THROUGHPUT_SINK_BINDING,
                        resource: sink.as_entire_binding(),
                    },
                ],
            })
        })?;

        let run_bind_group = context.scoped("create_bind_group", |device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Run Bind Group"),
                layout: &run_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: RUN_PARAMS_BINDING,
                    resource: run_params.as_entire_binding(),
                }],
            })
        })?;

        log::info!(
            "[WgpuDevice] Pipelines ready (workgroups: speed_test {:?}, test_moment {:?}, test_correlation {:?}, seed {:#010x})",
            throughput.workgroup_size,
            moment.workgroup_size,
            correlation.workgroup_size,
            seed
        );

        Ok(Self {
            context,
            throughput,
            moment,
            correlation,
            throughput_params,
            moment_params,
            correlation_params,
            throughput_bind_group,
            run_bind_group,
        })
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    fn pipeline(&self, kernel: Kernel) -> &KernelPipeline {
        match kernel {
            Kernel::Throughput => &self.throughput,
            Kernel::Moment => &self.moment,
            Kernel::Correlation => &self.correlation,
        }
    }

    fn output_bind_group(
        &self,
        kernel: Kernel,
        storage: &wgpu::Buffer,
        lanes: u32,
        params: &wgpu::Buffer,
        params_binding: u32,
    ) -> HarnessResult<wgpu::BindGroup> {
        let bound_bytes = NonZeroU64::new(lanes as u64 * CELL_BYTES)
            .ok_or_else(|| api_error("create_bind_group", ApiStatus::InvalidWorkSize, "zero lanes"))?;

        self.context.scoped("create_bind_group", |device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{} Output Bind Group", kernel)),
                layout: &self.pipeline(kernel).layout,
                entries: &[
                    // Only the lanes are visible to the kernel, never the padding
                    wgpu::BindGroupEntry {
                        binding: OUTPUT_BINDING,
                        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer: storage,
                            offset: 0,
                            size: Some(bound_bytes),
                        }),
                    },
                    wgpu::BindGroupEntry {
                        binding: params_binding,
                        resource: params.as_entire_binding(),
                    },
                ],
            })
        })
    }
}

impl ComputeDevice for WgpuDevice {
    type Output = DeviceOutput;

    fn max_lanes(&self, kernel: Kernel) -> HarnessResult<u32> {
        let declared: u32 = self.pipeline(kernel).workgroup_size.iter().product();
        let limit = self.context.device.limits().max_compute_invocations_per_workgroup;
        if declared > limit {
            log::warn!(
                "[WgpuDevice] {} declares {} invocations per workgroup, device allows {}",
                kernel,
                declared,
                limit
            );
        }
        Ok(declared.min(limit))
    }

    fn create_output(&self, lanes: u32, capacity: u32) -> HarnessResult<DeviceOutput> {
        if lanes == 0 || lanes > capacity {
            return Err(api_error(
                "create_output",
                ApiStatus::InvalidWorkSize,
                format!("{} lanes in a {}-cell region", lanes, capacity),
            ));
        }

        let (storage, staging) = self.context.scoped("create_buffer", |device| {
            let storage = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Reduction Output Buffer"),
                size: capacity as u64 * CELL_BYTES,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });
            let staging = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Reduction Staging Buffer"),
                size: lanes as u64 * CELL_BYTES,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            (storage, staging)
        })?;

        let moment_bind_group =
            self.output_bind_group(Kernel::Moment, &storage, lanes, &self.moment_params, MOMENT_PARAMS_BINDING)?;
        let correlation_bind_group = self.output_bind_group(
            Kernel::Correlation,
            &storage,
            lanes,
            &self.correlation_params,
            CORRELATION_PARAMS_BINDING,
        )?;

        Ok(DeviceOutput {
            storage,
            staging,
            lanes,
            moment_bind_group,
            correlation_bind_group,
        })
    }

    fn bind(&self, dispatch: &Dispatch<'_, DeviceOutput>) -> HarnessResult<()> {
        let kernel = dispatch.kernel();
        let global_size = dispatch.global_size();
        let max_lanes = self.max_lanes(kernel)?;
        if kernel != Kernel::Throughput && global_size > max_lanes {
            return Err(api_error(
                "enqueue kernel",
                ApiStatus::InvalidWorkSize,
                format!("{} lanes exceed {} supported by {}", global_size, max_lanes, kernel),
            ));
        }

        let (params, bytes) = match *dispatch {
            Dispatch::Throughput { mode, sample_count } => {
                let params = ThroughputParams {
                    mode,
                    sample_count,
                    _padding: [0; 2],
                };
                (&self.throughput_params, bytemuck::bytes_of(&params).to_vec())
            }
            Dispatch::Moment {
                output,
                order,
                mode,
                samples_per_lane,
                lanes,
            } => {
                check_bound_lanes("enqueue kernel", output, lanes)?;
                let params = MomentParams {
                    order,
                    mode,
                    samples_per_lane,
                    _padding: 0,
                };
                (&self.moment_params, bytemuck::bytes_of(&params).to_vec())
            }
            Dispatch::Correlation {
                output,
                mode,
                samples_per_lane,
                lanes,
            } => {
                check_bound_lanes("enqueue kernel", output, lanes)?;
                let params = CorrelationParams {
                    mode,
                    samples_per_lane,
                    _padding: [0; 2],
                };
                (&self.correlation_params, bytemuck::bytes_of(&params).to_vec())
            }
        };

        self.context.scoped("set kernel arg", |_| {
            self.context.queue.write_buffer(params, 0, &bytes);
        })
    }

    fn enqueue(&self, dispatch: &Dispatch<'_, DeviceOutput>) -> HarnessResult<()> {
        let kernel = dispatch.kernel();
        let global_size = dispatch.global_size();
        let bind_group = match dispatch {
            Dispatch::Throughput { .. } => &self.throughput_bind_group,
            Dispatch::Moment { output, .. } => &output.moment_bind_group,
            Dispatch::Correlation { output, .. } => &output.correlation_bind_group,
        };

        let pipeline = self.pipeline(kernel);
        // Workgroups are one-dimensional, checked when the pipeline was built
        let workgroups = global_size.div_ceil(pipeline.workgroup_size[0]);

        log::debug!(
            "[WgpuDevice] Enqueue {} with {} lane(s) in {} workgroup(s)",
            kernel,
            global_size,
            workgroups
        );

        self.context.scoped("enqueue kernel", |device| {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&format!("{} Dispatch", kernel)),
            });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(kernel.entry_point()),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&pipeline.pipeline);
                pass.set_bind_group(0, bind_group, &[]);
                pass.set_bind_group(RUN_GROUP, &self.run_bind_group, &[]);
                pass.dispatch_workgroups(workgroups, 1, 1);
            }
            self.context.queue.submit(std::iter::once(encoder.finish()));
        })
    }

    fn finish(&self) -> HarnessResult<()> {
        self.context.wait_idle();
        Ok(())
    }

    fn read_back(&self, output: &DeviceOutput, dst: &mut [f32]) -> HarnessResult<()> {
        check_bound_lanes("enqueue read buffer", output, dst.len() as u32)?;
        let bytes = output.lanes as u64 * CELL_BYTES;

        self.context.scoped("enqueue read buffer", |device| {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Reduction Read Back"),
            });
            encoder.copy_buffer_to_buffer(&output.storage, 0, &output.staging, 0, bytes);
            self.context.queue.submit(std::iter::once(encoder.finish()));
        })?;

        let slice = output.staging.slice(..bytes);
        let (tx, rx) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result); // Ignore send error if receiver dropped
        });
        self.context.wait_idle();

        pollster::block_on(rx)
            .map_err(|_| api_error("map_async", ApiStatus::BufferMap, "channel closed while waiting for buffer map"))?
            .map_err(|e| api_error("map_async", ApiStatus::BufferMap, e))?;

        {
            let view = slice.get_mapped_range();
            dst.copy_from_slice(bytemuck::cast_slice(&view));
        }
        output.staging.unmap();
        Ok(())
    }
}

fn check_bound_lanes(call: &'static str, output: &DeviceOutput, lanes: u32) -> HarnessResult<()> {
    if lanes != output.lanes {
        return Err(api_error(
            call,
            ApiStatus::InvalidWorkSize,
            format!("{} lanes requested, output region binds {}", lanes, output.lanes),
        ));
    }
    Ok(())
}

/// Dispatches are one-dimensional, and the throughput kernel runs on
/// exactly one lane
fn check_workgroup_shape(kernel: Kernel, entry: &EntryPoint) -> HarnessResult<()> {
    let [x, y, z] = entry.workgroup_size;
    let one_dimensional = y == 1 && z == 1;
    let single_lane = kernel != Kernel::Throughput || x == 1;
    if x == 0 || !one_dimensional || !single_lane {
        return Err(api_error(
            "create_compute_pipeline",
            ApiStatus::InvalidWorkSize,
            format!("{} declares unsupported workgroup size {:?}", kernel, entry.workgroup_size),
        ));
    }
    Ok(())
}

impl std::fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("adapter", &self.context.adapter_info.name)
            .field("device", &Arc::as_ptr(&self.context.device))
            .finish()
    }
}
