use std::{iter, mem};

use shared::WORKGROUP_SIZE;
use wgpu::util::DeviceExt;

use super::ComputeBackend;
use crate::error::ResourceError;
use crate::params::Extent;

const VERTICES: &[[f32; 2]] = &[[-1.0, 1.0], [-1.0, -1.0], [1.0, -1.0], [1.0, 1.0]];

const INDICES: &[u16] = &[0, 1, 2, 0, 2, 3];

const SPIRV_MAGIC: u32 = 0x0723_0203;

#[derive(Clone, Copy, Debug)]
pub struct GpuOptions {
    pub power_preference: wgpu::PowerPreference,
    pub vsync: bool,
}

impl Default for GpuOptions {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            vsync: true,
        }
    }
}

/// The window surface frames are presented to.
pub struct WindowSurface {
    surface: wgpu::Surface,
    config: wgpu::SurfaceConfiguration,
}

impl WindowSurface {
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.config.width, self.config.height)
    }
}

struct CountBuffer {
    extent: Extent,
    _buffer: wgpu::Buffer,
    compute_group: wgpu::BindGroup,
    render_group: wgpu::BindGroup,
}

/// Runs the kernel as a compute pass writing escape counts to a storage
/// buffer, then colors them onto the surface with a full-screen quad.
pub struct GpuCompute {
    device: wgpu::Device,
    queue: wgpu::Queue,
    compute_layout: wgpu::BindGroupLayout,
    render_layout: wgpu::BindGroupLayout,
    compute_pipeline: wgpu::ComputePipeline,
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    counts: Option<CountBuffer>,
}

/// Wraps a SPIR-V binary produced by the shader crate.
pub fn spirv_shader(bytes: &[u8]) -> Result<wgpu::ShaderModuleDescriptor<'_>, ResourceError> {
    let magic = bytes
        .get(..4)
        .and_then(|word| word.try_into().ok())
        .map(u32::from_le_bytes);
    if bytes.len() % 4 != 0 || magic != Some(SPIRV_MAGIC) {
        return Err(ResourceError::Shader("not a SPIR-V module".into()));
    }

    Ok(wgpu::ShaderModuleDescriptor {
        label: Some("escape-time"),
        source: wgpu::util::make_spirv(bytes),
    })
}

/// The shader crate compiled by the build script.
#[cfg(feature = "spirv")]
pub fn embedded_shader() -> wgpu::ShaderModuleDescriptor<'static> {
    wgpu::include_spirv!(env!("shader.spv"))
}

fn counts_layout(
    device: &wgpu::Device,
    visibility: wgpu::ShaderStages,
    read_only: bool,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("escape counts"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

impl GpuCompute {
    /// Opens a device able to present to `surface`. The caller keeps the
    /// window behind `surface` alive for as long as the returned values.
    pub fn new(
        instance: &wgpu::Instance,
        surface: wgpu::Surface,
        shader: wgpu::ShaderModuleDescriptor<'_>,
        options: &GpuOptions,
    ) -> Result<(Self, WindowSurface), ResourceError> {
        pollster::block_on(Self::request(instance, surface, shader, options))
    }

    async fn request(
        instance: &wgpu::Instance,
        surface: wgpu::Surface,
        shader: wgpu::ShaderModuleDescriptor<'_>,
        options: &GpuOptions,
    ) -> Result<(Self, WindowSurface), ResourceError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ResourceError::DeviceUnavailable)?;
        log::info!("using adapter {:?}", adapter.get_info());

        let features = wgpu::Features::PUSH_CONSTANTS;
        let limits = wgpu::Limits {
            max_push_constant_size: 128,
            ..Default::default()
        };
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features,
                    limits,
                    label: Some("mandelbrot"),
                },
                None,
            )
            .await
            .map_err(|e| ResourceError::RequestDevice(e.to_string()))?;

        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .first()
            .copied()
            .ok_or_else(|| ResourceError::Surface("surface is incompatible with the adapter".into()))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: 1,
            height: 1,
            present_mode: if options.vsync {
                wgpu::PresentMode::Fifo
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: Vec::new(),
        };

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(shader);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad vertices"),
            contents: bytemuck::cast_slice(VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad indices"),
            contents: bytemuck::cast_slice(INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let compute_layout = counts_layout(&device, wgpu::ShaderStages::COMPUTE, false);
        let render_layout = counts_layout(&device, wgpu::ShaderStages::FRAGMENT, true);

        let params_range = 0..mem::size_of::<shared::Params>() as u32;

        let compute_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("escape-time"),
                bind_group_layouts: &[&compute_layout],
                push_constant_ranges: &[wgpu::PushConstantRange {
                    stages: wgpu::ShaderStages::COMPUTE,
                    range: params_range.clone(),
                }],
            });

        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("escape-time"),
            layout: Some(&compute_pipeline_layout),
            module: &shader,
            entry_point: "main_cs",
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("shade"),
                bind_group_layouts: &[&render_layout],
                push_constant_ranges: &[wgpu::PushConstantRange {
                    stages: wgpu::ShaderStages::FRAGMENT,
                    range: params_range,
                }],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shade"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "main_vs",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        offset: 0,
                        shader_location: 0,
                        format: wgpu::VertexFormat::Float32x2,
                    }],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "main_fs",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        if let Some(error) = device.pop_error_scope().await {
            return Err(ResourceError::Shader(error.to_string()));
        }

        Ok((
            Self {
                device,
                queue,
                compute_layout,
                render_layout,
                compute_pipeline,
                render_pipeline,
                vertex_buffer,
                index_buffer,
                counts: None,
            },
            WindowSurface { surface, config },
        ))
    }

    fn bind_counts(
        &self,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("escape counts"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }
}

impl ComputeBackend for GpuCompute {
    type Surface = WindowSurface;

    fn supports(&self, extent: Extent) -> Result<(), ResourceError> {
        let limits = self.device.limits();
        let side = limits.max_texture_dimension_2d;
        if extent.width > side || extent.height > side {
            return Err(ResourceError::Unsupported {
                extent,
                reason: format!("sides are limited to {side} pixels"),
            });
        }

        let bytes = extent.width as u64 * extent.height as u64 * mem::size_of::<u32>() as u64;
        if bytes > limits.max_storage_buffer_binding_size as u64 {
            return Err(ResourceError::Unsupported {
                extent,
                reason: format!("{bytes} byte count buffer exceeds the storage binding limit"),
            });
        }
        Ok(())
    }

    fn allocate(
        &mut self,
        surface: &mut WindowSurface,
        extent: Extent,
    ) -> Result<(), ResourceError> {
        self.supports(extent)?;

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("escape counts"),
            size: extent.width as u64 * extent.height as u64 * mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        let compute_group = self.bind_counts(&self.compute_layout, &buffer);
        let render_group = self.bind_counts(&self.render_layout, &buffer);

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(error) = out_of_memory.or(validation) {
            return Err(ResourceError::Allocation(error.to_string()));
        }

        // wgpu panics on a rejected surface configuration instead of
        // reporting it to an error scope. Only extents that passed
        // `supports` get this far.
        surface.config.width = extent.width;
        surface.config.height = extent.height;
        surface.surface.configure(&self.device, &surface.config);

        self.counts = Some(CountBuffer {
            extent,
            _buffer: buffer,
            compute_group,
            render_group,
        });
        log::debug!("allocated GPU frame resources for {extent}");
        Ok(())
    }

    fn dispatch(
        &mut self,
        surface: &mut WindowSurface,
        params: &shared::Params,
    ) -> Result<(), ResourceError> {
        let counts = self
            .counts
            .as_ref()
            .ok_or_else(|| ResourceError::Allocation("dispatch before allocation".into()))?;
        if (params.width, params.height) != (counts.extent.width, counts.extent.height) {
            return Err(ResourceError::Allocation(format!(
                "frame of {}x{} does not match buffers sized for {}",
                params.width, params.height, counts.extent
            )));
        }

        let output = match surface.surface.get_current_texture() {
            Ok(output) => output,
            Err(error @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                surface.surface.configure(&self.device, &surface.config);
                return Err(ResourceError::Surface(error.to_string()));
            }
            Err(error) => return Err(ResourceError::Surface(error.to_string())),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("frame") });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("escape-time"),
            });

            compute_pass.set_pipeline(&self.compute_pipeline);
            compute_pass.set_bind_group(0, &counts.compute_group, &[]);
            compute_pass.set_push_constants(0, bytemuck::bytes_of(params));
            compute_pass.dispatch_workgroups(
                params.width.div_ceil(WORKGROUP_SIZE),
                params.height.div_ceil(WORKGROUP_SIZE),
                1,
            );
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shade"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &counts.render_group, &[]);
            render_pass.set_push_constants(
                wgpu::ShaderStages::FRAGMENT,
                0,
                bytemuck::bytes_of(params),
            );
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..INDICES.len() as u32, 0, 0..1);
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bytes_that_are_not_spirv() {
        assert!(spirv_shader(b"").is_err());
        assert!(spirv_shader(b"#version 450\n").is_err());
        assert!(spirv_shader(&[0x03, 0x02, 0x23, 0x07, 0x00]).is_err());
    }

    #[test]
    fn accepts_the_spirv_header() {
        let mut module = Vec::new();
        for word in [SPIRV_MAGIC, 0x0001_0500, 0, 1, 0] {
            module.extend_from_slice(&word.to_le_bytes());
        }
        assert!(spirv_shader(&module).is_ok());
    }
}
