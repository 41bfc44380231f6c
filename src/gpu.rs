// src/gpu.rs
//! GPU side of the occlusion query: the buffer set, the proxy sampling
//! pass, and the readback path.
//!
//! The sampling pass is a deliberate substitute for a native
//! occlusion-query primitive: all bounding proxies are drawn as one
//! triangle list against the scene's already-populated depth buffer, with
//! color writes off. Every fragment that survives the depth test performs a
//! random-access write of a nonzero marker into the result slot for its
//! owner, so the rasterizer's own depth test acts as a massively parallel
//! "is any part of this proxy visible" oracle. Results are read back one
//! sampling interval later.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use futures::channel::oneshot;
use futures::executor::block_on;
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::error::{Error, Result};
use crate::proxy::{Aabb, ProxyVertex};

/// One 4-component accumulator per candidate, shared across GPU and CPU.
/// Magnitude zero means no proxy fragment survived the depth test during
/// the last sampling pass.
pub type ResultSlot = [f32; 4];

/// Squared magnitude of a result slot. Visible when > 0.
#[inline]
pub fn slot_magnitude_sq(slot: &ResultSlot) -> f32 {
    slot.iter().map(|c| c * c).sum()
}

pub const BOUNDS_STRIDE: usize = std::mem::size_of::<Aabb>(); // 24
pub const VERTEX_STRIDE: usize = std::mem::size_of::<ProxyVertex>(); // 16
pub const RESULT_STRIDE: usize = std::mem::size_of::<ResultSlot>(); // 16
pub const INTERSECT_STRIDE: usize = std::mem::size_of::<u32>(); // 4

/// The occlusion-query handoff, one producer/consumer pair per sampling
/// interval: `submit_sampling` produces GPU writes, `read_results` waits on
/// the device and consumes them, `clear_results` resets the slate.
///
/// The production implementation is [`WgpuBackend`]; tests substitute
/// in-memory doubles.
pub trait QueryBackend {
    /// Allocate the buffer set for one activation and upload the proxy
    /// data. Failure is fatal for the activation; no partially-allocated
    /// set survives.
    fn allocate(&mut self, bounds: &[Aabb], vertices: &[ProxyVertex]) -> Result<()>;

    /// Release all buffers. A release with nothing allocated is a no-op.
    fn release(&mut self);

    fn is_allocated(&self) -> bool;

    /// Record and submit the proxy sampling draw for this interval. Must
    /// run after the host has written opaque scene depth. Skipped silently
    /// when there is nothing to draw.
    fn submit_sampling(&mut self, view_proj: Mat4) -> Result<()>;

    /// Read the current result-buffer contents back to CPU memory. Blocks
    /// until the GPU has finished all previously submitted work touching
    /// the buffer, which is the fence ordering consumer after producer.
    fn read_results(&mut self, out: &mut [ResultSlot]) -> Result<()>;

    /// Zero the result buffer so the next sampling pass starts clean.
    fn clear_results(&mut self) -> Result<()>;
}

/// Camera uniform for the sampling pass (matches shader layout).
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ViewProjUniform {
    /// Column-major 4x4 matrix
    view_proj: [[f32; 4]; 4],
}

/// The four GPU-resident buffers of one activation, plus the staging
/// buffer the readback path requires.
struct QueryBuffers {
    /// Per-candidate bounds, bound for GPU-side intersection extensions.
    #[allow(dead_code)]
    bounds: wgpu::Buffer,
    /// All proxy vertices, read by the sampling vertex stage.
    #[allow(dead_code)]
    vertices: wgpu::Buffer,
    /// Per-candidate result slots, written by the sampling fragment stage.
    results: wgpu::Buffer,
    /// Scratch scalar for GPU-side intersection extensions.
    #[allow(dead_code)]
    intersect: wgpu::Buffer,
    /// Readback staging; `MAP_READ` buffers cannot be storage-bound.
    staging: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    candidate_count: usize,
    vertex_count: usize,
}

/// wgpu implementation of [`QueryBackend`].
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    camera_buffer: wgpu::Buffer,
    depth_view: Option<wgpu::TextureView>,
    buffers: Option<QueryBuffers>,
}

impl WgpuBackend {
    /// Create the backend. `depth_format` must match the depth attachment
    /// the host renders its opaque pass into.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("occlusion_sampling_shader"),
            source: wgpu::ShaderSource::Wgsl(SAMPLING_WGSL.into()),
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("occlusion_sampling_bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("occlusion_sampling_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("occlusion_sampling_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                // Vertices are pulled from the storage buffer by index.
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                // No color output; the result buffer is the side channel.
                targets: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Proxy shells are tested from both sides.
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                // Test against scene depth without disturbing it.
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("occlusion_camera_buffer"),
            size: std::mem::size_of::<ViewProjUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            camera_buffer,
            depth_view: None,
            buffers: None,
        }
    }

    /// Point the sampling pass at the host's depth attachment. Call again
    /// whenever the depth target is recreated (resize).
    pub fn set_depth_target(&mut self, view: wgpu::TextureView) {
        self.depth_view = Some(view);
    }
}

impl QueryBackend for WgpuBackend {
    fn allocate(&mut self, bounds: &[Aabb], vertices: &[ProxyVertex]) -> Result<()> {
        self.release();
        if bounds.is_empty() {
            return Ok(());
        }

        // Any OOM during the batch below aborts the whole activation.
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let bounds_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("occlusion_bounds_buffer"),
                contents: bytemuck::cast_slice(bounds),
                usage: wgpu::BufferUsages::STORAGE,
            });

        // A zero-size buffer cannot be storage-bound; candidates whose
        // proxies are all empty still get a one-element placeholder.
        let placeholder = [ProxyVertex([0.0; 4])];
        let padded: &[ProxyVertex] = if vertices.is_empty() {
            &placeholder
        } else {
            vertices
        };
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("occlusion_vertex_buffer"),
                contents: bytemuck::cast_slice(padded),
                usage: wgpu::BufferUsages::STORAGE,
            });

        let result_size = (bounds.len() * RESULT_STRIDE) as u64;
        let result_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("occlusion_result_buffer"),
            size: result_size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let intersect_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("occlusion_intersect_buffer"),
            size: INTERSECT_STRIDE as u64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("occlusion_staging_buffer"),
            size: result_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("occlusion_sampling_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: vertex_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: result_buffer.as_entire_binding(),
                },
            ],
        });

        self.device.poll(wgpu::Maintain::Poll);
        if let Some(err) = block_on(self.device.pop_error_scope()) {
            return Err(Error::BufferAllocation(err.to_string()));
        }

        log::debug!(
            "allocated occlusion buffers: {} candidates, {} proxy vertices",
            bounds.len(),
            vertices.len()
        );

        self.buffers = Some(QueryBuffers {
            bounds: bounds_buffer,
            vertices: vertex_buffer,
            results: result_buffer,
            intersect: intersect_buffer,
            staging: staging_buffer,
            bind_group,
            candidate_count: bounds.len(),
            vertex_count: vertices.len(),
        });
        Ok(())
    }

    fn release(&mut self) {
        if self.buffers.take().is_some() {
            log::debug!("released occlusion buffers");
        }
    }

    fn is_allocated(&self) -> bool {
        self.buffers.is_some()
    }

    fn submit_sampling(&mut self, view_proj: Mat4) -> Result<()> {
        let Some(buffers) = &self.buffers else {
            return Ok(());
        };
        if buffers.vertex_count == 0 {
            return Ok(());
        }
        let Some(depth_view) = &self.depth_view else {
            return Err(Error::custom(
                "sampling pass requires a depth target (set_depth_target)",
            ));
        };
        let uniform = ViewProjUniform {
            view_proj: view_proj.to_cols_array_2d(),
        };
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniform));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("occlusion_sampling_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("occlusion_sampling_pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        // Test against the depth the opaque pass wrote.
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &buffers.bind_group, &[]);
            pass.draw(0..buffers.vertex_count as u32, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn read_results(&mut self, out: &mut [ResultSlot]) -> Result<()> {
        let Some(buffers) = &self.buffers else {
            return Ok(());
        };
        if out.len() != buffers.candidate_count {
            return Err(Error::custom(format!(
                "readback slot count mismatch: {} vs {}",
                out.len(),
                buffers.candidate_count
            )));
        }

        let size = (buffers.candidate_count * RESULT_STRIDE) as u64;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("occlusion_readback_encoder"),
            });
        encoder.copy_buffer_to_buffer(&buffers.results, 0, &buffers.staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        // Map the staging copy. The wait is the fence that orders this
        // consumer after every previously submitted sampling draw.
        let slice = buffers.staging.slice(..);
        let (sender, receiver) = oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            sender.send(res).ok();
        });
        self.device.poll(wgpu::Maintain::Wait);

        match block_on(receiver) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(Error::Readback(err.to_string())),
            Err(_) => return Err(Error::Readback("map_async callback dropped".into())),
        }

        {
            let mapped = slice.get_mapped_range();
            out.copy_from_slice(bytemuck::cast_slice(&mapped[..]));
        }
        buffers.staging.unmap();
        Ok(())
    }

    fn clear_results(&mut self) -> Result<()> {
        let Some(buffers) = &self.buffers else {
            return Ok(());
        };
        let zeros = vec![0u8; buffers.candidate_count * RESULT_STRIDE];
        self.queue.write_buffer(&buffers.results, 0, &zeros);
        Ok(())
    }
}

/// Proxy sampling shader. The vertex stage pulls tagged proxy vertices from
/// the read buffer by index; the fragment stage only runs for fragments
/// that passed the depth test and flags the owner's result slot.
const SAMPLING_WGSL: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
}

@group(0) @binding(0) var<uniform> camera: Camera;
@group(0) @binding(1) var<storage, read> proxy_vertices: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read_write> results: array<vec4<f32>>;

struct VsOut {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) @interpolate(flat) owner: u32,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VsOut {
    let v = proxy_vertices[index];
    var out: VsOut;
    out.clip_position = camera.view_proj * vec4<f32>(v.xyz, 1.0);
    out.owner = u32(v.w);
    return out;
}

@fragment
fn fs_main(in: VsOut) {
    // Reaching here means the fragment survived the depth test.
    results[in.owner] = vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
"#;
