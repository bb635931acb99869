use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::{Arc, Weak};

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};
use wgpu::util::DeviceExt;

use crate::device::DEPTH_FORMAT;
use crate::render::{RenderCtx, RenderTarget, SceneView};
use crate::scene::{DrawList, MeshData, ResourceKey, TextureImage};

/// Textured, directionally lit mesh renderer.
///
/// Every frame it clears color and depth, then draws each `DrawItem` in list
/// order as one instanced draw of its vertex range. Meshes and textures are
/// uploaded on first use and kept until the last CPU handle (`Arc`) is dropped.
///
/// Texture sampling: repeat wrap, linear minification, nearest magnification.
#[derive(Default)]
pub struct MeshRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    view_bgl: Option<wgpu::BindGroupLayout>,
    texture_bgl: Option<wgpu::BindGroupLayout>,
    view_ubo: Option<wgpu::Buffer>,
    view_bind_group: Option<wgpu::BindGroup>,
    sampler: Option<wgpu::Sampler>,

    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,

    meshes: HashMap<ResourceKey, GpuMesh>,
    textures: HashMap<ResourceKey, GpuTexture>,
    rejected_textures: HashSet<ResourceKey>,
}

struct GpuMesh {
    source: Weak<MeshData>,
    buffer: wgpu::Buffer,
    vertex_count: u32,
    /// Byte offset where the normals block starts.
    split: u64,
}

struct GpuTexture {
    source: Weak<TextureImage>,
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct PendingDraw {
    mesh: ResourceKey,
    texture: ResourceKey,
    vertices: Range<u32>,
}

impl MeshRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears `target` and renders `draw_list` with the camera and light of `view`.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        draw_list: &DrawList,
        view: &SceneView,
    ) {
        self.ensure_pipeline(ctx);
        self.ensure_sampler(ctx);
        self.ensure_bindings(ctx);
        self.evict_released();
        self.write_view_uniform(ctx, view);

        let mut instances: Vec<MeshInstance> = Vec::with_capacity(draw_list.len());
        let mut draws: Vec<PendingDraw> = Vec::with_capacity(draw_list.len());

        for item in draw_list.items() {
            self.ensure_mesh(ctx, &item.mesh);
            if !self.ensure_texture(ctx, &item.texture) {
                continue;
            }
            instances.push(MeshInstance::new(item.model));
            draws.push(PendingDraw {
                mesh: item.mesh.key(),
                texture: item.texture.key(),
                vertices: item.first..item.first + item.count,
            });
        }

        if !instances.is_empty() {
            self.ensure_instance_capacity(ctx, instances.len());
            if let Some(instance_vbo) = self.instance_vbo.as_ref() {
                ctx.queue
                    .write_buffer(instance_vbo, 0, bytemuck::cast_slice(&instances));
            }
        }

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(view_bind_group) = self.view_bind_group.as_ref() else { return };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tether mesh pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(view.clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        // An empty list still clears the frame.
        if draws.is_empty() {
            return;
        }
        let Some(instance_vbo) = self.instance_vbo.as_ref() else { return };

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, view_bind_group, &[]);
        rpass.set_vertex_buffer(2, instance_vbo.slice(..));

        for (i, draw) in draws.iter().enumerate() {
            let (Some(mesh), Some(texture)) =
                (self.meshes.get(&draw.mesh), self.textures.get(&draw.texture))
            else {
                continue;
            };
            if draw.vertices.end > mesh.vertex_count {
                log::warn!(
                    "MeshRenderer: vertex range {:?} exceeds mesh of {} vertices; skipped",
                    draw.vertices,
                    mesh.vertex_count
                );
                continue;
            }

            rpass.set_vertex_buffer(0, mesh.buffer.slice(..mesh.split));
            rpass.set_vertex_buffer(1, mesh.buffer.slice(mesh.split..));
            rpass.set_bind_group(1, &texture.bind_group, &[]);

            let instance = i as u32;
            rpass.draw(draw.vertices.clone(), instance..instance + 1);
        }
    }

    // ── resources ─────────────────────────────────────────────────────────

    fn evict_released(&mut self) {
        let meshes_before = self.meshes.len();
        let textures_before = self.textures.len();

        self.meshes.retain(|_, m| m.source.strong_count() > 0);
        self.textures.retain(|_, t| t.source.strong_count() > 0);

        let evicted =
            (meshes_before - self.meshes.len()) + (textures_before - self.textures.len());
        if evicted > 0 {
            log::debug!("MeshRenderer: released {evicted} GPU resources");
        }
    }

    fn ensure_mesh(&mut self, ctx: &RenderCtx<'_>, mesh: &Arc<MeshData>) {
        if self.meshes.contains_key(&mesh.key()) {
            return;
        }

        let buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tether mesh vbo"),
            contents: bytemuck::cast_slice(mesh.data()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        self.meshes.insert(
            mesh.key(),
            GpuMesh {
                source: Arc::downgrade(mesh),
                buffer,
                vertex_count: mesh.vertex_count(),
                split: mesh.normals_offset(),
            },
        );
    }

    /// Uploads `image` if needed. Returns false when it cannot be used on this device.
    fn ensure_texture(&mut self, ctx: &RenderCtx<'_>, image: &Arc<TextureImage>) -> bool {
        let key = image.key();
        if self.textures.contains_key(&key) {
            return true;
        }
        if self.rejected_textures.contains(&key) {
            return false;
        }

        let max_dim = ctx.device.limits().max_texture_dimension_2d;
        if image.width() > max_dim || image.height() > max_dim {
            log::warn!(
                "MeshRenderer: texture {}x{} exceeds device limit {max_dim}; faces using it are skipped",
                image.width(),
                image.height()
            );
            self.rejected_textures.insert(key);
            return false;
        }

        let (Some(bgl), Some(sampler)) = (self.texture_bgl.as_ref(), self.sampler.as_ref()) else {
            return false;
        };

        let size = wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        };

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tether mesh texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.to_rgba(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.width() * 4),
                rows_per_image: Some(image.height()),
            },
            size,
        );

        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tether mesh texture bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        self.textures.insert(
            key,
            GpuTexture {
                source: Arc::downgrade(image),
                _texture: texture,
                bind_group,
            },
        );
        true
    }

    // ── lazy-init helpers ─────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tether mesh shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });

        let view_bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("tether mesh view bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<ViewUniform>() as u64,
                        ),
                    },
                    count: None,
                }],
            });

        let texture_bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("tether mesh texture bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("tether mesh pipeline layout"),
                bind_group_layouts: &[&view_bgl, &texture_bgl],
                immediate_size: 0,
            });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("tether mesh pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    vertex_layout(),
                    normal_layout(),
                    MeshInstance::layout(),
                ],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.view_bgl = Some(view_bgl);
        self.texture_bgl = Some(texture_bgl);

        // Bind groups were built against the old layouts.
        self.view_bind_group = None;
        self.view_ubo = None;
        self.textures.clear();
    }

    fn ensure_sampler(&mut self, ctx: &RenderCtx<'_>) {
        if self.sampler.is_some() {
            return;
        }
        self.sampler = Some(ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tether mesh sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        }));
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>) {
        if self.view_bind_group.is_some() && self.view_ubo.is_some() {
            return;
        }
        let Some(bgl) = self.view_bgl.as_ref() else { return };

        let view_ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tether mesh view ubo"),
            size: std::mem::size_of::<ViewUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tether mesh view bind group"),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: view_ubo.as_entire_binding(),
            }],
        });

        self.view_ubo = Some(view_ubo);
        self.view_bind_group = Some(bind_group);
    }

    fn write_view_uniform(&mut self, ctx: &RenderCtx<'_>, view: &SceneView) {
        let Some(ubo) = self.view_ubo.as_ref() else { return };
        let u = ViewUniform::new(view);
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
    }

    fn ensure_instance_capacity(&mut self, ctx: &RenderCtx<'_>, required_instances: usize) {
        if required_instances <= self.instance_capacity && self.instance_vbo.is_some() {
            return;
        }

        let new_cap = required_instances.next_power_of_two().max(64);
        let new_size = (new_cap * std::mem::size_of::<MeshInstance>()) as u64;

        self.instance_vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tether mesh instance vbo"),
            size: new_size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = new_cap;
    }
}

// ── GPU layouts ───────────────────────────────────────────────────────────

const VERTEX_ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    0 => Float32x3, // position
    1 => Float32x2  // uv
];

const NORMAL_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x3];

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: (crate::scene::VERTEX_FLOATS * std::mem::size_of::<f32>()) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRS,
    }
}

fn normal_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: (crate::scene::NORMAL_FLOATS * std::mem::size_of::<f32>()) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &NORMAL_ATTRS,
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    /// xyz: light direction, w: ambient.
    light: [f32; 4],
}

impl ViewUniform {
    fn new(view: &SceneView) -> Self {
        Self {
            view: view.view.to_cols_array_2d(),
            projection: view.projection.to_cols_array_2d(),
            light: view.light_direction.extend(view.ambient).to_array(),
        }
    }
}

/// Per-draw model matrix plus the matching normal matrix (columns padded to vec4).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct MeshInstance {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
}

impl MeshInstance {
    const ATTRS: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
        9 => Float32x4
    ];

    fn new(model: Mat4) -> Self {
        let normal = normal_matrix(model);
        Self {
            model: model.to_cols_array_2d(),
            normal: [
                normal.x_axis.extend(0.0).to_array(),
                normal.y_axis.extend(0.0).to_array(),
                normal.z_axis.extend(0.0).to_array(),
            ],
        }
    }

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

/// Inverse-transpose of the upper 3x3. Singular matrices fall back to the plain 3x3.
fn normal_matrix(model: Mat4) -> Mat3 {
    let linear = Mat3::from_mat4(model);
    if linear.determinant().abs() <= f32::EPSILON {
        return linear;
    }
    linear.inverse().transpose()
}
