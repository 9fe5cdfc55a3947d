//! Decal overlay pass.
//!
//! Projects a textured box onto already-rasterized geometry. The scene
//! depth is snapshotted first so the shader can reconstruct positions while
//! the live depth buffer stays bound for testing; the decal blends with
//! standard alpha and never writes depth.

use std::sync::Arc;

use glam::Affine3A;
use wgpu::util::DeviceExt;

use crate::renderer::resource_manager::ResourceManager;
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::targets::{DEPTH_FORMAT, FrameTargets, HDR_FORMAT};
use crate::renderer::uniforms::DecalUniforms;
use crate::resources::{Mesh, Texture, Vertex};

/// A single projected decal.
#[derive(Debug, Clone)]
pub struct DecalConfig {
    /// Placement of the unit projection box in world space.
    pub transform: Affine3A,
    pub texture: Arc<Texture>,
}

pub struct DecalPass {
    pipeline: Option<wgpu::RenderPipeline>,
    layout: Option<wgpu::BindGroupLayout>,
    uniforms_buffer: Option<wgpu::Buffer>,
    /// Keyed by (targets generation, decal texture id).
    bind_group: Option<(u64, u64, wgpu::BindGroup)>,
    cube: Mesh,
}

impl DecalPass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipeline: None,
            layout: None,
            uniforms_buffer: None,
            bind_group: None,
            cube: Mesh::cube(0.5),
        }
    }

    fn ensure_pipeline(&mut self, rm: &ResourceManager, shaders: &mut ShaderLibrary) -> bool {
        if self.pipeline.is_some() {
            return true;
        }
        let Some(shader) = shaders.get(&rm.device, "decal") else {
            return false;
        };

        let layout = self.layout.get_or_insert_with(|| {
            rm.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Decal Layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: wgpu::BufferSize::new(
                                    std::mem::size_of::<DecalUniforms>() as u64,
                                ),
                            },
                            count: None,
                        },
                        ResourceManager::texture_entry(1),
                        wgpu::BindGroupLayoutEntry {
                            binding: 2,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                        ResourceManager::depth_entry(3),
                    ],
                })
        });

        let pipeline_layout = rm
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Decal Pipeline Layout"),
                bind_group_layouts: &[Some(&rm.globals_layout), Some(layout)],
                immediate_size: 0,
            });

        let targets = [super::color_target(
            HDR_FORMAT,
            Some(wgpu::BlendState::ALPHA_BLENDING),
        )];
        self.pipeline = Some(rm.device.create_render_pipeline(
            &wgpu::RenderPipelineDescriptor {
                label: Some("Decal Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &targets,
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    cull_mode: Some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    // Depth tested against live scene depth, never written.
                    depth_write_enabled: Some(false),
                    depth_compare: Some(wgpu::CompareFunction::Less),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            },
        ));
        true
    }

    pub fn run(
        &mut self,
        rm: &mut ResourceManager,
        shaders: &mut ShaderLibrary,
        encoder: &mut wgpu::CommandEncoder,
        targets: &FrameTargets,
        targets_generation: u64,
        decal: &DecalConfig,
        globals_offset: u32,
    ) {
        if !self.ensure_pipeline(rm, shaders) {
            log::debug!("decal pass skipped: shader unavailable");
            return;
        }

        // Snapshot the scene depth before sampling it.
        encoder.copy_texture_to_texture(
            targets.gbuffer.depth.texture.as_image_copy(),
            targets.decal_depth.texture.as_image_copy(),
            wgpu::Extent3d {
                width: targets.size().0,
                height: targets.size().1,
                depth_or_array_layers: 1,
            },
        );

        let model = glam::Mat4::from(decal.transform);
        let uniforms = DecalUniforms {
            model,
            inverse_model: model.inverse(),
        };
        let buffer = self.uniforms_buffer.get_or_insert_with(|| {
            rm.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Decal Uniforms"),
                    contents: bytemuck::bytes_of(&uniforms),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                })
        });
        rm.queue.write_buffer(buffer, 0, bytemuck::bytes_of(&uniforms));

        rm.ensure_mesh(&self.cube);
        rm.ensure_texture(&decal.texture);

        let stale = self
            .bind_group
            .as_ref()
            .is_none_or(|(generation, texture_id, _)| {
                *generation != targets_generation || *texture_id != decal.texture.id()
            });
        if stale {
            let layout = self.layout.as_ref().expect("ensured with pipeline");
            // ensure_texture above guarantees the cache entry.
            let decal_view = rm
                .texture(decal.texture.id())
                .expect("decal texture ensured above");
            let bind_group = rm.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Decal BindGroup"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self
                            .uniforms_buffer
                            .as_ref()
                            .expect("created above")
                            .as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&decal_view.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&rm.linear_sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&targets.decal_depth.view),
                    },
                ],
            });
            self.bind_group = Some((targets_generation, decal.texture.id(), bind_group));
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Decal Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.gbuffer.albedo.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.gbuffer.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let Some(gpu_mesh) = rm.mesh(self.cube.id()) else {
            return;
        };
        pass.set_pipeline(self.pipeline.as_ref().expect("ensured above"));
        pass.set_bind_group(0, rm.globals_bind_group(), &[globals_offset]);
        let (_, _, bind_group) = self.bind_group.as_ref().expect("ensured above");
        pass.set_bind_group(1, bind_group, &[]);
        pass.set_vertex_buffer(0, gpu_mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(gpu_mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..gpu_mesh.index_count, 0, 0..1);
    }
}

impl Default for DecalPass {
    fn default() -> Self {
        Self::new()
    }
}
