//! Forward pass.
//!
//! Shades scene geometry directly: one draw per (object, light) pair, the
//! first visible light rendered without blending (carrying the ambient and
//! emissive terms), every later light blended additively on top.
//!
//! This pass doubles as the capture path for the irradiance and reflection
//! bakers, which point it at their own camera and render targets.

use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::renderer::extract::RenderItem;
use crate::renderer::passes::lighting::build_light_uniforms;
use crate::renderer::resource_manager::ResourceManager;
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::targets::{DEPTH_FORMAT, HDR_FORMAT};
use crate::renderer::uniforms::ModelUniforms;
use crate::resources::Vertex;
use crate::scene::Light;

/// Render destination for one forward invocation.
pub struct ForwardTarget<'a> {
    pub color: &'a wgpu::TextureView,
    pub bright: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
    /// `Some` clears color and depth first (the bake path); `None` loads the
    /// existing content (skybox already drawn).
    pub clear: Option<wgpu::Color>,
}

/// Shadow lookups for the lights being shaded, keyed by light id.
#[derive(Default)]
pub struct ShadowLookup<'a> {
    pub matrices: FxHashMap<u32, Mat4>,
    pub views: FxHashMap<u32, &'a wgpu::TextureView>,
}

pub struct ForwardPass {
    /// Pipelines keyed by [first light][two-sided].
    pipelines: [[Option<wgpu::RenderPipeline>; 2]; 2],
}

impl ForwardPass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipelines: [[None, None], [None, None]],
        }
    }

    fn ensure_pipelines(&mut self, rm: &ResourceManager, shaders: &mut ShaderLibrary) -> bool {
        if self.pipelines[0][0].is_some() {
            return true;
        }
        let Some(shader) = shaders.get(&rm.device, "forward") else {
            return false;
        };

        let layout = rm
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Forward Pipeline Layout"),
                bind_group_layouts: &[
                    Some(&rm.globals_layout),
                    Some(&rm.light_layout),
                    Some(&rm.material_layout),
                    Some(&rm.object_layout),
                ],
                immediate_size: 0,
            });

        for first in 0..2 {
            let blend = if first == 0 {
                Some(super::BLEND_ADDITIVE)
            } else {
                None
            };
            let targets = [
                super::color_target(HDR_FORMAT, blend),
                super::color_target(HDR_FORMAT, Some(super::BLEND_ADDITIVE)),
            ];
            for (two_sided, cull_mode) in [(0, Some(wgpu::Face::Back)), (1, None)] {
                self.pipelines[first][two_sided] = Some(rm.device.create_render_pipeline(
                    &wgpu::RenderPipelineDescriptor {
                        label: Some("Forward Pipeline"),
                        layout: Some(&layout),
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
                            cull_mode,
                            ..Default::default()
                        },
                        depth_stencil: Some(wgpu::DepthStencilState {
                            format: DEPTH_FORMAT,
                            depth_write_enabled: Some(true),
                            // Additive re-draws of the same geometry must
                            // pass the depth test against themselves.
                            depth_compare: Some(wgpu::CompareFunction::LessEqual),
                            stencil: wgpu::StencilState::default(),
                            bias: wgpu::DepthBiasState::default(),
                        }),
                        multisample: wgpu::MultisampleState::default(),
                        multiview_mask: None,
                        cache: None,
                    },
                ));
            }
        }
        true
    }

    pub fn run(
        &mut self,
        rm: &mut ResourceManager,
        shaders: &mut ShaderLibrary,
        encoder: &mut wgpu::CommandEncoder,
        target: &ForwardTarget,
        items: &[RenderItem],
        lights: &[Light],
        ambient_light: f32,
        shadow: &ShadowLookup,
        globals_offset: u32,
    ) {
        if !self.ensure_pipelines(rm, shaders) {
            log::debug!("forward pass skipped: shader unavailable");
            return;
        }

        // Per-light uniforms and bind groups, in scene list order.
        let mut ambient = ambient_light;
        let mut light_draws = Vec::new();
        for light in lights.iter().filter(|l| l.visible) {
            let first = light_draws.is_empty();
            let light_ambient = if first { ambient } else { 0.0 };
            ambient = 0.0;

            let shadow_matrix = shadow.matrices.get(&light.id).copied();
            let uniforms = build_light_uniforms(light, light_ambient, first, shadow_matrix);
            let offset = rm.lights.push(&rm.queue, &uniforms);
            let bind_group = rm.light_bind_group(shadow.views.get(&light.id).copied());
            light_draws.push((offset, bind_group));
        }
        if light_draws.is_empty() {
            return;
        }

        // Per-item model uniforms, shared across the light loop.
        let mut item_draws = Vec::with_capacity(items.len());
        for item in items {
            rm.ensure_mesh(&item.mesh);
            rm.ensure_material(&item.material);
            let offset = rm.objects.push(&rm.queue, &ModelUniforms { model: item.model });
            item_draws.push((item, offset));
        }

        let (color_load, depth_load) = match target.clear {
            Some(color) => (wgpu::LoadOp::Clear(color), wgpu::LoadOp::Clear(1.0)),
            None => (wgpu::LoadOp::Load, wgpu::LoadOp::Clear(1.0)),
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Forward Pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: target.color,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: target.bright,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_bind_group(0, rm.globals_bind_group(), &[globals_offset]);

        for (light_index, (light_offset, light_bind_group)) in light_draws.iter().enumerate() {
            let first = usize::from(light_index == 0);
            pass.set_bind_group(1, light_bind_group, &[*light_offset]);

            for (item, object_offset) in &item_draws {
                let Some(gpu_mesh) = rm.mesh(item.mesh.id()) else {
                    continue;
                };
                let Some(gpu_material) = rm.material(item.material.id()) else {
                    continue;
                };

                let two_sided = usize::from(item.material.two_sided);
                pass.set_pipeline(
                    self.pipelines[first][two_sided]
                        .as_ref()
                        .expect("pipelines ensured above"),
                );
                pass.set_bind_group(2, &gpu_material.bind_group, &[]);
                pass.set_bind_group(3, rm.object_bind_group(), &[*object_offset]);
                pass.set_vertex_buffer(0, gpu_mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(gpu_mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..gpu_mesh.index_count, 0, 0..1);
            }
        }
    }
}

impl Default for ForwardPass {
    fn default() -> Self {
        Self::new()
    }
}
