//! Deferred lighting resolve.
//!
//! Converts the G-buffer into the lit buffer by accumulating per-light
//! contributions. Spot and directional lights are each a full-screen draw;
//! omni lights are drawn afterwards as range-scaled sphere volumes with
//! front-face culling and no depth test. Within each group, lights are
//! processed in scene list order.
//!
//! The ambient (plus emissive and baked irradiance) term is injected
//! exactly once per frame, on the first spot/directional light processed;
//! the omni group never carries it.

use glam::{Mat4, Vec3, Vec4};

use crate::renderer::passes::shadow::ShadowPass;
use crate::renderer::resource_manager::ResourceManager;
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::targets::{FrameTargets, HDR_FORMAT};
use crate::renderer::uniforms::{LightUniforms, ModelUniforms};
use crate::resources::{Mesh, Vertex};
use crate::scene::{Light, LightKind};

/// Light processing order for the resolve: all spot/directional lights
/// first (full-screen accumulation), then all omni lights (sphere volumes),
/// each group in list order. Invisible lights are excluded.
#[must_use]
pub fn resolve_light_order(lights: &[Light]) -> Vec<usize> {
    let mut order: Vec<usize> = Vec::with_capacity(lights.len());
    order.extend(
        lights
            .iter()
            .enumerate()
            .filter(|(_, l)| l.visible && !matches!(l.kind, LightKind::Omni))
            .map(|(i, _)| i),
    );
    order.extend(
        lights
            .iter()
            .enumerate()
            .filter(|(_, l)| l.visible && matches!(l.kind, LightKind::Omni))
            .map(|(i, _)| i),
    );
    order
}

/// Builds the uniform block for one light.
///
/// `ambient` must be non-zero for at most one light per frame; `first`
/// additionally gates the emissive and baked-irradiance terms.
#[must_use]
pub fn build_light_uniforms(
    light: &Light,
    ambient: f32,
    first: bool,
    shadow_matrix: Option<Mat4>,
) -> LightUniforms {
    let (kind, cos_cutoff, exponent) = match light.kind {
        LightKind::Directional => (0, 0.0, 0.0),
        LightKind::Omni => (1, 0.0, 0.0),
        LightKind::Spot {
            cos_cutoff,
            exponent,
        } => (2, cos_cutoff, exponent),
    };

    LightUniforms {
        shadow_view_projection: shadow_matrix.unwrap_or(Mat4::IDENTITY),
        color_intensity: Vec4::from((light.color, light.intensity)),
        position_range: Vec4::from((light.position(), light.max_distance)),
        direction_cos_cutoff: Vec4::from((light.direction(), cos_cutoff)),
        kind,
        spot_exponent: exponent,
        ambient,
        // The lighting shaders scale the configured bias the way the
        // original full-screen path did.
        shadow_bias: light.shadow.bias * 0.1,
        has_shadow_map: u32::from(shadow_matrix.is_some()),
        first_light: u32::from(first),
        _pad: [0; 2],
    }
}

pub struct LightingPass {
    /// Full-screen pipelines: [first light (replace), additive].
    fullscreen: [Option<wgpu::RenderPipeline>; 2],
    /// Omni sphere-volume pipeline (front-face culling, additive, no depth).
    volume: Option<wgpu::RenderPipeline>,
    gbuffer_layout: Option<wgpu::BindGroupLayout>,
    /// Keyed by (targets generation, ssao enabled).
    gbuffer_bind_group: Option<(u64, bool, wgpu::BindGroup)>,
    /// Unit sphere scaled per light to its range.
    sphere: Mesh,
}

impl LightingPass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fullscreen: [None, None],
            volume: None,
            gbuffer_layout: None,
            gbuffer_bind_group: None,
            sphere: Mesh::uv_sphere(1.0, 24, 16),
        }
    }

    fn ensure_gbuffer_layout(&mut self, rm: &ResourceManager) {
        if self.gbuffer_layout.is_some() {
            return;
        }
        let entries = [
            Self::load_texture_entry(0),
            Self::load_texture_entry(1),
            Self::load_texture_entry(2),
            Self::load_texture_entry(3),
            ResourceManager::depth_entry(4),
            Self::load_texture_entry(5),
        ];
        self.gbuffer_layout = Some(rm.device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("Resolve GBuffer Layout"),
                entries: &entries,
            },
        ));
    }

    // textureLoad-only inputs; non-filterable float keeps Rgba16Float legal
    // without the float32-filterable feature.
    fn load_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }
    }

    fn ensure_pipelines(&mut self, rm: &ResourceManager, shaders: &mut ShaderLibrary) -> bool {
        if self.fullscreen[0].is_some() {
            return true;
        }
        let Some(fullscreen_shader) = shaders.get(&rm.device, "deferred_light") else {
            return false;
        };
        let Some(volume_shader) = shaders.get(&rm.device, "deferred_light_volume") else {
            return false;
        };
        self.ensure_gbuffer_layout(rm);
        let gbuffer_layout = self.gbuffer_layout.as_ref().expect("ensured above");

        // First light overwrites lit pixels (background kept via discard);
        // every later light accumulates additively. The bright target is
        // cleared by the pass, so both variants accumulate additively there.
        for (index, blend) in [(0, None), (1, Some(super::BLEND_ADDITIVE))] {
            let targets = [
                super::color_target(HDR_FORMAT, blend),
                super::color_target(HDR_FORMAT, Some(super::BLEND_ADDITIVE)),
            ];
            self.fullscreen[index] = Some(super::fullscreen_pipeline(
                &rm.device,
                &fullscreen_shader,
                &[&rm.globals_layout, &rm.light_layout, gbuffer_layout],
                &targets,
                "Deferred Light Pipeline",
            ));
        }

        let volume_layout = rm
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Light Volume Pipeline Layout"),
                bind_group_layouts: &[
                    Some(&rm.globals_layout),
                    Some(&rm.light_layout),
                    Some(gbuffer_layout),
                    Some(&rm.object_layout),
                ],
                immediate_size: 0,
            });
        let volume_targets = [
            super::color_target(HDR_FORMAT, Some(super::BLEND_ADDITIVE)),
            super::color_target(HDR_FORMAT, Some(super::BLEND_ADDITIVE)),
        ];
        self.volume = Some(rm.device.create_render_pipeline(
            &wgpu::RenderPipelineDescriptor {
                label: Some("Light Volume Pipeline"),
                layout: Some(&volume_layout),
                vertex: wgpu::VertexState {
                    module: &volume_shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &volume_shader,
                    entry_point: Some("fs_main"),
                    targets: &volume_targets,
                    compilation_options: Default::default(),
                }),
                // The camera may sit inside the light volume, so shade the
                // sphere's back faces instead of its front.
                primitive: wgpu::PrimitiveState {
                    cull_mode: Some(wgpu::Face::Front),
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            },
        ));
        true
    }

    fn ensure_gbuffer_bind_group(
        &mut self,
        rm: &ResourceManager,
        targets: &FrameTargets,
        generation: u64,
        ssao_enabled: bool,
    ) {
        let stale = self
            .gbuffer_bind_group
            .as_ref()
            .is_none_or(|(r#gen, ssao, _)| *r#gen != generation || *ssao != ssao_enabled);
        if !stale {
            return;
        }

        let occlusion_view = if ssao_enabled {
            &targets.ssao.view
        } else {
            &rm.white_ssao.view
        };
        let layout = self.gbuffer_layout.as_ref().expect("ensured earlier");
        let gbuffer = &targets.gbuffer;
        let bind_group = rm.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Resolve GBuffer BindGroup"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.albedo.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.material.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.irradiance.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.depth.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(occlusion_view),
                },
            ],
        });
        self.gbuffer_bind_group = Some((generation, ssao_enabled, bind_group));
    }

    pub fn run(
        &mut self,
        rm: &mut ResourceManager,
        shaders: &mut ShaderLibrary,
        encoder: &mut wgpu::CommandEncoder,
        targets: &FrameTargets,
        targets_generation: u64,
        shadow: &ShadowPass,
        lights: &[Light],
        ambient_light: f32,
        ssao_enabled: bool,
        globals_offset: u32,
    ) {
        if !self.ensure_pipelines(rm, shaders) {
            log::debug!("lighting resolve skipped: shader unavailable");
            return;
        }
        self.ensure_gbuffer_bind_group(rm, targets, targets_generation, ssao_enabled);
        rm.ensure_mesh(&self.sphere);

        let order = resolve_light_order(lights);

        // Prepare per-light uniforms and bind groups up front so the render
        // pass below only records draws.
        struct LightDraw {
            light_offset: u32,
            bind_group: wgpu::BindGroup,
            /// Sphere model offset for omni lights.
            object_offset: Option<u32>,
            first: bool,
        }

        let mut ambient = ambient_light;
        let mut draws: Vec<LightDraw> = Vec::with_capacity(order.len());
        for &index in &order {
            let light = &lights[index];
            let omni = matches!(light.kind, LightKind::Omni);

            let (light_ambient, first) = if omni {
                (0.0, false)
            } else {
                // Taken by the first spot/directional light, zero afterwards.
                let taken = ambient;
                ambient = 0.0;
                (taken, taken > 0.0 || draws.is_empty())
            };

            let shadow_matrix = shadow.matrix(light.id);
            let uniforms = build_light_uniforms(light, light_ambient, first, shadow_matrix);
            let light_offset = rm.lights.push(&rm.queue, &uniforms);
            let bind_group = rm.light_bind_group(shadow.target_view(light.id));

            let object_offset = omni.then(|| {
                let model = Mat4::from_translation(light.position())
                    * Mat4::from_scale(Vec3::splat(light.max_distance));
                rm.objects.push(&rm.queue, &ModelUniforms { model })
            });

            draws.push(LightDraw {
                light_offset,
                bind_group,
                object_offset,
                first,
            });
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Lighting Resolve Pass"),
            color_attachments: &[
                // The skybox already sits in the lit buffer.
                Some(wgpu::RenderPassColorAttachment {
                    view: &targets.lit.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &targets.bright.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }),
            ],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_bind_group(0, rm.globals_bind_group(), &[globals_offset]);
        let (_, _, gbuffer_bind_group) =
            self.gbuffer_bind_group.as_ref().expect("ensured earlier");
        pass.set_bind_group(2, gbuffer_bind_group, &[]);

        let sphere_mesh = rm.mesh(self.sphere.id()).expect("sphere ensured above");

        for draw in &draws {
            match draw.object_offset {
                None => {
                    let pipeline_index = usize::from(!draw.first);
                    pass.set_pipeline(
                        self.fullscreen[pipeline_index]
                            .as_ref()
                            .expect("pipelines ensured above"),
                    );
                    pass.set_bind_group(1, &draw.bind_group, &[draw.light_offset]);
                    pass.draw(0..3, 0..1);
                }
                Some(object_offset) => {
                    pass.set_pipeline(self.volume.as_ref().expect("pipelines ensured above"));
                    pass.set_bind_group(1, &draw.bind_group, &[draw.light_offset]);
                    pass.set_bind_group(3, rm.object_bind_group(), &[object_offset]);
                    pass.set_vertex_buffer(0, sphere_mesh.vertex_buffer.slice(..));
                    pass.set_index_buffer(
                        sphere_mesh.index_buffer.slice(..),
                        wgpu::IndexFormat::Uint32,
                    );
                    pass.draw_indexed(0..sphere_mesh.index_count, 0, 0..1);
                }
            }
        }
    }
}

impl Default for LightingPass {
    fn default() -> Self {
        Self::new()
    }
}
