//! Shadow pass.
//!
//! Renders a depth-only view of the scene from each visible spot and
//! directional light into that light's shadow target. Targets are allocated
//! lazily at a fixed per-light resolution and persist until the light
//! disappears from the scene; the light's shadow camera is rebuilt from its
//! transform every frame.
//!
//! Omni lights never reach this pass.

use glam::{Mat4, Vec3, Vec4};
use rustc_hash::FxHashMap;

use crate::renderer::extract::RenderItem;
use crate::renderer::resource_manager::ResourceManager;
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::targets::DEPTH_FORMAT;
use crate::renderer::uniforms::{CameraUniforms, ModelUniforms};
use crate::resources::Vertex;
use crate::scene::{Light, LightKind};

/// Directional shadow cameras sit this far back along the light direction
/// from the world origin.
pub const DIRECTIONAL_EYE_DISTANCE: f32 = 500.0;

/// Margin added to the spot cone angle so the shadow frustum covers the
/// soft cone edge.
pub const SPOT_FOV_MARGIN_DEG: f32 = 40.0;

/// Chooses an up vector that is never collinear with the light direction.
fn stable_up(direction: Vec3) -> Vec3 {
    if direction.y.abs() > 0.99 {
        Vec3::X
    } else {
        Vec3::Y
    }
}

/// View-projection matrix of a directional light's shadow camera: an
/// orthographic frustum of the configured half extent, centered along the
/// light's forward vector offset back from the origin.
#[must_use]
pub fn directional_shadow_matrix(light: &Light) -> Mat4 {
    let direction = light.direction();
    let eye = Vec3::ZERO - direction * DIRECTIONAL_EYE_DISTANCE;
    let view = Mat4::look_at_rh(eye, eye + direction, stable_up(direction));
    let h = light.shadow.ortho_half_extent;
    let proj = Mat4::orthographic_rh(-h, h, -h, h, light.shadow.near, light.shadow.far);
    proj * view
}

/// View-projection matrix of a spot light's shadow camera: a 1:1
/// perspective whose field of view is the cone angle plus a fixed margin.
#[must_use]
pub fn spot_shadow_matrix(light: &Light, cos_cutoff: f32) -> Mat4 {
    let direction = light.direction();
    let position = light.position();
    let view = Mat4::look_at_rh(position, position + direction, stable_up(direction));

    let fov = (cos_cutoff.clamp(-1.0, 1.0).acos().to_degrees() + SPOT_FOV_MARGIN_DEG)
        .to_radians()
        .clamp(0.01, std::f32::consts::PI - 0.01);
    let proj = Mat4::perspective_rh(fov, 1.0, light.shadow.near, light.max_distance);
    proj * view
}

/// Shadow matrix for any shadow-casting light kind; `None` for omni.
#[must_use]
pub fn shadow_matrix(light: &Light) -> Option<Mat4> {
    match light.kind {
        LightKind::Directional => Some(directional_shadow_matrix(light)),
        LightKind::Spot { cos_cutoff, .. } => Some(spot_shadow_matrix(light, cos_cutoff)),
        LightKind::Omni => None,
    }
}

/// One light's persistent shadow target.
pub struct ShadowTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    size: u32,
}

pub struct ShadowPass {
    pipeline: Option<wgpu::RenderPipeline>,
    targets: FxHashMap<u32, ShadowTarget>,
    matrices: FxHashMap<u32, Mat4>,
}

impl ShadowPass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipeline: None,
            targets: FxHashMap::default(),
            matrices: FxHashMap::default(),
        }
    }

    /// The shadow map view for a light, if one has been rendered.
    #[must_use]
    pub fn target_view(&self, light_id: u32) -> Option<&wgpu::TextureView> {
        self.targets.get(&light_id).map(|t| &t.view)
    }

    /// The shadow view-projection used for a light this frame.
    #[must_use]
    pub fn matrix(&self, light_id: u32) -> Option<Mat4> {
        self.matrices.get(&light_id).copied()
    }

    fn ensure_pipeline(
        &mut self,
        rm: &ResourceManager,
        shaders: &mut ShaderLibrary,
    ) -> bool {
        if self.pipeline.is_some() {
            return true;
        }
        let Some(shader) = shaders.get(&rm.device, "shadow_depth") else {
            return false;
        };

        let layout = rm
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Shadow Pipeline Layout"),
                bind_group_layouts: &[Some(&rm.globals_layout), Some(&rm.object_layout)],
                immediate_size: 0,
            });

        self.pipeline = Some(rm.device.create_render_pipeline(
            &wgpu::RenderPipelineDescriptor {
                label: Some("Shadow Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: None,
                primitive: wgpu::PrimitiveState {
                    cull_mode: Some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: Some(true),
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

    /// Renders every visible spot/directional light's shadow map.
    pub fn run(
        &mut self,
        rm: &mut ResourceManager,
        shaders: &mut ShaderLibrary,
        encoder: &mut wgpu::CommandEncoder,
        lights: &[Light],
        casters: &[RenderItem],
    ) {
        self.matrices.clear();

        // Drop targets of lights that no longer exist; a light's shadow map
        // lives exactly as long as the light does.
        self.targets
            .retain(|id, _| lights.iter().any(|l| l.id == *id));

        if !self.ensure_pipeline(rm, shaders) {
            log::debug!("shadow pass skipped: shader unavailable");
            return;
        }

        for light in lights {
            if !light.visible || !light.kind.casts_shadows() {
                continue;
            }
            let Some(light_vp) = shadow_matrix(light) else {
                continue;
            };
            self.matrices.insert(light.id, light_vp);

            let map_size = light.shadow.map_size.max(1);
            let recreate = self
                .targets
                .get(&light.id)
                .is_none_or(|t| t.size != map_size);
            if recreate {
                self.targets
                    .insert(light.id, Self::create_target(&rm.device, map_size));
            }

            let globals = CameraUniforms {
                view_projection: light_vp,
                inverse_view_projection: light_vp.inverse(),
                camera_position: Vec4::from((light.position(), 1.0)),
                inverse_resolution: [1.0 / map_size as f32; 2],
                time: 0.0,
                _pad: 0.0,
            };
            let globals_offset = rm.globals.push(&rm.queue, &globals);

            let mut draws = Vec::with_capacity(casters.len());
            for caster in casters {
                rm.ensure_mesh(&caster.mesh);
                let offset = rm.objects.push(
                    &rm.queue,
                    &ModelUniforms {
                        model: caster.model,
                    },
                );
                draws.push((caster, offset));
            }

            let target = &self.targets[&light.id];
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Depth Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &target.view,
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

            pass.set_pipeline(self.pipeline.as_ref().expect("pipeline ensured above"));
            pass.set_bind_group(0, rm.globals_bind_group(), &[globals_offset]);

            for (caster, object_offset) in &draws {
                let Some(gpu_mesh) = rm.mesh(caster.mesh.id()) else {
                    continue;
                };
                pass.set_bind_group(1, rm.object_bind_group(), &[*object_offset]);
                pass.set_vertex_buffer(0, gpu_mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(gpu_mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..gpu_mesh.index_count, 0, 0..1);
            }
        }
    }

    fn create_target(device: &wgpu::Device, size: u32) -> ShadowTarget {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        ShadowTarget {
            texture,
            view,
            size,
        }
    }
}

impl Default for ShadowPass {
    fn default() -> Self {
        Self::new()
    }
}
