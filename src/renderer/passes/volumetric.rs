//! Volumetric scattering pass.
//!
//! Ray-marches view rays against the primary directional light's shadow map
//! into the quarter-resolution volumetric buffer, then alpha-blends the
//! upsampled result over the lit buffer. A per-frame random jitter decorrelates
//! the march across frames.

use glam::{Mat4, Vec4};
use rand::RngExt;
use wgpu::util::DeviceExt;

use crate::renderer::resource_manager::ResourceManager;
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::targets::{FrameTargets, HDR_FORMAT};
use crate::renderer::uniforms::VolumetricUniforms;
use crate::scene::Light;

pub struct VolumetricPass {
    march_pipeline: Option<wgpu::RenderPipeline>,
    composite_pipeline: Option<wgpu::RenderPipeline>,
    march_layout: Option<wgpu::BindGroupLayout>,
    composite_layout: Option<wgpu::BindGroupLayout>,
    uniforms_buffer: Option<wgpu::Buffer>,
    /// 64x64 tiled noise used to jitter the march start.
    noise: crate::resources::Texture,
}

impl VolumetricPass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            march_pipeline: None,
            composite_pipeline: None,
            march_layout: None,
            composite_layout: None,
            uniforms_buffer: None,
            noise: crate::resources::Texture::noise(64),
        }
    }

    fn ensure_pipelines(&mut self, rm: &ResourceManager, shaders: &mut ShaderLibrary) -> bool {
        if self.march_pipeline.is_some() {
            return true;
        }
        let Some(march_shader) = shaders.get(&rm.device, "volumetric") else {
            return false;
        };
        let Some(blit_shader) = shaders.get(&rm.device, "blit") else {
            return false;
        };

        let march_layout = self.march_layout.get_or_insert_with(|| {
            rm.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Volumetric Layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: wgpu::BufferSize::new(
                                    std::mem::size_of::<VolumetricUniforms>() as u64,
                                ),
                            },
                            count: None,
                        },
                        ResourceManager::depth_entry(1),
                        ResourceManager::depth_entry(2),
                        wgpu::BindGroupLayoutEntry {
                            binding: 3,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(
                                wgpu::SamplerBindingType::NonFiltering,
                            ),
                            count: None,
                        },
                        ResourceManager::texture_entry(4),
                        wgpu::BindGroupLayoutEntry {
                            binding: 5,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                })
        });

        let march_targets = [super::color_target(HDR_FORMAT, None)];
        self.march_pipeline = Some(super::fullscreen_pipeline(
            &rm.device,
            &march_shader,
            &[&rm.globals_layout, march_layout],
            &march_targets,
            "Volumetric March Pipeline",
        ));

        let composite_layout = self.composite_layout.get_or_insert_with(|| {
            rm.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Volumetric Composite Layout"),
                    entries: &[
                        ResourceManager::texture_entry(0),
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                })
        });
        let composite_targets = [super::color_target(
            HDR_FORMAT,
            Some(wgpu::BlendState::ALPHA_BLENDING),
        )];
        self.composite_pipeline = Some(super::fullscreen_pipeline(
            &rm.device,
            &blit_shader,
            &[composite_layout],
            &composite_targets,
            "Volumetric Composite Pipeline",
        ));
        true
    }

    pub fn run(
        &mut self,
        rm: &mut ResourceManager,
        shaders: &mut ShaderLibrary,
        encoder: &mut wgpu::CommandEncoder,
        targets: &FrameTargets,
        sun: &Light,
        sun_shadow_matrix: Mat4,
        sun_shadow_view: &wgpu::TextureView,
        quarter_globals_offset: u32,
    ) {
        if !self.ensure_pipelines(rm, shaders) {
            log::debug!("volumetric pass skipped: shader unavailable");
            return;
        }

        let mut rng = rand::rng();
        let uniforms = VolumetricUniforms {
            shadow_view_projection: sun_shadow_matrix,
            light_color: Vec4::from((sun.color, sun.intensity)),
            light_direction: Vec4::from((sun.direction(), 0.0)),
            jitter_bias: Vec4::new(
                rng.random::<f32>(),
                rng.random::<f32>(),
                rng.random::<f32>(),
                sun.shadow.bias,
            ),
        };
        let buffer = self.uniforms_buffer.get_or_insert_with(|| {
            rm.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Volumetric Uniforms"),
                    contents: bytemuck::bytes_of(&uniforms),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                })
        });
        rm.queue.write_buffer(buffer, 0, bytemuck::bytes_of(&uniforms));

        rm.ensure_texture(&self.noise);
        let noise_view = &rm
            .texture(self.noise.id())
            .expect("noise ensured above")
            .view;

        // The shadow map view can change whenever shadow targets are
        // recreated; rebuilding this small bind group every frame is simpler
        // than tracking that lifetime.
        let march_layout = self.march_layout.as_ref().expect("ensured with pipeline");
        let march_bind_group = rm.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Volumetric BindGroup"),
            layout: march_layout,
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
                    resource: wgpu::BindingResource::TextureView(&targets.gbuffer.depth.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(sun_shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&rm.nearest_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(noise_view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&rm.repeat_sampler),
                },
            ],
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Volumetric March Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &targets.volumetric.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(self.march_pipeline.as_ref().expect("ensured above"));
            pass.set_bind_group(0, rm.globals_bind_group(), &[quarter_globals_offset]);
            pass.set_bind_group(1, &march_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        // Upsample and blend over the lit buffer.
        let composite_layout = self
            .composite_layout
            .as_ref()
            .expect("ensured with pipeline");
        let composite_bind_group = rm.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Volumetric Composite BindGroup"),
            layout: composite_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.volumetric.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&rm.linear_sampler),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Volumetric Composite Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.lit.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(self.composite_pipeline.as_ref().expect("ensured above"));
        pass.set_bind_group(0, &composite_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

impl Default for VolumetricPass {
    fn default() -> Self {
        Self::new()
    }
}
