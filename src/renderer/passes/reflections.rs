//! Reflection compositing pass.
//!
//! Blends a specular environment contribution over the lit buffer. The
//! environment cubemap is the nearest captured reflection probe within the
//! capture radius of the camera, falling back to the global skybox; with
//! neither available the pass skips.

use crate::renderer::resource_manager::ResourceManager;
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::targets::{FrameTargets, HDR_FORMAT};

pub struct ReflectionsPass {
    pipeline: Option<wgpu::RenderPipeline>,
    layout: Option<wgpu::BindGroupLayout>,
    /// Keyed by (targets generation, environment version).
    bind_group: Option<(u64, u64, wgpu::BindGroup)>,
}

impl ReflectionsPass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipeline: None,
            layout: None,
            bind_group: None,
        }
    }

    fn ensure_pipeline(&mut self, rm: &ResourceManager, shaders: &mut ShaderLibrary) -> bool {
        if self.pipeline.is_some() {
            return true;
        }
        let Some(shader) = shaders.get(&rm.device, "reflections") else {
            return false;
        };

        let layout = self.layout.get_or_insert_with(|| {
            rm.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Reflections Layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        ResourceManager::depth_entry(2),
                        wgpu::BindGroupLayoutEntry {
                            binding: 3,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::Cube,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 4,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                })
        });

        let targets = [super::color_target(
            HDR_FORMAT,
            Some(wgpu::BlendState::ALPHA_BLENDING),
        )];
        self.pipeline = Some(super::fullscreen_pipeline(
            &rm.device,
            &shader,
            &[&rm.globals_layout, layout],
            &targets,
            "Reflections Pipeline",
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
        environment: (&wgpu::TextureView, u64),
        globals_offset: u32,
    ) {
        if !self.ensure_pipeline(rm, shaders) {
            log::debug!("reflections pass skipped: shader unavailable");
            return;
        }

        let (environment_view, environment_version) = environment;
        let stale = self
            .bind_group
            .as_ref()
            .is_none_or(|(generation, version, _)| {
                *generation != targets_generation || *version != environment_version
            });
        if stale {
            let layout = self.layout.as_ref().expect("ensured with pipeline");
            let gbuffer = &targets.gbuffer;
            let bind_group = rm.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Reflections BindGroup"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.normal.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.material.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.depth.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(environment_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::Sampler(&rm.linear_sampler),
                    },
                ],
            });
            self.bind_group = Some((targets_generation, environment_version, bind_group));
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Reflections Pass"),
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

        pass.set_pipeline(self.pipeline.as_ref().expect("ensured above"));
        pass.set_bind_group(0, rm.globals_bind_group(), &[globals_offset]);
        let (_, _, bind_group) = self.bind_group.as_ref().expect("ensured above");
        pass.set_bind_group(1, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

impl Default for ReflectionsPass {
    fn default() -> Self {
        Self::new()
    }
}
