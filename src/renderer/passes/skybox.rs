//! Skybox pass.
//!
//! Draws the environment cubemap as a full-screen background into the lit
//! buffer before any lighting runs; lit geometry overwrites it, and the
//! deferred resolve keeps it by discarding background pixels.

use crate::renderer::resource_manager::ResourceManager;
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::targets::HDR_FORMAT;

pub struct SkyboxPass {
    pipeline: Option<wgpu::RenderPipeline>,
    layout: Option<wgpu::BindGroupLayout>,
    /// Keyed by the environment view's identity (skybox version).
    bind_group: Option<(u64, wgpu::BindGroup)>,
}

impl SkyboxPass {
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
        let Some(shader) = shaders.get(&rm.device, "skybox") else {
            return false;
        };

        let layout = self.layout.get_or_insert_with(|| {
            rm.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Skybox Layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::Cube,
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
                })
        });

        let targets = [super::color_target(HDR_FORMAT, None)];
        self.pipeline = Some(super::fullscreen_pipeline(
            &rm.device,
            &shader,
            &[&rm.globals_layout, layout],
            &targets,
            "Skybox Pipeline",
        ));
        true
    }

    /// Draws the skybox into `color_view`, clearing it to `clear_color`
    /// first. With no environment bound the pass only clears.
    pub fn run(
        &mut self,
        rm: &mut ResourceManager,
        shaders: &mut ShaderLibrary,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        clear_color: wgpu::Color,
        environment: Option<(&wgpu::TextureView, u64)>,
        globals_offset: u32,
    ) {
        let ready = self.ensure_pipeline(rm, shaders);

        if let (true, Some((env_view, version))) = (ready, environment) {
            let stale = self
                .bind_group
                .as_ref()
                .is_none_or(|(cached, _)| *cached != version);
            if stale {
                let layout = self.layout.as_ref().expect("ensured with pipeline");
                let bind_group = rm.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Skybox BindGroup"),
                    layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(env_view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&rm.linear_sampler),
                        },
                    ],
                });
                self.bind_group = Some((version, bind_group));
            }
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Skybox Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if ready && environment.is_some() {
            if let (Some(pipeline), Some((_, bind_group))) =
                (self.pipeline.as_ref(), self.bind_group.as_ref())
            {
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, rm.globals_bind_group(), &[globals_offset]);
                pass.set_bind_group(1, bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
        }
    }
}

impl Default for SkyboxPass {
    fn default() -> Self {
        Self::new()
    }
}
