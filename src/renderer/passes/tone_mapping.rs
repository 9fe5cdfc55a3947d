//! Tone mapping pass.
//!
//! Applies exposure scale, white point and gamma correction to the composed
//! lit buffer and writes the result into the caller's output view. With
//! tone mapping disabled, the lit buffer is presented through a plain blit
//! instead.

use wgpu::util::DeviceExt;

use crate::renderer::resource_manager::ResourceManager;
use crate::renderer::settings::ToneMapping;
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::targets::FrameTargets;
use crate::renderer::uniforms::ToneMapUniforms;

pub struct ToneMapPass {
    tonemap_pipeline: Option<wgpu::RenderPipeline>,
    blit_pipeline: Option<wgpu::RenderPipeline>,
    tonemap_layout: Option<wgpu::BindGroupLayout>,
    blit_layout: Option<wgpu::BindGroupLayout>,
    uniforms_buffer: Option<wgpu::Buffer>,
    output_format: wgpu::TextureFormat,
}

impl ToneMapPass {
    #[must_use]
    pub fn new(output_format: wgpu::TextureFormat) -> Self {
        Self {
            tonemap_pipeline: None,
            blit_pipeline: None,
            tonemap_layout: None,
            blit_layout: None,
            uniforms_buffer: None,
            output_format,
        }
    }

    fn ensure_pipelines(&mut self, rm: &ResourceManager, shaders: &mut ShaderLibrary) -> bool {
        if self.tonemap_pipeline.is_some() {
            return true;
        }
        let Some(tonemap_shader) = shaders.get(&rm.device, "tone_mapping") else {
            return false;
        };
        let Some(blit_shader) = shaders.get(&rm.device, "blit") else {
            return false;
        };

        let tonemap_layout = self.tonemap_layout.get_or_insert_with(|| {
            rm.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("ToneMap Layout"),
                    entries: &[
                        ResourceManager::texture_entry(0),
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 2,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: wgpu::BufferSize::new(
                                    std::mem::size_of::<ToneMapUniforms>() as u64,
                                ),
                            },
                            count: None,
                        },
                    ],
                })
        });
        let blit_layout = self.blit_layout.get_or_insert_with(|| {
            rm.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Present Blit Layout"),
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

        let targets = [super::color_target(self.output_format, None)];
        self.tonemap_pipeline = Some(super::fullscreen_pipeline(
            &rm.device,
            &tonemap_shader,
            &[tonemap_layout],
            &targets,
            "ToneMap Pipeline",
        ));
        self.blit_pipeline = Some(super::fullscreen_pipeline(
            &rm.device,
            &blit_shader,
            &[blit_layout],
            &targets,
            "Present Blit Pipeline",
        ));
        true
    }

    pub fn run(
        &mut self,
        rm: &mut ResourceManager,
        shaders: &mut ShaderLibrary,
        encoder: &mut wgpu::CommandEncoder,
        targets: &FrameTargets,
        output: &wgpu::TextureView,
        tone_mapping: Option<&ToneMapping>,
    ) {
        if !self.ensure_pipelines(rm, shaders) {
            log::debug!("tone map pass skipped: shader unavailable");
            return;
        }

        let (pipeline, bind_group) = match tone_mapping {
            Some(params) => {
                let uniforms = ToneMapUniforms {
                    scale: params.scale,
                    average_lum: params.average_lum,
                    lumwhite2: params.lum_white * params.lum_white,
                    igamma: 1.0 / params.gamma,
                };
                let buffer = self.uniforms_buffer.get_or_insert_with(|| {
                    rm.device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some("ToneMap Uniforms"),
                            contents: bytemuck::bytes_of(&uniforms),
                            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                        })
                });
                rm.queue.write_buffer(buffer, 0, bytemuck::bytes_of(&uniforms));

                let bind_group = rm.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("ToneMap BindGroup"),
                    layout: self.tonemap_layout.as_ref().expect("ensured with pipeline"),
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&targets.lit.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&rm.linear_sampler),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: self
                                .uniforms_buffer
                                .as_ref()
                                .expect("created above")
                                .as_entire_binding(),
                        },
                    ],
                });
                (
                    self.tonemap_pipeline.as_ref().expect("ensured above"),
                    bind_group,
                )
            }
            None => {
                let bind_group = rm.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Present Blit BindGroup"),
                    layout: self.blit_layout.as_ref().expect("ensured with pipeline"),
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&targets.lit.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&rm.linear_sampler),
                        },
                    ],
                });
                (
                    self.blit_pipeline.as_ref().expect("ensured above"),
                    bind_group,
                )
            }
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Tone Map Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
