//! Bloom pass.
//!
//! Blurs the bright buffer with an iterative separable gaussian, ping-ponging
//! between two auxiliary buffers for a fixed number of iterations, then
//! composites the result additively over the lit buffer.

use wgpu::util::DeviceExt;

use crate::renderer::resource_manager::ResourceManager;
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::targets::{FrameTargets, HDR_FORMAT};
use crate::renderer::uniforms::BlurUniforms;

/// Number of horizontal+vertical blur round trips.
pub const BLOOM_ITERATIONS: u32 = 10;

pub struct BloomPass {
    blur_pipeline: Option<wgpu::RenderPipeline>,
    copy_pipeline: Option<wgpu::RenderPipeline>,
    composite_pipeline: Option<wgpu::RenderPipeline>,
    blur_layout: Option<wgpu::BindGroupLayout>,
    blit_layout: Option<wgpu::BindGroupLayout>,
    horizontal_buffer: Option<wgpu::Buffer>,
    vertical_buffer: Option<wgpu::Buffer>,
}

impl BloomPass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            blur_pipeline: None,
            copy_pipeline: None,
            composite_pipeline: None,
            blur_layout: None,
            blit_layout: None,
            horizontal_buffer: None,
            vertical_buffer: None,
        }
    }

    fn ensure_pipelines(&mut self, rm: &ResourceManager, shaders: &mut ShaderLibrary) -> bool {
        if self.blur_pipeline.is_some() {
            return true;
        }
        let Some(blur_shader) = shaders.get(&rm.device, "blur") else {
            return false;
        };
        let Some(blit_shader) = shaders.get(&rm.device, "blit") else {
            return false;
        };

        let blur_layout = self.blur_layout.get_or_insert_with(|| {
            rm.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Bloom Blur Layout"),
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
                                    std::mem::size_of::<BlurUniforms>() as u64,
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
                    label: Some("Bloom Blit Layout"),
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

        let replace_targets = [super::color_target(HDR_FORMAT, None)];
        self.blur_pipeline = Some(super::fullscreen_pipeline(
            &rm.device,
            &blur_shader,
            &[blur_layout],
            &replace_targets,
            "Bloom Blur Pipeline",
        ));
        self.copy_pipeline = Some(super::fullscreen_pipeline(
            &rm.device,
            &blit_shader,
            &[blit_layout],
            &replace_targets,
            "Bloom Copy Pipeline",
        ));

        let additive_targets = [super::color_target(HDR_FORMAT, Some(super::BLEND_ADDITIVE))];
        self.composite_pipeline = Some(super::fullscreen_pipeline(
            &rm.device,
            &blit_shader,
            &[blit_layout],
            &additive_targets,
            "Bloom Composite Pipeline",
        ));

        // Static direction uniforms, written once.
        self.horizontal_buffer = Some(rm.device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Bloom Horizontal Uniforms"),
                contents: bytemuck::bytes_of(&BlurUniforms {
                    direction: [1.0, 0.0],
                    _pad: [0.0; 2],
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            },
        ));
        self.vertical_buffer = Some(rm.device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Bloom Vertical Uniforms"),
                contents: bytemuck::bytes_of(&BlurUniforms {
                    direction: [0.0, 1.0],
                    _pad: [0.0; 2],
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            },
        ));
        true
    }

    fn blur_bind_group(
        &self,
        rm: &ResourceManager,
        source: &wgpu::TextureView,
        direction: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        rm.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Blur BindGroup"),
            layout: self.blur_layout.as_ref().expect("ensured with pipeline"),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&rm.linear_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: direction.as_entire_binding(),
                },
            ],
        })
    }

    fn blit_bind_group(&self, rm: &ResourceManager, source: &wgpu::TextureView) -> wgpu::BindGroup {
        rm.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Blit BindGroup"),
            layout: self.blit_layout.as_ref().expect("ensured with pipeline"),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&rm.linear_sampler),
                },
            ],
        })
    }

    fn fullscreen_draw(
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
        target: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
        label: &str,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
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
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    pub fn run(
        &mut self,
        rm: &mut ResourceManager,
        shaders: &mut ShaderLibrary,
        encoder: &mut wgpu::CommandEncoder,
        targets: &FrameTargets,
    ) {
        if !self.ensure_pipelines(rm, shaders) {
            log::debug!("bloom pass skipped: shader unavailable");
            return;
        }

        let horizontal = self.horizontal_buffer.as_ref().expect("ensured above");
        let vertical = self.vertical_buffer.as_ref().expect("ensured above");

        // Seed the ping buffer with the bright pass output.
        let seed = self.blit_bind_group(rm, &targets.bright.view);
        Self::fullscreen_draw(
            encoder,
            self.copy_pipeline.as_ref().expect("ensured above"),
            &seed,
            &targets.bloom_ping.view,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            "Bloom Seed",
        );

        let ping_to_pong = self.blur_bind_group(rm, &targets.bloom_ping.view, horizontal);
        let pong_to_ping = self.blur_bind_group(rm, &targets.bloom_pong.view, vertical);
        let blur_pipeline = self.blur_pipeline.as_ref().expect("ensured above");

        for _ in 0..BLOOM_ITERATIONS {
            Self::fullscreen_draw(
                encoder,
                blur_pipeline,
                &ping_to_pong,
                &targets.bloom_pong.view,
                wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                "Bloom Blur H",
            );
            Self::fullscreen_draw(
                encoder,
                blur_pipeline,
                &pong_to_ping,
                &targets.bloom_ping.view,
                wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                "Bloom Blur V",
            );
        }

        // Additive composite over the lit buffer.
        let composite = self.blit_bind_group(rm, &targets.bloom_ping.view);
        Self::fullscreen_draw(
            encoder,
            self.composite_pipeline.as_ref().expect("ensured above"),
            &composite,
            &targets.lit.view,
            wgpu::LoadOp::Load,
            "Bloom Composite",
        );
    }
}

impl Default for BloomPass {
    fn default() -> Self {
        Self::new()
    }
}
