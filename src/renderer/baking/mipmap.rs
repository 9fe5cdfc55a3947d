//! Mipmap generation for captured cubemaps.
//!
//! Each mip level of each face is produced by blitting the level above it
//! through a linear-filtered fullscreen draw; faces are addressed as
//! individual 2D array layers.

use rustc_hash::FxHashMap;

use crate::renderer::passes::{color_target, fullscreen_pipeline};
use crate::renderer::resource_manager::ResourceManager;
use crate::renderer::shaders::ShaderLibrary;

pub struct MipmapGenerator {
    layout: Option<wgpu::BindGroupLayout>,
    pipelines: FxHashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
}

impl MipmapGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            layout: None,
            pipelines: FxHashMap::default(),
        }
    }

    fn ensure_pipeline(
        &mut self,
        rm: &ResourceManager,
        shaders: &mut ShaderLibrary,
        format: wgpu::TextureFormat,
    ) -> bool {
        if self.pipelines.contains_key(&format) {
            return true;
        }
        let Some(shader) = shaders.get(&rm.device, "blit") else {
            return false;
        };

        let layout = self.layout.get_or_insert_with(|| {
            rm.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Mipmap Layout"),
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

        let targets = [color_target(format, None)];
        let pipeline = fullscreen_pipeline(&rm.device, &shader, &[layout], &targets, "Mipmap Pipeline");
        self.pipelines.insert(format, pipeline);
        true
    }

    /// Fills mip levels `1..mip_count` of every array layer from level 0.
    pub fn generate(
        &mut self,
        rm: &ResourceManager,
        shaders: &mut ShaderLibrary,
        encoder: &mut wgpu::CommandEncoder,
        texture: &wgpu::Texture,
    ) {
        let format = texture.format();
        if !self.ensure_pipeline(rm, shaders, format) {
            log::debug!("mipmap generation skipped: shader unavailable");
            return;
        }
        let pipeline = &self.pipelines[&format];
        let layout = self.layout.as_ref().expect("ensured with pipeline");

        for layer in 0..texture.depth_or_array_layers() {
            for mip in 1..texture.mip_level_count() {
                let source_view = texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Mipmap Source"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_mip_level: mip - 1,
                    mip_level_count: Some(1),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                });
                let target_view = texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Mipmap Target"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_mip_level: mip,
                    mip_level_count: Some(1),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                });

                let bind_group = rm.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Mipmap BindGroup"),
                    layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&source_view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&rm.linear_sampler),
                        },
                    ],
                });

                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Mipmap Blit"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &target_view,
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
    }
}

impl Default for MipmapGenerator {
    fn default() -> Self {
        Self::new()
    }
}
