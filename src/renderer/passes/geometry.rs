//! Deferred geometry pass.
//!
//! Rasterizes the culled draw list into the four-target G-buffer. Each draw
//! binds the full material texture set (with sentinels for absent maps) and
//! the irradiance probe grid, so baked ambient lighting is resolved here
//! and stored per pixel for the lighting resolve to consume.
//!
//! Single pass per frame, no blending, standard less-than depth test.

use wgpu::util::DeviceExt;

use crate::renderer::extract::RenderItem;
use crate::renderer::resource_manager::ResourceManager;
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::targets::{DEPTH_FORMAT, FrameTargets, HDR_FORMAT};
use crate::renderer::uniforms::{IrradianceUniforms, ModelUniforms};
use crate::resources::Vertex;

pub struct GeometryPass {
    /// Pipelines keyed by the material's two-sided flag.
    pipelines: [Option<wgpu::RenderPipeline>; 2],
    irradiance_layout: Option<wgpu::BindGroupLayout>,
    irradiance_buffer: Option<wgpu::Buffer>,
    /// (probes texture version, bind group); rebuilt after a bake or load.
    irradiance_bind_group: Option<(u64, wgpu::BindGroup)>,
}

impl GeometryPass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipelines: [None, None],
            irradiance_layout: None,
            irradiance_buffer: None,
            irradiance_bind_group: None,
        }
    }

    fn ensure_layout(&mut self, rm: &ResourceManager) -> &wgpu::BindGroupLayout {
        self.irradiance_layout.get_or_insert_with(|| {
            rm.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Irradiance Layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: wgpu::BufferSize::new(
                                    std::mem::size_of::<IrradianceUniforms>() as u64,
                                ),
                            },
                            count: None,
                        },
                        // The 9xN probe texture is read with textureLoad;
                        // declare it non-filterable float.
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
                    ],
                })
        })
    }

    fn ensure_pipelines(&mut self, rm: &ResourceManager, shaders: &mut ShaderLibrary) -> bool {
        if self.pipelines[0].is_some() {
            return true;
        }
        let Some(shader) = shaders.get(&rm.device, "gbuffer") else {
            return false;
        };
        self.ensure_layout(rm);
        let irradiance_layout = self.irradiance_layout.as_ref().expect("ensured above");

        let pipeline_layout = rm
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("GBuffer Pipeline Layout"),
                bind_group_layouts: &[
                    Some(&rm.globals_layout),
                    Some(irradiance_layout),
                    Some(&rm.material_layout),
                    Some(&rm.object_layout),
                ],
                immediate_size: 0,
            });

        let targets = [
            super::color_target(HDR_FORMAT, None),
            super::color_target(HDR_FORMAT, None),
            super::color_target(HDR_FORMAT, None),
            super::color_target(HDR_FORMAT, None),
        ];

        for (index, cull_mode) in [(0, Some(wgpu::Face::Back)), (1, None)] {
            self.pipelines[index] = Some(rm.device.create_render_pipeline(
                &wgpu::RenderPipelineDescriptor {
                    label: Some("GBuffer Pipeline"),
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
                        cull_mode,
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
        }
        true
    }

    fn ensure_irradiance_bind_group(
        &mut self,
        rm: &ResourceManager,
        uniforms: &IrradianceUniforms,
        probes_view: Option<&wgpu::TextureView>,
        probes_version: u64,
    ) {
        let buffer = self.irradiance_buffer.get_or_insert_with(|| {
            rm.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Irradiance Uniforms"),
                    contents: bytemuck::bytes_of(uniforms),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                })
        });
        rm.queue
            .write_buffer(buffer, 0, bytemuck::bytes_of(uniforms));

        let stale = self
            .irradiance_bind_group
            .as_ref()
            .is_none_or(|(version, _)| *version != probes_version);
        if stale {
            let layout = self.irradiance_layout.as_ref().expect("ensured earlier");
            let view = probes_view.unwrap_or(&rm.dummy_probes.view);
            let bind_group = rm.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Irradiance BindGroup"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self
                            .irradiance_buffer
                            .as_ref()
                            .expect("created above")
                            .as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                ],
            });
            self.irradiance_bind_group = Some((probes_version, bind_group));
        }
    }

    pub fn run(
        &mut self,
        rm: &mut ResourceManager,
        shaders: &mut ShaderLibrary,
        encoder: &mut wgpu::CommandEncoder,
        targets: &FrameTargets,
        items: &[RenderItem],
        globals_offset: u32,
        clear_color: wgpu::Color,
        irradiance: &IrradianceUniforms,
        probes_view: Option<&wgpu::TextureView>,
        probes_version: u64,
    ) {
        if !self.ensure_pipelines(rm, shaders) {
            log::debug!("geometry pass skipped: shader unavailable");
            return;
        }
        self.ensure_irradiance_bind_group(rm, irradiance, probes_view, probes_version);

        let mut draws = Vec::with_capacity(items.len());
        for item in items {
            rm.ensure_mesh(&item.mesh);
            rm.ensure_material(&item.material);
            let offset = rm.objects.push(&rm.queue, &ModelUniforms { model: item.model });
            draws.push((item, offset));
        }

        fn color_attachment(
            view: &wgpu::TextureView,
            clear: wgpu::Color,
        ) -> Option<wgpu::RenderPassColorAttachment<'_>> {
            Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })
        }

        let gbuffer = &targets.gbuffer;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Geometry Pass"),
            color_attachments: &[
                color_attachment(&gbuffer.albedo.view, clear_color),
                color_attachment(&gbuffer.normal.view, wgpu::Color::BLACK),
                color_attachment(&gbuffer.material.view, wgpu::Color::BLACK),
                color_attachment(&gbuffer.irradiance.view, wgpu::Color::BLACK),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &gbuffer.depth.view,
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

        pass.set_bind_group(0, rm.globals_bind_group(), &[globals_offset]);
        let (_, irradiance_bind_group) = self
            .irradiance_bind_group
            .as_ref()
            .expect("ensured earlier");
        pass.set_bind_group(1, irradiance_bind_group, &[]);

        for (item, object_offset) in &draws {
            let Some(gpu_mesh) = rm.mesh(item.mesh.id()) else {
                continue;
            };
            let Some(gpu_material) = rm.material(item.material.id()) else {
                continue;
            };

            let pipeline_index = usize::from(item.material.two_sided);
            pass.set_pipeline(
                self.pipelines[pipeline_index]
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

impl Default for GeometryPass {
    fn default() -> Self {
        Self::new()
    }
}
