//! Screen-space ambient occlusion.
//!
//! Estimates per-pixel occlusion by scattering a fixed set of randomized
//! sphere sample points around each reconstructed surface position and
//! counting how many fall behind the depth buffer. The kernel is generated
//! once on the CPU; the hemisphere restriction folds the lower half of the
//! sphere upwards.

use glam::{Vec3, Vec4};
use rand::RngExt;
use wgpu::util::DeviceExt;

use crate::renderer::resource_manager::ResourceManager;
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::targets::{FrameTargets, SSAO_FORMAT};
use crate::renderer::uniforms::{SSAO_KERNEL_SIZE, SsaoUniforms};

/// Generates `count` points randomly distributed inside a sphere of the
/// given radius. With `hemisphere` set, points are mirrored into z >= 0.
///
/// Radii are biased away from the center (cube-root falloff) so samples
/// cover the shell rather than clustering at the origin.
#[must_use]
pub fn generate_sphere_points(count: usize, radius: f32, hemisphere: bool) -> Vec<Vec3> {
    let mut rng = rand::rng();
    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let u: f32 = rng.random();
        let v: f32 = rng.random();
        let theta = u * std::f32::consts::TAU;
        let phi = (2.0 * v - 1.0).acos();
        let r = (rng.random::<f32>() * 0.9 + 0.1).cbrt() * radius;

        let mut p = Vec3::new(
            r * phi.sin() * theta.cos(),
            r * phi.sin() * theta.sin(),
            r * phi.cos(),
        );
        if hemisphere && p.z < 0.0 {
            p.z = -p.z;
        }
        points.push(p);
    }
    points
}

pub struct SsaoPass {
    pipeline: Option<wgpu::RenderPipeline>,
    layout: Option<wgpu::BindGroupLayout>,
    params_buffer: Option<wgpu::Buffer>,
    /// Kernel flavor baked into `params_buffer`.
    kernel_hemisphere: bool,
    /// Keyed by targets generation.
    bind_group: Option<(u64, wgpu::BindGroup)>,
}

impl SsaoPass {
    /// World-space sampling radius.
    pub const RADIUS: f32 = 1.0;

    #[must_use]
    pub fn new() -> Self {
        Self {
            pipeline: None,
            layout: None,
            params_buffer: None,
            kernel_hemisphere: true,
            bind_group: None,
        }
    }

    fn build_uniforms(hemisphere: bool) -> SsaoUniforms {
        let points = generate_sphere_points(SSAO_KERNEL_SIZE, 1.0, hemisphere);
        let mut kernel = [Vec4::ZERO; SSAO_KERNEL_SIZE];
        for (slot, point) in kernel.iter_mut().zip(points) {
            *slot = Vec4::from((point, 0.0));
        }
        SsaoUniforms {
            kernel,
            radius: Self::RADIUS,
            _pad: [0.0; 3],
        }
    }

    fn ensure_params(&mut self, rm: &ResourceManager, hemisphere: bool) {
        let rebuild = self.params_buffer.is_none() || self.kernel_hemisphere != hemisphere;
        if !rebuild {
            return;
        }
        let uniforms = Self::build_uniforms(hemisphere);
        match &self.params_buffer {
            Some(buffer) => rm.queue.write_buffer(buffer, 0, bytemuck::bytes_of(&uniforms)),
            None => {
                self.params_buffer = Some(rm.device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("SSAO Params"),
                        contents: bytemuck::bytes_of(&uniforms),
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    },
                ));
            }
        }
        self.kernel_hemisphere = hemisphere;
        // The kernel lives in the same buffer the bind group references, so
        // the bind group itself stays valid.
    }

    fn ensure_pipeline(&mut self, rm: &ResourceManager, shaders: &mut ShaderLibrary) -> bool {
        if self.pipeline.is_some() {
            return true;
        }
        let Some(shader) = shaders.get(&rm.device, "ssao") else {
            return false;
        };

        let layout = self.layout.get_or_insert_with(|| {
            rm.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("SSAO Layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: wgpu::BufferSize::new(
                                    std::mem::size_of::<SsaoUniforms>() as u64,
                                ),
                            },
                            count: None,
                        },
                        ResourceManager::depth_entry(1),
                        wgpu::BindGroupLayoutEntry {
                            binding: 2,
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
        });

        let targets = [super::color_target(SSAO_FORMAT, None)];
        self.pipeline = Some(super::fullscreen_pipeline(
            &rm.device,
            &shader,
            &[&rm.globals_layout, layout],
            &targets,
            "SSAO Pipeline",
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
        hemisphere: bool,
        globals_offset: u32,
    ) {
        if !self.ensure_pipeline(rm, shaders) {
            log::debug!("ssao pass skipped: shader unavailable");
            return;
        }
        self.ensure_params(rm, hemisphere);

        let stale = self
            .bind_group
            .as_ref()
            .is_none_or(|(generation, _)| *generation != targets_generation);
        if stale {
            let layout = self.layout.as_ref().expect("ensured with pipeline");
            let bind_group = rm.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("SSAO BindGroup"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self
                            .params_buffer
                            .as_ref()
                            .expect("ensured above")
                            .as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&targets.gbuffer.depth.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&targets.gbuffer.normal.view),
                    },
                ],
            });
            self.bind_group = Some((targets_generation, bind_group));
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("SSAO Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.ssao.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
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
        let (_, bind_group) = self.bind_group.as_ref().expect("ensured above");
        pass.set_bind_group(1, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

impl Default for SsaoPass {
    fn default() -> Self {
        Self::new()
    }
}
