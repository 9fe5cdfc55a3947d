//! Reflection probe capture.
//!
//! Probes are placed by hand at fixed world positions; each owns a mipped
//! cubemap captured through the forward path. Re-baking overwrites the
//! cubemap in place. At composite time the renderer picks the nearest
//! captured probe within [`CAPTURE_RADIUS`] of the camera, falling back to
//! the skybox.

use glam::{Vec3, Vec4};

use crate::renderer::baking::mipmap::MipmapGenerator;
use crate::renderer::baking::sh::{CUBE_FACE_FORWARD, CUBE_FACE_UP};
use crate::renderer::extract::ExtractedScene;
use crate::renderer::passes::forward::{ForwardPass, ForwardTarget, ShadowLookup};
use crate::renderer::passes::skybox::SkyboxPass;
use crate::renderer::resource_manager::ResourceManager;
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::targets::{DEPTH_FORMAT, HDR_FORMAT, RenderTarget};
use crate::renderer::uniforms::CameraUniforms;
use crate::scene::{Camera, Scene};

/// Probes farther than this from the camera never win the selection.
pub const CAPTURE_RADIUS: f32 = 105.0;
/// Cubemap face resolution.
pub const CUBEMAP_SIZE: u32 = 512;

/// Picks the probe used for reflection compositing: the nearest position
/// within [`CAPTURE_RADIUS`] of `camera_position`, or `None` for the
/// skybox fallback.
#[must_use]
pub fn select_probe(camera_position: Vec3, probe_positions: &[Vec3]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, position) in probe_positions.iter().enumerate() {
        let dist = camera_position.distance(*position);
        if dist < CAPTURE_RADIUS && best.is_none_or(|(_, d)| dist < d) {
            best = Some((i, dist));
        }
    }
    best.map(|(i, _)| i)
}

/// A reflection probe and its captured cubemap.
pub struct ReflectionProbe {
    pub position: Vec3,
    pub(crate) texture: wgpu::Texture,
    pub(crate) cube_view: wgpu::TextureView,
    /// Set once the probe has been captured at least once.
    pub captured: bool,
}

impl ReflectionProbe {
    pub(crate) fn new(device: &wgpu::Device, position: Vec3) -> Self {
        let mip_level_count = CUBEMAP_SIZE.ilog2() + 1;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Reflection Probe Cubemap"),
            size: wgpu::Extent3d {
                width: CUBEMAP_SIZE,
                height: CUBEMAP_SIZE,
                depth_or_array_layers: 6,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HDR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let cube_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Reflection Probe Cube View"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        Self {
            position,
            texture,
            cube_view,
            captured: false,
        }
    }

    /// The cubemap view bound by the reflections pass.
    #[must_use]
    pub fn cube_view(&self) -> &wgpu::TextureView {
        &self.cube_view
    }
}

/// Captures every probe's cubemap from the scene.
pub struct ReflectionBaker {
    mipmaps: MipmapGenerator,
    capture_depth: Option<RenderTarget>,
    capture_bright: Option<RenderTarget>,
}

impl ReflectionBaker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mipmaps: MipmapGenerator::new(),
            capture_depth: None,
            capture_bright: None,
        }
    }

    /// Re-captures all probes in place, blocking until submitted.
    pub fn bake(
        &mut self,
        rm: &mut ResourceManager,
        shaders: &mut ShaderLibrary,
        forward: &mut ForwardPass,
        skybox_pass: &mut SkyboxPass,
        environment: Option<(&wgpu::TextureView, u64)>,
        scene: &Scene,
        probes: &mut [ReflectionProbe],
    ) {
        if probes.is_empty() {
            return;
        }

        let mut extracted = ExtractedScene::default();
        extracted.extract_unculled(scene);
        log::info!(
            "baking reflections: {} probes, {} items",
            probes.len(),
            extracted.items.len()
        );

        let size = (CUBEMAP_SIZE, CUBEMAP_SIZE);
        let depth = self.capture_depth.get_or_insert_with(|| {
            RenderTarget::new(
                &rm.device,
                size,
                DEPTH_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
                "Reflection Capture Depth",
            )
        });
        let bright = self.capture_bright.get_or_insert_with(|| {
            RenderTarget::new(
                &rm.device,
                size,
                HDR_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
                "Reflection Capture Bright",
            )
        });
        // Split the borrows for the capture loop below.
        let depth_view = &depth.view;
        let bright_view = &bright.view;

        for probe in probes.iter_mut() {
            for face in 0..6 {
                let mut camera = Camera::perspective(90.0, 1.0, 0.1, 1000.0);
                camera.look_at(
                    probe.position,
                    probe.position + CUBE_FACE_FORWARD[face],
                    CUBE_FACE_UP[face],
                );

                let lights = scene.lights.iter().filter(|l| l.visible).count() as u32;
                rm.begin_frame(1, extracted.items.len() as u32, lights.max(1));

                let view_projection = camera.view_projection();
                let globals = CameraUniforms {
                    view_projection,
                    inverse_view_projection: view_projection.inverse(),
                    camera_position: Vec4::from((probe.position, 1.0)),
                    inverse_resolution: [1.0 / CUBEMAP_SIZE as f32; 2],
                    time: 0.0,
                    _pad: 0.0,
                };
                let globals_offset = rm.globals.push(&rm.queue, &globals);

                let face_view = probe.texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Reflection Capture Face"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_mip_level: 0,
                    mip_level_count: Some(1),
                    base_array_layer: face as u32,
                    array_layer_count: Some(1),
                    ..Default::default()
                });

                let mut encoder =
                    rm.device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("Reflection Capture Encoder"),
                        });

                skybox_pass.run(
                    rm,
                    shaders,
                    &mut encoder,
                    &face_view,
                    wgpu::Color::BLACK,
                    environment,
                    globals_offset,
                );
                let target = ForwardTarget {
                    color: &face_view,
                    bright: bright_view,
                    depth: depth_view,
                    clear: None,
                };
                forward.run(
                    rm,
                    shaders,
                    &mut encoder,
                    &target,
                    &extracted.items,
                    &scene.lights,
                    scene.ambient_light,
                    &ShadowLookup::default(),
                    globals_offset,
                );

                rm.queue.submit(std::iter::once(encoder.finish()));
            }

            // Roughness-based lookup wants the full mip chain.
            let mut encoder = rm
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Reflection Mipmap Encoder"),
                });
            self.mipmaps.generate(rm, shaders, &mut encoder, &probe.texture);
            rm.queue.submit(std::iter::once(encoder.finish()));

            probe.captured = true;
        }
    }
}

impl Default for ReflectionBaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_nearest_probe_within_radius() {
        let positions = [
            Vec3::new(100.0, 0.0, 0.0),
            Vec3::new(30.0, 0.0, 0.0),
            Vec3::new(50.0, 0.0, 0.0),
        ];
        assert_eq!(select_probe(Vec3::ZERO, &positions), Some(1));
    }

    #[test]
    fn falls_back_to_skybox_outside_radius() {
        let positions = [Vec3::new(200.0, 0.0, 0.0), Vec3::new(0.0, 150.0, 0.0)];
        assert_eq!(select_probe(Vec3::ZERO, &positions), None);
    }

    #[test]
    fn radius_boundary_is_exclusive() {
        let positions = [Vec3::new(CAPTURE_RADIUS, 0.0, 0.0)];
        assert_eq!(select_probe(Vec3::ZERO, &positions), None);
        let positions = [Vec3::new(CAPTURE_RADIUS - 0.1, 0.0, 0.0)];
        assert_eq!(select_probe(Vec3::ZERO, &positions), Some(0));
    }
}
