//! Irradiance probe baking.
//!
//! Probes form a regular 3D lattice between two world-space bounds. Each
//! probe captures the scene through six 90-degree faces rendered with the
//! forward path, reads the faces back, and projects them onto 9 spherical
//! harmonics coefficients. All probes are then packed into a 9xN float
//! texture (nearest filtering; interpolation, when wanted, happens in the
//! consuming shader).

use glam::{UVec3, Vec3, Vec4};

use crate::errors::{CandelaError, Result};
use crate::renderer::baking::sh::{
    CUBE_FACE_FORWARD, CUBE_FACE_UP, FloatImage, SphericalHarmonics9, project_sh,
};
use crate::renderer::extract::ExtractedScene;
use crate::renderer::passes::forward::{ForwardPass, ForwardTarget, ShadowLookup};
use crate::renderer::passes::skybox::SkyboxPass;
use crate::renderer::resource_manager::{GpuTexture, ResourceManager};
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::targets::{DEPTH_FORMAT, HDR_FORMAT, RenderTarget};
use crate::renderer::uniforms::CameraUniforms;
use crate::scene::{Camera, Scene};

/// Resolution of each capture face.
const CAPTURE_SIZE: u32 = 64;
/// Bytes per Rgba16Float pixel.
const CAPTURE_PIXEL_BYTES: u32 = 8;

/// A regular 3D probe lattice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrradianceGrid {
    pub start: Vec3,
    pub end: Vec3,
    pub dims: UVec3,
    /// Per-axis probe spacing, `(end - start) / (dims - 1)`.
    pub delta: Vec3,
}

impl IrradianceGrid {
    /// Builds a grid; every dimension must be at least 1.
    pub fn new(start: Vec3, end: Vec3, dims: UVec3) -> Result<Self> {
        if dims.x == 0 || dims.y == 0 || dims.z == 0 {
            return Err(CandelaError::InvalidGridDims(dims.x, dims.y, dims.z));
        }
        let span = end - start;
        let delta = Vec3::new(
            if dims.x > 1 { span.x / (dims.x - 1) as f32 } else { 0.0 },
            if dims.y > 1 { span.y / (dims.y - 1) as f32 } else { 0.0 },
            if dims.z > 1 { span.z / (dims.z - 1) as f32 } else { 0.0 },
        );
        Ok(Self {
            start,
            end,
            dims,
            delta,
        })
    }

    #[must_use]
    pub fn probe_count(&self) -> usize {
        (self.dims.x * self.dims.y * self.dims.z) as usize
    }

    /// Flattened probe index: `x + y*dimX + z*dimX*dimY`. A bijection onto
    /// `[0, probe_count)` for in-range cells.
    #[must_use]
    pub fn index(&self, x: u32, y: u32, z: u32) -> usize {
        (x + y * self.dims.x + z * self.dims.x * self.dims.y) as usize
    }

    /// World position of a lattice cell.
    #[must_use]
    pub fn position(&self, x: u32, y: u32, z: u32) -> Vec3 {
        self.start + self.delta * Vec3::new(x as f32, y as f32, z as f32)
    }

    /// Cells in bake order (z-major, then y, then x).
    pub fn cells(&self) -> impl Iterator<Item = UVec3> + '_ {
        let dims = self.dims;
        (0..dims.z).flat_map(move |z| {
            (0..dims.y).flat_map(move |y| (0..dims.x).map(move |x| UVec3::new(x, y, z)))
        })
    }
}

/// One baked probe.
#[derive(Debug, Clone, PartialEq)]
pub struct IrradianceProbe {
    pub index: UVec3,
    pub position: Vec3,
    pub sh: SphericalHarmonics9,
}

/// A baked (or loaded) probe volume.
#[derive(Debug, Clone, PartialEq)]
pub struct IrradianceVolume {
    pub grid: IrradianceGrid,
    /// Probes in bake order; `grid.index` maps a cell to its slot.
    pub probes: Vec<IrradianceProbe>,
}

/// GPU-side capture plumbing for irradiance baking.
pub struct IrradianceBaker {
    capture: Option<CaptureTargets>,
}

struct CaptureTargets {
    color: RenderTarget,
    bright: RenderTarget,
    depth: RenderTarget,
    readback: wgpu::Buffer,
}

impl IrradianceBaker {
    #[must_use]
    pub fn new() -> Self {
        Self { capture: None }
    }

    fn ensure_capture(&mut self, device: &wgpu::Device) -> &CaptureTargets {
        self.capture.get_or_insert_with(|| {
            let size = (CAPTURE_SIZE, CAPTURE_SIZE);
            let color = RenderTarget::new(
                device,
                size,
                HDR_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                "Irradiance Capture Color",
            );
            let bright = RenderTarget::new(
                device,
                size,
                HDR_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
                "Irradiance Capture Bright",
            );
            let depth = RenderTarget::new(
                device,
                size,
                DEPTH_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
                "Irradiance Capture Depth",
            );
            let readback = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Irradiance Readback"),
                size: u64::from(CAPTURE_SIZE * CAPTURE_SIZE * CAPTURE_PIXEL_BYTES),
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });
            CaptureTargets {
                color,
                bright,
                depth,
                readback,
            }
        })
    }

    /// Bakes the full probe volume for `scene`, blocking until complete.
    ///
    /// Captures go through the forward scene path, skybox included, so the
    /// probes pick up both direct lighting and the environment.
    pub fn bake(
        &mut self,
        rm: &mut ResourceManager,
        shaders: &mut ShaderLibrary,
        forward: &mut ForwardPass,
        skybox_pass: &mut SkyboxPass,
        environment: Option<(&wgpu::TextureView, u64)>,
        scene: &Scene,
        grid: IrradianceGrid,
    ) -> Result<IrradianceVolume> {
        let mut extracted = ExtractedScene::default();
        extracted.extract_unculled(scene);

        let visible_lights = scene.lights.iter().filter(|l| l.visible).count() as u32;
        log::info!(
            "baking irradiance: {} probes, {} items, {} lights",
            grid.probe_count(),
            extracted.items.len(),
            visible_lights,
        );

        self.ensure_capture(&rm.device);

        let mut probes = Vec::with_capacity(grid.probe_count());
        for cell in grid.cells().collect::<Vec<_>>() {
            let position = grid.position(cell.x, cell.y, cell.z);
            let faces = self.capture_faces(
                rm,
                shaders,
                forward,
                skybox_pass,
                environment,
                scene,
                &extracted,
                position,
            )?;
            probes.push(IrradianceProbe {
                index: cell,
                position,
                sh: project_sh(&faces),
            });
        }

        Ok(IrradianceVolume { grid, probes })
    }

    /// Renders and reads back the six faces around `position`.
    fn capture_faces(
        &mut self,
        rm: &mut ResourceManager,
        shaders: &mut ShaderLibrary,
        forward: &mut ForwardPass,
        skybox_pass: &mut SkyboxPass,
        environment: Option<(&wgpu::TextureView, u64)>,
        scene: &Scene,
        extracted: &ExtractedScene,
        position: Vec3,
    ) -> Result<[FloatImage; 6]> {
        let mut faces: Vec<FloatImage> = Vec::with_capacity(6);
        for face in 0..6 {
            let mut camera = Camera::perspective(90.0, 1.0, 0.1, 1000.0);
            camera.look_at(
                position,
                position + CUBE_FACE_FORWARD[face],
                CUBE_FACE_UP[face],
            );

            // Each face is its own tiny frame: reserve, render, read back.
            let lights = scene.lights.iter().filter(|l| l.visible).count() as u32;
            rm.begin_frame(1, extracted.items.len() as u32, lights.max(1));

            let view_projection = camera.view_projection();
            let globals = CameraUniforms {
                view_projection,
                inverse_view_projection: view_projection.inverse(),
                camera_position: Vec4::from((position, 1.0)),
                inverse_resolution: [1.0 / CAPTURE_SIZE as f32; 2],
                time: 0.0,
                _pad: 0.0,
            };
            let globals_offset = rm.globals.push(&rm.queue, &globals);

            let mut encoder = rm
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Irradiance Capture Encoder"),
                });

            {
                let capture = self.capture.as_ref().expect("ensured in bake");
                // Background first, then the scene on top of it.
                skybox_pass.run(
                    rm,
                    shaders,
                    &mut encoder,
                    &capture.color.view,
                    wgpu::Color::BLACK,
                    environment,
                    globals_offset,
                );
                let target = ForwardTarget {
                    color: &capture.color.view,
                    bright: &capture.bright.view,
                    depth: &capture.depth.view,
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
            }

            let capture = self.capture.as_ref().expect("ensured in bake");
            encoder.copy_texture_to_buffer(
                capture.color.texture.as_image_copy(),
                wgpu::TexelCopyBufferInfo {
                    buffer: &capture.readback,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(CAPTURE_SIZE * CAPTURE_PIXEL_BYTES),
                        rows_per_image: Some(CAPTURE_SIZE),
                    },
                },
                wgpu::Extent3d {
                    width: CAPTURE_SIZE,
                    height: CAPTURE_SIZE,
                    depth_or_array_layers: 1,
                },
            );
            rm.queue.submit(std::iter::once(encoder.finish()));

            faces.push(Self::read_face(&rm.device, &capture.readback)?);
        }

        Ok(faces.try_into().expect("exactly six faces captured"))
    }

    /// Maps the readback buffer and decodes Rgba16Float to RGB f32.
    fn read_face(device: &wgpu::Device, readback: &wgpu::Buffer) -> Result<FloatImage> {
        let slice = readback.slice(..);
        slice.map_async(wgpu::MapMode::Read, |_| {});
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| CandelaError::ReadbackFailed(format!("{e:?}")))?;

        let pixels = {
            let data = slice.get_mapped_range();
            let bits: &[u16] = bytemuck::cast_slice(&data);
            bits.chunks_exact(4)
                .map(|px| {
                    Vec3::new(
                        half::f16::from_bits(px[0]).to_f32(),
                        half::f16::from_bits(px[1]).to_f32(),
                        half::f16::from_bits(px[2]).to_f32(),
                    )
                })
                .collect::<Vec<_>>()
        };
        readback.unmap();

        Ok(FloatImage::new(CAPTURE_SIZE, CAPTURE_SIZE, pixels))
    }
}

impl Default for IrradianceBaker {
    fn default() -> Self {
        Self::new()
    }
}

/// Packs a probe volume into the 9xN float texture sampled by the geometry
/// stage. Row `i` holds probe `i`'s nine coefficients; filtering is
/// nearest, so any interpolation happens in the shader.
pub fn pack_probe_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    volume: &IrradianceVolume,
) -> GpuTexture {
    let probe_count = volume.grid.probe_count() as u32;
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Irradiance Probes Texture"),
        size: wgpu::Extent3d {
            width: 9,
            height: probe_count.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba32Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    // Probes land at their flattened grid index regardless of bake order.
    let mut data = vec![[0.0f32; 4]; (probe_count * 9) as usize];
    for probe in &volume.probes {
        let row = volume
            .grid
            .index(probe.index.x, probe.index.y, probe.index.z);
        for (i, c) in probe.sh.coefficients.iter().enumerate() {
            data[row * 9 + i] = [c.x, c.y, c.z, 0.0];
        }
    }

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(&data),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(9 * 16),
            rows_per_image: Some(probe_count.max(1)),
        },
        wgpu::Extent3d {
            width: 9,
            height: probe_count.max(1),
            depth_or_array_layers: 1,
        },
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture { texture, view }
}
