//! The renderer.
//!
//! [`Renderer::render`] drives one frame: the scene is extracted and
//! culled, a pass plan is computed from the pipeline mode, the post-effect
//! toggles and the scene's lights, and the plan is executed into a single
//! command stream. Pass outputs flow strictly forward (shadow maps before
//! lighting, G-buffer before the resolve, the resolve before every post
//! stage), so the one submitted command buffer is all the synchronization
//! the frame needs.
//!
//! Baking (irradiance probes, reflection probes) is triggered on demand
//! through the same renderer and blocks until finished.

pub mod baking;
pub mod context;
pub mod extract;
pub mod passes;
pub mod plan;
pub mod resource_manager;
pub mod settings;
pub mod shaders;
pub mod targets;
pub mod uniforms;

use std::path::Path;
use std::sync::Arc;

use glam::{Vec3, Vec4};

use crate::errors::{CandelaError, Result};
use crate::resources::Texture;
use crate::scene::{Camera, Scene};

use self::baking::io;
use self::baking::irradiance::{
    IrradianceBaker, IrradianceGrid, IrradianceVolume, pack_probe_texture,
};
use self::baking::reflection::{ReflectionBaker, ReflectionProbe, select_probe};
pub use self::context::GpuContext;
use self::extract::ExtractedScene;
use self::passes::decal::DecalConfig;
use self::passes::forward::{ForwardPass, ForwardTarget, ShadowLookup};
use self::passes::geometry::GeometryPass;
use self::passes::lighting::LightingPass;
use self::passes::reflections::ReflectionsPass;
use self::passes::shadow::ShadowPass;
use self::passes::skybox::SkyboxPass;
use self::passes::ssao::SsaoPass;
use self::passes::tone_mapping::ToneMapPass;
use self::passes::volumetric::VolumetricPass;
use self::plan::{FrameFacts, PassKind, plan_frame};
use self::resource_manager::{GpuTexture, ResourceManager};
use self::settings::{PipelineMode, PostEffects, RendererSettings};
use self::shaders::ShaderLibrary;
use self::targets::FrameTargetSet;
use self::uniforms::{CameraUniforms, IrradianceUniforms};

pub struct Renderer {
    ctx: GpuContext,
    rm: ResourceManager,
    shaders: ShaderLibrary,
    settings: RendererSettings,
    size: (u32, u32),

    target_set: FrameTargetSet,
    extracted: ExtractedScene,

    // Passes
    shadow_pass: ShadowPass,
    geometry_pass: GeometryPass,
    lighting_pass: LightingPass,
    forward_pass: ForwardPass,
    skybox_pass: SkyboxPass,
    ssao_pass: SsaoPass,
    decal_pass: passes::decal::DecalPass,
    reflections_pass: ReflectionsPass,
    volumetric_pass: VolumetricPass,
    bloom_pass: passes::bloom::BloomPass,
    tone_map_pass: ToneMapPass,

    // Baking state
    irradiance_baker: IrradianceBaker,
    irradiance: Option<IrradianceVolume>,
    probes_texture: Option<GpuTexture>,
    probes_version: u64,
    reflection_baker: ReflectionBaker,
    reflection_probes: Vec<ReflectionProbe>,
    reflections_version: u64,

    // Environment
    skybox: Option<GpuTexture>,
    skybox_version: u64,
    decal: Option<DecalConfig>,

    started: std::time::Instant,
}

impl Renderer {
    /// Creates a renderer with its own GPU context.
    pub fn new(settings: RendererSettings) -> Result<Self> {
        let ctx = GpuContext::new(settings.power_preference)?;
        Ok(Self::from_context(ctx, settings))
    }

    /// Creates a renderer on an existing device/queue (shared with the
    /// application that owns the window surface).
    #[must_use]
    pub fn from_context(ctx: GpuContext, settings: RendererSettings) -> Self {
        let rm = ResourceManager::new(ctx.device.clone(), ctx.queue.clone());
        let tone_map_pass = ToneMapPass::new(settings.output_format);
        Self {
            ctx,
            rm,
            shaders: ShaderLibrary::new(),
            settings,
            size: (0, 0),
            target_set: FrameTargetSet::default(),
            extracted: ExtractedScene::default(),
            shadow_pass: ShadowPass::new(),
            geometry_pass: GeometryPass::new(),
            lighting_pass: LightingPass::new(),
            forward_pass: ForwardPass::new(),
            skybox_pass: SkyboxPass::new(),
            ssao_pass: SsaoPass::new(),
            decal_pass: passes::decal::DecalPass::new(),
            reflections_pass: ReflectionsPass::new(),
            volumetric_pass: VolumetricPass::new(),
            bloom_pass: passes::bloom::BloomPass::new(),
            tone_map_pass,
            irradiance_baker: IrradianceBaker::new(),
            irradiance: None,
            probes_texture: None,
            probes_version: 0,
            reflection_baker: ReflectionBaker::new(),
            reflection_probes: Vec::new(),
            reflections_version: 0,
            skybox: None,
            skybox_version: 0,
            decal: None,
            started: std::time::Instant::now(),
        }
    }

    // ── Configuration ────────────────────────────────────────────────────

    /// Sets the viewport size; offscreen targets are recreated lazily on
    /// the next frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    pub fn set_mode(&mut self, mode: PipelineMode) {
        self.settings.mode = mode;
    }

    pub fn effects_mut(&mut self) -> &mut PostEffects {
        &mut self.settings.effects
    }

    pub fn tone_mapping_mut(&mut self) -> &mut settings::ToneMapping {
        &mut self.settings.tone_mapping
    }

    /// Installs the global skybox from six RGBA8 faces in +X, -X, +Y, -Y,
    /// +Z, -Z order.
    pub fn set_skybox(&mut self, face_size: u32, faces: &[Vec<u8>; 6]) {
        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Skybox Cubemap"),
            size: wgpu::Extent3d {
                width: face_size,
                height: face_size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (layer, face) in faces.iter().enumerate() {
            self.ctx.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                face,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(face_size * 4),
                    rows_per_image: Some(face_size),
                },
                wgpu::Extent3d {
                    width: face_size,
                    height: face_size,
                    depth_or_array_layers: 1,
                },
            );
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Skybox Cube View"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        self.skybox = Some(GpuTexture { texture, view });
        self.skybox_version += 1;
    }

    /// Places (or replaces) the projected decal.
    pub fn set_decal(&mut self, transform: glam::Affine3A, texture: Arc<Texture>) {
        self.decal = Some(DecalConfig { transform, texture });
    }

    pub fn clear_decal(&mut self) {
        self.decal = None;
    }

    // ── Baking ───────────────────────────────────────────────────────────

    /// Bakes the irradiance probe volume for `scene`, blocking the caller
    /// until every probe has been captured and projected.
    pub fn bake_irradiance(&mut self, scene: &Scene, grid: IrradianceGrid) -> Result<()> {
        let environment = self
            .skybox
            .as_ref()
            .map(|s| (&s.view, self.skybox_version));
        let volume = self.irradiance_baker.bake(
            &mut self.rm,
            &mut self.shaders,
            &mut self.forward_pass,
            &mut self.skybox_pass,
            environment,
            scene,
            grid,
        )?;
        self.install_irradiance(volume);
        Ok(())
    }

    /// The current probe volume, if baked or loaded.
    #[must_use]
    pub fn irradiance(&self) -> Option<&IrradianceVolume> {
        self.irradiance.as_ref()
    }

    pub fn save_irradiance(&self, path: &Path) -> Result<()> {
        let volume = self.irradiance.as_ref().ok_or(CandelaError::NoIrradianceData)?;
        io::save_irradiance(path, volume)
    }

    /// Loads a previously saved probe volume. On any failure the current
    /// volume is left untouched.
    pub fn load_irradiance(&mut self, path: &Path) -> Result<()> {
        let volume = io::load_irradiance(path)?;
        self.install_irradiance(volume);
        Ok(())
    }

    fn install_irradiance(&mut self, volume: IrradianceVolume) {
        self.probes_texture = Some(pack_probe_texture(
            &self.ctx.device,
            &self.ctx.queue,
            &volume,
        ));
        self.irradiance = Some(volume);
        self.probes_version += 1;
    }

    /// Adds a reflection probe at a fixed position; returns its slot.
    pub fn add_reflection_probe(&mut self, position: Vec3) -> usize {
        self.reflection_probes
            .push(ReflectionProbe::new(&self.ctx.device, position));
        self.reflection_probes.len() - 1
    }

    /// Re-captures every reflection probe's cubemap from `scene`.
    pub fn compute_reflections(&mut self, scene: &Scene) {
        let environment = self
            .skybox
            .as_ref()
            .map(|s| (&s.view, self.skybox_version));
        self.reflection_baker.bake(
            &mut self.rm,
            &mut self.shaders,
            &mut self.forward_pass,
            &mut self.skybox_pass,
            environment,
            scene,
            &mut self.reflection_probes,
        );
        self.reflections_version += 1;
    }

    // ── Frame rendering ──────────────────────────────────────────────────

    /// Renders one frame of `scene` as seen by `camera` into `output`.
    ///
    /// `output` must match the configured output format and the size set
    /// by [`resize`](Self::resize).
    pub fn render(&mut self, scene: &Scene, camera: &Camera, output: &wgpu::TextureView) {
        if self.size.0 == 0 || self.size.1 == 0 {
            log::debug!("render skipped: zero-sized viewport");
            return;
        }

        self.extracted.extract(scene, camera);

        let shadow_lights = scene
            .lights
            .iter()
            .filter(|l| l.visible && l.kind.casts_shadows())
            .count() as u32;
        let visible_lights = scene.lights.iter().filter(|l| l.visible).count() as u32;
        let omni_lights = scene
            .lights
            .iter()
            .filter(|l| l.visible && matches!(l.kind, crate::scene::LightKind::Omni))
            .count() as u32;

        let facts = FrameFacts {
            has_shadow_lights: shadow_lights > 0,
            has_primary_directional_shadow: scene.primary_directional().is_some(),
        };
        let frame_plan = plan_frame(self.settings.mode, &self.settings.effects, &facts);

        // Exact per-frame dynamic buffer budget, so nothing grows mid-frame.
        let globals_count = 2 + shadow_lights;
        let object_count = self.extracted.items.len() as u32
            + self.extracted.shadow_casters.len() as u32 * shadow_lights
            + omni_lights
            + 1;
        self.rm
            .begin_frame(globals_count, object_count, visible_lights.max(1));

        self.target_set.ensure(&self.ctx.device, self.size);
        let generation = self.target_set.generation();
        let targets = self
            .target_set
            .current()
            .expect("targets ensured above");

        let time = self.started.elapsed().as_secs_f32();
        let view_projection = camera.view_projection();
        let main_globals = CameraUniforms {
            view_projection,
            inverse_view_projection: view_projection.inverse(),
            camera_position: Vec4::from((camera.eye, 1.0)),
            inverse_resolution: [1.0 / self.size.0 as f32, 1.0 / self.size.1 as f32],
            time,
            _pad: 0.0,
        };
        let main_offset = self.rm.globals.push(&self.ctx.queue, &main_globals);

        let quarter = targets.volumetric_size();
        let quarter_globals = CameraUniforms {
            inverse_resolution: [1.0 / quarter.0 as f32, 1.0 / quarter.1 as f32],
            ..main_globals
        };
        let quarter_offset = self.rm.globals.push(&self.ctx.queue, &quarter_globals);

        let clear_color = wgpu::Color {
            r: f64::from(scene.background.x),
            g: f64::from(scene.background.y),
            b: f64::from(scene.background.z),
            a: f64::from(scene.background.w),
        };

        let irradiance_uniforms = self.irradiance_uniforms();

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        for pass in &frame_plan {
            match pass {
                PassKind::Shadow => {
                    self.shadow_pass.run(
                        &mut self.rm,
                        &mut self.shaders,
                        &mut encoder,
                        &scene.lights,
                        &self.extracted.shadow_casters,
                    );
                }
                PassKind::Geometry => {
                    self.geometry_pass.run(
                        &mut self.rm,
                        &mut self.shaders,
                        &mut encoder,
                        targets,
                        &self.extracted.items,
                        main_offset,
                        clear_color,
                        &irradiance_uniforms,
                        self.probes_texture.as_ref().map(|t| &t.view),
                        self.probes_version,
                    );
                }
                PassKind::Ssao => {
                    self.ssao_pass.run(
                        &mut self.rm,
                        &mut self.shaders,
                        &mut encoder,
                        targets,
                        generation,
                        self.settings.effects.ssao_hemisphere,
                        main_offset,
                    );
                }
                PassKind::Decal => {
                    if let Some(decal) = &self.decal {
                        self.decal_pass.run(
                            &mut self.rm,
                            &mut self.shaders,
                            &mut encoder,
                            targets,
                            generation,
                            decal,
                            main_offset,
                        );
                    } else {
                        log::debug!("decal stage enabled but no decal configured");
                    }
                }
                PassKind::Skybox => {
                    self.skybox_pass.run(
                        &mut self.rm,
                        &mut self.shaders,
                        &mut encoder,
                        &targets.lit.view,
                        clear_color,
                        self.skybox
                            .as_ref()
                            .map(|s| (&s.view, self.skybox_version)),
                        main_offset,
                    );
                }
                PassKind::LightingResolve => {
                    self.lighting_pass.run(
                        &mut self.rm,
                        &mut self.shaders,
                        &mut encoder,
                        targets,
                        generation,
                        &self.shadow_pass,
                        &scene.lights,
                        scene.ambient_light,
                        self.settings.effects.ssao,
                        main_offset,
                    );
                }
                PassKind::Forward => {
                    let mut shadow = ShadowLookup::default();
                    for light in &scene.lights {
                        if let Some(matrix) = self.shadow_pass.matrix(light.id) {
                            shadow.matrices.insert(light.id, matrix);
                        }
                        if let Some(view) = self.shadow_pass.target_view(light.id) {
                            shadow.views.insert(light.id, view);
                        }
                    }
                    let target = ForwardTarget {
                        color: &targets.lit.view,
                        bright: &targets.bright.view,
                        depth: &targets.gbuffer.depth.view,
                        clear: None,
                    };
                    self.forward_pass.run(
                        &mut self.rm,
                        &mut self.shaders,
                        &mut encoder,
                        &target,
                        &self.extracted.items,
                        &scene.lights,
                        scene.ambient_light,
                        &shadow,
                        main_offset,
                    );
                }
                PassKind::Reflections => {
                    let captured: Vec<(usize, &ReflectionProbe)> = self
                        .reflection_probes
                        .iter()
                        .enumerate()
                        .filter(|(_, p)| p.captured)
                        .collect();
                    let positions: Vec<Vec3> =
                        captured.iter().map(|(_, p)| p.position).collect();

                    let environment = match select_probe(camera.eye, &positions) {
                        Some(i) => {
                            let (slot, probe) = captured[i];
                            Some((
                                probe.cube_view(),
                                ((slot as u64 + 1) << 32) | self.reflections_version,
                            ))
                        }
                        None => self
                            .skybox
                            .as_ref()
                            .map(|s| (&s.view, self.skybox_version)),
                    };

                    if let Some(environment) = environment {
                        self.reflections_pass.run(
                            &mut self.rm,
                            &mut self.shaders,
                            &mut encoder,
                            targets,
                            generation,
                            environment,
                            main_offset,
                        );
                    } else {
                        log::debug!("reflections stage skipped: no environment available");
                    }
                }
                PassKind::Volumetric => {
                    let Some(sun) = scene.primary_directional() else {
                        continue;
                    };
                    let (Some(matrix), Some(view)) = (
                        self.shadow_pass.matrix(sun.id),
                        self.shadow_pass.target_view(sun.id),
                    ) else {
                        log::debug!("volumetric stage skipped: sun has no shadow map");
                        continue;
                    };
                    self.volumetric_pass.run(
                        &mut self.rm,
                        &mut self.shaders,
                        &mut encoder,
                        targets,
                        sun,
                        matrix,
                        view,
                        quarter_offset,
                    );
                }
                PassKind::Bloom => {
                    self.bloom_pass
                        .run(&mut self.rm, &mut self.shaders, &mut encoder, targets);
                }
                PassKind::ToneMap => {
                    let params = self
                        .settings
                        .effects
                        .tone_mapping
                        .then_some(&self.settings.tone_mapping);
                    self.tone_map_pass.run(
                        &mut self.rm,
                        &mut self.shaders,
                        &mut encoder,
                        targets,
                        output,
                        params,
                    );
                }
            }
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    fn irradiance_uniforms(&self) -> IrradianceUniforms {
        match &self.irradiance {
            Some(volume) => {
                let grid = &volume.grid;
                IrradianceUniforms {
                    start: Vec4::from((grid.start, 0.0)),
                    end: Vec4::from((grid.end, 0.0)),
                    delta: Vec4::from((grid.delta, 0.0)),
                    dims: Vec4::new(
                        grid.dims.x as f32,
                        grid.dims.y as f32,
                        grid.dims.z as f32,
                        grid.probe_count() as f32,
                    ),
                    normal_distance: 0.0,
                    interpolate: u32::from(self.settings.effects.sh_interpolation),
                    _pad: [0; 2],
                }
            }
            None => IrradianceUniforms {
                start: Vec4::ZERO,
                end: Vec4::ZERO,
                delta: Vec4::ZERO,
                dims: Vec4::ZERO,
                normal_distance: 0.0,
                interpolate: 0,
                _pad: [0; 2],
            },
        }
    }
}
