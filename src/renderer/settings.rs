//! Renderer Settings & Pipeline Configuration
//!
//! The renderer is configured once at construction through
//! [`RendererSettings`] and steered per frame through the explicit
//! [`PostEffects`] toggle struct. Toggles are plain data consumed by frame
//! planning (see [`crate::renderer::plan`]), not hidden mutable state.

/// Which shading pipeline renders scene geometry.
///
/// | Capability             | `Forward` | `Deferred` |
/// |------------------------|-----------|------------|
/// | Per-light additive loop| yes       | no         |
/// | G-buffer + resolve     | no        | yes        |
/// | SSAO / decals / reflections / volumetrics | no | yes |
/// | Bloom + tone mapping   | yes       | yes        |
///
/// The forward path is also the capture path used by the irradiance and
/// reflection bakers, independent of the mode selected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineMode {
    /// Single-pass shading with one draw per (object, light) pair.
    Forward,
    /// Geometry pass into a multi-target buffer, then per-light resolve.
    #[default]
    Deferred,
}

/// Post-process and auxiliary stage toggles.
///
/// Every field gates exactly one pipeline stage; the stages always execute
/// in the fixed order documented on [`crate::renderer::plan::plan_frame`].
#[derive(Debug, Clone, Copy)]
pub struct PostEffects {
    /// Screen-space ambient occlusion, consumed by the lighting resolve.
    pub ssao: bool,
    /// Restrict the SSAO sample kernel to the upper hemisphere.
    pub ssao_hemisphere: bool,
    /// Projected decal overlay onto the geometry buffer.
    pub decal: bool,
    /// Reflection-probe / skybox specular compositing.
    pub reflections: bool,
    /// Volumetric scattering along the primary directional light.
    pub volumetric: bool,
    /// Iterative bloom over the bright buffer.
    pub bloom: bool,
    /// Exposure/white-point/gamma mapping before presentation.
    pub tone_mapping: bool,
    /// Interpolate spherical-harmonics probes in the shader instead of
    /// nearest-probe lookup.
    pub sh_interpolation: bool,
}

impl Default for PostEffects {
    fn default() -> Self {
        Self {
            ssao: true,
            ssao_hemisphere: true,
            decal: false,
            reflections: true,
            volumetric: false,
            bloom: false,
            tone_mapping: false,
            sh_interpolation: false,
        }
    }
}

/// Tone mapping parameters (Reinhard-style with explicit white point).
#[derive(Debug, Clone, Copy)]
pub struct ToneMapping {
    /// Linear exposure scale.
    pub scale: f32,
    /// Scene average luminance the exposure is normalized against.
    pub average_lum: f32,
    /// White point; luminance above this clips to white. Stored unsquared,
    /// squared on upload.
    pub lum_white: f32,
    /// Display gamma; the shader applies `1.0 / gamma`.
    pub gamma: f32,
}

impl Default for ToneMapping {
    fn default() -> Self {
        Self {
            scale: 1.0,
            average_lum: 1.0,
            lum_white: 1.0,
            gamma: 2.2,
        }
    }
}

/// Construction-time renderer configuration.
#[derive(Debug, Clone)]
pub struct RendererSettings {
    /// Shading pipeline for scene geometry.
    pub mode: PipelineMode,
    /// Post-process toggles; mutable at runtime through
    /// [`crate::Renderer::effects_mut`].
    pub effects: PostEffects,
    /// Tone mapping parameters.
    pub tone_mapping: ToneMapping,
    /// Format of the output view passed to `render`.
    pub output_format: wgpu::TextureFormat,
    /// GPU adapter selection strategy.
    pub power_preference: wgpu::PowerPreference,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            mode: PipelineMode::Deferred,
            effects: PostEffects::default(),
            tone_mapping: ToneMapping::default(),
            output_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }
}
