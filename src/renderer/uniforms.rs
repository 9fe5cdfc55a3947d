//! GPU uniform blocks.
//!
//! Every struct here is the Rust half of a WGSL `struct` with identical
//! field order and std140-compatible padding. Together with the bind group
//! slots documented per pass, these are the stable wire contract between the
//! renderer and its shading stages; renaming or reordering a field breaks
//! the corresponding shader.
//!
//! Bind group convention for scene draw passes:
//!
//! | group | contents                                   |
//! |-------|--------------------------------------------|
//! | 0     | frame globals ([`CameraUniforms`], dynamic)|
//! | 1     | pass resources (lights, probes, shadows)   |
//! | 2     | material ([`MaterialUniforms`] + textures) |
//! | 3     | per-draw ([`ModelUniforms`], dynamic)      |
//!
//! Full-screen post passes use group 0 for globals and group 1 for their
//! input textures and parameters.

use glam::{Mat4, Vec4};

/// Frame globals, bound at group 0 binding 0 for every pass.
///
/// Shadow and probe-capture rendering substitute their own synthetic camera
/// by pushing another instance at a different dynamic offset.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniforms {
    pub view_projection: Mat4,
    pub inverse_view_projection: Mat4,
    /// Camera world position (xyz); w unused.
    pub camera_position: Vec4,
    /// Reciprocal render-target resolution.
    pub inverse_resolution: [f32; 2],
    pub time: f32,
    pub _pad: f32,
}

/// Per-draw transform, bound at group 3 binding 0 with a dynamic offset.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniforms {
    pub model: Mat4,
}

/// Material constants, group 2 binding 0. Texture channels occupy group 2
/// bindings 1..=5 (sampler, color, normal, metallic-roughness, emissive),
/// with white/black/flat-normal sentinels bound for absent maps.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniforms {
    pub color: Vec4,
    /// Emissive factor (xyz); w carries the UV tiling factor.
    pub emissive_tiling: Vec4,
    /// Alpha cutoff; zero unless the material's alpha mode is Mask.
    pub alpha_cutoff: f32,
    /// 1.0 when a real normal map is bound.
    pub has_normal_map: f32,
    pub _pad: [f32; 2],
}

/// Per-light constants for forward shading and the deferred resolve,
/// group 1 binding 0 (dynamic offset, one slot per processed light).
///
/// `kind`: 0 = directional, 1 = omni, 2 = spot, mirroring the WGSL switch.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniforms {
    pub shadow_view_projection: Mat4,
    /// Light color (xyz); w = intensity.
    pub color_intensity: Vec4,
    /// Light position (xyz); w = attenuation range.
    pub position_range: Vec4,
    /// Light direction (xyz); w = cosine of the spot cutoff angle.
    pub direction_cos_cutoff: Vec4,
    pub kind: u32,
    pub spot_exponent: f32,
    /// Ambient term; non-zero for exactly one light per frame.
    pub ambient: f32,
    pub shadow_bias: f32,
    /// 1 when a shadow map is bound for this light.
    pub has_shadow_map: u32,
    /// 1 for the first processed light, which also applies the ambient,
    /// emissive and baked-irradiance terms.
    pub first_light: u32,
    pub _pad: [u32; 2],
}

/// Irradiance probe-grid parameters for surface SH lookup in the geometry
/// and forward stages, group 1 binding 1.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct IrradianceUniforms {
    /// Grid start corner (xyz); w unused.
    pub start: Vec4,
    /// Grid end corner (xyz); w unused.
    pub end: Vec4,
    /// Per-axis probe spacing (xyz); w unused.
    pub delta: Vec4,
    /// Grid dimensions (xyz, stored as floats); w = total probe count.
    pub dims: Vec4,
    /// Offset along the surface normal when sampling.
    pub normal_distance: f32,
    /// 1 to interpolate between probes in the shader.
    pub interpolate: u32,
    pub _pad: [u32; 2],
}

/// Number of SSAO kernel samples; fixed, mirrored in `ssao.wgsl`.
pub const SSAO_KERNEL_SIZE: usize = 64;

/// SSAO parameters, group 1 binding of the occlusion pass.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SsaoUniforms {
    /// Randomized sphere sample offsets (xyz); w unused.
    pub kernel: [Vec4; SSAO_KERNEL_SIZE],
    pub radius: f32,
    pub _pad: [f32; 3],
}

/// Volumetric scattering parameters (primary directional light only).
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VolumetricUniforms {
    pub shadow_view_projection: Mat4,
    /// Light color (xyz); w = intensity.
    pub light_color: Vec4,
    /// Light direction (xyz); w unused.
    pub light_direction: Vec4,
    /// Per-frame jitter vector (xyz); w = shadow bias.
    pub jitter_bias: Vec4,
}

/// Separable blur direction for the bloom ping-pong, group 0 of `blur.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlurUniforms {
    /// (1, 0) for the horizontal pass, (0, 1) for the vertical pass.
    pub direction: [f32; 2],
    pub _pad: [f32; 2],
}

/// Tone mapping parameters, group 0 of `tone_mapping.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ToneMapUniforms {
    pub scale: f32,
    pub average_lum: f32,
    /// White point squared.
    pub lumwhite2: f32,
    /// Inverse display gamma.
    pub igamma: f32,
}

/// Decal projector constants.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DecalUniforms {
    pub model: Mat4,
    pub inverse_model: Mat4,
}

#[cfg(test)]
mod tests {
    use super::*;

    // std140 requires 16-byte struct alignment; a size mismatch here means a
    // shader-side struct no longer lines up.
    #[test]
    fn uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<CameraUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<MaterialUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<LightUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<IrradianceUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<SsaoUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<VolumetricUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<ToneMapUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<DecalUniforms>() % 16, 0);
    }

    #[test]
    fn ssao_kernel_is_64_samples() {
        assert_eq!(SSAO_KERNEL_SIZE, 64);
        assert_eq!(
            std::mem::size_of::<SsaoUniforms>(),
            64 * 16 + 16,
        );
    }
}
