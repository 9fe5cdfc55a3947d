use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Vec3, Vec4};

use crate::resources::texture::Texture;

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

/// How a material's alpha channel is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
    /// Fully opaque; alpha is ignored. Only opaque geometry casts shadows.
    Opaque,
    /// Cut-out: fragments below `alpha_cutoff` are discarded.
    Mask,
    /// Alpha-blended.
    Blend,
}

/// Surface description shared by reference across prefab nodes.
///
/// Immutable once constructed (the renderer caches GPU state by `id`);
/// every texture slot is optional and defaults to the renderer's
/// white/black/flat-normal sentinels at bind time.
#[derive(Debug)]
pub struct Material {
    pub(crate) id: u64,
    pub color: Vec4,
    pub color_texture: Option<Arc<Texture>>,
    pub normal_texture: Option<Arc<Texture>>,
    /// Metallic in B, roughness in G (glTF convention).
    pub metallic_roughness_texture: Option<Arc<Texture>>,
    pub emissive_factor: Vec3,
    pub emissive_texture: Option<Arc<Texture>>,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub two_sided: bool,
    /// UV tiling factor applied to every texture channel.
    pub tiling: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            id: NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed),
            color: Vec4::ONE,
            color_texture: None,
            normal_texture: None,
            metallic_roughness_texture: None,
            emissive_factor: Vec3::ZERO,
            emissive_texture: None,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            two_sided: false,
            tiling: 1.0,
        }
    }
}

impl Material {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The alpha cutoff the shaders should apply: the configured cutoff for
    /// [`AlphaMode::Mask`], zero (disabled) otherwise.
    #[must_use]
    pub fn effective_alpha_cutoff(&self) -> f32 {
        if self.alpha_mode == AlphaMode::Mask {
            self.alpha_cutoff
        } else {
            0.0
        }
    }
}
