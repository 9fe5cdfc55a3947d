use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// CPU-side RGBA8 image, uploaded lazily by the renderer's resource manager.
///
/// Sentinel textures (1x1 white / black) stand in for absent material maps
/// so every shading stage can bind its full texture set unconditionally.
#[derive(Debug)]
pub struct Texture {
    pub(crate) id: u64,
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 pixels, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
    /// Whether the data is sRGB-encoded color (albedo, emissive, decals) as
    /// opposed to linear data (normal maps, metallic-roughness).
    pub srgb: bool,
}

impl Texture {
    #[must_use]
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>, srgb: bool) -> Self {
        debug_assert_eq!(pixels.len(), (width * height * 4) as usize);
        Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            width,
            height,
            pixels,
            srgb,
        }
    }

    /// 1x1 opaque white, the fallback for absent color maps.
    #[must_use]
    pub fn white() -> Self {
        Self::from_rgba8(1, 1, vec![255, 255, 255, 255], true)
    }

    /// 1x1 opaque black, the fallback for absent emissive and
    /// metallic-roughness maps.
    #[must_use]
    pub fn black() -> Self {
        Self::from_rgba8(1, 1, vec![0, 0, 0, 255], true)
    }

    /// Flat normal map pixel (0.5, 0.5, 1.0).
    #[must_use]
    pub fn flat_normal() -> Self {
        Self::from_rgba8(1, 1, vec![128, 128, 255, 255], false)
    }

    /// Tiled random RGB noise, used to jitter the volumetric ray march.
    #[must_use]
    pub fn noise(size: u32) -> Self {
        use rand::RngExt;
        let mut rng = rand::rng();
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for _ in 0..size * size {
            pixels.push(rng.random::<u8>());
            pixels.push(rng.random::<u8>());
            pixels.push(rng.random::<u8>());
            pixels.push(255);
        }
        Self::from_rgba8(size, size, pixels, false)
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}
