//! Frame Target Set.
//!
//! All offscreen render targets for a frame: the G-buffer, the lit/bright
//! pair, the occlusion buffer, the quarter-resolution volumetric buffer and
//! the bloom ping-pong pair. Targets are created the first time a frame
//! needs them and recreated only when the viewport size changes.

/// HDR working format for scene color.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Depth format for the scene and shadow maps.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Single-channel occlusion buffer format.
pub const SSAO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// A texture and its default view.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    pub(crate) fn new(
        device: &wgpu::Device,
        size: (u32, u32),
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Multi-target geometry buffer.
///
/// | slot | contents                            |
/// |------|-------------------------------------|
/// | 0    | albedo.rgb + alpha                  |
/// | 1    | encoded world normal.xyz + roughness|
/// | 2    | emissive.rgb + metallic             |
/// | 3    | baked irradiance at the surface     |
pub struct GBuffer {
    pub albedo: RenderTarget,
    pub normal: RenderTarget,
    pub material: RenderTarget,
    pub irradiance: RenderTarget,
    pub depth: RenderTarget,
}

/// All viewport-sized offscreen targets for one frame.
pub struct FrameTargets {
    size: (u32, u32),
    pub gbuffer: GBuffer,
    /// Lit scene color, accumulated by the lighting resolve / forward pass.
    pub lit: RenderTarget,
    /// Thresholded bright color, the bloom source.
    pub bright: RenderTarget,
    pub ssao: RenderTarget,
    /// Quarter-resolution in-scattering accumulation buffer.
    pub volumetric: RenderTarget,
    pub bloom_ping: RenderTarget,
    pub bloom_pong: RenderTarget,
    /// Depth snapshot taken before decal projection.
    pub decal_depth: RenderTarget,
}

impl FrameTargets {
    const COLOR_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
        .union(wgpu::TextureUsages::TEXTURE_BINDING);

    pub(crate) fn new(device: &wgpu::Device, size: (u32, u32)) -> Self {
        let gbuffer = GBuffer {
            albedo: RenderTarget::new(device, size, HDR_FORMAT, Self::COLOR_USAGE, "GBuffer Albedo"),
            normal: RenderTarget::new(device, size, HDR_FORMAT, Self::COLOR_USAGE, "GBuffer Normal"),
            material: RenderTarget::new(
                device,
                size,
                HDR_FORMAT,
                Self::COLOR_USAGE,
                "GBuffer Material",
            ),
            irradiance: RenderTarget::new(
                device,
                size,
                HDR_FORMAT,
                Self::COLOR_USAGE,
                "GBuffer Irradiance",
            ),
            depth: RenderTarget::new(
                device,
                size,
                DEPTH_FORMAT,
                Self::COLOR_USAGE.union(wgpu::TextureUsages::COPY_SRC),
                "GBuffer Depth",
            ),
        };

        let quarter = (size.0.div_ceil(4).max(1), size.1.div_ceil(4).max(1));

        Self {
            size,
            gbuffer,
            lit: RenderTarget::new(device, size, HDR_FORMAT, Self::COLOR_USAGE, "Lit Buffer"),
            bright: RenderTarget::new(device, size, HDR_FORMAT, Self::COLOR_USAGE, "Bright Buffer"),
            ssao: RenderTarget::new(device, size, SSAO_FORMAT, Self::COLOR_USAGE, "SSAO Buffer"),
            volumetric: RenderTarget::new(
                device,
                quarter,
                HDR_FORMAT,
                Self::COLOR_USAGE,
                "Volumetric Buffer",
            ),
            bloom_ping: RenderTarget::new(device, size, HDR_FORMAT, Self::COLOR_USAGE, "Bloom Ping"),
            bloom_pong: RenderTarget::new(device, size, HDR_FORMAT, Self::COLOR_USAGE, "Bloom Pong"),
            decal_depth: RenderTarget::new(
                device,
                size,
                DEPTH_FORMAT,
                Self::COLOR_USAGE.union(wgpu::TextureUsages::COPY_DST),
                "Decal Depth Snapshot",
            ),
        }
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Quarter-resolution size of the volumetric buffer.
    #[must_use]
    pub fn volumetric_size(&self) -> (u32, u32) {
        (
            self.size.0.div_ceil(4).max(1),
            self.size.1.div_ceil(4).max(1),
        )
    }
}

/// Lazily created, resize-aware holder for [`FrameTargets`].
#[derive(Default)]
pub struct FrameTargetSet {
    targets: Option<FrameTargets>,
    /// Bumped every time the targets are (re)created; passes key their
    /// target-referencing bind groups on it.
    generation: u64,
}

impl FrameTargetSet {
    /// Returns the targets for `size`, creating them on first use and
    /// recreating them when the size changed.
    pub fn ensure(&mut self, device: &wgpu::Device, size: (u32, u32)) -> &FrameTargets {
        let needs_create = match &self.targets {
            Some(t) => t.size() != size,
            None => true,
        };
        if needs_create {
            log::debug!("(re)creating frame targets at {size:?}");
            self.targets = Some(FrameTargets::new(device, size));
            self.generation += 1;
        }
        self.targets.as_ref().expect("targets just ensured")
    }

    #[must_use]
    pub fn current(&self) -> Option<&FrameTargets> {
        self.targets.as_ref()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drops the targets so the next frame recreates them.
    pub fn invalidate(&mut self) {
        self.targets = None;
    }
}
