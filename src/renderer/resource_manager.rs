//! GPU resource management.
//!
//! Uploads CPU-side meshes, textures and materials on first use and caches
//! the results by resource id. Also owns the shared samplers, the sentinel
//! textures bound in place of absent material maps, and the per-frame
//! dynamic uniform buffers (frame globals, per-draw models, per-light
//! constants).

use std::sync::Arc;

use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use crate::renderer::uniforms::{CameraUniforms, LightUniforms, MaterialUniforms, ModelUniforms};
use crate::resources::{Material, Mesh, Texture};

// ─── Dynamic uniform buffer ───────────────────────────────────────────────────

/// Growable uniform buffer addressed with dynamic offsets.
///
/// Capacity must be reserved while `len == 0` (start of frame); pushes then
/// write through the queue at aligned strides. Reserving up front keeps the
/// underlying `wgpu::Buffer` stable for the whole frame, so bind groups
/// created against it never dangle.
pub struct DynamicUniformBuffer<T: bytemuck::Pod> {
    buffer: wgpu::Buffer,
    stride: u32,
    capacity: u32,
    len: u32,
    label: &'static str,
    _marker: std::marker::PhantomData<T>,
}

impl<T: bytemuck::Pod> DynamicUniformBuffer<T> {
    pub fn new(device: &wgpu::Device, capacity: u32, label: &'static str) -> Self {
        let min_alignment = device.limits().min_uniform_buffer_offset_alignment.max(1);
        let stride = align_to(std::mem::size_of::<T>() as u32, min_alignment);
        let buffer = Self::create_buffer(device, stride, capacity.max(1), label);
        Self {
            buffer,
            stride,
            capacity: capacity.max(1),
            len: 0,
            label,
            _marker: std::marker::PhantomData,
        }
    }

    fn create_buffer(
        device: &wgpu::Device,
        stride: u32,
        capacity: u32,
        label: &str,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: u64::from(stride) * u64::from(capacity),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Resets the write cursor for a new frame.
    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Grows the buffer to hold at least `count` entries. Must be called
    /// before any push of the frame; growth recreates the buffer.
    ///
    /// Returns `true` when the underlying buffer was recreated (existing
    /// bind groups against it must be rebuilt).
    pub fn reserve(&mut self, device: &wgpu::Device, count: u32) -> bool {
        debug_assert_eq!(self.len, 0, "reserve() after pushes would orphan data");
        if count <= self.capacity {
            return false;
        }
        let mut capacity = self.capacity.max(1);
        while capacity < count {
            capacity = capacity.saturating_mul(2);
        }
        self.buffer = Self::create_buffer(device, self.stride, capacity, self.label);
        self.capacity = capacity;
        true
    }

    /// Writes `value` into the next slot, returning its dynamic offset.
    pub fn push(&mut self, queue: &wgpu::Queue, value: &T) -> u32 {
        assert!(
            self.len < self.capacity,
            "{}: dynamic uniform buffer overflow (capacity {})",
            self.label,
            self.capacity
        );
        let offset = self.len * self.stride;
        queue.write_buffer(&self.buffer, u64::from(offset), bytemuck::bytes_of(value));
        self.len += 1;
        offset
    }

    #[must_use]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Binding resource covering one entry at a dynamic offset.
    #[must_use]
    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
        })
    }
}

pub(crate) fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

// ─── Uploaded resources ───────────────────────────────────────────────────────

/// GPU buffers for one mesh.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// GPU texture + default view.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// Per-material GPU state: constant buffer + the group-2 bind group.
pub struct GpuMaterial {
    pub bind_group: wgpu::BindGroup,
}

// ─── Resource manager ─────────────────────────────────────────────────────────

pub struct ResourceManager {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,

    meshes: FxHashMap<u64, GpuMesh>,
    textures: FxHashMap<u64, GpuTexture>,
    materials: FxHashMap<u64, GpuMaterial>,

    // Shared samplers
    pub linear_sampler: wgpu::Sampler,
    pub nearest_sampler: wgpu::Sampler,
    pub repeat_sampler: wgpu::Sampler,
    pub shadow_sampler: wgpu::Sampler,

    // Sentinel textures
    white: GpuTexture,
    black: GpuTexture,
    flat_normal: GpuTexture,
    /// 1x1 depth texture bound for lights without a shadow map.
    pub dummy_shadow: GpuTexture,
    /// 1x1 black placeholder for the irradiance probes texture.
    pub dummy_probes: GpuTexture,
    /// 1x1 white placeholder bound when SSAO is disabled.
    pub white_ssao: GpuTexture,

    // Shared bind group layouts + per-frame dynamic buffers
    pub globals_layout: wgpu::BindGroupLayout,
    pub globals: DynamicUniformBuffer<CameraUniforms>,
    globals_bind_group: wgpu::BindGroup,

    pub object_layout: wgpu::BindGroupLayout,
    pub objects: DynamicUniformBuffer<ModelUniforms>,
    object_bind_group: wgpu::BindGroup,

    pub material_layout: wgpu::BindGroupLayout,

    /// Layout shared by the forward pass and the deferred resolve:
    /// per-light constants (dynamic) + shadow map + comparison sampler.
    pub light_layout: wgpu::BindGroupLayout,
    pub lights: DynamicUniformBuffer<LightUniforms>,
}

impl ResourceManager {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Clamp Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });
        let nearest_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Nearest Clamp Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let repeat_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Repeat Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let white = Self::create_rgba8(&device, &queue, 1, 1, &[255, 255, 255, 255], false, "White");
        let black = Self::create_rgba8(&device, &queue, 1, 1, &[0, 0, 0, 255], false, "Black");
        let flat_normal =
            Self::create_rgba8(&device, &queue, 1, 1, &[128, 128, 255, 255], false, "Flat Normal");
        let white_ssao =
            Self::create_rgba8(&device, &queue, 1, 1, &[255, 255, 255, 255], false, "SSAO White");
        let dummy_probes = Self::create_float_placeholder(&device, "Probes Placeholder");
        let dummy_shadow = Self::create_dummy_shadow(&device);

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<CameraUniforms>() as u64
                    ),
                },
                count: None,
            }],
        });
        let globals = DynamicUniformBuffer::new(&device, 8, "Globals Buffer");
        let globals_bind_group = Self::single_buffer_bind_group(
            &device,
            &globals_layout,
            globals.binding(),
            "Globals BindGroup",
        );

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ModelUniforms>() as u64
                    ),
                },
                count: None,
            }],
        });
        let objects = DynamicUniformBuffer::new(&device, 256, "Object Buffer");
        let object_bind_group = Self::single_buffer_bind_group(
            &device,
            &object_layout,
            objects.binding(),
            "Object BindGroup",
        );

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<MaterialUniforms>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                Self::texture_entry(2),
                Self::texture_entry(3),
                Self::texture_entry(4),
                Self::texture_entry(5),
            ],
        });

        let light_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Light Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<LightUniforms>() as u64,
                        ),
                    },
                    count: None,
                },
                Self::depth_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let lights = DynamicUniformBuffer::new(&device, 16, "Light Buffer");

        Self {
            device,
            queue,
            meshes: FxHashMap::default(),
            textures: FxHashMap::default(),
            materials: FxHashMap::default(),
            linear_sampler,
            nearest_sampler,
            repeat_sampler,
            shadow_sampler,
            white,
            black,
            flat_normal,
            dummy_shadow,
            dummy_probes,
            white_ssao,
            globals_layout,
            globals,
            globals_bind_group,
            object_layout,
            objects,
            object_bind_group,
            material_layout,
            light_layout,
            lights,
        }
    }

    /// Builds the group-1 bind group for one light, with the dummy shadow
    /// map substituted when the light has none.
    pub fn light_bind_group(&self, shadow_view: Option<&wgpu::TextureView>) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Light BindGroup"),
            layout: &self.light_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.lights.binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(
                        shadow_view.unwrap_or(&self.dummy_shadow.view),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.shadow_sampler),
                },
            ],
        })
    }

    pub(crate) fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }
    }

    pub(crate) fn depth_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }
    }

    fn single_buffer_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        resource: wgpu::BindingResource,
        label: &str,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource,
            }],
        })
    }

    // ── Frame lifecycle ──────────────────────────────────────────────────

    /// Resets the dynamic buffers and reserves the exact per-frame slot
    /// counts computed from extraction, so no buffer grows mid-frame.
    pub fn begin_frame(&mut self, globals_count: u32, object_count: u32, light_count: u32) {
        self.globals.reset();
        self.objects.reset();
        self.lights.reset();

        if self.globals.reserve(&self.device, globals_count) {
            self.globals_bind_group = Self::single_buffer_bind_group(
                &self.device,
                &self.globals_layout,
                self.globals.binding(),
                "Globals BindGroup",
            );
        }
        if self.objects.reserve(&self.device, object_count) {
            self.object_bind_group = Self::single_buffer_bind_group(
                &self.device,
                &self.object_layout,
                self.objects.binding(),
                "Object BindGroup",
            );
        }
        self.lights.reserve(&self.device, light_count);
    }

    #[must_use]
    pub fn globals_bind_group(&self) -> &wgpu::BindGroup {
        &self.globals_bind_group
    }

    #[must_use]
    pub fn object_bind_group(&self) -> &wgpu::BindGroup {
        &self.object_bind_group
    }

    // ── Upload-on-first-use caches ───────────────────────────────────────

    /// Immutable cache lookup; the mesh must have been `ensure_mesh`ed.
    #[must_use]
    pub fn mesh(&self, id: u64) -> Option<&GpuMesh> {
        self.meshes.get(&id)
    }

    /// Immutable cache lookup; the material must have been
    /// `ensure_material`ed.
    #[must_use]
    pub fn material(&self, id: u64) -> Option<&GpuMaterial> {
        self.materials.get(&id)
    }

    /// Immutable cache lookup; the texture must have been
    /// `ensure_texture`d.
    #[must_use]
    pub fn texture(&self, id: u64) -> Option<&GpuTexture> {
        self.textures.get(&id)
    }

    pub fn ensure_mesh(&mut self, mesh: &Mesh) -> &GpuMesh {
        self.meshes.entry(mesh.id()).or_insert_with(|| {
            let vertex_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Mesh Vertex Buffer"),
                    contents: bytemuck::cast_slice(&mesh.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
            let index_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Mesh Index Buffer"),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
            GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: mesh.index_count(),
            }
        })
    }

    pub fn ensure_texture(&mut self, texture: &Texture) -> &GpuTexture {
        self.textures.entry(texture.id()).or_insert_with(|| {
            Self::create_rgba8(
                &self.device,
                &self.queue,
                texture.width,
                texture.height,
                &texture.pixels,
                texture.srgb,
                "Scene Texture",
            )
        })
    }

    /// Returns (building on first use) the group-2 bind group for a
    /// material, with sentinels substituted for absent texture channels.
    pub fn ensure_material(&mut self, material: &Material) -> &GpuMaterial {
        // Upload any referenced textures first so the cache borrows below
        // stay disjoint.
        for slot in [
            &material.color_texture,
            &material.normal_texture,
            &material.metallic_roughness_texture,
            &material.emissive_texture,
        ] {
            if let Some(tex) = slot {
                self.ensure_texture(tex);
            }
        }

        if !self.materials.contains_key(&material.id()) {
            let uniforms = MaterialUniforms {
                color: material.color,
                emissive_tiling: material.emissive_factor.extend(material.tiling),
                alpha_cutoff: material.effective_alpha_cutoff(),
                has_normal_map: if material.normal_texture.is_some() {
                    1.0
                } else {
                    0.0
                },
                _pad: [0.0; 2],
            };
            let buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Material Uniforms"),
                    contents: bytemuck::bytes_of(&uniforms),
                    usage: wgpu::BufferUsages::UNIFORM,
                });

            let color_view = material
                .color_texture
                .as_ref()
                .map_or(&self.white.view, |t| &self.textures[&t.id()].view);
            let normal_view = material
                .normal_texture
                .as_ref()
                .map_or(&self.flat_normal.view, |t| &self.textures[&t.id()].view);
            let mr_view = material
                .metallic_roughness_texture
                .as_ref()
                .map_or(&self.black.view, |t| &self.textures[&t.id()].view);
            let emissive_view = material
                .emissive_texture
                .as_ref()
                .map_or(&self.black.view, |t| &self.textures[&t.id()].view);

            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Material BindGroup"),
                layout: &self.material_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.repeat_sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(color_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(normal_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::TextureView(mr_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: wgpu::BindingResource::TextureView(emissive_view),
                    },
                ],
            });
            self.materials
                .insert(material.id(), GpuMaterial { bind_group });
        }
        &self.materials[&material.id()]
    }

    // ── Texture creation helpers ─────────────────────────────────────────

    fn create_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        pixels: &[u8],
        srgb: bool,
        label: &str,
    ) -> GpuTexture {
        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        GpuTexture { texture, view }
    }

    fn create_float_placeholder(device: &wgpu::Device, label: &str) -> GpuTexture {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        GpuTexture { texture, view }
    }

    fn create_dummy_shadow(device: &wgpu::Device) -> GpuTexture {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Dummy Shadow Map"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        GpuTexture { texture, view }
    }
}
