//! Shader registry.
//!
//! WGSL sources are embedded into the binary and resolved **by name**: each
//! pass asks for its shading stage by identifier (`"gbuffer"`,
//! `"deferred_light"`, ...) and receives a shared, cached
//! [`wgpu::ShaderModule`]. A lookup miss is not fatal: the requesting pass
//! logs it and skips its draws for the frame, so a broken shader degrades a
//! single stage instead of the whole frame.

use std::sync::Arc;

use rust_embed::RustEmbed;
use rustc_hash::FxHashMap;

#[derive(RustEmbed)]
#[folder = "src/renderer/shaders/"]
#[include = "*.wgsl"]
struct ShaderAssets;

/// By-name WGSL shader lookup with a compiled-module cache.
pub struct ShaderLibrary {
    modules: FxHashMap<String, Arc<wgpu::ShaderModule>>,
}

impl ShaderLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self {
            modules: FxHashMap::default(),
        }
    }

    /// Resolves `name` (without the `.wgsl` extension) to a compiled shader
    /// module, compiling and caching on first use.
    pub fn get(&mut self, device: &wgpu::Device, name: &str) -> Option<Arc<wgpu::ShaderModule>> {
        if let Some(module) = self.modules.get(name) {
            return Some(module.clone());
        }

        let file = format!("{name}.wgsl");
        let Some(asset) = ShaderAssets::get(&file) else {
            log::debug!("shader '{name}' not found; pass will be skipped");
            return None;
        };

        let source = String::from_utf8_lossy(asset.data.as_ref()).into_owned();
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&file),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let module = Arc::new(module);
        self.modules.insert(name.to_owned(), module.clone());
        Some(module)
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}
