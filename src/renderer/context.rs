//! GPU context bring-up.
//!
//! [`GpuContext`] owns the wgpu device and queue. The renderer is headless
//! by design: it draws into caller-provided texture views, so no surface is
//! created here and the context works identically for on-screen rendering,
//! offline bakes and tests.

use std::sync::Arc;

use crate::errors::{CandelaError, Result};

/// Shared device/queue pair.
#[derive(Clone)]
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

impl GpuContext {
    /// Requests an adapter and device, blocking until ready.
    ///
    /// Baking and frame submission share this single queue; ordering between
    /// passes comes from command-stream order alone.
    pub fn new(power_preference: wgpu::PowerPreference) -> Result<Self> {
        pollster::block_on(Self::new_async(power_preference))
    }

    async fn new_async(power_preference: wgpu::PowerPreference) -> Result<Self> {
        let instance =
            wgpu::Instance::new(wgpu::InstanceDescriptor::new_without_display_handle());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| CandelaError::AdapterRequestFailed(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Candela Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        log::info!("GPU adapter: {}", adapter.get_info().name);

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Wraps an externally created device/queue (shared with an application
    /// that owns the window surface).
    #[must_use]
    pub fn from_device(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }
}
