//! GPU state management
//!
//! Headless wgpu device used to compile pipelines without a window.

use std::sync::Arc;

use anyhow::{Context, Result};

/// Adapter and device with no surface attached
pub struct HeadlessGpu {
    pub adapter: wgpu::Adapter,
    pub device: Arc<wgpu::Device>,
}

impl HeadlessGpu {
    /// Initialize GPU resources
    pub fn new() -> Result<Self> {
        log::debug!("Initializing headless GPU state");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("Failed to find suitable GPU adapter")?;

        log::debug!(
            "GPU adapter: {:?} ({:?})",
            adapter.get_info().name,
            adapter.get_info().backend
        );

        let (device, _queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default()))
                .context("Failed to create device")?;

        log::debug!("GPU device created successfully");

        Ok(Self {
            adapter,
            device: Arc::new(device),
        })
    }
}
