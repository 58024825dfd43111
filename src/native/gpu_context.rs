use std::sync::Arc;

use wgpu::{Adapter, Device, DeviceDescriptor, Features, Instance, Limits, Queue, Surface};

use crate::error::{ManagerError, Result};

/// Shared GPU context for every managed window
///
/// One adapter/device/queue serves all surfaces; each window only owns its
/// surface, texture and pipeline. The device is requested lazily against the
/// first surface so the adapter is guaranteed to be able to present to it.
#[derive(Clone)]
pub struct GpuContext {
    adapter: Arc<Adapter>,
    device: Arc<Device>,
    queue: Arc<Queue>,
}

impl GpuContext {
    /// Instance used to create every window surface
    pub fn create_instance() -> Instance {
        Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        })
    }

    /// Create a GPU context compatible with a surface
    pub async fn new_with_surface(instance: &Instance, surface: &Surface<'_>) -> Result<Self> {
        let adapter = Self::request_adapter(instance, surface).await?;
        let (device, queue) = Self::request_device(&adapter).await?;

        Ok(Self {
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    async fn request_adapter(instance: &Instance, surface: &Surface<'_>) -> Result<Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ManagerError::Surface(format!("no compatible adapter: {:?}", e)))
    }

    async fn request_device(adapter: &Adapter) -> Result<(Device, Queue)> {
        adapter
            .request_device(&DeviceDescriptor {
                label: Some("pixel-windows device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_defaults().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| ManagerError::Surface(format!("failed to create device: {:?}", e)))
    }
}

/// Lazily initialised GPU state owned by the event loop thread
pub struct GpuSlot {
    instance: Instance,
    context: Option<GpuContext>,
}

impl GpuSlot {
    pub fn new() -> Self {
        Self {
            instance: GpuContext::create_instance(),
            context: None,
        }
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Shared context, created on first use against `surface`
    pub fn context_for(&mut self, surface: &Surface<'_>) -> Result<&GpuContext> {
        if self.context.is_none() {
            let context = pollster::block_on(GpuContext::new_with_surface(&self.instance, surface))?;
            log::info!("GPU adapter: {}", context.adapter().get_info().name);
            self.context = Some(context);
        }
        self.context
            .as_ref()
            .ok_or_else(|| ManagerError::Surface(String::from("GPU context unavailable")))
    }
}

impl Default for GpuSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_shareable_across_windows() {
        fn assert_shared<T: Clone + Send + Sync>() {}
        assert_shared::<GpuContext>();
    }

    #[test]
    fn test_slot_defers_device_creation() {
        let slot = GpuSlot::default();
        assert!(slot.context.is_none());
    }
}
