//! winit + wgpu backend: one OS window and surface per managed window,
//! all driven from a single event loop thread.

pub mod event_loop;
pub mod gpu_context;
pub mod surface_renderer;
pub mod window;

pub use event_loop::{spawn, ProxyWaker, WakeUp};
pub use gpu_context::{GpuContext, GpuSlot};
pub use surface_renderer::SurfaceRenderer;
pub use window::{NativeFactory, NativeWindow, SurfaceRoutes};
