use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window as WinitWindow, WindowAttributes, WindowLevel};

use super::gpu_context::GpuSlot;
use super::surface_renderer::SurfaceRenderer;
use crate::core::{
    AlphaHandling, Framebuffer, NativeSurface, Position, Rgba, SurfaceFactory, WindowDimensions,
    WindowId, WindowOptions,
};
use crate::error::Result;

/// A winit window presenting through its own wgpu surface
pub struct NativeWindow {
    // Declared first so the surface is released before its window
    renderer: SurfaceRenderer,
    window: Arc<WinitWindow>,
    background: Rgba,
}

impl NativeWindow {
    pub fn winit_id(&self) -> winit::window::WindowId {
        self.window.id()
    }

    /// Follow the platform if it sized the client area differently than asked
    fn sync_size(&mut self) {
        let size = self.window.inner_size();
        if size.width > 0 && size.height > 0 && (size.width, size.height) != self.renderer.dimensions() {
            log::debug!("surface resized to {}x{}", size.width, size.height);
            self.renderer.resize(size.width, size.height);
        }
    }
}

impl NativeSurface for NativeWindow {
    fn dimensions(&self) -> WindowDimensions {
        let (width, height) = self.renderer.dimensions();
        WindowDimensions::new(width, height)
    }

    fn alpha_handling(&self) -> AlphaHandling {
        self.renderer.alpha_handling()
    }

    fn present(&mut self, framebuffer: &Framebuffer) -> Result<()> {
        self.sync_size();
        let (width, height) = self.renderer.dimensions();
        let handling = self.renderer.alpha_handling();
        let bytes = if framebuffer.dimensions() == (width, height) {
            framebuffer.compose(handling)
        } else {
            framebuffer.fitted(width, height, self.background).compose(handling)
        };
        self.renderer.render_pixels(&bytes)
    }

    fn request_redraw(&self) {
        self.window.request_redraw();
    }

    fn set_position(&self, position: Position) {
        self.window
            .set_outer_position(PhysicalPosition::new(position.x, position.y));
    }

    fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }

    fn set_ignore_input(&self, ignore: bool) {
        if let Err(e) = self.window.set_cursor_hittest(!ignore) {
            log::warn!("platform refused input pass-through: {}", e);
        }
    }
}

/// Platform window ids mapped to the managed windows they belong to
#[derive(Debug)]
pub struct SurfaceRoutes<K> {
    routes: HashMap<K, WindowId>,
}

impl<K: Copy + Eq + Hash> SurfaceRoutes<K> {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: K, id: WindowId) {
        self.routes.insert(key, id);
    }

    pub fn get(&self, key: K) -> Option<WindowId> {
        self.routes.get(&key).copied()
    }

    pub fn remove(&mut self, key: K) -> Option<WindowId> {
        self.routes.remove(&key)
    }

    /// Drop every route whose key is no longer its window's current surface
    ///
    /// `current` gives the live surface key of a managed window, or `None`
    /// once the window is gone.
    pub fn prune(&mut self, current: impl Fn(WindowId) -> Option<K>) {
        self.routes.retain(|key, id| current(*id) == Some(*key));
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<K: Copy + Eq + Hash> Default for SurfaceRoutes<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Window attributes for a managed window; never resizable
pub fn window_attributes(options: &WindowOptions) -> WindowAttributes {
    let (width, height) = options.surface_size();
    let mut attributes = WinitWindow::default_attributes()
        .with_title(options.title.clone())
        .with_inner_size(PhysicalSize::new(width, height))
        .with_resizable(false)
        .with_transparent(options.transparent)
        .with_decorations(options.decorations)
        .with_window_level(if options.always_on_top {
            WindowLevel::AlwaysOnTop
        } else {
            WindowLevel::Normal
        });
    if let Some(position) = options.position {
        attributes = attributes.with_position(PhysicalPosition::new(position.x, position.y));
    }
    attributes
}

/// Creates native windows from inside an event loop callback
pub struct NativeFactory<'a> {
    event_loop: &'a ActiveEventLoop,
    gpu: &'a mut GpuSlot,
    routes: &'a mut SurfaceRoutes<winit::window::WindowId>,
    vsync: bool,
}

impl<'a> NativeFactory<'a> {
    pub fn new(
        event_loop: &'a ActiveEventLoop,
        gpu: &'a mut GpuSlot,
        routes: &'a mut SurfaceRoutes<winit::window::WindowId>,
        vsync: bool,
    ) -> Self {
        Self {
            event_loop,
            gpu,
            routes,
            vsync,
        }
    }
}

impl SurfaceFactory for NativeFactory<'_> {
    type Surface = NativeWindow;

    fn create_surface(&mut self, id: WindowId, options: &WindowOptions) -> Result<NativeWindow> {
        let window = Arc::new(self.event_loop.create_window(window_attributes(options))?);

        let size = window.inner_size();
        let (fallback_width, fallback_height) = options.surface_size();
        let width = if size.width > 0 { size.width } else { fallback_width };
        let height = if size.height > 0 { size.height } else { fallback_height };

        let surface = self.gpu.instance().create_surface(Arc::clone(&window))?;
        let gpu = self.gpu.context_for(&surface)?.clone();
        let renderer =
            SurfaceRenderer::new(gpu, surface, width, height, options.transparent, self.vsync)?;

        self.routes.insert(window.id(), id);
        Ok(NativeWindow {
            renderer,
            window,
            background: if options.transparent {
                Rgba::TRANSPARENT
            } else {
                Rgba::BLACK
            },
        })
    }
}
