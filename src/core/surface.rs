use super::framebuffer::{AlphaHandling, Framebuffer};
use super::options::{Position, WindowId, WindowOptions};
use crate::error::Result;

/// Surface dimensions in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDimensions {
    pub width: u32,
    pub height: u32,
}

impl WindowDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Platform notifications the coordinator reconciles each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The user closed the window through native chrome
    Closed(WindowId),
    /// The platform is ready for the window to be redrawn
    RedrawRequested(WindowId),
}

/// One platform window surface
///
/// Property setters are best effort: a platform refusal is logged by the
/// implementation and otherwise ignored.
pub trait NativeSurface {
    /// Client-area size
    fn dimensions(&self) -> WindowDimensions;

    /// How this surface consumes the alpha channel
    fn alpha_handling(&self) -> AlphaHandling;

    /// Copy the whole framebuffer to the visible surface in one operation
    fn present(&mut self, framebuffer: &Framebuffer) -> Result<()>;

    /// Ask the platform for a `RedrawRequested` event
    fn request_redraw(&self);

    fn set_position(&self, position: Position);

    fn set_title(&self, title: &str);

    /// Let pointer and keyboard input fall through to windows beneath
    fn set_ignore_input(&self, ignore: bool);
}

/// Builds surfaces; only ever invoked on the coordinator thread
pub trait SurfaceFactory {
    type Surface: NativeSurface;

    fn create_surface(&mut self, id: WindowId, options: &WindowOptions) -> Result<Self::Surface>;
}
