use std::fmt;
use std::sync::mpsc::Sender;

use super::color::Rgba;
use super::framebuffer::Framebuffer;
use super::options::{Position, SurfaceFlags, WindowId, WindowOptions};
use crate::error::Result;

/// One-shot reply channel for the few commands that hand a value back
pub type Reply<T> = Sender<T>;

/// Instruction queued from any thread and applied by the coordinator
pub enum Command {
    /// Allocate an id and build the native surface; the only blocking command
    CreateWindow {
        options: WindowOptions,
        reply: Reply<Result<WindowId>>,
    },

    /// Opaque pixel write
    SetPixel { window: WindowId, x: i32, y: i32, r: u8, g: u8, b: u8 },

    /// Raw RGBA pixel write
    SetPixelRgba { window: WindowId, x: i32, y: i32, color: Rgba },

    /// Fill the whole buffer
    Clear { window: WindowId, color: Rgba },

    ClearBlack { window: WindowId },

    /// Request the buffer be shown on the next redraw
    Present { window: WindowId },

    SetPosition { window: WindowId, position: Position },

    SetTitle { window: WindowId, title: String },

    SetIgnoreInput { window: WindowId, ignore: bool },

    Close { window: WindowId },

    /// Rebuild the native surface with new creation flags
    Recreate {
        window: WindowId,
        flags: SurfaceFlags,
        reply: Reply<Result<bool>>,
    },

    /// Copy of the buffer as of every command queued before this one
    Snapshot {
        window: WindowId,
        reply: Reply<Option<Framebuffer>>,
    },

    /// Barrier; answered once everything queued before it has been applied
    Sync { reply: Reply<()> },
}

impl Command {
    /// Target window, `None` for creation
    pub fn window(&self) -> Option<WindowId> {
        match self {
            Command::CreateWindow { .. } | Command::Sync { .. } => None,
            Command::SetPixel { window, .. }
            | Command::SetPixelRgba { window, .. }
            | Command::Clear { window, .. }
            | Command::ClearBlack { window }
            | Command::Present { window }
            | Command::SetPosition { window, .. }
            | Command::SetTitle { window, .. }
            | Command::SetIgnoreInput { window, .. }
            | Command::Close { window }
            | Command::Recreate { window, .. }
            | Command::Snapshot { window, .. } => Some(*window),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateWindow { .. } => "CreateWindow",
            Command::SetPixel { .. } => "SetPixel",
            Command::SetPixelRgba { .. } => "SetPixelRgba",
            Command::Clear { .. } => "Clear",
            Command::ClearBlack { .. } => "ClearBlack",
            Command::Present { .. } => "Present",
            Command::SetPosition { .. } => "SetPosition",
            Command::SetTitle { .. } => "SetTitle",
            Command::SetIgnoreInput { .. } => "SetIgnoreInput",
            Command::Close { .. } => "Close",
            Command::Recreate { .. } => "Recreate",
            Command::Snapshot { .. } => "Snapshot",
            Command::Sync { .. } => "Sync",
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.window() {
            Some(window) => write!(f, "{}({})", self.name(), window),
            None => write!(f, "{}", self.name()),
        }
    }
}
