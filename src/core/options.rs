use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest width or height a window may be created with unless configured otherwise
pub const MAX_WINDOW_DIMENSION: u32 = 16_384;

/// Opaque window identifier, unique for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(u64);

impl WindowId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

impl From<WindowId> for u64 {
    fn from(id: WindowId) -> Self {
        id.0
    }
}

/// Outer window position in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Configuration fixed at window creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowOptions {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Platform default placement when absent
    pub position: Option<Position>,
    pub always_on_top: bool,
    /// Per-pixel alpha participates in desktop compositing
    pub transparent: bool,
    pub decorations: bool,
}

impl WindowOptions {
    pub fn new(width: u32, height: u32, title: impl Into<String>) -> Self {
        Self {
            width,
            height,
            title: title.into(),
            position: None,
            always_on_top: false,
            transparent: false,
            decorations: true,
        }
    }

    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }

    pub fn with_always_on_top(mut self, always_on_top: bool) -> Self {
        self.always_on_top = always_on_top;
        self
    }

    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    pub fn with_decorations(mut self, decorations: bool) -> Self {
        self.decorations = decorations;
        self
    }

    /// Surface size, never below 1x1
    pub fn surface_size(&self) -> (u32, u32) {
        (self.width.max(1), self.height.max(1))
    }
}

/// Creation flags that can only change by rebuilding the native surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceFlags {
    pub always_on_top: bool,
    pub transparent: bool,
    pub decorations: bool,
}

impl Default for SurfaceFlags {
    /// A plain decorated window
    fn default() -> Self {
        Self {
            always_on_top: false,
            transparent: false,
            decorations: true,
        }
    }
}

/// Published, read-only view of a live window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowInfo {
    pub id: WindowId,
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub position: Option<Position>,
    pub ignore_input: bool,
    pub flags: SurfaceFlags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_options_defaults() {
        let options = WindowOptions::new(640, 480, "demo");
        assert_eq!(options.title, "demo");
        assert_eq!(options.position, None);
        assert!(!options.always_on_top);
        assert!(!options.transparent);
        assert!(options.decorations);
    }

    #[test]
    fn test_window_options_builder() {
        let options = WindowOptions::new(10, 10, "")
            .with_position(-5, 20)
            .with_always_on_top(true)
            .with_transparent(true)
            .with_decorations(false);

        assert_eq!(options.position, Some(Position::new(-5, 20)));
        assert!(options.always_on_top);
        assert!(options.transparent);
        assert!(!options.decorations);
    }

    #[test]
    fn test_surface_size_clamps_degenerate() {
        assert_eq!(WindowOptions::new(0, 0, "").surface_size(), (1, 1));
        assert_eq!(WindowOptions::new(0, 7, "").surface_size(), (1, 7));
        assert_eq!(WindowOptions::new(300, 200, "").surface_size(), (300, 200));
    }

    #[test]
    fn test_window_id_keeps_large_values() {
        let id = WindowId::from_raw(u64::MAX - 1);
        assert_eq!(u64::from(id), u64::MAX - 1);
        assert_eq!(serde_json::to_string(&id).unwrap(), (u64::MAX - 1).to_string());
    }

    #[test]
    fn test_window_id_display() {
        assert_eq!(WindowId::from_raw(7).to_string(), "window#7");
    }
}
