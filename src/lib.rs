//! Multi-window pixel-buffer manager
//!
//! A [`WindowManager`] opens native windows, each backed by an RGBA
//! [`Framebuffer`], and forwards every draw or configure call to one
//! coordinator thread that owns all platform handles.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod manager;
pub mod native;

pub use config::{BackendKind, ManagerConfig};
pub use self::core::{
    Framebuffer, HeadlessDisplay, LoopState, Position, Rgba, SurfaceFlags, WindowId, WindowInfo,
};
pub use error::{ManagerError, Result};
pub use manager::WindowManager;
