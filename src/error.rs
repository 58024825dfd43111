use thiserror::Error;

/// Failures that cross the facade boundary
///
/// Steady-state drawing never produces one of these; only loop start-up,
/// window creation and configuration loading do.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("event loop has not been started")]
    NotStarted,

    #[error("another window manager already owns the native event loop")]
    AlreadyClaimed,

    #[error("event loop error: {0}")]
    EventLoop(String),

    #[error("failed to create window: {0}")]
    WindowCreation(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("failed to present frame: {0}")]
    Present(String),

    #[error("coordinator thread is no longer running")]
    CoordinatorGone,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<winit::error::EventLoopError> for ManagerError {
    fn from(e: winit::error::EventLoopError) -> Self {
        ManagerError::EventLoop(e.to_string())
    }
}

impl From<winit::error::OsError> for ManagerError {
    fn from(e: winit::error::OsError) -> Self {
        ManagerError::WindowCreation(e.to_string())
    }
}

impl From<wgpu::CreateSurfaceError> for ManagerError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        ManagerError::Surface(e.to_string())
    }
}

impl From<wgpu::SurfaceError> for ManagerError {
    fn from(e: wgpu::SurfaceError) -> Self {
        ManagerError::Present(e.to_string())
    }
}

impl From<std::io::Error> for ManagerError {
    fn from(e: std::io::Error) -> Self {
        ManagerError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for ManagerError {
    fn from(e: serde_json::Error) -> Self {
        ManagerError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ManagerError>;
