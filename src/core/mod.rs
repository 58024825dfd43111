pub mod color;
pub mod command;
pub mod coordinator;
pub mod framebuffer;
pub mod headless;
pub mod options;
pub mod registry;
pub mod surface;

pub use color::Rgba;
pub use command::{Command, Reply};
pub use coordinator::{Coordinator, Drain, Window};
pub use framebuffer::{AlphaHandling, Framebuffer};
pub use headless::{HeadlessDisplay, HeadlessFactory, HeadlessSurface};
pub use options::{
    Position, SurfaceFlags, WindowId, WindowInfo, WindowOptions, MAX_WINDOW_DIMENSION,
};
pub use registry::{IdAllocator, LoopState, SharedRegistry, WindowRegistry};
pub use surface::{NativeSurface, SurfaceEvent, SurfaceFactory, WindowDimensions};
