use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, OnceLock};
use std::thread;

use log::{debug, info, trace};

use crate::config::{BackendKind, ManagerConfig};
use crate::core::{
    headless, Command, Coordinator, Framebuffer, HeadlessDisplay, HeadlessFactory, LoopState,
    Position, Reply, Rgba, SharedRegistry, SurfaceFlags, WindowId, WindowInfo, WindowOptions,
};
use crate::error::{ManagerError, Result};
use crate::native::{self, ProxyWaker};

/// Set by the first manager to start a native event loop in this process
static NATIVE_LOOP_CLAIMED: AtomicBool = AtomicBool::new(false);

enum Startup {
    Pending(Receiver<Command>),
    Started,
    Failed(String),
}

/// Thread-safe handle for creating and drawing into pixel windows
///
/// Every call is forwarded as a command to a single coordinator thread that
/// owns the native windows. Drawing and configuration never block and never
/// fail: commands against a closed or unknown window are dropped. Only
/// `start`, window creation and the readback calls wait on the coordinator.
///
/// ```no_run
/// use pixel_windows::WindowManager;
///
/// let manager = WindowManager::new();
/// manager.start()?;
/// let id = manager.create_window(10, 10, "demo")?;
/// manager.clear_black(id);
/// manager.set_pixel(id, 5, 5, 255, 0, 0);
/// manager.present(id);
/// # Ok::<(), pixel_windows::ManagerError>(())
/// ```
pub struct WindowManager {
    config: ManagerConfig,
    sender: Sender<Command>,
    startup: Mutex<Startup>,
    // Set once the coordinator is running; holds the native loop's waker
    running: OnceLock<Option<ProxyWaker>>,
    shared: SharedRegistry,
    display: Option<HeadlessDisplay>,
}

impl WindowManager {
    /// Manager for native desktop windows with default settings
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Manager backed by an in-memory display; needs no desktop session
    pub fn headless() -> Self {
        Self::with_config(ManagerConfig::headless())
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        let (sender, receiver) = mpsc::channel();
        let display = match config.backend {
            BackendKind::Headless => Some(HeadlessDisplay::new()),
            BackendKind::Native => None,
        };
        Self {
            config,
            sender,
            startup: Mutex::new(Startup::Pending(receiver)),
            running: OnceLock::new(),
            shared: SharedRegistry::new(),
            display,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// In-memory display of a headless manager
    pub fn display(&self) -> Option<&HeadlessDisplay> {
        self.display.as_ref()
    }

    /// Spawn the coordinator thread; calling again is a no-op
    pub fn start(&self) -> Result<()> {
        let mut startup = self.startup.lock().unwrap_or_else(|e| e.into_inner());
        let queue = match std::mem::replace(&mut *startup, Startup::Started) {
            Startup::Pending(queue) => queue,
            Startup::Started => return Ok(()),
            Startup::Failed(reason) => {
                let error = ManagerError::EventLoop(reason.clone());
                *startup = Startup::Failed(reason);
                return Err(error);
            }
        };

        let waker = match &self.display {
            Some(display) => self.start_headless(display.clone(), queue).map(|()| None),
            None => self.start_native(queue).map(Some),
        };
        match waker {
            Ok(waker) => {
                let _ = self.running.set(waker);
                info!("window manager started ({:?} backend)", self.config.backend);
                Ok(())
            }
            Err(e) => {
                *startup = Startup::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn is_started(&self) -> bool {
        self.running.get().is_some()
    }

    fn start_native(&self, queue: Receiver<Command>) -> Result<ProxyWaker> {
        if NATIVE_LOOP_CLAIMED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ManagerError::AlreadyClaimed);
        }
        native::spawn(self.config.clone(), queue, self.shared.clone()).map_err(|e| {
            NATIVE_LOOP_CLAIMED.store(false, Ordering::Release);
            e
        })
    }

    fn start_headless(&self, display: HeadlessDisplay, queue: Receiver<Command>) -> Result<()> {
        let coordinator = Coordinator::new(self.shared.clone())
            .with_max_dimension(self.config.max_window_dimension);
        let factory = HeadlessFactory::new(display);
        let tick = self.config.tick_interval();
        thread::Builder::new()
            .name(String::from("pixel-windows-headless"))
            .spawn(move || headless::run(coordinator, queue, factory, tick))
            .map_err(|e| ManagerError::EventLoop(e.to_string()))?;
        Ok(())
    }

    /// Open a window at the platform's default position
    pub fn create_window(&self, width: u32, height: u32, title: impl Into<String>) -> Result<WindowId> {
        self.create(WindowOptions::new(width, height, title))
    }

    pub fn create_window_with_position(
        &self,
        width: u32,
        height: u32,
        title: impl Into<String>,
        x: i32,
        y: i32,
    ) -> Result<WindowId> {
        self.create(WindowOptions::new(width, height, title).with_position(x, y))
    }

    /// Open a window with every creation flag; `None` leaves placement to the platform
    #[allow(clippy::too_many_arguments)]
    pub fn create_window_with_options(
        &self,
        width: u32,
        height: u32,
        title: impl Into<String>,
        position: Option<Position>,
        always_on_top: bool,
        transparent: bool,
        decorations: bool,
    ) -> Result<WindowId> {
        let mut options = WindowOptions::new(width, height, title)
            .with_always_on_top(always_on_top)
            .with_transparent(transparent)
            .with_decorations(decorations);
        options.position = position;
        self.create(options)
    }

    /// Open a window; blocks until the coordinator has built it
    pub fn create(&self, options: WindowOptions) -> Result<WindowId> {
        if options.width == 0 || options.height == 0 {
            debug!(
                "creating degenerate {}x{} window \"{}\"",
                options.width, options.height, options.title
            );
        }
        self.request(|reply| Command::CreateWindow { options, reply })?
    }

    /// Rebuild a window's native surface with different creation flags
    ///
    /// Keeps the id, size, title, position and pixels. `Ok(false)` when the
    /// window is not open.
    pub fn recreate_window(&self, id: WindowId, flags: SurfaceFlags) -> Result<bool> {
        self.request(|reply| Command::Recreate { window: id, flags, reply })?
    }

    pub fn set_pixel(&self, id: WindowId, x: i32, y: i32, r: u8, g: u8, b: u8) {
        self.send(Command::SetPixel { window: id, x, y, r, g, b });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_pixel_rgba(&self, id: WindowId, x: i32, y: i32, r: u8, g: u8, b: u8, a: u8) {
        self.send(Command::SetPixelRgba {
            window: id,
            x,
            y,
            color: Rgba::new(r, g, b, a),
        });
    }

    pub fn clear(&self, id: WindowId, r: u8, g: u8, b: u8) {
        self.clear_rgba(id, r, g, b, 255);
    }

    pub fn clear_rgba(&self, id: WindowId, r: u8, g: u8, b: u8, a: u8) {
        self.send(Command::Clear {
            window: id,
            color: Rgba::new(r, g, b, a),
        });
    }

    pub fn clear_black(&self, id: WindowId) {
        self.send(Command::ClearBlack { window: id });
    }

    /// Show everything drawn so far on the coordinator's next redraw
    pub fn present(&self, id: WindowId) {
        self.send(Command::Present { window: id });
    }

    pub fn set_position(&self, id: WindowId, x: i32, y: i32) {
        self.send(Command::SetPosition {
            window: id,
            position: Position::new(x, y),
        });
    }

    pub fn set_title(&self, id: WindowId, title: impl Into<String>) {
        self.send(Command::SetTitle {
            window: id,
            title: title.into(),
        });
    }

    /// Toggle click-through
    pub fn set_ignore_input(&self, id: WindowId, ignore: bool) {
        self.send(Command::SetIgnoreInput { window: id, ignore });
    }

    pub fn close_window(&self, id: WindowId) {
        self.send(Command::Close { window: id });
    }

    /// Whether `id` was open as of the coordinator's last tick
    pub fn window_exists(&self, id: WindowId) -> bool {
        self.shared.exists(id)
    }

    pub fn window_count(&self) -> usize {
        self.shared.count()
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.shared.ids()
    }

    pub fn window_info(&self, id: WindowId) -> Option<WindowInfo> {
        self.shared.info(id)
    }

    pub fn loop_state(&self) -> LoopState {
        self.shared.loop_state()
    }

    /// Copy of a window's buffer reflecting every command sent before this call
    pub fn snapshot(&self, id: WindowId) -> Option<Framebuffer> {
        self.request(|reply| Command::Snapshot { window: id, reply })
            .ok()
            .flatten()
    }

    pub fn read_pixel(&self, id: WindowId, x: i32, y: i32) -> Option<Rgba> {
        self.snapshot(id)?.pixel(x, y)
    }

    /// Wait until the coordinator has applied every command sent so far
    pub fn flush(&self) -> Result<()> {
        self.request(|reply| Command::Sync { reply })
    }

    fn send(&self, command: Command) {
        if let Err(mpsc::SendError(command)) = self.sender.send(command) {
            trace!("coordinator gone; dropping {:?}", command);
            return;
        }
        self.wake();
    }

    fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        if !self.is_started() {
            return Err(ManagerError::NotStarted);
        }
        let (reply, response) = mpsc::channel();
        self.sender
            .send(command(reply))
            .map_err(|_| ManagerError::CoordinatorGone)?;
        self.wake();
        response.recv().map_err(|_| ManagerError::CoordinatorGone)
    }

    fn wake(&self) {
        if let Some(Some(waker)) = self.running.get() {
            waker.wake();
        }
    }
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new()
    }
}
