use std::sync::mpsc::{Receiver, TryRecvError};

use log::{debug, info, trace, warn};

use super::color::Rgba;
use super::command::Command;
use super::framebuffer::Framebuffer;
use super::options::{
    Position, SurfaceFlags, WindowId, WindowInfo, WindowOptions, MAX_WINDOW_DIMENSION,
};
use super::registry::{IdAllocator, LoopState, SharedRegistry, WindowRegistry};
use super::surface::{NativeSurface, SurfaceEvent, SurfaceFactory};
use crate::error::{ManagerError, Result};

/// Coordinator-owned window: buffers plus the native surface
///
/// Draw commands mutate `back` and mark the window dirty; `present` copies a
/// dirty `back` to `front`, and redraws only ever show `front`, so a
/// half-drawn frame is never on screen.
pub struct Window<S> {
    options: WindowOptions,
    title: String,
    position: Option<Position>,
    ignore_input: bool,
    back: Framebuffer,
    front: Framebuffer,
    surface: S,
    dirty: bool,
}

impl<S: NativeSurface> Window<S> {
    /// Initial back and front buffers for `options`
    fn buffers(options: &WindowOptions) -> Result<(Framebuffer, Framebuffer)> {
        let background = if options.transparent {
            Rgba::TRANSPARENT
        } else {
            Rgba::BLACK
        };
        let back = Framebuffer::try_filled(options.width, options.height, background)?;
        let front = Framebuffer::try_filled(options.width, options.height, background)?;
        Ok((back, front))
    }

    fn new(options: WindowOptions, (back, front): (Framebuffer, Framebuffer), surface: S) -> Self {
        Self {
            title: options.title.clone(),
            position: options.position,
            ignore_input: false,
            back,
            front,
            surface,
            dirty: false,
            options,
        }
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.back
    }

    pub fn presented(&self) -> &Framebuffer {
        &self.front
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    fn flags(&self) -> SurfaceFlags {
        SurfaceFlags {
            always_on_top: self.options.always_on_top,
            transparent: self.options.transparent,
            decorations: self.options.decorations,
        }
    }

    fn info(&self, id: WindowId) -> WindowInfo {
        WindowInfo {
            id,
            width: self.options.width,
            height: self.options.height,
            title: self.title.clone(),
            position: self.position,
            ignore_input: self.ignore_input,
            flags: self.flags(),
        }
    }

    fn draw(&mut self, f: impl FnOnce(&mut Framebuffer)) {
        f(&mut self.back);
        self.dirty = true;
    }

    /// Publish the back buffer; a clean window already shows it
    fn present(&mut self) {
        if self.dirty {
            self.front.clone_from(&self.back);
            self.dirty = false;
        }
        self.surface.request_redraw();
    }

    fn redraw(&mut self, id: WindowId) {
        if let Err(e) = self.surface.present(&self.front) {
            warn!("present failed for {}: {}", id, e);
        }
    }
}

/// Result of draining the command queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Queue empty, producers still connected
    Open,
    /// Stopped at the per-turn budget; more commands may be waiting
    Saturated,
    /// Every producer is gone; the loop should wind down
    Disconnected,
}

/// Sole owner of native surfaces and framebuffers
///
/// Driven by a platform loop: `drain` at the start of each turn, `handle_event`
/// for whatever the platform reports in between.
pub struct Coordinator<S: NativeSurface> {
    ids: &'static IdAllocator,
    windows: WindowRegistry<Window<S>>,
    shared: SharedRegistry,
    max_dimension: u32,
    commands_per_tick: usize,
    ever_opened: bool,
    ticks: u64,
}

impl<S: NativeSurface> Coordinator<S> {
    /// Commands applied per `drain` unless configured otherwise
    pub const DEFAULT_COMMANDS_PER_TICK: usize = 65_536;

    pub fn new(shared: SharedRegistry) -> Self {
        Self {
            ids: IdAllocator::process(),
            windows: WindowRegistry::new(),
            shared,
            max_dimension: MAX_WINDOW_DIMENSION,
            commands_per_tick: Self::DEFAULT_COMMANDS_PER_TICK,
            ever_opened: false,
            ticks: 0,
        }
    }

    /// Refuse windows wider or taller than `max`
    pub fn with_max_dimension(mut self, max: u32) -> Self {
        self.max_dimension = max;
        self
    }

    /// Cap how many commands one `drain` applies before yielding
    pub fn with_commands_per_tick(mut self, budget: usize) -> Self {
        self.commands_per_tick = budget.max(1);
        self
    }

    /// Apply queued commands in arrival order, at most one turn's budget
    pub fn drain<F>(&mut self, queue: &Receiver<Command>, factory: &mut F) -> Drain
    where
        F: SurfaceFactory<Surface = S>,
    {
        self.ticks += 1;
        let mut applied = 0;
        let outcome = loop {
            if applied == self.commands_per_tick {
                break Drain::Saturated;
            }
            match queue.try_recv() {
                Ok(command) => self.apply(command, factory),
                Err(TryRecvError::Empty) => break Drain::Open,
                Err(TryRecvError::Disconnected) => break Drain::Disconnected,
            }
            applied += 1;
        };
        if outcome == Drain::Saturated {
            trace!("drain yielded after {} commands", applied);
        }
        self.refresh_state();
        outcome
    }

    pub fn apply<F>(&mut self, command: Command, factory: &mut F)
    where
        F: SurfaceFactory<Surface = S>,
    {
        trace!("applying {:?}", command);
        match command {
            Command::CreateWindow { options, reply } => {
                let result = self.create_window(options, factory);
                // Caller may have given up waiting
                let _ = reply.send(result);
            }
            Command::SetPixel { window, x, y, r, g, b } => {
                self.with_window(window, |_, w| w.draw(|fb| fb.set_pixel(x, y, r, g, b)));
            }
            Command::SetPixelRgba { window, x, y, color } => {
                self.with_window(window, |_, w| w.draw(|fb| fb.write(x, y, color)));
            }
            Command::Clear { window, color } => {
                self.with_window(window, |_, w| w.draw(|fb| fb.clear_rgba(color)));
            }
            Command::ClearBlack { window } => {
                self.with_window(window, |_, w| w.draw(|fb| fb.clear_rgba(Rgba::BLACK)));
            }
            Command::Present { window } => {
                self.with_window(window, |_, w| w.present());
            }
            Command::SetPosition { window, position } => {
                if self.with_window(window, |_, w| {
                    w.position = Some(position);
                    w.surface.set_position(position);
                }) {
                    self.shared.update(window, |info| info.position = Some(position));
                }
            }
            Command::SetTitle { window, title } => {
                if self.with_window(window, |_, w| {
                    w.surface.set_title(&title);
                    w.title.clone_from(&title);
                }) {
                    self.shared.update(window, |info| info.title = title);
                }
            }
            Command::SetIgnoreInput { window, ignore } => {
                if self.with_window(window, |_, w| {
                    w.ignore_input = ignore;
                    w.surface.set_ignore_input(ignore);
                }) {
                    self.shared.update(window, |info| info.ignore_input = ignore);
                }
            }
            Command::Close { window } => {
                if self.remove_window(window) {
                    info!("{} closed", window);
                    self.refresh_state();
                } else {
                    debug!("close ignored: {} is not open", window);
                }
            }
            Command::Recreate { window, flags, reply } => {
                let result = self.recreate_window(window, flags, factory);
                let _ = reply.send(result);
            }
            Command::Snapshot { window, reply } => {
                let _ = reply.send(self.windows.get(window).map(|w| w.back.clone()));
            }
            Command::Sync { reply } => {
                let _ = reply.send(());
            }
        }
    }

    /// Reconcile one platform notification
    pub fn handle_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Closed(id) => {
                if self.remove_window(id) {
                    info!("{} closed by user", id);
                }
                self.refresh_state();
            }
            SurfaceEvent::RedrawRequested(id) => {
                self.with_window(id, |id, w| w.redraw(id));
            }
        }
    }

    pub fn window(&self, id: WindowId) -> Option<&Window<S>> {
        self.windows.get(id)
    }

    pub fn window_count(&self) -> usize {
        self.windows.count()
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.windows.ids().collect()
    }

    /// Number of completed drains
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn state(&self) -> LoopState {
        if !self.windows.is_empty() {
            LoopState::Running
        } else if self.ever_opened {
            LoopState::ShuttingDown
        } else {
            LoopState::Idle
        }
    }

    fn create_window<F>(&mut self, options: WindowOptions, factory: &mut F) -> Result<WindowId>
    where
        F: SurfaceFactory<Surface = S>,
    {
        if options.width > self.max_dimension || options.height > self.max_dimension {
            warn!(
                "refusing {}x{} window \"{}\": limit is {}",
                options.width, options.height, options.title, self.max_dimension
            );
            return Err(ManagerError::WindowCreation(format!(
                "{}x{} exceeds the {} pixel limit",
                options.width, options.height, self.max_dimension
            )));
        }
        let buffers = Window::<S>::buffers(&options).map_err(|e| {
            warn!("could not allocate buffers for \"{}\": {}", options.title, e);
            e
        })?;

        let id = self.ids.allocate();
        let surface = factory.create_surface(id, &options).map_err(|e| {
            warn!("could not create {} ({}x{}): {}", id, options.width, options.height, e);
            e
        })?;

        let window = Window::new(options, buffers, surface);
        window.surface.request_redraw();
        info!(
            "{} created ({}x{}, \"{}\")",
            id, window.options.width, window.options.height, window.title
        );

        self.shared.publish(window.info(id));
        self.windows.insert(id, window);
        self.ever_opened = true;
        self.refresh_state();
        Ok(id)
    }

    fn recreate_window<F>(&mut self, id: WindowId, flags: SurfaceFlags, factory: &mut F) -> Result<bool>
    where
        F: SurfaceFactory<Surface = S>,
    {
        let Some(window) = self.windows.get_mut(id) else {
            debug!("recreate ignored: {} is not open", id);
            return Ok(false);
        };

        let mut options = window.options.clone();
        options.title.clone_from(&window.title);
        options.position = window.position;
        options.always_on_top = flags.always_on_top;
        options.transparent = flags.transparent;
        options.decorations = flags.decorations;

        let surface = factory.create_surface(id, &options).map_err(|e| {
            warn!("could not recreate {}: {}", id, e);
            e
        })?;
        if window.ignore_input {
            surface.set_ignore_input(true);
        }
        surface.request_redraw();

        window.surface = surface;
        window.options = options;
        self.shared.update(id, |info| info.flags = flags);
        info!("{} recreated with {:?}", id, flags);
        Ok(true)
    }

    fn remove_window(&mut self, id: WindowId) -> bool {
        match self.windows.remove(id) {
            Some(window) => {
                self.shared.retract(id);
                drop(window);
                true
            }
            None => false,
        }
    }

    /// Run `f` against a live window; unknown ids are dropped silently
    fn with_window(&mut self, id: WindowId, f: impl FnOnce(WindowId, &mut Window<S>)) -> bool {
        match self.windows.get_mut(id) {
            Some(window) => {
                f(id, window);
                true
            }
            None => {
                trace!("ignoring command for unknown {}", id);
                false
            }
        }
    }

    fn refresh_state(&self) {
        self.shared.set_loop_state(self.state());
    }
}
