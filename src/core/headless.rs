use std::collections::{BTreeMap, VecDeque};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info};

use super::color::Rgba;
use super::command::Command;
use super::coordinator::Coordinator;
use super::framebuffer::{AlphaHandling, Framebuffer};
use super::options::{Position, SurfaceFlags, WindowId, WindowOptions};
use super::surface::{NativeSurface, SurfaceEvent, SurfaceFactory, WindowDimensions};
use crate::error::{ManagerError, Result};

/// What an in-memory surface currently shows
#[derive(Debug, Clone)]
struct SurfaceRecord {
    generation: u64,
    dims: WindowDimensions,
    handling: AlphaHandling,
    flags: SurfaceFlags,
    title: String,
    position: Option<Position>,
    ignore_input: bool,
    frame: Option<Vec<u8>>,
    presents: u64,
}

#[derive(Debug, Default)]
struct DisplayState {
    surfaces: BTreeMap<WindowId, SurfaceRecord>,
    events: VecDeque<SurfaceEvent>,
    generation: u64,
    fail_creates: u32,
    fail_presents: bool,
}

/// In-memory stand-in for the desktop
///
/// Cloned handles share one state: the coordinator's surfaces write to it, and
/// tests read presented frames or inject user closes through it.
#[derive(Debug, Clone, Default)]
pub struct HeadlessDisplay {
    state: Arc<Mutex<DisplayState>>,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the user closing a window through its chrome
    pub fn request_close(&self, id: WindowId) -> bool {
        let mut state = self.lock();
        if state.surfaces.contains_key(&id) {
            state.events.push_back(SurfaceEvent::Closed(id));
            true
        } else {
            false
        }
    }

    /// Bytes most recently presented, as the compositor received them
    pub fn presented_frame(&self, id: WindowId) -> Option<Vec<u8>> {
        self.lock().surfaces.get(&id)?.frame.clone()
    }

    pub fn presented_pixel(&self, id: WindowId, x: u32, y: u32) -> Option<Rgba> {
        let state = self.lock();
        let record = state.surfaces.get(&id)?;
        if x >= record.dims.width || y >= record.dims.height {
            return None;
        }
        let idx = (y as usize * record.dims.width as usize + x as usize) * 4;
        let frame = record.frame.as_ref()?;
        let px: [u8; 4] = frame.get(idx..idx + 4)?.try_into().ok()?;
        Some(Rgba::from_array(px))
    }

    pub fn present_count(&self, id: WindowId) -> u64 {
        self.lock().surfaces.get(&id).map_or(0, |r| r.presents)
    }

    pub fn title(&self, id: WindowId) -> Option<String> {
        self.lock().surfaces.get(&id).map(|r| r.title.clone())
    }

    pub fn position(&self, id: WindowId) -> Option<Position> {
        self.lock().surfaces.get(&id)?.position
    }

    pub fn ignores_input(&self, id: WindowId) -> Option<bool> {
        self.lock().surfaces.get(&id).map(|r| r.ignore_input)
    }

    pub fn flags(&self, id: WindowId) -> Option<SurfaceFlags> {
        self.lock().surfaces.get(&id).map(|r| r.flags)
    }

    pub fn dimensions(&self, id: WindowId) -> Option<WindowDimensions> {
        self.lock().surfaces.get(&id).map(|r| r.dims)
    }

    /// Surfaces currently alive on the display
    pub fn surface_count(&self) -> usize {
        self.lock().surfaces.len()
    }

    /// Make the next `count` surface creations fail
    pub fn fail_next_creates(&self, count: u32) {
        self.lock().fail_creates = count;
    }

    pub fn set_fail_presents(&self, fail: bool) {
        self.lock().fail_presents = fail;
    }

    fn take_events(&self) -> Vec<SurfaceEvent> {
        self.lock().events.drain(..).collect()
    }

    fn lock(&self) -> MutexGuard<'_, DisplayState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Surface living in a `HeadlessDisplay`
pub struct HeadlessSurface {
    id: WindowId,
    generation: u64,
    dims: WindowDimensions,
    handling: AlphaHandling,
    display: HeadlessDisplay,
}

impl HeadlessSurface {
    fn update(&self, f: impl FnOnce(&mut SurfaceRecord)) {
        let mut state = self.display.lock();
        if let Some(record) = state.surfaces.get_mut(&self.id) {
            if record.generation == self.generation {
                f(record);
            }
        }
    }
}

impl NativeSurface for HeadlessSurface {
    fn dimensions(&self) -> WindowDimensions {
        self.dims
    }

    fn alpha_handling(&self) -> AlphaHandling {
        self.handling
    }

    fn present(&mut self, framebuffer: &Framebuffer) -> Result<()> {
        if self.display.lock().fail_presents {
            return Err(ManagerError::Present(String::from("headless present disabled")));
        }
        let bytes = framebuffer.compose(self.handling);
        self.update(|record| {
            record.frame = Some(bytes);
            record.presents += 1;
        });
        Ok(())
    }

    fn request_redraw(&self) {
        self.display
            .lock()
            .events
            .push_back(SurfaceEvent::RedrawRequested(self.id));
    }

    fn set_position(&self, position: Position) {
        self.update(|record| record.position = Some(position));
    }

    fn set_title(&self, title: &str) {
        self.update(|record| record.title = title.to_string());
    }

    fn set_ignore_input(&self, ignore: bool) {
        self.update(|record| record.ignore_input = ignore);
    }
}

impl Drop for HeadlessSurface {
    fn drop(&mut self) {
        let mut state = self.display.lock();
        let current = state.surfaces.get(&self.id).map(|r| r.generation);
        if current == Some(self.generation) {
            state.surfaces.remove(&self.id);
        }
    }
}

/// Builds `HeadlessSurface`s on a shared display
#[derive(Debug, Clone, Default)]
pub struct HeadlessFactory {
    display: HeadlessDisplay,
}

impl HeadlessFactory {
    pub fn new(display: HeadlessDisplay) -> Self {
        Self { display }
    }

    pub fn display(&self) -> &HeadlessDisplay {
        &self.display
    }
}

impl SurfaceFactory for HeadlessFactory {
    type Surface = HeadlessSurface;

    fn create_surface(&mut self, id: WindowId, options: &WindowOptions) -> Result<HeadlessSurface> {
        let mut state = self.display.lock();
        if state.fail_creates > 0 {
            state.fail_creates -= 1;
            return Err(ManagerError::WindowCreation(String::from("headless display refused surface")));
        }

        state.generation += 1;
        let generation = state.generation;
        let (width, height) = options.surface_size();
        let dims = WindowDimensions::new(width, height);
        let handling = if options.transparent {
            AlphaHandling::Straight
        } else {
            AlphaHandling::Opaque
        };

        state.surfaces.insert(
            id,
            SurfaceRecord {
                generation,
                dims,
                handling,
                flags: SurfaceFlags {
                    always_on_top: options.always_on_top,
                    transparent: options.transparent,
                    decorations: options.decorations,
                },
                title: options.title.clone(),
                position: options.position,
                ignore_input: false,
                frame: None,
                presents: 0,
            },
        );

        Ok(HeadlessSurface {
            id,
            generation,
            dims,
            handling,
            display: self.display.clone(),
        })
    }
}

/// Headless coordinator loop; returns once every command producer is gone
///
/// Display events are pumped around every command, so a simulated close is
/// reconciled before anything queued after it and a present is on the
/// display before the next command is answered.
pub fn run(
    mut coordinator: Coordinator<HeadlessSurface>,
    queue: Receiver<Command>,
    mut factory: HeadlessFactory,
    tick: Duration,
) {
    info!("headless coordinator running");
    let pump = |coordinator: &mut Coordinator<HeadlessSurface>, factory: &HeadlessFactory| {
        for event in factory.display().take_events() {
            coordinator.handle_event(event);
        }
    };

    let mut applied = 0u64;
    loop {
        let received = queue.recv_timeout(tick);
        pump(&mut coordinator, &factory);
        match received {
            Ok(command) => {
                coordinator.apply(command, &mut factory);
                applied += 1;
                pump(&mut coordinator, &factory);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("headless coordinator stopped after {} commands", applied);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(factory: &mut HeadlessFactory, id: u64, options: WindowOptions) -> HeadlessSurface {
        factory.create_surface(WindowId::from_raw(id), &options).unwrap()
    }

    #[test]
    fn test_create_registers_surface() {
        let display = HeadlessDisplay::new();
        let mut factory = HeadlessFactory::new(display.clone());
        let _s = surface(&mut factory, 1, WindowOptions::new(4, 3, "hello").with_position(10, 20));

        let id = WindowId::from_raw(1);
        assert_eq!(display.surface_count(), 1);
        assert_eq!(display.title(id), Some(String::from("hello")));
        assert_eq!(display.position(id), Some(Position::new(10, 20)));
        assert_eq!(display.dimensions(id), Some(WindowDimensions::new(4, 3)));
        assert_eq!(display.presented_frame(id), None);
    }

    #[test]
    fn test_drop_removes_surface() {
        let display = HeadlessDisplay::new();
        let mut factory = HeadlessFactory::new(display.clone());
        let s = surface(&mut factory, 1, WindowOptions::new(1, 1, ""));
        drop(s);
        assert_eq!(display.surface_count(), 0);
    }

    #[test]
    fn test_stale_surface_drop_keeps_replacement() {
        let display = HeadlessDisplay::new();
        let mut factory = HeadlessFactory::new(display.clone());
        let old = surface(&mut factory, 1, WindowOptions::new(1, 1, ""));
        let _new = surface(&mut factory, 1, WindowOptions::new(1, 1, "").with_transparent(true));
        drop(old);

        let flags = display.flags(WindowId::from_raw(1)).unwrap();
        assert!(flags.transparent);
    }

    #[test]
    fn test_present_opaque_forces_alpha() {
        let display = HeadlessDisplay::new();
        let mut factory = HeadlessFactory::new(display.clone());
        let mut s = surface(&mut factory, 1, WindowOptions::new(2, 1, ""));

        let mut fb = Framebuffer::new(2, 1);
        fb.set_pixel_rgba(0, 0, 10, 20, 30, 0);
        s.present(&fb).unwrap();

        let id = WindowId::from_raw(1);
        assert_eq!(display.presented_pixel(id, 0, 0), Some(Rgba::opaque(10, 20, 30)));
        assert_eq!(display.presented_pixel(id, 2, 0), None);
        assert_eq!(display.present_count(id), 1);
    }

    #[test]
    fn test_present_transparent_passes_alpha() {
        let display = HeadlessDisplay::new();
        let mut factory = HeadlessFactory::new(display.clone());
        let mut s = surface(&mut factory, 1, WindowOptions::new(1, 1, "").with_transparent(true));

        let mut fb = Framebuffer::transparent(1, 1);
        fb.set_pixel_rgba(0, 0, 10, 20, 30, 40);
        s.present(&fb).unwrap();

        assert_eq!(
            display.presented_pixel(WindowId::from_raw(1), 0, 0),
            Some(Rgba::new(10, 20, 30, 40))
        );
    }

    #[test]
    fn test_fail_next_creates() {
        let display = HeadlessDisplay::new();
        let mut factory = HeadlessFactory::new(display.clone());
        display.fail_next_creates(1);

        let options = WindowOptions::new(1, 1, "");
        assert!(factory.create_surface(WindowId::from_raw(1), &options).is_err());
        assert!(factory.create_surface(WindowId::from_raw(2), &options).is_ok());
    }

    #[test]
    fn test_fail_presents() {
        let display = HeadlessDisplay::new();
        let mut factory = HeadlessFactory::new(display.clone());
        let mut s = surface(&mut factory, 1, WindowOptions::new(1, 1, ""));
        display.set_fail_presents(true);

        assert!(s.present(&Framebuffer::new(1, 1)).is_err());
        assert_eq!(display.present_count(WindowId::from_raw(1)), 0);
    }

    #[test]
    fn test_request_close_only_for_live_surfaces() {
        let display = HeadlessDisplay::new();
        let mut factory = HeadlessFactory::new(display.clone());
        let _s = surface(&mut factory, 1, WindowOptions::new(1, 1, ""));

        assert!(display.request_close(WindowId::from_raw(1)));
        assert!(!display.request_close(WindowId::from_raw(2)));
        assert_eq!(display.take_events(), vec![SurfaceEvent::Closed(WindowId::from_raw(1))]);
    }

    #[test]
    fn test_setters_and_redraw_requests() {
        let display = HeadlessDisplay::new();
        let mut factory = HeadlessFactory::new(display.clone());
        let s = surface(&mut factory, 3, WindowOptions::new(1, 1, "a"));
        let id = WindowId::from_raw(3);

        s.set_title("b");
        s.set_position(Position::new(-4, 4));
        s.set_ignore_input(true);
        s.request_redraw();

        assert_eq!(display.title(id), Some(String::from("b")));
        assert_eq!(display.position(id), Some(Position::new(-4, 4)));
        assert_eq!(display.ignores_input(id), Some(true));
        assert_eq!(display.take_events(), vec![SurfaceEvent::RedrawRequested(id)]);
    }
}
