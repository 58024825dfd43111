use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

use super::options::{WindowId, WindowInfo};

/// Monotonic window id source; ids start at 1 and are never handed out twice
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

static PROCESS_IDS: IdAllocator = IdAllocator::new();

impl IdAllocator {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocator shared by every coordinator in the process
    pub fn process() -> &'static IdAllocator {
        &PROCESS_IDS
    }

    pub fn allocate(&self) -> WindowId {
        WindowId::from_raw(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Id-keyed arena of live windows
#[derive(Debug)]
pub struct WindowRegistry<T> {
    entries: BTreeMap<WindowId, T>,
}

impl<T> WindowRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert a window; returns the previous entry if the id was already present
    pub fn insert(&mut self, id: WindowId, window: T) -> Option<T> {
        self.entries.insert(id, window)
    }

    pub fn remove(&mut self, id: WindowId) -> Option<T> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: WindowId) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    pub fn exists(&self, id: WindowId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.entries.keys().copied()
    }
}

impl<T> Default for WindowRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Coordinator lifecycle as seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
    /// No loop running yet, or running with no window ever created
    Idle = 0,
    /// Pumping events with at least one window open
    Running = 1,
    /// Every window closed; the loop keeps idling until the manager is dropped
    ShuttingDown = 2,
}

impl LoopState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => LoopState::Running,
            2 => LoopState::ShuttingDown,
            _ => LoopState::Idle,
        }
    }
}

/// Registry view shared between the coordinator (single writer) and callers
///
/// Writers hold the lock only to insert, remove or patch one entry, so readers
/// never wait behind a whole tick.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    windows: Arc<RwLock<BTreeMap<WindowId, WindowInfo>>>,
    state: Arc<AtomicU8>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, id: WindowId) -> bool {
        self.read(|windows| windows.contains_key(&id))
    }

    pub fn count(&self) -> usize {
        self.read(|windows| windows.len())
    }

    pub fn info(&self, id: WindowId) -> Option<WindowInfo> {
        self.read(|windows| windows.get(&id).cloned())
    }

    pub fn ids(&self) -> Vec<WindowId> {
        self.read(|windows| windows.keys().copied().collect())
    }

    pub fn loop_state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_loop_state(&self, state: LoopState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn publish(&self, info: WindowInfo) {
        self.write(|windows| {
            windows.insert(info.id, info);
        });
    }

    pub(crate) fn update(&self, id: WindowId, f: impl FnOnce(&mut WindowInfo)) {
        self.write(|windows| {
            if let Some(info) = windows.get_mut(&id) {
                f(info);
            }
        });
    }

    pub(crate) fn retract(&self, id: WindowId) {
        self.write(|windows| {
            windows.remove(&id);
        });
    }

    // A panic while holding the lock leaves the map consistent (every write is a
    // single map operation), so poisoning is ignored.
    fn read<R>(&self, f: impl FnOnce(&BTreeMap<WindowId, WindowInfo>) -> R) -> R {
        let guard = self.windows.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    fn write(&self, f: impl FnOnce(&mut BTreeMap<WindowId, WindowInfo>)) {
        let mut guard = self.windows.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard);
    }
}
