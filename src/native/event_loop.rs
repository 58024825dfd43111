use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use log::{debug, error, info, trace};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};

#[cfg(target_os = "linux")]
use winit::platform::wayland::EventLoopBuilderExtWayland;
#[cfg(target_os = "linux")]
use winit::platform::x11::EventLoopBuilderExtX11;
#[cfg(target_os = "windows")]
use winit::platform::windows::EventLoopBuilderExtWindows;

use super::gpu_context::GpuSlot;
use super::window::{NativeFactory, NativeWindow, SurfaceRoutes};
use crate::config::ManagerConfig;
use crate::core::{Command, Coordinator, Drain, SharedRegistry, SurfaceEvent};
use crate::error::{ManagerError, Result};

/// Idle cadence is this many ticks when no window is open
const IDLE_TICK_FACTOR: u32 = 10;

/// Nudges a sleeping event loop after a command was queued
#[derive(Debug, Clone, Copy)]
pub struct WakeUp;

/// Coalescing handle to the loop's proxy; one wake-up in flight at a time
pub struct ProxyWaker {
    proxy: Mutex<EventLoopProxy<WakeUp>>,
    pending: Arc<AtomicBool>,
}

impl ProxyWaker {
    fn new(proxy: EventLoopProxy<WakeUp>, pending: Arc<AtomicBool>) -> Self {
        Self {
            proxy: Mutex::new(proxy),
            pending,
        }
    }

    pub fn wake(&self) {
        if self.pending.swap(true, Ordering::AcqRel) {
            return;
        }
        let proxy = self.proxy.lock().unwrap_or_else(|e| e.into_inner());
        if proxy.send_event(WakeUp).is_err() {
            trace!("wake-up dropped: event loop closed");
        }
    }
}

/// winit application driving the coordinator
struct EventLoopApp {
    coordinator: Coordinator<NativeWindow>,
    queue: Receiver<Command>,
    gpu: GpuSlot,
    routes: SurfaceRoutes<winit::window::WindowId>,
    config: ManagerConfig,
    wake_pending: Arc<AtomicBool>,
}

impl EventLoopApp {
    fn new(
        config: ManagerConfig,
        queue: Receiver<Command>,
        shared: SharedRegistry,
        wake_pending: Arc<AtomicBool>,
    ) -> Self {
        Self {
            coordinator: Coordinator::new(shared)
                .with_max_dimension(config.max_window_dimension)
                .with_commands_per_tick(config.commands_per_tick),
            queue,
            gpu: GpuSlot::new(),
            routes: SurfaceRoutes::new(),
            config,
            wake_pending,
        }
    }

    fn tick(&mut self, event_loop: &ActiveEventLoop) {
        // Cleared before draining so a command sent mid-drain wakes us again
        self.wake_pending.store(false, Ordering::Release);

        let mut factory =
            NativeFactory::new(event_loop, &mut self.gpu, &mut self.routes, self.config.vsync);
        let outcome = self.coordinator.drain(&self.queue, &mut factory);

        // Recreated or closed windows leave routes to surfaces that no longer exist
        let coordinator = &self.coordinator;
        self.routes
            .prune(|id| coordinator.window(id).map(|window| window.surface().winit_id()));

        match outcome {
            Drain::Disconnected => {
                info!(
                    "window manager dropped; closing {} window(s)",
                    self.coordinator.window_count()
                );
                event_loop.exit();
            }
            Drain::Saturated => {
                // Let platform events through, then keep draining
                event_loop.set_control_flow(ControlFlow::Poll);
            }
            Drain::Open => {
                let mut interval = self.config.tick_interval();
                if self.coordinator.window_count() == 0 {
                    interval *= IDLE_TICK_FACTOR;
                }
                event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + interval));
            }
        }
    }
}

impl ApplicationHandler<WakeUp> for EventLoopApp {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {
        debug!("event loop resumed");
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, _event: WakeUp) {
        self.tick(event_loop);
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(id) = self.routes.get(window_id) else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                self.routes.remove(window_id);
                self.coordinator.handle_event(SurfaceEvent::Closed(id));
            }
            WindowEvent::RedrawRequested => {
                self.coordinator.handle_event(SurfaceEvent::RedrawRequested(id));
            }
            WindowEvent::Destroyed => {
                self.routes.remove(window_id);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.tick(event_loop);
    }
}

#[allow(unused_mut, unused_variables)]
fn build_event_loop(config: &ManagerConfig) -> Result<EventLoop<WakeUp>> {
    let mut builder = EventLoop::<WakeUp>::with_user_event();

    #[cfg(target_os = "linux")]
    {
        if config.any_thread && std::env::var("WAYLAND_DISPLAY").is_ok() {
            EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
        } else if config.any_thread {
            EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
        }
    }
    #[cfg(target_os = "windows")]
    {
        if config.any_thread {
            EventLoopBuilderExtWindows::with_any_thread(&mut builder, true);
        }
    }

    Ok(builder.build()?)
}

/// Start the native event loop on its own thread
///
/// Returns once the loop exists, so platform failures (no display, no
/// off-main-thread support) surface here rather than on first use. The thread
/// is detached and exits when every command sender is gone.
pub fn spawn(
    config: ManagerConfig,
    queue: Receiver<Command>,
    shared: SharedRegistry,
) -> Result<ProxyWaker> {
    let (ready_tx, ready_rx) = mpsc::channel::<Result<ProxyWaker>>();

    thread::Builder::new()
        .name(String::from("pixel-windows-loop"))
        .spawn(move || {
            let event_loop = match build_event_loop(&config) {
                Ok(event_loop) => event_loop,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            let pending = Arc::new(AtomicBool::new(false));
            let waker = ProxyWaker::new(event_loop.create_proxy(), Arc::clone(&pending));
            if ready_tx.send(Ok(waker)).is_err() {
                return;
            }

            event_loop.set_control_flow(ControlFlow::WaitUntil(
                Instant::now() + config.tick_interval(),
            ));
            let mut app = EventLoopApp::new(config, queue, shared, pending);

            info!("native event loop running");
            if let Err(e) = event_loop.run_app(&mut app) {
                error!("event loop error: {}", e);
            }
            info!("native event loop exited");
        })
        .map_err(|e| ManagerError::EventLoop(e.to_string()))?;

    ready_rx.recv().map_err(|_| ManagerError::CoordinatorGone)?
}
