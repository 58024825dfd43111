use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pixel_windows::cli::Cli;
use pixel_windows::{Position, WindowId, WindowManager};

// === Constants ===

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const WINDOW_SPACING: i32 = 40;
const HEADLESS_FRAMES: u32 = 60;

/// Animated gradient with a moving highlight column
fn draw_frame(manager: &WindowManager, id: WindowId, width: u32, height: u32, frame: u32, overlay: bool) {
    if overlay {
        manager.clear_rgba(id, 0, 0, 0, 0);
    }
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = (frame % 256) as u8;
            if overlay {
                manager.set_pixel_rgba(id, x as i32, y as i32, r, g, b, 128);
            } else {
                manager.set_pixel(id, x as i32, y as i32, r, g, b);
            }
        }
    }
    let column = (frame % width.max(1)) as i32;
    for y in 0..height as i32 {
        manager.set_pixel(id, column, y, 255, 255, 255);
    }
    manager.present(id);
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.manager_config().context("loading configuration")?;
    let manager = WindowManager::with_config(config);
    manager.start().context("starting window manager")?;

    let mut windows = Vec::new();
    for index in 0..cli.windows {
        let offset = index as i32 * WINDOW_SPACING;
        let title = format!("pixel-windows #{}", index + 1);
        let id = manager
            .create_window_with_options(
                cli.width,
                cli.height,
                title,
                Some(Position::new(offset, offset)),
                cli.overlay,
                cli.overlay,
                !cli.overlay,
            )
            .context("creating window")?;
        windows.push(id);
    }
    log::info!("opened {} window(s); close them all to exit", windows.len());

    let mut frame = 0u32;
    loop {
        windows.retain(|&id| manager.window_exists(id));
        if windows.is_empty() {
            break;
        }
        for &id in &windows {
            draw_frame(&manager, id, cli.width, cli.height, frame, cli.overlay);
        }
        manager.flush()?;
        frame = frame.wrapping_add(1);

        if let Some(display) = manager.display() {
            if frame >= HEADLESS_FRAMES {
                for &id in &windows {
                    log::info!("{}: {} presents", id, display.present_count(id));
                    manager.close_window(id);
                }
                manager.flush()?;
            }
        }
        thread::sleep(FRAME_INTERVAL);
    }

    Ok(())
}
