// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use clap::Parser;

use crate::config::{BackendKind, ManagerConfig};
use crate::error::Result;

#[derive(Parser, Debug, Clone)]
#[command(name = "pixel-windows")]
#[command(about = "Open pixel-buffer windows and draw a test pattern", long_about = None)]
pub struct Cli {
    /// Number of windows to open
    #[arg(short = 'n', long, default_value_t = 1)]
    pub windows: u32,

    /// Client width in pixels
    #[arg(long, default_value_t = 320)]
    pub width: u32,

    /// Client height in pixels
    #[arg(long, default_value_t = 240)]
    pub height: u32,

    /// Open transparent, undecorated windows
    #[arg(long, default_value = "false")]
    pub overlay: bool,

    /// Draw into in-memory surfaces instead of desktop windows
    #[arg(long, default_value = "false")]
    pub headless: bool,

    /// Present without waiting for vertical sync
    #[arg(long = "no-vsync", default_value = "false")]
    pub no_vsync: bool,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Manager configuration from the optional file plus flag overrides
    pub fn manager_config(&self) -> Result<ManagerConfig> {
        let mut config = match &self.config {
            Some(path) => ManagerConfig::from_file(path)?,
            None => ManagerConfig::default(),
        };
        if self.headless {
            config.backend = BackendKind::Headless;
        }
        if self.no_vsync {
            config.vsync = false;
        }
        Ok(config)
    }
}
