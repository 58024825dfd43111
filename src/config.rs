use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::MAX_WINDOW_DIMENSION;
use crate::error::Result;

/// Which adapter implementation backs the windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// winit windows presented through wgpu
    #[default]
    Native,
    /// In-memory surfaces, no display required
    Headless,
}

/// Window manager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Pump cadence while windows are open
    pub tick_interval_ms: u64,
    /// Allow the native event loop to live off the main thread where supported
    pub any_thread: bool,
    /// Present with vertical sync
    pub vsync: bool,
    pub backend: BackendKind,
    /// Largest width or height accepted by `create`
    pub max_window_dimension: u32,
    /// Commands applied per tick before platform events get a turn
    pub commands_per_tick: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            any_thread: true,
            vsync: true,
            backend: BackendKind::Native,
            max_window_dimension: MAX_WINDOW_DIMENSION,
            commands_per_tick: 65_536,
        }
    }
}

impl ManagerConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn headless() -> Self {
        Self {
            backend: BackendKind::Headless,
            ..Self::default()
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ManagerError;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.tick_interval_ms, 16);
        assert!(config.any_thread);
        assert!(config.vsync);
        assert_eq!(config.backend, BackendKind::Native);
        assert_eq!(config.max_window_dimension, MAX_WINDOW_DIMENSION);
        assert_eq!(config.commands_per_tick, 65_536);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = ManagerConfig::from_json(r#"{ "backend": "headless", "vsync": false }"#).unwrap();
        assert_eq!(config.backend, BackendKind::Headless);
        assert!(!config.vsync);
        assert_eq!(config.tick_interval_ms, 16);
    }

    #[test]
    fn test_limits_from_json() {
        let config =
            ManagerConfig::from_json(r#"{ "max_window_dimension": 64, "commands_per_tick": 10 }"#).unwrap();
        assert_eq!(config.max_window_dimension, 64);
        assert_eq!(config.commands_per_tick, 10);
        assert!(config.vsync);
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let err = ManagerConfig::from_json("{ tick_interval_ms: }").unwrap_err();
        assert!(matches!(err, ManagerError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ManagerConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ManagerError::Config(_)));
    }

    #[test]
    fn test_tick_interval_never_zero() {
        let config = ManagerConfig {
            tick_interval_ms: 0,
            ..ManagerConfig::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(1));
    }
}
