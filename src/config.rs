//! Configuration management for crabuvc
//!
//! Which camera to open, what to apply once it is open, how far to probe when
//! the control backend cannot list devices, and the default log filter.

use crate::errors::CameraError;
use crate::types::Resolution;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CrabUvcConfig {
    pub camera: CameraConfig,
    pub discovery: DiscoveryConfig,
    pub logging: LoggingConfig,
}

/// Which camera to bind and its initial stream settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Acquisition index of the camera
    pub default_index: u32,
    /// Exact device name; empty resolves the name from the index
    pub device_name: String,
    /// Frame size applied after initialization [width, height]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_resolution: Option<[u32; 2]>,
    /// Frame rate applied after initialization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_fps: Option<f64>,
}

/// Device discovery fallbacks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Highest number of indices probed when name enumeration is unavailable
    pub probe_limit: u32,
    /// Name reported when no camera can be discovered at all
    pub placeholder_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` filter used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            default_index: 0,
            device_name: String::new(),
            initial_resolution: None,
            initial_fps: None,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            probe_limit: 10,
            placeholder_name: "Default Camera (0)".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "crabuvc=info".to_string(),
        }
    }
}

impl CameraConfig {
    pub fn initial_resolution(&self) -> Option<Resolution> {
        self.initial_resolution
            .map(|[width, height]| Resolution::new(width, height))
    }
}

impl CrabUvcConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CameraError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: CrabUvcConfig = toml::from_str(&contents)
            .map_err(|e| CameraError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CameraError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CameraError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CameraError::ConfigError(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabuvc.toml")
    }

    /// Load from default location, falling back to defaults on any error
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), CameraError> {
        if let Some([width, height]) = self.camera.initial_resolution {
            if width == 0 || height == 0 {
                return Err(CameraError::ConfigError(
                    "Initial resolution must be non-zero".to_string(),
                ));
            }
        }
        if let Some(fps) = self.camera.initial_fps {
            if !fps.is_finite() || fps <= 0.0 || fps > 240.0 {
                return Err(CameraError::ConfigError(
                    "Initial FPS must be between 0 and 240".to_string(),
                ));
            }
        }
        if self.discovery.probe_limit > 64 {
            return Err(CameraError::ConfigError(
                "Probe limit must be at most 64".to_string(),
            ));
        }
        if self.discovery.placeholder_name.trim().is_empty() {
            return Err(CameraError::ConfigError(
                "Placeholder name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
