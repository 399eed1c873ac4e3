//! crabuvc: UVC camera control over two cooperating backends
//!
//! One backend negotiates device parameters (exposure, focus, white balance,
//! video formats), the other pulls frames from the acquisition stream. A
//! [`UnifiedController`] binds both to the same physical camera, routes each
//! operation to the backend that owns it, and falls back from one to the other
//! when a frame size cannot be set directly.
//!
//! # Backends
//! - Linux: V4L2 controls (`v4l`) with nokhwa capture on Video4Linux
//! - Windows: nokhwa controls and capture on MediaFoundation
//! - macOS: nokhwa controls and capture on AVFoundation
//!
//! # Usage
//! ```rust,no_run
//! use crabuvc::{CameraProperty, PlatformController};
//!
//! crabuvc::init_logging();
//! let mut camera = PlatformController::native();
//! if camera.initialize(0, "") {
//!     camera.set_frame_size(1280, 720);
//!     camera.set_camera_property(CameraProperty::Brightness, 10, false);
//!     if let Some(frame) = camera.capture_frame() {
//!         println!("{}x{} frame", frame.width, frame.height);
//!     }
//! }
//! camera.dispose();
//! ```
pub mod backend;
pub mod capture;
pub mod config;
pub mod control;
pub mod errors;
pub mod platform;
pub mod types;
pub mod unified;

// Synthetic cameras for tests without hardware
pub mod testing;

pub use backend::{BackendSelector, CaptureEngine, ParameterController};
pub use config::CrabUvcConfig;
pub use errors::CameraError;
pub use platform::{available_cameras, NativeBackends, PlatformController};
pub use types::{
    CameraFrame, CameraProperty, CaptureStatus, DeviceEntry, Platform, PropertyGroup,
    PropertyRange, PropertySnapshot, PropertyState, Resolution, SessionState, VideoFormat,
};
pub use unified::UnifiedController;

/// Detect the current platform using the Platform enum
pub fn current_platform() -> Platform {
    Platform::current()
}

/// Initialize logging with the default `crabuvc=info` filter.
/// `RUST_LOG` takes precedence when set. Safe to call more than once.
pub fn init_logging() {
    init_logging_with(&config::LoggingConfig::default().filter);
}

/// Initialize logging with `filter` as the fallback for an unset `RUST_LOG`
pub fn init_logging_with(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        platform: Platform::current(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub platform: Platform,
}
