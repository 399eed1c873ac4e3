//! Native backend pair for the build target
//!
//! Linux pairs V4L2 controls with nokhwa's Video4Linux capture. Windows and
//! macOS use nokhwa for both, on MediaFoundation and AVFoundation.

use crate::backend::BackendSelector;
use crate::capture::nokhwa::{query_devices, NokhwaStreamBackend};
use crate::capture::StreamCaptureEngine;
use crate::config::DiscoveryConfig;
use crate::control::{ControlBackend, UvcParameterController};
use crate::types::{DeviceEntry, Platform};
use crate::unified::{self, UnifiedController};
use nokhwa::utils::ApiBackend;

#[cfg(target_os = "linux")]
pub type NativeControlBackend = crate::control::v4l2::V4l2Backend;
#[cfg(not(target_os = "linux"))]
pub type NativeControlBackend = crate::control::nokhwa::NokhwaControlBackend;

/// Selector for the real camera stack of this platform
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackends;

impl BackendSelector for NativeBackends {
    type Parameter = UvcParameterController<NativeControlBackend>;
    type Capture = StreamCaptureEngine<NokhwaStreamBackend>;

    fn platform(&self) -> Platform {
        Platform::current()
    }

    fn parameter_controller(&self) -> Self::Parameter {
        UvcParameterController::new(NativeControlBackend::new())
    }

    fn capture_engine(&self) -> Self::Capture {
        StreamCaptureEngine::new(NokhwaStreamBackend::new())
    }
}

/// Unified controller over the native backends
pub type PlatformController = UnifiedController<NativeBackends>;

impl UnifiedController<NativeBackends> {
    pub fn native() -> Self {
        UnifiedController::new(NativeBackends)
    }
}

/// Device listing sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// The platform's control backend
    Native,
    /// nokhwa with automatic API selection
    Generic,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Native => "native",
            BackendKind::Generic => "generic",
        }
    }
}

/// Devices visible to one listing source; empty on failure
pub fn list_devices(kind: BackendKind) -> Vec<DeviceEntry> {
    let result = match kind {
        BackendKind::Native => NativeControlBackend::new().list_devices(),
        BackendKind::Generic => query_devices(ApiBackend::Auto),
    };
    result.unwrap_or_else(|e| {
        e.report(&format!("Listing {} devices failed", kind.as_str()));
        Vec::new()
    })
}

/// Camera names on this machine. Never empty.
pub fn available_cameras() -> Vec<String> {
    available_cameras_with(&DiscoveryConfig::default())
}

pub fn available_cameras_with(discovery: &DiscoveryConfig) -> Vec<String> {
    unified::available_cameras(&NativeBackends, discovery)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_selector_names() {
        let controller = PlatformController::native();
        let info = controller.system_info();
        assert!(info.starts_with(&format!("Platform: {}", Platform::current().as_str())));
        assert!(info.contains("Capture: Nokhwa"));
        assert_eq!(controller.architecture_info(), "Not connected");
    }

    #[test]
    fn test_available_cameras_never_empty() {
        // Passes with or without hardware: the placeholder covers the empty case
        assert!(!available_cameras().is_empty());
    }

    #[test]
    fn test_list_devices_handles_both_kinds() {
        for kind in [BackendKind::Native, BackendKind::Generic] {
            let entries = list_devices(kind);
            for pair in entries.windows(2) {
                assert!(pair[0].index <= pair[1].index);
            }
        }
    }
}
