//! Testing utilities for crabuvc
//!
//! Synthetic cameras that exercise the full controller stack without hardware.

pub mod device;
pub mod synthetic_data;

pub use device::{
    SyntheticBackends, SyntheticControlBackend, SyntheticDevice, SyntheticState,
    SyntheticStreamBackend,
};
pub use synthetic_data::{synthetic_video_frame, DeviceProfile, SyntheticControl};
