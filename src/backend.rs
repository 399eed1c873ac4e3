//! Capability contracts for the two leaf components and the selector that pairs them.
//!
//! A [`ParameterController`] owns a device's control surface (properties and
//! declared video formats). A [`CaptureEngine`] owns its acquisition stream
//! (frames, frame size, frame rate). Neither knows about the other; the
//! [`crate::unified::UnifiedController`] composes one of each for the same
//! physical device.
//!
//! Every method here is infallible by signature: implementations catch their
//! own faults and report them through the failure shape of the operation
//! (`false`, an empty list, zero, or a `success == false` record).

use crate::types::{
    CameraFrame, CameraProperty, DeviceEntry, Platform, PropertyRange, PropertyState, Resolution,
    VideoFormat,
};

/// Largest per-dimension deviation accepted when verifying a frame size write.
/// Drivers commonly round odd requests by one pixel.
pub const FRAME_SIZE_TOLERANCE_PX: u32 = 1;

/// Largest deviation (exclusive) accepted when comparing frame rates
pub const FPS_TOLERANCE: f64 = 0.1;

/// Color depth used when the unified controller falls back to format negotiation
pub const DEFAULT_BITS_PER_PIXEL: u16 = 24;

/// True when `actual` equals `requested` or is within one pixel per dimension
pub fn frame_size_matches(actual: Resolution, requested: Resolution) -> bool {
    actual == requested
        || (actual.width.abs_diff(requested.width) <= FRAME_SIZE_TOLERANCE_PX
            && actual.height.abs_diff(requested.height) <= FRAME_SIZE_TOLERANCE_PX)
}

/// True when `actual` is within 0.1 fps of `requested`, exclusive
pub fn fps_matches(actual: f64, requested: f64) -> bool {
    (actual - requested).abs() < FPS_TOLERANCE
}

/// Stable sort by pixel area, smallest first
pub fn sort_by_area(resolutions: &mut [Resolution]) {
    resolutions.sort_by_key(|r| r.area());
}

/// Union of two resolution lists, unique by (width, height), sorted by area.
///
/// Entries keep the order they were first seen in before sorting, so equal
/// areas (e.g. 1280x720 vs 960x960) are reported deterministically.
pub fn union_resolutions(
    first: impl IntoIterator<Item = Resolution>,
    second: impl IntoIterator<Item = Resolution>,
) -> Vec<Resolution> {
    let mut merged: Vec<Resolution> = Vec::new();
    for resolution in first.into_iter().chain(second) {
        if !merged.contains(&resolution) {
            merged.push(resolution);
        }
    }
    sort_by_area(&mut merged);
    merged
}

/// Binding to a device's control surface
pub trait ParameterController {
    /// Human-readable backend name
    fn controller_name(&self) -> &str;

    fn is_connected(&self) -> bool;

    /// Bind to the device whose name matches `device_name` case-insensitively.
    /// No partial or fuzzy matching.
    fn initialize(&mut self, device_name: &str) -> bool;

    /// Like [`Self::initialize`], but among equally named devices bind the one
    /// at acquisition `index`.
    fn initialize_at(&mut self, device_name: &str, _index: u32) -> bool {
        self.initialize(device_name)
    }

    /// Acquisition index of the bound device, when the backend knows it
    fn device_index(&self) -> Option<u32> {
        None
    }

    fn set_property(&mut self, property: CameraProperty, value: i32, is_auto: bool) -> bool;

    fn get_property(&self, property: CameraProperty) -> PropertyState;

    fn get_property_range(&self, property: CameraProperty) -> PropertyRange;

    /// Commit the first declared format matching all three fields exactly.
    /// Never substitutes a closest match.
    fn set_format(&mut self, width: u32, height: u32, bits_per_pixel: u16) -> bool;

    /// Declared formats, deduplicated and sorted by area
    fn enumerate_formats(&self) -> Vec<VideoFormat>;

    /// Devices this backend can bind to, with their acquisition index
    fn enumerate_device_entries(&self) -> Vec<DeviceEntry>;

    /// Device names; empty when none are found or enumeration is unsupported
    fn enumerate_devices(&self) -> Vec<String> {
        self.enumerate_device_entries()
            .into_iter()
            .map(|entry| entry.name)
            .collect()
    }

    /// Release the binding. Safe to call repeatedly.
    fn release(&mut self);
}

/// Binding to a device's acquisition stream
pub trait CaptureEngine {
    /// Human-readable backend name
    fn engine_name(&self) -> &str;

    fn is_connected(&self) -> bool;

    /// Acquisition index of the bound device
    fn camera_index(&self) -> Option<u32>;

    /// Resolved device name; empty when unbound
    fn device_name(&self) -> &str;

    /// Open the stream with the primary acquisition API, then with the
    /// generic one if that fails.
    fn initialize(&mut self, index: u32, device_name: &str) -> bool;

    /// Blocking pull of one fresh frame. `None` when unbound, on read failure,
    /// or when the frame has zero size.
    fn capture_frame(&mut self) -> Option<CameraFrame>;

    /// Capture a frame and convert it to an `image::DynamicImage`
    fn capture_as_displayable_image(&mut self) -> Option<image::DynamicImage> {
        let frame = self.capture_frame()?;
        let image = frame.to_image();
        if image.is_none() {
            log::debug!(
                "Could not convert {}x{} frame with {} channels to an image",
                frame.width,
                frame.height,
                frame.channels
            );
        }
        image
    }

    fn set_frame_size(&mut self, width: u32, height: u32) -> bool;

    /// Current frame size, `(0, 0)` when unbound or on query failure.
    /// May be the size the stream last negotiated rather than the driver's.
    fn get_frame_size(&self) -> Resolution;

    /// Frame size queried from the driver, picking up changes made outside
    /// this engine (such as a format committed on the control path).
    /// `(0, 0)` when unbound or on query failure.
    fn refresh_frame_size(&mut self) -> Resolution;

    fn set_fps(&mut self, fps: f64) -> bool;

    /// Current frame rate, `0.0` when unbound or on query failure
    fn get_fps(&self) -> f64;

    /// Probe the fixed candidate list and report the sizes the stream accepts
    /// exactly. The frame size in effect before the call is restored on every
    /// exit path.
    fn enumerate_supported_resolutions(&mut self) -> Vec<Resolution>;

    /// Release the stream. Safe to call repeatedly.
    fn release(&mut self);
}

/// Chooses the concrete parameter/capture pair for a target
pub trait BackendSelector {
    type Parameter: ParameterController;
    type Capture: CaptureEngine;

    fn platform(&self) -> Platform;

    fn parameter_controller(&self) -> Self::Parameter;

    fn capture_engine(&self) -> Self::Capture;
}
