//! One session over one physical camera: a parameter controller for controls
//! and formats, a capture engine for frames, and the fallback between them.
//!
//! Property operations go only to the parameter controller and frame
//! operations only to the capture engine. Frame size changes try the capture
//! engine first and fall back once to a format commit on the control path.
//! Initialization is all-or-nothing, and teardown releases the parameter
//! binding first and then the capture binding.

use crate::backend::{
    frame_size_matches, union_resolutions, BackendSelector, CaptureEngine, ParameterController,
    DEFAULT_BITS_PER_PIXEL,
};
use crate::config::{CrabUvcConfig, DiscoveryConfig};
use crate::types::{
    CameraFrame, CameraProperty, CaptureStatus, PropertyRange, PropertySnapshot, PropertyState,
    Resolution, SessionState,
};

/// Session composing one parameter controller and one capture engine
pub struct UnifiedController<Sel: BackendSelector> {
    selector: Sel,
    parameter: Option<Sel::Parameter>,
    capture: Option<Sel::Capture>,
    state: SessionState,
}

impl<Sel: BackendSelector> UnifiedController<Sel> {
    pub fn new(selector: Sel) -> Self {
        Self {
            selector,
            parameter: None,
            capture: None,
            state: SessionState::Uninitialized,
        }
    }

    pub fn selector(&self) -> &Sel {
        &self.selector
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True only when both bindings report connected
    pub fn is_connected(&self) -> bool {
        match (self.parameter(), self.capture()) {
            (Some(parameter), Some(capture)) => parameter.is_connected() && capture.is_connected(),
            _ => false,
        }
    }

    /// Bind both components to the camera at `index`.
    ///
    /// An empty `device_name` is resolved from the control backend's device
    /// list by index, falling back to `"Camera {index}"`. When the control
    /// backend reports which index it bound, that index must equal `index`.
    /// On failure every partial binding is released and the session is left
    /// `Uninitialized`.
    pub fn initialize(&mut self, index: u32, device_name: &str) -> bool {
        match self.state {
            SessionState::Closed => {
                log::warn!("Cannot initialize a closed session");
                return false;
            }
            SessionState::Ready => {
                log::info!("Re-initializing session, releasing current bindings");
                self.teardown();
            }
            SessionState::Uninitialized | SessionState::Initializing => {}
        }

        self.state = SessionState::Initializing;
        log::debug!("Initializing camera index {} with device '{}'", index, device_name);

        let mut parameter = self.selector.parameter_controller();
        let target = if device_name.is_empty() {
            resolve_device_name(&parameter, index)
        } else {
            device_name.to_string()
        };
        log::debug!("Target device name: '{}'", target);

        if !parameter.initialize_at(&target, index) {
            log::warn!("Parameter controller could not bind '{}'", target);
            parameter.release();
            self.rollback();
            return false;
        }
        if let Some(bound) = parameter.device_index().filter(|&bound| bound != index) {
            log::warn!(
                "'{}' is camera {} on the control path, not camera {}",
                target,
                bound,
                index
            );
            parameter.release();
            self.rollback();
            return false;
        }
        self.parameter = Some(parameter);

        let mut capture = self.selector.capture_engine();
        if !capture.initialize(index, &target) {
            log::warn!("Capture engine could not open camera {}", index);
            capture.release();
            self.rollback();
            return false;
        }
        self.capture = Some(capture);

        self.state = SessionState::Ready;
        log::info!(
            "Session ready: '{}' (parameter: {}, capture: {})",
            target,
            self.parameter_controller_type(),
            self.capture_engine_type()
        );
        true
    }

    /// Initialize from configuration, then apply the configured frame size and
    /// rate. Failing to apply either is logged and does not fail the call.
    pub fn initialize_with_config(&mut self, config: &CrabUvcConfig) -> bool {
        if !self.initialize(config.camera.default_index, &config.camera.device_name) {
            return false;
        }
        if let Some(resolution) = config.camera.initial_resolution() {
            if !self.set_frame_size(resolution.width, resolution.height) {
                log::warn!("Could not apply configured frame size {}", resolution);
            }
        }
        if let Some(fps) = config.camera.initial_fps {
            if !self.set_fps(fps) {
                log::warn!("Could not apply configured frame rate {:.1}", fps);
            }
        }
        true
    }

    pub fn capture_frame(&mut self) -> Option<CameraFrame> {
        self.capture_mut()?.capture_frame()
    }

    pub fn capture_as_displayable_image(&mut self) -> Option<image::DynamicImage> {
        self.capture_mut()?.capture_as_displayable_image()
    }

    /// Capture engine first; if it refuses, one format commit through the
    /// parameter controller at 24 bpp, verified by re-querying the frame size
    /// from the driver.
    pub fn set_frame_size(&mut self, width: u32, height: u32) -> bool {
        if self.state != SessionState::Ready {
            return false;
        }
        let (Some(parameter), Some(capture)) = (self.parameter.as_mut(), self.capture.as_mut())
        else {
            return false;
        };
        let requested = Resolution::new(width, height);

        log::debug!("Setting frame size {} through {}", requested, capture.engine_name());
        if capture.set_frame_size(width, height) {
            return true;
        }

        log::debug!(
            "{} refused {}, falling back to {}",
            capture.engine_name(),
            requested,
            parameter.controller_name()
        );
        if !parameter.set_format(width, height, DEFAULT_BITS_PER_PIXEL) {
            log::warn!("Neither backend could set frame size {}", requested);
            return false;
        }

        let actual = capture.refresh_frame_size();
        if frame_size_matches(actual, requested) {
            log::info!("Frame size {} set through format negotiation", actual);
            true
        } else {
            log::warn!("Format {} committed but stream reports {}", requested, actual);
            false
        }
    }

    pub fn get_frame_size(&self) -> Resolution {
        self.capture()
            .map(|capture| capture.get_frame_size())
            .unwrap_or(Resolution::ZERO)
    }

    pub fn set_fps(&mut self, fps: f64) -> bool {
        self.capture_mut()
            .map(|capture| capture.set_fps(fps))
            .unwrap_or(false)
    }

    pub fn get_fps(&self) -> f64 {
        self.capture().map(|capture| capture.get_fps()).unwrap_or(0.0)
    }

    /// Union of declared formats and probed stream sizes, sorted by area
    pub fn get_supported_resolutions(&mut self) -> Vec<Resolution> {
        if self.state != SessionState::Ready {
            return Vec::new();
        }
        let declared: Vec<Resolution> = self
            .parameter
            .as_ref()
            .map(|parameter| {
                parameter
                    .enumerate_formats()
                    .iter()
                    .map(|format| format.resolution())
                    .collect()
            })
            .unwrap_or_default();
        let probed = self
            .capture
            .as_mut()
            .map(|capture| capture.enumerate_supported_resolutions())
            .unwrap_or_default();

        log::debug!(
            "{} declared and {} probed resolutions",
            declared.len(),
            probed.len()
        );
        union_resolutions(declared, probed)
    }

    pub fn set_camera_property(
        &mut self,
        property: CameraProperty,
        value: i32,
        is_auto: bool,
    ) -> bool {
        self.parameter_mut()
            .map(|parameter| parameter.set_property(property, value, is_auto))
            .unwrap_or(false)
    }

    pub fn get_camera_property(&self, property: CameraProperty) -> PropertyState {
        self.parameter()
            .map(|parameter| parameter.get_property(property))
            .unwrap_or_else(|| PropertyState::failed(property))
    }

    pub fn get_camera_property_range(&self, property: CameraProperty) -> PropertyRange {
        self.parameter()
            .map(|parameter| parameter.get_property_range(property))
            .unwrap_or_else(|| PropertyRange::failed(property))
    }

    /// Range-aware write: a manual value is clamped into the device range,
    /// auto mode is written together with the device default.
    pub fn apply_property(&mut self, property: CameraProperty, value: i32, is_auto: bool) -> bool {
        let Some(parameter) = self.parameter_mut() else {
            return false;
        };
        let range = parameter.get_property_range(property);
        if !range.success {
            log::debug!("{} has no readable range, not applying", property);
            return false;
        }
        if is_auto {
            return parameter.set_property(property, range.default, true);
        }
        let clamped = range.clamp(value);
        if clamped != value {
            log::debug!(
                "Clamped {} from {} to {} (range {}..={})",
                property,
                value,
                clamped,
                range.min,
                range.max
            );
        }
        parameter.set_property(property, clamped, false)
    }

    /// State and range of every property whose range can be read
    pub fn property_snapshot(&self) -> Vec<PropertySnapshot> {
        let Some(parameter) = self.parameter() else {
            return Vec::new();
        };
        CameraProperty::ALL
            .iter()
            .filter_map(|&property| {
                let range = parameter.get_property_range(property);
                range.success.then(|| PropertySnapshot {
                    state: parameter.get_property(property),
                    range,
                })
            })
            .collect()
    }

    /// Frame size and rate as the stream reports them right now
    pub fn current_status(&self) -> CaptureStatus {
        let size = self.get_frame_size();
        CaptureStatus {
            width: size.width,
            height: size.height,
            fps: self.get_fps(),
        }
    }

    pub fn camera_index(&self) -> Option<u32> {
        self.capture().and_then(|capture| capture.camera_index())
    }

    pub fn device_name(&self) -> &str {
        self.capture().map(|capture| capture.device_name()).unwrap_or("")
    }

    pub fn parameter_controller_type(&self) -> &str {
        self.parameter.as_ref().map(|p| p.controller_name()).unwrap_or("None")
    }

    pub fn capture_engine_type(&self) -> &str {
        self.capture.as_ref().map(|c| c.engine_name()).unwrap_or("None")
    }

    pub fn architecture_info(&self) -> String {
        if !self.is_connected() {
            return "Not connected".to_string();
        }
        format!(
            "Camera: {} | Parameter Control: {} | Image Capture: {}",
            self.device_name(),
            self.parameter_controller_type(),
            self.capture_engine_type()
        )
    }

    /// Platform and the backend pair the selector provides, bound or not
    pub fn system_info(&self) -> String {
        let parameter = match &self.parameter {
            Some(parameter) => parameter.controller_name().to_string(),
            None => self.selector.parameter_controller().controller_name().to_string(),
        };
        let capture = match &self.capture {
            Some(capture) => capture.engine_name().to_string(),
            None => self.selector.capture_engine().engine_name().to_string(),
        };
        format!(
            "Platform: {} | Parameter: {} | Capture: {}",
            self.selector.platform().as_str(),
            parameter,
            capture
        )
    }

    /// Release both bindings and close the session. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.teardown();
        self.state = SessionState::Closed;
        log::debug!("Session closed");
    }

    fn parameter(&self) -> Option<&Sel::Parameter> {
        if self.state == SessionState::Ready {
            self.parameter.as_ref()
        } else {
            None
        }
    }

    fn parameter_mut(&mut self) -> Option<&mut Sel::Parameter> {
        if self.state == SessionState::Ready {
            self.parameter.as_mut()
        } else {
            None
        }
    }

    fn capture(&self) -> Option<&Sel::Capture> {
        if self.state == SessionState::Ready {
            self.capture.as_ref()
        } else {
            None
        }
    }

    fn capture_mut(&mut self) -> Option<&mut Sel::Capture> {
        if self.state == SessionState::Ready {
            self.capture.as_mut()
        } else {
            None
        }
    }

    fn teardown(&mut self) {
        if let Some(mut parameter) = self.parameter.take() {
            parameter.release();
        }
        if let Some(mut capture) = self.capture.take() {
            capture.release();
        }
    }

    fn rollback(&mut self) {
        self.teardown();
        self.state = SessionState::Uninitialized;
    }
}

impl<Sel: BackendSelector> Drop for UnifiedController<Sel> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Name of the device at `index` in the control backend's list, or `"Camera {index}"`
fn resolve_device_name<P: ParameterController>(parameter: &P, index: u32) -> String {
    parameter
        .enumerate_device_entries()
        .into_iter()
        .find(|entry| entry.index == index)
        .map(|entry| entry.name)
        .unwrap_or_else(|| format!("Camera {}", index))
}

/// Camera names for a selector, independent of any session.
///
/// Uses the control backend's device list. If that is empty, opens capture
/// streams at increasing indices until one fails to open, naming each
/// `"Camera {index}"`. If that finds nothing either, returns the placeholder.
pub fn available_cameras<Sel: BackendSelector>(
    selector: &Sel,
    discovery: &DiscoveryConfig,
) -> Vec<String> {
    let names = selector.parameter_controller().enumerate_devices();
    if !names.is_empty() {
        return names;
    }

    log::debug!(
        "No named devices, probing up to {} capture indices",
        discovery.probe_limit
    );
    let mut names = Vec::new();
    for index in 0..discovery.probe_limit {
        let mut engine = selector.capture_engine();
        if !engine.initialize(index, "") {
            break;
        }
        names.push(format!("Camera {}", index));
        engine.release();
    }

    if names.is_empty() {
        log::debug!("No camera found, reporting '{}'", discovery.placeholder_name);
        names.push(discovery.placeholder_name.clone());
    }
    names
}
