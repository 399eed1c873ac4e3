//! Parameter control: device discovery, property negotiation and format commits.
//!
//! [`UvcParameterController`] holds the matching and negotiation rules. The
//! native side is split into a [`ControlBackend`] (enumerate and bind) and the
//! [`ControlBinding`] it produces (talk to one bound device). Dropping a binding
//! releases every native handle it holds.

#[cfg(not(target_os = "linux"))]
pub mod nokhwa;
#[cfg(target_os = "linux")]
pub mod v4l2;

use crate::backend::ParameterController;
use crate::errors::CameraError;
use crate::types::{
    CameraControlKey, CameraProperty, DeviceEntry, ProcAmpKey, PropertyBinding, PropertyRange,
    PropertyState, VideoFormat,
};

/// Raw reading of one control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlReading {
    pub value: i32,
    pub is_auto: bool,
}

/// Raw bounds of one control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRange {
    pub min: i32,
    pub max: i32,
    pub step: i32,
    pub default: i32,
}

/// Native enumeration and binding of controllable devices
pub trait ControlBackend {
    type Binding: ControlBinding;

    fn name(&self) -> &'static str;

    /// Devices visible to this backend, ordered by acquisition index
    fn list_devices(&self) -> Result<Vec<DeviceEntry>, CameraError>;

    fn bind(&self, device: &DeviceEntry) -> Result<Self::Binding, CameraError>;
}

/// Live binding to a single device's control surface.
///
/// Acquisition controls (camera terminal) and image-processing controls
/// (processing unit) are separate negotiation paths on every backend.
pub trait ControlBinding {
    fn camera_control(&self, key: CameraControlKey) -> Result<ControlReading, CameraError>;

    fn set_camera_control(
        &mut self,
        key: CameraControlKey,
        value: i32,
        is_auto: bool,
    ) -> Result<(), CameraError>;

    fn camera_control_range(&self, key: CameraControlKey) -> Result<ControlRange, CameraError>;

    fn proc_amp(&self, key: ProcAmpKey) -> Result<ControlReading, CameraError>;

    fn set_proc_amp(&mut self, key: ProcAmpKey, value: i32, is_auto: bool)
        -> Result<(), CameraError>;

    fn proc_amp_range(&self, key: ProcAmpKey) -> Result<ControlRange, CameraError>;

    /// Format capabilities in the order the device declares them. May contain
    /// duplicates (one per pixel encoding or frame interval).
    fn format_capabilities(&self) -> Result<Vec<VideoFormat>, CameraError>;

    /// Make the capability at `index` (into [`Self::format_capabilities`]) the
    /// active stream format.
    fn commit_format(&mut self, index: usize) -> Result<(), CameraError>;
}

/// Case-insensitive exact name match. Among equally named devices the one at
/// `preferred` index wins, otherwise the first.
pub fn find_device<'a>(
    entries: &'a [DeviceEntry],
    name: &str,
    preferred: Option<u32>,
) -> Option<&'a DeviceEntry> {
    let matches: Vec<&DeviceEntry> = entries
        .iter()
        .filter(|entry| entry.name.eq_ignore_ascii_case(name))
        .collect();
    let chosen = preferred
        .and_then(|index| matches.iter().find(|entry| entry.index == index))
        .or_else(|| matches.first())
        .copied()?;
    if matches.len() > 1 {
        log::warn!(
            "{} devices are named '{}', binding the one at index {}",
            matches.len(),
            chosen.name,
            chosen.index
        );
    }
    Some(chosen)
}

/// Position of the first capability equal to `target` in all three fields
pub fn first_exact_match(capabilities: &[VideoFormat], target: VideoFormat) -> Option<usize> {
    capabilities.iter().position(|format| *format == target)
}

/// Drop duplicate formats (keeping the first) and stable-sort by area
pub fn normalize_formats(capabilities: Vec<VideoFormat>) -> Vec<VideoFormat> {
    let mut formats: Vec<VideoFormat> = Vec::with_capacity(capabilities.len());
    for format in capabilities {
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    formats.sort_by_key(|format| format.area());
    formats
}

/// Generic parameter controller over any native control backend
pub struct UvcParameterController<B: ControlBackend> {
    backend: B,
    binding: Option<B::Binding>,
    device: Option<DeviceEntry>,
}

impl<B: ControlBackend> UvcParameterController<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            binding: None,
            device: None,
        }
    }

    /// Device the controller is bound to
    pub fn device(&self) -> Option<&DeviceEntry> {
        self.device.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn binding(&self) -> Result<&B::Binding, CameraError> {
        self.binding
            .as_ref()
            .ok_or_else(|| CameraError::NotConnected("parameter controller".to_string()))
    }

    fn binding_mut(&mut self) -> Result<&mut B::Binding, CameraError> {
        self.binding
            .as_mut()
            .ok_or_else(|| CameraError::NotConnected("parameter controller".to_string()))
    }

    fn try_initialize(&mut self, device_name: &str, preferred: Option<u32>) -> Result<(), CameraError> {
        let entries = self.backend.list_devices()?;
        for entry in &entries {
            log::debug!("{} sees device {} '{}'", self.backend.name(), entry.index, entry.name);
        }

        let device = find_device(&entries, device_name, preferred)
            .ok_or_else(|| CameraError::DeviceNotFound(device_name.to_string()))?
            .clone();
        let binding = self.backend.bind(&device)?;

        log::info!(
            "{} bound to '{}' (index {})",
            self.backend.name(),
            device.name,
            device.index
        );
        self.binding = Some(binding);
        self.device = Some(device);
        Ok(())
    }

    fn try_set_property(
        &mut self,
        property: CameraProperty,
        value: i32,
        is_auto: bool,
    ) -> Result<(), CameraError> {
        let binding = self.binding_mut()?;
        match property.binding() {
            PropertyBinding::CameraControl(key) => binding.set_camera_control(key, value, is_auto),
            PropertyBinding::ProcAmp(key) => binding.set_proc_amp(key, value, is_auto),
        }
    }

    fn try_get_property(&self, property: CameraProperty) -> Result<ControlReading, CameraError> {
        let binding = self.binding()?;
        match property.binding() {
            PropertyBinding::CameraControl(key) => binding.camera_control(key),
            PropertyBinding::ProcAmp(key) => binding.proc_amp(key),
        }
    }

    fn try_get_range(&self, property: CameraProperty) -> Result<ControlRange, CameraError> {
        let binding = self.binding()?;
        match property.binding() {
            PropertyBinding::CameraControl(key) => binding.camera_control_range(key),
            PropertyBinding::ProcAmp(key) => binding.proc_amp_range(key),
        }
    }

    fn initialize_preferring(&mut self, device_name: &str, preferred: Option<u32>) -> bool {
        // Rebinding always starts from a clean slate
        self.release();
        match self.try_initialize(device_name, preferred) {
            Ok(()) => true,
            Err(e) => {
                e.report("Parameter controller initialization failed");
                false
            }
        }
    }

    fn try_set_format(&mut self, target: VideoFormat) -> Result<(), CameraError> {
        let binding = self.binding_mut()?;
        let capabilities = binding.format_capabilities()?;
        let index = first_exact_match(&capabilities, target).ok_or_else(|| {
            CameraError::FormatError(format!("no declared format matches {}", target))
        })?;
        binding.commit_format(index)
    }
}

impl<B: ControlBackend> ParameterController for UvcParameterController<B> {
    fn controller_name(&self) -> &str {
        self.backend.name()
    }

    fn is_connected(&self) -> bool {
        self.binding.is_some()
    }

    fn initialize(&mut self, device_name: &str) -> bool {
        self.initialize_preferring(device_name, None)
    }

    fn initialize_at(&mut self, device_name: &str, index: u32) -> bool {
        self.initialize_preferring(device_name, Some(index))
    }

    fn device_index(&self) -> Option<u32> {
        self.device.as_ref().map(|device| device.index)
    }

    fn set_property(&mut self, property: CameraProperty, value: i32, is_auto: bool) -> bool {
        match self.try_set_property(property, value, is_auto) {
            Ok(()) => {
                log::debug!("Set {} to {} (auto: {})", property, value, is_auto);
                true
            }
            Err(e) => {
                e.report(&format!("Setting {} failed", property));
                false
            }
        }
    }

    fn get_property(&self, property: CameraProperty) -> PropertyState {
        match self.try_get_property(property) {
            Ok(reading) => PropertyState::new(property, reading.value, reading.is_auto),
            Err(e) => {
                e.report(&format!("Reading {} failed", property));
                PropertyState::failed(property)
            }
        }
    }

    fn get_property_range(&self, property: CameraProperty) -> PropertyRange {
        match self.try_get_range(property) {
            Ok(range) => PropertyRange::new(property, range.min, range.max, range.step, range.default),
            Err(e) => {
                e.report(&format!("Reading {} range failed", property));
                PropertyRange::failed(property)
            }
        }
    }

    fn set_format(&mut self, width: u32, height: u32, bits_per_pixel: u16) -> bool {
        let target = VideoFormat::new(width, height, bits_per_pixel);
        match self.try_set_format(target) {
            Ok(()) => {
                log::info!("Committed format {}", target);
                true
            }
            Err(e) => {
                e.report(&format!("Setting format {} failed", target));
                false
            }
        }
    }

    fn enumerate_formats(&self) -> Vec<VideoFormat> {
        match self.binding().and_then(|b| b.format_capabilities()) {
            Ok(capabilities) => normalize_formats(capabilities),
            Err(e) => {
                e.report("Format enumeration failed");
                Vec::new()
            }
        }
    }

    fn enumerate_device_entries(&self) -> Vec<DeviceEntry> {
        match self.backend.list_devices() {
            Ok(entries) => entries,
            Err(e) => {
                e.report("Device enumeration failed");
                Vec::new()
            }
        }
    }

    fn release(&mut self) {
        if let Some(device) = self.device.take() {
            log::debug!("Releasing control binding for '{}'", device.name);
        }
        self.binding = None;
    }
}
