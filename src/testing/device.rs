//! In-memory camera that both a parameter controller and a capture engine can bind.
//!
//! The control binding and the acquisition stream share one [`SyntheticState`],
//! so a format committed on the control path shows up as the stream's frame
//! size, the way it does on real hardware. Every write is counted.

use super::synthetic_data::{synthetic_video_frame, DeviceProfile, SyntheticControl};
use crate::backend::BackendSelector;
use crate::capture::{ApiPreference, StreamBackend, StreamCaptureEngine, VideoStream};
use crate::control::{
    ControlBackend, ControlBinding, ControlRange, ControlReading, UvcParameterController,
};
use crate::errors::CameraError;
use crate::types::{
    CameraControlKey, CameraFrame, CameraProperty, DeviceEntry, Platform, ProcAmpKey, Resolution,
    VideoFormat,
};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Mutable state of a synthetic camera, open for inspection and fault injection
#[derive(Debug, Clone)]
pub struct SyntheticState {
    pub index: u32,
    pub name: String,
    pub resolution: Resolution,
    pub fps: f64,
    pub stream_modes: Vec<Resolution>,
    pub rounding: Vec<(Resolution, Resolution)>,
    pub frame_rates: Vec<f64>,
    pub formats: Vec<VideoFormat>,
    pub controls: HashMap<CameraProperty, SyntheticControl>,

    pub primary_api_available: bool,
    pub generic_api_available: bool,
    pub control_bind_fails: bool,
    pub format_commit_fails: bool,
    pub resolution_read_fails: bool,
    pub empty_frames: bool,
    /// Writing this frame size panics, after the write has been counted
    pub panic_on_resolution: Option<Resolution>,
    /// Streams keep the size they last negotiated until refreshed
    pub stream_caches_format: bool,
    /// Frames already queued before the next read; each carries an old timestamp
    pub queued_stale_frames: usize,

    pub resolution_writes: usize,
    pub format_commits: usize,
    pub fps_writes: usize,
    pub format_refreshes: usize,
    pub frames_read: u64,
    pub open_streams: usize,
    pub open_bindings: usize,
    pub last_api: Option<ApiPreference>,
}

impl SyntheticState {
    fn from_profile(index: u32, profile: DeviceProfile) -> Self {
        Self {
            index,
            name: profile.name,
            resolution: profile.initial_resolution,
            fps: profile.initial_fps,
            stream_modes: profile.stream_modes,
            rounding: profile.rounding,
            frame_rates: profile.frame_rates,
            formats: profile.formats,
            controls: profile.controls.into_iter().collect(),
            primary_api_available: true,
            generic_api_available: true,
            control_bind_fails: false,
            format_commit_fails: false,
            resolution_read_fails: false,
            empty_frames: false,
            panic_on_resolution: None,
            stream_caches_format: false,
            queued_stale_frames: 0,
            resolution_writes: 0,
            format_commits: 0,
            fps_writes: 0,
            format_refreshes: 0,
            frames_read: 0,
            open_streams: 0,
            open_bindings: 0,
            last_api: None,
        }
    }

    fn control(&self, property: CameraProperty) -> Result<&SyntheticControl, CameraError> {
        self.controls
            .get(&property)
            .ok_or_else(|| CameraError::UnsupportedProperty(property.to_string()))
    }
}

/// Shared handle to a synthetic camera
#[derive(Debug, Clone)]
pub struct SyntheticDevice {
    state: Arc<Mutex<SyntheticState>>,
}

impl SyntheticDevice {
    /// A 720p webcam at `index`
    pub fn new(index: u32, name: &str) -> Self {
        Self::from_profile(index, DeviceProfile::hd_webcam(name))
    }

    pub fn from_profile(index: u32, profile: DeviceProfile) -> Self {
        Self {
            state: Arc::new(Mutex::new(SyntheticState::from_profile(index, profile))),
        }
    }

    /// Adjust the state before handing the device out
    pub fn configure(self, adjust: impl FnOnce(&mut SyntheticState)) -> Self {
        self.with(adjust);
        self
    }

    pub fn with<T>(&self, access: impl FnOnce(&mut SyntheticState) -> T) -> T {
        access(&mut self.lock())
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SyntheticState {
        self.lock().clone()
    }

    pub fn index(&self) -> u32 {
        self.lock().index
    }

    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    pub fn resolution(&self) -> Resolution {
        self.lock().resolution
    }

    pub fn resolution_writes(&self) -> usize {
        self.lock().resolution_writes
    }

    pub fn format_commits(&self) -> usize {
        self.lock().format_commits
    }

    pub fn fps_writes(&self) -> usize {
        self.lock().fps_writes
    }

    pub fn format_refreshes(&self) -> usize {
        self.lock().format_refreshes
    }

    pub fn frames_read(&self) -> u64 {
        self.lock().frames_read
    }

    pub fn open_streams(&self) -> usize {
        self.lock().open_streams
    }

    pub fn open_bindings(&self) -> usize {
        self.lock().open_bindings
    }

    fn lock(&self) -> MutexGuard<'_, SyntheticState> {
        // A panic injected by a test must not poison later inspection
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn entry(&self) -> DeviceEntry {
        let state = self.lock();
        DeviceEntry::new(state.index, state.name.clone())
    }
}

fn find_by_index(devices: &[SyntheticDevice], index: u32) -> Result<SyntheticDevice, CameraError> {
    devices
        .iter()
        .find(|device| device.index() == index)
        .cloned()
        .ok_or_else(|| CameraError::DeviceNotFound(format!("no synthetic camera at index {}", index)))
}

/// Control backend over a fixed set of synthetic devices
#[derive(Debug, Clone, Default)]
pub struct SyntheticControlBackend {
    devices: Vec<SyntheticDevice>,
    listing_fails: bool,
}

impl SyntheticControlBackend {
    pub fn new(devices: Vec<SyntheticDevice>) -> Self {
        Self {
            devices,
            listing_fails: false,
        }
    }

    /// Backend whose device enumeration always errors
    pub fn failing() -> Self {
        Self {
            devices: Vec::new(),
            listing_fails: true,
        }
    }
}

impl ControlBackend for SyntheticControlBackend {
    type Binding = SyntheticControlBinding;

    fn name(&self) -> &'static str {
        "Synthetic Control"
    }

    fn list_devices(&self) -> Result<Vec<DeviceEntry>, CameraError> {
        if self.listing_fails {
            return Err(CameraError::InitializationError(
                "device enumeration unavailable".to_string(),
            ));
        }
        let mut entries: Vec<DeviceEntry> = self.devices.iter().map(|d| d.entry()).collect();
        entries.sort_by_key(|entry| entry.index);
        Ok(entries)
    }

    fn bind(&self, device: &DeviceEntry) -> Result<SyntheticControlBinding, CameraError> {
        let handle = find_by_index(&self.devices, device.index)?;
        handle.with(|state| {
            if state.control_bind_fails {
                return Err(CameraError::InitializationError(format!(
                    "'{}' refused the control binding",
                    state.name
                )));
            }
            state.open_bindings += 1;
            Ok(())
        })?;
        Ok(SyntheticControlBinding { device: handle })
    }
}

/// Live control binding; decrements the device's binding count on drop
#[derive(Debug)]
pub struct SyntheticControlBinding {
    device: SyntheticDevice,
}

impl SyntheticControlBinding {
    fn read(&self, property: CameraProperty) -> Result<ControlReading, CameraError> {
        self.device.with(|state| {
            let control = state.control(property)?;
            Ok(ControlReading {
                value: control.value,
                is_auto: control.is_auto,
            })
        })
    }

    fn write(&self, property: CameraProperty, value: i32, is_auto: bool) -> Result<(), CameraError> {
        self.device.with(|state| {
            let control = state
                .controls
                .get_mut(&property)
                .ok_or_else(|| CameraError::UnsupportedProperty(property.to_string()))?;
            if is_auto {
                if !control.has_auto {
                    return Err(CameraError::ControlError(format!("{} has no auto mode", property)));
                }
                control.is_auto = true;
                return Ok(());
            }
            if value < control.min || value > control.max {
                return Err(CameraError::ControlError(format!(
                    "{} value {} outside [{}, {}]",
                    property, value, control.min, control.max
                )));
            }
            control.value = value;
            control.is_auto = false;
            Ok(())
        })
    }

    fn range(&self, property: CameraProperty) -> Result<ControlRange, CameraError> {
        self.device.with(|state| {
            let control = state.control(property)?;
            Ok(ControlRange {
                min: control.min,
                max: control.max,
                step: control.step,
                default: control.default,
            })
        })
    }
}

impl ControlBinding for SyntheticControlBinding {
    fn camera_control(&self, key: CameraControlKey) -> Result<ControlReading, CameraError> {
        self.read(key.into())
    }

    fn set_camera_control(
        &mut self,
        key: CameraControlKey,
        value: i32,
        is_auto: bool,
    ) -> Result<(), CameraError> {
        self.write(key.into(), value, is_auto)
    }

    fn camera_control_range(&self, key: CameraControlKey) -> Result<ControlRange, CameraError> {
        self.range(key.into())
    }

    fn proc_amp(&self, key: ProcAmpKey) -> Result<ControlReading, CameraError> {
        self.read(key.into())
    }

    fn set_proc_amp(
        &mut self,
        key: ProcAmpKey,
        value: i32,
        is_auto: bool,
    ) -> Result<(), CameraError> {
        self.write(key.into(), value, is_auto)
    }

    fn proc_amp_range(&self, key: ProcAmpKey) -> Result<ControlRange, CameraError> {
        self.range(key.into())
    }

    fn format_capabilities(&self) -> Result<Vec<VideoFormat>, CameraError> {
        Ok(self.device.with(|state| state.formats.clone()))
    }

    fn commit_format(&mut self, index: usize) -> Result<(), CameraError> {
        self.device.with(|state| {
            state.format_commits += 1;
            if state.format_commit_fails {
                return Err(CameraError::FormatError("device rejected the format".to_string()));
            }
            let format = state.formats.get(index).copied().ok_or_else(|| {
                CameraError::FormatError(format!("no format capability {}", index))
            })?;
            state.resolution = format.resolution();
            Ok(())
        })
    }
}

impl Drop for SyntheticControlBinding {
    fn drop(&mut self) {
        self.device
            .with(|state| state.open_bindings = state.open_bindings.saturating_sub(1));
    }
}

/// Stream backend over a fixed set of synthetic devices
#[derive(Debug, Clone, Default)]
pub struct SyntheticStreamBackend {
    devices: Vec<SyntheticDevice>,
}

impl SyntheticStreamBackend {
    pub fn new(devices: Vec<SyntheticDevice>) -> Self {
        Self { devices }
    }
}

impl StreamBackend for SyntheticStreamBackend {
    type Stream = SyntheticStream;

    fn name(&self) -> &'static str {
        "Synthetic Capture"
    }

    fn open(&self, index: u32, api: ApiPreference) -> Result<SyntheticStream, CameraError> {
        let device = find_by_index(&self.devices, index)?;
        let cached = device.with(|state| {
            let available = match api {
                ApiPreference::Primary => state.primary_api_available,
                ApiPreference::Generic => state.generic_api_available,
            };
            if !available {
                return Err(CameraError::InitializationError(format!(
                    "{:?} API cannot open '{}'",
                    api, state.name
                )));
            }
            state.open_streams += 1;
            state.last_api = Some(api);
            Ok(state.resolution)
        })?;
        Ok(SyntheticStream { device, cached })
    }
}

/// Open synthetic stream; decrements the device's stream count on drop
#[derive(Debug)]
pub struct SyntheticStream {
    device: SyntheticDevice,
    cached: Resolution,
}

impl VideoStream for SyntheticStream {
    fn read_frame(&mut self) -> Result<CameraFrame, CameraError> {
        let (frame_number, resolution, name, empty, stale) = self.device.with(|state| {
            state.frames_read += 1;
            let stale = state.queued_stale_frames > 0;
            state.queued_stale_frames = state.queued_stale_frames.saturating_sub(1);
            (
                state.frames_read,
                state.resolution,
                state.name.clone(),
                state.empty_frames,
                stale,
            )
        });
        let frame = if empty {
            CameraFrame::new(Vec::new(), 0, 0, 3, name)
        } else {
            synthetic_video_frame(frame_number, resolution.width, resolution.height, &name)
        };
        if stale {
            return Ok(frame.with_timestamp(Utc::now() - Duration::seconds(1)));
        }
        Ok(frame)
    }

    fn resolution(&self) -> Result<Resolution, CameraError> {
        self.device.with(|state| {
            if state.resolution_read_fails {
                return Err(CameraError::StreamError("frame size query failed".to_string()));
            }
            if state.stream_caches_format {
                return Ok(self.cached);
            }
            Ok(state.resolution)
        })
    }

    fn refresh_resolution(&mut self) -> Result<Resolution, CameraError> {
        let current = self.device.with(|state| {
            state.format_refreshes += 1;
            if state.resolution_read_fails {
                return Err(CameraError::StreamError("frame size query failed".to_string()));
            }
            Ok(state.resolution)
        })?;
        self.cached = current;
        Ok(current)
    }

    fn set_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError> {
        let should_panic = self.device.with(|state| {
            state.resolution_writes += 1;
            state.panic_on_resolution == Some(resolution)
        });
        if should_panic {
            panic!("injected fault while writing frame size {}", resolution);
        }

        let applied = self.device.with(|state| {
            if state.stream_modes.contains(&resolution) {
                state.resolution = resolution;
                return Ok(resolution);
            }
            if let Some((_, applied)) = state.rounding.iter().find(|(req, _)| *req == resolution) {
                state.resolution = *applied;
                return Ok(*applied);
            }
            Err(CameraError::StreamError(format!(
                "frame size {} not supported",
                resolution
            )))
        })?;
        self.cached = applied;
        Ok(())
    }

    fn frame_rate(&self) -> Result<f64, CameraError> {
        Ok(self.device.with(|state| state.fps))
    }

    fn set_frame_rate(&mut self, fps: f64) -> Result<(), CameraError> {
        self.device.with(|state| {
            state.fps_writes += 1;
            // Drivers snap to the nearest supported rate
            let nearest = state
                .frame_rates
                .iter()
                .copied()
                .min_by(|a, b| (a - fps).abs().total_cmp(&(b - fps).abs()))
                .ok_or_else(|| CameraError::StreamError("no frame rates".to_string()))?;
            state.fps = nearest;
            Ok(())
        })
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.device
            .with(|state| state.open_streams = state.open_streams.saturating_sub(1));
    }
}

/// Selector pairing the synthetic control and stream backends
#[derive(Debug, Clone, Default)]
pub struct SyntheticBackends {
    devices: Vec<SyntheticDevice>,
    control_listing_fails: bool,
}

impl SyntheticBackends {
    pub fn new(devices: Vec<SyntheticDevice>) -> Self {
        Self {
            devices,
            control_listing_fails: false,
        }
    }

    /// Control-path enumeration errors; capture streams still open by index
    pub fn without_control_listing(devices: Vec<SyntheticDevice>) -> Self {
        Self {
            devices,
            control_listing_fails: true,
        }
    }

    pub fn devices(&self) -> &[SyntheticDevice] {
        &self.devices
    }
}

impl BackendSelector for SyntheticBackends {
    type Parameter = UvcParameterController<SyntheticControlBackend>;
    type Capture = StreamCaptureEngine<SyntheticStreamBackend>;

    fn platform(&self) -> Platform {
        Platform::current()
    }

    fn parameter_controller(&self) -> Self::Parameter {
        let backend = if self.control_listing_fails {
            SyntheticControlBackend::failing()
        } else {
            SyntheticControlBackend::new(self.devices.clone())
        };
        UvcParameterController::new(backend)
    }

    fn capture_engine(&self) -> Self::Capture {
        StreamCaptureEngine::new(SyntheticStreamBackend::new(self.devices.clone()))
    }
}
