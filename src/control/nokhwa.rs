//! Control backend built on nokhwa's camera controls (MediaFoundation, AVFoundation).

use super::{ControlBackend, ControlBinding, ControlRange, ControlReading};
use crate::capture::nokhwa::{native_api, query_devices};
use crate::errors::CameraError;
use crate::types::{CameraControlKey, DeviceEntry, ProcAmpKey, VideoFormat};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, ControlValueDescription, ControlValueSetter, FrameFormat,
    KnownCameraControl, KnownCameraControlFlag, RequestedFormat, RequestedFormatType,
};
use nokhwa::Camera;
use std::sync::Mutex;

fn camera_control_known(key: CameraControlKey) -> Option<KnownCameraControl> {
    match key {
        CameraControlKey::Exposure => Some(KnownCameraControl::Exposure),
        CameraControlKey::Focus => Some(KnownCameraControl::Focus),
        CameraControlKey::Zoom => Some(KnownCameraControl::Zoom),
        CameraControlKey::Pan => Some(KnownCameraControl::Pan),
        CameraControlKey::Tilt => Some(KnownCameraControl::Tilt),
        CameraControlKey::Iris => Some(KnownCameraControl::Iris),
        CameraControlKey::Roll => None,
    }
}

fn proc_amp_known(key: ProcAmpKey) -> Option<KnownCameraControl> {
    match key {
        ProcAmpKey::Brightness => Some(KnownCameraControl::Brightness),
        ProcAmpKey::Contrast => Some(KnownCameraControl::Contrast),
        ProcAmpKey::Hue => Some(KnownCameraControl::Hue),
        ProcAmpKey::Saturation => Some(KnownCameraControl::Saturation),
        ProcAmpKey::Sharpness => Some(KnownCameraControl::Sharpness),
        ProcAmpKey::Gamma => Some(KnownCameraControl::Gamma),
        ProcAmpKey::WhiteBalance => Some(KnownCameraControl::WhiteBalance),
        ProcAmpKey::BacklightCompensation => Some(KnownCameraControl::BacklightComp),
        ProcAmpKey::Gain => Some(KnownCameraControl::Gain),
        ProcAmpKey::ColorEnable => None,
    }
}

fn frame_format_bpp(format: FrameFormat) -> u16 {
    match format {
        FrameFormat::YUYV => 16,
        FrameFormat::NV12 => 12,
        FrameFormat::GRAY => 8,
        _ => 24,
    }
}

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Nokhwa device listing plus control binding for the current platform
#[derive(Debug, Default, Clone, Copy)]
pub struct NokhwaControlBackend;

impl NokhwaControlBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ControlBackend for NokhwaControlBackend {
    type Binding = NokhwaControlBinding;

    fn name(&self) -> &'static str {
        if cfg!(target_os = "windows") {
            "MediaFoundation"
        } else if cfg!(target_os = "macos") {
            "AVFoundation"
        } else {
            "Nokhwa"
        }
    }

    fn list_devices(&self) -> Result<Vec<DeviceEntry>, CameraError> {
        query_devices(native_api())
    }

    fn bind(&self, device: &DeviceEntry) -> Result<NokhwaControlBinding, CameraError> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
        let camera = Camera::with_backend(CameraIndex::Index(device.index), requested, native_api())
            .map_err(|e| {
                CameraError::InitializationError(format!(
                    "Failed to open '{}' for control: {}",
                    device.name, e
                ))
            })?;
        Ok(NokhwaControlBinding {
            camera: Mutex::new(camera),
        })
    }
}

/// Camera handle used only for controls and format negotiation
pub struct NokhwaControlBinding {
    camera: Mutex<Camera>,
}

impl NokhwaControlBinding {
    fn read(&self, known: KnownCameraControl) -> Result<ControlReading, CameraError> {
        let camera = self
            .camera
            .lock()
            .map_err(|_| CameraError::ControlError("Failed to lock camera".to_string()))?;
        let control = camera
            .camera_control(known)
            .map_err(|e| CameraError::ControlError(format!("Failed to read {:?}: {}", known, e)))?;

        let value = match control.description() {
            ControlValueDescription::IntegerRange { value, .. } => saturate(*value),
            ControlValueDescription::Integer { value, .. } => saturate(*value),
            ControlValueDescription::Boolean { value, .. } => i32::from(*value),
            other => {
                return Err(CameraError::ControlError(format!(
                    "{:?} has non-numeric value {:?}",
                    known, other
                )))
            }
        };
        let is_auto = control.flag().contains(&KnownCameraControlFlag::Automatic);
        Ok(ControlReading { value, is_auto })
    }

    fn write(
        &self,
        known: KnownCameraControl,
        value: i32,
        is_auto: bool,
    ) -> Result<(), CameraError> {
        if is_auto {
            return Err(CameraError::ControlError(format!(
                "auto mode for {:?} is not exposed by this backend",
                known
            )));
        }
        let mut camera = self
            .camera
            .lock()
            .map_err(|_| CameraError::ControlError("Failed to lock camera".to_string()))?;
        camera
            .set_camera_control(known, ControlValueSetter::Integer(i64::from(value)))
            .map_err(|e| CameraError::ControlError(format!("Failed to write {:?}: {}", known, e)))
    }

    fn range(&self, known: KnownCameraControl) -> Result<ControlRange, CameraError> {
        let camera = self
            .camera
            .lock()
            .map_err(|_| CameraError::ControlError("Failed to lock camera".to_string()))?;
        let control = camera
            .camera_control(known)
            .map_err(|e| CameraError::ControlError(format!("Failed to read {:?}: {}", known, e)))?;

        match control.description() {
            ControlValueDescription::IntegerRange {
                min,
                max,
                step,
                default,
                ..
            } => Ok(ControlRange {
                min: saturate(*min),
                max: saturate(*max),
                step: saturate(*step),
                default: saturate(*default),
            }),
            ControlValueDescription::Boolean { default, .. } => Ok(ControlRange {
                min: 0,
                max: 1,
                step: 1,
                default: i32::from(*default),
            }),
            other => Err(CameraError::ControlError(format!(
                "{:?} reports no range ({:?})",
                known, other
            ))),
        }
    }

    fn compatible_formats(&self) -> Result<Vec<CameraFormat>, CameraError> {
        let mut camera = self
            .camera
            .lock()
            .map_err(|_| CameraError::FormatError("Failed to lock camera".to_string()))?;
        camera
            .compatible_camera_formats()
            .map_err(|e| CameraError::FormatError(format!("Failed to enumerate formats: {}", e)))
    }
}

fn unsupported(what: &str) -> CameraError {
    CameraError::UnsupportedProperty(format!("{} is not exposed by this backend", what))
}

impl ControlBinding for NokhwaControlBinding {
    fn camera_control(&self, key: CameraControlKey) -> Result<ControlReading, CameraError> {
        let known = camera_control_known(key).ok_or_else(|| unsupported("Roll"))?;
        self.read(known)
    }

    fn set_camera_control(
        &mut self,
        key: CameraControlKey,
        value: i32,
        is_auto: bool,
    ) -> Result<(), CameraError> {
        let known = camera_control_known(key).ok_or_else(|| unsupported("Roll"))?;
        self.write(known, value, is_auto)
    }

    fn camera_control_range(&self, key: CameraControlKey) -> Result<ControlRange, CameraError> {
        let known = camera_control_known(key).ok_or_else(|| unsupported("Roll"))?;
        self.range(known)
    }

    fn proc_amp(&self, key: ProcAmpKey) -> Result<ControlReading, CameraError> {
        let known = proc_amp_known(key).ok_or_else(|| unsupported("ColorEnable"))?;
        self.read(known)
    }

    fn set_proc_amp(
        &mut self,
        key: ProcAmpKey,
        value: i32,
        is_auto: bool,
    ) -> Result<(), CameraError> {
        let known = proc_amp_known(key).ok_or_else(|| unsupported("ColorEnable"))?;
        self.write(known, value, is_auto)
    }

    fn proc_amp_range(&self, key: ProcAmpKey) -> Result<ControlRange, CameraError> {
        let known = proc_amp_known(key).ok_or_else(|| unsupported("ColorEnable"))?;
        self.range(known)
    }

    fn format_capabilities(&self) -> Result<Vec<VideoFormat>, CameraError> {
        Ok(self
            .compatible_formats()?
            .into_iter()
            .map(|format| {
                VideoFormat::new(
                    format.resolution().width_x,
                    format.resolution().height_y,
                    frame_format_bpp(format.format()),
                )
            })
            .collect())
    }

    fn commit_format(&mut self, index: usize) -> Result<(), CameraError> {
        let format = self
            .compatible_formats()?
            .get(index)
            .copied()
            .ok_or_else(|| {
                CameraError::FormatError(format!("format capability {} no longer declared", index))
            })?;

        let mut camera = self
            .camera
            .lock()
            .map_err(|_| CameraError::FormatError("Failed to lock camera".to_string()))?;
        camera
            .set_camera_requset(RequestedFormat::new::<RgbFormat>(RequestedFormatType::Exact(
                format,
            )))
            .map_err(|e| CameraError::FormatError(format!("Failed to commit {}: {}", format, e)))?;
        Ok(())
    }
}
