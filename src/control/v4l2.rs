//! Video4Linux2 control backend.
//!
//! Acquisition controls live in the V4L2 camera class, image-processing
//! controls in the user class. Each property may have an "auto" companion
//! control that is toggled alongside the value.

use super::{ControlBackend, ControlBinding, ControlRange, ControlReading};
use crate::errors::CameraError;
use crate::types::{CameraControlKey, DeviceEntry, ProcAmpKey, VideoFormat};
use std::collections::HashMap;
use std::path::PathBuf;
use v4l::capability::Flags as CapabilityFlags;
use v4l::control::{Control, Description, Type as ControlType, Value};
use v4l::framesize::FrameSizeEnum;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

const CID_BRIGHTNESS: u32 = 0x0098_0900;
const CID_CONTRAST: u32 = 0x0098_0901;
const CID_SATURATION: u32 = 0x0098_0902;
const CID_HUE: u32 = 0x0098_0903;
const CID_AUTO_WHITE_BALANCE: u32 = 0x0098_090c;
const CID_GAMMA: u32 = 0x0098_0910;
const CID_AUTOGAIN: u32 = 0x0098_0912;
const CID_GAIN: u32 = 0x0098_0913;
const CID_HUE_AUTO: u32 = 0x0098_0919;
const CID_WHITE_BALANCE_TEMPERATURE: u32 = 0x0098_091a;
const CID_SHARPNESS: u32 = 0x0098_091b;
const CID_BACKLIGHT_COMPENSATION: u32 = 0x0098_091c;
const CID_COLOR_KILLER: u32 = 0x0098_091e;

const CID_EXPOSURE_AUTO: u32 = 0x009a_0901;
const CID_EXPOSURE_ABSOLUTE: u32 = 0x009a_0902;
const CID_PAN_ABSOLUTE: u32 = 0x009a_0908;
const CID_TILT_ABSOLUTE: u32 = 0x009a_0909;
const CID_FOCUS_ABSOLUTE: u32 = 0x009a_090a;
const CID_FOCUS_AUTO: u32 = 0x009a_090c;
const CID_ZOOM_ABSOLUTE: u32 = 0x009a_090d;
const CID_IRIS_ABSOLUTE: u32 = 0x009a_0911;

// V4L2_EXPOSURE_MANUAL / V4L2_EXPOSURE_APERTURE_PRIORITY
const EXPOSURE_MANUAL: i64 = 1;
const EXPOSURE_APERTURE_PRIORITY: i64 = 3;

/// Auto companion of a value control
#[derive(Debug, Clone, Copy)]
struct AutoControl {
    id: u32,
    on: i64,
    off: i64,
}

impl AutoControl {
    const fn boolean(id: u32) -> Self {
        Self { id, on: 1, off: 0 }
    }
}

/// How one property maps onto V4L2 controls
#[derive(Debug, Clone, Copy)]
struct ControlMapping {
    id: u32,
    auto: Option<AutoControl>,
    /// The control's meaning is the negation of the property (color killer)
    inverted: bool,
}

impl ControlMapping {
    const fn plain(id: u32) -> Self {
        Self {
            id,
            auto: None,
            inverted: false,
        }
    }

    const fn with_auto(id: u32, auto: AutoControl) -> Self {
        Self {
            id,
            auto: Some(auto),
            inverted: false,
        }
    }
}

fn camera_control_mapping(key: CameraControlKey) -> Option<ControlMapping> {
    match key {
        CameraControlKey::Exposure => Some(ControlMapping::with_auto(
            CID_EXPOSURE_ABSOLUTE,
            AutoControl {
                id: CID_EXPOSURE_AUTO,
                on: EXPOSURE_APERTURE_PRIORITY,
                off: EXPOSURE_MANUAL,
            },
        )),
        CameraControlKey::Focus => Some(ControlMapping::with_auto(
            CID_FOCUS_ABSOLUTE,
            AutoControl::boolean(CID_FOCUS_AUTO),
        )),
        CameraControlKey::Zoom => Some(ControlMapping::plain(CID_ZOOM_ABSOLUTE)),
        CameraControlKey::Pan => Some(ControlMapping::plain(CID_PAN_ABSOLUTE)),
        CameraControlKey::Tilt => Some(ControlMapping::plain(CID_TILT_ABSOLUTE)),
        CameraControlKey::Iris => Some(ControlMapping::plain(CID_IRIS_ABSOLUTE)),
        // No V4L2 control id exists for roll
        CameraControlKey::Roll => None,
    }
}

fn proc_amp_mapping(key: ProcAmpKey) -> ControlMapping {
    match key {
        ProcAmpKey::Brightness => ControlMapping::plain(CID_BRIGHTNESS),
        ProcAmpKey::Contrast => ControlMapping::plain(CID_CONTRAST),
        ProcAmpKey::Saturation => ControlMapping::plain(CID_SATURATION),
        ProcAmpKey::Hue => {
            ControlMapping::with_auto(CID_HUE, AutoControl::boolean(CID_HUE_AUTO))
        }
        ProcAmpKey::Sharpness => ControlMapping::plain(CID_SHARPNESS),
        ProcAmpKey::Gamma => ControlMapping::plain(CID_GAMMA),
        ProcAmpKey::ColorEnable => ControlMapping {
            id: CID_COLOR_KILLER,
            auto: None,
            inverted: true,
        },
        ProcAmpKey::WhiteBalance => ControlMapping::with_auto(
            CID_WHITE_BALANCE_TEMPERATURE,
            AutoControl::boolean(CID_AUTO_WHITE_BALANCE),
        ),
        ProcAmpKey::BacklightCompensation => ControlMapping::plain(CID_BACKLIGHT_COMPENSATION),
        ProcAmpKey::Gain => ControlMapping::with_auto(CID_GAIN, AutoControl::boolean(CID_AUTOGAIN)),
    }
}

/// Bits per pixel of a V4L2 pixel format, `None` for encodings we do not report
pub fn bits_per_pixel(fourcc: &FourCC) -> Option<u16> {
    match &fourcc.repr {
        b"MJPG" | b"JPEG" | b"RGB3" | b"BGR3" => Some(24),
        b"YUYV" | b"UYVY" | b"YVYU" | b"VYUY" | b"RGBP" | b"Y16 " => Some(16),
        b"NV12" | b"NV21" | b"YU12" | b"YV12" => Some(12),
        b"GREY" => Some(8),
        b"RGB4" | b"BGR4" | b"XR24" | b"AR24" => Some(32),
        _ => None,
    }
}

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn io_error(context: &str, error: std::io::Error) -> CameraError {
    CameraError::ControlError(format!("{}: {}", context, error))
}

/// Enumerates `/dev/video*` capture nodes and binds them through V4L2 ioctls
#[derive(Debug, Default, Clone, Copy)]
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

impl ControlBackend for V4l2Backend {
    type Binding = V4l2Binding;

    fn name(&self) -> &'static str {
        "V4L2"
    }

    fn list_devices(&self) -> Result<Vec<DeviceEntry>, CameraError> {
        let mut entries = Vec::new();
        for node in v4l::context::enum_devices() {
            let Ok(device) = Device::with_path(node.path()) else {
                continue;
            };
            let Ok(caps) = device.query_caps() else {
                continue;
            };
            // UVC cameras also expose metadata nodes that cannot stream video
            if !caps.capabilities.contains(CapabilityFlags::VIDEO_CAPTURE) {
                continue;
            }
            let name = node.name().unwrap_or(caps.card);
            entries.push(DeviceEntry::new(node.index() as u32, name));
        }
        entries.sort_by_key(|entry| entry.index);
        Ok(entries)
    }

    fn bind(&self, device: &DeviceEntry) -> Result<V4l2Binding, CameraError> {
        let path = PathBuf::from(format!("/dev/video{}", device.index));
        let handle = Device::with_path(&path).map_err(|e| {
            CameraError::InitializationError(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let descriptions = handle
            .query_controls()
            .map_err(|e| io_error("Failed to query controls", e))?
            .into_iter()
            .map(|description| (description.id, description))
            .collect();

        Ok(V4l2Binding {
            device: handle,
            path,
            descriptions,
        })
    }
}

/// Open V4L2 device handle. The file descriptor closes on drop.
pub struct V4l2Binding {
    device: Device,
    path: PathBuf,
    descriptions: HashMap<u32, Description>,
}

impl V4l2Binding {
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn description(&self, id: u32) -> Result<&Description, CameraError> {
        self.descriptions.get(&id).ok_or_else(|| {
            CameraError::UnsupportedProperty(format!(
                "control {:#010x} not exposed by {}",
                id,
                self.path.display()
            ))
        })
    }

    fn read_raw(&self, id: u32) -> Result<i64, CameraError> {
        self.description(id)?;
        let control = self
            .device
            .control(id)
            .map_err(|e| io_error("Failed to read control", e))?;
        match control.value {
            Value::Integer(value) => Ok(value),
            Value::Boolean(value) => Ok(i64::from(value)),
            other => Err(CameraError::ControlError(format!(
                "control {:#010x} has non-numeric value {:?}",
                id, other
            ))),
        }
    }

    fn write_raw(&self, id: u32, value: i64) -> Result<(), CameraError> {
        let description = self.description(id)?;
        let value = match description.typ {
            ControlType::Boolean => Value::Boolean(value != 0),
            _ => Value::Integer(value),
        };
        self.device
            .set_control(Control { id, value })
            .map_err(|e| io_error("Failed to write control", e))
    }

    fn read(&self, mapping: ControlMapping) -> Result<ControlReading, CameraError> {
        let raw = self.read_raw(mapping.id)?;
        let value = if mapping.inverted {
            i32::from(raw == 0)
        } else {
            saturate(raw)
        };
        let is_auto = match mapping.auto {
            Some(auto) if self.descriptions.contains_key(&auto.id) => {
                self.read_raw(auto.id)? != auto.off
            }
            _ => false,
        };
        Ok(ControlReading { value, is_auto })
    }

    fn write(&self, mapping: ControlMapping, value: i32, is_auto: bool) -> Result<(), CameraError> {
        match mapping.auto {
            Some(auto) if self.descriptions.contains_key(&auto.id) => {
                self.write_raw(auto.id, if is_auto { auto.on } else { auto.off })?;
                if is_auto {
                    // The value control is inactive while auto mode is on
                    return Ok(());
                }
            }
            _ if is_auto => {
                return Err(CameraError::ControlError(format!(
                    "control {:#010x} has no auto mode",
                    mapping.id
                )));
            }
            _ => {}
        }

        let raw = if mapping.inverted {
            i64::from(value == 0)
        } else {
            i64::from(value)
        };
        self.write_raw(mapping.id, raw)
    }

    fn range(&self, mapping: ControlMapping) -> Result<ControlRange, CameraError> {
        let description = self.description(mapping.id)?;
        if mapping.inverted {
            return Ok(ControlRange {
                min: 0,
                max: 1,
                step: 1,
                default: i32::from(description.default == 0),
            });
        }
        Ok(ControlRange {
            min: saturate(description.minimum),
            max: saturate(description.maximum),
            step: i32::try_from(description.step).unwrap_or(i32::MAX),
            default: saturate(description.default),
        })
    }

    fn declared_formats(&self) -> Result<Vec<(VideoFormat, FourCC)>, CameraError> {
        let descriptions = self
            .device
            .enum_formats()
            .map_err(|e| CameraError::FormatError(format!("Failed to enumerate formats: {}", e)))?;

        let mut declared = Vec::new();
        for description in descriptions {
            let Some(bpp) = bits_per_pixel(&description.fourcc) else {
                log::debug!("Skipping pixel format {}", description.fourcc);
                continue;
            };
            let sizes = self.device.enum_framesizes(description.fourcc).map_err(|e| {
                CameraError::FormatError(format!("Failed to enumerate frame sizes: {}", e))
            })?;
            for size in sizes {
                match size.size {
                    FrameSizeEnum::Discrete(discrete) => declared.push((
                        VideoFormat::new(discrete.width, discrete.height, bpp),
                        description.fourcc,
                    )),
                    FrameSizeEnum::Stepwise(stepwise) => {
                        declared.push((
                            VideoFormat::new(stepwise.min_width, stepwise.min_height, bpp),
                            description.fourcc,
                        ));
                        declared.push((
                            VideoFormat::new(stepwise.max_width, stepwise.max_height, bpp),
                            description.fourcc,
                        ));
                    }
                }
            }
        }
        Ok(declared)
    }
}

fn unsupported_roll() -> CameraError {
    CameraError::UnsupportedProperty("Roll is not available through V4L2".to_string())
}

impl ControlBinding for V4l2Binding {
    fn camera_control(&self, key: CameraControlKey) -> Result<ControlReading, CameraError> {
        let mapping = camera_control_mapping(key).ok_or_else(unsupported_roll)?;
        self.read(mapping)
    }

    fn set_camera_control(
        &mut self,
        key: CameraControlKey,
        value: i32,
        is_auto: bool,
    ) -> Result<(), CameraError> {
        let mapping = camera_control_mapping(key).ok_or_else(unsupported_roll)?;
        self.write(mapping, value, is_auto)
    }

    fn camera_control_range(&self, key: CameraControlKey) -> Result<ControlRange, CameraError> {
        let mapping = camera_control_mapping(key).ok_or_else(unsupported_roll)?;
        self.range(mapping)
    }

    fn proc_amp(&self, key: ProcAmpKey) -> Result<ControlReading, CameraError> {
        self.read(proc_amp_mapping(key))
    }

    fn set_proc_amp(
        &mut self,
        key: ProcAmpKey,
        value: i32,
        is_auto: bool,
    ) -> Result<(), CameraError> {
        self.write(proc_amp_mapping(key), value, is_auto)
    }

    fn proc_amp_range(&self, key: ProcAmpKey) -> Result<ControlRange, CameraError> {
        self.range(proc_amp_mapping(key))
    }

    fn format_capabilities(&self) -> Result<Vec<VideoFormat>, CameraError> {
        Ok(self
            .declared_formats()?
            .into_iter()
            .map(|(format, _)| format)
            .collect())
    }

    fn commit_format(&mut self, index: usize) -> Result<(), CameraError> {
        let declared = self.declared_formats()?;
        let (format, fourcc) = declared.get(index).copied().ok_or_else(|| {
            CameraError::FormatError(format!("format capability {} no longer declared", index))
        })?;

        let applied = self
            .device
            .set_format(&Format::new(format.width, format.height, fourcc))
            .map_err(|e| CameraError::FormatError(format!("Failed to set format: {}", e)))?;

        if applied.width != format.width || applied.height != format.height {
            return Err(CameraError::FormatError(format!(
                "driver applied {}x{} instead of {}x{}",
                applied.width, applied.height, format.width, format.height
            )));
        }
        Ok(())
    }
}
