//! Core data model shared by the parameter, capture and unified layers.

use crate::errors::CameraError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating system the crate was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Windows,
    MacOS,
    Linux,
    Unknown,
}

impl Platform {
    /// Detect the platform at compile time
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOS
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOS => "macos",
            Platform::Linux => "linux",
            Platform::Unknown => "unknown",
        }
    }
}

/// Controllable camera attribute.
///
/// The first seven kinds belong to the acquisition-control group (UVC camera
/// terminal), the remaining ten to the image-processing group (UVC processing
/// unit). Callers never need to care which group a kind lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraProperty {
    Exposure,
    Focus,
    Zoom,
    Pan,
    Tilt,
    Roll,
    Iris,
    Brightness,
    Contrast,
    Hue,
    Saturation,
    Sharpness,
    Gamma,
    ColorEnable,
    WhiteBalance,
    BacklightCompensation,
    Gain,
}

impl CameraProperty {
    /// Every property kind, in declaration order
    pub const ALL: [CameraProperty; 17] = [
        CameraProperty::Exposure,
        CameraProperty::Focus,
        CameraProperty::Zoom,
        CameraProperty::Pan,
        CameraProperty::Tilt,
        CameraProperty::Roll,
        CameraProperty::Iris,
        CameraProperty::Brightness,
        CameraProperty::Contrast,
        CameraProperty::Hue,
        CameraProperty::Saturation,
        CameraProperty::Sharpness,
        CameraProperty::Gamma,
        CameraProperty::ColorEnable,
        CameraProperty::WhiteBalance,
        CameraProperty::BacklightCompensation,
        CameraProperty::Gain,
    ];

    /// Map the property onto its negotiation group and the key used on that path
    pub fn binding(self) -> PropertyBinding {
        use CameraControlKey as C;
        use ProcAmpKey as P;
        match self {
            CameraProperty::Exposure => PropertyBinding::CameraControl(C::Exposure),
            CameraProperty::Focus => PropertyBinding::CameraControl(C::Focus),
            CameraProperty::Zoom => PropertyBinding::CameraControl(C::Zoom),
            CameraProperty::Pan => PropertyBinding::CameraControl(C::Pan),
            CameraProperty::Tilt => PropertyBinding::CameraControl(C::Tilt),
            CameraProperty::Roll => PropertyBinding::CameraControl(C::Roll),
            CameraProperty::Iris => PropertyBinding::CameraControl(C::Iris),
            CameraProperty::Brightness => PropertyBinding::ProcAmp(P::Brightness),
            CameraProperty::Contrast => PropertyBinding::ProcAmp(P::Contrast),
            CameraProperty::Hue => PropertyBinding::ProcAmp(P::Hue),
            CameraProperty::Saturation => PropertyBinding::ProcAmp(P::Saturation),
            CameraProperty::Sharpness => PropertyBinding::ProcAmp(P::Sharpness),
            CameraProperty::Gamma => PropertyBinding::ProcAmp(P::Gamma),
            CameraProperty::ColorEnable => PropertyBinding::ProcAmp(P::ColorEnable),
            CameraProperty::WhiteBalance => PropertyBinding::ProcAmp(P::WhiteBalance),
            CameraProperty::BacklightCompensation => {
                PropertyBinding::ProcAmp(P::BacklightCompensation)
            }
            CameraProperty::Gain => PropertyBinding::ProcAmp(P::Gain),
        }
    }

    pub fn group(self) -> PropertyGroup {
        self.binding().group()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CameraProperty::Exposure => "Exposure",
            CameraProperty::Focus => "Focus",
            CameraProperty::Zoom => "Zoom",
            CameraProperty::Pan => "Pan",
            CameraProperty::Tilt => "Tilt",
            CameraProperty::Roll => "Roll",
            CameraProperty::Iris => "Iris",
            CameraProperty::Brightness => "Brightness",
            CameraProperty::Contrast => "Contrast",
            CameraProperty::Hue => "Hue",
            CameraProperty::Saturation => "Saturation",
            CameraProperty::Sharpness => "Sharpness",
            CameraProperty::Gamma => "Gamma",
            CameraProperty::ColorEnable => "ColorEnable",
            CameraProperty::WhiteBalance => "WhiteBalance",
            CameraProperty::BacklightCompensation => "BacklightCompensation",
            CameraProperty::Gain => "Gain",
        }
    }
}

impl fmt::Display for CameraProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraProperty {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CameraProperty::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CameraError::UnsupportedProperty(s.to_string()))
    }
}

/// Underlying negotiation path a property is read and written through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyGroup {
    AcquisitionControl,
    ImageProcessing,
}

/// Keys on the acquisition-control path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraControlKey {
    Exposure,
    Focus,
    Zoom,
    Pan,
    Tilt,
    Roll,
    Iris,
}

/// Keys on the image-processing path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcAmpKey {
    Brightness,
    Contrast,
    Hue,
    Saturation,
    Sharpness,
    Gamma,
    ColorEnable,
    WhiteBalance,
    BacklightCompensation,
    Gain,
}

impl From<CameraControlKey> for CameraProperty {
    fn from(key: CameraControlKey) -> Self {
        match key {
            CameraControlKey::Exposure => CameraProperty::Exposure,
            CameraControlKey::Focus => CameraProperty::Focus,
            CameraControlKey::Zoom => CameraProperty::Zoom,
            CameraControlKey::Pan => CameraProperty::Pan,
            CameraControlKey::Tilt => CameraProperty::Tilt,
            CameraControlKey::Roll => CameraProperty::Roll,
            CameraControlKey::Iris => CameraProperty::Iris,
        }
    }
}

impl From<ProcAmpKey> for CameraProperty {
    fn from(key: ProcAmpKey) -> Self {
        match key {
            ProcAmpKey::Brightness => CameraProperty::Brightness,
            ProcAmpKey::Contrast => CameraProperty::Contrast,
            ProcAmpKey::Hue => CameraProperty::Hue,
            ProcAmpKey::Saturation => CameraProperty::Saturation,
            ProcAmpKey::Sharpness => CameraProperty::Sharpness,
            ProcAmpKey::Gamma => CameraProperty::Gamma,
            ProcAmpKey::ColorEnable => CameraProperty::ColorEnable,
            ProcAmpKey::WhiteBalance => CameraProperty::WhiteBalance,
            ProcAmpKey::BacklightCompensation => CameraProperty::BacklightCompensation,
            ProcAmpKey::Gain => CameraProperty::Gain,
        }
    }
}

/// Tagged (group, key) pair for one property kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyBinding {
    CameraControl(CameraControlKey),
    ProcAmp(ProcAmpKey),
}

impl PropertyBinding {
    pub fn group(&self) -> PropertyGroup {
        match self {
            PropertyBinding::CameraControl(_) => PropertyGroup::AcquisitionControl,
            PropertyBinding::ProcAmp(_) => PropertyGroup::ImageProcessing,
        }
    }
}

/// Device-reported bounds of a property.
///
/// `step == 0` means the property is continuous. When `success` is false every
/// numeric field is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRange {
    pub property: CameraProperty,
    pub min: i32,
    pub max: i32,
    pub step: i32,
    pub default: i32,
    pub success: bool,
}

impl PropertyRange {
    pub fn new(property: CameraProperty, min: i32, max: i32, step: i32, default: i32) -> Self {
        Self {
            property,
            min,
            max,
            step,
            default,
            success: true,
        }
    }

    /// The "unsupported" shape: `(0, 0, 0, 0, false)`
    pub fn failed(property: CameraProperty) -> Self {
        Self {
            property,
            min: 0,
            max: 0,
            step: 0,
            default: 0,
            success: false,
        }
    }

    pub fn is_continuous(&self) -> bool {
        self.step == 0
    }

    pub fn contains(&self, value: i32) -> bool {
        self.success && (self.min..=self.max).contains(&value)
    }

    /// Clamp a value into `[min, max]`; returns the value unchanged for a failed range
    pub fn clamp(&self, value: i32) -> i32 {
        if !self.success || self.min > self.max {
            return value;
        }
        value.clamp(self.min, self.max)
    }
}

/// Current value of a property together with its auto/manual flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyState {
    pub property: CameraProperty,
    pub value: i32,
    pub is_auto: bool,
    pub success: bool,
}

impl PropertyState {
    pub fn new(property: CameraProperty, value: i32, is_auto: bool) -> Self {
        Self {
            property,
            value,
            is_auto,
            success: true,
        }
    }

    /// The "unsupported" shape: `(0, false, false)`
    pub fn failed(property: CameraProperty) -> Self {
        Self {
            property,
            value: 0,
            is_auto: false,
            success: false,
        }
    }
}

/// Property state paired with its range, as listed by a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySnapshot {
    pub state: PropertyState,
    pub range: PropertyRange,
}

/// A declared video format. Equal only when all three fields match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoFormat {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u16,
}

impl VideoFormat {
    pub fn new(width: u32, height: u32, bits_per_pixel: u16) -> Self {
        Self {
            width,
            height,
            bits_per_pixel,
        }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} @ {}bpp", self.width, self.height, self.bits_per_pixel)
    }
}

/// Frame dimensions. Unique by (width, height).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const ZERO: Resolution = Resolution {
        width: 0,
        height: 0,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl From<Resolution> for (u32, u32) {
    fn from(r: Resolution) -> Self {
        (r.width, r.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Frame size and rate as currently reported by the capture engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureStatus {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// A camera the parameter backend can bind to.
///
/// `index` is the acquisition index of the same physical device in the
/// capture backend, so both bindings of a session agree on the hardware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub index: u32,
    pub name: String,
}

impl DeviceEntry {
    pub fn new(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

/// Lifecycle of a unified controller session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

/// One raster produced by a single acquisition call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraFrame {
    pub id: String,
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub format: String,
    pub timestamp: DateTime<Utc>,
    pub device_id: String,
}

impl CameraFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, device_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            data,
            width,
            height,
            channels,
            format: "RGB8".to_string(),
            timestamp: Utc::now(),
            device_id,
        }
    }

    pub fn with_format(mut self, format: String) -> Self {
        self.format = format;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// True when the frame carries no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Convert the raster into an `image::DynamicImage`.
    ///
    /// Supports 1 (luma), 3 (RGB) and 4 (RGBA) channel rasters; returns `None`
    /// for any other channel count or when the buffer length does not match
    /// the declared dimensions.
    pub fn to_image(&self) -> Option<image::DynamicImage> {
        if self.is_empty() {
            return None;
        }
        let data = self.data.clone();
        match self.channels {
            1 => image::GrayImage::from_raw(self.width, self.height, data)
                .map(image::DynamicImage::ImageLuma8),
            3 => image::RgbImage::from_raw(self.width, self.height, data)
                .map(image::DynamicImage::ImageRgb8),
            4 => image::RgbaImage::from_raw(self.width, self.height, data)
                .map(image::DynamicImage::ImageRgba8),
            _ => None,
        }
    }
}
