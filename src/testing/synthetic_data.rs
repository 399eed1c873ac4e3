//! Synthetic frames and device profiles for offline testing
//!
//! The default profile mirrors a common 720p UVC webcam: the stream only
//! accepts a handful of sizes directly while the control path also declares
//! a 1080p mode that can only be reached through format negotiation.

use crate::types::{CameraFrame, CameraProperty, Resolution, VideoFormat};

/// Create a synthetic RGB frame whose content changes with `frame_number`
pub fn synthetic_video_frame(
    frame_number: u64,
    width: u32,
    height: u32,
    device_id: &str,
) -> CameraFrame {
    let mut data = vec![0u8; width as usize * height as usize * 3];

    // Gradient that shifts every frame
    let base = (frame_number % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let idx = (y as usize * width as usize + x as usize) * 3;
            data[idx] = base.wrapping_add((x % 256) as u8);
            data[idx + 1] = base.wrapping_add((y % 256) as u8);
            data[idx + 2] = base.wrapping_add(((x + y) % 256) as u8);
        }
    }

    CameraFrame::new(data, width, height, 3, device_id.to_string())
}

/// One control exposed by a synthetic device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticControl {
    pub value: i32,
    pub is_auto: bool,
    pub min: i32,
    pub max: i32,
    pub step: i32,
    pub default: i32,
    pub has_auto: bool,
}

impl SyntheticControl {
    pub fn manual(min: i32, max: i32, step: i32, default: i32) -> Self {
        Self {
            value: default,
            is_auto: false,
            min,
            max,
            step,
            default,
            has_auto: false,
        }
    }

    /// Control with an auto mode that starts out enabled
    pub fn automatic(min: i32, max: i32, step: i32, default: i32) -> Self {
        Self {
            is_auto: true,
            has_auto: true,
            ..Self::manual(min, max, step, default)
        }
    }
}

/// Static characteristics of a synthetic camera
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub name: String,
    pub initial_resolution: Resolution,
    pub initial_fps: f64,
    /// Sizes the stream accepts directly
    pub stream_modes: Vec<Resolution>,
    /// Requests the driver silently rounds to a nearby size
    pub rounding: Vec<(Resolution, Resolution)>,
    pub frame_rates: Vec<f64>,
    /// Formats as declared on the control path, duplicates included
    pub formats: Vec<VideoFormat>,
    pub controls: Vec<(CameraProperty, SyntheticControl)>,
}

impl DeviceProfile {
    pub fn hd_webcam(name: &str) -> Self {
        Self {
            name: name.to_string(),
            initial_resolution: Resolution::new(640, 480),
            initial_fps: 30.0,
            stream_modes: vec![
                Resolution::new(320, 240),
                Resolution::new(640, 480),
                Resolution::new(800, 600),
                Resolution::new(1280, 720),
            ],
            rounding: Vec::new(),
            frame_rates: vec![15.0, 30.0],
            formats: vec![
                VideoFormat::new(1280, 720, 24),
                VideoFormat::new(640, 480, 16),
                VideoFormat::new(1920, 1080, 24),
                VideoFormat::new(640, 480, 24),
                VideoFormat::new(1920, 1080, 16),
                VideoFormat::new(1280, 720, 24),
            ],
            controls: vec![
                (CameraProperty::Exposure, SyntheticControl::automatic(-11, -2, 1, -6)),
                (CameraProperty::Focus, SyntheticControl::automatic(0, 250, 5, 0)),
                (CameraProperty::Zoom, SyntheticControl::manual(100, 500, 1, 100)),
                (CameraProperty::Pan, SyntheticControl::manual(-180, 180, 1, 0)),
                (CameraProperty::Tilt, SyntheticControl::manual(-180, 180, 1, 0)),
                (CameraProperty::Brightness, SyntheticControl::manual(-64, 64, 1, 0)),
                (CameraProperty::Contrast, SyntheticControl::manual(0, 95, 1, 32)),
                (CameraProperty::Saturation, SyntheticControl::manual(0, 100, 1, 55)),
                (CameraProperty::Sharpness, SyntheticControl::manual(0, 7, 1, 2)),
                (CameraProperty::Gamma, SyntheticControl::manual(100, 300, 1, 165)),
                (CameraProperty::WhiteBalance, SyntheticControl::automatic(2800, 6500, 10, 4600)),
                (CameraProperty::BacklightCompensation, SyntheticControl::manual(0, 2, 1, 1)),
                (CameraProperty::Gain, SyntheticControl::automatic(0, 100, 0, 0)),
            ],
        }
    }

    /// Bare camera with one stream mode, one format and no controls
    pub fn minimal(name: &str) -> Self {
        Self {
            name: name.to_string(),
            initial_resolution: Resolution::new(640, 480),
            initial_fps: 30.0,
            stream_modes: vec![Resolution::new(640, 480)],
            rounding: Vec::new(),
            frame_rates: vec![30.0],
            formats: vec![VideoFormat::new(640, 480, 16)],
            controls: Vec::new(),
        }
    }
}
