//! Acquisition streams backed by nokhwa.
//!
//! The primary API is the platform's native one (Video4Linux, MediaFoundation,
//! AVFoundation); the generic API lets nokhwa choose.

use super::{ApiPreference, StreamBackend, VideoStream};
use crate::errors::CameraError;
use crate::types::{CameraFrame, DeviceEntry, Resolution};
use chrono::{DateTime, Utc};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use std::time::{Duration, UNIX_EPOCH};

/// Wall-clock capture time of a buffer, when the driver stamps one
fn capture_time(since_epoch: Option<Duration>) -> Option<DateTime<Utc>> {
    since_epoch.map(|elapsed| DateTime::<Utc>::from(UNIX_EPOCH + elapsed))
}

/// Native acquisition API for the build target
pub fn native_api() -> ApiBackend {
    if cfg!(target_os = "linux") {
        ApiBackend::Video4Linux
    } else if cfg!(target_os = "windows") {
        ApiBackend::MediaFoundation
    } else if cfg!(target_os = "macos") {
        ApiBackend::AVFoundation
    } else {
        ApiBackend::Auto
    }
}

/// Cameras visible to `api`, ordered by index
pub fn query_devices(api: ApiBackend) -> Result<Vec<DeviceEntry>, CameraError> {
    let cameras = nokhwa::query(api)
        .map_err(|e| CameraError::InitializationError(format!("Failed to query cameras: {}", e)))?;

    let mut entries = Vec::new();
    for info in cameras {
        match info.index().as_index() {
            Ok(index) => entries.push(DeviceEntry::new(index, info.human_name())),
            Err(_) => log::debug!("Skipping camera without numeric index: {}", info.human_name()),
        }
    }
    entries.sort_by_key(|entry| entry.index);
    Ok(entries)
}

/// Opens nokhwa cameras as [`NokhwaStream`]s
#[derive(Debug, Clone, Copy)]
pub struct NokhwaStreamBackend {
    primary: ApiBackend,
}

impl NokhwaStreamBackend {
    pub fn new() -> Self {
        Self {
            primary: native_api(),
        }
    }

    pub fn with_primary(primary: ApiBackend) -> Self {
        Self { primary }
    }

    fn api_for(&self, preference: ApiPreference) -> ApiBackend {
        match preference {
            ApiPreference::Primary => self.primary,
            ApiPreference::Generic => ApiBackend::Auto,
        }
    }
}

impl Default for NokhwaStreamBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamBackend for NokhwaStreamBackend {
    type Stream = NokhwaStream;

    fn name(&self) -> &'static str {
        "Nokhwa"
    }

    fn open(&self, index: u32, api: ApiPreference) -> Result<NokhwaStream, CameraError> {
        let backend = self.api_for(api);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
        let mut camera = Camera::with_backend(CameraIndex::Index(index), requested, backend)
            .map_err(|e| {
                CameraError::InitializationError(format!(
                    "Failed to open camera {} with {:?}: {}",
                    index, backend, e
                ))
            })?;

        camera.open_stream().map_err(|e| {
            CameraError::InitializationError(format!("Failed to start stream: {}", e))
        })?;

        log::debug!("Opened camera {} with {:?}", index, backend);
        Ok(NokhwaStream { camera, index })
    }
}

/// Open nokhwa camera with a running stream
pub struct NokhwaStream {
    camera: Camera,
    index: u32,
}

impl NokhwaStream {
    /// Run `change` with the stream stopped, restarting it afterwards if it was running.
    /// Most drivers refuse format changes while buffers are queued.
    fn with_stream_stopped<T>(
        &mut self,
        change: impl FnOnce(&mut Camera) -> Result<T, CameraError>,
    ) -> Result<T, CameraError> {
        let was_open = self.camera.is_stream_open();
        if was_open {
            self.camera
                .stop_stream()
                .map_err(|e| CameraError::StreamError(format!("Failed to stop stream: {}", e)))?;
        }
        let result = change(&mut self.camera);
        if was_open {
            self.camera
                .open_stream()
                .map_err(|e| CameraError::StreamError(format!("Failed to restart stream: {}", e)))?;
        }
        result
    }
}

impl VideoStream for NokhwaStream {
    fn read_frame(&mut self) -> Result<CameraFrame, CameraError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CameraError::CaptureError(format!("Failed to capture frame: {}", e)))?;

        let resolution = buffer.resolution();
        let source_format = buffer.source_frame_format();
        let captured = capture_time(buffer.capture_timestamp());
        let rgb = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::CaptureError(format!("Failed to decode {} frame: {}", source_format, e)))?;

        log::trace!(
            "Decoded {} frame {}x{}",
            source_format,
            resolution.width_x,
            resolution.height_y
        );

        let frame = CameraFrame::new(
            rgb.into_raw(),
            resolution.width_x,
            resolution.height_y,
            3,
            self.index.to_string(),
        );
        Ok(match captured {
            Some(timestamp) => frame.with_timestamp(timestamp),
            None => frame,
        })
    }

    fn resolution(&self) -> Result<Resolution, CameraError> {
        let resolution = self.camera.resolution();
        Ok(Resolution::new(resolution.width_x, resolution.height_y))
    }

    fn refresh_resolution(&mut self) -> Result<Resolution, CameraError> {
        // Restarting the stream remaps buffers at the refreshed size
        let format = self.with_stream_stopped(|camera| {
            camera
                .refresh_camera_format()
                .map_err(|e| CameraError::StreamError(format!("Failed to query frame size: {}", e)))
        })?;
        Ok(Resolution::new(format.resolution().width_x, format.resolution().height_y))
    }

    fn set_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError> {
        self.with_stream_stopped(|camera| {
            camera
                .set_resolution(nokhwa::utils::Resolution::new(resolution.width, resolution.height))
                .map_err(|e| {
                    CameraError::StreamError(format!("Failed to set frame size {}: {}", resolution, e))
                })
        })
    }

    fn frame_rate(&self) -> Result<f64, CameraError> {
        Ok(f64::from(self.camera.frame_rate()))
    }

    fn set_frame_rate(&mut self, fps: f64) -> Result<(), CameraError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(CameraError::StreamError(format!("invalid frame rate {}", fps)));
        }
        let rate = fps.round() as u32;
        self.with_stream_stopped(|camera| {
            camera
                .set_frame_rate(rate)
                .map_err(|e| CameraError::StreamError(format!("Failed to set frame rate {}: {}", rate, e)))
        })
    }
}

impl Drop for NokhwaStream {
    fn drop(&mut self) {
        if self.camera.is_stream_open() {
            let _ = self.camera.stop_stream();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_preference_uses_auto() {
        let backend = NokhwaStreamBackend::with_primary(ApiBackend::Video4Linux);
        assert_eq!(backend.api_for(ApiPreference::Primary), ApiBackend::Video4Linux);
        assert_eq!(backend.api_for(ApiPreference::Generic), ApiBackend::Auto);
    }

    #[test]
    fn test_capture_time_from_driver_stamp() {
        assert_eq!(capture_time(None), None);
        let stamped = capture_time(Some(Duration::from_secs(1_700_000_000)));
        assert_eq!(stamped.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn test_open_missing_camera_fails() {
        let backend = NokhwaStreamBackend::new();
        assert!(backend.open(250, ApiPreference::Primary).is_err());
    }
}
