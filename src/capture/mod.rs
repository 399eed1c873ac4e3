//! Frame acquisition: stream lifecycle, frame size and rate, resolution probing.
//!
//! [`StreamCaptureEngine`] carries the policy (API fallback, idempotent writes,
//! verification tolerances, restore-after-probe). A [`StreamBackend`] opens
//! native [`VideoStream`]s; a stream releases its device when dropped.

pub mod nokhwa;

use crate::backend::{fps_matches, frame_size_matches, sort_by_area, CaptureEngine};
use crate::errors::CameraError;
use crate::types::{CameraFrame, Resolution};
use chrono::Utc;
use std::panic::{self, AssertUnwindSafe};

/// Most frames read and dropped per capture because they were queued before
/// the request. Matches the driver buffer ring nokhwa maps on Video4Linux.
pub const MAX_BACKLOG_FRAMES: usize = 4;

/// Frame sizes probed by [`CaptureEngine::enumerate_supported_resolutions`]
pub const CANDIDATE_RESOLUTIONS: [Resolution; 9] = [
    Resolution { width: 320, height: 240 },
    Resolution { width: 640, height: 480 },
    Resolution { width: 800, height: 600 },
    Resolution { width: 1024, height: 768 },
    Resolution { width: 1280, height: 720 },
    Resolution { width: 1280, height: 960 },
    Resolution { width: 1600, height: 1200 },
    Resolution { width: 1920, height: 1080 },
    Resolution { width: 1280, height: 1024 },
];

/// Which acquisition API a stream is opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiPreference {
    /// The platform's native API
    Primary,
    /// Whatever the capture library picks on its own
    Generic,
}

/// Opens acquisition streams by index
pub trait StreamBackend {
    type Stream: VideoStream;

    fn name(&self) -> &'static str;

    fn open(&self, index: u32, api: ApiPreference) -> Result<Self::Stream, CameraError>;
}

/// One open acquisition stream
pub trait VideoStream {
    /// Blocking read of the next queued frame, stamped with its capture time
    /// when the driver provides one
    fn read_frame(&mut self) -> Result<CameraFrame, CameraError>;

    fn resolution(&self) -> Result<Resolution, CameraError>;

    /// Re-query the driver for the active frame size. Streams that cache
    /// their negotiated format override this.
    fn refresh_resolution(&mut self) -> Result<Resolution, CameraError> {
        self.resolution()
    }

    fn set_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError>;

    fn frame_rate(&self) -> Result<f64, CameraError>;

    fn set_frame_rate(&mut self, fps: f64) -> Result<(), CameraError>;
}

/// Puts the stream back to its original frame size when dropped, unless disarmed.
///
/// Runs on normal return, early `?` return and unwinding alike.
pub struct ResolutionGuard<'a, V: VideoStream> {
    stream: &'a mut V,
    original: Resolution,
    armed: bool,
}

impl<'a, V: VideoStream> ResolutionGuard<'a, V> {
    pub fn new(stream: &'a mut V, original: Resolution) -> Self {
        Self {
            stream,
            original,
            armed: true,
        }
    }

    pub fn stream(&mut self) -> &mut V {
        self.stream
    }

    pub fn original(&self) -> Resolution {
        self.original
    }

    /// Keep whatever frame size is in effect
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl<V: VideoStream> Drop for ResolutionGuard<'_, V> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if matches!(self.stream.resolution(), Ok(current) if current == self.original) {
            return;
        }
        match self.stream.set_resolution(self.original) {
            Ok(()) => log::debug!("Restored frame size {}", self.original),
            Err(e) => log::warn!("Failed to restore frame size {}: {}", self.original, e),
        }
    }
}

/// Generic capture engine over any stream backend
pub struct StreamCaptureEngine<S: StreamBackend> {
    backend: S,
    stream: Option<S::Stream>,
    index: Option<u32>,
    device_name: String,
}

impl<S: StreamBackend> StreamCaptureEngine<S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            stream: None,
            index: None,
            device_name: String::new(),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    fn stream(&self) -> Result<&S::Stream, CameraError> {
        self.stream
            .as_ref()
            .ok_or_else(|| CameraError::NotConnected("capture engine".to_string()))
    }

    fn stream_mut(&mut self) -> Result<&mut S::Stream, CameraError> {
        self.stream
            .as_mut()
            .ok_or_else(|| CameraError::NotConnected("capture engine".to_string()))
    }

    fn open_with_fallback(&self, index: u32) -> Result<S::Stream, CameraError> {
        match self.backend.open(index, ApiPreference::Primary) {
            Ok(stream) => Ok(stream),
            Err(primary) => {
                log::debug!(
                    "Primary API could not open camera {}: {}; trying generic API",
                    index,
                    primary
                );
                self.backend.open(index, ApiPreference::Generic)
            }
        }
    }

    fn try_capture(&mut self) -> Result<CameraFrame, CameraError> {
        let requested_at = Utc::now();
        let stream = self.stream_mut()?;
        let mut frame = stream.read_frame()?;
        let mut dropped = 0;
        while frame.timestamp < requested_at && dropped < MAX_BACKLOG_FRAMES {
            dropped += 1;
            frame = stream.read_frame()?;
        }
        if dropped > 0 {
            log::trace!("Dropped {} frames queued before the capture request", dropped);
        }
        if frame.is_empty() {
            return Err(CameraError::CaptureError(format!(
                "empty {}x{} frame",
                frame.width, frame.height
            )));
        }
        Ok(frame)
    }

    fn try_set_frame_size(&mut self, requested: Resolution) -> Result<bool, CameraError> {
        let stream = self.stream_mut()?;
        let original = stream.resolution()?;
        if original == requested {
            log::debug!("Frame size already {}", requested);
            return Ok(true);
        }

        let mut guard = ResolutionGuard::new(stream, original);
        guard.stream().set_resolution(requested)?;
        let actual = guard.stream().resolution()?;
        if !frame_size_matches(actual, requested) {
            log::warn!("Requested frame size {} but stream reports {}", requested, actual);
            return Ok(false);
        }
        guard.disarm();
        Ok(true)
    }

    fn try_set_fps(&mut self, fps: f64) -> Result<bool, CameraError> {
        let stream = self.stream_mut()?;
        if fps_matches(stream.frame_rate()?, fps) {
            log::debug!("Frame rate already {:.1}", fps);
            return Ok(true);
        }
        stream.set_frame_rate(fps)?;
        let actual = stream.frame_rate()?;
        if !fps_matches(actual, fps) {
            log::warn!("Requested {:.1} fps but stream reports {:.1}", fps, actual);
            return Ok(false);
        }
        Ok(true)
    }

    fn try_probe(&mut self) -> Result<Vec<Resolution>, CameraError> {
        let stream = self.stream_mut()?;
        let original = stream.resolution()?;
        let mut guard = ResolutionGuard::new(stream, original);

        let mut supported = Vec::new();
        for candidate in CANDIDATE_RESOLUTIONS {
            if let Err(e) = guard.stream().set_resolution(candidate) {
                log::debug!("Candidate {} rejected: {}", candidate, e);
                continue;
            }
            match guard.stream().resolution() {
                Ok(actual) if actual == candidate => {
                    if !supported.contains(&candidate) {
                        supported.push(candidate);
                    }
                }
                Ok(actual) => log::debug!("Candidate {} came back as {}", candidate, actual),
                Err(e) => log::debug!("Candidate {} could not be read back: {}", candidate, e),
            }
        }
        drop(guard);

        sort_by_area(&mut supported);
        Ok(supported)
    }
}

impl<S: StreamBackend> CaptureEngine for StreamCaptureEngine<S> {
    fn engine_name(&self) -> &str {
        self.backend.name()
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn camera_index(&self) -> Option<u32> {
        self.index
    }

    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn initialize(&mut self, index: u32, device_name: &str) -> bool {
        self.release();
        match self.open_with_fallback(index) {
            Ok(stream) => {
                self.stream = Some(stream);
                self.index = Some(index);
                self.device_name = if device_name.is_empty() {
                    format!("Camera {}", index)
                } else {
                    device_name.to_string()
                };
                log::info!(
                    "{} opened camera {} ('{}')",
                    self.backend.name(),
                    index,
                    self.device_name
                );
                true
            }
            Err(e) => {
                e.report(&format!("Capture engine could not open camera {}", index));
                false
            }
        }
    }

    fn capture_frame(&mut self) -> Option<CameraFrame> {
        match self.try_capture() {
            Ok(frame) => Some(frame),
            Err(e) => {
                e.report("Frame capture failed");
                None
            }
        }
    }

    fn set_frame_size(&mut self, width: u32, height: u32) -> bool {
        let requested = Resolution::new(width, height);
        self.try_set_frame_size(requested).unwrap_or_else(|e| {
            e.report(&format!("Setting frame size {} failed", requested));
            false
        })
    }

    fn get_frame_size(&self) -> Resolution {
        self.stream()
            .and_then(|stream| stream.resolution())
            .unwrap_or_else(|e| {
                e.report("Reading frame size failed");
                Resolution::ZERO
            })
    }

    fn refresh_frame_size(&mut self) -> Resolution {
        self.stream_mut()
            .and_then(|stream| stream.refresh_resolution())
            .unwrap_or_else(|e| {
                e.report("Refreshing frame size failed");
                Resolution::ZERO
            })
    }

    fn set_fps(&mut self, fps: f64) -> bool {
        self.try_set_fps(fps).unwrap_or_else(|e| {
            e.report(&format!("Setting frame rate {:.1} failed", fps));
            false
        })
    }

    fn get_fps(&self) -> f64 {
        self.stream()
            .and_then(|stream| stream.frame_rate())
            .unwrap_or_else(|e| {
                e.report("Reading frame rate failed");
                0.0
            })
    }

    fn enumerate_supported_resolutions(&mut self) -> Vec<Resolution> {
        // The guard inside restores the original size while unwinding.
        match panic::catch_unwind(AssertUnwindSafe(|| self.try_probe())) {
            Ok(Ok(supported)) => supported,
            Ok(Err(e)) => {
                e.report("Resolution probing failed");
                Vec::new()
            }
            Err(_) => {
                log::warn!("Resolution probing panicked; original frame size restored");
                Vec::new()
            }
        }
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("Released capture stream for '{}'", self.device_name);
        }
        self.index = None;
        self.device_name.clear();
    }
}
