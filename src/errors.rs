use thiserror::Error;

/// Internal failure of a native binding or a negotiation step.
///
/// Public controller operations never return this type; they log it and
/// collapse it into their boolean / empty / zero failure shape.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Camera initialization error: {0}")]
    InitializationError(String),
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    #[error("Camera control error: {0}")]
    ControlError(String),
    #[error("Unsupported property: {0}")]
    UnsupportedProperty(String),
    #[error("Video format error: {0}")]
    FormatError(String),
    #[error("Capture error: {0}")]
    CaptureError(String),
    #[error("Stream error: {0}")]
    StreamError(String),
    #[error("Not connected: {0}")]
    NotConnected(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CameraError {
    /// Log a failure at the boundary where it is collapsed into a failure shape.
    /// Calls on an unbound component are expected and only logged at debug level.
    pub(crate) fn report(&self, operation: &str) {
        match self {
            CameraError::NotConnected(_) => log::debug!("{}: {}", operation, self),
            _ => log::warn!("{}: {}", operation, self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CameraError::FormatError("no exact match for 800x600 @ 24bpp".to_string());
        assert_eq!(
            err.to_string(),
            "Video format error: no exact match for 800x600 @ 24bpp"
        );
        assert_eq!(
            CameraError::NotConnected("capture engine".to_string()).to_string(),
            "Not connected: capture engine"
        );
    }
}
