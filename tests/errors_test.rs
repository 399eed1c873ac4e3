#[cfg(test)]
mod error_tests {
    use crabuvc::errors::CameraError;
    use std::error::Error;

    #[test]
    fn test_camera_error_initialization() {
        let error = CameraError::InitializationError("stream refused".to_string());
        assert!(error.to_string().contains("Camera initialization error"));
        assert!(error.to_string().contains("stream refused"));
    }

    #[test]
    fn test_camera_error_device_not_found() {
        let error = CameraError::DeviceNotFound("HD USB Camera".to_string());
        assert_eq!(error.to_string(), "Device not found: HD USB Camera");
    }

    #[test]
    fn test_camera_error_control_paths() {
        assert_eq!(
            CameraError::ControlError("Focus value 999 outside [0, 250]".to_string()).to_string(),
            "Camera control error: Focus value 999 outside [0, 250]"
        );
        assert_eq!(
            CameraError::UnsupportedProperty("Roll".to_string()).to_string(),
            "Unsupported property: Roll"
        );
        assert_eq!(
            CameraError::FormatError("no declared format matches 800x600 @ 24bpp".to_string())
                .to_string(),
            "Video format error: no declared format matches 800x600 @ 24bpp"
        );
    }

    #[test]
    fn test_camera_error_stream_paths() {
        assert_eq!(
            CameraError::CaptureError("empty 0x0 frame".to_string()).to_string(),
            "Capture error: empty 0x0 frame"
        );
        assert_eq!(
            CameraError::StreamError("frame size query failed".to_string()).to_string(),
            "Stream error: frame size query failed"
        );
        assert_eq!(
            CameraError::NotConnected("capture engine".to_string()).to_string(),
            "Not connected: capture engine"
        );
    }

    #[test]
    fn test_camera_error_config() {
        let error = CameraError::ConfigError("Probe limit must be at most 64".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: Probe limit must be at most 64"
        );
    }

    #[test]
    fn test_camera_error_debug_format() {
        let error = CameraError::InitializationError("Debug test".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("InitializationError"));
        assert!(debug_str.contains("Debug test"));
    }

    #[test]
    fn test_camera_error_is_std_error() {
        let error = CameraError::StreamError("source test".to_string());
        assert!(error.source().is_none());
        let boxed: Box<dyn Error + Send + Sync> = Box::new(error);
        assert!(boxed.to_string().starts_with("Stream error"));
    }

    #[test]
    fn test_unknown_property_name_is_unsupported() {
        let error = "Tint".parse::<crabuvc::CameraProperty>().unwrap_err();
        assert!(matches!(error, CameraError::UnsupportedProperty(ref name) if name == "Tint"));
    }
}
