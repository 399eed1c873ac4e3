//! Tests for crabuvc core types
//!
//! Property grouping, failure shapes, format equality and frame conversion.

use crabuvc::types::{
    CameraControlKey, CameraFrame, CameraProperty, DeviceEntry, Platform, ProcAmpKey,
    PropertyBinding, PropertyGroup, PropertyRange, PropertyState, Resolution, SessionState,
    VideoFormat,
};

#[cfg(test)]
mod platform_tests {
    use super::*;

    #[test]
    fn test_platform_current_detection() {
        assert_ne!(Platform::current(), Platform::Unknown, "Platform should be detected");
    }

    #[test]
    fn test_platform_as_str() {
        assert_eq!(Platform::Windows.as_str(), "windows");
        assert_eq!(Platform::MacOS.as_str(), "macos");
        assert_eq!(Platform::Linux.as_str(), "linux");
        assert_eq!(Platform::Unknown.as_str(), "unknown");
    }

    #[test]
    fn test_platform_serialization() {
        let json = serde_json::to_string(&Platform::Linux).unwrap();
        assert!(json.contains("Linux"));
        let back: Platform = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Platform::Linux);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;

    #[test]
    fn test_every_property_has_one_binding() {
        let mut acquisition = 0;
        let mut processing = 0;
        for property in CameraProperty::ALL {
            match property.binding() {
                PropertyBinding::CameraControl(key) => {
                    acquisition += 1;
                    assert_eq!(CameraProperty::from(key), property);
                }
                PropertyBinding::ProcAmp(key) => {
                    processing += 1;
                    assert_eq!(CameraProperty::from(key), property);
                }
            }
        }
        assert_eq!((acquisition, processing), (7, 10));
    }

    #[test]
    fn test_groups() {
        assert_eq!(CameraProperty::Exposure.group(), PropertyGroup::AcquisitionControl);
        assert_eq!(CameraProperty::Roll.group(), PropertyGroup::AcquisitionControl);
        assert_eq!(CameraProperty::Gain.group(), PropertyGroup::ImageProcessing);
        assert_eq!(
            CameraProperty::from(CameraControlKey::Iris).group(),
            PropertyGroup::AcquisitionControl
        );
        assert_eq!(
            CameraProperty::from(ProcAmpKey::ColorEnable).group(),
            PropertyGroup::ImageProcessing
        );
    }

    #[test]
    fn test_property_names_parse_case_insensitively() {
        for property in CameraProperty::ALL {
            let upper = property.as_str().to_uppercase();
            assert_eq!(upper.parse::<CameraProperty>().unwrap(), property);
            assert_eq!(property.to_string(), property.as_str());
        }
        assert!("Brightnes".parse::<CameraProperty>().is_err());
    }

    #[test]
    fn test_failed_shapes_are_zeroed() {
        let state = PropertyState::failed(CameraProperty::Hue);
        assert_eq!((state.value, state.is_auto, state.success), (0, false, false));

        let range = PropertyRange::failed(CameraProperty::Hue);
        assert_eq!(
            (range.min, range.max, range.step, range.default, range.success),
            (0, 0, 0, 0, false)
        );
        assert!(!range.contains(0));
    }

    #[test]
    fn test_range_clamp_and_continuity() {
        let range = PropertyRange::new(CameraProperty::Gain, 0, 100, 0, 50);
        assert!(range.is_continuous());
        assert_eq!(range.clamp(150), 100);
        assert_eq!(range.clamp(-5), 0);
        assert_eq!(range.clamp(42), 42);
        assert!(range.contains(100));

        let stepped = PropertyRange::new(CameraProperty::Focus, 0, 250, 5, 0);
        assert!(!stepped.is_continuous());
        assert_eq!(PropertyRange::failed(CameraProperty::Focus).clamp(999), 999);
    }
}

#[cfg(test)]
mod format_tests {
    use super::*;

    #[test]
    fn test_video_format_equality_needs_all_fields() {
        let base = VideoFormat::new(1280, 720, 24);
        assert_eq!(base, VideoFormat::new(1280, 720, 24));
        assert_ne!(base, VideoFormat::new(1280, 720, 16));
        assert_ne!(base, VideoFormat::new(1280, 721, 24));
        assert_eq!(base.resolution(), Resolution::new(1280, 720));
        assert_eq!(base.to_string(), "1280x720 @ 24bpp");
    }

    #[test]
    fn test_resolution_helpers() {
        let r = Resolution::from((1920, 1080));
        assert_eq!(r.area(), 2_073_600);
        assert_eq!(r.to_string(), "1920x1080");
        assert!(Resolution::ZERO.is_zero());
        assert!(Resolution::new(640, 0).is_zero());
        let pair: (u32, u32) = r.into();
        assert_eq!(pair, (1920, 1080));
    }

    #[test]
    fn test_device_entry_and_session_state() {
        let entry = DeviceEntry::new(2, "HD USB Camera");
        assert_eq!(entry.index, 2);
        assert_eq!(entry.name, "HD USB Camera");
        assert_ne!(SessionState::Ready, SessionState::Closed);
    }
}

#[cfg(test)]
mod camera_frame_tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = CameraFrame::new(vec![128; 4 * 2 * 3], 4, 2, 3, "cam0".to_string());
        assert_eq!(frame.resolution(), Resolution::new(4, 2));
        assert_eq!(frame.size_bytes(), 24);
        assert_eq!(frame.format, "RGB8");
        assert!(!frame.id.is_empty());
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_frame_ids_are_unique() {
        let a = CameraFrame::new(vec![0; 3], 1, 1, 3, "cam0".to_string());
        let b = CameraFrame::new(vec![0; 3], 1, 1, 3, "cam0".to_string());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_frame_to_image() {
        let rgb = CameraFrame::new(vec![10; 4 * 2 * 3], 4, 2, 3, "cam0".to_string());
        let image = rgb.to_image().expect("rgb image");
        assert_eq!((image.width(), image.height()), (4, 2));

        let gray = CameraFrame::new(vec![10; 8], 4, 2, 1, "cam0".to_string());
        assert!(gray.to_image().is_some());

        let short = CameraFrame::new(vec![10; 5], 4, 2, 3, "cam0".to_string());
        assert!(short.to_image().is_none());

        let odd = CameraFrame::new(vec![10; 16], 4, 2, 2, "cam0".to_string());
        assert!(odd.to_image().is_none());
    }

    #[test]
    fn test_empty_frame() {
        let frame = CameraFrame::new(Vec::new(), 0, 0, 3, "cam0".to_string());
        assert!(frame.is_empty());
        assert!(frame.to_image().is_none());
    }
}
