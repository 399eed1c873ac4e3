//! Parameter controller behavior over synthetic control bindings: device
//! matching, property routing, and exact-match format commits.

use crabuvc::control::UvcParameterController;
use crabuvc::testing::{DeviceProfile, SyntheticControlBackend, SyntheticDevice};
use crabuvc::{CameraProperty, ParameterController, Resolution, VideoFormat};

fn controller_for(devices: &[SyntheticDevice]) -> UvcParameterController<SyntheticControlBackend> {
    UvcParameterController::new(SyntheticControlBackend::new(devices.to_vec()))
}

fn bound(device: &SyntheticDevice) -> UvcParameterController<SyntheticControlBackend> {
    let mut controller = controller_for(&[device.clone()]);
    assert!(controller.initialize(&device.name()));
    controller
}

#[cfg(test)]
mod parameter_controller_tests {
    use super::*;

    #[test]
    fn test_bind_by_exact_name() {
        let device = SyntheticDevice::new(3, "HD USB Camera");
        let mut controller = controller_for(&[device.clone()]);

        assert!(!controller.initialize("HD USB"));
        assert!(!controller.initialize("HD USB Camera (2)"));
        assert!(!controller.is_connected());
        assert!(controller.initialize("HD USB CAMERA"));
        assert!(controller.is_connected());
        assert_eq!(controller.device().map(|d| d.index), Some(3));
        assert_eq!(device.open_bindings(), 1);
    }

    #[test]
    fn test_failed_rebind_releases_previous_binding() {
        let device = SyntheticDevice::new(0, "HD USB Camera");
        let mut controller = bound(&device);

        assert!(!controller.initialize("Missing Camera"));
        assert!(!controller.is_connected());
        assert_eq!(device.open_bindings(), 0);
    }

    #[test]
    fn test_enumeration_failure_is_empty() {
        let mut controller = UvcParameterController::new(SyntheticControlBackend::failing());
        assert!(controller.enumerate_devices().is_empty());
        assert!(controller.enumerate_device_entries().is_empty());
        assert!(!controller.initialize("HD USB Camera"));
    }

    #[test]
    fn test_enumerate_devices_sorted_by_index() {
        let controller = controller_for(&[
            SyntheticDevice::new(2, "Document Camera"),
            SyntheticDevice::new(0, "HD USB Camera"),
        ]);
        assert_eq!(
            controller.enumerate_devices(),
            vec!["HD USB Camera".to_string(), "Document Camera".to_string()]
        );
    }

    #[test]
    fn test_duplicate_names_bind_first() {
        let first = SyntheticDevice::new(0, "USB Camera");
        let second = SyntheticDevice::new(1, "USB Camera");
        let mut controller = controller_for(&[first.clone(), second.clone()]);

        assert!(controller.initialize("USB Camera"));
        assert_eq!(first.open_bindings(), 1);
        assert_eq!(second.open_bindings(), 0);
    }

    #[test]
    fn test_duplicate_names_prefer_requested_index() {
        let first = SyntheticDevice::new(0, "USB Camera");
        let second = SyntheticDevice::new(1, "USB Camera");
        let mut controller = controller_for(&[first.clone(), second.clone()]);

        assert!(controller.initialize_at("usb camera", 1));
        assert_eq!(controller.device_index(), Some(1));
        assert_eq!(first.open_bindings(), 0);
        assert_eq!(second.open_bindings(), 1);

        assert!(controller.initialize_at("USB Camera", 7));
        assert_eq!(controller.device_index(), Some(0));
    }

    #[test]
    fn test_release_is_idempotent() {
        let device = SyntheticDevice::new(0, "HD USB Camera");
        let mut controller = bound(&device);
        controller.release();
        controller.release();
        assert!(!controller.is_connected());
        assert_eq!(device.open_bindings(), 0);
        assert!(controller.device().is_none());
    }

    #[test]
    fn test_every_supported_property_round_trips() {
        let device = SyntheticDevice::new(0, "HD USB Camera");
        let mut controller = bound(&device);

        for (property, _) in DeviceProfile::hd_webcam("x").controls {
            let range = controller.get_property_range(property);
            assert!(range.success, "{} range", property);
            assert!(controller.set_property(property, range.min, false), "{}", property);
            let state = controller.get_property(property);
            assert_eq!(state.property, property);
            assert_eq!((state.value, state.is_auto, state.success), (range.min, false, true));
        }
    }

    #[test]
    fn test_unsupported_properties_report_failure_shapes() {
        let device = SyntheticDevice::new(0, "HD USB Camera");
        let mut controller = bound(&device);

        for property in [
            CameraProperty::Roll,
            CameraProperty::Iris,
            CameraProperty::Hue,
            CameraProperty::ColorEnable,
        ] {
            assert!(!controller.set_property(property, 1, false));
            let state = controller.get_property(property);
            assert_eq!((state.value, state.is_auto, state.success), (0, false, false));
            let range = controller.get_property_range(property);
            assert_eq!(
                (range.min, range.max, range.step, range.default, range.success),
                (0, 0, 0, 0, false)
            );
        }
        assert!(controller.is_connected());
    }

    #[test]
    fn test_unbound_controller_fails_every_operation() {
        let mut controller = controller_for(&[SyntheticDevice::new(0, "HD USB Camera")]);

        assert!(!controller.set_property(CameraProperty::Brightness, 0, false));
        assert!(!controller.get_property(CameraProperty::Brightness).success);
        assert!(!controller.get_property_range(CameraProperty::Brightness).success);
        assert!(!controller.set_format(640, 480, 24));
        assert!(controller.enumerate_formats().is_empty());
    }

    #[test]
    fn test_auto_flag_routes_to_companion() {
        let device = SyntheticDevice::new(0, "HD USB Camera");
        let mut controller = bound(&device);

        assert!(controller.get_property(CameraProperty::Exposure).is_auto);
        assert!(controller.set_property(CameraProperty::Exposure, -5, false));
        let manual = controller.get_property(CameraProperty::Exposure);
        assert_eq!((manual.value, manual.is_auto), (-5, false));

        assert!(controller.set_property(CameraProperty::Gain, 0, true));
        assert!(controller.get_property(CameraProperty::Gain).is_auto);
    }

    #[test]
    fn test_enumerate_formats_deduplicated_and_sorted() {
        let device = SyntheticDevice::new(0, "HD USB Camera");
        let controller = bound(&device);

        assert_eq!(
            controller.enumerate_formats(),
            vec![
                VideoFormat::new(640, 480, 16),
                VideoFormat::new(640, 480, 24),
                VideoFormat::new(1280, 720, 24),
                VideoFormat::new(1920, 1080, 24),
                VideoFormat::new(1920, 1080, 16),
            ]
        );
    }

    #[test]
    fn test_set_format_requires_exact_match() {
        let device = SyntheticDevice::new(0, "HD USB Camera");
        let mut controller = bound(&device);

        assert!(!controller.set_format(1920, 1080, 32));
        assert!(!controller.set_format(1921, 1080, 24));
        assert_eq!(device.format_commits(), 0);

        assert!(controller.set_format(1920, 1080, 16));
        assert_eq!(device.resolution(), Resolution::new(1920, 1080));
        assert_eq!(device.format_commits(), 1);
    }

    #[test]
    fn test_rejected_commit_is_reported() {
        let device =
            SyntheticDevice::new(0, "HD USB Camera").configure(|s| s.format_commit_fails = true);
        let mut controller = bound(&device);
        assert!(!controller.set_format(640, 480, 24));
        assert_eq!(device.resolution(), Resolution::new(640, 480));
    }

    #[test]
    fn test_bind_refusal_is_reported() {
        let device =
            SyntheticDevice::new(0, "HD USB Camera").configure(|s| s.control_bind_fails = true);
        let mut controller = controller_for(&[device.clone()]);
        assert!(!controller.initialize("HD USB Camera"));
        assert_eq!(device.open_bindings(), 0);
    }
}
