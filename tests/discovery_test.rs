//! Camera discovery without a session: named listing, index probing and the
//! placeholder when nothing answers.

use crabuvc::config::DiscoveryConfig;
use crabuvc::testing::{SyntheticBackends, SyntheticDevice};
use crabuvc::unified::available_cameras;

#[cfg(test)]
mod discovery_tests {
    use super::*;

    #[test]
    fn test_named_devices_are_listed() {
        let selector = SyntheticBackends::new(vec![
            SyntheticDevice::new(0, "HD USB Camera"),
            SyntheticDevice::new(1, "Document Camera"),
        ]);
        assert_eq!(
            available_cameras(&selector, &DiscoveryConfig::default()),
            vec!["HD USB Camera".to_string(), "Document Camera".to_string()]
        );
    }

    #[test]
    fn test_probing_names_cameras_by_index() {
        let devices = vec![
            SyntheticDevice::new(0, "HD USB Camera"),
            SyntheticDevice::new(1, "Document Camera"),
        ];
        let selector = SyntheticBackends::without_control_listing(devices.clone());

        assert_eq!(
            available_cameras(&selector, &DiscoveryConfig::default()),
            vec!["Camera 0".to_string(), "Camera 1".to_string()]
        );
        assert!(devices.iter().all(|d| d.open_streams() == 0));
    }

    #[test]
    fn test_probing_stops_at_first_gap() {
        let selector = SyntheticBackends::without_control_listing(vec![
            SyntheticDevice::new(0, "HD USB Camera"),
            SyntheticDevice::new(2, "Document Camera"),
        ]);
        assert_eq!(
            available_cameras(&selector, &DiscoveryConfig::default()),
            vec!["Camera 0".to_string()]
        );
    }

    #[test]
    fn test_probe_limit_bounds_probing() {
        let devices: Vec<SyntheticDevice> = (0..5)
            .map(|i| SyntheticDevice::new(i, &format!("Camera Module {}", i)))
            .collect();
        let selector = SyntheticBackends::without_control_listing(devices);
        let discovery = DiscoveryConfig {
            probe_limit: 3,
            ..DiscoveryConfig::default()
        };
        assert_eq!(available_cameras(&selector, &discovery).len(), 3);
    }

    #[test]
    fn test_placeholder_when_nothing_found() {
        let selector = SyntheticBackends::without_control_listing(Vec::new());
        assert_eq!(
            available_cameras(&selector, &DiscoveryConfig::default()),
            vec!["Default Camera (0)".to_string()]
        );

        let discovery = DiscoveryConfig {
            placeholder_name: "No Camera".to_string(),
            ..DiscoveryConfig::default()
        };
        assert_eq!(
            available_cameras(&SyntheticBackends::new(Vec::new()), &discovery),
            vec!["No Camera".to_string()]
        );
    }

    #[test]
    fn test_unopenable_cameras_fall_back_to_placeholder() {
        let device = SyntheticDevice::new(0, "HD USB Camera").configure(|s| {
            s.primary_api_available = false;
            s.generic_api_available = false;
        });
        let selector = SyntheticBackends::without_control_listing(vec![device]);
        assert_eq!(
            available_cameras(&selector, &DiscoveryConfig::default()),
            vec!["Default Camera (0)".to_string()]
        );
    }
}
