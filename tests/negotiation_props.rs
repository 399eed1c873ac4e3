//! Property-based tests for frame size negotiation
//!
//! Verify the resolution union, the one-pixel tolerance, idempotent writes and
//! restoration after probing over generated inputs.
//!
//! Run with: cargo test --test negotiation_props

use crabuvc::backend::{frame_size_matches, fps_matches, union_resolutions};
use crabuvc::capture::{StreamCaptureEngine, CANDIDATE_RESOLUTIONS};
use crabuvc::testing::{SyntheticDevice, SyntheticStreamBackend};
use crabuvc::{CaptureEngine, Resolution};
use proptest::prelude::*;

fn resolution() -> impl Strategy<Value = Resolution> {
    (1u32..64, 1u32..64).prop_map(|(w, h)| Resolution::new(w * 40, h * 30))
}

fn candidate_subset() -> impl Strategy<Value = Vec<Resolution>> {
    proptest::sample::subsequence(CANDIDATE_RESOLUTIONS.to_vec(), 1..=CANDIDATE_RESOLUTIONS.len())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The union contains every input, once, ordered by area
    #[test]
    fn union_is_complete_unique_and_sorted(
        first in prop::collection::vec(resolution(), 0..12),
        second in prop::collection::vec(resolution(), 0..12),
    ) {
        let merged = union_resolutions(first.clone(), second.clone());

        for r in first.iter().chain(second.iter()) {
            prop_assert!(merged.contains(r));
        }
        for (i, r) in merged.iter().enumerate() {
            prop_assert!(!merged[i + 1..].contains(r));
        }
        for pair in merged.windows(2) {
            prop_assert!(pair[0].area() <= pair[1].area());
        }
    }

    /// One pixel of slack per dimension, never two
    #[test]
    fn frame_size_tolerance_is_one_pixel(
        base in resolution(),
        dw in -2i64..=2,
        dh in -2i64..=2,
    ) {
        let actual = Resolution::new(
            (base.width as i64 + dw) as u32,
            (base.height as i64 + dh) as u32,
        );
        let expected = dw.abs() <= 1 && dh.abs() <= 1;
        prop_assert_eq!(frame_size_matches(actual, base), expected);
        prop_assert_eq!(frame_size_matches(base, actual), expected);
    }

    /// Frame rates match strictly inside 0.1
    #[test]
    fn fps_tolerance_is_exclusive(
        requested in 1.0f64..120.0,
        (offset, expected) in prop::sample::select(vec![
            (0.0, true), (0.05, true), (0.09, true), (-0.09, true),
            (0.11, false), (-0.11, false), (0.5, false),
        ]),
    ) {
        prop_assert_eq!(fps_matches(requested + offset, requested), expected);
    }

    /// Requesting the current size never writes to the device
    #[test]
    fn current_size_is_idempotent(modes in candidate_subset(), pick in any::<prop::sample::Index>()) {
        let current = *pick.get(&modes);
        let device = SyntheticDevice::new(0, "HD USB Camera").configure(|s| {
            s.stream_modes = modes.clone();
            s.resolution = current;
        });
        let mut engine = StreamCaptureEngine::new(SyntheticStreamBackend::new(vec![device.clone()]));
        prop_assert!(engine.initialize(0, ""));

        prop_assert!(engine.set_frame_size(current.width, current.height));
        prop_assert_eq!(device.resolution_writes(), 0);
    }

    /// Probing finds exactly the accepted candidates and leaves the size alone
    #[test]
    fn probe_restores_size_and_finds_modes(modes in candidate_subset(), pick in any::<prop::sample::Index>()) {
        let current = *pick.get(&modes);
        let device = SyntheticDevice::new(0, "HD USB Camera").configure(|s| {
            s.stream_modes = modes.clone();
            s.resolution = current;
        });
        let mut engine = StreamCaptureEngine::new(SyntheticStreamBackend::new(vec![device.clone()]));
        prop_assert!(engine.initialize(0, ""));

        let supported = engine.enumerate_supported_resolutions();
        let mut expected = modes.clone();
        expected.sort_by_key(|r| r.area());
        prop_assert_eq!(supported, expected);
        prop_assert_eq!(device.resolution(), current);
    }
}
