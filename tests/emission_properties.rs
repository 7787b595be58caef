use particle_focus::backend::ParticleLog;
use particle_focus::config::{DeviceClass, EmissionConfig};
use particle_focus::emission::{spawn_count, EmissionScheduler};
use particle_focus::gesture::{classify, GestureRouter, TOGGLE_ZONE_SQ};
use particle_focus::ToolCommand;
use proptest::prelude::*;

fn factor() -> impl Strategy<Value = f32> {
    prop_oneof![Just(DeviceClass::Mobile.spawn_rate_factor()), Just(DeviceClass::Desktop.spawn_rate_factor())]
}

proptest! {
    #[test]
    fn spawn_count_is_floor_of_product(rate in 0.0f32..50_000.0, f in factor(), delta in 0.0f32..0.5) {
        let expected = (rate * f * delta).floor() as u32;
        prop_assert_eq!(spawn_count(rate, f, delta), expected);
    }

    #[test]
    fn spawn_count_is_monotonic(
        rate in 0.0f32..50_000.0,
        extra_rate in 0.0f32..1000.0,
        f in factor(),
        delta in 0.0f32..0.5,
        extra_delta in 0.0f32..0.1,
    ) {
        let base = spawn_count(rate, f, delta);
        prop_assert!(spawn_count(rate + extra_rate, f, delta) >= base);
        prop_assert!(spawn_count(rate, f, delta + extra_delta) >= base);
    }

    #[test]
    fn non_positive_delta_spawns_nothing(rate in 0.0f32..50_000.0, f in factor(), delta in -10.0f32..=0.0) {
        prop_assert_eq!(spawn_count(rate, f, delta), 0);
        let config = EmissionConfig { spawn_rate: rate, ..EmissionConfig::default() };
        let mut scheduler = EmissionScheduler::new(&config);
        let mut log = ParticleLog::new();
        prop_assert_eq!(scheduler.tick(delta, &mut log), 0);
        prop_assert!(log.spawned.is_empty());
    }

    #[test]
    fn centre_zone_always_toggles(x in -1.0f32..1.0, y in -1.0f32..1.0) {
        prop_assume!(x * x + y * y < TOGGLE_ZONE_SQ);
        prop_assert_eq!(classify(x, y), ToolCommand::ToggleView);
    }

    #[test]
    fn one_command_per_gesture(samples in proptest::collection::vec((-1.0f32..1.0, -1.0f32..1.0), 1..40)) {
        let mut router = GestureRouter::new();
        router.gesture_start();
        let issued = samples.iter().filter_map(|(x, y)| router.gesture_move(*x, *y)).count();
        prop_assert_eq!(issued, 1);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn scheduler_issues_full_formula_for_long_frames(
        rate in 1_000.0f32..15_000.0,
        delta in 1.0f32..20.0,
        mobile in any::<bool>(),
    ) {
        let device = if mobile { DeviceClass::Mobile } else { DeviceClass::Desktop };
        let config = EmissionConfig { spawn_rate: rate, device, ..EmissionConfig::default() };
        let mut scheduler = EmissionScheduler::new(&config);
        let mut log = ParticleLog::new();
        let expected = spawn_count(rate, device.spawn_rate_factor(), delta);
        prop_assert_eq!(scheduler.tick(delta, &mut log), expected);
        prop_assert_eq!(log.spawned.len(), expected as usize);
    }
}
