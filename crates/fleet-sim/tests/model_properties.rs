//! ---
//! fleet_section: "11-simulation"
//! fleet_subsection: "tests"
//! fleet_type: "source"
//! fleet_scope: "test"
//! fleet_description: "Behavioural properties of the vehicle simulation core."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use fleet_sim::{
    Corner, FailureMode, FailureModes, FailureProfile, LowerBoundSource, Snapshot,
    VehicleSimulator, OUTDATED_FIRMWARE,
};

fn approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn first_advance_respects_initial_ranges() {
    for seed in 0..500 {
        let mut sim = VehicleSimulator::seeded(seed as u32, FailureProfile::default(), seed);
        let snapshot = sim.advance();
        assert!((30.0..=100.0).contains(&snapshot.battery_percentage));
        assert!((0.0..=1.0).contains(&snapshot.throttle_pos));
        assert!((0.0..=50.0).contains(&snapshot.speed));
    }
}

#[test]
fn failure_flag_never_resets() {
    for seed in 0..50 {
        let mut profile = FailureProfile::never();
        profile.tire_pressure_loss = 1.0;
        profile.coolant_overheating = 0.5;
        let mut sim = VehicleSimulator::seeded(1, profile, seed);
        let mut seen_failure = false;
        for _ in 0..500 {
            let snapshot = sim.advance();
            if seen_failure {
                assert!(snapshot.failure_occurred, "failure flag reset");
            }
            seen_failure |= snapshot.failure_occurred;
            assert_eq!(snapshot.failure_occurred, sim.failures().any());
        }
    }
}

#[test]
fn tire_pressure_ranges_follow_latch_state() {
    let mut sim = VehicleSimulator::seeded(2, FailureProfile::default(), 2024);
    for _ in 0..1_000 {
        let snapshot = sim.advance();
        for corner in Corner::ALL {
            let pressure = snapshot.tire_pressure(corner);
            if sim.failures().is_active(FailureMode::TirePressureLoss(corner)) {
                assert!((20..25).contains(&pressure), "deflated tire at {pressure}");
            } else {
                assert!((30..35).contains(&pressure), "healthy tire at {pressure}");
            }
        }
    }
}

#[test]
fn throttle_stays_clamped_over_long_runs() {
    for seed in 0..10 {
        let mut sim = VehicleSimulator::seeded(3, FailureProfile::default(), seed);
        for _ in 0..1_000 {
            let throttle = sim.advance().throttle_pos;
            assert!((0.0..=1.0).contains(&throttle), "throttle {throttle}");
        }
    }
}

#[test]
fn certain_failures_latch_after_one_call() {
    let mut sim = VehicleSimulator::seeded(4, FailureProfile::default(), 17);
    let snapshot = sim.advance();
    let failures = sim.failures();
    assert!(failures.shock_failure.iter().all(|flag| *flag));
    assert!(failures.drive_shaft_degradation);
    assert!(failures.outdated_firmware);
    assert!(snapshot.failure_occurred);
    assert_eq!(snapshot.firmware_version, OUTDATED_FIRMWARE);
}

#[test]
fn zero_probability_failures_stay_clear() {
    let mut sim = VehicleSimulator::seeded(5, FailureProfile::never(), 31337);
    for _ in 0..10_000 {
        assert!(!sim.advance().failure_occurred);
    }
    assert_eq!(sim.failures().active_count(), 0);
}

#[test]
fn lower_bound_source_produces_golden_snapshot() {
    let mut sim = VehicleSimulator::with_source(7, FailureProfile::default(), LowerBoundSource);
    let first = sim.advance();

    // Cold start draws: speed 0, throttle 0, intake 15 °C, battery 30 %,
    // coolant 15 °C. Every latch and the bump fire on a zero draw.
    let voltage: f64 = 180.0 + 30.0 / 100.0 * (260.0 - 180.0);
    let current = f64::max(0.0 * ((260.0 - voltage).abs() + 4.0), 80.0);
    let coolant = 0.8 * 15.0 + 0.2 * (15.0 + current * 2.5);

    assert_eq!(first.vehicle_id, 7);
    approx(first.speed, 0.0);
    approx(first.throttle_pos, 0.0);
    approx(first.intake_air_temp, 15.0);
    approx(first.intake_air_flow_speed, 0.0);
    approx(first.battery_percentage, 30.0);
    approx(first.battery_voltage, voltage);
    approx(first.current_draw, 80.0);
    approx(first.coolant_temp, coolant);
    approx(first.coolant_temp, 55.0);
    approx(first.engine_vibration_amplitude, 0.0);
    assert_eq!(first.tire_pressures, [20, 20, 20, 20]);
    assert_eq!(first.accelerometers, [5.0, 5.0, 5.0, 5.0]);
    assert_eq!(first.firmware_version, 1000);
    assert!(first.failure_occurred);
    assert_eq!(sim.failures().active_count(), 11);

    // Jitter of 0.5 - 0 lifts the throttle; coolant carries over as the
    // intake temperature and heats from there.
    let second = sim.advance();
    let speed = 0.2 * 0.5 * 38.889;
    approx(second.throttle_pos, 0.5);
    approx(second.speed, speed);
    approx(second.engine_vibration_amplitude, speed * 100.0 * 1.5);
    approx(second.battery_percentage, 30.0);
    approx(second.battery_voltage, voltage);
    approx(second.current_draw, 80.0);
    approx(second.coolant_temp, 0.8 * 15.0 + 0.2 * (15.0 + 80.0 * 2.5));
    approx(second.intake_air_flow_speed, 0.0);
    assert_eq!(second.tire_pressures, [20, 20, 20, 20]);
    assert_eq!(second.accelerometers, [5.0, 5.0, 5.0, 5.0]);
    assert_eq!(second.firmware_version, 1000);
    assert!(second.failure_occurred);
}

#[test]
fn snapshot_and_latches_survive_serde() {
    let mut sim = VehicleSimulator::seeded(11, FailureProfile::default(), 5);
    sim.advance();
    let snapshot = sim.advance();

    let value = serde_json::to_value(snapshot).expect("serialize snapshot");
    let decoded: Snapshot = serde_json::from_value(value).expect("deserialize snapshot");
    assert_eq!(decoded, snapshot);

    let latches = *sim.failures();
    let value = serde_json::to_value(latches).expect("serialize latches");
    let decoded: FailureModes = serde_json::from_value(value).expect("deserialize latches");
    assert_eq!(decoded, latches);
    assert_eq!(decoded.active_count(), latches.active_count());
}

#[test]
fn failure_profile_reads_partial_toml() {
    let profile: FailureProfile =
        toml::from_str("coolant_overheating = 0.0\nbump = 12.5").expect("profile");
    assert_eq!(profile.coolant_overheating, 0.0);
    assert_eq!(profile.bump, 12.5);
    assert_eq!(profile.outdated_firmware, FailureProfile::default().outdated_firmware);
    assert_eq!(profile.tire_pressure_loss, 50.0);
}
