//! ---
//! fleet_section: "11-simulation"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Per-vehicle physical and electrical state evolution."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use rand::rngs::StdRng;
use tracing::{debug, trace};

use crate::failure::{event_happens, FailureModes, FailureProfile};
use crate::random::{RngSource, UniformSource};
use crate::snapshot::{Corner, Snapshot, CURRENT_FIRMWARE, OUTDATED_FIRMWARE};

/// Soft upper speed limit, 140 km/h in m/s.
pub const MAX_SPEED: f64 = 38.889;
pub const COOLANT_INERTIA: f64 = 0.8;
pub const VEHICLE_INERTIA: f64 = 0.8;
pub const AIR_SPEED_MULTIPLIER: f64 = 4.0;
pub const VIBRATION_AMPLITUDE_MULTIPLIER: f64 = 100.0;
pub const DRIVE_SHAFT_VIBRATION_FACTOR: f64 = 1.5;
pub const DISCHARGED_BATTERY_VOLTAGE: f64 = 180.0;
pub const FULLY_CHARGED_BATTERY_VOLTAGE: f64 = 260.0;
pub const MIN_CURRENT_DRAW: f64 = 80.0;
pub const COOLANT_HEATING_NOMINAL: f64 = 0.5;
pub const COOLANT_HEATING_OVERHEATING: f64 = 2.5;
/// Floor of the coolant carry-over clamp; the ceiling is the intake air temperature.
pub const COOLANT_CARRY_FLOOR: f64 = 60.0;
pub const BATTERY_DRAIN_PER_SPEED: f64 = 0.001;
pub const COOLANT_SPEED_GAIN: f64 = 0.008;
pub const COOLANT_INTAKE_LOSS: f64 = 0.1;
pub const THROTTLE_JITTER: f64 = 0.5;

/// Values a step is computed from: either drawn on cold start or carried over
/// from the previous snapshot.
#[derive(Debug, Clone, Copy)]
struct StepInputs {
    speed: f64,
    throttle_pos: f64,
    intake_air_temp: f64,
    battery_percentage: f64,
    battery_voltage: f64,
    intake_air_flow_speed: f64,
    coolant_temp: f64,
}

/// Simulation state for one vehicle of the fleet.
///
/// The first call to [`advance`](Self::advance) draws randomized initial
/// conditions; every later call evolves the previous snapshot.
#[derive(Debug, Clone)]
pub struct VehicleSimulator<S = RngSource<StdRng>> {
    vehicle_id: u32,
    profile: FailureProfile,
    failures: FailureModes,
    previous: Option<Snapshot>,
    source: S,
}

impl VehicleSimulator {
    /// Simulator with the default failure profile, seeded from OS entropy.
    pub fn new(vehicle_id: u32) -> Self {
        Self::with_source(
            vehicle_id,
            FailureProfile::default(),
            RngSource::from_entropy(),
        )
    }

    /// Simulator producing a reproducible sequence for `seed`.
    pub fn seeded(vehicle_id: u32, profile: FailureProfile, seed: u64) -> Self {
        Self::with_source(vehicle_id, profile, RngSource::seeded(seed))
    }
}

impl<S: UniformSource> VehicleSimulator<S> {
    pub fn with_source(vehicle_id: u32, profile: FailureProfile, source: S) -> Self {
        Self {
            vehicle_id,
            profile,
            failures: FailureModes::default(),
            previous: None,
            source,
        }
    }

    pub fn vehicle_id(&self) -> u32 {
        self.vehicle_id
    }

    pub fn profile(&self) -> &FailureProfile {
        &self.profile
    }

    pub fn failures(&self) -> &FailureModes {
        &self.failures
    }

    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    /// Produces the next telemetry snapshot and stores it as the previous one.
    pub fn advance(&mut self) -> Snapshot {
        let inputs = match self.previous {
            None => self.cold_start(),
            Some(previous) => self.carry_over(&previous),
        };

        let activated = self.failures.update(&self.profile, &mut self.source);
        for mode in &activated {
            debug!(vehicle_id = self.vehicle_id, mode = ?mode, "failure mode latched");
        }
        let failures = self.failures;

        let current_draw = (inputs.throttle_pos
            * ((FULLY_CHARGED_BATTERY_VOLTAGE - inputs.battery_voltage).abs() + 4.0))
            .max(MIN_CURRENT_DRAW);

        let heating = if failures.coolant_overheating {
            COOLANT_HEATING_OVERHEATING
        } else {
            COOLANT_HEATING_NOMINAL
        };
        let coolant_temp = smooth(
            COOLANT_INERTIA,
            inputs.coolant_temp,
            inputs.coolant_temp + current_draw * heating,
        );

        let speed = smooth(
            VEHICLE_INERTIA,
            inputs.speed,
            inputs.throttle_pos * MAX_SPEED,
        );

        let mut engine_vibration_amplitude = speed * VIBRATION_AMPLITUDE_MULTIPLIER;
        if failures.drive_shaft_degradation {
            engine_vibration_amplitude *= DRIVE_SHAFT_VIBRATION_FACTOR;
        }

        let mut tire_pressures = [0u32; 4];
        for corner in Corner::ALL {
            tire_pressures[corner.index()] = if failures.tire_pressure_loss[corner.index()] {
                self.source.uniform_u32(20, 25)
            } else {
                self.source.uniform_u32(30, 35)
            };
        }

        let bump = event_happens(&mut self.source, self.profile.bump);
        let mut accelerometers = [0.0f64; 4];
        for corner in Corner::ALL {
            accelerometers[corner.index()] =
                self.shock_acceleration(failures.shock_failure[corner.index()], bump);
        }

        let firmware_version = if failures.outdated_firmware {
            OUTDATED_FIRMWARE
        } else {
            CURRENT_FIRMWARE
        };

        let snapshot = Snapshot {
            vehicle_id: self.vehicle_id,
            coolant_temp,
            intake_air_temp: inputs.intake_air_temp,
            intake_air_flow_speed: inputs.intake_air_flow_speed,
            battery_percentage: inputs.battery_percentage,
            battery_voltage: inputs.battery_voltage,
            current_draw,
            speed,
            engine_vibration_amplitude,
            throttle_pos: inputs.throttle_pos,
            tire_pressures,
            accelerometers,
            firmware_version,
            failure_occurred: failures.any(),
        };
        self.previous = Some(snapshot);
        snapshot
    }

    // The time series is assumed to start mid-trip.
    fn cold_start(&mut self) -> StepInputs {
        let speed = self.source.uniform_f64(0.0, 50.0);
        let throttle_pos = self.source.uniform_f64(0.0, 1.0);
        let intake_air_temp = self.source.uniform_f64(15.0, 40.0);
        let battery_percentage = self.source.uniform_f64(30.0, 100.0);
        let battery_voltage = DISCHARGED_BATTERY_VOLTAGE
            + battery_percentage / 100.0
                * (FULLY_CHARGED_BATTERY_VOLTAGE - DISCHARGED_BATTERY_VOLTAGE);
        let coolant_temp = self
            .source
            .uniform_f64(intake_air_temp, intake_air_temp + 20.0);
        trace!(vehicle_id = self.vehicle_id, speed, throttle_pos, "cold start");

        StepInputs {
            speed,
            throttle_pos,
            intake_air_temp,
            battery_percentage,
            battery_voltage,
            intake_air_flow_speed: speed * AIR_SPEED_MULTIPLIER,
            coolant_temp,
        }
    }

    fn carry_over(&mut self, previous: &Snapshot) -> StepInputs {
        let speed = previous.speed;
        let jitter = THROTTLE_JITTER - self.source.uniform_f64(0.0, 1.0);
        let throttle_pos = (previous.throttle_pos + jitter).clamp(0.0, 1.0);
        let intake_air_temp = previous.intake_air_temp;

        // Floor before ceiling: intake temperatures below the floor win.
        let coolant_temp = (previous.coolant_temp + speed * COOLANT_SPEED_GAIN
            - intake_air_temp * COOLANT_INTAKE_LOSS)
            .max(COOLANT_CARRY_FLOOR)
            .min(intake_air_temp);

        StepInputs {
            speed,
            throttle_pos,
            intake_air_temp,
            battery_percentage: previous.battery_percentage - speed * BATTERY_DRAIN_PER_SPEED,
            battery_voltage: previous.battery_voltage,
            intake_air_flow_speed: previous.intake_air_flow_speed,
            coolant_temp,
        }
    }

    fn shock_acceleration(&mut self, shock_failed: bool, bump: bool) -> f64 {
        match (bump, shock_failed) {
            (false, false) => self.source.uniform_f64(0.0, 1.0),
            (false, true) => self.source.uniform_f64(3.0, 4.0),
            (true, false) => self.source.uniform_f64(2.0, 3.0),
            (true, true) => self.source.uniform_f64(5.0, 7.0),
        }
    }
}

/// First-order lag: `inertia * previous + (1 - inertia) * target`.
fn smooth(inertia: f64, previous: f64, target: f64) -> f64 {
    inertia * previous + (1.0 - inertia) * target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::LowerBoundSource;

    #[test]
    fn first_snapshot_is_within_initial_ranges() {
        for seed in 0..200 {
            let mut sim = VehicleSimulator::seeded(1, FailureProfile::default(), seed);
            let snapshot = sim.advance();
            assert!((30.0..=100.0).contains(&snapshot.battery_percentage));
            assert!((0.0..=1.0).contains(&snapshot.throttle_pos));
            assert!((15.0..=40.0).contains(&snapshot.intake_air_temp));
            assert!((180.0..=260.0).contains(&snapshot.battery_voltage));
            // Speed is smoothed towards throttle * MAX_SPEED, both inside [0, 50].
            assert!((0.0..=50.0).contains(&snapshot.speed));
        }
    }

    #[test]
    fn previous_snapshot_is_replaced_on_every_call() {
        let mut sim = VehicleSimulator::seeded(4, FailureProfile::default(), 9);
        assert!(sim.previous().is_none());
        let first = sim.advance();
        assert_eq!(sim.previous(), Some(&first));
        let second = sim.advance();
        assert_eq!(sim.previous(), Some(&second));
        assert_eq!(second.intake_air_temp, first.intake_air_temp);
        assert_eq!(second.battery_voltage, first.battery_voltage);
        assert_eq!(second.intake_air_flow_speed, first.intake_air_flow_speed);
    }

    #[test]
    fn battery_drains_by_previous_speed() {
        let mut sim = VehicleSimulator::seeded(2, FailureProfile::never(), 77);
        let first = sim.advance();
        let second = sim.advance();
        let expected = first.battery_percentage - first.speed * BATTERY_DRAIN_PER_SPEED;
        assert!((second.battery_percentage - expected).abs() < 1e-12);
    }

    #[test]
    fn carried_coolant_collapses_to_intake_temperature() {
        let mut sim = VehicleSimulator::seeded(3, FailureProfile::never(), 1234);
        let first = sim.advance();
        let second = sim.advance();
        let expected = smooth(
            COOLANT_INERTIA,
            first.intake_air_temp,
            first.intake_air_temp + second.current_draw * COOLANT_HEATING_NOMINAL,
        );
        assert!((second.coolant_temp - expected).abs() < 1e-9);
    }

    #[test]
    fn healthy_vehicle_reports_current_firmware_and_nominal_readings() {
        let mut sim = VehicleSimulator::with_source(5, FailureProfile::never(), LowerBoundSource);
        let snapshot = sim.advance();
        assert!(!snapshot.failure_occurred);
        assert_eq!(snapshot.firmware_version, CURRENT_FIRMWARE);
        assert_eq!(snapshot.tire_pressures, [30; 4]);
        assert_eq!(snapshot.accelerometers, [0.0; 4]);
    }

    #[test]
    fn drive_shaft_degradation_scales_vibration() {
        let mut profile = FailureProfile::never();
        profile.drive_shaft_degradation = 100.0;
        let mut sim = VehicleSimulator::seeded(6, profile, 8);
        for _ in 0..20 {
            let snapshot = sim.advance();
            let expected = snapshot.speed
                * VIBRATION_AMPLITUDE_MULTIPLIER
                * DRIVE_SHAFT_VIBRATION_FACTOR;
            assert!((snapshot.engine_vibration_amplitude - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn accelerometer_ranges_follow_bump_and_shock_state() {
        let mut profile = FailureProfile::never();
        profile.bump = 100.0;
        let mut sim = VehicleSimulator::seeded(8, profile, 21);
        for _ in 0..50 {
            let snapshot = sim.advance();
            for value in snapshot.accelerometers {
                assert!((2.0..3.0).contains(&value));
            }
        }

        let mut profile = FailureProfile::never();
        profile.shock_failure = 100.0;
        let mut sim = VehicleSimulator::seeded(9, profile, 22);
        for _ in 0..50 {
            let snapshot = sim.advance();
            for value in snapshot.accelerometers {
                assert!((3.0..4.0).contains(&value));
            }
        }
    }

    #[test]
    fn current_draw_stays_on_its_floor() {
        for seed in 0..50 {
            let mut sim = VehicleSimulator::seeded(10, FailureProfile::default(), seed);
            for _ in 0..100 {
                assert_eq!(sim.advance().current_draw, MIN_CURRENT_DRAW);
            }
        }
    }

    #[test]
    fn minimum_jitter_draw_raises_throttle() {
        let mut sim = VehicleSimulator::with_source(12, FailureProfile::never(), LowerBoundSource);
        assert_eq!(sim.advance().throttle_pos, 0.0);
        assert_eq!(sim.advance().throttle_pos, THROTTLE_JITTER);
        assert_eq!(sim.advance().throttle_pos, 1.0);
    }

    #[test]
    fn simulator_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<VehicleSimulator>();
    }
}
