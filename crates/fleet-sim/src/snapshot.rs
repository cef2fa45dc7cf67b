//! ---
//! fleet_section: "11-simulation"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Telemetry snapshot produced by each simulation step."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

/// Control unit firmware reported while the outdated-firmware latch is clear.
pub const CURRENT_FIRMWARE: u32 = 2000;
/// Control unit firmware reported once the outdated-firmware latch is set.
pub const OUTDATED_FIRMWARE: u32 = 1000;

/// Wheel corner. Tires, shocks and accelerometers are indexed in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::FrontLeft,
        Corner::FrontRight,
        Corner::RearLeft,
        Corner::RearRight,
    ];

    pub fn index(self) -> usize {
        match self {
            Corner::FrontLeft => 0,
            Corner::FrontRight => 1,
            Corner::RearLeft => 2,
            Corner::RearRight => 3,
        }
    }

    /// Axle/side code used by downstream consumers (`11`, `12`, `21`, `22`).
    pub fn code(self) -> &'static str {
        match self {
            Corner::FrontLeft => "11",
            Corner::FrontRight => "12",
            Corner::RearLeft => "21",
            Corner::RearRight => "22",
        }
    }
}

/// Telemetry emitted by a vehicle for one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub vehicle_id: u32,
    /// °C
    pub coolant_temp: f64,
    /// °C
    pub intake_air_temp: f64,
    /// m/s
    pub intake_air_flow_speed: f64,
    pub battery_percentage: f64,
    /// V
    pub battery_voltage: f64,
    /// A
    pub current_draw: f64,
    /// m/s
    pub speed: f64,
    pub engine_vibration_amplitude: f64,
    /// 0.0 (released) to 1.0 (wide open).
    pub throttle_pos: f64,
    /// Indexed by [`Corner::index`].
    pub tire_pressures: [u32; 4],
    /// Indexed by [`Corner::index`].
    pub accelerometers: [f64; 4],
    pub firmware_version: u32,
    pub failure_occurred: bool,
}

impl Snapshot {
    pub fn tire_pressure(&self, corner: Corner) -> u32 {
        self.tire_pressures[corner.index()]
    }

    pub fn accelerometer(&self, corner: Corner) -> f64 {
        self.accelerometers[corner.index()]
    }
}
