//! ---
//! fleet_section: "02-messaging-data-model"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Telemetry wire records and the message envelope."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use fleet_sim::{Corner, Snapshot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Schema version broadcast alongside every message payload.
pub const SCHEMA_VERSION: u16 = 1;

/// Flat wire representation of a [`Snapshot`], keyed the way downstream
/// consumers expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    /// Vehicle identifier.
    pub id: u32,
    /// Coolant temperature in °C.
    pub coolant_temp: f64,
    /// Intake air temperature in °C.
    pub intake_air_temp: f64,
    /// Intake air flow speed in m/s.
    pub intake_air_flow_speed: f64,
    /// Battery state of charge in percent.
    pub battery_percentage: f64,
    /// Battery voltage in V.
    pub battery_voltage: f64,
    /// Current draw in A.
    pub current_draw: f64,
    /// Vehicle speed in m/s.
    pub speed: f64,
    /// Engine vibration amplitude.
    pub engine_vibration_amplitude: f64,
    /// Throttle position between 0 and 1.
    pub throttle_pos: f64,
    /// Front-left tire pressure.
    pub tire_pressure11: u32,
    /// Front-right tire pressure.
    pub tire_pressure12: u32,
    /// Rear-left tire pressure.
    pub tire_pressure21: u32,
    /// Rear-right tire pressure.
    pub tire_pressure22: u32,
    /// Front-left accelerometer reading.
    pub accelerometer11_value: f64,
    /// Front-right accelerometer reading.
    pub accelerometer12_value: f64,
    /// Rear-left accelerometer reading.
    pub accelerometer21_value: f64,
    /// Rear-right accelerometer reading.
    pub accelerometer22_value: f64,
    /// Control unit firmware version.
    pub control_unit_firmware: u32,
    /// Whether any failure mode was active when the snapshot was taken.
    pub failure_occurred: bool,
}

impl From<&Snapshot> for TelemetryRecord {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            id: snapshot.vehicle_id,
            coolant_temp: snapshot.coolant_temp,
            intake_air_temp: snapshot.intake_air_temp,
            intake_air_flow_speed: snapshot.intake_air_flow_speed,
            battery_percentage: snapshot.battery_percentage,
            battery_voltage: snapshot.battery_voltage,
            current_draw: snapshot.current_draw,
            speed: snapshot.speed,
            engine_vibration_amplitude: snapshot.engine_vibration_amplitude,
            throttle_pos: snapshot.throttle_pos,
            tire_pressure11: snapshot.tire_pressure(Corner::FrontLeft),
            tire_pressure12: snapshot.tire_pressure(Corner::FrontRight),
            tire_pressure21: snapshot.tire_pressure(Corner::RearLeft),
            tire_pressure22: snapshot.tire_pressure(Corner::RearRight),
            accelerometer11_value: snapshot.accelerometer(Corner::FrontLeft),
            accelerometer12_value: snapshot.accelerometer(Corner::FrontRight),
            accelerometer21_value: snapshot.accelerometer(Corner::RearLeft),
            accelerometer22_value: snapshot.accelerometer(Corner::RearRight),
            control_unit_firmware: snapshot.firmware_version,
            failure_occurred: snapshot.failure_occurred,
        }
    }
}

/// Message envelope handed to transports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for deduplication and tracing.
    pub id: Uuid,
    /// Version of the schema used by the record.
    pub schema_version: u16,
    /// Timestamp when the message was created.
    pub timestamp: DateTime<Utc>,
    /// Destination channel (topic) name.
    pub channel: String,
    /// Partitioning key; the vehicle id in decimal.
    pub key: String,
    /// Telemetry carried by the message.
    pub record: TelemetryRecord,
}

impl Message {
    /// Construct a new envelope around a record.
    pub fn new(channel: impl Into<String>, record: TelemetryRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            schema_version: SCHEMA_VERSION,
            timestamp: Utc::now(),
            channel: channel.into(),
            key: record.id.to_string(),
            record,
        }
    }
}
