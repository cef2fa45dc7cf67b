//! ---
//! fleet_section: "11-simulation"
//! fleet_subsection: "01-bootstrap"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Simulation core module exports and shared types."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
//! Vehicle simulation core for the EV fleet telemetry generator.
//!
//! Each [`VehicleSimulator`] owns the private state of one vehicle and produces
//! a [`Snapshot`] per call to [`VehicleSimulator::advance`]. Nothing in this
//! crate performs I/O or reads process configuration; serialization and
//! transport live in `fleet-msg`.

pub mod failure;
pub mod fleet;
pub mod random;
pub mod snapshot;
pub mod vehicle;

pub use failure::{FailureMode, FailureModes, FailureProfile};
pub use fleet::{Fleet, FleetSpec};
pub use random::{LowerBoundSource, RngSource, UniformSource};
pub use snapshot::{Corner, Snapshot, CURRENT_FIRMWARE, OUTDATED_FIRMWARE};
pub use vehicle::VehicleSimulator;
