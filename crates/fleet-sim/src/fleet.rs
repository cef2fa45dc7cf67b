//! ---
//! fleet_section: "11-simulation"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Fleet container holding one simulator per vehicle."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use tracing::info;

use crate::failure::FailureProfile;
use crate::random::RngSource;
use crate::snapshot::Snapshot;
use crate::vehicle::VehicleSimulator;

/// Parameters for building a [`Fleet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FleetSpec {
    pub vehicles: u32,
    pub first_vehicle_id: u32,
    /// Fleet-wide seed. Vehicle `id` is seeded with `seed + id`; `None` seeds
    /// every vehicle from OS entropy.
    pub seed: Option<u64>,
    pub profile: FailureProfile,
}

impl Default for FleetSpec {
    fn default() -> Self {
        Self {
            vehicles: 1,
            first_vehicle_id: 0,
            seed: None,
            profile: FailureProfile::default(),
        }
    }
}

/// Independent simulators for a contiguous range of vehicle ids.
#[derive(Debug, Clone)]
pub struct Fleet {
    vehicles: Vec<VehicleSimulator>,
}

impl Fleet {
    pub fn new(spec: &FleetSpec) -> Self {
        let vehicles = (0..spec.vehicles)
            .map(|offset| {
                let vehicle_id = spec.first_vehicle_id.wrapping_add(offset);
                let source = match spec.seed {
                    Some(seed) => RngSource::seeded(seed.wrapping_add(u64::from(vehicle_id))),
                    None => RngSource::from_entropy(),
                };
                VehicleSimulator::with_source(vehicle_id, spec.profile, source)
            })
            .collect::<Vec<_>>();
        info!(
            vehicles = vehicles.len(),
            first_vehicle_id = spec.first_vehicle_id,
            seeded = spec.seed.is_some(),
            "fleet created"
        );
        Self { vehicles }
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn vehicles(&self) -> &[VehicleSimulator] {
        &self.vehicles
    }

    pub fn vehicles_mut(&mut self) -> &mut [VehicleSimulator] {
        &mut self.vehicles
    }

    /// Advances every vehicle once, returning snapshots in vehicle id order.
    pub fn advance_all(&mut self) -> Vec<Snapshot> {
        self.vehicles.iter_mut().map(VehicleSimulator::advance).collect()
    }
}
