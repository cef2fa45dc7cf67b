//! ---
//! fleet_section: "02-messaging-data-model"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Channel addressing for vehicle telemetry."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

fn default_prefix() -> String {
    "car".to_owned()
}

/// How vehicle messages are mapped onto channel (topic) names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "naming", rename_all = "snake_case")]
pub enum ChannelNaming {
    /// One channel per vehicle, named `{prefix}{vehicle_id}`.
    PerVehicle {
        /// Prefix placed before the vehicle id.
        #[serde(default = "default_prefix")]
        prefix: String,
    },
    /// All vehicles share a single channel.
    FleetWide {
        /// Shared channel name.
        name: String,
    },
}

impl Default for ChannelNaming {
    fn default() -> Self {
        ChannelNaming::PerVehicle {
            prefix: default_prefix(),
        }
    }
}

impl ChannelNaming {
    /// Channel a vehicle publishes to.
    pub fn channel_for(&self, vehicle_id: u32) -> String {
        match self {
            ChannelNaming::PerVehicle { prefix } => format!("{}{}", prefix, vehicle_id),
            ChannelNaming::FleetWide { name } => name.clone(),
        }
    }

    /// `true` when the naming would produce empty channel names.
    pub fn is_empty(&self) -> bool {
        match self {
            ChannelNaming::PerVehicle { .. } => false,
            ChannelNaming::FleetWide { name } => name.trim().is_empty(),
        }
    }
}
