//! ---
//! fleet_section: "11-simulation"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Persistent stochastic failure latches for a simulated vehicle."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::random::UniformSource;
use crate::snapshot::Corner;

fn default_tire_pressure_loss() -> f64 {
    50.0
}

fn default_shock_failure() -> f64 {
    100.0
}

fn default_drive_shaft_degradation() -> f64 {
    100.0
}

fn default_coolant_overheating() -> f64 {
    20.0
}

// Values above 100 always fire.
fn default_outdated_firmware() -> f64 {
    400.0
}

fn default_bump() -> f64 {
    5.0
}

/// Per-call activation probabilities, in percent.
///
/// Each probability is compared against a uniform draw in `[0, 100)`, so `0`
/// never fires and anything at or above `100` always fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FailureProfile {
    #[serde(default = "default_tire_pressure_loss")]
    pub tire_pressure_loss: f64,
    #[serde(default = "default_shock_failure")]
    pub shock_failure: f64,
    #[serde(default = "default_drive_shaft_degradation")]
    pub drive_shaft_degradation: f64,
    #[serde(default = "default_coolant_overheating")]
    pub coolant_overheating: f64,
    #[serde(default = "default_outdated_firmware")]
    pub outdated_firmware: f64,
    /// Chance of hitting a road bump on a given step. Not a latch.
    #[serde(default = "default_bump")]
    pub bump: f64,
}

impl Default for FailureProfile {
    fn default() -> Self {
        Self {
            tire_pressure_loss: default_tire_pressure_loss(),
            shock_failure: default_shock_failure(),
            drive_shaft_degradation: default_drive_shaft_degradation(),
            coolant_overheating: default_coolant_overheating(),
            outdated_firmware: default_outdated_firmware(),
            bump: default_bump(),
        }
    }
}

impl FailureProfile {
    /// Profile under which no latch ever activates and no bump ever occurs.
    pub fn never() -> Self {
        Self {
            tire_pressure_loss: 0.0,
            shock_failure: 0.0,
            drive_shaft_degradation: 0.0,
            coolant_overheating: 0.0,
            outdated_firmware: 0.0,
            bump: 0.0,
        }
    }

    /// Name of the first probability that is negative or not finite.
    pub fn invalid_field(&self) -> Option<&'static str> {
        [
            ("tire_pressure_loss", self.tire_pressure_loss),
            ("shock_failure", self.shock_failure),
            ("drive_shaft_degradation", self.drive_shaft_degradation),
            ("coolant_overheating", self.coolant_overheating),
            ("outdated_firmware", self.outdated_firmware),
            ("bump", self.bump),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite() || *value < 0.0)
        .map(|(name, _)| name)
    }
}

/// Returns `true` when an event with the given percentage fires on this draw.
pub(crate) fn event_happens<S: UniformSource>(source: &mut S, percentage: f64) -> bool {
    percentage > source.uniform_f64(0.0, 100.0)
}

/// Identifies one of the eleven failure latches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", content = "corner", rename_all = "snake_case")]
pub enum FailureMode {
    TirePressureLoss(Corner),
    ShockFailure(Corner),
    DriveShaftDegradation,
    CoolantOverheating,
    OutdatedFirmware,
}

/// Latched failure state of a single vehicle.
///
/// A latch that has been set is never cleared for the lifetime of the owning
/// simulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureModes {
    pub tire_pressure_loss: [bool; 4],
    pub shock_failure: [bool; 4],
    pub drive_shaft_degradation: bool,
    pub coolant_overheating: bool,
    pub outdated_firmware: bool,
}

impl FailureModes {
    /// Draws every clear latch against its probability and returns the modes
    /// that became active on this call. Latches that are already set are not
    /// drawn again.
    pub fn update<S: UniformSource>(
        &mut self,
        profile: &FailureProfile,
        source: &mut S,
    ) -> Vec<FailureMode> {
        let mut activated = Vec::new();

        for corner in Corner::ALL {
            if latch(
                &mut self.tire_pressure_loss[corner.index()],
                profile.tire_pressure_loss,
                source,
            ) {
                activated.push(FailureMode::TirePressureLoss(corner));
            }
        }
        for corner in Corner::ALL {
            if latch(
                &mut self.shock_failure[corner.index()],
                profile.shock_failure,
                source,
            ) {
                activated.push(FailureMode::ShockFailure(corner));
            }
        }
        if latch(
            &mut self.drive_shaft_degradation,
            profile.drive_shaft_degradation,
            source,
        ) {
            activated.push(FailureMode::DriveShaftDegradation);
        }
        if latch(
            &mut self.coolant_overheating,
            profile.coolant_overheating,
            source,
        ) {
            activated.push(FailureMode::CoolantOverheating);
        }
        if latch(&mut self.outdated_firmware, profile.outdated_firmware, source) {
            activated.push(FailureMode::OutdatedFirmware);
        }

        activated
    }

    pub fn is_active(&self, mode: FailureMode) -> bool {
        match mode {
            FailureMode::TirePressureLoss(corner) => self.tire_pressure_loss[corner.index()],
            FailureMode::ShockFailure(corner) => self.shock_failure[corner.index()],
            FailureMode::DriveShaftDegradation => self.drive_shaft_degradation,
            FailureMode::CoolantOverheating => self.coolant_overheating,
            FailureMode::OutdatedFirmware => self.outdated_firmware,
        }
    }

    /// Logical OR of all eleven latches.
    pub fn any(&self) -> bool {
        self.tire_pressure_loss.iter().any(|flag| *flag)
            || self.shock_failure.iter().any(|flag| *flag)
            || self.drive_shaft_degradation
            || self.coolant_overheating
            || self.outdated_firmware
    }

    pub fn active_count(&self) -> usize {
        self.tire_pressure_loss.iter().filter(|flag| **flag).count()
            + self.shock_failure.iter().filter(|flag| **flag).count()
            + usize::from(self.drive_shaft_degradation)
            + usize::from(self.coolant_overheating)
            + usize::from(self.outdated_firmware)
    }
}

// Returns true only on the clear -> set transition.
fn latch<S: UniformSource>(flag: &mut bool, percentage: f64, source: &mut S) -> bool {
    if *flag {
        return false;
    }
    *flag = event_happens(source, percentage);
    *flag
}
