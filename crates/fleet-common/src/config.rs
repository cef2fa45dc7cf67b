//! ---
//! fleet_section: "01-core-functionality"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Application configuration for the fleet telemetry producer."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use fleet_msg::TransportConfig;
use fleet_sim::{FailureProfile, FleetSpec};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_vehicles() -> u32 {
    1
}

fn default_tick_interval() -> Duration {
    Duration::from_millis(1000)
}

fn default_run_duration() -> Option<Duration> {
    Some(Duration::from_secs(3600))
}

fn default_logging_directory() -> Option<PathBuf> {
    Some(PathBuf::from("target/logs"))
}

/// Primary configuration object for the telemetry producer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub fleet: FleetConfig,
    #[serde(default)]
    pub failure_profile: FailureProfile,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no configuration file was found and defaults are in use.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "FLEET_CONFIG";

    /// Load configuration from the first existing candidate, respecting the
    /// `FLEET_CONFIG` override. Falls back to defaults when nothing exists.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found; using defaults"
        );
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    /// Parse a configuration file. Validation is left to the caller so that
    /// command line overrides can complete the file first.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.fleet.validate()?;
        if let Some(field) = self.failure_profile.invalid_field() {
            return Err(anyhow!(
                "failure_profile.{} must be a finite, non-negative percentage",
                field
            ));
        }
        self.transport
            .validate()
            .context("invalid [transport] section")?;
        Ok(())
    }

    /// Parameters for building the simulated fleet.
    pub fn fleet_spec(&self) -> FleetSpec {
        FleetSpec {
            vehicles: self.fleet.vehicles,
            first_vehicle_id: self.fleet.first_vehicle_id,
            seed: self.fleet.seed,
            profile: self.failure_profile,
        }
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        toml::from_str(content).with_context(|| "failed to parse configuration")
    }
}

/// Size, seeding and pacing of the simulated fleet.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default = "default_vehicles")]
    pub vehicles: u32,
    #[serde(default)]
    pub first_vehicle_id: u32,
    /// Fleet seed for reproducible runs; OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_tick_interval", rename = "tick_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub tick_interval: Duration,
    /// Stop after this many ticks.
    #[serde(default)]
    pub iterations: Option<u64>,
    /// Stop once this much wall-clock time has elapsed.
    #[serde(default = "default_run_duration", rename = "duration_secs")]
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub run_duration: Option<Duration>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            vehicles: default_vehicles(),
            first_vehicle_id: 0,
            seed: None,
            tick_interval: default_tick_interval(),
            iterations: None,
            run_duration: default_run_duration(),
        }
    }
}

impl FleetConfig {
    pub fn validate(&self) -> Result<()> {
        if self.vehicles == 0 {
            return Err(anyhow!("fleet.vehicles must be greater than zero"));
        }
        if self.tick_interval.is_zero() {
            return Err(anyhow!("fleet.tick_interval_ms must be greater than zero"));
        }
        if self.iterations == Some(0) {
            return Err(anyhow!("fleet.iterations must be greater than zero"));
        }
        if self
            .first_vehicle_id
            .checked_add(self.vehicles - 1)
            .is_none()
        {
            return Err(anyhow!(
                "fleet of {} vehicles starting at id {} overflows the id range",
                self.vehicles,
                self.first_vehicle_id
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for rolling log files; file logging is disabled when absent.
    #[serde(default = "default_logging_directory")]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: LogFormat::default(),
            file_prefix: None,
        }
    }
}
