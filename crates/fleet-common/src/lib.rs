//! ---
//! fleet_section: "01-core-functionality"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Shared primitives for the fleet telemetry producer."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
//! Configuration loading, tracing setup and version metadata shared by the
//! fleet telemetry binaries.

pub mod config;
pub mod logging;
pub mod version;

pub use config::{AppConfig, FleetConfig, LoadedAppConfig, LoggingConfig};
pub use logging::{init_tracing, LogFormat};
pub use version::VersionInfo;
