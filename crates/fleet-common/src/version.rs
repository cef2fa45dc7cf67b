//! ---
//! fleet_section: "01-core-functionality"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Build and version metadata."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use std::fmt;

/// Product name shared by every crate of the workspace.
pub const PRODUCT_NAME: &str = "fleet-telemetry";

/// Version details reported by `--version` and at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub name: String,
    pub semver: String,
    pub profile: String,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            name: PRODUCT_NAME.to_owned(),
            semver: env!("CARGO_PKG_VERSION").to_owned(),
            profile: if cfg!(debug_assertions) {
                "debug".to_owned()
            } else {
                "release".to_owned()
            },
        }
    }

    /// Multi-line description including the build profile.
    pub fn extended(&self) -> String {
        format!(
            "{} {}\nprofile: {}\narch: {}",
            self.name,
            self.semver,
            self.profile,
            std::env::consts::ARCH
        )
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.semver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_contains_semver() {
        let info = VersionInfo::current();
        assert!(info.extended().contains(&info.semver));
        assert_eq!(info.to_string(), format!("{} {}", info.name, info.semver));
    }
}
