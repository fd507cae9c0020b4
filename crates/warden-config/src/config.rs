use std::path::Path;

use serde::{Deserialize, Serialize};
use warden_audit::AuditConfig;
use warden_auth::AuthConfig;
use warden_restraint::RestraintConfig;
use warden_telemetry::TelemetryConfig;
use warden_threat::ThreatConfig;

use crate::error::{ConfigError, ConfigResult};

/// Complete Warden configuration. Every section is optional in TOML and
/// falls back to its defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub auth: AuthConfig,
    pub threat: ThreatConfig,
    pub telemetry: TelemetryConfig,
    pub restraint: RestraintConfig,
    pub audit: AuditConfig,
}

impl WardenConfig {
    /// Parse and validate.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let config: WardenConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let sections = [
            ("auth", self.auth.validate()),
            ("threat", self.threat.validate()),
            ("telemetry", self.telemetry.validate()),
            ("restraint", self.restraint.validate()),
        ];
        for (section, result) in sections {
            result.map_err(|reason| ConfigError::Invalid { section, reason })?;
        }
        if self.audit.capacity == 0 {
            return Err(ConfigError::Invalid {
                section: "audit",
                reason: "capacity must be at least 1".into(),
            });
        }
        Ok(())
    }
}
