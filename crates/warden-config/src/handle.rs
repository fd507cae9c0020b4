use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use warden_audit::AuditConfig;
use warden_auth::AuthConfig;
use warden_restraint::RestraintConfig;
use warden_telemetry::TelemetryConfig;
use warden_threat::ThreatConfig;
use warden_types::ConfigCell;

use crate::config::WardenConfig;
use crate::error::{ConfigError, ConfigResult};

/// Versions of every component snapshot after a reload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReloadReport {
    pub auth_version: u64,
    pub threat_version: u64,
    pub telemetry_version: u64,
    pub restraint_version: u64,
    /// Number of sections whose snapshot was swapped
    pub changed_sections: usize,
    /// The audit section changed; it only applies when logs are reopened
    pub audit_restart_required: bool,
}

/// Live configuration shared by every stage.
///
/// Each component reads its own [`ConfigCell`]. A reload validates the whole
/// file first and then swaps only the sections that changed, so a rejected
/// file leaves every snapshot untouched.
pub struct ConfigHandle {
    auth: Arc<ConfigCell<AuthConfig>>,
    threat: Arc<ConfigCell<ThreatConfig>>,
    telemetry: Arc<ConfigCell<TelemetryConfig>>,
    restraint: Arc<ConfigCell<RestraintConfig>>,
    audit: AuditConfig,
    reload_gate: Mutex<()>,
}

impl ConfigHandle {
    pub fn new(config: WardenConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            auth: Arc::new(ConfigCell::new(config.auth)),
            threat: Arc::new(ConfigCell::new(config.threat)),
            telemetry: Arc::new(ConfigCell::new(config.telemetry)),
            restraint: Arc::new(ConfigCell::new(config.restraint)),
            audit: config.audit,
            reload_gate: Mutex::new(()),
        })
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        Self::new(WardenConfig::load(path)?)
    }

    pub fn auth(&self) -> Arc<ConfigCell<AuthConfig>> {
        self.auth.clone()
    }

    pub fn threat(&self) -> Arc<ConfigCell<ThreatConfig>> {
        self.threat.clone()
    }

    pub fn telemetry(&self) -> Arc<ConfigCell<TelemetryConfig>> {
        self.telemetry.clone()
    }

    pub fn restraint(&self) -> Arc<ConfigCell<RestraintConfig>> {
        self.restraint.clone()
    }

    /// Audit sizing as of startup.
    pub fn audit(&self) -> &AuditConfig {
        &self.audit
    }

    /// The configuration currently in effect.
    pub fn current(&self) -> WardenConfig {
        WardenConfig {
            auth: self.auth.load().value.clone(),
            threat: self.threat.load().value.clone(),
            telemetry: self.telemetry.load().value.clone(),
            restraint: self.restraint.load().value.clone(),
            audit: self.audit.clone(),
        }
    }

    pub fn apply(&self, config: WardenConfig) -> ConfigResult<ReloadReport> {
        config.validate()?;
        let _gate = self.reload_gate.lock();

        let mut changed = 0;
        swap_if_changed(&self.auth, config.auth, &mut changed);
        swap_if_changed(&self.threat, config.threat, &mut changed);
        swap_if_changed(&self.telemetry, config.telemetry, &mut changed);
        swap_if_changed(&self.restraint, config.restraint, &mut changed);

        let audit_restart_required = config.audit != self.audit;
        if audit_restart_required {
            warn!(
                current = self.audit.capacity,
                requested = config.audit.capacity,
                "Audit capacity change takes effect on restart"
            );
        }

        let report = ReloadReport {
            auth_version: self.auth.version(),
            threat_version: self.threat.version(),
            telemetry_version: self.telemetry.version(),
            restraint_version: self.restraint.version(),
            changed_sections: changed,
            audit_restart_required,
        };
        info!(
            changed_sections = changed,
            threat_version = report.threat_version,
            "Configuration reloaded"
        );
        Ok(report)
    }

    pub fn reload_from_str(&self, contents: &str) -> ConfigResult<ReloadReport> {
        self.apply(WardenConfig::from_toml_str(contents)?)
    }

    pub async fn reload_from_path(&self, path: &Path) -> ConfigResult<ReloadReport> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        self.reload_from_str(&contents)
    }

    /// Poll `path` every `every` and reload when its modification time or
    /// size changes. Invalid files are logged and skipped. Abort the returned
    /// handle to stop watching.
    pub fn spawn_file_watcher(self: &Arc<Self>, path: PathBuf, every: Duration) -> JoinHandle<()> {
        let handle = self.clone();
        let mut last_seen = file_stamp(&path);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            info!(path = %path.display(), interval_ms = every.as_millis() as u64, "Config watcher started");
            loop {
                ticker.tick().await;
                let stamp = match tokio::fs::metadata(&path).await {
                    Ok(meta) => Some((meta.modified().ok(), meta.len())),
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "Config file not readable");
                        continue;
                    }
                };
                if stamp == last_seen {
                    continue;
                }
                last_seen = stamp;
                if let Err(e) = handle.reload_from_path(&path).await {
                    warn!(path = %path.display(), error = %e, "Rejected configuration change");
                }
            }
        })
    }
}

type FileStamp = Option<(Option<SystemTime>, u64)>;

fn file_stamp(path: &Path) -> FileStamp {
    std::fs::metadata(path)
        .ok()
        .map(|meta| (meta.modified().ok(), meta.len()))
}

fn swap_if_changed<T: PartialEq>(cell: &ConfigCell<T>, next: T, changed: &mut usize) {
    if cell.load().value != next {
        cell.store(next);
        *changed += 1;
    }
}
