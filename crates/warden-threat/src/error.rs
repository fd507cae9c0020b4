use thiserror::Error;
use warden_audit::AuditError;

pub type ThreatResult<T> = Result<T, ThreatError>;

#[derive(Error, Debug)]
pub enum ThreatError {
    #[error("archetype scan exceeded {0}ms")]
    Timeout(u64),

    #[error("archetype scan failed: {0}")]
    ScanFailed(String),

    #[error("invalid threat configuration: {0}")]
    InvalidConfig(String),

    #[error("audit error: {0}")]
    Audit(#[from] AuditError),
}
