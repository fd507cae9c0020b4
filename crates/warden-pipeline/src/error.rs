use thiserror::Error;
use warden_audit::AuditError;
use warden_restraint::RestraintError;
use warden_threat::ThreatError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors while wiring the pipeline. Request processing itself never fails.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("audit log unavailable: {0}")]
    Audit(#[from] AuditError),

    #[error("threat safeguard: {0}")]
    Threat(#[from] ThreatError),

    #[error("restraint engine: {0}")]
    Restraint(#[from] RestraintError),

    #[error("malformed request context: {0}")]
    MalformedContext(#[from] serde_json::Error),
}
