use thiserror::Error;
use warden_audit::AuditError;

pub type RestraintResult<T> = Result<T, RestraintError>;

/// Errors raised inside the restraint stage.
///
/// `evaluate` folds every one of these into a HOLD verdict.
#[derive(Error, Debug)]
pub enum RestraintError {
    #[error("urgency must be between 1 and 5, got {0}")]
    InvalidUrgency(u8),

    #[error("invalid restraint configuration: {0}")]
    InvalidConfig(String),

    #[error("telemetry source panicked")]
    TelemetryPanicked,

    #[error("audit error: {0}")]
    Audit(#[from] AuditError),
}
