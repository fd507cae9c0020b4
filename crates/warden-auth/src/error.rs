use thiserror::Error;
use warden_audit::AuditError;
use warden_storage::StorageError;

use crate::gate::GateId;

pub type AuthResult<T> = Result<T, AuthError>;

/// Errors raised inside the authentication stage.
///
/// None of these escape [`crate::AuthGateOrchestrator::authenticate`]; they
/// are folded into failed gate results or a deny-by-default verdict.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("malformed evidence for {gate}: {reason}")]
    MalformedEvidence { gate: GateId, reason: String },

    #[error("gate {0} panicked during evaluation")]
    GatePanicked(GateId),

    #[error("internal fault: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
