use thiserror::Error;
use uuid::Uuid;
use warden_storage::StorageError;

pub type AuditResult<T> = Result<T, AuditError>;

/// Errors from the audit log.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("audit record not retained: {0}")]
    NotFound(Uuid),

    #[error("outcome already recorded for audit record {0}")]
    OutcomeAlreadyRecorded(Uuid),

    #[error("audit capacity must be at least 1")]
    InvalidCapacity,

    #[error("corrupt audit record under key {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
