use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use warden_types::{DeviceId, IdentityId};

use crate::error::AuthError;
use crate::request::{AuthContext, AuthRequest};

/// The four independent authentication factors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateId {
    CryptoAttestation,
    BehavioralCodex,
    SemanticNonce,
    SessionIntegrity,
}

impl GateId {
    pub const ALL: [GateId; 4] = [
        GateId::CryptoAttestation,
        GateId::BehavioralCodex,
        GateId::SemanticNonce,
        GateId::SessionIntegrity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GateId::CryptoAttestation => "crypto_attestation",
            GateId::BehavioralCodex => "behavioral_codex",
            GateId::SemanticNonce => "semantic_nonce",
            GateId::SessionIntegrity => "session_integrity",
        }
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gate-specific evidence attached to a gate result.
///
/// Every successful variant names the enrolled identity the evidence points
/// at, so the orchestrator can detect cross-gate disagreement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateEvidence {
    CryptoAttestation {
        identity: IdentityId,
        key_fingerprint: String,
    },
    BehavioralCodex {
        identity: IdentityId,
        similarity: f64,
    },
    SemanticNonce {
        identity: IdentityId,
        nonce_id: String,
    },
    SessionIntegrity {
        identity: Option<IdentityId>,
        token_age_secs: i64,
    },
    Absent,
}

impl GateEvidence {
    pub fn claimed_identity(&self) -> Option<&IdentityId> {
        match self {
            GateEvidence::CryptoAttestation { identity, .. }
            | GateEvidence::BehavioralCodex { identity, .. }
            | GateEvidence::SemanticNonce { identity, .. } => Some(identity),
            GateEvidence::SessionIntegrity { identity, .. } => identity.as_ref(),
            GateEvidence::Absent => None,
        }
    }
}

/// What a gate concluded, before the orchestrator stamps timing onto it.
#[derive(Clone, Debug, PartialEq)]
pub enum GateFinding {
    Verified {
        confidence: f64,
        evidence: GateEvidence,
    },
    /// Ordinary failure: missing or unconvincing evidence.
    Failed { reason: String },
    /// Explicit failure that denies outright (revoked credential, replay).
    HardFailure { reason: String },
}

impl GateFinding {
    pub fn failed(reason: impl Into<String>) -> Self {
        GateFinding::Failed {
            reason: reason.into(),
        }
    }

    pub fn hard_failure(reason: impl Into<String>) -> Self {
        GateFinding::HardFailure {
            reason: reason.into(),
        }
    }
}

/// Immutable outcome of one gate evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub gate: GateId,
    pub success: bool,
    /// 0–100
    pub confidence: f64,
    pub evidence: GateEvidence,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default)]
    pub hard_failure: bool,
    #[serde(default)]
    pub timed_out: bool,
}

impl GateResult {
    pub fn from_finding(gate: GateId, finding: GateFinding, duration_ms: u64) -> Self {
        match finding {
            GateFinding::Verified {
                confidence,
                evidence,
            } => Self {
                gate,
                success: true,
                confidence: confidence.clamp(0.0, 100.0),
                evidence,
                duration_ms,
                errors: Vec::new(),
                hard_failure: false,
                timed_out: false,
            },
            GateFinding::Failed { reason } => Self::failure(gate, reason, duration_ms),
            GateFinding::HardFailure { reason } => Self {
                hard_failure: true,
                ..Self::failure(gate, reason, duration_ms)
            },
        }
    }

    pub fn failure(gate: GateId, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            gate,
            success: false,
            confidence: 0.0,
            evidence: GateEvidence::Absent,
            duration_ms,
            errors: vec![error.into()],
            hard_failure: false,
            timed_out: false,
        }
    }

    pub fn timeout(gate: GateId, timeout_ms: u64) -> Self {
        Self {
            timed_out: true,
            ..Self::failure(gate, format!("timed out after {timeout_ms}ms"), timeout_ms)
        }
    }
}

/// One authentication factor.
///
/// Implementations return `Ok(GateFinding::Failed { .. })` for missing or
/// bad evidence; `Err` is reserved for infrastructure faults and is converted
/// into a failed result by the orchestrator.
#[async_trait]
pub trait AuthGate: Send + Sync {
    fn gate_id(&self) -> GateId;

    async fn evaluate(
        &self,
        device_id: &DeviceId,
        request: &AuthRequest,
        context: &AuthContext,
    ) -> Result<GateFinding, AuthError>;
}
