use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Signed device attestation over a server-issued challenge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationProof {
    pub challenge: String,
    /// Hex-encoded Ed25519 signature over the attestation message.
    pub signature_hex: String,
}

/// Behavioral sample: characteristic phrases plus optional input cadence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralSample {
    #[serde(default)]
    pub phrases: Vec<String>,
    #[serde(default)]
    pub cadence_ms: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceResponse {
    pub nonce_id: String,
    pub answer: String,
}

/// Evidence bundle presented by the caller. Every factor is optional; an
/// absent factor fails its gate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub attestation: Option<AttestationProof>,
    #[serde(default)]
    pub behavior: Option<BehavioralSample>,
    #[serde(default)]
    pub nonce: Option<NonceResponse>,
    #[serde(default)]
    pub session_token: Option<String>,
}

/// Transport-level context for an authentication attempt.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Network or channel origin; session tokens are bound to it when present.
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl AuthContext {
    pub fn with_origin(origin: impl Into<String>) -> Self {
        Self {
            origin: Some(origin.into()),
            attributes: BTreeMap::new(),
        }
    }
}
