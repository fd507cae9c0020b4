use std::time::Duration;

use async_trait::async_trait;
use warden_types::{DeviceId, IdentityId};

use crate::error::AuthError;
use crate::gate::{AuthGate, GateEvidence, GateFinding, GateId};
use crate::request::{AuthContext, AuthRequest};

/// Mock gate that always reports the same finding, optionally after a delay.
pub struct StaticGate {
    id: GateId,
    outcome: Result<GateFinding, String>,
    delay: Option<Duration>,
}

impl StaticGate {
    /// A gate that verifies `identity` with the given confidence.
    pub fn verified(id: GateId, confidence: f64, identity: &str) -> Self {
        let identity = IdentityId::new(identity);
        let evidence = match id {
            GateId::CryptoAttestation => GateEvidence::CryptoAttestation {
                identity,
                key_fingerprint: "mock".into(),
            },
            GateId::BehavioralCodex => GateEvidence::BehavioralCodex {
                identity,
                similarity: confidence / 100.0,
            },
            GateId::SemanticNonce => GateEvidence::SemanticNonce {
                identity,
                nonce_id: "mock".into(),
            },
            GateId::SessionIntegrity => GateEvidence::SessionIntegrity {
                identity: Some(identity),
                token_age_secs: 0,
            },
        };
        Self {
            id,
            outcome: Ok(GateFinding::Verified {
                confidence,
                evidence,
            }),
            delay: None,
        }
    }

    pub fn failed(id: GateId, reason: &str) -> Self {
        Self {
            id,
            outcome: Ok(GateFinding::failed(reason)),
            delay: None,
        }
    }

    pub fn hard_failure(id: GateId, reason: &str) -> Self {
        Self {
            id,
            outcome: Ok(GateFinding::hard_failure(reason)),
            delay: None,
        }
    }

    /// A gate whose evaluation returns an infrastructure error.
    pub fn erroring(id: GateId, message: &str) -> Self {
        Self {
            id,
            outcome: Err(message.to_string()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl AuthGate for StaticGate {
    fn gate_id(&self) -> GateId {
        self.id
    }

    async fn evaluate(
        &self,
        _device_id: &DeviceId,
        _request: &AuthRequest,
        _context: &AuthContext,
    ) -> Result<GateFinding, AuthError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone().map_err(AuthError::Internal)
    }
}

/// Mock gate that panics when evaluated.
pub struct PanickingGate(pub GateId);

#[async_trait]
impl AuthGate for PanickingGate {
    fn gate_id(&self) -> GateId {
        self.0
    }

    async fn evaluate(
        &self,
        _device_id: &DeviceId,
        _request: &AuthRequest,
        _context: &AuthContext,
    ) -> Result<GateFinding, AuthError> {
        panic!("mock gate {} panicked", self.0)
    }
}
