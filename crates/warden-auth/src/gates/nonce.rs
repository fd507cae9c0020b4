use std::sync::Arc;

use async_trait::async_trait;
use warden_types::{ConfigCell, DeviceId};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::gate::{AuthGate, GateEvidence, GateFinding, GateId};
use crate::nonce::{NonceCheck, NonceIssuer};
use crate::request::{AuthContext, AuthRequest};

/// Checks the answer to a previously issued semantic challenge.
pub struct SemanticNonceGate {
    issuer: Arc<NonceIssuer>,
    config: Arc<ConfigCell<AuthConfig>>,
}

impl SemanticNonceGate {
    pub fn new(issuer: Arc<NonceIssuer>, config: Arc<ConfigCell<AuthConfig>>) -> Self {
        Self { issuer, config }
    }
}

#[async_trait]
impl AuthGate for SemanticNonceGate {
    fn gate_id(&self) -> GateId {
        GateId::SemanticNonce
    }

    async fn evaluate(
        &self,
        device_id: &DeviceId,
        request: &AuthRequest,
        _context: &AuthContext,
    ) -> Result<GateFinding, AuthError> {
        let Some(response) = request.nonce.as_ref() else {
            return Ok(GateFinding::failed("no nonce response"));
        };
        let finding = match self
            .issuer
            .verify(device_id, &response.nonce_id, &response.answer)
        {
            NonceCheck::Valid { identity } => GateFinding::Verified {
                confidence: self.config.load().value.nonce_confidence,
                evidence: GateEvidence::SemanticNonce {
                    identity,
                    nonce_id: response.nonce_id.clone(),
                },
            },
            NonceCheck::Unknown => GateFinding::failed("nonce unknown or already used"),
            NonceCheck::Expired => GateFinding::failed("nonce expired"),
            NonceCheck::WrongAnswer => GateFinding::failed("nonce answer incorrect"),
            NonceCheck::DeviceMismatch => GateFinding::hard_failure("nonce issued to another device"),
        };
        Ok(finding)
    }
}
