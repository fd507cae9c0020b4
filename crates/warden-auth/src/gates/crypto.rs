use std::sync::Arc;

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use tracing::warn;
use warden_types::{ConfigCell, DeviceId};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::gate::{AuthGate, GateEvidence, GateFinding, GateId};
use crate::registry::DeviceRegistry;
use crate::request::{AttestationProof, AuthContext, AuthRequest};

const ATTEST_DOMAIN: &[u8] = b"warden-attest";

/// The 32-byte message a device signs to attest a challenge.
pub fn attestation_message(device_id: &DeviceId, challenge: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(ATTEST_DOMAIN);
    hasher.update(device_id.as_str().as_bytes());
    hasher.update(&[0]);
    hasher.update(challenge.as_bytes());
    *hasher.finalize().as_bytes()
}

/// Produce an attestation proof with a device key.
pub fn sign_attestation(key: &SigningKey, device_id: &DeviceId, challenge: &str) -> AttestationProof {
    let signature = key.sign(&attestation_message(device_id, challenge));
    AttestationProof {
        challenge: challenge.to_string(),
        signature_hex: hex::encode(signature.to_bytes()),
    }
}

/// Verifies an Ed25519 signature from the enrolled device key.
pub struct CryptoAttestationGate {
    registry: Arc<DeviceRegistry>,
    config: Arc<ConfigCell<AuthConfig>>,
}

impl CryptoAttestationGate {
    pub fn new(registry: Arc<DeviceRegistry>, config: Arc<ConfigCell<AuthConfig>>) -> Self {
        Self { registry, config }
    }

    fn malformed(reason: impl ToString) -> AuthError {
        AuthError::MalformedEvidence {
            gate: GateId::CryptoAttestation,
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl AuthGate for CryptoAttestationGate {
    fn gate_id(&self) -> GateId {
        GateId::CryptoAttestation
    }

    async fn evaluate(
        &self,
        device_id: &DeviceId,
        request: &AuthRequest,
        _context: &AuthContext,
    ) -> Result<GateFinding, AuthError> {
        let Some(enrollment) = self.registry.device(device_id) else {
            return Ok(GateFinding::failed("device not enrolled"));
        };
        if enrollment.revoked {
            warn!(device_id = %device_id, "Attestation from revoked device");
            return Ok(GateFinding::hard_failure("device credential revoked"));
        }
        let Some(proof) = request.attestation.as_ref() else {
            return Ok(GateFinding::failed("no attestation presented"));
        };
        if proof.challenge.is_empty() {
            return Ok(GateFinding::failed("empty attestation challenge"));
        }

        let bytes = hex::decode(&proof.signature_hex).map_err(Self::malformed)?;
        let signature = Signature::from_slice(&bytes).map_err(Self::malformed)?;
        let message = attestation_message(device_id, &proof.challenge);
        if enrollment.verifying_key.verify(&message, &signature).is_err() {
            return Ok(GateFinding::failed("attestation signature invalid"));
        }
        if !self.registry.note_challenge(device_id, &proof.challenge) {
            warn!(device_id = %device_id, "Attestation challenge replayed");
            return Ok(GateFinding::hard_failure("attestation challenge replayed"));
        }

        let fingerprint = blake3::hash(enrollment.verifying_key.as_bytes()).to_hex();
        Ok(GateFinding::Verified {
            confidence: self.config.load().value.crypto_confidence,
            evidence: GateEvidence::CryptoAttestation {
                identity: enrollment.identity,
                key_fingerprint: fingerprint.as_str()[..16].to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::IdentityId;

    fn setup() -> (CryptoAttestationGate, Arc<DeviceRegistry>, SigningKey) {
        let registry = Arc::new(DeviceRegistry::new());
        let key = SigningKey::from_bytes(&[11u8; 32]);
        registry.enroll_device(DeviceId::new("d1"), IdentityId::new("alice"), key.verifying_key());
        let gate = CryptoAttestationGate::new(
            registry.clone(),
            Arc::new(ConfigCell::new(AuthConfig::default())),
        );
        (gate, registry, key)
    }

    fn request(proof: AttestationProof) -> AuthRequest {
        AuthRequest {
            attestation: Some(proof),
            ..AuthRequest::default()
        }
    }

    #[tokio::test]
    async fn valid_signature_verifies() {
        let (gate, _, key) = setup();
        let device = DeviceId::new("d1");
        let finding = gate
            .evaluate(&device, &request(sign_attestation(&key, &device, "c-1")), &AuthContext::default())
            .await
            .unwrap();
        match finding {
            GateFinding::Verified { confidence, evidence } => {
                assert_eq!(confidence, 95.0);
                assert_eq!(evidence.claimed_identity(), Some(&IdentityId::new("alice")));
            }
            other => panic!("expected verified, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn signature_for_other_device_fails() {
        let (gate, _, key) = setup();
        let proof = sign_attestation(&key, &DeviceId::new("d2"), "c-1");
        let finding = gate
            .evaluate(&DeviceId::new("d1"), &request(proof), &AuthContext::default())
            .await
            .unwrap();
        assert_eq!(finding, GateFinding::failed("attestation signature invalid"));
    }

    #[tokio::test]
    async fn revoked_device_is_hard_failure() {
        let (gate, registry, key) = setup();
        let device = DeviceId::new("d1");
        registry.revoke_device(&device);
        let finding = gate
            .evaluate(&device, &request(sign_attestation(&key, &device, "c-1")), &AuthContext::default())
            .await
            .unwrap();
        assert!(matches!(finding, GateFinding::HardFailure { .. }));
    }

    #[tokio::test]
    async fn replayed_challenge_is_hard_failure() {
        let (gate, _, key) = setup();
        let device = DeviceId::new("d1");
        let req = request(sign_attestation(&key, &device, "c-1"));
        gate.evaluate(&device, &req, &AuthContext::default()).await.unwrap();
        let second = gate.evaluate(&device, &req, &AuthContext::default()).await.unwrap();
        assert_eq!(second, GateFinding::hard_failure("attestation challenge replayed"));
    }

    #[tokio::test]
    async fn malformed_signature_is_error() {
        let (gate, _, _) = setup();
        let proof = AttestationProof {
            challenge: "c".into(),
            signature_hex: "not-hex".into(),
        };
        let result = gate
            .evaluate(&DeviceId::new("d1"), &request(proof), &AuthContext::default())
            .await;
        assert!(matches!(result, Err(AuthError::MalformedEvidence { .. })));
    }
}
