use std::sync::Arc;

use async_trait::async_trait;
use warden_types::{ConfigCell, DeviceId};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::gate::{AuthGate, GateEvidence, GateFinding, GateId};
use crate::request::{AuthContext, AuthRequest};
use crate::session::SessionTokenTable;

/// Consumes a previously minted session token.
///
/// Tokens from LIMITED grants report at most `tau_low`, so they cannot
/// contribute to a full quorum.
pub struct SessionIntegrityGate {
    sessions: Arc<SessionTokenTable>,
    config: Arc<ConfigCell<AuthConfig>>,
}

impl SessionIntegrityGate {
    pub fn new(sessions: Arc<SessionTokenTable>, config: Arc<ConfigCell<AuthConfig>>) -> Self {
        Self { sessions, config }
    }
}

#[async_trait]
impl AuthGate for SessionIntegrityGate {
    fn gate_id(&self) -> GateId {
        GateId::SessionIntegrity
    }

    async fn evaluate(
        &self,
        device_id: &DeviceId,
        request: &AuthRequest,
        context: &AuthContext,
    ) -> Result<GateFinding, AuthError> {
        let Some(token) = request.session_token.as_deref() else {
            return Ok(GateFinding::failed("no session token presented"));
        };
        match self
            .sessions
            .consume(token, device_id, context.origin.as_deref())
            .await?
        {
            Ok(record) => {
                let config = self.config.load();
                let confidence = if record.limited {
                    config.value.session_confidence.min(config.value.tau_low)
                } else {
                    config.value.session_confidence
                };
                Ok(GateFinding::Verified {
                    confidence,
                    evidence: GateEvidence::SessionIntegrity {
                        identity: record.identity,
                        token_age_secs: (self.sessions.now() - record.issued_at).num_seconds().max(0),
                    },
                })
            }
            Err(rejection) if rejection.is_hard() => Ok(GateFinding::hard_failure(rejection.to_string())),
            Err(rejection) => Ok(GateFinding::failed(rejection.to_string())),
        }
    }
}
