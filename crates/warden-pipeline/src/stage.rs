use async_trait::async_trait;
use warden_auth::{AuthContext, AuthGateOrchestrator, AuthRequest, AuthenticationVerdict};
use warden_restraint::{RestraintContext, RestraintDecisionEngine, RestraintVerdict};
use warden_threat::{DetectionContext, DetectionVerdict, ThreatPatternSafeguard};
use warden_types::DeviceId;

/// Stage 1. Implementations must never fail; faults become DENY.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(
        &self,
        device_id: &DeviceId,
        request: &AuthRequest,
        context: &AuthContext,
    ) -> AuthenticationVerdict;
}

/// Stage 2. Implementations must never fail; faults become BLOCK.
#[async_trait]
pub trait Screener: Send + Sync {
    async fn screen(&self, input: &str, context: &DetectionContext) -> DetectionVerdict;
}

/// Stage 3. Implementations must never fail; faults become HOLD.
#[async_trait]
pub trait Restrainer: Send + Sync {
    async fn restrain(&self, description: &str, context: &RestraintContext) -> RestraintVerdict;
}

#[async_trait]
impl Authenticator for AuthGateOrchestrator {
    async fn authenticate(
        &self,
        device_id: &DeviceId,
        request: &AuthRequest,
        context: &AuthContext,
    ) -> AuthenticationVerdict {
        AuthGateOrchestrator::authenticate(self, device_id, request, context).await
    }
}

#[async_trait]
impl Screener for ThreatPatternSafeguard {
    async fn screen(&self, input: &str, context: &DetectionContext) -> DetectionVerdict {
        self.detect(input, context).await
    }
}

#[async_trait]
impl Restrainer for RestraintDecisionEngine {
    async fn restrain(&self, description: &str, context: &RestraintContext) -> RestraintVerdict {
        self.evaluate(description, context).await
    }
}
