use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_types::{ActionScope, DeviceId, IdentityId};

use crate::gate::{GateId, GateResult};
use crate::session::{token_fingerprint, SessionGrant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthDecision {
    Allow,
    Limited,
    Deny,
    ManualReview,
}

impl AuthDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthDecision::Allow => "ALLOW",
            AuthDecision::Limited => "LIMITED",
            AuthDecision::Deny => "DENY",
            AuthDecision::ManualReview => "MANUAL_REVIEW",
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, AuthDecision::Allow | AuthDecision::Limited)
    }
}

impl std::fmt::Display for AuthDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operating restriction attached to a LIMITED grant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Restriction {
    NoSystemLevelActions,
    MaxScope { scope: ActionScope },
    ReducedSessionTtl { secs: u64 },
    ReauthenticateWithin { secs: u64 },
}

impl Restriction {
    /// Whether this restriction rules out an action of the given scope.
    pub fn forbids(&self, scope: ActionScope) -> bool {
        match self {
            Restriction::NoSystemLevelActions => scope == ActionScope::SystemLevel,
            Restriction::MaxScope { scope: max } => scope > *max,
            Restriction::ReducedSessionTtl { .. } | Restriction::ReauthenticateWithin { .. } => {
                false
            }
        }
    }
}

/// Aggregate authentication decision for one request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthenticationVerdict {
    pub id: Uuid,
    pub device_id: DeviceId,
    pub decision: AuthDecision,
    /// 0–100
    pub confidence: f64,
    pub identity: Option<IdentityId>,
    pub gates_required: Vec<GateId>,
    pub gates_succeeded: Vec<GateId>,
    pub gates_failed: Vec<GateId>,
    pub gate_results: Vec<GateResult>,
    pub reasoning: String,
    pub manual_review: bool,
    pub session: Option<SessionGrant>,
    pub restrictions: Vec<Restriction>,
    pub decided_at: DateTime<Utc>,
    pub processing_ms: u64,
}

impl AuthenticationVerdict {
    /// Deny-by-default verdict for an internal fault.
    pub fn internal_fault(
        device_id: DeviceId,
        gates_required: Vec<GateId>,
        fault: &str,
        decided_at: DateTime<Utc>,
        processing_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            device_id,
            decision: AuthDecision::Deny,
            confidence: 0.0,
            identity: None,
            gates_required,
            gates_succeeded: Vec::new(),
            gates_failed: Vec::new(),
            gate_results: Vec::new(),
            reasoning: format!(
                "Internal fault during authentication ({fault}); denied by default, MANUAL_REVIEW required"
            ),
            manual_review: true,
            session: None,
            restrictions: Vec::new(),
            decided_at,
            processing_ms,
        }
    }

    /// True if any attached restriction rules out the given scope.
    pub fn forbids(&self, scope: ActionScope) -> bool {
        self.restrictions.iter().any(|r| r.forbids(scope))
    }
}

/// What the authentication audit log stores: the verdict without evidence
/// payloads or the raw session token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthAuditRecord {
    pub verdict_id: Uuid,
    pub device_id: DeviceId,
    pub decision: AuthDecision,
    pub confidence: f64,
    pub identity: Option<IdentityId>,
    pub gates_required: Vec<GateId>,
    pub gates_succeeded: Vec<GateId>,
    pub gates_failed: Vec<GateId>,
    pub hard_failures: Vec<GateId>,
    pub timed_out: Vec<GateId>,
    pub reasoning: String,
    pub manual_review: bool,
    pub restrictions: Vec<Restriction>,
    pub session_fingerprint: Option<String>,
    pub session_expires_at: Option<DateTime<Utc>>,
    pub decided_at: DateTime<Utc>,
    pub processing_ms: u64,
}

impl From<&AuthenticationVerdict> for AuthAuditRecord {
    fn from(verdict: &AuthenticationVerdict) -> Self {
        let pick = |pred: fn(&GateResult) -> bool| {
            verdict
                .gate_results
                .iter()
                .filter(|r| pred(r))
                .map(|r| r.gate)
                .collect::<Vec<_>>()
        };
        Self {
            verdict_id: verdict.id,
            device_id: verdict.device_id.clone(),
            decision: verdict.decision,
            confidence: verdict.confidence,
            identity: verdict.identity.clone(),
            gates_required: verdict.gates_required.clone(),
            gates_succeeded: verdict.gates_succeeded.clone(),
            gates_failed: verdict.gates_failed.clone(),
            hard_failures: pick(|r| r.hard_failure),
            timed_out: pick(|r| r.timed_out),
            reasoning: verdict.reasoning.clone(),
            manual_review: verdict.manual_review,
            restrictions: verdict.restrictions.clone(),
            session_fingerprint: verdict.session.as_ref().map(|s| token_fingerprint(&s.token)),
            session_expires_at: verdict.session.as_ref().map(|s| s.expires_at),
            decided_at: verdict.decided_at,
            processing_ms: verdict.processing_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restrictions_forbid_by_scope() {
        assert!(Restriction::NoSystemLevelActions.forbids(ActionScope::SystemLevel));
        assert!(!Restriction::NoSystemLevelActions.forbids(ActionScope::Complex));

        let max = Restriction::MaxScope {
            scope: ActionScope::Moderate,
        };
        assert!(max.forbids(ActionScope::Significant));
        assert!(!max.forbids(ActionScope::Moderate));
        assert!(!Restriction::ReauthenticateWithin { secs: 60 }.forbids(ActionScope::SystemLevel));
    }

    #[test]
    fn internal_fault_is_deny_with_manual_review() {
        let verdict = AuthenticationVerdict::internal_fault(
            DeviceId::new("d1"),
            GateId::ALL.to_vec(),
            "gate crypto_attestation panicked",
            Utc::now(),
            0,
        );
        assert_eq!(verdict.decision, AuthDecision::Deny);
        assert!(verdict.manual_review);
        assert!(verdict.reasoning.contains("MANUAL_REVIEW"));
        assert!(verdict.session.is_none());
    }

    #[test]
    fn audit_record_hides_token() {
        let mut verdict = AuthenticationVerdict::internal_fault(
            DeviceId::new("d1"),
            vec![],
            "x",
            Utc::now(),
            0,
        );
        verdict.session = Some(SessionGrant {
            token: "secret-token".into(),
            expires_at: Utc::now(),
            limited: false,
        });
        let record = AuthAuditRecord::from(&verdict);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("secret-token"));
        assert_eq!(
            record.session_fingerprint.as_deref(),
            Some(token_fingerprint("secret-token").as_str())
        );
    }
}
