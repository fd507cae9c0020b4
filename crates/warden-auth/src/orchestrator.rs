use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::FutureExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use warden_audit::AuditLog;
use warden_types::{ActionScope, ConfigCell, DeviceId, IdentityId, SharedClock};

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::gate::{AuthGate, GateId, GateResult};
use crate::gates::{
    BehavioralCodexGate, CryptoAttestationGate, SemanticNonceGate, SessionIntegrityGate,
};
use crate::nonce::NonceIssuer;
use crate::registry::DeviceRegistry;
use crate::request::{AuthContext, AuthRequest};
use crate::session::SessionTokenTable;
use crate::verdict::{AuthAuditRecord, AuthDecision, AuthenticationVerdict, Restriction};

/// Decision synthesized from a set of gate results, before session minting.
#[derive(Clone, Debug, PartialEq)]
pub struct Synthesis {
    pub decision: AuthDecision,
    pub confidence: f64,
    pub identity: Option<IdentityId>,
    pub reasoning: String,
    pub restrictions: Vec<Restriction>,
    pub manual_review: bool,
}

fn mean_confidence(results: &[&GateResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64
}

fn failure_summary(results: &[GateResult]) -> String {
    let parts: Vec<String> = results
        .iter()
        .filter(|r| !r.success)
        .map(|r| match r.errors.first() {
            Some(e) => format!("{}: {e}", r.gate),
            None => r.gate.to_string(),
        })
        .collect();
    if parts.is_empty() {
        "none".into()
    } else {
        parts.join("; ")
    }
}

fn limited_restrictions(config: &AuthConfig) -> Vec<Restriction> {
    vec![
        Restriction::NoSystemLevelActions,
        Restriction::MaxScope {
            scope: ActionScope::Moderate,
        },
        Restriction::ReducedSessionTtl {
            secs: config.limited_token_ttl_secs,
        },
        Restriction::ReauthenticateWithin {
            secs: config.limited_reauth_secs,
        },
    ]
}

/// Apply the decision algebra to a set of gate results.
///
/// Precedence: identity conflict, crypto fast path, hard failure, quorum.
pub fn synthesize(results: &[GateResult], config: &AuthConfig) -> Synthesis {
    let successes: Vec<&GateResult> = results.iter().filter(|r| r.success).collect();
    let mean = mean_confidence(&successes);

    let mut claims: BTreeMap<&IdentityId, Vec<GateId>> = BTreeMap::new();
    for result in &successes {
        if let Some(identity) = result.evidence.claimed_identity() {
            claims.entry(identity).or_default().push(result.gate);
        }
    }
    if claims.len() > 1 {
        let detail = claims
            .iter()
            .map(|(identity, gates)| {
                let gates: Vec<&str> = gates.iter().map(GateId::as_str).collect();
                format!("{} -> {identity}", gates.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Synthesis {
            decision: AuthDecision::ManualReview,
            confidence: mean,
            identity: None,
            reasoning: format!(
                "Successful gates disagree on identity ({detail}); MANUAL_REVIEW required"
            ),
            restrictions: Vec::new(),
            manual_review: true,
        };
    }
    let identity = claims.into_keys().next().cloned();

    if let Some(crypto) = successes
        .iter()
        .find(|r| r.gate == GateId::CryptoAttestation && r.confidence >= config.tau_high)
    {
        return Synthesis {
            decision: AuthDecision::Allow,
            confidence: crypto.confidence,
            identity,
            reasoning: format!(
                "Crypto attestation verified with confidence {:.1} >= tau_high {:.1}; fast path satisfies quorum",
                crypto.confidence, config.tau_high
            ),
            restrictions: Vec::new(),
            manual_review: false,
        };
    }

    if let Some(hard) = results.iter().find(|r| r.hard_failure) {
        return Synthesis {
            decision: AuthDecision::Deny,
            confidence: mean,
            identity: None,
            reasoning: format!(
                "Hard failure from {}: {}",
                hard.gate,
                hard.errors.first().map(String::as_str).unwrap_or("unspecified")
            ),
            restrictions: Vec::new(),
            manual_review: false,
        };
    }

    let strong = successes
        .iter()
        .filter(|r| r.confidence >= config.tau_medium)
        .count();
    let deny = |reasoning: String| Synthesis {
        decision: AuthDecision::Deny,
        confidence: mean,
        identity: None,
        reasoning,
        restrictions: Vec::new(),
        manual_review: false,
    };
    let limited = |reasoning: String| Synthesis {
        decision: AuthDecision::Limited,
        confidence: mean,
        identity: identity.clone(),
        reasoning,
        restrictions: limited_restrictions(config),
        manual_review: false,
    };

    match successes.len() {
        0 => deny(format!(
            "No authentication gate succeeded ({})",
            failure_summary(results)
        )),
        _ if strong >= 2 => Synthesis {
            decision: AuthDecision::Allow,
            confidence: mean,
            identity: identity.clone(),
            reasoning: format!(
                "{strong} of {} gates succeeded with confidence >= tau_medium {:.1}",
                results.len(),
                config.tau_medium
            ),
            restrictions: Vec::new(),
            manual_review: false,
        },
        1 => limited(format!(
            "Only {} succeeded (confidence {mean:.1}); limited grant",
            successes[0].gate
        )),
        n if mean >= config.tau_low => limited(format!(
            "{n} gates succeeded with mean confidence {mean:.1} below tau_medium {:.1}; limited grant",
            config.tau_medium
        )),
        n => deny(format!(
            "{n} gates succeeded but mean confidence {mean:.1} is below tau_low {:.1}",
            config.tau_low
        )),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

async fn run_gate(
    gate: &dyn AuthGate,
    device_id: &DeviceId,
    request: &AuthRequest,
    context: &AuthContext,
    timeout: Duration,
) -> AuthResult<GateResult> {
    let id = gate.gate_id();
    let started = Instant::now();
    let evaluation = AssertUnwindSafe(gate.evaluate(device_id, request, context)).catch_unwind();

    match tokio::time::timeout(timeout, evaluation).await {
        Ok(Ok(Ok(finding))) => {
            let result = GateResult::from_finding(id, finding, elapsed_ms(started));
            debug!(gate = %id, success = result.success, confidence = result.confidence, "Gate evaluated");
            Ok(result)
        }
        Ok(Ok(Err(e))) => {
            warn!(gate = %id, device_id = %device_id, error = %e, "Gate evaluation failed");
            Ok(GateResult::failure(id, e.to_string(), elapsed_ms(started)))
        }
        Ok(Err(_)) => Err(AuthError::GatePanicked(id)),
        Err(_) => {
            let timeout_ms = timeout.as_millis() as u64;
            warn!(gate = %id, device_id = %device_id, timeout_ms, "Gate timed out");
            Ok(GateResult::timeout(id, timeout_ms))
        }
    }
}

/// Runs the authentication gates and synthesizes a verdict.
pub struct AuthGateOrchestrator {
    gates: Vec<Arc<dyn AuthGate>>,
    config: Arc<ConfigCell<AuthConfig>>,
    sessions: Arc<SessionTokenTable>,
    audit: Arc<AuditLog<AuthAuditRecord>>,
    clock: SharedClock,
}

impl AuthGateOrchestrator {
    /// Create an orchestrator with no gates. Add them with [`Self::with_gate`].
    pub fn new(
        config: Arc<ConfigCell<AuthConfig>>,
        sessions: Arc<SessionTokenTable>,
        audit: Arc<AuditLog<AuthAuditRecord>>,
        clock: SharedClock,
    ) -> Self {
        Self {
            gates: Vec::new(),
            config,
            sessions,
            audit,
            clock,
        }
    }

    /// Orchestrator wired with the four production gates.
    pub fn standard(
        config: Arc<ConfigCell<AuthConfig>>,
        registry: Arc<DeviceRegistry>,
        nonces: Arc<NonceIssuer>,
        sessions: Arc<SessionTokenTable>,
        audit: Arc<AuditLog<AuthAuditRecord>>,
        clock: SharedClock,
    ) -> Self {
        Self::new(config.clone(), sessions.clone(), audit, clock)
            .with_gate(Arc::new(CryptoAttestationGate::new(registry.clone(), config.clone())))
            .with_gate(Arc::new(BehavioralCodexGate::new(registry, config.clone())))
            .with_gate(Arc::new(SemanticNonceGate::new(nonces, config.clone())))
            .with_gate(Arc::new(SessionIntegrityGate::new(sessions, config)))
    }

    pub fn with_gate(mut self, gate: Arc<dyn AuthGate>) -> Self {
        self.gates.push(gate);
        self
    }

    pub fn gate_ids(&self) -> Vec<GateId> {
        self.gates.iter().map(|g| g.gate_id()).collect()
    }

    pub fn audit_log(&self) -> &Arc<AuditLog<AuthAuditRecord>> {
        &self.audit
    }

    pub fn sessions(&self) -> &Arc<SessionTokenTable> {
        &self.sessions
    }

    /// Authenticate one request. Never fails: internal faults become DENY
    /// with manual review noted. One audit record is written per call.
    pub async fn authenticate(
        &self,
        device_id: &DeviceId,
        request: &AuthRequest,
        context: &AuthContext,
    ) -> AuthenticationVerdict {
        let started = Instant::now();
        let config = self.config.load();

        let attempt = AssertUnwindSafe(self.decide(device_id, request, context, &config.value, started))
            .catch_unwind()
            .await;
        let verdict = match attempt {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                error!(device_id = %device_id, error = %e, "Authentication internal fault");
                self.fault_verdict(device_id, &e.to_string(), started)
            }
            Err(_) => {
                error!(device_id = %device_id, "Authentication panicked");
                self.fault_verdict(device_id, "panic during gate evaluation", started)
            }
        };

        match self.audit.append(AuthAuditRecord::from(&verdict)).await {
            Ok(_) => {
                if verdict.decision == AuthDecision::Allow {
                    info!(
                        device_id = %device_id,
                        confidence = verdict.confidence,
                        succeeded = verdict.gates_succeeded.len(),
                        "Authentication allowed"
                    );
                } else {
                    warn!(
                        device_id = %device_id,
                        decision = %verdict.decision,
                        confidence = verdict.confidence,
                        "Authentication not fully granted"
                    );
                }
                verdict
            }
            Err(e) => {
                error!(device_id = %device_id, error = %e, "Authentication audit write failed");
                if let Some(grant) = &verdict.session {
                    if let Err(e) = self.sessions.revoke(&grant.token).await {
                        error!(device_id = %device_id, error = %e, "Failed to revoke session token");
                    }
                }
                self.fault_verdict(device_id, &format!("audit log unavailable: {e}"), started)
            }
        }
    }

    fn fault_verdict(&self, device_id: &DeviceId, fault: &str, started: Instant) -> AuthenticationVerdict {
        AuthenticationVerdict::internal_fault(
            device_id.clone(),
            self.gate_ids(),
            fault,
            self.clock.now(),
            elapsed_ms(started),
        )
    }

    async fn decide(
        &self,
        device_id: &DeviceId,
        request: &AuthRequest,
        context: &AuthContext,
        config: &AuthConfig,
        started: Instant,
    ) -> AuthResult<AuthenticationVerdict> {
        if self.gates.is_empty() {
            return Err(AuthError::Internal("no authentication gates configured".into()));
        }
        let timeout = config.gate_timeout();
        let outcomes = join_all(
            self.gates
                .iter()
                .map(|gate| run_gate(gate.as_ref(), device_id, request, context, timeout)),
        )
        .await;
        let gate_results = outcomes.into_iter().collect::<AuthResult<Vec<_>>>()?;

        let synthesis = synthesize(&gate_results, config);

        let session = match synthesis.decision {
            AuthDecision::Allow | AuthDecision::Limited => {
                let limited = synthesis.decision == AuthDecision::Limited;
                let ttl_secs = if limited {
                    config.limited_token_ttl_secs
                } else {
                    config.session_token_ttl_secs
                };
                Some(
                    self.sessions
                        .mint(
                            device_id,
                            synthesis.identity.clone(),
                            chrono::Duration::seconds(ttl_secs as i64),
                            limited,
                            context.origin.clone(),
                        )
                        .await?,
                )
            }
            AuthDecision::Deny | AuthDecision::ManualReview => None,
        };

        Ok(AuthenticationVerdict {
            id: Uuid::new_v4(),
            device_id: device_id.clone(),
            decision: synthesis.decision,
            confidence: synthesis.confidence,
            identity: synthesis.identity,
            gates_required: self.gate_ids(),
            gates_succeeded: gate_results.iter().filter(|r| r.success).map(|r| r.gate).collect(),
            gates_failed: gate_results.iter().filter(|r| !r.success).map(|r| r.gate).collect(),
            gate_results,
            reasoning: synthesis.reasoning,
            manual_review: synthesis.manual_review,
            session,
            restrictions: synthesis.restrictions,
            decided_at: self.clock.now(),
            processing_ms: elapsed_ms(started),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{GateEvidence, GateFinding};
    use crate::gates::sign_attestation;
    use crate::mocks::{PanickingGate, StaticGate};
    use crate::registry::BehavioralProfile;
    use crate::request::BehavioralSample;
    use ed25519_dalek::SigningKey;
    use proptest::prelude::*;
    use warden_audit::AuditConfig;
    use warden_storage::{MemoryKvStore, SharedKvStore};
    use warden_types::SystemClock;

    async fn orchestrator(gates: Vec<Arc<dyn AuthGate>>) -> AuthGateOrchestrator {
        let store: SharedKvStore = Arc::new(MemoryKvStore::new());
        let clock: SharedClock = Arc::new(SystemClock);
        let audit = Arc::new(
            AuditLog::open("auth", &AuditConfig::default(), store.clone(), clock.clone())
                .await
                .unwrap(),
        );
        let sessions = Arc::new(SessionTokenTable::new(store, clock.clone()));
        let config = Arc::new(ConfigCell::new(AuthConfig::default()));
        gates.into_iter().fold(
            AuthGateOrchestrator::new(config, sessions, audit, clock),
            |o, g| o.with_gate(g),
        )
    }

    fn all_failed() -> Vec<Arc<dyn AuthGate>> {
        GateId::ALL
            .iter()
            .map(|id| Arc::new(StaticGate::failed(*id, "absent")) as Arc<dyn AuthGate>)
            .collect()
    }

    fn replace(mut gates: Vec<Arc<dyn AuthGate>>, gate: StaticGate) -> Vec<Arc<dyn AuthGate>> {
        let id = gate.gate_id();
        gates.retain(|g| g.gate_id() != id);
        gates.push(Arc::new(gate));
        gates
    }

    #[tokio::test]
    async fn zero_successes_deny_without_token() {
        let orch = orchestrator(all_failed()).await;
        let verdict = orch
            .authenticate(&DeviceId::new("d1"), &AuthRequest::default(), &AuthContext::default())
            .await;
        assert_eq!(verdict.decision, AuthDecision::Deny);
        assert!(verdict.session.is_none());
        assert!(verdict.reasoning.contains("No authentication gate succeeded"));
        assert_eq!(verdict.gates_failed.len(), 4);
        assert_eq!(orch.audit_log().len(), 1);
    }

    #[tokio::test]
    async fn crypto_fast_path_beats_hard_failure() {
        let gates = replace(
            replace(
                all_failed(),
                StaticGate::verified(GateId::CryptoAttestation, 95.0, "alice"),
            ),
            StaticGate::hard_failure(GateId::SessionIntegrity, "session token replayed"),
        );
        let orch = orchestrator(gates).await;
        let verdict = orch
            .authenticate(&DeviceId::new("d1"), &AuthRequest::default(), &AuthContext::default())
            .await;
        assert_eq!(verdict.decision, AuthDecision::Allow);
        assert_eq!(verdict.identity, Some(IdentityId::new("alice")));
        let grant = verdict.session.expect("token minted on ALLOW");
        assert!(!grant.limited);
    }

    #[tokio::test]
    async fn hard_failure_denies() {
        let gates = replace(
            replace(all_failed(), StaticGate::verified(GateId::BehavioralCodex, 90.0, "alice")),
            StaticGate::hard_failure(GateId::CryptoAttestation, "device credential revoked"),
        );
        let verdict = orchestrator(gates)
            .await
            .authenticate(&DeviceId::new("d1"), &AuthRequest::default(), &AuthContext::default())
            .await;
        assert_eq!(verdict.decision, AuthDecision::Deny);
        assert!(verdict.reasoning.contains("device credential revoked"));
    }

    #[tokio::test]
    async fn two_strong_gates_allow() {
        let gates = replace(
            replace(all_failed(), StaticGate::verified(GateId::BehavioralCodex, 80.0, "alice")),
            StaticGate::verified(GateId::SemanticNonce, 85.0, "alice"),
        );
        let verdict = orchestrator(gates)
            .await
            .authenticate(&DeviceId::new("d1"), &AuthRequest::default(), &AuthContext::default())
            .await;
        assert_eq!(verdict.decision, AuthDecision::Allow);
        assert!((verdict.confidence - 82.5).abs() < 1e-9);
        assert!(verdict.session.is_some());
    }

    #[tokio::test]
    async fn single_success_is_limited_with_restrictions() {
        let gates = replace(all_failed(), StaticGate::verified(GateId::SemanticNonce, 85.0, "alice"));
        let verdict = orchestrator(gates)
            .await
            .authenticate(&DeviceId::new("d1"), &AuthRequest::default(), &AuthContext::default())
            .await;
        assert_eq!(verdict.decision, AuthDecision::Limited);
        assert!(verdict.forbids(ActionScope::SystemLevel));
        assert!(!verdict.forbids(ActionScope::Routine));
        assert!(verdict.session.as_ref().unwrap().limited);
    }

    #[tokio::test]
    async fn identity_conflict_forces_manual_review() {
        let gates = replace(
            replace(all_failed(), StaticGate::verified(GateId::CryptoAttestation, 95.0, "alice")),
            StaticGate::verified(GateId::BehavioralCodex, 90.0, "mallory"),
        );
        let verdict = orchestrator(gates)
            .await
            .authenticate(&DeviceId::new("d1"), &AuthRequest::default(), &AuthContext::default())
            .await;
        assert_eq!(verdict.decision, AuthDecision::ManualReview);
        assert!(verdict.manual_review);
        assert!(verdict.session.is_none());
        assert!(verdict.reasoning.contains("mallory"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_gate_times_out_as_failure() {
        let gates = replace(
            all_failed(),
            StaticGate::verified(GateId::CryptoAttestation, 95.0, "alice")
                .with_delay(Duration::from_secs(5)),
        );
        let verdict = orchestrator(gates)
            .await
            .authenticate(&DeviceId::new("d1"), &AuthRequest::default(), &AuthContext::default())
            .await;
        assert_eq!(verdict.decision, AuthDecision::Deny);
        let crypto = verdict
            .gate_results
            .iter()
            .find(|r| r.gate == GateId::CryptoAttestation)
            .unwrap();
        assert!(crypto.timed_out);
        assert!(!crypto.success);
    }

    #[tokio::test]
    async fn gate_error_becomes_failed_result() {
        let gates = replace(
            replace(
                all_failed(),
                StaticGate::erroring(GateId::SessionIntegrity, "store offline"),
            ),
            StaticGate::verified(GateId::CryptoAttestation, 95.0, "alice"),
        );
        let verdict = orchestrator(gates)
            .await
            .authenticate(&DeviceId::new("d1"), &AuthRequest::default(), &AuthContext::default())
            .await;
        assert_eq!(verdict.decision, AuthDecision::Allow);
        let session = verdict
            .gate_results
            .iter()
            .find(|r| r.gate == GateId::SessionIntegrity)
            .unwrap();
        assert!(session.errors[0].contains("store offline"));
    }

    #[tokio::test]
    async fn panicking_gate_denies_with_manual_review() {
        let gates = replace(
            replace(all_failed(), StaticGate::verified(GateId::CryptoAttestation, 95.0, "alice")),
            StaticGate::failed(GateId::SemanticNonce, "absent"),
        );
        let mut gates = gates;
        gates.retain(|g| g.gate_id() != GateId::BehavioralCodex);
        gates.push(Arc::new(PanickingGate(GateId::BehavioralCodex)));

        let orch = orchestrator(gates).await;
        let verdict = orch
            .authenticate(&DeviceId::new("d1"), &AuthRequest::default(), &AuthContext::default())
            .await;
        assert_eq!(verdict.decision, AuthDecision::Deny);
        assert!(verdict.manual_review);
        assert!(verdict.reasoning.contains("MANUAL_REVIEW"));
        assert_eq!(orch.audit_log().len(), 1);
    }

    #[tokio::test]
    async fn standard_gates_end_to_end() {
        let store: SharedKvStore = Arc::new(MemoryKvStore::new());
        let clock: SharedClock = Arc::new(SystemClock);
        let audit = Arc::new(
            AuditLog::open("auth", &AuditConfig::default(), store.clone(), clock.clone())
                .await
                .unwrap(),
        );
        let sessions = Arc::new(SessionTokenTable::new(store, clock.clone()));
        let registry = Arc::new(DeviceRegistry::new());
        let key = SigningKey::from_bytes(&[5u8; 32]);
        let device = DeviceId::new("phone-1");
        registry.enroll_device(device.clone(), IdentityId::new("alice"), key.verifying_key());
        registry.set_profile(
            IdentityId::new("alice"),
            BehavioralProfile {
                signature_phrases: vec!["righto".into()],
                typical_cadence_ms: None,
            },
        );
        let orch = AuthGateOrchestrator::standard(
            Arc::new(ConfigCell::new(AuthConfig::default())),
            registry,
            Arc::new(NonceIssuer::new(clock.clone())),
            sessions,
            audit,
            clock,
        );

        let first = AuthRequest {
            attestation: Some(sign_attestation(&key, &device, "challenge-1")),
            ..AuthRequest::default()
        };
        let verdict = orch.authenticate(&device, &first, &AuthContext::default()).await;
        assert_eq!(verdict.decision, AuthDecision::Allow);
        let token = verdict.session.unwrap().token;

        // session token plus behavioral sample reach quorum without crypto
        let second = AuthRequest {
            behavior: Some(BehavioralSample {
                phrases: vec!["righto then".into()],
                cadence_ms: None,
            }),
            session_token: Some(token.clone()),
            ..AuthRequest::default()
        };
        let verdict = orch.authenticate(&device, &second, &AuthContext::default()).await;
        assert_eq!(verdict.decision, AuthDecision::Allow, "{}", verdict.reasoning);

        // the consumed token is now a replay
        let replay = AuthRequest {
            session_token: Some(token),
            ..AuthRequest::default()
        };
        let verdict = orch.authenticate(&device, &replay, &AuthContext::default()).await;
        assert_eq!(verdict.decision, AuthDecision::Deny);
        assert!(verdict.reasoning.contains("replayed"));
    }

    fn result(gate: GateId, success: bool, confidence: f64, hard: bool) -> GateResult {
        if success {
            GateResult::from_finding(
                gate,
                GateFinding::Verified {
                    confidence,
                    evidence: match gate {
                        GateId::CryptoAttestation => GateEvidence::CryptoAttestation {
                            identity: IdentityId::new("alice"),
                            key_fingerprint: "k".into(),
                        },
                        _ => GateEvidence::Absent,
                    },
                },
                0,
            )
        } else if hard {
            GateResult::from_finding(gate, GateFinding::hard_failure("hard"), 0)
        } else {
            GateResult::failure(gate, "absent", 0)
        }
    }

    proptest! {
        #[test]
        fn no_success_always_denies(hard in proptest::collection::vec(any::<bool>(), 4)) {
            let results: Vec<GateResult> = GateId::ALL
                .iter()
                .zip(hard)
                .map(|(id, h)| result(*id, false, 0.0, h))
                .collect();
            let synthesis = synthesize(&results, &AuthConfig::default());
            prop_assert_eq!(synthesis.decision, AuthDecision::Deny);
            prop_assert!(!synthesis.reasoning.is_empty());
        }

        #[test]
        fn strong_crypto_always_allows(
            crypto_conf in 90.0f64..=100.0,
            others in proptest::collection::vec((any::<bool>(), 0.0f64..=100.0, any::<bool>()), 3),
        ) {
            let mut results = vec![result(GateId::CryptoAttestation, true, crypto_conf, false)];
            for (id, (success, conf, hard)) in GateId::ALL[1..].iter().zip(others) {
                results.push(result(*id, success, conf, hard));
            }
            let synthesis = synthesize(&results, &AuthConfig::default());
            prop_assert_eq!(synthesis.decision, AuthDecision::Allow);
        }

        #[test]
        fn synthesis_reasoning_never_empty(
            gates in proptest::collection::vec((any::<bool>(), 0.0f64..=100.0, any::<bool>()), 4),
        ) {
            let results: Vec<GateResult> = GateId::ALL
                .iter()
                .zip(gates)
                .map(|(id, (s, c, h))| result(*id, s, c, h))
                .collect();
            let synthesis = synthesize(&results, &AuthConfig::default());
            prop_assert!(!synthesis.reasoning.is_empty());
        }
    }
}
