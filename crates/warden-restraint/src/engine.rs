use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use warden_audit::{AuditLog, OutcomeTracking};
use warden_telemetry::{EmotionalTelemetrySnapshot, TelemetrySource};
use warden_types::{ActionScope, CapabilityFit, ConfigCell, SharedClock};

use crate::config::RestraintConfig;
use crate::context::RestraintContext;
use crate::counters::{FrequencyState, OverrideGrant, RestraintCounters};
use crate::error::{RestraintError, RestraintResult};
use crate::verdict::{
    CoolingOff, RestraintAction, RestraintAuditEntry, RestraintPriority, RestraintVerdict,
};

struct Decision {
    verdict: RestraintVerdict,
    snapshot: EmotionalTelemetrySnapshot,
    override_granted: bool,
    /// Frequency slot taken by a releasing verdict.
    reserved_release: Option<DateTime<Utc>>,
}

/// The terminal gating stage.
///
/// Checks run in a fixed order and the first one that forces an outcome
/// wins: emergency override, acute emotional constraint, capability fit,
/// frequency, moderate emotional constraint. Downgrades to MODIFY from the
/// later checks accumulate.
pub struct RestraintDecisionEngine {
    config: Arc<ConfigCell<RestraintConfig>>,
    telemetry: Arc<dyn TelemetrySource>,
    counters: RestraintCounters,
    audit: Arc<AuditLog<RestraintAuditEntry>>,
    clock: SharedClock,
}

impl RestraintDecisionEngine {
    pub fn new(
        config: Arc<ConfigCell<RestraintConfig>>,
        telemetry: Arc<dyn TelemetrySource>,
        counters: RestraintCounters,
        audit: Arc<AuditLog<RestraintAuditEntry>>,
        clock: SharedClock,
    ) -> RestraintResult<Self> {
        config
            .load()
            .value
            .validate()
            .map_err(RestraintError::InvalidConfig)?;
        Ok(Self {
            config,
            telemetry,
            counters,
            audit,
            clock,
        })
    }

    pub fn counters(&self) -> &RestraintCounters {
        &self.counters
    }

    pub fn audit_log(&self) -> &Arc<AuditLog<RestraintAuditEntry>> {
        &self.audit
    }

    /// Expiry of the active emergency override, if one is open.
    pub fn emergency_override_active(&self) -> Option<DateTime<Utc>> {
        self.counters.override_active(self.clock.now())
    }

    pub fn deactivate_emergency_override(&self) -> bool {
        let closed = self.counters.deactivate_override();
        if closed {
            info!("Emergency override deactivated manually");
        }
        closed
    }

    /// Attach the outcome of an evaluated action to its audit entry and feed
    /// it to telemetry. Permitted once per entry.
    pub async fn record_outcome(
        &self,
        audit_id: Uuid,
        outcome: OutcomeTracking,
    ) -> RestraintResult<()> {
        let complications = outcome.complications;
        self.audit.record_outcome(audit_id, outcome).await?;
        self.telemetry.observe_outcome(audit_id, complications);
        debug!(audit_id = %audit_id, complications, "Restraint outcome recorded");
        Ok(())
    }

    /// Decide whether `description` may go ahead. Never fails: internal
    /// faults become HOLD. Appends exactly one audit entry.
    pub async fn evaluate(&self, description: &str, context: &RestraintContext) -> RestraintVerdict {
        let now = self.clock.now();
        let config = self.config.load();

        let (mut verdict, snapshot, override_granted, reserved_release) =
            match self.decide(context, &config.value, now) {
                Ok(decision) => (
                    decision.verdict,
                    Some(decision.snapshot),
                    decision.override_granted,
                    decision.reserved_release,
                ),
                Err(e) => {
                    error!(error = %e, scope = %context.scope, "Restraint evaluation internal fault");
                    (RestraintVerdict::internal_fault(&e.to_string(), now), None, false, None)
                }
            };

        let entry = RestraintAuditEntry {
            description: description.to_string(),
            context: context.clone(),
            verdict: verdict.clone(),
            telemetry: snapshot,
        };
        match self.audit.append(entry).await {
            Ok(record) => verdict.audit_id = Some(record.id),
            Err(e) => {
                error!(error = %e, "Restraint audit write failed");
                if override_granted {
                    self.counters.deactivate_override();
                }
                if let Some(at) = reserved_release {
                    self.counters.cancel_release(at);
                }
                return RestraintVerdict::internal_fault(&format!("audit log unavailable: {e}"), now);
            }
        }

        if verdict.action.releases_action() && context.scope.is_major() {
            self.counters.note_major_action(now);
        }
        if let Some(id) = verdict.audit_id {
            self.telemetry.observe_decision(id, verdict.confidence);
        }

        match verdict.action {
            RestraintAction::Proceed => debug!(
                scope = %context.scope,
                confidence = verdict.confidence,
                "Restraint: proceed"
            ),
            RestraintAction::Modify => info!(
                scope = %context.scope,
                suggestions = verdict.modifications.len(),
                "Restraint: modify"
            ),
            action => warn!(
                scope = %context.scope,
                action = %action,
                priority = ?verdict.priority,
                cooling_off_secs = verdict.cooling_off.as_ref().map(|c| c.secs),
                reason = %verdict.reasoning_text(),
                "Restraint withheld normal execution"
            ),
        }
        verdict
    }

    fn decide(
        &self,
        context: &RestraintContext,
        config: &RestraintConfig,
        now: DateTime<Utc>,
    ) -> RestraintResult<Decision> {
        if !(1..=5).contains(&context.urgency) {
            return Err(RestraintError::InvalidUrgency(context.urgency));
        }
        let snapshot = std::panic::catch_unwind(AssertUnwindSafe(|| self.telemetry.snapshot()))
            .map_err(|_| RestraintError::TelemetryPanicked)?;

        let mut reasoning = Vec::new();
        let mut modifications = Vec::new();

        // 1. Emergency
        let triggers = self.emergency_triggers(context, config, now);
        if !triggers.is_empty() {
            let criteria = triggers.join(", ");
            if !context.override_permitted {
                reasoning.push(format!(
                    "Emergency criteria met ({criteria}) but override requires full authentication"
                ));
            } else {
                let grant = self.counters.request_override(
                    now,
                    config.override_duration(),
                    config.override_cooldown(),
                );
                match grant {
                    OverrideGrant::Granted { until } | OverrideGrant::Active { until } => {
                        let granted = matches!(grant, OverrideGrant::Granted { .. });
                        reasoning.push(format!(
                            "Emergency override {} until {}",
                            if granted { "granted" } else { "active" },
                            until.to_rfc3339()
                        ));
                        let mut verdict = base_verdict(
                            RestraintAction::EmergencyOverride,
                            0.9,
                            reasoning,
                            RestraintPriority::Critical,
                            now,
                        );
                        verdict.justification = Some(criteria);
                        return Ok(finish(verdict, snapshot, config, granted));
                    }
                    OverrideGrant::CoolingDown { until } => reasoning.push(format!(
                        "Emergency criteria met ({criteria}) but override cooling down until {}",
                        until.to_rfc3339()
                    )),
                }
            }
        }

        // 2. Acute emotional constraint
        let stress_critical = snapshot.stress >= config.stress_critical;
        let fatigue_critical = snapshot.fatigue >= config.fatigue_critical;
        let pressured = snapshot.time_pressure >= config.time_pressure_high
            && snapshot.stress >= config.stress_elevated;
        let acute = match (stress_critical, fatigue_critical) {
            (true, true) => Some((
                config.cooling_off_both_critical_mins,
                "Stress and fatigue are both critical",
            )),
            (true, false) => Some((config.cooling_off_single_critical_mins, "Stress is critical")),
            (false, true) => Some((config.cooling_off_single_critical_mins, "Fatigue is critical")),
            (false, false) if pressured => Some((
                config.cooling_off_pressure_mins,
                "High time pressure combined with elevated stress",
            )),
            _ => None,
        };
        if let Some((mins, why)) = acute {
            reasoning.push(format!(
                "{why} (stress {:.0}, fatigue {:.0}, time pressure {:.0})",
                snapshot.stress, snapshot.fatigue, snapshot.time_pressure
            ));
            let mut verdict =
                base_verdict(RestraintAction::Hold, 0.9, reasoning, RestraintPriority::High, now);
            verdict.modifications = vec![format!("Take a {mins}-minute break before retrying")];
            verdict.cooling_off = Some(CoolingOff::minutes(mins, now));
            return Ok(finish(verdict, snapshot, config, false));
        }

        // 3. Capability fit
        let mut fit = context.capability_fit;
        if context.scope.complexity_weight() >= config.complexity_weight_threshold {
            fit = fit.worsen();
        }
        let mut downgrade = false;
        match fit {
            CapabilityFit::FarBeyond => {
                reasoning.push(format!(
                    "A {} action is far beyond current capabilities",
                    context.scope
                ));
                let mut verdict =
                    base_verdict(RestraintAction::Hold, 0.9, reasoning, RestraintPriority::High, now);
                verdict.modifications = vec![
                    "Delegate to an operator qualified for this scope".into(),
                    "Split the action into smaller steps".into(),
                ];
                return Ok(finish(verdict, snapshot, config, false));
            }
            CapabilityFit::ExceedingLimits => {
                reasoning.push(format!(
                    "A {} action exceeds current capability limits",
                    context.scope
                ));
                let mut verdict = base_verdict(
                    RestraintAction::Escalate,
                    0.8,
                    reasoning,
                    RestraintPriority::High,
                    now,
                );
                verdict.justification =
                    Some("Capability limits exceeded; human review required".into());
                return Ok(finish(verdict, snapshot, config, false));
            }
            CapabilityFit::ApproachingLimits => {
                downgrade = true;
                reasoning.push(format!(
                    "A {} action is approaching capability limits",
                    context.scope
                ));
                modifications.push("Confirm each step before executing".into());
                modifications.push("Prepare a rollback plan".into());
            }
            CapabilityFit::WithinLimits => {}
        }

        // 4. Frequency. Every verdict past this point releases the action,
        // so the slot is reserved here under the counters' lock.
        let reserved = match self.counters.try_reserve_release(
            now,
            config.frequency_window(),
            config.frequency_upper,
        ) {
            FrequencyState::Exhausted { released } => {
                reasoning.push(format!(
                    "{released} actions released in the trailing window (cap {})",
                    config.frequency_upper
                ));
                let mut verdict = base_verdict(
                    RestraintAction::Hold,
                    0.85,
                    reasoning,
                    RestraintPriority::Medium,
                    now,
                );
                verdict.cooling_off =
                    Some(CoolingOff::minutes(config.cooling_off_frequency_mins, now));
                return Ok(finish(verdict, snapshot, config, false));
            }
            FrequencyState::Reserved { at, prior } => {
                if prior >= config.frequency_lower {
                    downgrade = true;
                    reasoning.push(format!(
                        "{prior} actions released in the trailing window (soft limit {})",
                        config.frequency_lower
                    ));
                    modifications.push("Batch or defer non-essential actions".into());
                }
                at
            }
        };

        // 5. Moderate emotional constraint
        if snapshot.stress >= config.stress_elevated || snapshot.fatigue >= config.fatigue_elevated {
            downgrade = true;
            reasoning.push(format!(
                "Elevated stress {:.0} or fatigue {:.0}",
                snapshot.stress, snapshot.fatigue
            ));
            modifications.push("Double-check inputs before executing".into());
        }

        if downgrade {
            let mut verdict =
                base_verdict(RestraintAction::Modify, 0.7, reasoning, RestraintPriority::Medium, now);
            verdict.modifications = modifications;
            return Ok(finish(verdict, snapshot, config, false).with_reservation(reserved));
        }

        // 6. Default
        reasoning.push("No restraint factors triggered".into());
        let load = snapshot.stress.max(snapshot.fatigue) / 100.0;
        let floor = config.proceed_confidence_floor;
        let confidence = floor + (1.0 - floor) * (1.0 - load);
        let verdict =
            base_verdict(RestraintAction::Proceed, confidence, reasoning, RestraintPriority::Low, now);
        Ok(finish(verdict, snapshot, config, false).with_reservation(reserved))
    }

    fn emergency_triggers(
        &self,
        context: &RestraintContext,
        config: &RestraintConfig,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut triggers = Vec::new();
        if context.urgency == 5 {
            triggers.push("urgency 5".to_string());
        } else if context.scope == ActionScope::SystemLevel && context.urgency >= 4 {
            triggers.push(format!("system-level action at urgency {}", context.urgency));
        }
        let dormant_secs = context.since_last_major_action_secs.or_else(|| {
            self.counters
                .last_major_action()
                .map(|at| (now - at).num_seconds())
        });
        if let Some(secs) = dormant_secs {
            if secs > config.dormancy_emergency_secs {
                triggers.push(format!("{}h since last major action", secs / 3600));
            }
        }
        triggers
    }
}

fn base_verdict(
    action: RestraintAction,
    confidence: f64,
    reasoning: Vec<String>,
    priority: RestraintPriority,
    at: DateTime<Utc>,
) -> RestraintVerdict {
    RestraintVerdict {
        action,
        confidence,
        reasoning,
        modifications: Vec::new(),
        cooling_off: None,
        justification: None,
        audit_required: false,
        priority,
        decided_at: at,
        audit_id: None,
    }
}

fn finish(
    mut verdict: RestraintVerdict,
    snapshot: EmotionalTelemetrySnapshot,
    config: &RestraintConfig,
    override_granted: bool,
) -> Decision {
    verdict.audit_required = verdict.action != RestraintAction::Proceed
        || verdict.priority >= RestraintPriority::High
        || snapshot.stress > config.stress_warning;
    Decision {
        verdict,
        snapshot,
        override_granted,
        reserved_release: None,
    }
}

impl Decision {
    fn with_reservation(mut self, at: DateTime<Utc>) -> Self {
        self.reserved_release = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use warden_audit::{AuditConfig, AuditError};
    use std::sync::atomic::{AtomicBool, Ordering};
    use async_trait::async_trait;
    use futures::future::join_all;
    use serde_json::Value;
    use warden_storage::{KvStore, MemoryKvStore, SharedKvStore, StorageError, StorageResult};
    use warden_telemetry::FixedTelemetry;
    use warden_types::{Clock, ManualClock};

    struct Harness {
        engine: RestraintDecisionEngine,
        telemetry: Arc<FixedTelemetry>,
        clock: Arc<ManualClock>,
    }

    async fn harness(stress: f64, fatigue: f64, time_pressure: f64) -> Harness {
        let telemetry = Arc::new(FixedTelemetry::levels(stress, fatigue, time_pressure));
        let clock = Arc::new(ManualClock::starting_now());
        let engine = engine_with(telemetry.clone(), clock.clone()).await;
        Harness {
            engine,
            telemetry,
            clock,
        }
    }

    async fn engine_with(
        telemetry: Arc<dyn TelemetrySource>,
        clock: Arc<ManualClock>,
    ) -> RestraintDecisionEngine {
        engine_over(Arc::new(MemoryKvStore::new()), telemetry, clock).await
    }

    async fn engine_over(
        store: SharedKvStore,
        telemetry: Arc<dyn TelemetrySource>,
        clock: Arc<ManualClock>,
    ) -> RestraintDecisionEngine {
        let audit = AuditLog::open("restraint", &AuditConfig::default(), store, clock.clone())
            .await
            .unwrap();
        RestraintDecisionEngine::new(
            Arc::new(ConfigCell::new(RestraintConfig::default())),
            telemetry,
            RestraintCounters::new(),
            Arc::new(audit),
            clock,
        )
        .unwrap()
    }

    fn routine() -> RestraintContext {
        RestraintContext::new(ActionScope::Routine, 2)
    }

    /// Store whose writes yield before landing, so concurrent appends
    /// interleave. Writes fail while `failing` is set.
    struct SlowStore {
        inner: MemoryKvStore,
        failing: AtomicBool,
    }

    impl SlowStore {
        fn new() -> Self {
            Self {
                inner: MemoryKvStore::new(),
                failing: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl KvStore for SlowStore {
        async fn put(&self, key: &str, value: Value) -> StorageResult<()> {
            tokio::task::yield_now().await;
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::Backend("disk full".into()));
            }
            self.inner.put(key, value).await
        }

        async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
            self.inner.get(key).await
        }

        async fn take(&self, key: &str) -> StorageResult<Option<Value>> {
            self.inner.take(key).await
        }

        async fn delete(&self, key: &str) -> StorageResult<bool> {
            self.inner.delete(key).await
        }

        async fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<(String, Value)>> {
            self.inner.scan_prefix(prefix).await
        }
    }

    #[tokio::test]
    async fn calm_routine_action_proceeds() {
        let h = harness(10.0, 10.0, 0.0).await;
        let verdict = h.engine.evaluate("summarize notes", &routine()).await;
        assert_eq!(verdict.action, RestraintAction::Proceed);
        assert!(verdict.confidence >= 0.8);
        assert!(verdict.reasoning_text().contains("No restraint factors"));
        assert!(!verdict.audit_required);
        assert!(verdict.audit_id.is_some());
        assert_eq!(h.engine.audit_log().len(), 1);
    }

    #[tokio::test]
    async fn urgency_five_grants_override() {
        let h = harness(95.0, 95.0, 100.0).await;
        let context = RestraintContext::new(ActionScope::Moderate, 5).with_override_permitted(true);
        let verdict = h.engine.evaluate("page on-call", &context).await;
        assert_eq!(verdict.action, RestraintAction::EmergencyOverride);
        assert_eq!(verdict.priority, RestraintPriority::Critical);
        assert!(verdict.audit_required);
        assert!(verdict.justification.as_deref().unwrap().contains("urgency 5"));
        assert!(h.engine.emergency_override_active().is_some());
    }

    #[tokio::test]
    async fn system_level_at_urgency_four_is_an_emergency() {
        let h = harness(10.0, 10.0, 0.0).await;
        let context =
            RestraintContext::new(ActionScope::SystemLevel, 4).with_override_permitted(true);
        let verdict = h.engine.evaluate("failover", &context).await;
        assert_eq!(verdict.action, RestraintAction::EmergencyOverride);
    }

    #[tokio::test]
    async fn override_requires_full_authentication() {
        let h = harness(10.0, 10.0, 0.0).await;
        let context = RestraintContext::new(ActionScope::Routine, 5);
        let verdict = h.engine.evaluate("page on-call", &context).await;
        assert_eq!(verdict.action, RestraintAction::Proceed);
        assert!(verdict.reasoning_text().contains("requires full authentication"));
        assert!(h.engine.emergency_override_active().is_none());
    }

    #[tokio::test]
    async fn override_expires_lazily_and_cooldown_applies() {
        let h = harness(10.0, 10.0, 0.0).await;
        let context = RestraintContext::new(ActionScope::Routine, 5).with_override_permitted(true);
        h.engine.evaluate("page on-call", &context).await;

        h.clock.advance(Duration::minutes(16));
        assert!(h.engine.emergency_override_active().is_none());

        let again = h.engine.evaluate("page on-call", &context).await;
        assert_eq!(again.action, RestraintAction::Proceed);
        assert!(again.reasoning_text().contains("cooling down"));

        h.clock.advance(Duration::minutes(45));
        let later = h.engine.evaluate("page on-call", &context).await;
        assert_eq!(later.action, RestraintAction::EmergencyOverride);
    }

    #[tokio::test]
    async fn manual_deactivation() {
        let h = harness(10.0, 10.0, 0.0).await;
        let context = RestraintContext::new(ActionScope::Routine, 5).with_override_permitted(true);
        h.engine.evaluate("page on-call", &context).await;
        assert!(h.engine.deactivate_emergency_override());
        assert!(h.engine.emergency_override_active().is_none());
    }

    #[tokio::test]
    async fn long_dormancy_is_an_emergency() {
        let h = harness(10.0, 10.0, 0.0).await;
        let context = routine()
            .with_override_permitted(true)
            .with_since_last_major_action(80 * 3600);
        let verdict = h.engine.evaluate("resume operations", &context).await;
        assert_eq!(verdict.action, RestraintAction::EmergencyOverride);
        assert!(verdict.justification.unwrap().contains("80h"));
    }

    #[tokio::test]
    async fn critical_stress_and_fatigue_hold_longest() {
        let h = harness(90.0, 90.0, 0.0).await;
        let context = RestraintContext::new(ActionScope::Complex, 3);
        let verdict = h.engine.evaluate("refactor billing", &context).await;
        assert_eq!(verdict.action, RestraintAction::Hold);
        assert_eq!(verdict.priority, RestraintPriority::High);
        assert_eq!(verdict.cooling_off.unwrap().secs, 45 * 60);
    }

    #[tokio::test]
    async fn single_critical_and_pressure_holds() {
        let h = harness(90.0, 10.0, 0.0).await;
        let verdict = h.engine.evaluate("deploy", &routine()).await;
        assert_eq!(verdict.cooling_off.unwrap().secs, 20 * 60);

        h.telemetry
            .set(EmotionalTelemetrySnapshot::with_levels(65.0, 10.0, 85.0));
        let verdict = h.engine.evaluate("deploy", &routine()).await;
        assert_eq!(verdict.action, RestraintAction::Hold);
        assert_eq!(verdict.cooling_off.unwrap().secs, 10 * 60);
    }

    #[tokio::test]
    async fn capability_fit_outcomes() {
        let h = harness(10.0, 10.0, 0.0).await;
        let far = routine().with_capability_fit(CapabilityFit::FarBeyond);
        assert_eq!(h.engine.evaluate("a", &far).await.action, RestraintAction::Hold);

        let exceeding = routine().with_capability_fit(CapabilityFit::ExceedingLimits);
        let verdict = h.engine.evaluate("b", &exceeding).await;
        assert_eq!(verdict.action, RestraintAction::Escalate);
        assert!(verdict.justification.is_some());

        let approaching = routine().with_capability_fit(CapabilityFit::ApproachingLimits);
        let verdict = h.engine.evaluate("c", &approaching).await;
        assert_eq!(verdict.action, RestraintAction::Modify);
        assert!(!verdict.modifications.is_empty());

        // complexity weight 4 worsens within_limits to approaching
        let complex = RestraintContext::new(ActionScope::Complex, 2);
        assert_eq!(h.engine.evaluate("d", &complex).await.action, RestraintAction::Modify);
    }

    #[tokio::test]
    async fn frequency_soft_then_hard_limit() {
        let h = harness(10.0, 10.0, 0.0).await;
        for _ in 0..10 {
            assert_eq!(
                h.engine.evaluate("send", &routine()).await.action,
                RestraintAction::Proceed
            );
        }
        assert_eq!(
            h.engine.evaluate("send", &routine()).await.action,
            RestraintAction::Modify
        );

        let now = h.clock.now();
        for _ in 0..9 {
            h.engine.counters().record_release(now);
        }
        let verdict = h.engine.evaluate("send", &routine()).await;
        assert_eq!(verdict.action, RestraintAction::Hold);
        assert_eq!(verdict.cooling_off.unwrap().secs, 15 * 60);

        h.clock.advance(Duration::minutes(61));
        assert_eq!(
            h.engine.evaluate("send", &routine()).await.action,
            RestraintAction::Proceed
        );
    }

    #[tokio::test]
    async fn concurrent_evaluations_share_one_remaining_slot() {
        let clock = Arc::new(ManualClock::starting_now());
        let engine = engine_over(
            Arc::new(SlowStore::new()),
            Arc::new(FixedTelemetry::levels(10.0, 10.0, 0.0)),
            clock.clone(),
        )
        .await;
        let now = clock.now();
        for _ in 0..19 {
            engine.counters().record_release(now);
        }

        let context = routine();
        let verdicts = join_all((0..10).map(|_| engine.evaluate("send", &context))).await;

        let released = verdicts.iter().filter(|v| v.action.releases_action()).count();
        assert_eq!(released, 1);
        assert_eq!(
            verdicts
                .iter()
                .filter(|v| v.action == RestraintAction::Hold)
                .count(),
            9
        );
        assert_eq!(engine.counters().released_within(now, Duration::hours(1)), 20);
        assert_eq!(engine.audit_log().len(), 10);
    }

    #[tokio::test]
    async fn failed_audit_write_returns_the_slot() {
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(SlowStore::new());
        let engine = engine_over(
            store.clone(),
            Arc::new(FixedTelemetry::levels(10.0, 10.0, 0.0)),
            clock.clone(),
        )
        .await;
        let now = clock.now();

        store.failing.store(true, Ordering::SeqCst);
        let verdict = engine.evaluate("send", &routine()).await;
        assert_eq!(verdict.action, RestraintAction::Hold);
        assert_eq!(engine.counters().released_within(now, Duration::hours(1)), 0);

        store.failing.store(false, Ordering::SeqCst);
        let verdict = engine.evaluate("send", &routine()).await;
        assert_eq!(verdict.action, RestraintAction::Proceed);
        assert_eq!(engine.counters().released_within(now, Duration::hours(1)), 1);
    }

    #[tokio::test]
    async fn elevated_stress_downgrades_and_audits() {
        let h = harness(65.0, 10.0, 0.0).await;
        let verdict = h.engine.evaluate("send", &routine()).await;
        assert_eq!(verdict.action, RestraintAction::Modify);
        assert!(verdict.audit_required);

        h.telemetry
            .set(EmotionalTelemetrySnapshot::with_levels(55.0, 10.0, 0.0));
        let verdict = h.engine.evaluate("send", &routine()).await;
        assert_eq!(verdict.action, RestraintAction::Proceed);
        assert!(verdict.audit_required);
    }

    #[tokio::test]
    async fn major_proceed_is_remembered() {
        let h = harness(10.0, 10.0, 0.0).await;
        let context = RestraintContext::new(ActionScope::Significant, 2);
        assert_eq!(
            h.engine.evaluate("migrate", &context).await.action,
            RestraintAction::Proceed
        );
        assert_eq!(h.engine.counters().last_major_action(), Some(h.clock.now()));
    }

    #[tokio::test]
    async fn invalid_urgency_holds() {
        let h = harness(10.0, 10.0, 0.0).await;
        let verdict = h
            .engine
            .evaluate("send", &RestraintContext::new(ActionScope::Routine, 0))
            .await;
        assert_eq!(verdict.action, RestraintAction::Hold);
        assert!(verdict.reasoning_text().contains("urgency"));
        assert_eq!(h.engine.audit_log().len(), 1);
    }

    struct PanickingTelemetry;

    impl TelemetrySource for PanickingTelemetry {
        fn snapshot(&self) -> EmotionalTelemetrySnapshot {
            panic!("sensor offline")
        }
    }

    #[tokio::test]
    async fn telemetry_panic_holds() {
        let clock = Arc::new(ManualClock::starting_now());
        let engine = engine_with(Arc::new(PanickingTelemetry), clock).await;
        let verdict = engine.evaluate("send", &routine()).await;
        assert_eq!(verdict.action, RestraintAction::Hold);
        assert_eq!(verdict.priority, RestraintPriority::High);
    }

    #[derive(Default)]
    struct RecordingTelemetry {
        outcomes: Mutex<Vec<(Uuid, bool)>>,
    }

    impl TelemetrySource for RecordingTelemetry {
        fn snapshot(&self) -> EmotionalTelemetrySnapshot {
            EmotionalTelemetrySnapshot::with_levels(10.0, 10.0, 0.0)
        }

        fn observe_outcome(&self, id: Uuid, complications: bool) {
            self.outcomes.lock().push((id, complications));
        }
    }

    #[tokio::test]
    async fn outcome_recorded_once_and_fed_to_telemetry() {
        let telemetry = Arc::new(RecordingTelemetry::default());
        let clock = Arc::new(ManualClock::starting_now());
        let engine = engine_with(telemetry.clone(), clock.clone()).await;
        let verdict = engine.evaluate("send", &routine()).await;
        let id = verdict.audit_id.unwrap();

        let outcome = OutcomeTracking {
            action_completed: true,
            satisfaction_score: Some(8),
            complications: true,
            lessons: vec!["double-check recipients".into()],
            recorded_at: clock.now(),
        };
        engine.record_outcome(id, outcome.clone()).await.unwrap();
        assert_eq!(telemetry.outcomes.lock().as_slice(), &[(id, true)]);
        assert_eq!(
            engine.audit_log().get(id).unwrap().outcome,
            Some(outcome.clone())
        );

        let again = engine.record_outcome(id, outcome).await;
        assert!(matches!(
            again,
            Err(RestraintError::Audit(AuditError::OutcomeAlreadyRecorded(_)))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn critical_stress_always_holds_with_cooling_off(
            stress in 85.0f64..=100.0,
            fatigue in 0.0f64..=100.0,
            urgency in 1u8..=5,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let verdict = rt.block_on(async {
                let h = harness(stress, fatigue, 0.0).await;
                h.engine.evaluate("act", &RestraintContext::new(ActionScope::Moderate, urgency)).await
            });
            prop_assert_eq!(verdict.action, RestraintAction::Hold);
            prop_assert!(verdict.cooling_off.map_or(false, |c| c.secs > 0));
        }

        #[test]
        fn urgency_five_with_fresh_counters_overrides(
            stress in 0.0f64..=100.0,
            fatigue in 0.0f64..=100.0,
            fit in prop_oneof![
                Just(CapabilityFit::WithinLimits),
                Just(CapabilityFit::ApproachingLimits),
                Just(CapabilityFit::ExceedingLimits),
                Just(CapabilityFit::FarBeyond),
            ],
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let verdict = rt.block_on(async {
                let h = harness(stress, fatigue, 100.0).await;
                let context = RestraintContext::new(ActionScope::Routine, 5)
                    .with_capability_fit(fit)
                    .with_override_permitted(true);
                h.engine.evaluate("act", &context).await
            });
            prop_assert_eq!(verdict.action, RestraintAction::EmergencyOverride);
        }
    }
}
