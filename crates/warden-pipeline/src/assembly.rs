use std::sync::Arc;

use tracing::info;
use warden_audit::AuditLog;
use warden_auth::{AuthGateOrchestrator, DeviceRegistry, NonceIssuer, SessionTokenTable};
use warden_config::ConfigHandle;
use warden_restraint::{RestraintCounters, RestraintDecisionEngine};
use warden_storage::SharedKvStore;
use warden_telemetry::{EmotionalTelemetryEstimator, TelemetrySource};
use warden_threat::ThreatPatternSafeguard;
use warden_types::SharedClock;

use crate::error::PipelineResult;
use crate::pipeline::GatingPipeline;

/// Audit log namespaces inside the shared store.
pub const AUTH_AUDIT: &str = "auth";
pub const THREAT_AUDIT: &str = "threat";
pub const RESTRAINT_AUDIT: &str = "restraint";

/// A fully wired Warden instance. Every component is exposed so hosts can
/// enroll devices, issue nonces, feed telemetry and record outcomes.
pub struct Warden {
    pub config: Arc<ConfigHandle>,
    pub registry: Arc<DeviceRegistry>,
    pub nonces: Arc<NonceIssuer>,
    pub sessions: Arc<SessionTokenTable>,
    pub estimator: Arc<EmotionalTelemetryEstimator>,
    pub counters: RestraintCounters,
    pub orchestrator: Arc<AuthGateOrchestrator>,
    pub safeguard: Arc<ThreatPatternSafeguard>,
    pub engine: Arc<RestraintDecisionEngine>,
    pub pipeline: GatingPipeline,
}

impl Warden {
    /// Wire every stage against one store and clock. The restraint stage
    /// reads the built-in estimator.
    pub async fn assemble(
        config: Arc<ConfigHandle>,
        store: SharedKvStore,
        clock: SharedClock,
    ) -> PipelineResult<Self> {
        Self::assemble_with(config, store, clock, None).await
    }

    /// Like [`Warden::assemble`], with the restraint stage reading
    /// `telemetry` instead of the built-in estimator when given.
    pub async fn assemble_with(
        config: Arc<ConfigHandle>,
        store: SharedKvStore,
        clock: SharedClock,
        telemetry: Option<Arc<dyn TelemetrySource>>,
    ) -> PipelineResult<Self> {
        let audit_config = config.audit().clone();
        let auth_audit =
            AuditLog::open(AUTH_AUDIT, &audit_config, store.clone(), clock.clone()).await?;
        let threat_audit =
            AuditLog::open(THREAT_AUDIT, &audit_config, store.clone(), clock.clone()).await?;
        let restraint_audit =
            AuditLog::open(RESTRAINT_AUDIT, &audit_config, store.clone(), clock.clone()).await?;

        let registry = Arc::new(DeviceRegistry::new());
        let nonces = Arc::new(NonceIssuer::new(clock.clone()));
        let sessions = Arc::new(SessionTokenTable::new(store, clock.clone()));
        let orchestrator = Arc::new(AuthGateOrchestrator::standard(
            config.auth(),
            registry.clone(),
            nonces.clone(),
            sessions.clone(),
            Arc::new(auth_audit),
            clock.clone(),
        ));

        let safeguard = Arc::new(ThreatPatternSafeguard::new(
            config.threat(),
            Arc::new(threat_audit),
        )?);

        let estimator = Arc::new(EmotionalTelemetryEstimator::new(
            config.telemetry(),
            clock.clone(),
        ));
        let source: Arc<dyn TelemetrySource> = match telemetry {
            Some(source) => source,
            None => estimator.clone() as Arc<dyn TelemetrySource>,
        };
        let counters = RestraintCounters::new();
        let engine = Arc::new(RestraintDecisionEngine::new(
            config.restraint(),
            source,
            counters.clone(),
            Arc::new(restraint_audit),
            clock,
        )?);

        let pipeline = GatingPipeline::new(orchestrator.clone(), safeguard.clone(), engine.clone())
            .with_telemetry_feed(estimator.clone());

        info!(
            gates = orchestrator.gate_ids().len(),
            archetypes = config.threat().load().value.archetypes.len(),
            audit_capacity = audit_config.capacity,
            "Warden assembled"
        );

        Ok(Self {
            config,
            registry,
            nonces,
            sessions,
            estimator,
            counters,
            orchestrator,
            safeguard,
            engine,
            pipeline,
        })
    }
}
