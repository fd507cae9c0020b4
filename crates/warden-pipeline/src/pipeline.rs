use std::sync::Arc;

use tracing::{debug, info, warn};
use warden_auth::{AuthContext, AuthDecision};
use warden_restraint::{CoolingOff, RestraintContext};
use warden_telemetry::{EmotionalTelemetryEstimator, InteractionKind};
use warden_threat::{DetectionContext, DetectionVerdict};
use warden_types::{CapabilityFit, DeviceId};

use crate::error::PipelineError;
use crate::outcome::{PipelineOutcome, ProceedSignal, Refusal, Stage};
use crate::request::RequestContext;
use crate::stage::{Authenticator, Restrainer, Screener};

/// Runs authentication, threat screening and restraint in order, stopping
/// at the first refusal.
pub struct GatingPipeline {
    authenticator: Arc<dyn Authenticator>,
    screener: Arc<dyn Screener>,
    restrainer: Arc<dyn Restrainer>,
    feed: Option<Arc<EmotionalTelemetryEstimator>>,
}

impl GatingPipeline {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        screener: Arc<dyn Screener>,
        restrainer: Arc<dyn Restrainer>,
    ) -> Self {
        Self {
            authenticator,
            screener,
            restrainer,
            feed: None,
        }
    }

    /// Record every authenticated request as an interaction, and pass the
    /// caller-reported operator state on to `estimator`.
    pub fn with_telemetry_feed(mut self, estimator: Arc<EmotionalTelemetryEstimator>) -> Self {
        self.feed = Some(estimator);
        self
    }

    /// Gate one request. Never fails: every path ends in a proceed signal
    /// or a refusal carrying the refusing stage's reasoning.
    pub async fn process_request(
        &self,
        device_id: &DeviceId,
        input: &str,
        context: &RequestContext,
    ) -> PipelineOutcome {
        let action = &context.action;

        // 1. Authentication
        let auth_context = AuthContext {
            origin: context.origin.clone(),
            attributes: context.attributes.clone(),
        };
        let auth = self
            .authenticator
            .authenticate(device_id, &context.auth, &auth_context)
            .await;
        if !auth.decision.is_granted() {
            return refuse(
                device_id,
                Refusal {
                    stage: Stage::Authentication,
                    decision: auth.decision.as_str().to_string(),
                    reasoning: auth.reasoning,
                    cooling_off: None,
                    manual_review: auth.manual_review,
                },
            );
        }
        if auth.forbids(action.scope) {
            return refuse(
                device_id,
                Refusal {
                    stage: Stage::Authentication,
                    decision: auth.decision.as_str().to_string(),
                    reasoning: format!(
                        "{} grant does not permit {} actions. {}",
                        auth.decision, action.scope, auth.reasoning
                    ),
                    cooling_off: None,
                    manual_review: false,
                },
            );
        }
        self.feed_telemetry(context);

        // 2. Threat screening
        let detection_context = DetectionContext {
            device_id: Some(device_id.clone()),
            channel: context.channel.clone(),
        };
        let detection = self.screener.screen(input, &detection_context).await;
        if !detection.safe {
            return refuse(
                device_id,
                Refusal {
                    stage: Stage::ThreatScreening,
                    decision: detection.action.as_str().to_string(),
                    reasoning: detection_reasoning(&detection),
                    cooling_off: None,
                    manual_review: false,
                },
            );
        }

        // 3. Restraint
        let restraint_context = RestraintContext {
            emotional_state: context.operator_state.unwrap_or_default(),
            scope: action.scope,
            capability_fit: action.capability_fit,
            urgency: action.urgency,
            environment: action.environment.clone(),
            since_last_major_action_secs: action.since_last_major_action_secs,
            override_permitted: auth.decision == AuthDecision::Allow,
        };
        let description = if action.description.trim().is_empty() {
            "respond to operator input"
        } else {
            action.description.as_str()
        };
        let restraint = self.restrainer.restrain(description, &restraint_context).await;
        if !restraint.action.releases_action() {
            let cooling_off: Option<CoolingOff> = restraint.cooling_off.clone();
            return refuse(
                device_id,
                Refusal {
                    stage: Stage::Restraint,
                    decision: restraint.action.as_str().to_string(),
                    reasoning: restraint.reasoning_text(),
                    cooling_off,
                    manual_review: false,
                },
            );
        }

        info!(
            device_id = %device_id,
            auth = %auth.decision,
            detection = %detection.action,
            restraint = %restraint.action,
            "Request cleared all gates"
        );
        PipelineOutcome::Proceed(Box::new(ProceedSignal {
            auth_decision: auth.decision,
            identity: auth.identity,
            session: auth.session,
            restrictions: auth.restrictions,
            detection_action: detection.action,
            recommendations: detection.recommendations,
            restraint,
        }))
    }

    /// Gate a request whose context arrives as an untyped JSON map. A map
    /// that does not parse is refused at stage 1.
    pub async fn process_raw(
        &self,
        device_id: &str,
        input: &str,
        raw_context: &serde_json::Value,
    ) -> PipelineOutcome {
        let device_id = DeviceId::new(device_id.trim());
        if device_id.as_str().is_empty() {
            return refuse(
                &device_id,
                deny_refusal("Request carries no device id".to_string()),
            );
        }
        match serde_json::from_value::<RequestContext>(raw_context.clone()) {
            Ok(context) => self.process_request(&device_id, input, &context).await,
            Err(e) => refuse(
                &device_id,
                deny_refusal(PipelineError::MalformedContext(e).to_string()),
            ),
        }
    }

    fn feed_telemetry(&self, context: &RequestContext) {
        let Some(estimator) = &self.feed else {
            return;
        };
        if let Some(state) = context.operator_state {
            estimator.set_emotional_state(state);
        }
        let message = InteractionKind::Message {
            urgency: context.action.urgency,
            sentiment: None,
        };
        if let Err(e) = estimator.record(message) {
            debug!(error = %e, "Interaction not recorded");
        }
        if matches!(
            context.action.capability_fit,
            CapabilityFit::ExceedingLimits | CapabilityFit::FarBeyond
        ) {
            if let Err(e) = estimator.record(InteractionKind::CapabilityMismatch) {
                debug!(error = %e, "Capability mismatch not recorded");
            }
        }
    }
}

fn deny_refusal(reasoning: String) -> Refusal {
    Refusal {
        stage: Stage::Authentication,
        decision: AuthDecision::Deny.as_str().to_string(),
        reasoning,
        cooling_off: None,
        manual_review: false,
    }
}

fn detection_reasoning(detection: &DetectionVerdict) -> String {
    let findings = detection
        .patterns
        .iter()
        .map(|p| format!("{} ({})", p.archetype, p.severity))
        .collect::<Vec<_>>()
        .join(", ");
    if findings.is_empty() {
        detection.recommendations.join("; ")
    } else {
        format!("Input matched {findings}. {}", detection.recommendations.join("; "))
    }
}

fn refuse(device_id: &DeviceId, refusal: Refusal) -> PipelineOutcome {
    warn!(
        device_id = %device_id,
        stage = %refusal.stage,
        decision = %refusal.decision,
        reason = %refusal.reasoning,
        "Request refused"
    );
    PipelineOutcome::Refused(refusal)
}
