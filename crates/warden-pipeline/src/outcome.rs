use std::fmt;

use serde::{Deserialize, Serialize};
use warden_auth::{AuthDecision, Restriction, SessionGrant};
use warden_restraint::{CoolingOff, RestraintVerdict};
use warden_threat::DetectionAction;
use warden_types::IdentityId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Authentication,
    ThreatScreening,
    Restraint,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Authentication => "authentication",
            Stage::ThreatScreening => "threat_screening",
            Stage::Restraint => "restraint",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller renders when a request is refused. Carries no evidence
/// payloads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Refusal {
    pub stage: Stage,
    /// Decision label of the refusing stage, e.g. `DENY`, `BLOCK`, `HOLD`
    pub decision: String,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooling_off: Option<CoolingOff>,
    #[serde(default)]
    pub manual_review: bool,
}

/// Authorization for the downstream responder or executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProceedSignal {
    pub auth_decision: AuthDecision,
    pub identity: Option<IdentityId>,
    pub session: Option<SessionGrant>,
    pub restrictions: Vec<Restriction>,
    pub detection_action: DetectionAction,
    /// Findings below the halting severity travel with the grant
    pub recommendations: Vec<String>,
    pub restraint: RestraintVerdict,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Proceed(Box<ProceedSignal>),
    Refused(Refusal),
}

impl PipelineOutcome {
    pub fn is_proceed(&self) -> bool {
        matches!(self, PipelineOutcome::Proceed(_))
    }

    pub fn proceed(&self) -> Option<&ProceedSignal> {
        match self {
            PipelineOutcome::Proceed(signal) => Some(signal),
            PipelineOutcome::Refused(_) => None,
        }
    }

    pub fn refusal(&self) -> Option<&Refusal> {
        match self {
            PipelineOutcome::Refused(refusal) => Some(refusal),
            PipelineOutcome::Proceed(_) => None,
        }
    }
}
