//! The Warden gating pipeline.
//!
//! Every inbound request passes three stages in order, each of which writes
//! its own audit record:
//!
//! 1. **Authentication** ([`warden_auth::AuthGateOrchestrator`]): DENY or
//!    MANUAL_REVIEW halts; a LIMITED grant halts if its restrictions forbid
//!    the requested action scope.
//! 2. **Threat screening** ([`warden_threat::ThreatPatternSafeguard`]):
//!    halts when the input is not safe (any HIGH or CRITICAL pattern).
//! 3. **Restraint** ([`warden_restraint::RestraintDecisionEngine`]): HOLD
//!    and ESCALATE halt; PROCEED, MODIFY and EMERGENCY_OVERRIDE release the
//!    action.
//!
//! No stage retries. A caller that wants to retry re-enters at stage 1.

pub mod assembly;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod request;
pub mod stage;

pub use assembly::{Warden, AUTH_AUDIT, RESTRAINT_AUDIT, THREAT_AUDIT};
pub use error::{PipelineError, PipelineResult};
pub use outcome::{PipelineOutcome, ProceedSignal, Refusal, Stage};
pub use pipeline::GatingPipeline;
pub use request::{ActionRequest, RequestContext};
pub use stage::{Authenticator, Restrainer, Screener};
