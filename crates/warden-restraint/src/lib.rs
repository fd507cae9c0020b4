//! RestraintDecisionEngine: stage 3 of the Warden gating pipeline.
//!
//! Runs after authentication and threat screening have passed and decides
//! whether the action itself should go ahead, given the operator's current
//! telemetry estimate and the action's scope, urgency and capability fit.
//!
//! Check order, first forcing outcome wins:
//!
//! 1. Emergency override (urgency 5, system-level at urgency 4, or a long
//!    dormancy) when fully authenticated and out of cooldown
//! 2. Acute emotional constraint: HOLD with a cooling-off period
//! 3. Capability fit: HOLD, ESCALATE, or a MODIFY downgrade
//! 4. Frequency of released actions in the trailing window
//! 5. Elevated stress or fatigue: MODIFY
//! 6. PROCEED
//!
//! Cross-request state (released-action timestamps, the override window and
//! its cooldown) lives in [`RestraintCounters`], an explicit shared handle.

pub mod config;
pub mod context;
pub mod counters;
pub mod engine;
pub mod error;
pub mod verdict;

pub use config::RestraintConfig;
pub use context::RestraintContext;
pub use counters::{FrequencyState, OverrideGrant, RestraintCounters};
pub use engine::RestraintDecisionEngine;
pub use error::{RestraintError, RestraintResult};
pub use verdict::{
    CoolingOff, RestraintAction, RestraintAuditEntry, RestraintPriority, RestraintVerdict,
};
