use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_telemetry::EmotionalTelemetrySnapshot;

use crate::context::RestraintContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestraintAction {
    Proceed,
    Modify,
    Escalate,
    Hold,
    EmergencyOverride,
}

impl RestraintAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestraintAction::Proceed => "PROCEED",
            RestraintAction::Modify => "MODIFY",
            RestraintAction::Escalate => "ESCALATE",
            RestraintAction::Hold => "HOLD",
            RestraintAction::EmergencyOverride => "EMERGENCY_OVERRIDE",
        }
    }

    /// Whether the caller may go ahead with the action.
    pub fn releases_action(&self) -> bool {
        matches!(
            self,
            RestraintAction::Proceed | RestraintAction::Modify | RestraintAction::EmergencyOverride
        )
    }
}

impl fmt::Display for RestraintAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestraintPriority {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

/// Mandatory wait after a HOLD before the same action class is retried.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoolingOff {
    pub secs: i64,
    pub until: DateTime<Utc>,
}

impl CoolingOff {
    pub fn minutes(mins: i64, from: DateTime<Utc>) -> Self {
        Self {
            secs: mins * 60,
            until: from + Duration::minutes(mins),
        }
    }
}

/// Final restraint decision for one action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestraintVerdict {
    pub action: RestraintAction,
    /// 0–1
    pub confidence: f64,
    /// In the order the checks ran
    pub reasoning: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifications: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooling_off: Option<CoolingOff>,
    /// Why an ESCALATE or EMERGENCY_OVERRIDE was issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    pub audit_required: bool,
    pub priority: RestraintPriority,
    pub decided_at: DateTime<Utc>,
    /// Id of the audit record; pass it to `record_outcome`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<Uuid>,
}

impl RestraintVerdict {
    /// HOLD for an internal fault.
    pub fn internal_fault(fault: &str, at: DateTime<Utc>) -> Self {
        Self {
            action: RestraintAction::Hold,
            confidence: 1.0,
            reasoning: vec![format!(
                "Restraint evaluation failed ({fault}); holding by default"
            )],
            modifications: Vec::new(),
            cooling_off: None,
            justification: None,
            audit_required: true,
            priority: RestraintPriority::High,
            decided_at: at,
            audit_id: None,
        }
    }

    pub fn reasoning_text(&self) -> String {
        self.reasoning.join("; ")
    }
}

/// One restraint audit entry. The telemetry snapshot is absent only when
/// the fault happened before it could be taken.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestraintAuditEntry {
    pub description: String,
    pub context: RestraintContext,
    pub verdict: RestraintVerdict,
    pub telemetry: Option<EmotionalTelemetrySnapshot>,
}
