use serde::{Deserialize, Serialize};
use warden_types::{ActionScope, CapabilityFit, EmotionalStateClass};

/// Everything the restraint stage knows about one proposed action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestraintContext {
    #[serde(default)]
    pub emotional_state: EmotionalStateClass,
    #[serde(default)]
    pub scope: ActionScope,
    #[serde(default)]
    pub capability_fit: CapabilityFit,
    /// 1 (whenever) to 5 (immediately)
    pub urgency: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Seconds since the operator's last major action, when the caller knows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since_last_major_action_secs: Option<i64>,
    /// Set only when authentication was a full ALLOW
    #[serde(default)]
    pub override_permitted: bool,
}

impl RestraintContext {
    pub fn new(scope: ActionScope, urgency: u8) -> Self {
        Self {
            emotional_state: EmotionalStateClass::default(),
            scope,
            capability_fit: CapabilityFit::WithinLimits,
            urgency,
            environment: None,
            since_last_major_action_secs: None,
            override_permitted: false,
        }
    }

    pub fn with_capability_fit(mut self, fit: CapabilityFit) -> Self {
        self.capability_fit = fit;
        self
    }

    pub fn with_override_permitted(mut self, permitted: bool) -> Self {
        self.override_permitted = permitted;
        self
    }

    pub fn with_since_last_major_action(mut self, secs: i64) -> Self {
        self.since_last_major_action_secs = Some(secs);
        self
    }
}
