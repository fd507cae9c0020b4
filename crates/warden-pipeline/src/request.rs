use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use warden_auth::AuthRequest;
use warden_types::{ActionScope, CapabilityFit, EmotionalStateClass};

/// The action the caller wants to take once the input is cleared.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scope: ActionScope,
    #[serde(default)]
    pub capability_fit: CapabilityFit,
    #[serde(default = "default_urgency")]
    pub urgency: u8,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub since_last_major_action_secs: Option<i64>,
}

fn default_urgency() -> u8 {
    2
}

impl Default for ActionRequest {
    fn default() -> Self {
        Self {
            description: String::new(),
            scope: ActionScope::Routine,
            capability_fit: CapabilityFit::WithinLimits,
            urgency: default_urgency(),
            environment: None,
            since_last_major_action_secs: None,
        }
    }
}

/// Typed form of the inbound request map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub auth: AuthRequest,
    #[serde(default)]
    pub action: ActionRequest,
    /// Caller-reported operator state, if known
    #[serde(default)]
    pub operator_state: Option<EmotionalStateClass>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sparse_map_fills_defaults() {
        let context: RequestContext = serde_json::from_value(json!({
            "action": { "description": "send summary", "scope": "moderate" },
            "attributes": { "locale": "en-GB" }
        }))
        .unwrap();
        assert_eq!(context.action.scope, ActionScope::Moderate);
        assert_eq!(context.action.urgency, 2);
        assert_eq!(context.action.capability_fit, CapabilityFit::WithinLimits);
        assert!(context.auth.attestation.is_none());
        assert_eq!(context.attributes["locale"], json!("en-GB"));
    }

    #[test]
    fn wrong_types_rejected() {
        let parsed = serde_json::from_value::<RequestContext>(json!({
            "action": { "urgency": "high" }
        }));
        assert!(parsed.is_err());
    }
}
