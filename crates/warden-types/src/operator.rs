use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse class of the operator's emotional state.
///
/// Supplied by the caller (or the last telemetry estimate) and used to seed
/// the stress estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalStateClass {
    Calm,
    #[default]
    Focused,
    Stressed,
    Frustrated,
    Overwhelmed,
    Exhausted,
}

impl EmotionalStateClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionalStateClass::Calm => "calm",
            EmotionalStateClass::Focused => "focused",
            EmotionalStateClass::Stressed => "stressed",
            EmotionalStateClass::Frustrated => "frustrated",
            EmotionalStateClass::Overwhelmed => "overwhelmed",
            EmotionalStateClass::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for EmotionalStateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope of an action, ordered from least to most consequential.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ActionScope {
    #[default]
    Routine,
    Moderate,
    Significant,
    Complex,
    SystemLevel,
}

impl ActionScope {
    /// Complexity weight (1–5) used by the capability-fit check.
    pub fn complexity_weight(&self) -> u8 {
        match self {
            ActionScope::Routine => 1,
            ActionScope::Moderate => 2,
            ActionScope::Significant => 3,
            ActionScope::Complex => 4,
            ActionScope::SystemLevel => 5,
        }
    }

    /// Whether an action of this scope counts as a "major" action.
    pub fn is_major(&self) -> bool {
        *self >= ActionScope::Significant
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionScope::Routine => "routine",
            ActionScope::Moderate => "moderate",
            ActionScope::Significant => "significant",
            ActionScope::Complex => "complex",
            ActionScope::SystemLevel => "system_level",
        }
    }
}

impl fmt::Display for ActionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an action's demands compare with the agent's capabilities.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityFit {
    #[default]
    WithinLimits,
    ApproachingLimits,
    ExceedingLimits,
    FarBeyond,
}

impl CapabilityFit {
    /// One notch worse, saturating at `FarBeyond`.
    pub fn worsen(self) -> Self {
        match self {
            CapabilityFit::WithinLimits => CapabilityFit::ApproachingLimits,
            CapabilityFit::ApproachingLimits => CapabilityFit::ExceedingLimits,
            CapabilityFit::ExceedingLimits | CapabilityFit::FarBeyond => CapabilityFit::FarBeyond,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityFit::WithinLimits => "within_limits",
            CapabilityFit::ApproachingLimits => "approaching_limits",
            CapabilityFit::ExceedingLimits => "exceeding_limits",
            CapabilityFit::FarBeyond => "far_beyond",
        }
    }
}

impl fmt::Display for CapabilityFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_ordering_matches_consequence() {
        assert!(ActionScope::Routine < ActionScope::Moderate);
        assert!(ActionScope::Complex < ActionScope::SystemLevel);
        assert!(ActionScope::Significant.is_major());
        assert!(!ActionScope::Moderate.is_major());
        assert_eq!(ActionScope::SystemLevel.complexity_weight(), 5);
    }

    #[test]
    fn capability_fit_worsens_and_saturates() {
        assert_eq!(
            CapabilityFit::WithinLimits.worsen(),
            CapabilityFit::ApproachingLimits
        );
        assert_eq!(CapabilityFit::FarBeyond.worsen(), CapabilityFit::FarBeyond);
    }

    #[test]
    fn enums_use_snake_case_on_the_wire() {
        let scope: ActionScope = serde_json::from_str("\"system_level\"").unwrap();
        assert_eq!(scope, ActionScope::SystemLevel);
        let fit: CapabilityFit = serde_json::from_str("\"far_beyond\"").unwrap();
        assert_eq!(fit, CapabilityFit::FarBeyond);
    }
}
