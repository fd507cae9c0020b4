use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::snapshot::InteractionSentiment;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionKind {
    Message {
        urgency: u8,
        #[serde(default)]
        sentiment: Option<InteractionSentiment>,
    },
    Error,
    Frustration,
    CapabilityMismatch,
    Break {
        duration_secs: u64,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: InteractionKind,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceClass {
    High,
    #[default]
    Standard,
    Constrained,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceContext {
    /// Percent, 0–100. Unknown when absent.
    #[serde(default)]
    pub battery_level: Option<u8>,
    #[serde(default)]
    pub charging: bool,
    #[serde(default)]
    pub performance: PerformanceClass,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Night,
    EarlyMorning,
    Working,
    PostLunchDip,
    Evening,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=4 | 22..=23 => TimeOfDay::Night,
            5..=7 => TimeOfDay::EarlyMorning,
            13..=14 => TimeOfDay::PostLunchDip,
            18..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Working,
        }
    }
}

/// One decision fed into the quality trend, optionally completed by its
/// outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionSample {
    pub id: Uuid,
    /// 0–1
    pub confidence: f64,
    pub complications: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_buckets() {
        assert_eq!(TimeOfDay::from_hour(2), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(23), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(6), TimeOfDay::EarlyMorning);
        assert_eq!(TimeOfDay::from_hour(10), TimeOfDay::Working);
        assert_eq!(TimeOfDay::from_hour(14), TimeOfDay::PostLunchDip);
        assert_eq!(TimeOfDay::from_hour(16), TimeOfDay::Working);
        assert_eq!(TimeOfDay::from_hour(19), TimeOfDay::Evening);
    }

    #[test]
    fn record_serializes_flat() {
        let record = InteractionRecord {
            at: Utc::now(),
            kind: InteractionKind::Break { duration_secs: 600 },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "break");
        assert_eq!(json["duration_secs"], 600);
    }
}
