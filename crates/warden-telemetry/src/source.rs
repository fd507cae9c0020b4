use parking_lot::Mutex;
use uuid::Uuid;

use crate::snapshot::EmotionalTelemetrySnapshot;

/// Where the restraint stage gets its operator estimate from.
pub trait TelemetrySource: Send + Sync {
    fn snapshot(&self) -> EmotionalTelemetrySnapshot;

    /// A decision was taken with the given confidence (0–1).
    fn observe_decision(&self, _id: Uuid, _confidence: f64) {}

    /// The outcome of an earlier decision is known.
    fn observe_outcome(&self, _id: Uuid, _complications: bool) {}
}

/// Telemetry source that always reports the same snapshot.
pub struct FixedTelemetry {
    snapshot: Mutex<EmotionalTelemetrySnapshot>,
}

impl FixedTelemetry {
    pub fn new(snapshot: EmotionalTelemetrySnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }

    pub fn levels(stress: f64, fatigue: f64, time_pressure: f64) -> Self {
        Self::new(EmotionalTelemetrySnapshot::with_levels(stress, fatigue, time_pressure))
    }

    pub fn set(&self, snapshot: EmotionalTelemetrySnapshot) {
        *self.snapshot.lock() = snapshot;
    }
}

impl TelemetrySource for FixedTelemetry {
    fn snapshot(&self) -> EmotionalTelemetrySnapshot {
        self.snapshot.lock().clone()
    }
}
