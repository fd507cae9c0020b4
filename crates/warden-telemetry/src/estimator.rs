use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;
use warden_types::{ConfigCell, EmotionalStateClass, SharedClock};

use crate::config::TelemetryConfig;
use crate::error::{TelemetryError, TelemetryResult};
use crate::record::{DecisionSample, DeviceContext, InteractionKind, InteractionRecord};
use crate::snapshot::{estimate, EmotionalTelemetrySnapshot, EstimateInput};
use crate::source::TelemetrySource;

/// Decision samples retained; only the trailing trend window is scored.
const DECISION_HISTORY: usize = 64;

/// Maintains the interaction window and device context and derives
/// snapshots from them on demand.
pub struct EmotionalTelemetryEstimator {
    config: Arc<ConfigCell<TelemetryConfig>>,
    clock: SharedClock,
    records: RwLock<VecDeque<InteractionRecord>>,
    state: RwLock<(EmotionalStateClass, DeviceContext)>,
    decisions: Mutex<VecDeque<DecisionSample>>,
}

impl EmotionalTelemetryEstimator {
    pub fn new(config: Arc<ConfigCell<TelemetryConfig>>, clock: SharedClock) -> Self {
        Self {
            config,
            clock,
            records: RwLock::new(VecDeque::new()),
            state: RwLock::new((EmotionalStateClass::default(), DeviceContext::default())),
            decisions: Mutex::new(VecDeque::new()),
        }
    }

    /// Record an interaction happening now.
    pub fn record(&self, kind: InteractionKind) -> TelemetryResult<()> {
        self.record_at(self.clock.now(), kind)
    }

    /// Record an interaction at a given time, e.g. when replaying history
    /// from the interaction store. Records are kept in time order.
    pub fn record_at(&self, at: DateTime<Utc>, kind: InteractionKind) -> TelemetryResult<()> {
        if let InteractionKind::Message { urgency, .. } = kind {
            if !(1..=5).contains(&urgency) {
                return Err(TelemetryError::InvalidUrgency(urgency));
            }
        }
        let capacity = self.config.load().value.window_capacity;
        let mut records = self.records.write();
        let position = records.partition_point(|r| r.at <= at);
        records.insert(position, InteractionRecord { at, kind });
        while records.len() > capacity {
            records.pop_front();
        }
        Ok(())
    }

    pub fn set_emotional_state(&self, class: EmotionalStateClass) {
        debug!(class = %class, "Operator emotional state updated");
        self.state.write().0 = class;
    }

    pub fn set_device_context(&self, device: DeviceContext) -> TelemetryResult<()> {
        if let Some(level) = device.battery_level {
            if level > 100 {
                return Err(TelemetryError::InvalidBatteryLevel(level));
            }
        }
        self.state.write().1 = device;
        Ok(())
    }

    pub fn emotional_state(&self) -> EmotionalStateClass {
        self.state.read().0
    }

    pub fn window_len(&self) -> usize {
        self.records.read().len()
    }

    /// Feed a decision into the quality trend.
    pub fn record_decision(&self, id: Uuid, confidence: f64) -> TelemetryResult<()> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(TelemetryError::InvalidConfidence(confidence));
        }
        let mut decisions = self.decisions.lock();
        decisions.push_back(DecisionSample {
            id,
            confidence,
            complications: None,
        });
        while decisions.len() > DECISION_HISTORY {
            decisions.pop_front();
        }
        Ok(())
    }

    /// Attach an outcome to an earlier decision. Returns false if the
    /// decision is no longer retained.
    pub fn record_decision_outcome(&self, id: Uuid, complications: bool) -> bool {
        let mut decisions = self.decisions.lock();
        match decisions.iter_mut().rev().find(|d| d.id == id) {
            Some(sample) => {
                sample.complications = Some(complications);
                true
            }
            None => false,
        }
    }

    /// Current estimate.
    pub fn snapshot(&self) -> EmotionalTelemetrySnapshot {
        let config = self.config.load();
        let records: Vec<InteractionRecord> = self.records.read().iter().cloned().collect();
        let decisions: Vec<DecisionSample> = self.decisions.lock().iter().cloned().collect();
        let (emotional_state, device) = self.state.read().clone();

        let snapshot = estimate(
            &EstimateInput {
                now: self.clock.now(),
                emotional_state,
                device: &device,
                records: &records,
                decisions: &decisions,
            },
            &config.value,
        );
        debug!(
            stress = snapshot.stress,
            fatigue = snapshot.fatigue,
            time_pressure = snapshot.time_pressure,
            trend = ?snapshot.decision_quality_trend,
            "Telemetry snapshot"
        );
        snapshot
    }
}

impl TelemetrySource for EmotionalTelemetryEstimator {
    fn snapshot(&self) -> EmotionalTelemetrySnapshot {
        EmotionalTelemetryEstimator::snapshot(self)
    }

    fn observe_decision(&self, id: Uuid, confidence: f64) {
        if let Err(e) = self.record_decision(id, confidence.clamp(0.0, 1.0)) {
            warn!(error = %e, "Decision sample rejected");
        }
    }

    fn observe_outcome(&self, id: Uuid, complications: bool) {
        if !self.record_decision_outcome(id, complications) {
            debug!(decision_id = %id, "Outcome for a decision no longer in the trend window");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::DecisionQualityTrend;
    use chrono::{Duration, TimeZone};
    use warden_types::{Clock, ManualClock};

    fn estimator() -> (EmotionalTelemetryEstimator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap(),
        ));
        let config = Arc::new(ConfigCell::new(TelemetryConfig {
            window_capacity: 4,
            ..TelemetryConfig::default()
        }));
        (EmotionalTelemetryEstimator::new(config, clock.clone()), clock)
    }

    #[test]
    fn window_is_bounded_oldest_first() {
        let (est, clock) = estimator();
        for _ in 0..6 {
            est.record(InteractionKind::Error).unwrap();
            clock.advance(Duration::minutes(1));
        }
        assert_eq!(est.window_len(), 4);
        // 20 + 4 errors * 8
        assert_eq!(est.snapshot().stress, 52.0);
    }

    #[test]
    fn invalid_urgency_rejected() {
        let (est, _) = estimator();
        let result = est.record(InteractionKind::Message {
            urgency: 9,
            sentiment: None,
        });
        assert_eq!(result, Err(TelemetryError::InvalidUrgency(9)));
        assert_eq!(est.window_len(), 0);
    }

    #[test]
    fn backdated_records_stay_ordered() {
        let (est, clock) = estimator();
        est.record(InteractionKind::Frustration).unwrap();
        est.record_at(clock.now() - Duration::minutes(10), InteractionKind::Error)
            .unwrap();
        let records = est.records.read();
        assert!(records[0].at < records[1].at);
    }

    #[test]
    fn decision_outcomes_drive_trend() {
        let (est, _) = estimator();
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            est.observe_decision(*id, 0.9);
        }
        assert_eq!(est.snapshot().decision_quality_trend, DecisionQualityTrend::Improving);

        for id in &ids[..3] {
            est.observe_outcome(*id, true);
        }
        assert_eq!(est.snapshot().decision_quality_trend, DecisionQualityTrend::Declining);
        assert!(!est.record_decision_outcome(Uuid::new_v4(), false));
    }

    #[test]
    fn emotional_state_seeds_stress() {
        let (est, _) = estimator();
        est.set_emotional_state(EmotionalStateClass::Overwhelmed);
        assert_eq!(est.snapshot().stress, 75.0);
        assert_eq!(est.snapshot().emotional_state, EmotionalStateClass::Overwhelmed);
    }
}
