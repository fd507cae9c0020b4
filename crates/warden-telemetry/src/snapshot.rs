use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use warden_types::EmotionalStateClass;

use crate::config::TelemetryConfig;
use crate::record::{
    DecisionSample, DeviceContext, InteractionKind, InteractionRecord, PerformanceClass, TimeOfDay,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionQualityTrend {
    Improving,
    #[default]
    Stable,
    Declining,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionSentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
    Hostile,
}

impl InteractionSentiment {
    fn score(&self) -> f64 {
        match self {
            InteractionSentiment::Positive => 1.0,
            InteractionSentiment::Neutral => 0.0,
            InteractionSentiment::Negative => -1.0,
            InteractionSentiment::Hostile => -2.0,
        }
    }

    fn from_score(avg: f64) -> Self {
        if avg >= 0.3 {
            InteractionSentiment::Positive
        } else if avg > -0.3 {
            InteractionSentiment::Neutral
        } else if avg > -1.2 {
            InteractionSentiment::Negative
        } else {
            InteractionSentiment::Hostile
        }
    }
}

/// Point-in-time operator estimate. Numeric fields are in [0, 100].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionalTelemetrySnapshot {
    pub stress: f64,
    pub fatigue: f64,
    pub time_pressure: f64,
    pub decision_quality_trend: DecisionQualityTrend,
    pub frustration_events: u32,
    pub sentiment: InteractionSentiment,
    pub emotional_state: EmotionalStateClass,
    pub taken_at: DateTime<Utc>,
}

impl EmotionalTelemetrySnapshot {
    /// Snapshot with explicit levels and neutral everything else.
    pub fn with_levels(stress: f64, fatigue: f64, time_pressure: f64) -> Self {
        Self {
            stress: clamp_level(stress),
            fatigue: clamp_level(fatigue),
            time_pressure: clamp_level(time_pressure),
            decision_quality_trend: DecisionQualityTrend::Stable,
            frustration_events: 0,
            sentiment: InteractionSentiment::Neutral,
            emotional_state: EmotionalStateClass::Focused,
            taken_at: Utc::now(),
        }
    }
}

fn clamp_level(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Everything the estimate is computed from.
#[derive(Clone, Copy, Debug)]
pub struct EstimateInput<'a> {
    pub now: DateTime<Utc>,
    pub emotional_state: EmotionalStateClass,
    pub device: &'a DeviceContext,
    /// Oldest first.
    pub records: &'a [InteractionRecord],
    /// Oldest first.
    pub decisions: &'a [DecisionSample],
}

struct Stressors {
    errors: u32,
    frustrations: u32,
    mismatches: u32,
    urgency: u8,
}

fn stressors(input: &EstimateInput<'_>, config: &TelemetryConfig) -> Stressors {
    let horizon = input.now - Duration::seconds(config.stressor_horizon_secs);
    let pressure_horizon = input.now - Duration::seconds(config.pressure_horizon_secs);
    let mut s = Stressors {
        errors: 0,
        frustrations: 0,
        mismatches: 0,
        urgency: 1,
    };
    for record in input.records.iter().filter(|r| r.at > horizon && r.at <= input.now) {
        match &record.kind {
            InteractionKind::Error => s.errors += 1,
            InteractionKind::Frustration => s.frustrations += 1,
            InteractionKind::CapabilityMismatch => s.mismatches += 1,
            // latest message in the pressure horizon wins
            InteractionKind::Message { urgency, .. } if record.at > pressure_horizon => {
                s.urgency = *urgency
            }
            _ => {}
        }
    }
    s
}

fn stress(input: &EstimateInput<'_>, config: &TelemetryConfig, s: &Stressors) -> f64 {
    let mut stress = config.stress_baseline.for_class(input.emotional_state)
        + f64::from(s.errors) * config.error_penalty
        + f64::from(s.frustrations) * config.frustration_penalty
        + f64::from(s.mismatches) * config.mismatch_penalty
        + f64::from(s.urgency.saturating_sub(3)) * config.urgency_penalty;

    let battery_low = input
        .device
        .battery_level
        .is_some_and(|level| level < config.battery_low_threshold);
    if battery_low && !input.device.charging {
        stress += config.battery_penalty;
    }
    if input.device.performance == PerformanceClass::Constrained {
        stress += config.constrained_device_penalty;
    }

    let active = s.errors + s.frustrations + s.mismatches > 0 || s.urgency > 3;
    if !active {
        if let Some(last) = input.records.last() {
            let idle_secs = (input.now - last.at).num_seconds().max(0);
            let ticks = idle_secs / config.idle_tick_secs.max(1);
            stress -= ticks as f64 * config.idle_decay_per_tick;
        }
    }
    clamp_level(stress)
}

fn session_start(records: &[InteractionRecord], config: &TelemetryConfig) -> Option<DateTime<Utc>> {
    let mut start: Option<DateTime<Utc>> = None;
    let mut previous: Option<DateTime<Utc>> = None;
    for record in records {
        let ends_at = match record.kind {
            InteractionKind::Break { duration_secs } => record.at + Duration::seconds(duration_secs as i64),
            _ => record.at,
        };
        match (&record.kind, previous) {
            (InteractionKind::Break { duration_secs }, _) if *duration_secs >= config.break_reset_secs => {
                start = Some(ends_at);
            }
            (_, Some(prev)) if (record.at - prev).num_seconds() > config.session_gap_secs => {
                start = Some(record.at);
            }
            _ => {
                start.get_or_insert(record.at);
            }
        }
        previous = Some(ends_at);
    }
    start
}

fn fatigue(input: &EstimateInput<'_>, config: &TelemetryConfig) -> f64 {
    let mut fatigue = config.fatigue_baseline.for_class(input.emotional_state);

    if let Some(start) = session_start(input.records, config) {
        let session_mins = (input.now - start).num_minutes();
        fatigue += config
            .session_breakpoints
            .iter()
            .filter(|bp| session_mins >= bp.after_mins)
            .map(|bp| bp.fatigue)
            .sum::<f64>();

        for record in input.records.iter().filter(|r| r.at >= start && r.at <= input.now) {
            if let InteractionKind::Break { duration_secs } = record.kind {
                let relief = (duration_secs as f64 / 60.0) * config.break_relief_per_min;
                fatigue -= relief.min(config.max_relief_per_break);
            }
        }
    }

    let local = input.now + Duration::minutes(i64::from(config.utc_offset_minutes));
    let tod = &config.time_of_day;
    fatigue += match TimeOfDay::from_hour(local.hour()) {
        TimeOfDay::Night => tod.night,
        TimeOfDay::EarlyMorning => tod.early_morning,
        TimeOfDay::Working => tod.working,
        TimeOfDay::PostLunchDip => tod.post_lunch_dip,
        TimeOfDay::Evening => tod.evening,
    };
    clamp_level(fatigue)
}

fn sentiment(input: &EstimateInput<'_>, config: &TelemetryConfig) -> InteractionSentiment {
    let horizon = input.now - Duration::seconds(config.stressor_horizon_secs);
    let mut total = 0.0;
    let mut count = 0u32;
    for record in input.records.iter().filter(|r| r.at > horizon && r.at <= input.now) {
        match &record.kind {
            InteractionKind::Message {
                sentiment: Some(tag),
                ..
            } => {
                total += tag.score();
                count += 1;
            }
            InteractionKind::Frustration => {
                total -= 1.0;
                count += 1;
            }
            _ => {}
        }
    }
    if count == 0 {
        InteractionSentiment::Neutral
    } else {
        InteractionSentiment::from_score(total / f64::from(count))
    }
}

fn trend(decisions: &[DecisionSample], config: &TelemetryConfig) -> DecisionQualityTrend {
    let t = &config.trend;
    let recent = &decisions[decisions.len().saturating_sub(t.window)..];
    if recent.len() < t.min_samples.max(1) {
        return DecisionQualityTrend::Stable;
    }
    let avg_confidence = recent.iter().map(|d| d.confidence).sum::<f64>() / recent.len() as f64;
    let known: Vec<bool> = recent.iter().filter_map(|d| d.complications).collect();
    let complication_rate = if known.is_empty() {
        0.0
    } else {
        known.iter().filter(|c| **c).count() as f64 / known.len() as f64
    };

    if avg_confidence >= t.improving_min_confidence
        && complication_rate <= t.improving_max_complication_rate
    {
        DecisionQualityTrend::Improving
    } else if avg_confidence < t.declining_below_confidence
        || complication_rate >= t.declining_min_complication_rate
    {
        DecisionQualityTrend::Declining
    } else {
        DecisionQualityTrend::Stable
    }
}

/// Compute a snapshot. Pure: the same input and configuration always give
/// the same snapshot.
pub fn estimate(input: &EstimateInput<'_>, config: &TelemetryConfig) -> EmotionalTelemetrySnapshot {
    let s = stressors(input, config);
    EmotionalTelemetrySnapshot {
        stress: stress(input, config, &s),
        fatigue: fatigue(input, config),
        time_pressure: clamp_level(f64::from(s.urgency.saturating_sub(1)) * 25.0),
        decision_quality_trend: trend(input.decisions, config),
        frustration_events: s.frustrations,
        sentiment: sentiment(input, config),
        emotional_state: input.emotional_state,
        taken_at: input.now,
    }
}
