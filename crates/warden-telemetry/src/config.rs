use serde::{Deserialize, Serialize};
use warden_types::EmotionalStateClass;

/// Per-class starting values for stress and fatigue.
///
/// All six classes must be given when the section is present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassBaseline {
    pub calm: f64,
    pub focused: f64,
    pub stressed: f64,
    pub frustrated: f64,
    pub overwhelmed: f64,
    pub exhausted: f64,
}

impl ClassBaseline {
    pub fn for_class(&self, class: EmotionalStateClass) -> f64 {
        match class {
            EmotionalStateClass::Calm => self.calm,
            EmotionalStateClass::Focused => self.focused,
            EmotionalStateClass::Stressed => self.stressed,
            EmotionalStateClass::Frustrated => self.frustrated,
            EmotionalStateClass::Overwhelmed => self.overwhelmed,
            EmotionalStateClass::Exhausted => self.exhausted,
        }
    }

    fn stress_defaults() -> Self {
        Self {
            calm: 10.0,
            focused: 20.0,
            stressed: 55.0,
            frustrated: 60.0,
            overwhelmed: 75.0,
            exhausted: 50.0,
        }
    }

    fn fatigue_defaults() -> Self {
        Self {
            calm: 0.0,
            focused: 5.0,
            stressed: 10.0,
            frustrated: 10.0,
            overwhelmed: 20.0,
            exhausted: 40.0,
        }
    }
}

/// Fatigue added once the current session passes `after_mins`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionBreakpoint {
    pub after_mins: i64,
    pub fatigue: f64,
}

/// Fatigue contribution by local time-of-day bucket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeOfDayFatigue {
    pub night: f64,
    pub early_morning: f64,
    pub working: f64,
    pub post_lunch_dip: f64,
    pub evening: f64,
}

impl Default for TimeOfDayFatigue {
    fn default() -> Self {
        Self {
            night: 25.0,
            early_morning: 10.0,
            working: 0.0,
            post_lunch_dip: 10.0,
            evening: 8.0,
        }
    }
}

/// Thresholds for the decision-quality trend over the trailing samples.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendThresholds {
    /// Samples considered (default: 5)
    pub window: usize,
    /// Fewer samples than this always reads as stable (default: 2)
    pub min_samples: usize,
    pub improving_min_confidence: f64,
    pub improving_max_complication_rate: f64,
    pub declining_below_confidence: f64,
    pub declining_min_complication_rate: f64,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            window: 5,
            min_samples: 2,
            improving_min_confidence: 0.75,
            improving_max_complication_rate: 0.2,
            declining_below_confidence: 0.5,
            declining_min_complication_rate: 0.4,
        }
    }
}

/// Weights and horizons for the telemetry estimate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Interaction records kept; oldest evicted first (default: 512)
    pub window_capacity: usize,
    /// Trailing horizon for errors, frustration and mismatches (default: 3600s)
    pub stressor_horizon_secs: i64,
    /// Trailing horizon for the urgency signal (default: 900s)
    pub pressure_horizon_secs: i64,
    pub stress_baseline: ClassBaseline,
    pub fatigue_baseline: ClassBaseline,
    pub error_penalty: f64,
    pub frustration_penalty: f64,
    /// Per urgency point above 3
    pub urgency_penalty: f64,
    pub mismatch_penalty: f64,
    pub battery_low_threshold: u8,
    pub battery_penalty: f64,
    pub constrained_device_penalty: f64,
    pub idle_tick_secs: i64,
    pub idle_decay_per_tick: f64,
    /// A gap longer than this starts a new session (default: 1800s)
    pub session_gap_secs: i64,
    /// A break at least this long starts a new session (default: 900s)
    pub break_reset_secs: u64,
    pub session_breakpoints: Vec<SessionBreakpoint>,
    pub break_relief_per_min: f64,
    pub max_relief_per_break: f64,
    pub time_of_day: TimeOfDayFatigue,
    /// Operator's offset from UTC in minutes for time-of-day bucketing
    pub utc_offset_minutes: i32,
    pub trend: TrendThresholds,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            window_capacity: 512,
            stressor_horizon_secs: 3600,
            pressure_horizon_secs: 900,
            stress_baseline: ClassBaseline::stress_defaults(),
            fatigue_baseline: ClassBaseline::fatigue_defaults(),
            error_penalty: 8.0,
            frustration_penalty: 6.0,
            urgency_penalty: 7.0,
            mismatch_penalty: 10.0,
            battery_low_threshold: 20,
            battery_penalty: 10.0,
            constrained_device_penalty: 5.0,
            idle_tick_secs: 300,
            idle_decay_per_tick: 2.0,
            session_gap_secs: 1800,
            break_reset_secs: 900,
            session_breakpoints: vec![
                SessionBreakpoint { after_mins: 60, fatigue: 15.0 },
                SessionBreakpoint { after_mins: 120, fatigue: 15.0 },
                SessionBreakpoint { after_mins: 240, fatigue: 20.0 },
            ],
            break_relief_per_min: 1.0,
            max_relief_per_break: 20.0,
            time_of_day: TimeOfDayFatigue::default(),
            utc_offset_minutes: 0,
            trend: TrendThresholds::default(),
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.window_capacity == 0 {
            return Err("telemetry window_capacity must be positive".into());
        }
        if self.stressor_horizon_secs <= 0 || self.pressure_horizon_secs <= 0 {
            return Err("telemetry horizons must be positive".into());
        }
        if self.idle_tick_secs <= 0 {
            return Err("idle_tick_secs must be positive".into());
        }
        if self.trend.window == 0 || self.trend.min_samples > self.trend.window {
            return Err("trend.min_samples must not exceed a positive trend.window".into());
        }
        if !(-14 * 60..=14 * 60).contains(&self.utc_offset_minutes) {
            return Err(format!("utc_offset_minutes out of range: {}", self.utc_offset_minutes));
        }
        Ok(())
    }
}
