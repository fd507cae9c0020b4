use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Thresholds, cooling-off periods and counters for the restraint stage.
///
/// Stress, fatigue and time pressure are on the 0–100 telemetry scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestraintConfig {
    /// Stress at or above this forces HOLD (default: 85)
    pub stress_critical: f64,
    /// Fatigue at or above this forces HOLD (default: 85)
    pub fatigue_critical: f64,
    /// Lower edge of the "elevated, not critical" band (default: 60)
    pub stress_elevated: f64,
    pub fatigue_elevated: f64,
    /// Stress above this makes even a PROCEED audit-required (default: 50)
    pub stress_warning: f64,
    /// Time pressure that, with elevated stress, forces HOLD (default: 80)
    pub time_pressure_high: f64,

    /// Cooling-off when stress and fatigue are both critical (default: 45 min)
    pub cooling_off_both_critical_mins: i64,
    /// Cooling-off when one of stress or fatigue is critical (default: 20 min)
    pub cooling_off_single_critical_mins: i64,
    /// Cooling-off for high time pressure under elevated stress (default: 10 min)
    pub cooling_off_pressure_mins: i64,
    /// Cooling-off after the frequency cap is hit (default: 15 min)
    pub cooling_off_frequency_mins: i64,

    /// Scopes at or above this complexity weight worsen capability fit a notch (default: 4)
    pub complexity_weight_threshold: u8,

    /// Trailing window for released-action counting (default: 3600 s)
    pub frequency_window_secs: i64,
    /// Released actions in the window that downgrade to MODIFY (default: 10)
    pub frequency_lower: usize,
    /// Released actions in the window that force HOLD (default: 20)
    pub frequency_upper: usize,

    /// Time since the last major action that counts as an emergency (default: 72 h)
    pub dormancy_emergency_secs: i64,
    /// Lifetime of a granted override (default: 900 s)
    pub override_duration_secs: i64,
    /// Minimum spacing between override grants (default: 3600 s)
    pub override_cooldown_secs: i64,

    /// Confidence floor for PROCEED (default: 0.8)
    pub proceed_confidence_floor: f64,
}

impl Default for RestraintConfig {
    fn default() -> Self {
        Self {
            stress_critical: 85.0,
            fatigue_critical: 85.0,
            stress_elevated: 60.0,
            fatigue_elevated: 60.0,
            stress_warning: 50.0,
            time_pressure_high: 80.0,
            cooling_off_both_critical_mins: 45,
            cooling_off_single_critical_mins: 20,
            cooling_off_pressure_mins: 10,
            cooling_off_frequency_mins: 15,
            complexity_weight_threshold: 4,
            frequency_window_secs: 3600,
            frequency_lower: 10,
            frequency_upper: 20,
            dormancy_emergency_secs: 72 * 3600,
            override_duration_secs: 900,
            override_cooldown_secs: 3600,
            proceed_confidence_floor: 0.8,
        }
    }
}

impl RestraintConfig {
    pub fn frequency_window(&self) -> Duration {
        Duration::seconds(self.frequency_window_secs)
    }

    pub fn override_duration(&self) -> Duration {
        Duration::seconds(self.override_duration_secs)
    }

    pub fn override_cooldown(&self) -> Duration {
        Duration::seconds(self.override_cooldown_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.stress_elevated > self.stress_critical || self.fatigue_elevated > self.fatigue_critical
        {
            return Err("elevated thresholds must not exceed critical thresholds".into());
        }
        if self.stress_warning > self.stress_elevated {
            return Err("stress_warning must not exceed stress_elevated".into());
        }
        if self.frequency_lower > self.frequency_upper {
            return Err(format!(
                "frequency_lower ({}) exceeds frequency_upper ({})",
                self.frequency_lower, self.frequency_upper
            ));
        }
        if self.frequency_window_secs <= 0 {
            return Err("frequency_window_secs must be positive".into());
        }
        if self.override_duration_secs <= 0 || self.override_cooldown_secs < 0 {
            return Err("override duration must be positive and cooldown non-negative".into());
        }
        let cooling = [
            self.cooling_off_both_critical_mins,
            self.cooling_off_single_critical_mins,
            self.cooling_off_pressure_mins,
            self.cooling_off_frequency_mins,
        ];
        if cooling.iter().any(|m| *m <= 0) {
            return Err("cooling-off periods must be positive".into());
        }
        if !(0.0..=1.0).contains(&self.proceed_confidence_floor) {
            return Err("proceed_confidence_floor must be within [0, 1]".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RestraintConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_frequency_bounds_rejected() {
        let config = RestraintConfig {
            frequency_lower: 30,
            ..RestraintConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("frequency_lower"));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: RestraintConfig = serde_json::from_str(r#"{"stress_critical": 90.0}"#).unwrap();
        assert_eq!(config.stress_critical, 90.0);
        assert_eq!(config.frequency_upper, 20);
    }
}
