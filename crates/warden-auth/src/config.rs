use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Thresholds and timings for the authentication stage.
///
/// Confidence values are on the 0–100 scale used by gate results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Crypto-attestation confidence that satisfies quorum alone (default: 90)
    pub tau_high: f64,
    /// Per-gate confidence required for a full ALLOW quorum (default: 70)
    pub tau_medium: f64,
    /// Minimum mean confidence for a LIMITED grant from several gates (default: 40)
    pub tau_low: f64,
    /// Per-gate timeout in milliseconds (default: 250)
    pub gate_timeout_ms: u64,
    /// Confidence reported by a verified crypto attestation (default: 95)
    pub crypto_confidence: f64,
    /// Confidence reported by a correct semantic-nonce answer (default: 85)
    pub nonce_confidence: f64,
    /// Confidence reported by a valid session token (default: 80)
    pub session_confidence: f64,
    /// Minimum behavioral similarity (0–1) for the codex gate to succeed (default: 0.55)
    pub behavior_min_similarity: f64,
    /// Session token lifetime for ALLOW grants, seconds (default: 900)
    pub session_token_ttl_secs: u64,
    /// Session token lifetime for LIMITED grants, seconds (default: 300)
    pub limited_token_ttl_secs: u64,
    /// Re-authentication deadline attached to LIMITED grants, seconds (default: 600)
    pub limited_reauth_secs: u64,
    /// Semantic nonce lifetime, seconds (default: 120)
    pub nonce_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tau_high: 90.0,
            tau_medium: 70.0,
            tau_low: 40.0,
            gate_timeout_ms: 250,
            crypto_confidence: 95.0,
            nonce_confidence: 85.0,
            session_confidence: 80.0,
            behavior_min_similarity: 0.55,
            session_token_ttl_secs: 900,
            limited_token_ttl_secs: 300,
            limited_reauth_secs: 600,
            nonce_ttl_secs: 120,
        }
    }
}

impl AuthConfig {
    pub fn gate_timeout(&self) -> Duration {
        Duration::from_millis(self.gate_timeout_ms)
    }

    /// Check internal consistency of the thresholds.
    pub fn validate(&self) -> Result<(), String> {
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        for (name, value) in [
            ("tau_high", self.tau_high),
            ("tau_medium", self.tau_medium),
            ("tau_low", self.tau_low),
            ("crypto_confidence", self.crypto_confidence),
            ("nonce_confidence", self.nonce_confidence),
            ("session_confidence", self.session_confidence),
        ] {
            if !in_range(value) {
                return Err(format!("{name} must be within [0, 100], got {value}"));
            }
        }
        if !(self.tau_high >= self.tau_medium && self.tau_medium >= self.tau_low) {
            return Err(format!(
                "thresholds must satisfy tau_high >= tau_medium >= tau_low (got {} / {} / {})",
                self.tau_high, self.tau_medium, self.tau_low
            ));
        }
        if !(0.0..=1.0).contains(&self.behavior_min_similarity) {
            return Err("behavior_min_similarity must be within [0, 1]".into());
        }
        if self.gate_timeout_ms == 0 {
            return Err("gate_timeout_ms must be positive".into());
        }
        if self.session_token_ttl_secs == 0 || self.limited_token_ttl_secs == 0 {
            return Err("session token lifetimes must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(AuthConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let config = AuthConfig {
            tau_medium: 95.0,
            ..AuthConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
