use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pattern::Severity;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDef {
    pub text: String,
    pub weight: f64,
}

/// One named category of dangerous behavior and its literal markers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeDef {
    pub name: String,
    pub threat_vector: String,
    pub markers: Vec<MarkerDef>,
}

/// Score-to-severity bands; a score at or above a bound takes its band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityBands {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for SeverityBands {
    fn default() -> Self {
        Self {
            critical: 0.8,
            high: 0.6,
            medium: 0.4,
        }
    }
}

impl SeverityBands {
    pub fn classify(&self, score: f64) -> Severity {
        if score >= self.critical {
            Severity::Critical
        } else if score >= self.high {
            Severity::High
        } else if score >= self.medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Representative score for a severity, used by the keyword fallback.
    pub fn floor_of(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => 0.0,
        }
    }
}

/// High-risk keyword checked by the single-pass fallback scan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FallbackKeyword {
    pub keyword: String,
    pub archetype: String,
    pub severity: Severity,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreatConfig {
    pub archetypes: Vec<ArchetypeDef>,
    /// Minimum score for an archetype to be reported (default: 0.25)
    pub detection_threshold: f64,
    pub bands: SeverityBands,
    /// Leading share of the text that earns the positional bonus (default: 0.3)
    pub positional_window: f64,
    /// Multiplier for markers first seen in the positional window (default: 1.2)
    pub positional_bonus: f64,
    /// Added per repeat occurrence of a marker (default: 0.25)
    pub frequency_step: f64,
    /// Occurrences counted per marker (default: 4)
    pub max_counted_occurrences: usize,
    /// Added per distinct marker beyond the first (default: 0.1)
    pub context_bonus: f64,
    /// Inputs up to this many words are not length-penalized (default: 40)
    pub reference_words: usize,
    /// Hard limit for the full archetype scan (default: 50ms)
    pub timeout_ms: u64,
    pub cache_capacity: usize,
    /// Top severities that map to ESCALATE rather than MODIFY
    pub escalate_severities: Vec<Severity>,
    pub fallback_keywords: Vec<FallbackKeyword>,
}

fn marker(text: &str, weight: f64) -> MarkerDef {
    MarkerDef {
        text: text.into(),
        weight,
    }
}

fn keyword(keyword: &str, archetype: &str, severity: Severity) -> FallbackKeyword {
    FallbackKeyword {
        keyword: keyword.into(),
        archetype: archetype.into(),
        severity,
    }
}

impl ThreatConfig {
    /// The shipped archetype library. Deployments are expected to replace it.
    pub fn default_archetypes() -> Vec<ArchetypeDef> {
        vec![
            ArchetypeDef {
                name: "destructive_system_action".into(),
                threat_vector: "system destruction".into(),
                markers: vec![
                    marker("rm -rf", 0.6),
                    marker("delete all backups", 0.5),
                    marker("drop database", 0.6),
                    marker("drop table", 0.4),
                    marker("format the disk", 0.5),
                    marker("wipe the server", 0.5),
                    marker("mkfs", 0.5),
                    marker("kill -9", 0.3),
                ],
            },
            ArchetypeDef {
                name: "credential_exfiltration".into(),
                threat_vector: "data exfiltration".into(),
                markers: vec![
                    marker("/etc/shadow", 0.6),
                    marker("private key", 0.4),
                    marker("dump the credentials", 0.6),
                    marker("send me the password", 0.5),
                    marker("export all user data", 0.5),
                    marker("api key", 0.3),
                    marker("password", 0.15),
                ],
            },
            ArchetypeDef {
                name: "safety_bypass".into(),
                threat_vector: "guardrail evasion".into(),
                markers: vec![
                    marker("ignore previous instructions", 0.6),
                    marker("disable safety", 0.5),
                    marker("bypass the filter", 0.5),
                    marker("jailbreak", 0.5),
                    marker("pretend you have no rules", 0.5),
                    marker("without any restrictions", 0.35),
                    marker("developer mode", 0.3),
                ],
            },
            ArchetypeDef {
                name: "social_engineering".into(),
                threat_vector: "manipulation".into(),
                markers: vec![
                    marker("urgent wire transfer", 0.5),
                    marker("gift cards", 0.35),
                    marker("the ceo needs", 0.35),
                    marker("keep this between us", 0.3),
                    marker("don't tell anyone", 0.3),
                    marker("verify your account", 0.3),
                    marker("act now or", 0.25),
                ],
            },
        ]
    }

    pub fn default_fallback_keywords() -> Vec<FallbackKeyword> {
        vec![
            keyword("rm -rf", "destructive_system_action", Severity::Critical),
            keyword("drop database", "destructive_system_action", Severity::Critical),
            keyword("/etc/shadow", "credential_exfiltration", Severity::High),
            keyword("private key", "credential_exfiltration", Severity::High),
            keyword("ignore previous instructions", "safety_bypass", Severity::High),
            keyword("jailbreak", "safety_bypass", Severity::Medium),
            keyword("wire transfer", "social_engineering", Severity::Medium),
        ]
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn threat_vector_of(&self, archetype: &str) -> &str {
        self.archetypes
            .iter()
            .find(|a| a.name == archetype)
            .map(|a| a.threat_vector.as_str())
            .unwrap_or("unclassified")
    }

    pub fn validate(&self) -> Result<(), String> {
        let b = &self.bands;
        if !(b.critical <= 1.0
            && b.critical >= b.high
            && b.high >= b.medium
            && b.medium >= self.detection_threshold
            && self.detection_threshold > 0.0)
        {
            return Err(format!(
                "severity bands must satisfy 1 >= critical >= high >= medium >= detection_threshold > 0 (got {} / {} / {} / {})",
                b.critical, b.high, b.medium, self.detection_threshold
            ));
        }
        let mut names = HashSet::new();
        for archetype in &self.archetypes {
            if archetype.name.trim().is_empty() {
                return Err("archetype names must not be empty".into());
            }
            if !names.insert(archetype.name.as_str()) {
                return Err(format!("duplicate archetype '{}'", archetype.name));
            }
            if archetype.markers.is_empty() {
                return Err(format!("archetype '{}' has no markers", archetype.name));
            }
            for m in &archetype.markers {
                if m.text.trim().is_empty() || !(m.weight > 0.0 && m.weight.is_finite()) {
                    return Err(format!(
                        "archetype '{}' has an empty marker or non-positive weight",
                        archetype.name
                    ));
                }
            }
        }
        if self.fallback_keywords.iter().any(|k| k.keyword.trim().is_empty()) {
            return Err("fallback keywords must not be empty".into());
        }
        if self.cache_capacity == 0 {
            return Err("threat cache_capacity must be positive".into());
        }
        if self.timeout_ms == 0 {
            return Err("threat timeout_ms must be positive".into());
        }
        if self.reference_words == 0 || self.max_counted_occurrences == 0 {
            return Err("reference_words and max_counted_occurrences must be positive".into());
        }
        if !(0.0..=1.0).contains(&self.positional_window) || self.positional_bonus < 1.0 {
            return Err("positional_window must be in [0, 1] and positional_bonus >= 1".into());
        }
        Ok(())
    }
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            archetypes: Self::default_archetypes(),
            detection_threshold: 0.25,
            bands: SeverityBands::default(),
            positional_window: 0.3,
            positional_bonus: 1.2,
            frequency_step: 0.25,
            max_counted_occurrences: 4,
            context_bonus: 0.1,
            reference_words: 40,
            timeout_ms: 50,
            cache_capacity: 1024,
            escalate_severities: vec![Severity::High, Severity::Medium],
            fallback_keywords: Self::default_fallback_keywords(),
        }
    }
}
