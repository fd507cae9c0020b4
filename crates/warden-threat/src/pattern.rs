use std::fmt;

use serde::{Deserialize, Serialize};
use warden_types::DeviceId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One archetype match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThreatPattern {
    pub archetype: String,
    /// 0–1
    pub confidence: f64,
    /// Markers that fired, in configuration order.
    pub markers: Vec<String>,
    pub severity: Severity,
    pub threat_vector: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionAction {
    Allow,
    Modify,
    Block,
    Escalate,
}

impl DetectionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionAction::Allow => "ALLOW",
            DetectionAction::Modify => "MODIFY",
            DetectionAction::Block => "BLOCK",
            DetectionAction::Escalate => "ESCALATE",
        }
    }
}

impl fmt::Display for DetectionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a pattern set to an action.
pub fn derive_action(patterns: &[ThreatPattern], escalate: &[Severity]) -> DetectionAction {
    match patterns.iter().map(|p| p.severity).max() {
        None => DetectionAction::Allow,
        Some(Severity::Critical) => DetectionAction::Block,
        Some(top) if escalate.contains(&top) => DetectionAction::Escalate,
        Some(_) => DetectionAction::Modify,
    }
}

/// Caller context for a detection. Only used for audit attribution.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionContext {
    #[serde(default)]
    pub device_id: Option<DeviceId>,
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionVerdict {
    /// Ordered by severity (highest first), then archetype name.
    pub patterns: Vec<ThreatPattern>,
    /// False when any pattern is HIGH or CRITICAL.
    pub safe: bool,
    pub processing_ms: u64,
    pub recommendations: Vec<String>,
    pub action: DetectionAction,
    /// Answered by the fallback keyword scan.
    pub degraded: bool,
    pub cached: bool,
    pub input_hash: String,
    pub config_version: u64,
}

impl DetectionVerdict {
    /// Assemble a verdict from scored patterns.
    pub fn from_patterns(
        mut patterns: Vec<ThreatPattern>,
        escalate: &[Severity],
        degraded: bool,
        input_hash: String,
        config_version: u64,
    ) -> Self {
        patterns.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.archetype.cmp(&b.archetype))
        });
        let action = derive_action(&patterns, escalate);
        let safe = patterns.iter().all(|p| p.severity < Severity::High);
        let mut recommendations: Vec<String> = patterns.iter().map(recommendation).collect();
        if degraded {
            recommendations.push("Full archetype scan timed out; verdict from keyword fallback".into());
        }
        Self {
            patterns,
            safe,
            processing_ms: 0,
            recommendations,
            action,
            degraded,
            cached: false,
            input_hash,
            config_version,
        }
    }

    /// Deny-by-default verdict for an internal fault.
    pub fn internal_fault(fault: &str, input_hash: String, config_version: u64) -> Self {
        Self {
            patterns: Vec::new(),
            safe: false,
            processing_ms: 0,
            recommendations: vec![format!(
                "Internal fault during screening ({fault}); blocked by default"
            )],
            action: DetectionAction::Block,
            degraded: true,
            cached: false,
            input_hash,
            config_version,
        }
    }

    /// Equal in everything except processing metadata.
    pub fn same_outcome(&self, other: &DetectionVerdict) -> bool {
        self.patterns == other.patterns
            && self.safe == other.safe
            && self.recommendations == other.recommendations
            && self.action == other.action
            && self.degraded == other.degraded
            && self.input_hash == other.input_hash
            && self.config_version == other.config_version
    }

    pub fn top_severity(&self) -> Option<Severity> {
        self.patterns.first().map(|p| p.severity)
    }
}

fn recommendation(pattern: &ThreatPattern) -> String {
    let subject = format!("{} ({})", pattern.archetype, pattern.threat_vector);
    match pattern.severity {
        Severity::Critical => format!("Refuse: {subject} detected"),
        Severity::High => format!("Escalate for human review: {subject}"),
        Severity::Medium => format!("Proceed with caution: {subject}"),
        Severity::Low => format!("Clarify intent before acting: {subject}"),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub archetype: String,
    pub severity: Severity,
    pub confidence: f64,
}

/// Audit form of a detection: the input hash and verdict, never raw text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionAuditRecord {
    pub input_hash: String,
    pub device_id: Option<DeviceId>,
    pub action: DetectionAction,
    pub safe: bool,
    pub patterns: Vec<PatternSummary>,
    pub degraded: bool,
    pub cached: bool,
    pub config_version: u64,
    pub processing_ms: u64,
}

impl DetectionAuditRecord {
    pub fn new(verdict: &DetectionVerdict, context: &DetectionContext) -> Self {
        Self {
            input_hash: verdict.input_hash.clone(),
            device_id: context.device_id.clone(),
            action: verdict.action,
            safe: verdict.safe,
            patterns: verdict
                .patterns
                .iter()
                .map(|p| PatternSummary {
                    archetype: p.archetype.clone(),
                    severity: p.severity,
                    confidence: p.confidence,
                })
                .collect(),
            degraded: verdict.degraded,
            cached: verdict.cached,
            config_version: verdict.config_version,
            processing_ms: verdict.processing_ms,
        }
    }
}
