use std::collections::BTreeMap;

use crate::config::ThreatConfig;
use crate::pattern::{Severity, ThreatPattern};

/// Single pass over the high-risk keyword list. Matches are grouped per
/// archetype; each group takes the highest keyword severity and that band's
/// floor score as confidence.
pub fn fallback_scan(normalized: &str, config: &ThreatConfig) -> Vec<ThreatPattern> {
    let mut groups: BTreeMap<&str, (Severity, Vec<String>)> = BTreeMap::new();
    for entry in &config.fallback_keywords {
        if normalized.contains(entry.keyword.to_lowercase().as_str()) {
            let group = groups
                .entry(entry.archetype.as_str())
                .or_insert((entry.severity, Vec::new()));
            group.0 = group.0.max(entry.severity);
            group.1.push(entry.keyword.clone());
        }
    }
    groups
        .into_iter()
        .map(|(archetype, (severity, markers))| ThreatPattern {
            archetype: archetype.to_string(),
            confidence: config.bands.floor_of(severity),
            markers,
            severity,
            threat_vector: config.threat_vector_of(archetype).to_string(),
        })
        .collect()
}
