use crate::config::{ArchetypeDef, ThreatConfig};
use crate::pattern::ThreatPattern;

/// Lowercase and collapse whitespace.
pub fn normalize(input: &str) -> String {
    input
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cheap stable hash of normalized input, used as cache key and audit
/// reference.
pub fn input_hash(normalized: &str) -> u64 {
    let digest = blake3::hash(normalized.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_be_bytes(prefix)
}

/// Score one archetype against normalized text.
///
/// Each marker contributes `weight × (1 + step × (occurrences − 1))`,
/// multiplied by the positional bonus when its first occurrence falls in the
/// leading window. Every distinct marker beyond the first adds the context
/// bonus. The sum is divided by `max(1, sqrt(words / reference_words))` and
/// clamped to [0, 1]. Returns a pattern only at or above the detection
/// threshold.
pub fn score_archetype(
    normalized: &str,
    archetype: &ArchetypeDef,
    config: &ThreatConfig,
) -> Option<ThreatPattern> {
    if normalized.is_empty() {
        return None;
    }
    let len = normalized.len() as f64;
    let mut raw = 0.0;
    let mut fired = Vec::new();

    for marker in &archetype.markers {
        let needle = marker.text.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        let mut positions = normalized.match_indices(needle.as_str()).map(|(i, _)| i);
        let Some(first) = positions.next() else {
            continue;
        };
        let occurrences = (1 + positions.count()).min(config.max_counted_occurrences);
        let mut contribution =
            marker.weight * (1.0 + config.frequency_step * (occurrences as f64 - 1.0));
        if (first as f64) / len < config.positional_window {
            contribution *= config.positional_bonus;
        }
        raw += contribution;
        fired.push(marker.text.clone());
    }

    if fired.is_empty() {
        return None;
    }
    raw += config.context_bonus * (fired.len() as f64 - 1.0);

    let words = normalized.split(' ').count() as f64;
    let length_norm = (words / config.reference_words as f64).sqrt().max(1.0);
    let score = (raw / length_norm).clamp(0.0, 1.0);

    if score < config.detection_threshold {
        return None;
    }
    Some(ThreatPattern {
        archetype: archetype.name.clone(),
        confidence: score,
        markers: fired,
        severity: config.bands.classify(score),
        threat_vector: archetype.threat_vector.clone(),
    })
}

/// Score every archetype sequentially.
pub fn score_all(normalized: &str, config: &ThreatConfig) -> Vec<ThreatPattern> {
    config
        .archetypes
        .iter()
        .filter_map(|a| score_archetype(normalized, a, config))
        .collect()
}
