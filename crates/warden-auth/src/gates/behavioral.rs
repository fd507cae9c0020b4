use std::sync::Arc;

use async_trait::async_trait;
use warden_types::{ConfigCell, DeviceId, IdentityId};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::gate::{AuthGate, GateEvidence, GateFinding, GateId};
use crate::registry::{BehavioralProfile, DeviceRegistry};
use crate::request::{AuthContext, AuthRequest, BehavioralSample};

const PHRASE_WEIGHT: f64 = 0.7;
const CADENCE_WEIGHT: f64 = 0.3;

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Similarity in [0, 1] between a sample and an enrolled profile.
///
/// Phrase overlap is the share of the profile's signature phrases found in
/// the sample. When both sides carry a cadence, relative cadence closeness
/// is blended in.
pub fn profile_similarity(sample: &BehavioralSample, profile: &BehavioralProfile) -> f64 {
    if profile.signature_phrases.is_empty() {
        return 0.0;
    }
    let sample_text: Vec<String> = sample.phrases.iter().map(|p| normalize(p)).collect();
    let matched = profile
        .signature_phrases
        .iter()
        .map(|p| normalize(p))
        .filter(|p| !p.is_empty() && sample_text.iter().any(|s| s.contains(p.as_str())))
        .count();
    let phrase_score = matched as f64 / profile.signature_phrases.len() as f64;

    match (sample.cadence_ms, profile.typical_cadence_ms) {
        (Some(seen), Some(typical)) if typical > 0.0 => {
            let cadence_score = 1.0 - ((seen - typical).abs() / typical).min(1.0);
            PHRASE_WEIGHT * phrase_score + CADENCE_WEIGHT * cadence_score
        }
        _ => phrase_score,
    }
}

/// Matches the caller's behavioral sample against every enrolled profile.
pub struct BehavioralCodexGate {
    registry: Arc<DeviceRegistry>,
    config: Arc<ConfigCell<AuthConfig>>,
}

impl BehavioralCodexGate {
    pub fn new(registry: Arc<DeviceRegistry>, config: Arc<ConfigCell<AuthConfig>>) -> Self {
        Self { registry, config }
    }
}

#[async_trait]
impl AuthGate for BehavioralCodexGate {
    fn gate_id(&self) -> GateId {
        GateId::BehavioralCodex
    }

    async fn evaluate(
        &self,
        _device_id: &DeviceId,
        request: &AuthRequest,
        _context: &AuthContext,
    ) -> Result<GateFinding, AuthError> {
        let Some(sample) = request.behavior.as_ref() else {
            return Ok(GateFinding::failed("no behavioral sample"));
        };

        let mut best: Option<(IdentityId, f64)> = None;
        for (identity, profile) in self.registry.profiles() {
            let similarity = profile_similarity(sample, &profile);
            if best.as_ref().map_or(true, |(_, s)| similarity > *s) {
                best = Some((identity, similarity));
            }
        }
        let Some((identity, similarity)) = best else {
            return Ok(GateFinding::failed("no behavioral profiles enrolled"));
        };

        let threshold = self.config.load().value.behavior_min_similarity;
        if similarity < threshold {
            return Ok(GateFinding::failed(format!(
                "behavioral similarity {similarity:.2} below {threshold:.2}"
            )));
        }
        Ok(GateFinding::Verified {
            confidence: similarity * 100.0,
            evidence: GateEvidence::BehavioralCodex {
                identity,
                similarity,
            },
        })
    }
}
