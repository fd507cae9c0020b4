use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_types::{DeviceId, IdentityId, SharedClock};

/// Challenge handed to the operator. The expected answer never leaves the
/// issuer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceChallenge {
    pub nonce_id: String,
    pub prompt: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NonceCheck {
    Valid { identity: IdentityId },
    Unknown,
    Expired,
    WrongAnswer,
    DeviceMismatch,
}

struct PendingNonce {
    device_id: DeviceId,
    identity: IdentityId,
    answer_hash: blake3::Hash,
    expires_at: DateTime<Utc>,
}

fn normalize_answer(answer: &str) -> String {
    answer
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn answer_hash(nonce_id: &str, answer: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(nonce_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(normalize_answer(answer).as_bytes());
    hasher.finalize()
}

/// Issues single-use semantic challenges bound to a device.
pub struct NonceIssuer {
    pending: Mutex<HashMap<String, PendingNonce>>,
    clock: SharedClock,
}

impl NonceIssuer {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn issue(
        &self,
        device_id: DeviceId,
        identity: IdentityId,
        prompt: impl Into<String>,
        expected_answer: &str,
        ttl: Duration,
    ) -> NonceChallenge {
        let nonce_id = Uuid::new_v4().to_string();
        let expires_at = self.clock.now() + ttl;
        let pending = PendingNonce {
            device_id,
            identity,
            answer_hash: answer_hash(&nonce_id, expected_answer),
            expires_at,
        };

        let mut map = self.pending.lock();
        let now = self.clock.now();
        map.retain(|_, p| p.expires_at > now);
        map.insert(nonce_id.clone(), pending);

        NonceChallenge {
            nonce_id,
            prompt: prompt.into(),
            expires_at,
        }
    }

    /// Check an answer. The nonce is consumed regardless of the outcome.
    pub fn verify(&self, device_id: &DeviceId, nonce_id: &str, answer: &str) -> NonceCheck {
        let Some(pending) = self.pending.lock().remove(nonce_id) else {
            return NonceCheck::Unknown;
        };
        if &pending.device_id != device_id {
            return NonceCheck::DeviceMismatch;
        }
        if pending.expires_at <= self.clock.now() {
            return NonceCheck::Expired;
        }
        // blake3::Hash equality is constant-time
        if pending.answer_hash != answer_hash(nonce_id, answer) {
            return NonceCheck::WrongAnswer;
        }
        NonceCheck::Valid {
            identity: pending.identity,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}
