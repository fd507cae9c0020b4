use std::collections::{BTreeMap, HashMap, VecDeque};

use ed25519_dalek::VerifyingKey;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;
use warden_types::{DeviceId, IdentityId};

/// Attestation challenges remembered per device for replay detection.
const RECENT_CHALLENGES: usize = 256;

#[derive(Clone, Debug)]
pub struct DeviceEnrollment {
    pub identity: IdentityId,
    pub verifying_key: VerifyingKey,
    pub revoked: bool,
}

/// Enrolled behavioral signature for one identity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralProfile {
    pub signature_phrases: Vec<String>,
    #[serde(default)]
    pub typical_cadence_ms: Option<f64>,
}

/// Enrolled devices and identity profiles.
///
/// Shared by the crypto-attestation and behavioral-codex gates.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<DeviceId, DeviceEnrollment>>,
    profiles: RwLock<BTreeMap<IdentityId, BehavioralProfile>>,
    seen_challenges: RwLock<HashMap<DeviceId, VecDeque<String>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enroll_device(&self, device_id: DeviceId, identity: IdentityId, key: VerifyingKey) {
        info!(device_id = %device_id, identity = %identity, "Device enrolled");
        self.devices.write().insert(
            device_id,
            DeviceEnrollment {
                identity,
                verifying_key: key,
                revoked: false,
            },
        );
    }

    /// Revoke a device; returns false if it was not enrolled.
    pub fn revoke_device(&self, device_id: &DeviceId) -> bool {
        match self.devices.write().get_mut(device_id) {
            Some(enrollment) => {
                enrollment.revoked = true;
                info!(device_id = %device_id, "Device revoked");
                true
            }
            None => false,
        }
    }

    pub fn device(&self, device_id: &DeviceId) -> Option<DeviceEnrollment> {
        self.devices.read().get(device_id).cloned()
    }

    pub fn set_profile(&self, identity: IdentityId, profile: BehavioralProfile) {
        self.profiles.write().insert(identity, profile);
    }

    /// Snapshot of all profiles in identity order.
    pub fn profiles(&self) -> Vec<(IdentityId, BehavioralProfile)> {
        self.profiles
            .read()
            .iter()
            .map(|(id, p)| (id.clone(), p.clone()))
            .collect()
    }

    /// Record an attestation challenge. Returns false if the device already
    /// presented it.
    pub fn note_challenge(&self, device_id: &DeviceId, challenge: &str) -> bool {
        let mut seen = self.seen_challenges.write();
        let recent = seen.entry(device_id.clone()).or_default();
        if recent.iter().any(|c| c == challenge) {
            return false;
        }
        if recent.len() >= RECENT_CHALLENGES {
            recent.pop_front();
        }
        recent.push_back(challenge.to_string());
        true
    }
}
