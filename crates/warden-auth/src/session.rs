use std::fmt;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use warden_storage::SharedKvStore;
use warden_types::{DeviceId, IdentityId, SharedClock};

use crate::error::AuthResult;

const LIVE_PREFIX: &str = "session/live/";
const SPENT_PREFIX: &str = "session/spent/";

/// Default minimum gap between the expiry sweeps `mint` runs.
pub const DEFAULT_SWEEP_INTERVAL_SECS: i64 = 60;

/// Minted session token handed back to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub limited: bool,
}

/// What the table stores for a live token. The token itself is never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub device_id: DeviceId,
    pub identity: Option<IdentityId>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub origin: Option<String>,
    pub limited: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct SpentMarker {
    device_id: DeviceId,
    expires_at: DateTime<Utc>,
}

/// Why a presented token was not accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionRejection {
    Unknown,
    Expired,
    Replayed,
    DeviceMismatch,
    OriginMismatch,
}

impl SessionRejection {
    /// Replayed or foreign tokens deny outright.
    pub fn is_hard(&self) -> bool {
        matches!(
            self,
            SessionRejection::Replayed
                | SessionRejection::DeviceMismatch
                | SessionRejection::OriginMismatch
        )
    }
}

impl fmt::Display for SessionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionRejection::Unknown => "session token unknown",
            SessionRejection::Expired => "session token expired",
            SessionRejection::Replayed => "session token replayed",
            SessionRejection::DeviceMismatch => "session token bound to another device",
            SessionRejection::OriginMismatch => "session token presented from another origin",
        };
        f.write_str(text)
    }
}

/// blake3 digest of a token, hex encoded. Used as the storage key.
pub fn token_digest(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

/// Short digest prefix safe to log and audit.
pub fn token_fingerprint(token: &str) -> String {
    token_digest(token)[..16].to_string()
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Single-use, time-boxed, device-bound session tokens over a [`KvStore`].
///
/// Consumption is an atomic `take`, so a token admits at most one request.
/// A spent marker is written before the take and kept until the token's
/// original expiry, so any later presentation is recognised as a replay.
/// Minting sweeps expired entries at most once per sweep interval.
///
/// [`KvStore`]: warden_storage::KvStore
pub struct SessionTokenTable {
    store: SharedKvStore,
    clock: SharedClock,
    sweep_every: Duration,
    next_sweep: Mutex<DateTime<Utc>>,
}

impl SessionTokenTable {
    pub fn new(store: SharedKvStore, clock: SharedClock) -> Self {
        let sweep_every = Duration::seconds(DEFAULT_SWEEP_INTERVAL_SECS);
        let next_sweep = Mutex::new(clock.now() + sweep_every);
        Self {
            store,
            clock,
            sweep_every,
            next_sweep,
        }
    }

    pub fn with_sweep_interval(mut self, every: Duration) -> Self {
        self.sweep_every = every;
        *self.next_sweep.get_mut() = self.clock.now() + every;
        self
    }

    fn sweep_due(&self, now: DateTime<Utc>) -> bool {
        let mut next = self.next_sweep.lock();
        if now < *next {
            return false;
        }
        *next = now + self.sweep_every;
        true
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn mint(
        &self,
        device_id: &DeviceId,
        identity: Option<IdentityId>,
        ttl: Duration,
        limited: bool,
        origin: Option<String>,
    ) -> AuthResult<SessionGrant> {
        let issued_at = self.clock.now();
        if self.sweep_due(issued_at) {
            match self.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "Expired session entries purged"),
                Err(e) => warn!(error = %e, "Session sweep failed"),
            }
        }

        let token = generate_token();
        let record = SessionRecord {
            device_id: device_id.clone(),
            identity,
            issued_at,
            expires_at: issued_at + ttl,
            origin,
            limited,
        };
        self.store
            .put(
                &format!("{LIVE_PREFIX}{}", token_digest(&token)),
                serde_json::to_value(&record)?,
            )
            .await?;
        debug!(
            device_id = %device_id,
            fingerprint = %token_fingerprint(&token),
            limited,
            "Session token minted"
        );
        Ok(SessionGrant {
            token,
            expires_at: record.expires_at,
            limited,
        })
    }

    /// Consume a token for `device_id`. The token is spent whether or not it
    /// is accepted.
    pub async fn consume(
        &self,
        token: &str,
        device_id: &DeviceId,
        origin: Option<&str>,
    ) -> AuthResult<Result<SessionRecord, SessionRejection>> {
        let digest = token_digest(token);
        let now = self.clock.now();

        let live_key = format!("{LIVE_PREFIX}{digest}");
        let spent_key = format!("{SPENT_PREFIX}{digest}");

        // The marker lands before the take, so a presentation that loses the
        // take always finds it.
        let Some(live) = self.store.get(&live_key).await? else {
            return Ok(Err(self.missing(&spent_key).await?));
        };
        let record: SessionRecord = serde_json::from_value(live)?;
        let marker = SpentMarker {
            device_id: record.device_id.clone(),
            expires_at: record.expires_at,
        };
        self.store
            .put(&spent_key, serde_json::to_value(&marker)?)
            .await?;
        let Some(value) = self.store.take(&live_key).await? else {
            return Ok(Err(self.missing(&spent_key).await?));
        };
        let record: SessionRecord = serde_json::from_value(value)?;

        let rejection = if &record.device_id != device_id {
            Some(SessionRejection::DeviceMismatch)
        } else if record.expires_at <= now {
            Some(SessionRejection::Expired)
        } else {
            match (record.origin.as_deref(), origin) {
                (Some(bound), Some(seen)) if bound != seen => Some(SessionRejection::OriginMismatch),
                _ => None,
            }
        };

        match rejection {
            Some(rejection) => {
                warn!(
                    device_id = %device_id,
                    fingerprint = %&digest[..16],
                    reason = %rejection,
                    "Session token rejected"
                );
                Ok(Err(rejection))
            }
            None => Ok(Ok(record)),
        }
    }

    async fn missing(&self, spent_key: &str) -> AuthResult<SessionRejection> {
        Ok(match self.store.get(spent_key).await? {
            Some(_) => SessionRejection::Replayed,
            None => SessionRejection::Unknown,
        })
    }

    /// Invalidate a minted token without consuming it for a request.
    pub async fn revoke(&self, token: &str) -> AuthResult<bool> {
        Ok(self
            .store
            .delete(&format!("{LIVE_PREFIX}{}", token_digest(token)))
            .await?)
    }

    /// Drop expired live tokens and spent markers. Returns how many entries
    /// were removed.
    pub async fn purge_expired(&self) -> AuthResult<usize> {
        let now = self.clock.now();
        let mut removed = 0;
        for (key, value) in self.store.scan_prefix(LIVE_PREFIX).await? {
            let record: SessionRecord = serde_json::from_value(value)?;
            if record.expires_at <= now && self.store.delete(&key).await? {
                removed += 1;
            }
        }
        for (key, value) in self.store.scan_prefix(SPENT_PREFIX).await? {
            let marker: SpentMarker = serde_json::from_value(value)?;
            if marker.expires_at <= now && self.store.delete(&key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
