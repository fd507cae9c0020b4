use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Outcome of an audited action, appended after the fact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutcomeTracking {
    /// Whether the action ran to completion
    pub action_completed: bool,
    /// Operator satisfaction (0–10), if collected
    pub satisfaction_score: Option<u8>,
    /// Whether the action caused complications
    pub complications: bool,
    /// Free-text lessons learned
    pub lessons: Vec<String>,
    /// When the outcome was recorded
    pub recorded_at: DateTime<Utc>,
}

/// One retained audit record.
///
/// `entry`, `previous_hash` and `entry_hash` never change after append. Only
/// `outcome` may transition from `None` to `Some` once.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditRecord<E> {
    pub id: Uuid,
    /// Monotonic position in the log, surviving evictions
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub entry: E,
    pub previous_hash: Option<String>,
    pub entry_hash: String,
    pub outcome: Option<OutcomeTracking>,
}

impl<E: Serialize> AuditRecord<E> {
    /// Seal a new record onto the chain.
    pub(crate) fn seal(
        sequence: u64,
        recorded_at: DateTime<Utc>,
        entry: E,
        previous_hash: Option<String>,
    ) -> Result<Self, serde_json::Error> {
        let id = Uuid::new_v4();
        let entry_hash =
            compute_hash(id, sequence, recorded_at, &entry, previous_hash.as_deref())?;
        Ok(Self {
            id,
            sequence,
            recorded_at,
            entry,
            previous_hash,
            entry_hash,
            outcome: None,
        })
    }

    /// Recompute this record's hash and compare it with the stored one.
    pub fn verify(&self) -> bool {
        compute_hash(
            self.id,
            self.sequence,
            self.recorded_at,
            &self.entry,
            self.previous_hash.as_deref(),
        )
        .map(|h| h == self.entry_hash)
        .unwrap_or(false)
    }
}

fn compute_hash<E: Serialize>(
    id: Uuid,
    sequence: u64,
    recorded_at: DateTime<Utc>,
    entry: &E,
    previous_hash: Option<&str>,
) -> Result<String, serde_json::Error> {
    let entry_json = serde_json::to_string(entry)?;
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(sequence.to_be_bytes());
    hasher.update(recorded_at.to_rfc3339().as_bytes());
    hasher.update(previous_hash.unwrap_or("").as_bytes());
    hasher.update(entry_json.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
