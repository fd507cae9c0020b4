use std::collections::VecDeque;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_storage::SharedKvStore;
use warden_types::SharedClock;

use crate::error::{AuditError, AuditResult};
use crate::record::{AuditRecord, OutcomeTracking};

/// Audit log sizing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Maximum number of records retained per log (default: 1000)
    pub capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

/// Result of verifying the retained window of a log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainVerification {
    pub valid: bool,
    pub total_records: usize,
    pub verified_records: usize,
    pub first_invalid_sequence: Option<u64>,
    pub error_message: Option<String>,
}

struct Ring<E> {
    records: VecDeque<AuditRecord<E>>,
    next_sequence: u64,
    last_hash: Option<String>,
}

/// Capacity-bounded, hash-chained audit ring buffer.
///
/// Readers take the `ring` read lock only. Writers serialize on
/// `write_gate` and persist before publishing, so a failed store write leaves
/// the in-memory ring untouched.
pub struct AuditLog<E> {
    namespace: String,
    capacity: usize,
    store: SharedKvStore,
    clock: SharedClock,
    ring: RwLock<Ring<E>>,
    write_gate: tokio::sync::Mutex<()>,
    _entry: PhantomData<fn() -> E>,
}

impl<E> AuditLog<E>
where
    E: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Open the log stored under `namespace`, rebuilding the ring from the
    /// store. Records beyond `capacity` (oldest first) are evicted.
    pub async fn open(
        namespace: impl Into<String>,
        config: &AuditConfig,
        store: SharedKvStore,
        clock: SharedClock,
    ) -> AuditResult<Self> {
        if config.capacity == 0 {
            return Err(AuditError::InvalidCapacity);
        }
        let namespace = namespace.into();
        let prefix = key_prefix(&namespace);

        let mut records = Vec::new();
        for (key, value) in store.scan_prefix(&prefix).await? {
            let record: AuditRecord<E> =
                serde_json::from_value(value).map_err(|e| AuditError::Corrupt {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
            records.push(record);
        }
        records.sort_by_key(|r| r.sequence);

        let excess = records.len().saturating_sub(config.capacity);
        for stale in records.drain(..excess) {
            store.delete(&record_key(&namespace, stale.sequence)).await?;
        }

        let next_sequence = records.last().map(|r| r.sequence + 1).unwrap_or(0);
        let last_hash = records.last().map(|r| r.entry_hash.clone());

        info!(
            namespace = %namespace,
            restored = records.len(),
            evicted = excess,
            capacity = config.capacity,
            "Audit log opened"
        );

        Ok(Self {
            namespace,
            capacity: config.capacity,
            store,
            clock,
            ring: RwLock::new(Ring {
                records: records.into(),
                next_sequence,
                last_hash,
            }),
            write_gate: tokio::sync::Mutex::new(()),
            _entry: PhantomData,
        })
    }

    /// Append a new record. The returned record is final.
    pub async fn append(&self, entry: E) -> AuditResult<AuditRecord<E>> {
        let _gate = self.write_gate.lock().await;

        let (sequence, previous_hash) = {
            let ring = self.ring.read();
            (ring.next_sequence, ring.last_hash.clone())
        };

        let record = AuditRecord::seal(sequence, self.clock.now(), entry, previous_hash)?;
        self.store
            .put(
                &record_key(&self.namespace, sequence),
                serde_json::to_value(&record)?,
            )
            .await?;

        let evicted = {
            let mut ring = self.ring.write();
            ring.records.push_back(record.clone());
            ring.next_sequence = sequence + 1;
            ring.last_hash = Some(record.entry_hash.clone());

            let mut evicted = Vec::new();
            while ring.records.len() > self.capacity {
                if let Some(old) = ring.records.pop_front() {
                    evicted.push(old.sequence);
                }
            }
            evicted
        };

        for old in evicted {
            if let Err(e) = self.store.delete(&record_key(&self.namespace, old)).await {
                // Already gone from memory; a leftover document is trimmed on next open.
                warn!(namespace = %self.namespace, sequence = old, error = %e, "Failed to delete evicted audit record");
            }
        }

        debug!(
            namespace = %self.namespace,
            sequence,
            id = %record.id,
            "Audit record appended"
        );
        Ok(record)
    }

    /// Attach the outcome block to a retained record. Permitted exactly once.
    pub async fn record_outcome(
        &self,
        id: Uuid,
        outcome: OutcomeTracking,
    ) -> AuditResult<AuditRecord<E>> {
        let _gate = self.write_gate.lock().await;

        let mut updated = {
            let ring = self.ring.read();
            ring.records
                .iter()
                .find(|r| r.id == id)
                .cloned()
                .ok_or(AuditError::NotFound(id))?
        };
        if updated.outcome.is_some() {
            return Err(AuditError::OutcomeAlreadyRecorded(id));
        }
        updated.outcome = Some(outcome);

        self.store
            .put(
                &record_key(&self.namespace, updated.sequence),
                serde_json::to_value(&updated)?,
            )
            .await?;

        let mut ring = self.ring.write();
        if let Some(slot) = ring.records.iter_mut().find(|r| r.id == id) {
            slot.outcome = updated.outcome.clone();
        }
        Ok(updated)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ring.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.read().records.is_empty()
    }

    /// Look up a retained record by id.
    pub fn get(&self, id: Uuid) -> Option<AuditRecord<E>> {
        self.ring.read().records.iter().find(|r| r.id == id).cloned()
    }

    /// All retained records, oldest first.
    pub fn records(&self) -> Vec<AuditRecord<E>> {
        self.ring.read().records.iter().cloned().collect()
    }

    /// The `n` most recent records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<AuditRecord<E>> {
        let ring = self.ring.read();
        let skip = ring.records.len().saturating_sub(n);
        ring.records.iter().skip(skip).cloned().collect()
    }

    /// Retained records with `from <= recorded_at <= to`, oldest first.
    pub fn range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<AuditRecord<E>> {
        self.ring
            .read()
            .records
            .iter()
            .filter(|r| r.recorded_at >= from && r.recorded_at <= to)
            .cloned()
            .collect()
    }

    /// Verify hashes and linkage of the retained window.
    ///
    /// The oldest retained record's predecessor may have been evicted, so its
    /// `previous_hash` is not checked.
    pub fn verify_chain(&self) -> ChainVerification {
        let ring = self.ring.read();
        let mut result = ChainVerification {
            valid: true,
            total_records: ring.records.len(),
            verified_records: 0,
            first_invalid_sequence: None,
            error_message: None,
        };

        let mut previous: Option<&AuditRecord<E>> = None;
        for record in ring.records.iter() {
            if !record.verify() {
                result.valid = false;
                result.first_invalid_sequence = Some(record.sequence);
                result.error_message = Some(format!("record {} has invalid hash", record.id));
                return result;
            }
            if let Some(prev) = previous {
                if record.previous_hash.as_deref() != Some(prev.entry_hash.as_str()) {
                    result.valid = false;
                    result.first_invalid_sequence = Some(record.sequence);
                    result.error_message =
                        Some(format!("record {} has broken chain link", record.id));
                    return result;
                }
            }
            result.verified_records += 1;
            previous = Some(record);
        }
        result
    }
}

fn key_prefix(namespace: &str) -> String {
    format!("audit/{}/", namespace)
}

fn record_key(namespace: &str, sequence: u64) -> String {
    format!("audit/{}/{:020}", namespace, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use std::sync::Arc;
    use warden_storage::{FileKvStore, MemoryKvStore};
    use warden_types::{Clock, ManualClock};

    fn outcome(complications: bool) -> OutcomeTracking {
        OutcomeTracking {
            action_completed: true,
            satisfaction_score: Some(7),
            complications,
            lessons: vec!["ok".into()],
            recorded_at: Utc::now(),
        }
    }

    async fn memory_log(capacity: usize) -> (AuditLog<String>, Arc<MemoryKvStore>) {
        let store = Arc::new(MemoryKvStore::new());
        let log = AuditLog::open(
            "test",
            &AuditConfig { capacity },
            store.clone(),
            Arc::new(ManualClock::starting_now()),
        )
        .await
        .unwrap();
        (log, store)
    }

    #[tokio::test]
    async fn zero_capacity_rejected() {
        let result = AuditLog::<String>::open(
            "x",
            &AuditConfig { capacity: 0 },
            Arc::new(MemoryKvStore::new()),
            Arc::new(ManualClock::starting_now()),
        )
        .await;
        assert!(matches!(result, Err(AuditError::InvalidCapacity)));
    }

    #[tokio::test]
    async fn eviction_removes_oldest_from_store() {
        let (log, store) = memory_log(3).await;
        for i in 0..5 {
            log.append(format!("entry-{i}")).await.unwrap();
        }

        assert_eq!(log.len(), 3);
        let entries: Vec<_> = log.records().into_iter().map(|r| r.entry).collect();
        assert_eq!(entries, vec!["entry-2", "entry-3", "entry-4"]);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn outcome_may_be_appended_exactly_once() {
        let (log, _) = memory_log(10).await;
        let record = log.append("proceed".to_string()).await.unwrap();

        let updated = log.record_outcome(record.id, outcome(false)).await.unwrap();
        assert_eq!(updated.entry_hash, record.entry_hash);
        assert!(log.get(record.id).unwrap().outcome.is_some());

        let second = log.record_outcome(record.id, outcome(true)).await;
        assert!(matches!(second, Err(AuditError::OutcomeAlreadyRecorded(_))));
        assert!(!log.get(record.id).unwrap().outcome.unwrap().complications);
    }

    #[tokio::test]
    async fn outcome_for_evicted_record_is_not_found() {
        let (log, _) = memory_log(1).await;
        let first = log.append("a".to_string()).await.unwrap();
        log.append("b".to_string()).await.unwrap();

        let result = log.record_outcome(first.id, outcome(false)).await;
        assert!(matches!(result, Err(AuditError::NotFound(_))));
    }

    #[tokio::test]
    async fn range_selects_by_timestamp() {
        let clock = Arc::new(ManualClock::starting_now());
        let log: AuditLog<u32> = AuditLog::open(
            "range",
            &AuditConfig::default(),
            Arc::new(MemoryKvStore::new()),
            clock.clone(),
        )
        .await
        .unwrap();

        let t0 = clock.now();
        log.append(1).await.unwrap();
        clock.advance(Duration::minutes(10));
        log.append(2).await.unwrap();
        clock.advance(Duration::minutes(10));
        log.append(3).await.unwrap();

        let hits = log.range(t0 + Duration::minutes(5), t0 + Duration::minutes(15));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry, 2);
    }

    #[tokio::test]
    async fn chain_verifies_and_detects_tampering() {
        let (log, _) = memory_log(10).await;
        for i in 0..4 {
            log.append(format!("e{i}")).await.unwrap();
        }
        assert!(log.verify_chain().valid);

        log.ring.write().records[2].entry = "forged".into();
        let verification = log.verify_chain();
        assert!(!verification.valid);
        assert_eq!(verification.first_invalid_sequence, Some(2));
        assert_eq!(verification.verified_records, 2);
    }

    #[tokio::test]
    async fn reopen_restores_ring_and_chain() {
        let dir = tempfile::tempdir().unwrap();
        let store: SharedKvStore = Arc::new(FileKvStore::open(dir.path()).await.unwrap());
        let clock: SharedClock = Arc::new(ManualClock::starting_now());
        let config = AuditConfig { capacity: 4 };

        let last_id = {
            let log: AuditLog<String> =
                AuditLog::open("restraint", &config, store.clone(), clock.clone())
                    .await
                    .unwrap();
            for i in 0..6 {
                log.append(format!("e{i}")).await.unwrap();
            }
            log.records().last().unwrap().id
        };

        let reopened: AuditLog<String> = AuditLog::open("restraint", &config, store.clone(), clock)
            .await
            .unwrap();
        assert_eq!(reopened.len(), 4);
        assert!(reopened.verify_chain().valid);

        let appended = reopened.append("e6".into()).await.unwrap();
        assert_eq!(appended.sequence, 6);
        assert_eq!(
            appended.previous_hash,
            reopened.get(last_id).map(|r| r.entry_hash)
        );
        assert_eq!(store.scan_prefix("audit/restraint/").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn reopen_with_smaller_capacity_trims_oldest() {
        let store: SharedKvStore = Arc::new(MemoryKvStore::new());
        let clock: SharedClock = Arc::new(ManualClock::starting_now());
        {
            let log: AuditLog<u32> =
                AuditLog::open("auth", &AuditConfig { capacity: 10 }, store.clone(), clock.clone())
                    .await
                    .unwrap();
            for i in 0..8 {
                log.append(i).await.unwrap();
            }
        }

        let log: AuditLog<u32> = AuditLog::open("auth", &AuditConfig { capacity: 3 }, store.clone(), clock)
            .await
            .unwrap();
        let entries: Vec<_> = log.records().into_iter().map(|r| r.entry).collect();
        assert_eq!(entries, vec![5, 6, 7]);
        assert_eq!(store.scan_prefix("audit/auth/").await.unwrap().len(), 3);
    }

    proptest! {
        #[test]
        fn ring_never_exceeds_capacity_and_evicts_oldest(
            capacity in 1usize..16,
            extra in 0usize..24,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");

            rt.block_on(async move {
                let (log, store) = memory_log(capacity).await;
                let total = capacity + extra;
                for i in 0..total {
                    log.append(format!("entry-{i}")).await.unwrap();
                    prop_assert!(log.len() <= capacity);
                }

                prop_assert_eq!(log.len(), capacity);
                prop_assert_eq!(store.len(), capacity);

                let retained: Vec<String> = log.records().into_iter().map(|r| r.entry).collect();
                for i in 0..extra {
                    let evicted = format!("entry-{i}");
                    prop_assert!(!retained.contains(&evicted));
                }
                let expected: Vec<String> = (extra..total).map(|i| format!("entry-{i}")).collect();
                prop_assert_eq!(retained, expected);
                Ok(())
            })?;
        }
    }
}
