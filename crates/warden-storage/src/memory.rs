//! In-memory reference implementation of [`KvStore`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::traits::KvStore;
use crate::StorageResult;

/// Process-local key-value store.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn put(&self, key: &str, value: Value) -> StorageResult<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn take(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.entries.write().remove(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    async fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<(String, Value)>> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn take_is_single_use() {
        let store = MemoryKvStore::new();
        store.put("token/a", json!({"device": "d1"})).await.unwrap();

        assert!(store.take("token/a").await.unwrap().is_some());
        assert!(store.take("token/a").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn scan_prefix_is_ordered_and_bounded() {
        let store = MemoryKvStore::new();
        store.put("audit/0002", json!(2)).await.unwrap();
        store.put("audit/0001", json!(1)).await.unwrap();
        store.put("auditx/0001", json!(99)).await.unwrap();
        store.put("token/0001", json!(3)).await.unwrap();

        let scanned = store.scan_prefix("audit/").await.unwrap();
        let keys: Vec<_> = scanned.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["audit/0001", "audit/0002"]);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = MemoryKvStore::new();
        store.put("k", json!(true)).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }
}
