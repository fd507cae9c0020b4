use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::StorageResult;

/// Durable key-value store.
///
/// Implementations must make `take` atomic with respect to other `take`
/// calls on the same key: at most one caller observes the value.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Insert or replace the document stored under `key`.
    async fn put(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Read the document stored under `key`.
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Remove and return the document stored under `key`.
    async fn take(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Remove `key`. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// All entries whose key starts with `prefix`, in ascending key order.
    async fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<(String, Value)>>;
}

/// Shared handle to a key-value store.
pub type SharedKvStore = Arc<dyn KvStore>;
