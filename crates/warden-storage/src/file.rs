//! Directory-backed implementation of [`KvStore`].
//!
//! Each key maps to one `<encoded-key>.json` file. Key bytes outside
//! `[A-Za-z0-9._-]` are percent-encoded so any key maps to a safe file name
//! and decodes back losslessly.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::traits::KvStore;
use crate::{StorageError, StorageResult};

const EXTENSION: &str = ".json";

/// Key-value store persisted as one file per key.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    root: PathBuf,
}

impl FileKvStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".into()));
        }
        Ok(self.root.join(format!("{}{}", encode_key(key), EXTENSION)))
    }

    async fn read_path(path: &Path) -> StorageResult<Option<Value>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn put(&self, key: &str, value: Value) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let tmp = self
            .root
            .join(format!(".tmp-{}", uuid::Uuid::new_v4().simple()));
        let bytes = serde_json::to_vec(&value)?;

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        debug!(key, bytes = bytes.len(), "Stored document");
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let path = self.path_for(key)?;
        Self::read_path(&path).await
    }

    async fn take(&self, key: &str) -> StorageResult<Option<Value>> {
        let path = self.path_for(key)?;
        let value = match Self::read_path(&path).await? {
            Some(v) => v,
            None => return Ok(None),
        };
        // Whoever removes the file owns the value.
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<(String, Value)>> {
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        let mut matched = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(encoded) = name.strip_suffix(EXTENSION) else {
                continue;
            };
            let Some(key) = decode_key(encoded) else {
                continue;
            };
            if key.starts_with(prefix) {
                if let Some(value) = Self::read_path(&entry.path()).await? {
                    matched.push((key, value));
                }
            }
        }

        matched.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(matched)
    }
}

fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn decode_key(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_encoding_is_lossless() {
        for key in ["audit/auth/00000000000000000042", "token:abc", "plain-key_1.x"] {
            let encoded = encode_key(key);
            assert!(!encoded.contains('/'));
            assert_eq!(decode_key(&encoded).as_deref(), Some(key));
        }
    }

    #[tokio::test]
    async fn documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileKvStore::open(dir.path()).await.unwrap();
            store
                .put("audit/restraint/0001", json!({"action": "hold"}))
                .await
                .unwrap();
        }

        let store = FileKvStore::open(dir.path()).await.unwrap();
        let value = store.get("audit/restraint/0001").await.unwrap().unwrap();
        assert_eq!(value["action"], "hold");
    }

    #[tokio::test]
    async fn take_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path()).await.unwrap();
        store.put("session/x", json!(1)).await.unwrap();

        assert_eq!(store.take("session/x").await.unwrap(), Some(json!(1)));
        assert_eq!(store.take("session/x").await.unwrap(), None);
        assert!(!store.delete("session/x").await.unwrap());
    }

    #[tokio::test]
    async fn scan_prefix_ignores_temp_files_and_other_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path()).await.unwrap();
        store.put("a/2", json!(2)).await.unwrap();
        store.put("a/1", json!(1)).await.unwrap();
        store.put("b/1", json!(3)).await.unwrap();
        tokio::fs::write(dir.path().join(".tmp-orphan"), b"{}")
            .await
            .unwrap();

        let keys: Vec<_> = store
            .scan_prefix("a/")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["a/1".to_string(), "a/2".to_string()]);
    }

    #[tokio::test]
    async fn empty_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path()).await.unwrap();
        assert!(matches!(
            store.put("", json!(1)).await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
