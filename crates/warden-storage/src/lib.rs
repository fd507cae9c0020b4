//! Durable key-value storage for Warden.
//!
//! The audit ring buffers and the session-token table persist through the
//! [`KvStore`] contract. Values are JSON documents; keys are opaque strings
//! whose lexical order is meaningful to [`KvStore::scan_prefix`].
//!
//! - [`MemoryKvStore`]: deterministic, test-friendly, process-local
//! - [`FileKvStore`]: one JSON document per key under a directory, written
//!   via temp-file + rename so a crash never leaves a torn record

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod file;
pub mod memory;
mod traits;

pub use error::{StorageError, StorageResult};
pub use file::FileKvStore;
pub use memory::MemoryKvStore;
pub use traits::{KvStore, SharedKvStore};
