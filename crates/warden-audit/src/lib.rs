//! Audit ring buffer for the Warden gating pipeline.
//!
//! Every stage writes one record per evaluation. Records are:
//!
//! - **write-once**: the entry and its hashes are fixed at append time
//! - **late-appendable exactly once**: a single [`OutcomeTracking`] block may
//!   be attached afterwards; a second attempt is rejected
//! - **hash-chained**: each record carries the SHA-256 of its predecessor so
//!   the retained window can be verified for tampering
//! - **capacity-bounded**: once `capacity` records are held, appending evicts
//!   the oldest record from memory and from the backing store
//!
//! The ring is persisted through a [`warden_storage::KvStore`], one document
//! per record, and is rebuilt from the store on [`AuditLog::open`].

pub mod error;
pub mod log;
pub mod record;

pub use error::{AuditError, AuditResult};
pub use log::{AuditConfig, AuditLog, ChainVerification};
pub use record::{AuditRecord, OutcomeTracking};
