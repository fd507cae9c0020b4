//! ThreatPatternSafeguard: stage 2 of the Warden gating pipeline.
//!
//! Free-text input is normalized and scored against a configuration-driven
//! library of dangerous-behavior archetypes. Each archetype is scanned
//! independently (concurrently, on the blocking pool) and the whole call is
//! raced against a hard timeout; when the timeout elapses a single-pass
//! keyword scan answers instead and the verdict is flagged `degraded`.
//!
//! Scoring has no time-dependent or random inputs, so identical input and
//! configuration always yield an identical verdict. The action algebra:
//!
//! - `BLOCK` iff any pattern is `CRITICAL`
//! - `ESCALATE` iff the top remaining severity is in the escalation set
//!   (default `HIGH`, `MEDIUM`)
//! - `MODIFY` if any other pattern remains
//! - `ALLOW` otherwise

pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod pattern;
pub mod safeguard;
pub mod scorer;

pub use cache::DetectionCache;
pub use config::{ArchetypeDef, FallbackKeyword, MarkerDef, SeverityBands, ThreatConfig};
pub use error::{ThreatError, ThreatResult};
pub use fallback::fallback_scan;
pub use pattern::{
    derive_action, DetectionAction, DetectionAuditRecord, DetectionContext, DetectionVerdict,
    PatternSummary, Severity, ThreatPattern,
};
pub use safeguard::ThreatPatternSafeguard;
pub use scorer::{input_hash, normalize, score_all, score_archetype};
