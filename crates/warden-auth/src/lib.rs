//! AuthGateOrchestrator: stage 1 of the Warden gating pipeline.
//!
//! Four independent authentication factors ("gates") are evaluated
//! concurrently, each raced against a fixed timeout, and synthesized into a
//! single [`AuthenticationVerdict`].
//!
//! ## Decision algebra
//!
//! 1. **Evidence conflict**: successful gates that claim different enrolled
//!    identities force `MANUAL_REVIEW`.
//! 2. **Fast path**: a verified crypto attestation with confidence ≥ τ_high
//!    satisfies the quorum on its own (`ALLOW`).
//! 3. **Hard failure**: any explicit hard failure (revoked device, foreign
//!    session token, replayed attestation) yields `DENY`.
//! 4. **Quorum**: ≥ 2 successes at ≥ τ_medium ⇒ `ALLOW`; a single success,
//!    or several with mean confidence in [τ_low, τ_medium) ⇒ `LIMITED` with
//!    restrictions; otherwise `DENY`.
//!
//! The orchestrator is deny-by-default: gate errors become failed results,
//! timeouts become failed results, and any internal fault (including a
//! panicking gate) becomes `DENY` with manual review noted.

pub mod config;
pub mod error;
pub mod gate;
pub mod gates;
pub mod mocks;
pub mod nonce;
pub mod orchestrator;
pub mod registry;
pub mod request;
pub mod session;
pub mod verdict;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use gate::{AuthGate, GateEvidence, GateFinding, GateId, GateResult};
pub use gates::{
    attestation_message, sign_attestation, BehavioralCodexGate, CryptoAttestationGate,
    SemanticNonceGate, SessionIntegrityGate,
};
pub use mocks::{PanickingGate, StaticGate};
pub use nonce::{NonceChallenge, NonceCheck, NonceIssuer};
pub use orchestrator::{synthesize, AuthGateOrchestrator, Synthesis};
pub use registry::{BehavioralProfile, DeviceEnrollment, DeviceRegistry};
pub use request::{AttestationProof, AuthContext, AuthRequest, BehavioralSample, NonceResponse};
pub use session::{SessionGrant, SessionRecord, SessionRejection, SessionTokenTable};
pub use verdict::{AuthAuditRecord, AuthDecision, AuthenticationVerdict, Restriction};
