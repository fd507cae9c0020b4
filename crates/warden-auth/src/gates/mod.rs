//! The four production gates.

mod behavioral;
mod crypto;
mod nonce;
mod session;

pub use behavioral::{profile_similarity, BehavioralCodexGate};
pub use crypto::{attestation_message, sign_attestation, CryptoAttestationGate};
pub use nonce::SemanticNonceGate;
pub use session::SessionIntegrityGate;
