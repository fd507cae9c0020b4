//! Device key helpers

use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::Subcommand;
use ed25519_dalek::SigningKey;
use serde::Serialize;
use warden_auth::sign_attestation;
use warden_types::DeviceId;

use crate::output::print_json;

#[derive(Subcommand)]
pub enum DeviceCommands {
    /// Generate a fresh Ed25519 device key pair
    Keygen,

    /// Sign an attestation challenge with a device key
    Attest {
        /// Device ID the attestation is bound to
        #[arg(short, long)]
        device: String,

        /// Challenge to sign
        #[arg(short, long)]
        challenge: String,

        /// Hex-encoded 32-byte signing key
        #[arg(long, env = "WARDEN_SIGNING_KEY", hide_env_values = true)]
        signing_key_hex: String,
    },
}

#[derive(Serialize)]
struct KeyPair {
    signing_key_hex: String,
    public_key_hex: String,
}

pub fn parse_signing_key(hex_key: &str) -> anyhow::Result<SigningKey> {
    let bytes = hex::decode(hex_key.trim()).context("signing key is not hex")?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow!("signing key must be 32 bytes, got {}", b.len()))?;
    Ok(SigningKey::from_bytes(&bytes))
}

pub fn execute(command: DeviceCommands) -> anyhow::Result<ExitCode> {
    match command {
        DeviceCommands::Keygen => {
            let key = SigningKey::from_bytes(&rand::random::<[u8; 32]>());
            print_json(&KeyPair {
                signing_key_hex: hex::encode(key.to_bytes()),
                public_key_hex: hex::encode(key.verifying_key().to_bytes()),
            })?;
        }
        DeviceCommands::Attest {
            device,
            challenge,
            signing_key_hex,
        } => {
            let key = parse_signing_key(&signing_key_hex)?;
            let proof = sign_attestation(&key, &DeviceId::new(device.as_str()), &challenge);
            print_json(&proof)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_key_round_trips_through_hex() {
        let key = SigningKey::from_bytes(&[11u8; 32]);
        let parsed = parse_signing_key(&hex::encode(key.to_bytes())).unwrap();
        assert_eq!(parsed.verifying_key(), key.verifying_key());
    }

    #[test]
    fn non_hex_key_rejected() {
        assert!(parse_signing_key("not-a-key").is_err());
    }
}
