//! Request gating command

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Args;
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use tracing::info;
use warden_auth::BehavioralProfile;
use warden_pipeline::{PipelineOutcome, Warden};
use warden_types::{DeviceId, IdentityId, SharedClock, SystemClock};

use super::{config_handle, open_store};
use crate::output::print_json;
use crate::Workspace;

#[derive(Args)]
pub struct CheckArgs {
    /// Path to a request file (JSON)
    #[arg(short, long)]
    pub file: PathBuf,
}

/// A request file: the request itself plus the devices to enroll first.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub device_id: String,
    pub input: String,
    #[serde(default = "empty_context")]
    pub context: serde_json::Value,
    #[serde(default)]
    pub devices: Vec<DeviceSpec>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceSpec {
    pub device_id: String,
    pub identity: String,
    pub public_key_hex: String,
    #[serde(default)]
    pub profile: Option<BehavioralProfile>,
}

fn empty_context() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

pub fn parse_verifying_key(public_key_hex: &str) -> anyhow::Result<VerifyingKey> {
    let bytes = hex::decode(public_key_hex.trim()).context("public key is not hex")?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow!("public key must be 32 bytes, got {}", b.len()))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| anyhow!("invalid public key: {e}"))
}

fn enroll(warden: &Warden, devices: &[DeviceSpec]) -> anyhow::Result<()> {
    for spec in devices {
        let key = parse_verifying_key(&spec.public_key_hex)
            .with_context(|| format!("enrolling {}", spec.device_id))?;
        let identity = IdentityId::new(spec.identity.as_str());
        warden
            .registry
            .enroll_device(DeviceId::new(spec.device_id.as_str()), identity.clone(), key);
        if let Some(profile) = &spec.profile {
            warden.registry.set_profile(identity, profile.clone());
        }
    }
    Ok(())
}

/// Gate the request and print the outcome. Exit code 2 on refusal.
pub async fn execute(args: CheckArgs, workspace: &Workspace) -> anyhow::Result<ExitCode> {
    let contents = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let request: CheckRequest =
        serde_json::from_str(&contents).context("parsing request file")?;

    let clock: SharedClock = Arc::new(SystemClock);
    let warden = Warden::assemble(config_handle(workspace)?, open_store(workspace).await?, clock)
        .await
        .context("assembling pipeline")?;
    enroll(&warden, &request.devices)?;
    info!(devices = request.devices.len(), "Pipeline ready");

    let outcome = warden
        .pipeline
        .process_raw(&request.device_id, &request.input, &request.context)
        .await;
    print_json(&outcome)?;

    Ok(match outcome {
        PipelineOutcome::Proceed(_) => ExitCode::SUCCESS,
        PipelineOutcome::Refused(_) => ExitCode::from(2),
    })
}
