//! CLI command implementations

pub mod audit;
pub mod check;
pub mod config;
pub mod device;

use std::sync::Arc;

use anyhow::Context;
use warden_config::ConfigHandle;
use warden_config::WardenConfig;
use warden_storage::{FileKvStore, SharedKvStore};

use crate::Workspace;

/// Load the configured file, or defaults when none is given.
pub fn load_config(workspace: &Workspace) -> anyhow::Result<WardenConfig> {
    match &workspace.config_path {
        Some(path) => WardenConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(WardenConfig::default()),
    }
}

pub fn config_handle(workspace: &Workspace) -> anyhow::Result<Arc<ConfigHandle>> {
    Ok(Arc::new(ConfigHandle::new(load_config(workspace)?)?))
}

pub async fn open_store(workspace: &Workspace) -> anyhow::Result<SharedKvStore> {
    let store = FileKvStore::open(&workspace.data_dir)
        .await
        .with_context(|| format!("opening data dir {}", workspace.data_dir.display()))?;
    Ok(Arc::new(store))
}
