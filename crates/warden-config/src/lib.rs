//! Configuration for the Warden gating pipeline.
//!
//! [`WardenConfig`] is the TOML document: one section per stage plus the
//! audit sizing, every section optional. [`ConfigHandle`] turns it into the
//! per-component [`warden_types::ConfigCell`]s the stages read from and
//! handles hot reload.

pub mod config;
pub mod error;
pub mod handle;

pub use config::WardenConfig;
pub use error::{ConfigError, ConfigResult};
pub use handle::{ConfigHandle, ReloadReport};
