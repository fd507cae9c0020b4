//! Configuration commands

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Subcommand;
use warden_config::WardenConfig;

use super::load_config;
use crate::output::{print_error, print_success};
use crate::Workspace;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Check a configuration file without applying it
    Validate {
        /// Path to the TOML file
        path: PathBuf,
    },

    /// Print the effective configuration as TOML
    Show,
}

pub fn execute(command: ConfigCommands, workspace: &Workspace) -> anyhow::Result<ExitCode> {
    match command {
        ConfigCommands::Validate { path } => match WardenConfig::load(&path) {
            Ok(config) => {
                print_success(&format!(
                    "{} is valid ({} threat archetypes, audit capacity {})",
                    path.display(),
                    config.threat.archetypes.len(),
                    config.audit.capacity
                ));
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                print_error(&format!("{}: {e}", path.display()));
                Ok(ExitCode::FAILURE)
            }
        },
        ConfigCommands::Show => {
            print!("{}", load_config(workspace)?.to_toml_string()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
