//! Audit log commands

use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use warden_audit::{AuditConfig, AuditLog, AuditRecord, ChainVerification};
use warden_auth::AuthAuditRecord;
use warden_pipeline::{AUTH_AUDIT, RESTRAINT_AUDIT, THREAT_AUDIT};
use warden_restraint::RestraintAuditEntry;
use warden_storage::SharedKvStore;
use warden_threat::DetectionAuditRecord;
use warden_types::{SharedClock, SystemClock};

use super::{load_config, open_store};
use crate::output::{print_error, print_json, print_success};
use crate::Workspace;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogName {
    Auth,
    Threat,
    Restraint,
}

impl LogName {
    pub fn namespace(&self) -> &'static str {
        match self {
            LogName::Auth => AUTH_AUDIT,
            LogName::Threat => THREAT_AUDIT,
            LogName::Restraint => RESTRAINT_AUDIT,
        }
    }
}

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Export records of one log as JSON
    Export {
        /// Which log to export
        #[arg(short, long, value_enum)]
        log: LogName,

        /// Earliest record time (RFC 3339)
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// Latest record time (RFC 3339)
        #[arg(long)]
        to: Option<DateTime<Utc>>,

        /// Keep only the newest N matching records
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Verify the hash chain of one or all logs
    Verify {
        /// Log to verify (default: all)
        #[arg(short, long, value_enum)]
        log: Option<LogName>,
    },
}

struct LogAccess {
    store: SharedKvStore,
    clock: SharedClock,
    config: AuditConfig,
}

impl LogAccess {
    async fn open<E>(&self, name: LogName) -> anyhow::Result<AuditLog<E>>
    where
        E: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        Ok(AuditLog::open(
            name.namespace(),
            &self.config,
            self.store.clone(),
            self.clock.clone(),
        )
        .await?)
    }

    async fn export<E>(
        &self,
        name: LogName,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> anyhow::Result<()>
    where
        E: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let log = self.open::<E>(name).await?;
        let records = select(
            log.range(
                from.unwrap_or(DateTime::<Utc>::MIN_UTC),
                to.unwrap_or(DateTime::<Utc>::MAX_UTC),
            ),
            limit,
        );
        print_json(&records)
    }

    async fn verify(&self, name: LogName) -> anyhow::Result<ChainVerification> {
        Ok(match name {
            LogName::Auth => self.open::<AuthAuditRecord>(name).await?.verify_chain(),
            LogName::Threat => self.open::<DetectionAuditRecord>(name).await?.verify_chain(),
            LogName::Restraint => self.open::<RestraintAuditEntry>(name).await?.verify_chain(),
        })
    }
}

/// Newest `limit` records, kept oldest first.
fn select<E>(mut records: Vec<AuditRecord<E>>, limit: Option<usize>) -> Vec<AuditRecord<E>> {
    if let Some(limit) = limit {
        let skip = records.len().saturating_sub(limit);
        records.drain(..skip);
    }
    records
}

pub async fn execute(command: AuditCommands, workspace: &Workspace) -> anyhow::Result<ExitCode> {
    let access = LogAccess {
        store: open_store(workspace).await?,
        clock: Arc::new(SystemClock),
        config: load_config(workspace)?.audit,
    };

    match command {
        AuditCommands::Export {
            log,
            from,
            to,
            limit,
        } => {
            match log {
                LogName::Auth => access.export::<AuthAuditRecord>(log, from, to, limit).await?,
                LogName::Threat => {
                    access
                        .export::<DetectionAuditRecord>(log, from, to, limit)
                        .await?
                }
                LogName::Restraint => {
                    access
                        .export::<RestraintAuditEntry>(log, from, to, limit)
                        .await?
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        AuditCommands::Verify { log } => {
            let names = match log {
                Some(name) => vec![name],
                None => vec![LogName::Auth, LogName::Threat, LogName::Restraint],
            };
            let mut intact = true;
            for name in names {
                let result = access.verify(name).await?;
                if result.valid {
                    print_success(&format!(
                        "{}: {}/{} records verified",
                        name.namespace(),
                        result.verified_records,
                        result.total_records
                    ));
                } else {
                    intact = false;
                    print_error(&format!(
                        "{}: chain broken at sequence {:?}: {}",
                        name.namespace(),
                        result.first_invalid_sequence,
                        result.error_message.as_deref().unwrap_or("unknown")
                    ));
                }
            }
            Ok(if intact {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_storage::MemoryKvStore;
    use warden_types::ManualClock;

    #[tokio::test]
    async fn select_keeps_newest_records() {
        let store: SharedKvStore = Arc::new(MemoryKvStore::new());
        let clock: SharedClock = Arc::new(ManualClock::starting_now());
        let log: AuditLog<String> = AuditLog::open("t", &AuditConfig::default(), store, clock)
            .await
            .unwrap();
        for n in 0..5 {
            log.append(format!("entry-{n}")).await.unwrap();
        }

        let newest = select(log.records(), Some(2));
        let entries: Vec<&str> = newest.iter().map(|r| r.entry.as_str()).collect();
        assert_eq!(entries, vec!["entry-3", "entry-4"]);
        assert_eq!(select(log.records(), None).len(), 5);
    }

    #[test]
    fn log_names_map_to_pipeline_namespaces() {
        assert_eq!(LogName::Auth.namespace(), "auth");
        assert_eq!(LogName::Threat.namespace(), "threat");
        assert_eq!(LogName::Restraint.namespace(), "restraint");
    }
}
