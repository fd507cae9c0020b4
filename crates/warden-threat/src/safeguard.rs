use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::FutureExt;
use tracing::{debug, error, warn};
use warden_audit::AuditLog;
use warden_types::{ConfigCell, Versioned};

use crate::cache::DetectionCache;
use crate::config::ThreatConfig;
use crate::error::{ThreatError, ThreatResult};
use crate::fallback::fallback_scan;
use crate::pattern::{DetectionAuditRecord, DetectionContext, DetectionVerdict, ThreatPattern};
use crate::scorer::{input_hash, normalize, score_archetype};

/// Screens free text against the configured archetype library.
pub struct ThreatPatternSafeguard {
    config: Arc<ConfigCell<ThreatConfig>>,
    cache: DetectionCache,
    audit: Arc<AuditLog<DetectionAuditRecord>>,
    scan_delay: Option<Duration>,
}

impl ThreatPatternSafeguard {
    pub fn new(
        config: Arc<ConfigCell<ThreatConfig>>,
        audit: Arc<AuditLog<DetectionAuditRecord>>,
    ) -> ThreatResult<Self> {
        config
            .load()
            .value
            .validate()
            .map_err(ThreatError::InvalidConfig)?;
        Ok(Self {
            config,
            cache: DetectionCache::new(),
            audit,
            scan_delay: None,
        })
    }

    /// Slow every archetype scan down, to exercise the timeout path.
    #[cfg(test)]
    fn with_scan_delay(mut self, delay: Duration) -> Self {
        self.scan_delay = Some(delay);
        self
    }

    pub fn audit_log(&self) -> &Arc<AuditLog<DetectionAuditRecord>> {
        &self.audit
    }

    pub fn cache(&self) -> &DetectionCache {
        &self.cache
    }

    /// Screen one input. Never fails: internal faults become BLOCK. One
    /// audit record is written per call.
    pub async fn detect(&self, input: &str, context: &DetectionContext) -> DetectionVerdict {
        let started = Instant::now();
        let config = self.config.load();
        let normalized = normalize(input);
        let key = input_hash(&normalized);
        let hash_hex = format!("{key:016x}");

        let mut verdict = match self.cache.get(key, config.version) {
            Some(mut hit) => {
                hit.cached = true;
                hit
            }
            None => self.screen(&normalized, key, &hash_hex, &config).await,
        };
        verdict.processing_ms = started.elapsed().as_millis() as u64;

        if let Err(e) = self
            .audit
            .append(DetectionAuditRecord::new(&verdict, context))
            .await
        {
            error!(input_hash = %hash_hex, error = %e, "Detection audit write failed");
            let mut fault = DetectionVerdict::internal_fault(
                &format!("audit log unavailable: {e}"),
                hash_hex,
                config.version,
            );
            fault.processing_ms = started.elapsed().as_millis() as u64;
            return fault;
        }

        if verdict.safe {
            debug!(
                input_hash = %verdict.input_hash,
                action = %verdict.action,
                patterns = verdict.patterns.len(),
                cached = verdict.cached,
                "Input screened"
            );
        } else {
            warn!(
                input_hash = %verdict.input_hash,
                action = %verdict.action,
                top_severity = ?verdict.top_severity(),
                degraded = verdict.degraded,
                "Input flagged by threat safeguard"
            );
        }
        verdict
    }

    async fn screen(
        &self,
        normalized: &str,
        key: u64,
        hash_hex: &str,
        config: &Arc<Versioned<ThreatConfig>>,
    ) -> DetectionVerdict {
        let escalate = &config.value.escalate_severities;
        let attempt = AssertUnwindSafe(self.scan(Arc::from(normalized), config.clone()))
            .catch_unwind()
            .await;
        match attempt {
            Ok(Ok(patterns)) => {
                let verdict = DetectionVerdict::from_patterns(
                    patterns,
                    escalate,
                    false,
                    hash_hex.to_string(),
                    config.version,
                );
                self.cache
                    .insert(key, config.version, config.value.cache_capacity, verdict.clone());
                verdict
            }
            Ok(Err(ThreatError::Timeout(timeout_ms))) => {
                warn!(input_hash = %hash_hex, timeout_ms, "Archetype scan timed out, using keyword fallback");
                DetectionVerdict::from_patterns(
                    fallback_scan(normalized, &config.value),
                    escalate,
                    true,
                    hash_hex.to_string(),
                    config.version,
                )
            }
            Ok(Err(e)) => {
                error!(input_hash = %hash_hex, error = %e, "Threat screening internal fault");
                DetectionVerdict::internal_fault(&e.to_string(), hash_hex.to_string(), config.version)
            }
            Err(_) => {
                error!(input_hash = %hash_hex, "Threat screening panicked");
                DetectionVerdict::internal_fault("panic during scan", hash_hex.to_string(), config.version)
            }
        }
    }

    /// Scan every archetype on the blocking pool, bounded by the configured
    /// timeout. Scans that outlive the timeout run to completion detached.
    async fn scan(
        &self,
        text: Arc<str>,
        config: Arc<Versioned<ThreatConfig>>,
    ) -> ThreatResult<Vec<ThreatPattern>> {
        let delay = self.scan_delay;
        let scans = (0..config.value.archetypes.len()).map(|i| {
            let text = text.clone();
            let config = config.clone();
            tokio::task::spawn_blocking(move || {
                if let Some(delay) = delay {
                    std::thread::sleep(delay);
                }
                score_archetype(&text, &config.value.archetypes[i], &config.value)
            })
        });
        let joined = tokio::time::timeout(config.value.timeout(), join_all(scans))
            .await
            .map_err(|_| ThreatError::Timeout(config.value.timeout_ms))?;

        let mut patterns = Vec::new();
        for scan in joined {
            match scan {
                Ok(Some(pattern)) => patterns.push(pattern),
                Ok(None) => {}
                Err(e) => return Err(ThreatError::ScanFailed(e.to_string())),
            }
        }
        Ok(patterns)
    }
}
