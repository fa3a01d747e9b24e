//! The waterfall: runs enabled adapters in a fixed priority order for one
//! publication, stopping at the first `Found`.

use std::collections::HashMap;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::publication::{Publication, SourceKind};
use crate::source::{LookupOutcome, SourceRegistry};

/// Fixed waterfall priority order, lowest index tried first.
///
/// PMC-XML is not ranked in the distilled specification's priority table; it
/// is placed immediately after Institutional here because, like Cache and
/// Institutional, it is a legitimate, high-quality source with no copyright
/// ambiguity and is cheap to check (a single PMCID-keyed cache/API lookup) —
/// see DESIGN.md for the recorded rationale.
pub const SOURCE_PRIORITY: [SourceKind; 11] = [
    SourceKind::Cache,
    SourceKind::Institutional,
    SourceKind::PmcXml,
    SourceKind::Unpaywall,
    SourceKind::Core,
    SourceKind::OpenAlexOa,
    SourceKind::Crossref,
    SourceKind::BioRxiv,
    SourceKind::ArXiv,
    SourceKind::SciHub,
    SourceKind::LibGen,
];

/// Rank of `kind` in [`SOURCE_PRIORITY`]; unranked kinds sort last (stable,
/// but should not occur since every [`SourceKind`] variant appears above).
#[must_use]
pub fn priority_rank(kind: SourceKind) -> usize {
    SOURCE_PRIORITY
        .iter()
        .position(|&k| k == kind)
        .unwrap_or(SOURCE_PRIORITY.len())
}

/// A point-in-time read of the orchestrator's counters.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsSnapshot {
    pub total_attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub by_source: HashMap<String, u64>,
    pub success_rate: f64,
}

/// Atomically-updated counters tapped once per top-level [`WaterfallOrchestrator::get_fulltext`] call.
#[derive(Default)]
pub struct Statistics {
    total_attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    by_source: DashMap<SourceKind, u64>,
}

impl Statistics {
    fn record_success(&self, source: SourceKind) {
        self.total_attempts.fetch_add(1, Ordering::SeqCst);
        self.successes.fetch_add(1, Ordering::SeqCst);
        *self.by_source.entry(source).or_insert(0) += 1;
    }

    fn record_failure(&self) {
        self.total_attempts.fetch_add(1, Ordering::SeqCst);
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    /// Reads a consistent-enough snapshot of the counters for reporting.
    /// Individual counters are atomic but not read together under one lock;
    /// acceptable for monitoring, not for exact accounting under concurrency.
    #[must_use]
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let total_attempts = self.total_attempts.load(Ordering::SeqCst);
        let successes = self.successes.load(Ordering::SeqCst);
        let failures = self.failures.load(Ordering::SeqCst);
        let by_source = self
            .by_source
            .iter()
            .map(|entry| (entry.key().as_str().to_string(), *entry.value()))
            .collect();
        let success_rate = if total_attempts == 0 {
            0.0
        } else {
            successes as f64 / total_attempts as f64
        };
        StatisticsSnapshot {
            total_attempts,
            successes,
            failures,
            by_source,
            success_rate,
        }
    }
}

/// Runs [`SourceRegistry`] adapters in priority order for one publication at
/// a time, short-circuiting on the first `Found`.
pub struct WaterfallOrchestrator {
    registry: SourceRegistry,
    statistics: Statistics,
    timeout_per_source: Duration,
}

impl WaterfallOrchestrator {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            registry: SourceRegistry::from_config(config),
            statistics: Statistics::default(),
            timeout_per_source: Duration::from_secs(config.timeout_per_source_seconds),
        }
    }

    /// Tries every enabled, non-skipped, applicable adapter in priority
    /// order; returns the first `Found`, or `NotFound` if none succeed.
    ///
    /// `skip_sources` should grow monotonically across a single publication's
    /// retry chain (tiered retry is driven by the caller, not this method).
    #[instrument(skip(self, publication), fields(cache_key = ?publication.primary_cache_key()))]
    pub async fn get_fulltext(&self, publication: &Publication, skip_sources: &[SourceKind]) -> LookupOutcome {
        for adapter in self.registry.ordered_adapters(skip_sources) {
            let outcome = match tokio::time::timeout(self.timeout_per_source, adapter.lookup(publication)).await {
                Ok(outcome) => outcome,
                Err(_elapsed) => {
                    warn!(source = adapter.kind().as_str(), "source lookup timed out, advancing");
                    LookupOutcome::TransientError {
                        kind: "Timeout".to_string(),
                        retry_after: None,
                    }
                }
            };

            if let LookupOutcome::Found { source, .. } = &outcome {
                info!(source = source.as_str(), "waterfall resolved");
                self.statistics.record_success(*source);
                return outcome;
            }
        }

        self.statistics.record_failure();
        LookupOutcome::NotFound
    }

    /// Current counters, safe to call from any number of concurrent callers.
    #[must_use]
    pub fn statistics(&self) -> StatisticsSnapshot {
        self.statistics.snapshot()
    }

    #[must_use]
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }
}
