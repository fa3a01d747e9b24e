//! Bounded-concurrency fan-out of [`WaterfallOrchestrator::get_fulltext`]
//! across many publications.

use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{info, instrument};

use crate::orchestrator::{StatisticsSnapshot, WaterfallOrchestrator};
use crate::publication::{Publication, SourceKind};
use crate::source::LookupOutcome;

/// Runs `get_fulltext` over a batch of publications with a bounded semaphore,
/// preserving input order in the returned results regardless of completion
/// order. Per-publication failures (`NotFound`, transient/permanent errors)
/// never abort the batch.
pub struct BatchRunner {
    orchestrator: Arc<WaterfallOrchestrator>,
    max_concurrent: usize,
}

impl BatchRunner {
    #[must_use]
    pub fn new(orchestrator: Arc<WaterfallOrchestrator>, max_concurrent: usize) -> Self {
        Self {
            orchestrator,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Looks up every publication in `publications`, at most `max_concurrent`
    /// at a time. The returned vector has exactly one entry per input, in the
    /// same order as `publications`.
    #[instrument(skip(self, publications), fields(count = publications.len(), max_concurrent = self.max_concurrent))]
    pub async fn get_fulltext_batch(&self, publications: &[Publication]) -> Vec<LookupOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut in_flight = FuturesUnordered::new();

        for (index, publication) in publications.iter().cloned().enumerate() {
            let orchestrator = Arc::clone(&self.orchestrator);
            let semaphore = Arc::clone(&semaphore);
            in_flight.push(async move {
                #[allow(clippy::expect_used)]
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("batch semaphore is never closed while callers hold a reference to it");
                let outcome = orchestrator.get_fulltext(&publication, &[]).await;
                (index, outcome)
            });
        }

        let mut results: Vec<Option<LookupOutcome>> = (0..publications.len()).map(|_| None).collect();
        while let Some((index, outcome)) = in_flight.next().await {
            results[index] = Some(outcome);
        }

        info!(count = publications.len(), "batch complete");
        results.into_iter().map(|r| r.unwrap_or(LookupOutcome::NotFound)).collect()
    }

    /// Same as [`Self::get_fulltext_batch`], but drives the tiered retry
    /// described by the orchestrator's contract: when an adapter resolves a
    /// URL but the caller's own download of it fails, retry with that source
    /// excluded. `try_download` reports whether the drive succeeded; batch
    /// processing advances to the next publication either way.
    #[instrument(skip(self, publications, try_download), fields(count = publications.len()))]
    pub async fn get_fulltext_batch_with_download<F, Fut>(
        &self,
        publications: &[Publication],
        try_download: F,
    ) -> Vec<LookupOutcome>
    where
        F: Fn(String, SourceKind) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = bool> + Send,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let try_download = Arc::new(try_download);
        let mut in_flight = FuturesUnordered::new();

        for (index, publication) in publications.iter().cloned().enumerate() {
            let orchestrator = Arc::clone(&self.orchestrator);
            let semaphore = Arc::clone(&semaphore);
            let try_download = Arc::clone(&try_download);
            in_flight.push(async move {
                #[allow(clippy::expect_used)]
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("batch semaphore is never closed while callers hold a reference to it");

                let mut skip_sources = Vec::new();
                loop {
                    let outcome = orchestrator.get_fulltext(&publication, &skip_sources).await;
                    match outcome {
                        LookupOutcome::Found { ref url, source, .. } => {
                            if try_download(url.clone(), source).await {
                                return (index, outcome);
                            }
                            skip_sources.push(source);
                        }
                        other => return (index, other),
                    }
                }
            });
        }

        let mut results: Vec<Option<LookupOutcome>> = (0..publications.len()).map(|_| None).collect();
        while let Some((index, outcome)) = in_flight.next().await {
            results[index] = Some(outcome);
        }
        results.into_iter().map(|r| r.unwrap_or(LookupOutcome::NotFound)).collect()
    }

    #[must_use]
    pub fn statistics(&self) -> StatisticsSnapshot {
        self.orchestrator.statistics()
    }
}
