//! Bounded-concurrency detail enrichment.

use crate::fetcher::DetailFetcher;
use futures::stream::{FuturesUnordered, StreamExt};
use playscout_core::{AppId, CatalogItem};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs [`DetailFetcher`] over many ids with at most `max_workers` in flight.
///
/// A failed id never cancels its siblings. Results are keyed by id, so
/// completion order does not matter.
pub struct ParallelDispatcher {
    fetcher: Arc<DetailFetcher>,
    max_workers: usize,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl ParallelDispatcher {
    /// Create a dispatcher with 18 workers and no global timeout.
    #[must_use]
    pub fn new(fetcher: Arc<DetailFetcher>) -> Self {
        Self {
            fetcher,
            max_workers: 18,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the maximum number of in-flight fetches.
    #[must_use]
    pub fn with_max_workers(mut self, max: usize) -> Self {
        self.max_workers = max.max(1);
        self
    }

    /// Bound the whole enrichment phase. Unfinished fetches are abandoned.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stop dispatching and abandon in-flight fetches once `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fetch details for `ids`, returning the records that resolved.
    pub async fn enrich(&self, ids: &[AppId]) -> HashMap<AppId, CatalogItem> {
        let mut results = HashMap::with_capacity(ids.len());

        match self.timeout {
            Some(limit) => {
                let finished = tokio::time::timeout(limit, self.run(ids, &mut results))
                    .await
                    .is_ok();
                if !finished {
                    tracing::warn!(
                        timeout = ?limit,
                        resolved = results.len(),
                        "Enrichment timed out"
                    );
                }
            }
            None => self.run(ids, &mut results).await,
        }

        tracing::info!(
            submitted = ids.len(),
            resolved = results.len(),
            "Enrichment finished"
        );
        results
    }

    async fn run(&self, ids: &[AppId], results: &mut HashMap<AppId, CatalogItem>) {
        let mut futures = FuturesUnordered::new();
        let mut record = |(id, detail): (AppId, Option<CatalogItem>)| {
            if let Some(detail) = detail {
                results.insert(id, detail);
            }
        };

        'dispatch: for id in ids {
            if self.cancel.is_cancelled() {
                break;
            }

            futures.push(self.fetch_one(id.clone()));

            // Respect concurrency limit
            while futures.len() >= self.max_workers {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => break 'dispatch,
                    Some(outcome) = futures.next() => record(outcome),
                }
            }
        }

        // Collect remaining results
        while !futures.is_empty() {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                Some(outcome) = futures.next() => record(outcome),
            }
        }

        if self.cancel.is_cancelled() {
            tracing::info!(abandoned = futures.len(), "Enrichment cancelled");
        }
    }

    async fn fetch_one(&self, id: AppId) -> (AppId, Option<CatalogItem>) {
        let detail = self.fetcher.fetch_detail(&id).await;
        (id, detail)
    }
}
