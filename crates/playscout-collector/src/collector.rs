//! Sequential search stage.
//!
//! Terms are searched one at a time, front to back. Hits are accumulated into a
//! [`CandidateSet`] until the target is reached, at which point no further
//! search is issued.

use crate::candidates::CandidateSet;
use crate::proxy::ProxyPool;
use crate::retry::RetryPolicy;
use playscout_core::SearchTerm;
use playscout_playstore::PlayStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Counters from one search pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Terms a search was issued for
    pub terms_searched: usize,
    /// Terms whose search failed after retries
    pub terms_failed: usize,
}

/// Runs search terms and deduplicates their hits.
pub struct SearchCollector {
    store: Arc<dyn PlayStore>,
    pool: Arc<ProxyPool>,
    retry: RetryPolicy,
    hits_buffer: usize,
    delay_between_terms: Duration,
    cancel: CancellationToken,
}

impl SearchCollector {
    /// Create a collector with no extra hits and no pause between terms.
    #[must_use]
    pub fn new(store: Arc<dyn PlayStore>, pool: Arc<ProxyPool>, retry: RetryPolicy) -> Self {
        Self {
            store,
            pool,
            retry,
            hits_buffer: 0,
            delay_between_terms: Duration::ZERO,
            cancel: CancellationToken::new(),
        }
    }

    /// Request this many hits beyond the per-query cap on every search.
    #[must_use]
    pub fn with_hits_buffer(mut self, hits_buffer: usize) -> Self {
        self.hits_buffer = hits_buffer;
        self
    }

    /// Pause between consecutive terms.
    #[must_use]
    pub fn with_delay_between_terms(mut self, delay: Duration) -> Self {
        self.delay_between_terms = delay;
        self
    }

    /// Stop before the next term once `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Collect up to `target` unique items from `terms`, at most
    /// `per_query_limit` new items per term.
    pub async fn collect(
        &self,
        terms: &[SearchTerm],
        per_query_limit: usize,
        target: usize,
    ) -> CandidateSet {
        self.collect_with_stats(terms, per_query_limit, target).await.0
    }

    /// Same as [`collect`](Self::collect), also returning per-term counters.
    pub async fn collect_with_stats(
        &self,
        terms: &[SearchTerm],
        per_query_limit: usize,
        target: usize,
    ) -> (CandidateSet, SearchStats) {
        let mut candidates = CandidateSet::new(target);
        let mut stats = SearchStats::default();

        if per_query_limit == 0 {
            tracing::debug!("Per-query limit is zero, skipping search");
            return (candidates, stats);
        }
        let n_hits = per_query_limit.saturating_add(self.hits_buffer);

        for (position, term) in terms.iter().enumerate() {
            if candidates.is_full() {
                break;
            }
            if position > 0 && !self.delay_between_terms.is_zero() {
                tokio::select! {
                    () = self.cancel.cancelled() => {}
                    () = tokio::time::sleep(self.delay_between_terms) => {}
                }
            }
            if self.cancel.is_cancelled() {
                tracing::info!(remaining = terms.len() - position, "Search cancelled");
                break;
            }

            stats.terms_searched += 1;
            let store = &self.store;
            let text = term.text.as_str();
            let hits = self
                .retry
                .run(text, &self.pool, |attempt| async move {
                    store.search(text, n_hits, attempt.proxy.as_ref()).await
                })
                .await;

            let hits = match hits {
                Ok(hits) => hits,
                Err(e) => {
                    stats.terms_failed += 1;
                    tracing::warn!(term = %term, error = %e, "Search failed, skipping term");
                    continue;
                }
            };

            let returned = hits.len();
            let mut added = 0;
            for mut hit in hits {
                if added >= per_query_limit || candidates.is_full() {
                    break;
                }
                if hit.source_term.is_none() {
                    hit.source_term = Some(term.text.clone());
                }
                if candidates.insert(hit) {
                    added += 1;
                }
            }

            tracing::debug!(
                term = %term,
                returned,
                added,
                total = candidates.len(),
                "Search term processed"
            );
        }

        if candidates.is_full() {
            tracing::info!(target_count = target, "Target count reached");
        }
        (candidates, stats)
    }
}
