//! End-to-end collection run.
//!
//! This module provides the `CollectOrchestrator` which wires expansion, search
//! and enrichment together over one shared proxy pool and retry policy, and
//! reports what the run achieved.

use crate::collector::SearchCollector;
use crate::dispatcher::ParallelDispatcher;
use crate::error::{CollectError, Result};
use crate::expander::QueryExpander;
use crate::fetcher::DetailFetcher;
use crate::proxy::ProxyPool;
use crate::retry::RetryPolicy;
use playscout_core::{CatalogItem, ScraperConfig, SeedQuery};
use playscout_playstore::PlayStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Summary of one collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    /// Terms produced by expansion
    pub terms_expanded: usize,
    /// Terms a search was issued for
    pub terms_searched: usize,
    /// Terms whose search failed
    pub terms_failed: usize,
    /// Unique ids accumulated by the search stage
    pub ids_collected: usize,
    /// Ids whose detail fetch succeeded
    pub ids_enriched: usize,
    /// Ids left at search-stage fidelity
    pub ids_unresolved: usize,
    /// Whether the run was cancelled before completing
    pub cancelled: bool,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

/// Items and summary produced by a run.
#[derive(Debug, Clone)]
pub struct CollectOutcome {
    /// Collected items in discovery order
    pub items: Vec<CatalogItem>,
    /// Run summary
    pub report: CollectReport,
}

/// Runs expansion, search and enrichment for one seed list.
pub struct CollectOrchestrator {
    expander: QueryExpander,
    collector: SearchCollector,
    dispatcher: ParallelDispatcher,
    pool: Arc<ProxyPool>,
    cancel: CancellationToken,
}

impl CollectOrchestrator {
    /// Build the pipeline from `config` over `store` and `pool`.
    #[must_use]
    pub fn new(store: Arc<dyn PlayStore>, pool: Arc<ProxyPool>, config: &ScraperConfig) -> Self {
        Self::with_cancellation(store, pool, config, CancellationToken::new())
    }

    /// Same as [`new`](Self::new), stopping early once `cancel` fires.
    #[must_use]
    pub fn with_cancellation(
        store: Arc<dyn PlayStore>,
        pool: Arc<ProxyPool>,
        config: &ScraperConfig,
        cancel: CancellationToken,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);

        let expander = QueryExpander::new(store.clone(), pool.clone(), retry.clone());
        let collector = SearchCollector::new(store.clone(), pool.clone(), retry.clone())
            .with_hits_buffer(config.search.hits_buffer)
            .with_delay_between_terms(Duration::from_millis(
                config.search.delay_between_terms_ms,
            ))
            .with_cancellation(cancel.clone());
        let fetcher = Arc::new(DetailFetcher::new(store, pool.clone(), retry));
        let dispatcher = ParallelDispatcher::new(fetcher)
            .with_max_workers(config.dispatch.max_workers)
            .with_timeout(config.dispatch.timeout_secs.map(Duration::from_secs))
            .with_cancellation(cancel.clone());

        Self {
            expander,
            collector,
            dispatcher,
            pool,
            cancel,
        }
    }

    /// Collect up to `target` items for `seeds`.
    ///
    /// Network failures never abort the run; they show up as failed terms or
    /// unresolved ids in the report. On cancellation whatever was gathered so
    /// far is returned.
    pub async fn run(
        &self,
        seeds: &[SeedQuery],
        per_query_limit: usize,
        target: usize,
    ) -> Result<CollectOutcome> {
        if seeds.is_empty() {
            return Err(CollectError::NoSeeds);
        }

        let started = Instant::now();
        let mut report = CollectReport::default();

        if self.pool.is_empty() {
            tracing::warn!("No proxies loaded, every request goes out directly from this host");
        } else {
            tracing::info!(proxies = self.pool.len(), "Using proxy pool");
        }

        let terms = if target == 0 || per_query_limit == 0 {
            tracing::info!(target_count = target, per_query_limit, "Nothing to collect");
            Vec::new()
        } else {
            let terms = self.expander.expand(seeds).await;
            if terms.is_empty() {
                tracing::warn!(seed = %seeds[0].term, "Nothing to search");
            }
            terms
        };
        report.terms_expanded = terms.len();

        let (mut candidates, stats) = self
            .collector
            .collect_with_stats(&terms, per_query_limit, target)
            .await;
        report.terms_searched = stats.terms_searched;
        report.terms_failed = stats.terms_failed;
        report.ids_collected = candidates.len();

        let ids = candidates.ids();
        let details = self.dispatcher.enrich(&ids).await;
        report.ids_enriched = candidates.apply_details(details);
        report.ids_unresolved = report.ids_collected - report.ids_enriched;
        report.cancelled = self.cancel.is_cancelled();
        report.elapsed = started.elapsed();

        tracing::info!(
            terms = report.terms_searched,
            failed_terms = report.terms_failed,
            collected = report.ids_collected,
            enriched = report.ids_enriched,
            unresolved = report.ids_unresolved,
            cancelled = report.cancelled,
            elapsed = ?report.elapsed,
            "Collection finished"
        );

        Ok(CollectOutcome {
            items: candidates.into_items(),
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playscout_playstore::testing::ScriptedPlayStore;

    fn quiet_config() -> ScraperConfig {
        let mut config = ScraperConfig::default();
        config.retry.max_attempts = 2;
        config.retry.initial_backoff_secs = 0;
        config.retry.jitter_min_ms = 0;
        config.retry.jitter_max_ms = 0;
        config.search.delay_between_terms_ms = 0;
        config.dispatch.max_workers = 4;
        config
    }

    #[tokio::test]
    async fn test_empty_seed_list_is_rejected() {
        let store = Arc::new(ScriptedPlayStore::new());
        let orchestrator =
            CollectOrchestrator::new(store, Arc::new(ProxyPool::direct()), &quiet_config());

        let result = orchestrator.run(&[], 5, 10).await;
        assert!(matches!(result, Err(CollectError::NoSeeds)));
    }

    #[tokio::test]
    async fn test_failed_expansion_collects_nothing() {
        let store = Arc::new(ScriptedPlayStore::new().with_failing_suggestions());
        let orchestrator = CollectOrchestrator::new(
            store.clone(),
            Arc::new(ProxyPool::direct()),
            &quiet_config(),
        );

        let outcome = orchestrator
            .run(&[SeedQuery::new("loan app")], 5, 10)
            .await
            .expect("run");

        assert!(outcome.items.is_empty());
        assert_eq!(outcome.report.terms_expanded, 0);
        assert!(store.searched_terms().is_empty());
    }

    #[tokio::test]
    async fn test_report_counts() {
        let store = Arc::new(
            ScriptedPlayStore::new()
                .with_suggestions(&["loan app", "fast loan"])
                .with_results("loan app", &["a.1", "a.2"])
                .with_failing_term("fast loan")
                .with_details(&["a.1"]),
        );
        let orchestrator =
            CollectOrchestrator::new(store, Arc::new(ProxyPool::direct()), &quiet_config());

        let outcome = orchestrator
            .run(&[SeedQuery::new("loan app")], 5, 10)
            .await
            .expect("run");

        let report = outcome.report;
        assert_eq!(report.terms_expanded, 2);
        assert_eq!(report.terms_searched, 2);
        assert_eq!(report.terms_failed, 1);
        assert_eq!(report.ids_collected, 2);
        assert_eq!(report.ids_enriched, 1);
        assert_eq!(report.ids_unresolved, 1);
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_zero_target_or_limit_issues_no_calls() {
        for (per_query_limit, target) in [(5, 0), (0, 10)] {
            let store = Arc::new(
                ScriptedPlayStore::new()
                    .with_suggestions(&["loan app"])
                    .with_results("loan app", &["a.1"]),
            );
            let orchestrator = CollectOrchestrator::new(
                store.clone(),
                Arc::new(ProxyPool::direct()),
                &quiet_config(),
            );

            let outcome = orchestrator
                .run(&[SeedQuery::new("loan app")], per_query_limit, target)
                .await
                .expect("run");

            assert!(outcome.items.is_empty());
            assert_eq!(outcome.report.terms_expanded, 0);
            assert_eq!(store.suggest_calls(), 0);
            assert!(store.searched_terms().is_empty());
            assert!(store.detail_calls().is_empty());
        }
    }
}
