//! Seed query expansion through the suggestion service.

use crate::proxy::ProxyPool;
use crate::retry::RetryPolicy;
use playscout_core::{SearchTerm, SeedQuery};
use playscout_playstore::PlayStore;
use std::collections::HashSet;
use std::sync::Arc;

/// Turns the caller's seed list into the ordered terms the collector searches.
///
/// Only the first seed is expanded and the caller's list is replaced by what the
/// suggestion service returns. The seed itself is searched only if the service
/// suggests it. An empty answer or a failed call leaves nothing to search.
pub struct QueryExpander {
    store: Arc<dyn PlayStore>,
    pool: Arc<ProxyPool>,
    retry: RetryPolicy,
}

impl QueryExpander {
    /// Create an expander.
    #[must_use]
    pub fn new(store: Arc<dyn PlayStore>, pool: Arc<ProxyPool>, retry: RetryPolicy) -> Self {
        Self { store, pool, retry }
    }

    /// Expand `seeds` into search terms.
    ///
    /// On success the result is the service's suggestions in service order,
    /// trimmed, with case-insensitive duplicates removed.
    pub async fn expand(&self, seeds: &[SeedQuery]) -> Vec<SearchTerm> {
        let Some(seed) = seeds.first() else {
            return Vec::new();
        };
        if seeds.len() > 1 {
            tracing::debug!(
                seed = %seed.term,
                dropped = seeds.len() - 1,
                "Expanding first seed only"
            );
        }

        let store = &self.store;
        let suggestions = self
            .retry
            .run("suggest", &self.pool, |attempt| async move {
                store.suggest(&seed.term, attempt.proxy.as_ref()).await
            })
            .await;

        let suggestions = match suggestions {
            Ok(suggestions) => suggestions,
            Err(e) => {
                tracing::warn!(seed = %seed.term, error = %e, "Query expansion failed");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let terms: Vec<SearchTerm> = suggestions
            .iter()
            .map(|s| SearchTerm::suggested(s.trim()))
            .filter(|term| !term.text.is_empty() && seen.insert(term.text.to_lowercase()))
            .collect();

        tracing::info!(seed = %seed.term, terms = terms.len(), "Expanded seed query");
        terms
    }
}
