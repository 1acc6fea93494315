//! Single-id detail resolution.

use crate::proxy::ProxyPool;
use crate::retry::RetryPolicy;
use playscout_core::{AppId, CatalogItem};
use playscout_playstore::PlayStore;
use std::sync::Arc;

/// Resolves one id to its full detail record.
pub struct DetailFetcher {
    store: Arc<dyn PlayStore>,
    pool: Arc<ProxyPool>,
    retry: RetryPolicy,
}

impl DetailFetcher {
    /// Create a fetcher.
    #[must_use]
    pub fn new(store: Arc<dyn PlayStore>, pool: Arc<ProxyPool>, retry: RetryPolicy) -> Self {
        Self { store, pool, retry }
    }

    /// Fetch the detail record for `id`.
    ///
    /// Each attempt goes through a different proxy with backoff in between. Returns
    /// `None` once the attempt budget is spent, the id does not exist or the
    /// store refuses the request; the failure is logged, never raised.
    pub async fn fetch_detail(&self, id: &AppId) -> Option<CatalogItem> {
        let store = &self.store;
        let result = self
            .retry
            .run(id.as_str(), &self.pool, |attempt| async move {
                tracing::trace!(
                    app_id = %id,
                    attempt = attempt.index + 1,
                    proxy = ?attempt.proxy.as_ref().map(ToString::to_string),
                    "Fetching detail"
                );
                store.details(id, attempt.proxy.as_ref()).await
            })
            .await;

        match result {
            Ok(detail) if detail.id == *id => Some(detail),
            Ok(detail) => {
                tracing::warn!(app_id = %id, returned = %detail.id, "Detail record has wrong id");
                None
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(app_id = %id, "App not found");
                None
            }
            Err(e) => {
                tracing::warn!(
                    app_id = %id,
                    max_attempts = self.retry.attempts(),
                    error = %e,
                    "Giving up on detail fetch"
                );
                None
            }
        }
    }
}
