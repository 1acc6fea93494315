//! Scripted in-memory store for tests.
//!
//! Behavior is fixed up front with the builder methods; every call is recorded
//! so tests can assert on call counts, proxy routing and peak concurrency.

use crate::error::{PlayStoreError, Result};
use crate::service::PlayStore;
use async_trait::async_trait;
use playscout_core::{AppId, CatalogItem, ProxyEndpoint, Timestamp};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Search-stage stub for `id`, as a search page would return it.
#[must_use]
pub fn stub(id: &str) -> CatalogItem {
    CatalogItem::new(AppId::new(id).expect("valid test id")).with_title(format!("{id} title"))
}

/// Enriched detail record for `id`.
#[must_use]
pub fn detail(id: &str) -> CatalogItem {
    let mut item = CatalogItem::new(AppId::new(id).expect("valid test id"))
        .with_title(format!("{id} full title"));
    item.developer = Some(format!("{id} developer"));
    item.installs = Some("1,000+".to_string());
    item.fetched_at = Some(Timestamp::now());
    item
}

fn unavailable(what: &str) -> PlayStoreError {
    PlayStoreError::Http {
        status: 503,
        url: format!("scripted://{what}"),
    }
}

/// One recorded detail call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailCall {
    /// Requested id
    pub id: AppId,
    /// Proxy the call was routed through
    pub proxy: Option<ProxyEndpoint>,
}

/// In-memory [`PlayStore`] with scripted answers.
#[derive(Default)]
pub struct ScriptedPlayStore {
    suggestions: Vec<String>,
    suggest_fails: bool,
    results: HashMap<String, Vec<CatalogItem>>,
    failing_terms: HashSet<String>,
    details: HashMap<AppId, CatalogItem>,
    always_failing: HashSet<AppId>,
    forbidden: HashSet<AppId>,
    failing_proxies: HashSet<ProxyEndpoint>,
    fail_first: Mutex<HashMap<AppId, usize>>,
    latency: Option<Duration>,

    suggest_calls: AtomicUsize,
    search_log: Mutex<Vec<(String, usize)>>,
    detail_log: Mutex<Vec<DetailCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedPlayStore {
    /// Empty store: no suggestions, no hits, every detail lookup is not found.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Suggestions returned for any term.
    #[must_use]
    pub fn with_suggestions(mut self, suggestions: &[&str]) -> Self {
        self.suggestions = suggestions.iter().map(ToString::to_string).collect();
        self
    }

    /// Make every suggestion call fail.
    #[must_use]
    pub fn with_failing_suggestions(mut self) -> Self {
        self.suggest_fails = true;
        self
    }

    /// Search hits for `term`, given as ids in rank order.
    #[must_use]
    pub fn with_results(mut self, term: &str, ids: &[&str]) -> Self {
        self.results
            .insert(term.to_string(), ids.iter().map(|id| stub(id)).collect());
        self
    }

    /// Make every search for `term` fail with a retryable error.
    #[must_use]
    pub fn with_failing_term(mut self, term: &str) -> Self {
        self.failing_terms.insert(term.to_string());
        self
    }

    /// Register detail records for `ids`.
    #[must_use]
    pub fn with_details(mut self, ids: &[&str]) -> Self {
        for id in ids {
            let item = detail(id);
            self.details.insert(item.id.clone(), item);
        }
        self
    }

    /// Make every detail call for `id` fail with a retryable error.
    #[must_use]
    pub fn with_failing_detail(mut self, id: &str) -> Self {
        self.always_failing
            .insert(AppId::new(id).expect("valid test id"));
        self
    }

    /// Make detail calls for `id` answer HTTP 403.
    #[must_use]
    pub fn with_forbidden_detail(mut self, id: &str) -> Self {
        self.forbidden.insert(AppId::new(id).expect("valid test id"));
        self
    }

    /// Make the first `n` detail calls for `id` fail with a retryable error.
    #[must_use]
    pub fn with_flaky_detail(self, id: &str, n: usize) -> Self {
        self.fail_first
            .lock()
            .expect("lock")
            .insert(AppId::new(id).expect("valid test id"), n);
        self
    }

    /// Make every call routed through `proxy` fail with a retryable error.
    #[must_use]
    pub fn with_failing_proxy(mut self, proxy: &ProxyEndpoint) -> Self {
        self.failing_proxies.insert(proxy.clone());
        self
    }

    /// Sleep this long inside every call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of suggestion calls made.
    pub fn suggest_calls(&self) -> usize {
        self.suggest_calls.load(Ordering::SeqCst)
    }

    /// Terms searched, in call order.
    pub fn searched_terms(&self) -> Vec<String> {
        self.search_log
            .lock()
            .expect("lock")
            .iter()
            .map(|(term, _)| term.clone())
            .collect()
    }

    /// Hit counts requested per search, in call order.
    pub fn requested_hits(&self) -> Vec<usize> {
        self.search_log
            .lock()
            .expect("lock")
            .iter()
            .map(|(_, n)| *n)
            .collect()
    }

    /// Detail calls made, in call order.
    pub fn detail_calls(&self) -> Vec<DetailCall> {
        self.detail_log.lock().expect("lock").clone()
    }

    /// Detail calls made for `id`.
    pub fn detail_calls_for(&self, id: &str) -> Vec<DetailCall> {
        self.detail_calls()
            .into_iter()
            .filter(|call| call.id.as_str() == id)
            .collect()
    }

    /// Highest number of calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, proxy: Option<&ProxyEndpoint>) -> Result<InFlight<'_>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(proxy) = proxy {
            if self.failing_proxies.contains(proxy) {
                return Err(unavailable(&proxy.to_string()));
            }
        }
        Ok(guard)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PlayStore for ScriptedPlayStore {
    async fn suggest(&self, term: &str, proxy: Option<&ProxyEndpoint>) -> Result<Vec<String>> {
        self.suggest_calls.fetch_add(1, Ordering::SeqCst);
        let _guard = self.enter(proxy).await?;

        if self.suggest_fails {
            return Err(unavailable(term));
        }
        Ok(self.suggestions.clone())
    }

    async fn search(
        &self,
        term: &str,
        n_hits: usize,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<Vec<CatalogItem>> {
        self.search_log
            .lock()
            .expect("lock")
            .push((term.to_string(), n_hits));
        let _guard = self.enter(proxy).await?;

        if self.failing_terms.contains(term) {
            return Err(unavailable(term));
        }
        Ok(self
            .results
            .get(term)
            .map(|hits| {
                hits.iter()
                    .take(n_hits)
                    .cloned()
                    .map(|item| item.with_source_term(term))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn details(&self, id: &AppId, proxy: Option<&ProxyEndpoint>) -> Result<CatalogItem> {
        self.detail_log.lock().expect("lock").push(DetailCall {
            id: id.clone(),
            proxy: proxy.cloned(),
        });
        let _guard = self.enter(proxy).await?;

        if self.forbidden.contains(id) {
            return Err(PlayStoreError::Http {
                status: 403,
                url: format!("scripted://{id}"),
            });
        }
        if self.always_failing.contains(id) {
            return Err(unavailable(id.as_str()));
        }
        {
            let mut remaining = self.fail_first.lock().expect("lock");
            if let Some(n) = remaining.get_mut(id) {
                if *n > 0 {
                    *n -= 1;
                    return Err(unavailable(id.as_str()));
                }
            }
        }

        self.details
            .get(id)
            .cloned()
            .ok_or_else(|| PlayStoreError::NotFound {
                resource: id.to_string(),
            })
    }
}
