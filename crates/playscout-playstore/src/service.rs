//! The store service trait.

use crate::error::Result;
use async_trait::async_trait;
use playscout_core::{AppId, CatalogItem, ProxyEndpoint};

/// Operations the collector needs from the store front.
///
/// Every call takes the egress endpoint explicitly. `None` means a direct
/// connection. Implementations must never read or write process-wide proxy
/// state, so concurrent calls through different endpoints cannot interfere.
#[async_trait]
pub trait PlayStore: Send + Sync {
    /// Related query phrases for `term`, in the service's order.
    ///
    /// # Errors
    /// Returns error if the suggestion service is unreachable or answers garbage.
    async fn suggest(&self, term: &str, proxy: Option<&ProxyEndpoint>) -> Result<Vec<String>>;

    /// Up to `n_hits` search results for `term`, as search-stage stubs in rank order.
    ///
    /// # Errors
    /// Returns error on network failure, a non-success status or an unparseable page.
    async fn search(
        &self,
        term: &str,
        n_hits: usize,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<Vec<CatalogItem>>;

    /// Full detail record for one id.
    ///
    /// # Errors
    /// Returns `PlayStoreError::NotFound` if the id does not exist, other errors on
    /// network failure or an unparseable page.
    async fn details(&self, id: &AppId, proxy: Option<&ProxyEndpoint>) -> Result<CatalogItem>;
}
