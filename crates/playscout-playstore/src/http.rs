//! reqwest-backed store client.
//!
//! Proxy routing is a per-call argument: one `reqwest::Client` is built lazily per
//! endpoint and cached, so concurrent calls through different endpoints never share
//! mutable egress configuration.

use crate::error::{PlayStoreError, Result};
use crate::parse;
use crate::service::PlayStore;
use async_trait::async_trait;
use playscout_core::{AppId, CatalogItem, PlayStoreConfig, ProxyEndpoint};
use reqwest::{Client, Proxy, StatusCode};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// HTTP implementation of [`PlayStore`].
pub struct HttpPlayStore {
    config: PlayStoreConfig,
    base_url: Url,
    suggest_url: Url,
    direct: Client,
    proxied: Mutex<HashMap<ProxyEndpoint, Client>>,
}

impl HttpPlayStore {
    /// Create a client for the configured store front.
    ///
    /// # Errors
    /// Returns error if a configured URL is invalid or the HTTP client cannot be created.
    pub fn new(config: PlayStoreConfig) -> Result<Self> {
        let base_url = directory_url(Url::parse(&config.base_url)?);
        let suggest_url = Url::parse(&config.suggest_url)?;
        let direct = Self::client_builder(&config)
            .no_proxy()
            .build()
            .map_err(|e| PlayStoreError::Client(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            base_url,
            suggest_url,
            direct,
            proxied: Mutex::new(HashMap::new()),
        })
    }

    fn client_builder(config: &PlayStoreConfig) -> reqwest::ClientBuilder {
        Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
    }

    /// Client routed through `proxy`, or the direct client.
    fn client_for(&self, proxy: Option<&ProxyEndpoint>) -> Result<Client> {
        let Some(endpoint) = proxy else {
            return Ok(self.direct.clone());
        };

        let mut cache = self
            .proxied
            .lock()
            .map_err(|_| PlayStoreError::Client("proxy client cache poisoned".to_string()))?;

        if let Some(client) = cache.get(endpoint) {
            return Ok(client.clone());
        }

        let invalid = |e: reqwest::Error| PlayStoreError::InvalidProxy {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        };
        let client = Self::client_builder(&self.config)
            .proxy(Proxy::all(endpoint.to_url()).map_err(invalid)?)
            .build()
            .map_err(invalid)?;

        cache.insert(endpoint.clone(), client.clone());
        Ok(client)
    }

    fn locale_pairs(&self, url: &mut Url) {
        url.query_pairs_mut()
            .append_pair("hl", &self.config.lang)
            .append_pair("gl", &self.config.country);
    }

    async fn get_text(
        &self,
        url: Url,
        resource: &str,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<String> {
        let client = self.client_for(proxy)?;

        tracing::trace!(url = %url, proxy = ?proxy.map(ToString::to_string), "GET");
        let response = client.get(url.clone()).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PlayStoreError::NotFound {
                resource: resource.to_string(),
            });
        }
        if !status.is_success() {
            return Err(PlayStoreError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

/// `url` with a trailing slash so relative joins keep its whole path.
fn directory_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait]
impl PlayStore for HttpPlayStore {
    async fn suggest(&self, term: &str, proxy: Option<&ProxyEndpoint>) -> Result<Vec<String>> {
        let mut url = self.suggest_url.clone();
        url.query_pairs_mut()
            .append_pair("json", "1")
            .append_pair("c", "3")
            .append_pair("query", term);
        self.locale_pairs(&mut url);

        let body = self.get_text(url, term, proxy).await?;
        parse::parse_suggestions(&body)
    }

    async fn search(
        &self,
        term: &str,
        n_hits: usize,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<Vec<CatalogItem>> {
        let mut url = self.base_url.join("store/search")?;
        url.query_pairs_mut()
            .append_pair("q", term)
            .append_pair("c", "apps");
        self.locale_pairs(&mut url);

        let html = self.get_text(url, term, proxy).await?;
        parse::parse_search_page(&html, &self.base_url, term, n_hits)
    }

    async fn details(&self, id: &AppId, proxy: Option<&ProxyEndpoint>) -> Result<CatalogItem> {
        let mut url = parse::detail_url(&self.base_url, id)?;
        let page_url = url.to_string();
        self.locale_pairs(&mut url);

        let html = self.get_text(url, id.as_str(), proxy).await?;
        parse::parse_detail_page(&html, id, &page_url)
    }
}
