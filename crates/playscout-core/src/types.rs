//! Shared types used across playscout.
//!
//! This module defines the catalog identity newtype, the catalog record that flows
//! from search through enrichment to persistence, and the proxy endpoint value.

use crate::error::CoreError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Newtype for catalog identifiers (Android package names such as `com.example.app`).
///
/// The id is the deduplication key for everything the collector gathers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppId(String);

impl AppId {
    /// Create a new `AppId` from a string.
    ///
    /// # Errors
    /// Returns error if the id is empty or contains characters outside `[A-Za-z0-9_.]`.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), CoreError> {
        static APP_ID_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = APP_ID_REGEX.get_or_init(|| {
            Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.]{0,254}$").expect("valid regex")
        });

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "invalid app ID: expected a package name, got '{id}'"
            )))
        }
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for AppId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AppId> for String {
    fn from(id: AppId) -> Self {
        id.0
    }
}

/// A network egress endpoint (`host:port`).
///
/// Endpoints carry no health state of their own; failure tracking lives in the
/// collector's proxy pool and is rebuilt on every run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyEndpoint {
    host: String,
    port: u16,
}

impl ProxyEndpoint {
    /// Create an endpoint from its parts.
    ///
    /// # Errors
    /// Returns error if the host is empty or the port is zero.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, CoreError> {
        let host = host.into();
        if host.is_empty() || host.chars().any(char::is_whitespace) {
            return Err(CoreError::Validation(format!(
                "invalid proxy host: '{host}'"
            )));
        }
        if port == 0 {
            return Err(CoreError::Validation("proxy port must be non-zero".to_string()));
        }
        Ok(Self { host, port })
    }

    /// Host part of the endpoint.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port part of the endpoint.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Proxy URL suitable for an HTTP client (`http://host:port`).
    #[must_use]
    pub fn to_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl FromStr for ProxyEndpoint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let without_scheme = trimmed
            .strip_prefix("http://")
            .or_else(|| trimmed.strip_prefix("https://"))
            .unwrap_or(trimmed)
            .trim_end_matches('/');

        let (host, port) = without_scheme.rsplit_once(':').ok_or_else(|| {
            CoreError::Validation(format!("invalid proxy entry, expected host:port: '{trimmed}'"))
        })?;

        let port = port.parse::<u16>().map_err(|e| {
            CoreError::Validation(format!("invalid proxy port in '{trimmed}': {e}"))
        })?;

        Self::new(host, port)
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
///
/// Serializes as an RFC3339 string, which is the canonical textual form used in
/// persisted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Parse a timestamp from an RFC3339 string.
    pub fn from_rfc3339(s: &str) -> Result<Self, CoreError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| CoreError::Validation(format!("invalid timestamp: {e}")))
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

/// A catalog entry as collected from the store.
///
/// Created as a stub from a search hit (id plus whatever the result card showed)
/// and enriched in place by a successful detail fetch. Absent fields are omitted
/// from serialized output, so a stub that never got enriched persists with its
/// search-stage fields only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Unique catalog id
    pub id: AppId,
    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Developer / publisher name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer: Option<String>,
    /// Long description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Average star rating (0-5)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Number of ratings behind `score`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings: Option<u64>,
    /// Install-count bucket as displayed (e.g. `1,000,000+`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installs: Option<String>,
    /// Store category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Price in the store's currency (0.0 for free apps)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Canonical store page URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Search term that first discovered this entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_term: Option<String>,
    /// When the detail record was fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<Timestamp>,
    /// Raw provider payload backing the detail fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl CatalogItem {
    /// Create an item carrying only its id.
    #[must_use]
    pub fn new(id: AppId) -> Self {
        Self {
            id,
            title: None,
            developer: None,
            description: None,
            score: None,
            ratings: None,
            installs: None,
            genre: None,
            price: None,
            url: None,
            source_term: None,
            fetched_at: None,
            raw: None,
        }
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the discovering search term.
    #[must_use]
    pub fn with_source_term(mut self, term: impl Into<String>) -> Self {
        self.source_term = Some(term.into());
        self
    }

    /// Whether a detail fetch has enriched this item.
    #[must_use]
    pub fn is_enriched(&self) -> bool {
        self.fetched_at.is_some()
    }

    /// Merge a detail record into this item.
    ///
    /// Every field present on `detail` overwrites the stub's value; fields absent on
    /// `detail` keep what the search stage found. The discovering search term is
    /// never replaced. Returns `false` and leaves `self` untouched when the ids differ.
    pub fn enrich(&mut self, detail: CatalogItem) -> bool {
        fn take<T>(slot: &mut Option<T>, incoming: Option<T>) {
            if incoming.is_some() {
                *slot = incoming;
            }
        }

        if detail.id != self.id {
            return false;
        }

        take(&mut self.title, detail.title);
        take(&mut self.developer, detail.developer);
        take(&mut self.description, detail.description);
        take(&mut self.score, detail.score);
        take(&mut self.ratings, detail.ratings);
        take(&mut self.installs, detail.installs);
        take(&mut self.genre, detail.genre);
        take(&mut self.price, detail.price);
        take(&mut self.url, detail.url);
        take(&mut self.fetched_at, detail.fetched_at);
        take(&mut self.raw, detail.raw);
        if self.source_term.is_none() {
            self.source_term = detail.source_term;
        }
        true
    }
}
