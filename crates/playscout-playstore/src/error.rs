//! Error types for the store client.

use thiserror::Error;

/// Errors that can occur while talking to the store front.
#[derive(Error, Debug)]
pub enum PlayStoreError {
    /// The requested resource does not exist (HTTP 404)
    #[error("not found: {resource}")]
    NotFound {
        /// What was requested (app id or URL)
        resource: String,
    },

    /// Non-success HTTP status other than 404
    #[error("HTTP {status} from {url}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Network error (connect, timeout, proxy handshake)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not have the expected shape
    #[error("failed to parse {context}: {message}")]
    Parse {
        /// Which page or payload was being parsed
        context: String,
        /// Error message
        message: String,
    },

    /// Proxy endpoint could not be turned into a client
    #[error("invalid proxy {endpoint}: {message}")]
    InvalidProxy {
        /// Offending endpoint
        endpoint: String,
        /// Error message
        message: String,
    },

    /// URL construction failed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTTP client could not be built
    #[error("client error: {0}")]
    Client(String),
}

impl PlayStoreError {
    /// Whether another attempt (typically through a different proxy) may succeed.
    ///
    /// `NotFound` and HTTP 403 end retries for the operation; connection problems,
    /// other HTTP statuses, unparseable pages and broken proxies are retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::InvalidUrl(_) | Self::Client(_) => false,
            Self::Http { status, .. } => *status != 403,
            Self::Network(_) | Self::Parse { .. } | Self::InvalidProxy { .. } => true,
        }
    }

    /// Whether the error means the resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, PlayStoreError>;
