//! Error types for the collection pipeline.
//!
//! Network failures are absorbed at the smallest scope (one term, one id) and
//! never surface here; only problems that make the whole run meaningless do.

use thiserror::Error;

/// Errors that abort a collection run.
#[derive(Debug, Error)]
pub enum CollectError {
    /// No seed query was supplied
    #[error("no seed queries supplied")]
    NoSeeds,
}

/// Result type alias for collection operations.
pub type Result<T> = std::result::Result<T, CollectError>;
