//! Playscout Core - Foundation crate for the playscout catalog collector.
//!
//! This crate provides the shared domain types, error handling and configuration
//! management that the store client, the collector and the persister depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Domain newtypes and records (`AppId`, `CatalogItem`, `ProxyEndpoint`, `Timestamp`)
//! - [`query`] - Seed query descriptors and search terms
//!
//! # Example
//!
//! ```rust
//! use playscout_core::{ScraperConfig, SeedQuery};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScraperConfig::default();
//! assert_eq!(config.dispatch.max_workers, 18);
//!
//! let seeds = SeedQuery::parse_list(r#"["loan app", "payday loan"]"#)?;
//! assert_eq!(seeds[0].term, "loan app");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod query;
pub mod types;

// Re-export commonly used types
pub use config::{
    BackoffKind, DispatchConfig, OutputConfig, PlayStoreConfig, ProxyConfig, RetryConfig,
    RotationStrategy, ScraperConfig, SearchConfig,
};
pub use error::{ConfigError, ConfigResult, CoreError, Result};
pub use query::{SearchTerm, SeedQuery, TermSource};
pub use types::{AppId, CatalogItem, ProxyEndpoint, Timestamp};
