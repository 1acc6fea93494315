//! Playscout Collector - Catalog collection pipeline.
//!
//! This crate turns a seed query into a bounded, deduplicated set of catalog
//! items with as much detail as the store would give up.
//!
//! # Features
//!
//! - Query expansion through the store's suggestion service
//! - Sequential search with first-seen deduplication and greedy early stop
//! - Per-attempt proxy rotation with in-memory health tracking
//! - Retry with fixed or exponential backoff plus jitter
//! - Bounded-concurrency detail enrichment tolerant of partial failure
//! - Cooperative cancellation between terms and between dispatched ids
//!
//! # Example
//!
//! ```rust,ignore
//! use playscout_collector::{CollectOrchestrator, ProxyPool};
//! use playscout_core::{ScraperConfig, SeedQuery};
//! use playscout_playstore::HttpPlayStore;
//! use std::sync::Arc;
//!
//! let config = ScraperConfig::load()?.with_env_overrides();
//! let store = Arc::new(HttpPlayStore::new(config.store.clone())?);
//! let pool = Arc::new(ProxyPool::from_config(&config.proxy));
//!
//! let orchestrator = CollectOrchestrator::new(store, pool, &config);
//! let outcome = orchestrator.run(&[SeedQuery::new("loan app")], 20, 100).await?;
//! println!("{} items", outcome.items.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod candidates;
pub mod collector;
pub mod dispatcher;
pub mod error;
pub mod expander;
pub mod fetcher;
pub mod orchestrator;
pub mod proxy;
pub mod retry;

pub use candidates::CandidateSet;
pub use collector::{SearchCollector, SearchStats};
pub use dispatcher::ParallelDispatcher;
pub use error::{CollectError, Result};
pub use expander::QueryExpander;
pub use fetcher::DetailFetcher;
pub use orchestrator::{CollectOrchestrator, CollectOutcome, CollectReport};
pub use proxy::ProxyPool;
pub use retry::{FailurePredicate, RetryAttempt, RetryPolicy};
