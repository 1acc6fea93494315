//! Playscout Play Store - Client for the public store front.
//!
//! This crate wraps the three store endpoints the collector relies on:
//! query suggestions, search result pages and app detail pages. Every call
//! takes its egress proxy as an argument, so one client can serve many
//! concurrent workers routed through different endpoints.
//!
//! # Example
//!
//! ```rust,ignore
//! use playscout_core::PlayStoreConfig;
//! use playscout_playstore::{HttpPlayStore, PlayStore};
//!
//! let store = HttpPlayStore::new(PlayStoreConfig::default())?;
//! let hits = store.search("loan app", 10, None).await?;
//! for item in hits {
//!     println!("{} {:?}", item.id, item.title);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod http;
#[allow(missing_docs)]
pub mod parse;
pub mod service;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{PlayStoreError, Result};
pub use http::HttpPlayStore;
pub use service::PlayStore;
