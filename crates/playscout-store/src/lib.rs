//! Playscout Store - Durable output for collected catalog items.
//!
//! Items are written as one JSON array of objects, each carrying at least an
//! `id`. Detail fields appear only when enrichment resolved them. Timestamps are
//! RFC 3339 strings.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod persister;

pub use error::{Result, StoreError};
pub use persister::Persister;
