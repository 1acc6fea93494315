//! Seed query descriptors and the search terms derived from them.

use crate::error::{CoreError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A caller-supplied seed query, optionally labelled (e.g. with a category id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedQuery {
    /// The phrase to search for
    pub term: String,
    /// Human label used for output naming; defaults to the term
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Accepted shapes of the structured query argument.
#[derive(Deserialize)]
#[serde(untagged)]
enum SeedListInput {
    List(Vec<SeedEntry>),
    Labeled(IndexMap<String, String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedEntry {
    Term(String),
    Descriptor {
        term: String,
        #[serde(default)]
        label: Option<String>,
    },
}

impl SeedQuery {
    /// Create an unlabelled seed.
    #[must_use]
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            label: None,
        }
    }

    /// Parse the structured seed list passed on the command line.
    ///
    /// Accepts a JSON array of strings, a JSON array of `{"term", "label"}` objects,
    /// or a JSON object mapping label to term. Order is preserved.
    ///
    /// # Errors
    /// Returns `CoreError::MalformedQueries` when the text is not one of those shapes,
    /// and `CoreError::Validation` for an empty list or a blank term.
    pub fn parse_list(input: &str) -> Result<Vec<Self>> {
        let parsed: SeedListInput = serde_json::from_str(input)?;

        let seeds: Vec<Self> = match parsed {
            SeedListInput::List(entries) => entries
                .into_iter()
                .map(|entry| match entry {
                    SeedEntry::Term(term) => Self::new(term),
                    SeedEntry::Descriptor { term, label } => Self { term, label },
                })
                .collect(),
            SeedListInput::Labeled(map) => map
                .into_iter()
                .map(|(label, term)| Self {
                    term,
                    label: Some(label),
                })
                .collect(),
        };

        if seeds.is_empty() {
            return Err(CoreError::Validation(
                "query list must contain at least one seed".to_string(),
            ));
        }

        seeds
            .into_iter()
            .map(|mut seed| {
                seed.term = seed.term.trim().to_string();
                if seed.term.is_empty() {
                    Err(CoreError::Validation("seed terms must not be blank".to_string()))
                } else {
                    Ok(seed)
                }
            })
            .collect()
    }

    /// Label used for output naming.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.term)
    }

    /// Filesystem-safe form of the label.
    #[must_use]
    pub fn file_stem(&self) -> String {
        self.label()
            .replace('/', "_")
            .replace('&', "and")
            .replace(' ', "_")
    }
}

/// Where a search term came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermSource {
    /// The caller's seed
    Seed,
    /// Returned by the suggestion service
    Suggested,
}

/// One query to run against the search service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchTerm {
    /// Query text
    pub text: String,
    /// Provenance
    pub source: TermSource,
}

impl SearchTerm {
    /// A seed term.
    #[must_use]
    pub fn seed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: TermSource::Seed,
        }
    }

    /// A suggested expansion term.
    #[must_use]
    pub fn suggested(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: TermSource::Suggested,
        }
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
