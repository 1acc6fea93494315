//! Ordered, deduplicated, size-capped accumulator of search hits.

use indexmap::IndexMap;
use playscout_core::{AppId, CatalogItem};
use std::collections::HashMap;

/// Insertion-ordered set of catalog items keyed by id.
///
/// Membership and insertion are O(1). Iteration follows first-discovery order,
/// and the set never grows beyond its target.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    items: IndexMap<AppId, CatalogItem>,
    target: usize,
}

impl CandidateSet {
    /// Empty set that accepts at most `target` items.
    #[must_use]
    pub fn new(target: usize) -> Self {
        Self {
            items: IndexMap::with_capacity(target.min(1024)),
            target,
        }
    }

    /// Maximum number of items.
    #[must_use]
    pub fn target(&self) -> usize {
        self.target
    }

    /// Current number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the target has been reached.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.target
    }

    /// Whether `id` is already present.
    #[must_use]
    pub fn contains(&self, id: &AppId) -> bool {
        self.items.contains_key(id)
    }

    /// Insert `item` if its id is new and the set is not full.
    ///
    /// Returns whether the item was inserted. A duplicate never replaces the
    /// first-seen entry.
    pub fn insert(&mut self, item: CatalogItem) -> bool {
        if self.is_full() || self.items.contains_key(&item.id) {
            return false;
        }
        self.items.insert(item.id.clone(), item);
        true
    }

    /// Item stored under `id`.
    #[must_use]
    pub fn get(&self, id: &AppId) -> Option<&CatalogItem> {
        self.items.get(id)
    }

    /// Ids in discovery order.
    #[must_use]
    pub fn ids(&self) -> Vec<AppId> {
        self.items.keys().cloned().collect()
    }

    /// Items in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogItem> {
        self.items.values()
    }

    /// Merge detail records into their stubs.
    ///
    /// Records whose id is not in the set are ignored. Returns the number of
    /// items enriched.
    pub fn apply_details(&mut self, details: HashMap<AppId, CatalogItem>) -> usize {
        let mut enriched = 0;
        for (id, detail) in details {
            if let Some(item) = self.items.get_mut(&id) {
                if item.enrich(detail) {
                    enriched += 1;
                }
            }
        }
        enriched
    }

    /// Consume the set, yielding items in discovery order.
    #[must_use]
    pub fn into_items(self) -> Vec<CatalogItem> {
        self.items.into_values().collect()
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a CatalogItem;
    type IntoIter = indexmap::map::Values<'a, AppId, CatalogItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.values()
    }
}
