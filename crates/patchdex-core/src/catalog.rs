//! Shared identifier map populated by the scanners during one pass.

use std::collections::HashMap;

use tracing::trace;

use crate::baseline::BaselineIds;
use crate::package::Package;
use crate::schema::Category;

/// One item found in a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredItem {
    pub inner_id: String,
    pub display_name: String,
    pub category: Category,
    pub package_id: String,
    pub package_name: String,
}

impl DiscoveredItem {
    pub fn new(
        inner_id: impl Into<String>,
        display_name: impl Into<String>,
        category: Category,
        owner: &Package,
    ) -> Self {
        Self {
            inner_id: inner_id.into(),
            display_name: display_name.into(),
            category,
            package_id: owner.unique_id.clone(),
            package_name: owner.name.clone(),
        }
    }
}

/// Qualified identifier → item, first writer wins.
#[derive(Debug)]
pub struct ItemCatalog<'b> {
    baseline: &'b BaselineIds,
    items: HashMap<String, DiscoveredItem>,
}

impl<'b> ItemCatalog<'b> {
    pub fn new(baseline: &'b BaselineIds) -> Self {
        Self {
            baseline,
            items: HashMap::new(),
        }
    }

    pub fn is_baseline(&self, qualified_id: &str) -> bool {
        self.baseline.contains(qualified_id)
    }

    pub fn contains(&self, qualified_id: &str) -> bool {
        self.items.contains_key(qualified_id)
    }

    /// Register an item unless it is a baseline identifier or already known.
    ///
    /// Returns whether the item was added.
    pub fn register(&mut self, qualified_id: String, item: DiscoveredItem) -> bool {
        if self.is_baseline(&qualified_id) || self.contains(&qualified_id) {
            return false;
        }
        trace!(id = %qualified_id, package = %item.package_id, "Registered item");
        self.items.insert(qualified_id, item);
        true
    }

    pub fn get(&self, qualified_id: &str) -> Option<&DiscoveredItem> {
        self.items.get(qualified_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> HashMap<String, DiscoveredItem> {
        self.items
    }
}
