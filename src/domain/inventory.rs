//! Cross-reference inventory: documented objects and where they live.

use std::collections::{BTreeMap, btree_map::Entry};

use serde::Serialize;

/// Display name meaning "same as the object name".
pub const NO_DISPLAY_NAME: &str = "-";
/// Trailing location marker meaning "append the object name here".
pub const NAME_MARKER: &str = "$";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryItem {
    pub project_name: String,
    pub project_version: String,
    /// Resolved target URI.
    pub uri: String,
    /// Raw display name; [`NO_DISPLAY_NAME`] when none was given.
    pub display_name: String,
    pub priority: i32,
}

impl InventoryItem {
    /// Display name, or `None` when the inventory used the placeholder.
    pub fn display_name(&self) -> Option<&str> {
        (self.display_name != NO_DISPLAY_NAME).then_some(self.display_name.as_str())
    }
}

/// Object type (`domain:role`) → qualified name → item.
///
/// Built in one pass by the decoder; both levels iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InventoryIndex {
    data: BTreeMap<String, BTreeMap<String, InventoryItem>>,
}

impl InventoryIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, object_type: &str, name: &str, item: InventoryItem) {
        self.data
            .entry(object_type.to_string())
            .or_default()
            .insert(name.to_string(), item);
    }

    /// Insert only when no entry exists yet. Returns whether it was inserted.
    pub(crate) fn insert_first(
        &mut self,
        object_type: &str,
        name: &str,
        item: InventoryItem,
    ) -> bool {
        match self
            .data
            .entry(object_type.to_string())
            .or_default()
            .entry(name.to_string())
        {
            Entry::Vacant(vacant) => {
                vacant.insert(item);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, object_type: &str, name: &str) -> Option<&InventoryItem> {
        self.data.get(object_type)?.get(name)
    }

    pub fn contains(&self, object_type: &str, name: &str) -> bool {
        self.get(object_type, name).is_some()
    }

    /// Object types in sorted order.
    pub fn object_types(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Entries of one object type, sorted by name.
    pub fn entries(&self, object_type: &str) -> impl Iterator<Item = (&str, &InventoryItem)> {
        self.data
            .get(object_type)
            .into_iter()
            .flat_map(|entries| entries.iter().map(|(name, item)| (name.as_str(), item)))
    }

    /// Every `(type, name, item)` triple, sorted by type then name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &InventoryItem)> {
        self.data.iter().flat_map(|(object_type, entries)| {
            entries
                .iter()
                .map(move |(name, item)| (object_type.as_str(), name.as_str(), item))
        })
    }

    pub fn len(&self) -> usize {
        self.data.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(uri: &str, display_name: &str) -> InventoryItem {
        InventoryItem {
            project_name: "proj".to_string(),
            project_version: "1.0".to_string(),
            uri: uri.to_string(),
            display_name: display_name.to_string(),
            priority: 1,
        }
    }

    #[test]
    fn iterates_sorted_by_type_then_name() {
        let mut index = InventoryIndex::new();
        index.insert("std:label", "zeta", item("z.html", "-"));
        index.insert("py:function", "b", item("b.html", "-"));
        index.insert("py:function", "a", item("a.html", "-"));

        let order: Vec<_> = index.iter().map(|(ty, name, _)| (ty, name)).collect();
        assert_eq!(
            order,
            [("py:function", "a"), ("py:function", "b"), ("std:label", "zeta")]
        );
        assert_eq!(index.len(), 3);
        assert_eq!(index.object_types().collect::<Vec<_>>(), ["py:function", "std:label"]);
    }

    #[test]
    fn insert_first_keeps_existing_entry() {
        let mut index = InventoryIndex::new();
        assert!(index.insert_first("py:module", "pkg", item("first.html", "-")));
        assert!(!index.insert_first("py:module", "pkg", item("second.html", "-")));
        assert_eq!(
            index.get("py:module", "pkg").map(|item| item.uri.as_str()),
            Some("first.html")
        );
    }

    #[test]
    fn placeholder_display_name_reads_as_none() {
        assert_eq!(item("a", "-").display_name(), None);
        assert_eq!(item("a", "Title").display_name(), Some("Title"));
    }
}
