//! Ordered item collection
//!
//! The full set of items shown by the grid, in display order. A collection
//! is never edited in place: filters, sorts and folder changes produce a new
//! sequence that replaces the old one wholesale.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// Opaque item identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One entry of the collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: ItemId,
    name: String,
    asset_source: PathBuf,
    order: usize,
}

impl Item {
    /// Create an item. Its position is assigned when the collection is
    /// populated.
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        asset_source: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            asset_source: asset_source.into(),
            order: 0,
        }
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    /// Display name, shown as the grid header for the selected item
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the item's asset is loaded from
    pub fn asset_source(&self) -> &Path {
        &self.asset_source
    }

    /// Position in the collection
    pub fn order(&self) -> usize {
        self.order
    }
}

/// Immutable ordered sequence of items
#[derive(Debug, Clone, Default)]
pub struct ItemIndex {
    items: Vec<Item>,
}

impl ItemIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection. Each item's order becomes its position
    /// in `items`.
    pub fn populate(&mut self, items: impl IntoIterator<Item = Item>) {
        self.items = items
            .into_iter()
            .enumerate()
            .map(|(order, mut item)| {
                item.order = order;
                item
            })
            .collect();
    }

    /// Item at position `index`
    pub fn get(&self, index: usize) -> Result<&Item, CacheError> {
        self.items.get(index).ok_or(CacheError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    /// Position of the item with the given id
    pub fn position_of(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }
}

impl FromIterator<Item> for ItemIndex {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        let mut index = Self::new();
        index.populate(iter);
        index
    }
}
