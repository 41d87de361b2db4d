// Domain rules - Working set policies

use std::collections::HashSet;
use std::path::Path;

use crate::domain::model::*;

/// The ordered collection of items under edit.
///
/// Only the orchestration layer mutates it; workers report back through
/// completion lists that are applied here after a batch has joined.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    items: Vec<EditItem>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<EditItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[EditItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [EditItem] {
        &mut self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &ItemKey) -> Option<&EditItem> {
        self.items.iter().find(|item| item.key() == *key)
    }

    pub fn get_mut(&mut self, key: &ItemKey) -> Option<&mut EditItem> {
        self.items.iter_mut().find(|item| item.key() == *key)
    }

    /// Items taking part in the next batch, in collection order
    pub fn selected(&self) -> Vec<EditItem> {
        self.items
            .iter()
            .filter(|item| item.is_selected)
            .cloned()
            .collect()
    }

    /// Lowest clone index not yet used for `file_path`
    pub fn next_clone_index(&self, file_path: &Path) -> u32 {
        self.items
            .iter()
            .filter(|item| item.file_path() == file_path)
            .map(|item| item.clone_index() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Append an item. An item whose key is already present is re-indexed
    /// to the next free clone index for its path.
    pub fn push(&mut self, item: EditItem) -> ItemKey {
        let item = if self.get(&item.key()).is_some() {
            let index = self.next_clone_index(item.file_path());
            item.duplicate_as(index)
        } else {
            item
        };
        let key = item.key();
        self.items.push(item);
        key
    }

    /// Insert a copy of `key` right after it, with a fresh clone index
    pub fn duplicate(&mut self, key: &ItemKey) -> Option<ItemKey> {
        let position = self.items.iter().position(|item| item.key() == *key)?;
        let index = self.next_clone_index(&key.file_path);
        let copy = self.items[position].duplicate_as(index);
        let new_key = copy.key();
        self.items.insert(position + 1, copy);
        Some(new_key)
    }

    pub fn remove(&mut self, key: &ItemKey) -> Option<EditItem> {
        let position = self.items.iter().position(|item| item.key() == *key)?;
        Some(self.items.remove(position))
    }

    /// Drop every item that appears in `completed`; returns how many went
    pub fn remove_completed(&mut self, completed: &[EditItem]) -> usize {
        let keys: HashSet<ItemKey> = completed.iter().map(EditItem::key).collect();
        let before = self.items.len();
        self.items.retain(|item| !keys.contains(&item.key()));
        before - self.items.len()
    }

    pub fn set_all_selected(&mut self, selected: bool) {
        for item in &mut self.items {
            item.is_selected = selected;
        }
    }

    /// `Some(true)`/`Some(false)` when every item agrees, `None` when mixed or empty
    pub fn all_selected(&self) -> Option<bool> {
        let first = self.items.first()?.is_selected;
        self.items
            .iter()
            .all(|item| item.is_selected == first)
            .then_some(first)
    }

    /// Swap the item at `index` with its predecessor
    pub fn move_before(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.items.len() {
            return false;
        }
        self.items.swap(index - 1, index);
        true
    }

    /// Swap the item at `index` with its successor
    pub fn move_after(&mut self, index: usize) -> bool {
        if index + 1 >= self.items.len() {
            return false;
        }
        self.items.swap(index, index + 1);
        true
    }

    pub fn into_items(self) -> Vec<EditItem> {
        self.items
    }
}
