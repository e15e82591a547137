//! Identity compaction tables.
//!
//! Saving maps each distinct [`ItemId`] to `1, 2, 3, ...` in first-seen
//! order. Loading maps each distinct wire token to a freshly minted id.
//! Both tables live for exactly one save or load.

use knecht_common::ItemId;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct IdCompactor {
    ids: HashMap<ItemId, u32>,
}

impl IdCompactor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compact(&mut self, id: ItemId) -> u32 {
        let next = self.ids.len() as u32 + 1;
        *self.ids.entry(id).or_insert(next)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct IdExpander {
    ids: HashMap<String, ItemId>,
}

impl IdExpander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity for a wire token. Blank tokens carry no identity.
    pub fn expand(&mut self, token: &str) -> Option<ItemId> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        Some(*self.ids.entry(token.to_string()).or_insert_with(ItemId::new))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
