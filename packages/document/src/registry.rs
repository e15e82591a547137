//! # Identity Registry
//!
//! Lookup tables layered over the tree:
//!
//! ```text
//! presets:    ItemId -> [NodeId]        one entry expected, more is an error
//! references: ItemId -> {NodeId, ...}   every node pointing at the id
//! invalid:    {NodeId, ...}             references flagged by validation
//! recursive:  [(preset, child)]         cycles found by the last check
//! ```
//!
//! The document calls [`IdentityRegistry::on_identity_changed`] from every
//! write to an `id` or `reference` cell, including inserts and removals
//! replayed by undo, so the tables always mirror the tree.

use crate::arena::{Arena, NodeId};
use crate::node::Node;
use knecht_common::ItemId;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Default depth bound of [`IdentityRegistry::find_cycles`]
pub const DEFAULT_CYCLE_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityChange {
    PresetAdded,
    PresetRemoved,
    ReferenceAdded,
    ReferenceRemoved,
    ReferenceInvalidated,
}

#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    presets: HashMap<ItemId, Vec<NodeId>>,
    references: HashMap<ItemId, BTreeSet<NodeId>>,
    invalid: BTreeSet<NodeId>,
    recursive: Vec<(NodeId, NodeId)>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_identity_changed(&mut self, id: ItemId, node: NodeId, change: IdentityChange) {
        match change {
            IdentityChange::PresetAdded => {
                let entries = self.presets.entry(id).or_default();
                if !entries.contains(&node) {
                    entries.push(node);
                }
                if entries.len() > 1 {
                    warn!(%id, count = entries.len(), "duplicate preset id registered");
                }
                if let Some(references) = self.references.get(&id) {
                    for reference in references {
                        self.invalid.remove(reference);
                    }
                }
            }
            IdentityChange::PresetRemoved => {
                if let Some(entries) = self.presets.get_mut(&id) {
                    entries.retain(|entry| *entry != node);
                    if entries.is_empty() {
                        self.presets.remove(&id);
                    }
                }
                self.recursive.retain(|(preset, _)| *preset != node);
            }
            IdentityChange::ReferenceAdded => {
                self.references.entry(id).or_default().insert(node);
            }
            IdentityChange::ReferenceRemoved => {
                if let Some(entries) = self.references.get_mut(&id) {
                    entries.remove(&node);
                    if entries.is_empty() {
                        self.references.remove(&id);
                    }
                }
                self.invalid.remove(&node);
                self.recursive.retain(|(_, child)| *child != node);
            }
            IdentityChange::ReferenceInvalidated => {
                debug!(%id, ?node, "reference invalidated");
                self.invalid.insert(node);
            }
        }
    }

    /// The preset registered for `id`
    pub fn preset_of(&self, id: ItemId) -> Option<NodeId> {
        self.presets.get(&id).and_then(|entries| entries.first().copied())
    }

    pub fn contains_preset(&self, id: ItemId) -> bool {
        self.preset_of(id).is_some()
    }

    /// Every node whose reference cell holds `id`
    pub fn references_of(&self, id: ItemId) -> Vec<NodeId> {
        self.references
            .get(&id)
            .map(|entries| entries.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn preset_count(&self) -> usize {
        self.presets.len()
    }

    pub fn reference_count(&self) -> usize {
        self.references.values().map(BTreeSet::len).sum()
    }

    pub fn preset_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.presets.keys().copied()
    }

    /// Ids claimed by more than one preset
    pub fn duplicate_presets(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self
            .presets
            .iter()
            .filter(|(_, entries)| entries.len() > 1)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    pub fn is_invalid(&self, node: NodeId) -> bool {
        self.invalid.contains(&node)
    }

    pub fn invalid_references(&self) -> Vec<NodeId> {
        self.invalid.iter().copied().collect()
    }

    pub fn is_recursive(&self, node: NodeId) -> bool {
        self.recursive
            .iter()
            .any(|(preset, child)| *preset == node || *child == node)
    }

    pub fn recursive_items(&self) -> &[(NodeId, NodeId)] {
        &self.recursive
    }

    /// Flag every reference whose target has no preset.
    ///
    /// Flags are rebuilt from scratch; invalid references stay in the tree.
    pub fn validate_all_references(&mut self) -> Vec<NodeId> {
        let dangling: Vec<(ItemId, NodeId)> = self
            .references
            .iter()
            .filter(|(id, _)| !self.presets.contains_key(*id))
            .flat_map(|(id, nodes)| nodes.iter().map(move |node| (*id, *node)))
            .collect();

        self.invalid.clear();
        for (id, node) in dangling {
            self.on_identity_changed(id, node, IdentityChange::ReferenceInvalidated);
        }

        if !self.invalid.is_empty() {
            warn!(count = self.invalid.len(), "found invalid references");
        }
        self.invalid_references()
    }

    /// Depth-bounded search for a reference chain leading back to `start`.
    ///
    /// Returns the preset whose child closes the cycle and that child.
    /// Chains longer than `depth_limit` are not followed.
    pub(crate) fn find_cycles(
        &self,
        nodes: &Arena<Node>,
        start: NodeId,
        depth_limit: usize,
    ) -> Option<(NodeId, NodeId)> {
        let start_id = nodes.get(start)?.cells.id?;
        self.search_cycle(nodes, start, start_id, 0, depth_limit)
    }

    fn search_cycle(
        &self,
        nodes: &Arena<Node>,
        preset: NodeId,
        start_id: ItemId,
        depth: usize,
        depth_limit: usize,
    ) -> Option<(NodeId, NodeId)> {
        if depth > depth_limit {
            return None;
        }

        for child in &nodes.get(preset)?.children {
            let Some(target) = nodes.get(*child).and_then(|node| node.cells.reference) else {
                continue;
            };
            if target == start_id {
                return Some((preset, *child));
            }
            if let Some(next) = self.preset_of(target) {
                if let Some(found) = self.search_cycle(nodes, next, start_id, depth + 1, depth_limit) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Run [`Self::find_cycles`] from every preset and remember the hits
    pub(crate) fn check_recursion(&mut self, nodes: &Arena<Node>, depth_limit: usize) -> Vec<(NodeId, NodeId)> {
        let mut starts: Vec<NodeId> = self
            .presets
            .values()
            .filter_map(|entries| entries.first().copied())
            .collect();
        starts.sort();

        let mut found = Vec::new();
        for start in starts {
            if let Some(hit) = self.find_cycles(nodes, start, depth_limit) {
                warn!(preset = ?hit.0, child = ?hit.1, "recursive reference");
                if !found.contains(&hit) {
                    found.push(hit);
                }
            }
        }
        self.recursive = found.clone();
        found
    }

    pub fn clear(&mut self) {
        self.presets.clear();
        self.references.clear();
        self.invalid.clear();
        self.recursive.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles(count: usize) -> Vec<NodeId> {
        let mut arena = Arena::new();
        (0..count).map(|i| arena.insert(i)).collect()
    }

    #[test]
    fn test_preset_lookup() {
        let nodes = handles(2);
        let mut registry = IdentityRegistry::new();
        let id = ItemId::new();
        registry.on_identity_changed(id, nodes[0], IdentityChange::PresetAdded);
        assert_eq!(registry.preset_of(id), Some(nodes[0]));
        registry.on_identity_changed(id, nodes[0], IdentityChange::PresetRemoved);
        assert_eq!(registry.preset_of(id), None);
        assert_eq!(registry.preset_count(), 0);
    }

    #[test]
    fn test_duplicate_preset_keeps_first() {
        let nodes = handles(2);
        let mut registry = IdentityRegistry::new();
        let id = ItemId::new();
        registry.on_identity_changed(id, nodes[0], IdentityChange::PresetAdded);
        registry.on_identity_changed(id, nodes[1], IdentityChange::PresetAdded);
        assert_eq!(registry.preset_of(id), Some(nodes[0]));
        assert_eq!(registry.duplicate_presets(), vec![id]);

        registry.on_identity_changed(id, nodes[0], IdentityChange::PresetRemoved);
        assert_eq!(registry.preset_of(id), Some(nodes[1]));
        assert!(registry.duplicate_presets().is_empty());
    }

    #[test]
    fn test_validate_flags_dangling_references() {
        let nodes = handles(3);
        let mut registry = IdentityRegistry::new();
        let live = ItemId::new();
        let gone = ItemId::new();
        registry.on_identity_changed(live, nodes[0], IdentityChange::PresetAdded);
        registry.on_identity_changed(live, nodes[1], IdentityChange::ReferenceAdded);
        registry.on_identity_changed(gone, nodes[2], IdentityChange::ReferenceAdded);

        assert_eq!(registry.validate_all_references(), vec![nodes[2]]);
        assert!(registry.is_invalid(nodes[2]));
        assert_eq!(registry.references_of(gone), vec![nodes[2]]);
    }

    #[test]
    fn test_preset_arrival_clears_flags() {
        let nodes = handles(2);
        let mut registry = IdentityRegistry::new();
        let id = ItemId::new();
        registry.on_identity_changed(id, nodes[1], IdentityChange::ReferenceAdded);
        registry.validate_all_references();
        assert!(registry.is_invalid(nodes[1]));

        registry.on_identity_changed(id, nodes[0], IdentityChange::PresetAdded);
        assert!(!registry.is_invalid(nodes[1]));
    }

    #[test]
    fn test_reference_removal_clears_flag() {
        let nodes = handles(1);
        let mut registry = IdentityRegistry::new();
        let id = ItemId::new();
        registry.on_identity_changed(id, nodes[0], IdentityChange::ReferenceAdded);
        registry.validate_all_references();
        registry.on_identity_changed(id, nodes[0], IdentityChange::ReferenceRemoved);
        assert!(registry.invalid_references().is_empty());
        assert_eq!(registry.reference_count(), 0);
    }
}
