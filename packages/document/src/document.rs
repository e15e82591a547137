//! # Document
//!
//! Owns the node arena, the invisible root and the identity registry.
//!
//! ```text
//! root (never addressable)
//!  ├── preset  [order 0]
//!  │    ├── variant   [order 0]
//!  │    └── reference [order 1] ──► preset id
//!  └── preset  [order 1]
//! ```
//!
//! A node's row and its order cell may disagree between renumbering passes;
//! [`Document::renumber`] reconciles both.
//!
//! Positions are handed out as [`Address`]es which are only valid until the
//! next structural mutation. Anything that has to outlive a mutation keeps a
//! [`NodeId`] (or a [`NodeKey`] across removal) and calls [`Document::locate`]
//! again.

use crate::arena::{Arena, NodeId};
use crate::error::{DocumentError, DocumentResult};
use crate::node::{DisplayStyle, Node, NodeKey, Snapshot};
use crate::observer::{DocumentEvent, DocumentObserver};
use crate::registry::{IdentityChange, IdentityRegistry};
use knecht_common::{icon_key, CellValue, Cells, Column, ItemId, ItemKind, NodeData};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an open document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A (row, parent) position, valid until the next structural mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub row: usize,
    pub parent: NodeId,
}

impl Address {
    pub fn new(row: usize, parent: NodeId) -> Self {
        Self { row, parent }
    }
}

/// Result of a full integrity pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub invalid_references: Vec<NodeId>,
    pub recursive: Vec<(NodeId, NodeId)>,
    pub duplicate_presets: Vec<ItemId>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.invalid_references.is_empty() && self.recursive.is_empty() && self.duplicate_presets.is_empty()
    }
}

/// Anything that can be materialized into the tree
trait Subtree {
    fn cells(&self) -> &Cells;
    fn key(&self) -> Option<NodeKey>;
    fn subtrees(&self) -> &[Self]
    where
        Self: Sized;
}

impl Subtree for NodeData {
    fn cells(&self) -> &Cells {
        &self.cells
    }

    fn key(&self) -> Option<NodeKey> {
        None
    }

    fn subtrees(&self) -> &[Self] {
        &self.children
    }
}

impl Subtree for Snapshot {
    fn cells(&self) -> &Cells {
        &self.cells
    }

    fn key(&self) -> Option<NodeKey> {
        Some(self.key)
    }

    fn subtrees(&self) -> &[Self] {
        &self.children
    }
}

#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    nodes: Arena<Node>,
    root: NodeId,
    keys: HashMap<NodeKey, NodeId>,
    next_key: u64,
    registry: IdentityRegistry,
    observers: Vec<Box<dyn DocumentObserver>>,
    silent: bool,
}

impl Document {
    pub fn new() -> Self {
        let mut nodes = Arena::new();
        let root_key = NodeKey::new(0);
        let root = nodes.insert(Node::new(root_key, Cells::default(), None));
        Self {
            id: DocumentId::next(),
            nodes,
            root,
            keys: HashMap::from([(root_key, root)]),
            next_key: 1,
            registry: IdentityRegistry::new(),
            observers: Vec::new(),
            silent: false,
        }
    }

    /// Build a document from detached top-level subtrees
    pub fn from_roots(roots: Vec<NodeData>) -> Self {
        let mut document = Self::new();
        document.load(roots);
        document
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    pub fn add_observer(&mut self, observer: Box<dyn DocumentObserver>) {
        self.observers.push(observer);
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Suppress notifications. Leaving silent mode emits one reset.
    pub fn set_silent(&mut self, silent: bool) {
        let was_silent = self.silent;
        self.silent = silent;
        if was_silent && !silent {
            self.emit(DocumentEvent::Reset);
        }
    }

    fn emit(&mut self, event: DocumentEvent) {
        if self.silent {
            return;
        }
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }

    // ------------------------------------------------------------------
    // Bulk load
    // ------------------------------------------------------------------

    /// Replace the whole tree without per-row notifications
    pub fn load(&mut self, roots: Vec<NodeData>) {
        let was_silent = self.silent;
        self.silent = true;
        self.reset_tree();
        let count = roots.len();
        self.insert_data(self.root, 0, roots);
        self.silent = was_silent;
        self.emit(DocumentEvent::Reset);
        info!(top_level = count, nodes = self.len(), "document loaded");
    }

    /// Remove every node below the root
    pub fn clear(&mut self) {
        let was_silent = self.silent;
        self.silent = true;
        self.reset_tree();
        self.silent = was_silent;
        self.emit(DocumentEvent::Reset);
    }

    fn reset_tree(&mut self) {
        let root_key = self.nodes.get(self.root).map(|n| n.key).unwrap_or(NodeKey::new(0));
        self.nodes.clear();
        self.root = self.nodes.insert(Node::new(root_key, Cells::default(), None));
        self.keys.clear();
        self.keys.insert(root_key, self.root);
        self.registry.clear();
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn cells(&self, id: NodeId) -> Option<&Cells> {
        self.nodes.get(id).map(|node| &node.cells)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    /// Number of nodes below the root
    pub fn len(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row_count(&self, parent: NodeId) -> usize {
        self.nodes.get(parent).map_or(0, |node| node.children.len())
    }

    pub fn child_at(&self, parent: NodeId, row: usize) -> Option<NodeId> {
        self.nodes.get(parent)?.children.get(row).copied()
    }

    pub fn children(&self, parent: NodeId) -> &[NodeId] {
        self.nodes.get(parent).map_or(&[], |node| node.children.as_slice())
    }

    pub fn top_level(&self) -> &[NodeId] {
        self.children(self.root)
    }

    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.parent
    }

    pub fn is_top_level(&self, node: NodeId) -> bool {
        self.parent_of(node) == Some(self.root)
    }

    /// The top-level ancestor of `node`, or `node` itself
    pub fn top_level_of(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            let parent = self.parent_of(current)?;
            if parent == self.root {
                return Some(current);
            }
            current = parent;
        }
    }

    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent_of(node);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent_of(parent);
        }
        false
    }

    /// Current address of a node
    pub fn locate(&self, node: NodeId) -> Option<Address> {
        let parent = self.parent_of(node)?;
        let row = self.children(parent).iter().position(|child| *child == node)?;
        Some(Address { row, parent })
    }

    pub fn resolve(&self, address: Address) -> Option<NodeId> {
        self.child_at(address.parent, address.row)
    }

    pub fn find_by_key(&self, key: NodeKey) -> Option<NodeId> {
        self.keys.get(&key).copied()
    }

    pub fn key_of(&self, node: NodeId) -> Option<NodeKey> {
        self.nodes.get(node).map(|n| n.key)
    }

    /// Pre-order list of `node` and everything below it
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            if let Some(entry) = self.nodes.get(next) {
                out.push(next);
                stack.extend(entry.children.iter().rev().copied());
            }
        }
        out
    }

    /// Children sorted by order, physical position breaking ties
    pub fn ordered_children(&self, parent: NodeId) -> Vec<NodeId> {
        let mut children = self.children(parent).to_vec();
        children.sort_by_key(|child| self.nodes.get(*child).map_or(0, |n| n.cells.order));
        children
    }

    /// First top-level node with the given name
    pub fn find_top_level(&self, name: &str) -> Option<NodeId> {
        self.top_level()
            .iter()
            .copied()
            .find(|node| self.nodes.get(*node).is_some_and(|n| n.cells.name == name))
    }

    // ------------------------------------------------------------------
    // Cells
    // ------------------------------------------------------------------

    pub fn data(&self, address: Address, column: Column) -> Option<CellValue> {
        let node = self.resolve(address)?;
        self.cells(node).map(|cells| cells.get(column))
    }

    pub fn set_data(&mut self, address: Address, column: Column, value: CellValue) -> DocumentResult<CellValue> {
        let node = self.resolve(address).ok_or(DocumentError::InvalidAddress {
            row: address.row,
            parent: address.parent,
        })?;
        self.set_cell(node, column, value)
    }

    /// Write one cell. Identity columns update the registry.
    pub fn set_cell(&mut self, node: NodeId, column: Column, value: CellValue) -> DocumentResult<CellValue> {
        if node == self.root {
            return Err(DocumentError::RootNotEditable);
        }
        let entry = self.nodes.get_mut(node).ok_or(DocumentError::NodeNotFound(node))?;
        let previous = entry.cells.set(column, value)?;
        let current = entry.cells.get(column);

        let (removed, added) = match column {
            Column::Id => (IdentityChange::PresetRemoved, IdentityChange::PresetAdded),
            Column::Reference => (IdentityChange::ReferenceRemoved, IdentityChange::ReferenceAdded),
            _ => {
                self.emit(DocumentEvent::DataChanged { node, column });
                return Ok(previous);
            }
        };
        if let Some(old) = previous.as_identity() {
            self.registry.on_identity_changed(old, node, removed);
        }
        if let Some(new) = current.as_identity() {
            self.registry.on_identity_changed(new, node, added);
        }

        self.emit(DocumentEvent::DataChanged { node, column });
        Ok(previous)
    }

    /// Turn a preset into a reference to its own id
    pub fn convert_to_reference(&mut self, node: NodeId) -> DocumentResult<bool> {
        let Some(id) = self.cells(node).and_then(|cells| cells.id) else {
            return Ok(false);
        };
        self.set_cell(node, Column::Id, CellValue::Identity(None))?;
        self.set_cell(node, Column::Reference, CellValue::Identity(Some(id)))?;
        Ok(true)
    }

    pub fn display_style(&self, node: NodeId) -> Option<DisplayStyle> {
        let entry = self.nodes.get(node)?;
        let cells = &entry.cells;
        let kind = cells.kind();
        let invalid = self.registry.is_invalid(node);
        let referenced = cells
            .id
            .is_some_and(|id| !self.registry.references_of(id).is_empty());

        let icon = match kind {
            ItemKind::Reference => cells
                .reference
                .and_then(|target| self.registry.preset_of(target))
                .and_then(|preset| self.nodes.get(preset))
                .and_then(|preset| icon_key(&preset.cells.item_type))
                .or(Some("preset_ref")),
            _ => icon_key(&cells.item_type),
        };

        Some(DisplayStyle {
            icon,
            italic: (kind == ItemKind::Reference && !invalid) || referenced,
            missing: invalid,
            recursive: self.registry.is_recursive(node),
        })
    }

    /// Nodes sharing an identity link with `node`: the preset and every
    /// reference to it, `node` itself excluded
    pub fn linked_nodes(&self, node: NodeId) -> Vec<NodeId> {
        let Some(cells) = self.cells(node) else {
            return Vec::new();
        };
        let target = cells.id.or(cells.reference);
        let Some(target) = target else {
            return Vec::new();
        };

        let mut linked: Vec<NodeId> = self.registry.preset_of(target).into_iter().collect();
        linked.extend(self.registry.references_of(target));
        linked.retain(|other| *other != node);
        linked.dedup();
        linked
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Insert `count` empty rows before `pos`
    pub fn insert_rows(&mut self, pos: usize, count: usize, parent: NodeId) -> bool {
        let rows = vec![NodeData::default(); count];
        self.insert_data(parent, pos, rows).is_some()
    }

    /// Insert detached subtrees before `pos`, minting fresh node keys
    pub fn insert_data(&mut self, parent: NodeId, pos: usize, items: Vec<NodeData>) -> Option<Vec<NodeId>> {
        self.insert_subtrees(parent, pos, &items)
    }

    /// Re-insert a snapshot, reusing its node keys
    pub fn insert_snapshot(&mut self, parent: NodeId, pos: usize, snapshot: &Snapshot) -> Option<NodeId> {
        self.insert_subtrees(parent, pos, std::slice::from_ref(snapshot))
            .and_then(|ids| ids.first().copied())
    }

    pub fn append_child(&mut self, parent: NodeId, data: NodeData) -> Option<NodeId> {
        let pos = self.row_count(parent);
        self.insert_data(parent, pos, vec![data])
            .and_then(|ids| ids.first().copied())
    }

    fn insert_subtrees<S: Subtree>(&mut self, parent: NodeId, pos: usize, items: &[S]) -> Option<Vec<NodeId>> {
        let Some(entry) = self.nodes.get(parent) else {
            debug!(?parent, "insert under missing parent");
            return None;
        };
        if pos > entry.children.len() {
            debug!(?parent, pos, rows = entry.children.len(), "insert position out of range");
            return None;
        }
        if items.is_empty() {
            return Some(Vec::new());
        }

        let first = pos;
        let last = pos + items.len() - 1;
        self.emit(DocumentEvent::RowsAboutToBeInserted { parent, first, last });

        let mut inserted = Vec::with_capacity(items.len());
        for (offset, item) in items.iter().enumerate() {
            let id = self.build(item, parent);
            if let Some(entry) = self.nodes.get_mut(parent) {
                entry.children.insert(pos + offset, id);
            }
            inserted.push(id);
        }

        self.emit(DocumentEvent::RowsInserted { parent, first, last });
        Some(inserted)
    }

    fn build<S: Subtree>(&mut self, source: &S, parent: NodeId) -> NodeId {
        let key = match source.key() {
            Some(key) => self.claim_key(key),
            None => self.allocate_key(),
        };
        let id = self.nodes.insert(Node::new(key, source.cells().clone(), Some(parent)));
        self.keys.insert(key, id);
        self.register_identities(id);

        for child in source.subtrees() {
            let child_id = self.build(child, id);
            if let Some(entry) = self.nodes.get_mut(id) {
                entry.children.push(child_id);
            }
        }
        id
    }

    fn allocate_key(&mut self) -> NodeKey {
        let key = NodeKey::new(self.next_key);
        self.next_key += 1;
        key
    }

    fn claim_key(&mut self, key: NodeKey) -> NodeKey {
        if self.keys.contains_key(&key) {
            warn!(%key, "node key already live, minting a new one");
            return self.allocate_key();
        }
        self.next_key = self.next_key.max(key.raw() + 1);
        key
    }

    fn register_identities(&mut self, node: NodeId) {
        let Some(cells) = self.cells(node) else { return };
        let (id, reference) = (cells.id, cells.reference);
        if let Some(id) = id {
            self.registry.on_identity_changed(id, node, IdentityChange::PresetAdded);
        }
        if let Some(reference) = reference {
            self.registry
                .on_identity_changed(reference, node, IdentityChange::ReferenceAdded);
        }
    }

    fn unregister_identities(&mut self, node: NodeId) {
        let Some(cells) = self.cells(node) else { return };
        let (id, reference) = (cells.id, cells.reference);
        if let Some(id) = id {
            self.registry.on_identity_changed(id, node, IdentityChange::PresetRemoved);
        }
        if let Some(reference) = reference {
            self.registry
                .on_identity_changed(reference, node, IdentityChange::ReferenceRemoved);
        }
    }

    /// Remove `count` rows starting at `pos`.
    ///
    /// Out-of-range requests change nothing and return false.
    pub fn remove_rows(&mut self, pos: usize, count: usize, parent: NodeId) -> bool {
        let Some(entry) = self.nodes.get(parent) else {
            return false;
        };
        let end = pos.saturating_add(count);
        if count == 0 || end > entry.children.len() {
            debug!(?parent, pos, count, rows = entry.children.len(), "remove out of range");
            return false;
        }

        let targets: Vec<NodeId> = entry.children[pos..end].to_vec();
        self.emit(DocumentEvent::RowsAboutToBeRemoved {
            parent,
            first: pos,
            last: end - 1,
        });

        let doomed: Vec<NodeId> = targets.iter().flat_map(|t| self.descendants(*t)).collect();
        for node in &doomed {
            self.unregister_identities(*node);
        }
        if let Some(entry) = self.nodes.get_mut(parent) {
            entry.children.drain(pos..end);
        }
        for node in doomed {
            if let Some(removed) = self.nodes.remove(node) {
                self.keys.remove(&removed.key);
            }
        }

        self.emit(DocumentEvent::RowsRemoved {
            parent,
            first: pos,
            last: end - 1,
        });
        true
    }

    /// Remove one node wherever it is, returning what was removed
    pub fn remove_node(&mut self, node: NodeId) -> Option<Snapshot> {
        let address = self.locate(node)?;
        let snapshot = self.snapshot(node)?;
        self.remove_rows(address.row, 1, address.parent).then_some(snapshot)
    }

    // ------------------------------------------------------------------
    // Copies
    // ------------------------------------------------------------------

    pub fn snapshot(&self, node: NodeId) -> Option<Snapshot> {
        let entry = self.nodes.get(node)?;
        Some(Snapshot {
            key: entry.key,
            cells: entry.cells.clone(),
            children: entry
                .children
                .iter()
                .filter_map(|child| self.snapshot(*child))
                .collect(),
        })
    }

    /// Turn detached data into a snapshot with freshly reserved keys
    pub fn prepare(&mut self, data: NodeData) -> Snapshot {
        let key = self.allocate_key();
        Snapshot {
            key,
            cells: data.cells,
            children: data.children.into_iter().map(|child| self.prepare(child)).collect(),
        }
    }

    /// Detached copy including identities
    pub fn to_data(&self, node: NodeId) -> Option<NodeData> {
        let entry = self.nodes.get(node)?;
        Some(NodeData {
            cells: entry.cells.clone(),
            children: entry
                .children
                .iter()
                .filter_map(|child| self.to_data(*child))
                .collect(),
        })
    }

    /// Detached copy without identities
    pub fn copy_node(&self, node: NodeId, deep: bool) -> Option<NodeData> {
        self.to_data(node).map(|data| data.copy(deep))
    }

    /// All top-level subtrees, in physical order
    pub fn top_level_data(&self) -> Vec<NodeData> {
        self.top_level()
            .iter()
            .filter_map(|node| self.to_data(*node))
            .collect()
    }

    // ------------------------------------------------------------------
    // Order
    // ------------------------------------------------------------------

    /// Rewrite the order cells of `parent`'s children to 0..n and move the
    /// children so that row and order agree again
    pub fn renumber(&mut self, parent: NodeId) -> bool {
        self.renumber_with(parent, None)
    }

    /// Renumber with `node` placed at logical position `slot`
    pub fn renumber_pinned(&mut self, parent: NodeId, node: NodeId, slot: usize) -> bool {
        self.renumber_with(parent, Some((node, slot)))
    }

    fn renumber_with(&mut self, parent: NodeId, pin: Option<(NodeId, usize)>) -> bool {
        if !self.nodes.contains(parent) {
            return false;
        }
        let mut ordered = self.ordered_children(parent);
        if let Some((node, slot)) = pin {
            if let Some(index) = ordered.iter().position(|child| *child == node) {
                ordered.remove(index);
                ordered.insert(slot.min(ordered.len()), node);
            }
        }

        for (order, child) in ordered.iter().enumerate() {
            let order = order as i32;
            let Some(entry) = self.nodes.get_mut(*child) else {
                continue;
            };
            if entry.cells.order != order {
                entry.cells.order = order;
                self.emit(DocumentEvent::DataChanged {
                    node: *child,
                    column: Column::Order,
                });
            }
        }

        let moved = self.children(parent) != ordered.as_slice();
        if moved {
            if let Some(entry) = self.nodes.get_mut(parent) {
                entry.children = ordered;
            }
            self.emit(DocumentEvent::LayoutChanged { parent });
        }
        true
    }

    /// Renumber every sibling group in the document
    pub fn renumber_all(&mut self) {
        for node in self.descendants(self.root) {
            if self.row_count(node) > 0 {
                self.renumber(node);
            }
        }
    }

    /// True when every sibling group holds orders 0..n
    pub fn orders_are_contiguous(&self) -> bool {
        self.descendants(self.root).into_iter().all(|node| {
            let mut orders: Vec<i32> = self
                .children(node)
                .iter()
                .filter_map(|child| self.nodes.get(*child).map(|n| n.cells.order))
                .collect();
            orders.sort_unstable();
            orders.iter().enumerate().all(|(i, order)| *order == i as i32)
        })
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    pub fn preset_of(&self, id: ItemId) -> Option<NodeId> {
        self.registry.preset_of(id)
    }

    pub fn references_of(&self, id: ItemId) -> Vec<NodeId> {
        self.registry.references_of(id)
    }

    pub fn validate_all_references(&mut self) -> Vec<NodeId> {
        self.registry.validate_all_references()
    }

    pub fn find_cycles(&self, preset: NodeId, depth_limit: usize) -> Option<(NodeId, NodeId)> {
        self.registry.find_cycles(&self.nodes, preset, depth_limit)
    }

    pub fn check_recursion(&mut self, depth_limit: usize) -> Vec<(NodeId, NodeId)> {
        self.registry.check_recursion(&self.nodes, depth_limit)
    }

    /// Validate references, look for cycles and collect duplicate ids
    pub fn refresh_integrity(&mut self, depth_limit: usize) -> IntegrityReport {
        let invalid_references = self.validate_all_references();
        let recursive = self.check_recursion(depth_limit);
        IntegrityReport {
            invalid_references,
            recursive,
            duplicate_presets: self.registry.duplicate_presets(),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::EventRecorder;

    fn sample() -> (Document, ItemId) {
        let p1 = Cells::preset("P1", "trim_setup");
        let u1 = p1.id.unwrap();
        let doc = Document::from_roots(vec![
            NodeData::new(p1).with_children(vec![Cells::variant(0, "Color", "red").into()]),
            NodeData::new(Cells::preset("P2", "package").with_order(1))
                .with_children(vec![Cells::reference("R", u1).into()]),
        ]);
        (doc, u1)
    }

    #[test]
    fn test_from_roots_registers_identities() {
        let (doc, u1) = sample();
        assert_eq!(doc.len(), 4);
        let p1 = doc.preset_of(u1).unwrap();
        assert_eq!(doc.cells(p1).unwrap().name, "P1");
        assert_eq!(doc.references_of(u1).len(), 1);
    }

    #[test]
    fn test_locate_and_resolve() {
        let (doc, _) = sample();
        let p2 = doc.child_at(doc.root(), 1).unwrap();
        let r = doc.child_at(p2, 0).unwrap();
        let address = doc.locate(r).unwrap();
        assert_eq!(address, Address::new(0, p2));
        assert_eq!(doc.resolve(address), Some(r));
        assert_eq!(doc.locate(doc.root()), None);
        assert_eq!(doc.top_level_of(r), Some(p2));
        assert!(doc.is_ancestor(p2, r));
    }

    #[test]
    fn test_remove_unregisters_whole_subtree() {
        let (mut doc, u1) = sample();
        let root = doc.root();
        let p2 = doc.child_at(root, 1).unwrap();
        let r = doc.child_at(p2, 0).unwrap();
        assert!(doc.remove_rows(1, 1, root));
        assert!(doc.references_of(u1).is_empty());
        assert!(!doc.contains(r));
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let (mut doc, _) = sample();
        let root = doc.root();
        assert!(!doc.remove_rows(2, 1, root));
        assert!(!doc.remove_rows(0, 3, root));
        assert!(!doc.remove_rows(0, 0, root));
        assert_eq!(doc.len(), 4);
    }

    #[test]
    fn test_insert_out_of_range_fails() {
        let (mut doc, _) = sample();
        let root = doc.root();
        assert!(!doc.insert_rows(5, 1, root));
        assert!(doc.insert_rows(2, 2, root));
        assert_eq!(doc.row_count(root), 4);
    }

    #[test]
    fn test_set_cell_routes_identity_changes() {
        let (mut doc, u1) = sample();
        let p2 = doc.child_at(doc.root(), 1).unwrap();
        let r = doc.child_at(p2, 0).unwrap();
        let fresh = ItemId::new();

        let previous = doc
            .set_cell(r, Column::Reference, CellValue::Identity(Some(fresh)))
            .unwrap();
        assert_eq!(previous, CellValue::Identity(Some(u1)));
        assert!(doc.references_of(u1).is_empty());
        assert_eq!(doc.references_of(fresh), vec![r]);

        doc.set_cell(p2, Column::Id, CellValue::Identity(None)).unwrap();
        assert_eq!(doc.registry().preset_count(), 1);
    }

    #[test]
    fn test_root_not_editable() {
        let (mut doc, _) = sample();
        let root = doc.root();
        assert_eq!(
            doc.set_cell(root, Column::Name, "x".into()),
            Err(DocumentError::RootNotEditable)
        );
    }

    #[test]
    fn test_set_data_rejects_stale_address() {
        let (mut doc, _) = sample();
        let address = Address::new(9, doc.root());
        assert!(matches!(
            doc.set_data(address, Column::Name, "x".into()),
            Err(DocumentError::InvalidAddress { row: 9, .. })
        ));
    }

    #[test]
    fn test_snapshot_reinsert_keeps_keys_and_identities() {
        let (mut doc, u1) = sample();
        let root = doc.root();
        let p1 = doc.preset_of(u1).unwrap();
        let key = doc.key_of(p1).unwrap();

        let snapshot = doc.remove_node(p1).unwrap();
        assert_eq!(doc.preset_of(u1), None);
        assert_eq!(doc.find_by_key(key), None);

        let restored = doc.insert_snapshot(root, 0, &snapshot).unwrap();
        assert_eq!(doc.find_by_key(key), Some(restored));
        assert_eq!(doc.preset_of(u1), Some(restored));
        assert_eq!(doc.to_data(restored).unwrap(), snapshot.to_data());
    }

    #[test]
    fn test_copy_node_strips_identity() {
        let (doc, u1) = sample();
        let p1 = doc.preset_of(u1).unwrap();
        let copy = doc.copy_node(p1, true).unwrap();
        assert_eq!(copy.cells.id, None);
        assert_eq!(copy.children.len(), 1);
    }

    #[test]
    fn test_convert_to_reference_in_tree() {
        let (mut doc, u1) = sample();
        let p1 = doc.preset_of(u1).unwrap();
        assert!(doc.convert_to_reference(p1).unwrap());
        assert_eq!(doc.preset_of(u1), None);
        assert_eq!(doc.references_of(u1).len(), 2);
        assert_eq!(doc.node(p1).unwrap().kind(), ItemKind::Reference);
    }

    #[test]
    fn test_renumber_orders_by_order_then_position() {
        let mut doc = Document::from_roots(vec![
            Cells::variant(5, "a", "").into(),
            Cells::variant(1, "b", "").into(),
            Cells::variant(1, "c", "").into(),
        ]);
        let root = doc.root();
        assert!(!doc.orders_are_contiguous());
        doc.renumber(root);
        let names: Vec<String> = doc
            .ordered_children(root)
            .iter()
            .map(|n| doc.cells(*n).unwrap().name.clone())
            .collect();
        assert_eq!(names, vec!["b", "c", "a"]);
        assert!(doc.orders_are_contiguous());
    }

    #[test]
    fn test_renumber_pinned() {
        let mut doc = Document::from_roots(vec![
            Cells::variant(0, "a", "").into(),
            Cells::variant(1, "b", "").into(),
            Cells::variant(2, "c", "").into(),
        ]);
        let root = doc.root();
        let a = doc.child_at(root, 0).unwrap();
        let c = doc.child_at(root, 2).unwrap();
        doc.renumber_pinned(root, c, 0);
        assert_eq!(doc.cells(c).unwrap().order, 0);
        assert_eq!(doc.cells(a).unwrap().order, 1);
        assert_eq!(doc.child_at(root, 0), Some(c));
    }

    #[test]
    fn test_observer_brackets_mutations() {
        let (mut doc, _) = sample();
        let recorder = EventRecorder::new();
        doc.add_observer(Box::new(recorder.clone()));
        let root = doc.root();

        doc.insert_rows(0, 2, root);
        doc.remove_rows(0, 1, root);
        assert_eq!(
            recorder.events(),
            vec![
                DocumentEvent::RowsAboutToBeInserted { parent: root, first: 0, last: 1 },
                DocumentEvent::RowsInserted { parent: root, first: 0, last: 1 },
                DocumentEvent::RowsAboutToBeRemoved { parent: root, first: 0, last: 0 },
                DocumentEvent::RowsRemoved { parent: root, first: 0, last: 0 },
            ]
        );
    }

    #[test]
    fn test_silent_load_emits_single_reset() {
        let (mut doc, _) = sample();
        let recorder = EventRecorder::new();
        doc.add_observer(Box::new(recorder.clone()));
        doc.load(vec![Cells::variant(0, "x", "y").into()]);
        assert_eq!(recorder.events(), vec![DocumentEvent::Reset]);
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.registry().preset_count(), 0);
    }

    #[test]
    fn test_display_style() {
        let (mut doc, u1) = sample();
        let p1 = doc.preset_of(u1).unwrap();
        let r = doc.references_of(u1)[0];

        let style = doc.display_style(r).unwrap();
        assert!(style.italic);
        assert_eq!(style.icon, Some("car"));
        assert!(doc.display_style(p1).unwrap().italic);

        doc.remove_node(p1);
        doc.validate_all_references();
        let style = doc.display_style(r).unwrap();
        assert!(style.missing);
        assert!(!style.italic);
        assert_eq!(style.icon, Some("preset_ref"));
    }

    #[test]
    fn test_linked_nodes() {
        let (mut doc, u1) = sample();
        let p1 = doc.preset_of(u1).unwrap();
        let r = doc.references_of(u1)[0];
        let extra = doc
            .append_child(doc.root(), Cells::reference("R2", u1).into())
            .unwrap();

        assert_eq!(doc.linked_nodes(p1).len(), 2);
        let mut from_ref = doc.linked_nodes(r);
        from_ref.sort();
        let mut expected = vec![p1, extra];
        expected.sort();
        assert_eq!(from_ref, expected);
    }
}
