use crate::arena::NodeId;
use knecht_common::{Cells, ItemId, ItemKind, NodeData};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Document-unique key of a node.
///
/// Unlike a [`NodeId`], a key survives removal and re-insertion through a
/// [`Snapshot`], which is what lets undo/redo find "the same node" again
/// after its arena slot was recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey(u64);

impl NodeKey {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k{}", self.0)
    }
}

/// A tree element living in the document arena
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) key: NodeKey,
    pub(crate) cells: Cells,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(key: NodeKey, cells: Cells, parent: Option<NodeId>) -> Self {
        Self {
            key,
            cells,
            parent,
            children: Vec::new(),
        }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn cells(&self) -> &Cells {
        &self.cells
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn kind(&self) -> ItemKind {
        self.cells.kind()
    }

    pub fn order(&self) -> i32 {
        self.cells.order
    }

    pub fn name(&self) -> &str {
        &self.cells.name
    }

    pub fn id(&self) -> Option<ItemId> {
        self.cells.id
    }

    pub fn reference(&self) -> Option<ItemId> {
        self.cells.reference
    }
}

/// Full copy of a subtree including node keys and identities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub key: NodeKey,
    pub cells: Cells,
    pub children: Vec<Snapshot>,
}

impl Snapshot {
    pub fn order(&self) -> i32 {
        self.cells.order
    }

    pub fn to_data(&self) -> NodeData {
        NodeData {
            cells: self.cells.clone(),
            children: self.children.iter().map(Snapshot::to_data).collect(),
        }
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Snapshot::count).sum::<usize>()
    }
}

/// Derived presentation attributes of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayStyle {
    pub icon: Option<&'static str>,
    /// Valid references and presets that something points at
    pub italic: bool,
    /// Reference flagged invalid by the last validation pass
    pub missing: bool,
    /// Part of a reference cycle found by the last integrity check
    pub recursive: bool,
}
