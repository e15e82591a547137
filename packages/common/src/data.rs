//! Detached node subtrees.
//!
//! A [`NodeData`] is a plain owned tree of cell rows. The codec produces and
//! consumes it, the clipboard carries it between documents, and templates
//! build it. It is only attached to a document by inserting it.

use crate::id::ItemId;
use crate::kind::ItemKind;
use crate::schema::Cells;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    pub cells: Cells,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeData>,
}

impl NodeData {
    pub fn new(cells: Cells) -> Self {
        Self {
            cells,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<NodeData>) -> Self {
        self.children = children;
        self
    }

    pub fn kind(&self) -> ItemKind {
        self.cells.kind()
    }

    pub fn append_child(&mut self, child: NodeData) {
        self.children.push(child);
    }

    /// Insert `items` before `pos`. Fails when `pos` is past the end.
    pub fn insert_children(&mut self, pos: usize, items: Vec<NodeData>) -> bool {
        if pos > self.children.len() {
            return false;
        }
        self.children.splice(pos..pos, items);
        true
    }

    /// Detach `count` children starting at `pos`
    pub fn remove_children(&mut self, pos: usize, count: usize) -> Option<Vec<NodeData>> {
        let end = pos.checked_add(count)?;
        if end > self.children.len() {
            return None;
        }
        Some(self.children.drain(pos..end).collect())
    }

    /// Copy without identities. Shallow copies drop the children.
    pub fn copy(&self, deep: bool) -> NodeData {
        let mut cells = self.cells.clone();
        cells.id = None;
        cells.reference = None;
        NodeData {
            cells,
            children: if deep {
                self.children.iter().map(|child| child.copy(true)).collect()
            } else {
                Vec::new()
            },
        }
    }

    /// Demote a preset into a reference to its own id.
    ///
    /// Returns false when there is no id to point at.
    pub fn convert_to_reference(&mut self) -> bool {
        match self.cells.id.take() {
            Some(id) => {
                self.cells.reference = Some(id);
                true
            }
            None => false,
        }
    }

    /// Rewrite ids and references found in `map` across the whole subtree
    pub fn remap_identities(&mut self, map: &HashMap<ItemId, ItemId>) {
        if let Some(id) = self.cells.id.and_then(|id| map.get(&id)) {
            self.cells.id = Some(*id);
        }
        if let Some(target) = self.cells.reference.and_then(|id| map.get(&id)) {
            self.cells.reference = Some(*target);
        }
        for child in &mut self.children {
            child.remap_identities(map);
        }
    }

    /// Pre-order walk over this node and all descendants
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Number of nodes in the subtree, this one included
    pub fn count(&self) -> usize {
        self.walk().count()
    }

    /// Children sorted by their order cell, physical position breaking ties
    pub fn ordered_children(&self) -> Vec<&NodeData> {
        let mut children: Vec<&NodeData> = self.children.iter().collect();
        children.sort_by_key(|child| child.cells.order);
        children
    }
}

impl From<Cells> for NodeData {
    fn from(cells: Cells) -> Self {
        NodeData::new(cells)
    }
}

pub struct Walk<'a> {
    stack: Vec<&'a NodeData>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a NodeData;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
