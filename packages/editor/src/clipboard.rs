//! # Clipboard
//!
//! Detached copies of selected nodes together with every preset they reach
//! through references. The referenced presets are gathered at copy time so
//! a paste into another document never has to read the source again.

use knecht_common::{ItemId, ItemKind, NodeData};
use knecht_document::{Document, DocumentId, NodeId};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardItem {
    /// Subtree including identities
    pub data: NodeData,
    /// Copied from the top level of the source document
    pub top_level: bool,
}

#[derive(Debug, Clone)]
pub struct Clipboard {
    origin: DocumentId,
    items: Vec<ClipboardItem>,
    referenced: Vec<NodeData>,
}

impl Clipboard {
    /// Copy `nodes` out of `document`.
    ///
    /// Render settings are skipped, as are nodes whose ancestor is part of
    /// the selection. Referenced presets are followed for at most
    /// `search_limit + 1` rounds.
    pub fn copy(document: &Document, nodes: &[NodeId], search_limit: usize) -> Self {
        let items: Vec<ClipboardItem> = nodes
            .iter()
            .copied()
            .filter(|node| {
                !nodes
                    .iter()
                    .any(|other| *other != *node && document.is_ancestor(*other, *node))
            })
            .filter(|node| {
                document
                    .cells(*node)
                    .is_some_and(|cells| cells.kind() != ItemKind::RenderSetting)
            })
            .filter_map(|node| {
                Some(ClipboardItem {
                    data: document.to_data(node)?,
                    top_level: document.is_top_level(node),
                })
            })
            .collect();

        let referenced = collect_referenced(document, &items, search_limit);
        debug!(items = items.len(), referenced = referenced.len(), "copied to clipboard");

        Self {
            origin: document.id(),
            items,
            referenced,
        }
    }

    pub fn origin(&self) -> DocumentId {
        self.origin
    }

    pub fn items(&self) -> &[ClipboardItem] {
        &self.items
    }

    /// Presets reachable from the copied items, in discovery order
    pub fn referenced(&self) -> &[NodeData] {
        &self.referenced
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

fn collect_referenced(document: &Document, items: &[ClipboardItem], search_limit: usize) -> Vec<NodeData> {
    let mut seen: HashSet<ItemId> = HashSet::new();
    let mut referenced = Vec::new();
    let mut frontier: Vec<NodeData> = items.iter().map(|item| item.data.clone()).collect();

    for _ in 0..=search_limit {
        let mut found = Vec::new();
        for data in &frontier {
            for target in data.walk().filter_map(|node| node.cells.reference) {
                if !seen.insert(target) {
                    continue;
                }
                if let Some(preset) = document.preset_of(target).and_then(|node| document.to_data(node)) {
                    found.push(preset);
                }
            }
        }
        if found.is_empty() {
            break;
        }

        referenced.extend(found.iter().cloned());
        frontier = found;
    }
    referenced
}
