//! # Paste Planning
//!
//! Turns clipboard content into insert batches for the current document.
//!
//! ```text
//! destination   current node
//! TopLevel      none, or a top-level node that is not an empty preset
//! EmptyItem     a top-level preset without children (becomes the parent)
//! ItemLevel     anything below the top level (paste between its siblings)
//! ```
//!
//! Pasting into another document brings along every preset the copied
//! items reference that the destination lacks, all with fresh ids. A
//! referenced preset the destination already holds under the same name and
//! type is reused instead, so pasting twice does not duplicate it.

use crate::clipboard::{Clipboard, ClipboardItem};
use crate::rename::next_name;
use knecht_common::{ItemId, ItemKind, NodeData};
use knecht_document::{Document, NodeId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteDestination {
    TopLevel,
    ItemLevel,
    EmptyItem,
}

/// Detached items to insert under `parent`, numbered from `start`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertBatch {
    pub parent: NodeId,
    pub start: i32,
    pub items: Vec<NodeData>,
}

#[derive(Debug, Clone)]
pub struct PastePlan {
    pub destination: PasteDestination,
    pub different_origin: bool,
    /// Main content first, collected presets after
    pub batches: Vec<InsertBatch>,
}

impl PastePlan {
    pub fn is_empty(&self) -> bool {
        self.batches.iter().all(|batch| batch.items.is_empty())
    }

    pub fn item_count(&self) -> usize {
        self.batches.iter().map(|batch| batch.items.len()).sum()
    }
}

pub fn determine_destination(document: &Document, current: Option<NodeId>) -> PasteDestination {
    let Some(current) = current.filter(|node| document.contains(*node)) else {
        return PasteDestination::TopLevel;
    };
    if !document.is_top_level(current) {
        return PasteDestination::ItemLevel;
    }

    let empty_preset = document.cells(current).is_some_and(|cells| {
        matches!(cells.kind(), ItemKind::Preset | ItemKind::RenderPreset)
    }) && document.row_count(current) == 0;

    if empty_preset {
        PasteDestination::EmptyItem
    } else {
        PasteDestination::TopLevel
    }
}

/// Order of `node`'s top-level ancestor, where top-level inserts start
pub(crate) fn top_level_start(document: &Document, current: Option<NodeId>) -> i32 {
    current
        .and_then(|node| document.top_level_of(node))
        .and_then(|node| document.cells(node))
        .map_or(0, |cells| cells.order.max(0))
}

pub fn plan_paste(document: &Document, clipboard: &Clipboard, current: Option<NodeId>) -> PastePlan {
    let destination = determine_destination(document, current);
    let different_origin = clipboard.origin() != document.id();

    let mut referenced: Vec<NodeData> = Vec::new();
    let mut reused: HashMap<ItemId, ItemId> = HashMap::new();
    if different_origin {
        let mut seen = HashSet::new();
        for preset in clipboard.referenced() {
            if let Some(id) = preset.cells.id {
                if document.registry().contains_preset(id) || !seen.insert(id) {
                    continue;
                }
                match existing_match(document, preset) {
                    Some(existing) => {
                        reused.insert(id, existing);
                    }
                    None => referenced.push(preset.clone()),
                }
            }
        }
    }

    let batches = match destination {
        PasteDestination::TopLevel => {
            let start = top_level_start(document, current);
            let items = top_level_items(document, clipboard.items(), referenced, &reused, different_origin);
            vec![InsertBatch {
                parent: document.root(),
                start,
                items: numbered(items, start),
            }]
        }
        PasteDestination::ItemLevel | PasteDestination::EmptyItem => {
            item_level_batches(
                document,
                clipboard.items(),
                referenced,
                reused,
                current,
                destination,
                different_origin,
            )
        }
    };

    let plan = PastePlan {
        destination,
        different_origin,
        batches: batches.into_iter().filter(|batch| !batch.items.is_empty()).collect(),
    };
    debug!(?destination, different_origin, items = plan.item_count(), "paste planned");
    plan
}

fn top_level_items(
    document: &Document,
    copied: &[ClipboardItem],
    mut referenced: Vec<NodeData>,
    reused: &HashMap<ItemId, ItemId>,
    different_origin: bool,
) -> Vec<NodeData> {
    let referenced_ids: HashSet<ItemId> = referenced.iter().filter_map(|data| data.cells.id).collect();
    let mut items: Vec<NodeData> = copied
        .iter()
        .filter(|item| !item.data.cells.id.is_some_and(|id| referenced_ids.contains(&id)))
        .filter(|item| item.data.kind() != ItemKind::Reference)
        .map(|item| item.data.clone())
        .collect();

    if different_origin {
        let mut map = reused.clone();
        map.extend(fresh_ids(referenced.iter().chain(items.iter())));
        for data in referenced.iter_mut().chain(items.iter_mut()) {
            data.remap_identities(&map);
        }
        for item in referenced.iter_mut().chain(items.iter_mut()) {
            if document.find_top_level(&item.cells.name).is_some() {
                item.cells.name = next_name(&item.cells.name);
            }
        }
    } else {
        for item in &mut items {
            if item.cells.id.is_some_and(|id| document.registry().contains_preset(id)) {
                item.cells.id = Some(ItemId::new());
                item.cells.name = next_name(&item.cells.name);
            }
        }
    }

    let mut all = referenced;
    all.extend(items);
    all.sort_by_key(|data| data.cells.order);
    all
}

fn item_level_batches(
    document: &Document,
    copied: &[ClipboardItem],
    mut collected: Vec<NodeData>,
    mut reused: HashMap<ItemId, ItemId>,
    current: Option<NodeId>,
    destination: PasteDestination,
    different_origin: bool,
) -> Vec<InsertBatch> {
    let Some(current) = current else {
        return Vec::new();
    };
    let (parent, start) = match destination {
        PasteDestination::EmptyItem => (current, 0),
        _ => match (document.parent_of(current), document.cells(current)) {
            (Some(parent), Some(cells)) => (parent, cells.order.max(0)),
            _ => return Vec::new(),
        },
    };

    let mut top: Vec<NodeData> = Vec::new();
    let mut nested: Vec<NodeData> = Vec::new();
    for item in copied {
        let mut converted = NodeData::new(item.data.cells.clone());
        if item.top_level {
            if item.data.kind() != ItemKind::Variant {
                if different_origin && item.data.kind().is_preset_like() {
                    let id = item.data.cells.id;
                    let known = collected.iter().any(|data| data.cells.id == id);
                    if let Some(id) = id.filter(|id| !known && !document.registry().contains_preset(*id)) {
                        match existing_match(document, &item.data) {
                            Some(existing) => {
                                reused.insert(id, existing);
                            }
                            None => collected.push(item.data.clone()),
                        }
                    }
                }
                converted.convert_to_reference();
            }
            top.push(converted);
        } else {
            nested.push(converted);
        }
    }
    top.sort_by_key(|data| data.cells.order);
    nested.sort_by_key(|data| data.cells.order);
    top.extend(nested);
    let mut items = top;

    if !different_origin {
        return vec![InsertBatch {
            parent,
            start,
            items: numbered(items, start),
        }];
    }

    let mut map = reused;
    map.extend(fresh_ids(collected.iter()));
    for data in collected.iter_mut().chain(items.iter_mut()) {
        data.remap_identities(&map);
    }
    for data in &mut collected {
        if document.find_top_level(&data.cells.name).is_some() {
            data.cells.name = next_name(&data.cells.name);
        }
    }
    collected.sort_by_key(|data| data.cells.order);

    let top_start = top_level_start(document, Some(current));
    vec![
        InsertBatch {
            parent,
            start,
            items: numbered(items, start),
        },
        InsertBatch {
            parent: document.root(),
            start: top_start,
            items: numbered(collected, top_start),
        },
    ]
}

/// Id of a top-level preset in `document` with the same name and type as `preset`
fn existing_match(document: &Document, preset: &NodeData) -> Option<ItemId> {
    document
        .top_level()
        .iter()
        .filter_map(|node| document.cells(*node))
        .find(|cells| cells.name == preset.cells.name && cells.item_type == preset.cells.item_type)
        .and_then(|cells| cells.id)
}

/// A fresh identity for every id declared inside `items`
fn fresh_ids<'a>(items: impl Iterator<Item = &'a NodeData>) -> HashMap<ItemId, ItemId> {
    items
        .flat_map(NodeData::walk)
        .filter_map(|node| node.cells.id)
        .map(|id| (id, ItemId::new()))
        .collect()
}

fn numbered(items: Vec<NodeData>, start: i32) -> Vec<NodeData> {
    items
        .into_iter()
        .enumerate()
        .map(|(offset, mut item)| {
            item.cells.order = start + offset as i32;
            item
        })
        .collect()
}
