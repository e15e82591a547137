//! # Variant Resolution
//!
//! Flattens a preset into the ordered variant list sent to the renderer.
//!
//! ```text
//! variant       -> (name, value, type)
//! reference     -> resolve the target preset (depth bounded)
//! camera item   -> camera commands
//! output item   -> output path, no variant
//! plmxml item   -> PlmXml path, no variant
//! ```
//!
//! A reference whose target is missing contributes nothing and records a
//! warning. Resolution never aborts.

use crate::templates::camera_command;
use knecht_common::{ItemId, ItemKind};
use knecht_document::{Document, NodeId};
use serde::Serialize;
use tracing::{debug, warn};

/// Type column value of emitted camera commands
pub const CAMERA_COMMAND_TYPE: &str = "command";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub name: String,
    pub value: String,
    pub item_type: String,
}

impl Variant {
    pub fn new(name: impl Into<String>, value: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            item_type: item_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResolveWarning {
    /// A reference points at an id no preset carries
    MissingReference { name: String, target: ItemId },
    /// Expansion stopped at the depth bound
    RecursionLimit { preset: String, depth: usize },
    /// A camera value has fewer fields than its command needs
    CameraValueMismatch { tag: String, value: String },
    /// Reset collection was requested but the document has no reset preset
    ResetMissing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariantList {
    pub preset_name: Option<String>,
    pub preset_id: Option<ItemId>,
    pub variants: Vec<Variant>,
    pub output_path: Option<String>,
    pub plm_xml_path: Option<String>,
    pub warnings: Vec<ResolveWarning>,
}

impl VariantList {
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// (name, value) pairs in resolution order
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.variants
            .iter()
            .map(|variant| (variant.name.as_str(), variant.value.as_str()))
            .collect()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    fn push(&mut self, name: &str, value: &str, item_type: &str) {
        self.variants.push(Variant::new(name, value, item_type));
    }
}

#[derive(Debug, Clone)]
pub struct VariantCollector<'a> {
    document: &'a Document,
    recursion_limit: usize,
    collect_reset: bool,
}

impl<'a> VariantCollector<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            recursion_limit: 3,
            collect_reset: false,
        }
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_reset(mut self, collect_reset: bool) -> Self {
        self.collect_reset = collect_reset;
        self
    }

    /// Resolve the first top-level node called `name`
    pub fn collect_by_name(&self, name: &str) -> Option<VariantList> {
        self.document.find_top_level(name).map(|node| self.collect(node))
    }

    pub fn collect(&self, node: NodeId) -> VariantList {
        self.collect_with(node, self.collect_reset)
    }

    pub fn collect_with(&self, node: NodeId, collect_reset: bool) -> VariantList {
        let mut variants = VariantList::default();
        let Some(mut cells) = self.document.cells(node) else {
            return variants;
        };
        let mut current = node;

        let reset_found = if collect_reset && cells.kind() != ItemKind::CameraItem {
            self.collect_reset_presets(&mut variants)
        } else {
            false
        };

        if cells.kind() == ItemKind::Reference {
            let target = cells.reference;
            match target.and_then(|id| self.document.preset_of(id)) {
                Some(preset) => {
                    current = preset;
                    cells = match self.document.cells(preset) {
                        Some(cells) => cells,
                        None => return variants,
                    };
                }
                None => {
                    if let Some(target) = target {
                        self.missing(&mut variants, &cells.name, target);
                    }
                    return variants;
                }
            }
        }

        match cells.kind() {
            ItemKind::Variant | ItemKind::OutputItem => {
                self.add_variant(current, &mut variants);
                return variants;
            }
            _ => {}
        }

        variants.preset_name = Some(cells.name.clone());
        variants.preset_id = cells.id;
        self.collect_preset(current, &mut variants, 0);

        if collect_reset && !reset_found && variants.plm_xml_path.is_none() {
            warn!(preset = %cells.name, "no reset preset found");
            variants.warnings.push(ResolveWarning::ResetMissing);
        }
        variants
    }

    fn collect_reset_presets(&self, variants: &mut VariantList) -> bool {
        let mut resets: Vec<NodeId> = self
            .document
            .registry()
            .preset_ids()
            .filter_map(|id| self.document.preset_of(id))
            .filter(|node| {
                self.document
                    .cells(*node)
                    .is_some_and(|cells| cells.item_type == "reset")
            })
            .collect();
        if resets.is_empty() {
            return false;
        }

        // registry order is unspecified, keep document order
        resets.sort_by_key(|node| self.document_position(*node));
        for reset in resets {
            self.collect_preset(reset, variants, 0);
        }
        true
    }

    fn document_position(&self, node: NodeId) -> Vec<i32> {
        let mut path = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.document.root() {
                break;
            }
            path.push(self.document.cells(id).map_or(0, |cells| cells.order));
            current = self.document.parent_of(id);
        }
        path.reverse();
        path
    }

    fn collect_preset(&self, preset: NodeId, variants: &mut VariantList, depth: usize) {
        let Some(cells) = self.document.cells(preset) else {
            return;
        };
        if depth > self.recursion_limit {
            warn!(preset = %cells.name, depth, "recursion limit reached while collecting references");
            variants.warnings.push(ResolveWarning::RecursionLimit {
                preset: cells.name.clone(),
                depth,
            });
            return;
        }

        if cells.kind() == ItemKind::CameraItem {
            self.add_camera_commands(preset, variants);
            return;
        }

        for child in self.document.ordered_children(preset) {
            let Some(child_cells) = self.document.cells(child) else {
                continue;
            };
            if child_cells.kind() != ItemKind::Reference {
                self.add_variant(child, variants);
                continue;
            }

            let target = child_cells.reference;
            let Some(referenced) = target.and_then(|id| self.document.preset_of(id)) else {
                if let Some(target) = target {
                    self.missing(variants, &child_cells.name, target);
                }
                continue;
            };

            match self.document.cells(referenced).map(|cells| cells.kind()) {
                Some(ItemKind::OutputItem | ItemKind::PlmXmlItem) => self.add_variant(referenced, variants),
                Some(ItemKind::CameraItem) => self.add_camera_commands(referenced, variants),
                Some(_) => self.collect_preset(referenced, variants, depth + 1),
                None => {}
            }
        }
    }

    fn add_variant(&self, node: NodeId, variants: &mut VariantList) {
        let Some(cells) = self.document.cells(node) else {
            return;
        };
        match cells.kind() {
            ItemKind::Variant => variants.push(&cells.name, &cells.value, &cells.item_type),
            ItemKind::OutputItem => {
                debug!(path = %cells.value, "collected output path");
                variants.output_path = Some(cells.value.clone());
            }
            ItemKind::PlmXmlItem => {
                debug!(path = %cells.value, "collected PlmXml path");
                variants.plm_xml_path = Some(cells.value.clone());
            }
            _ => {}
        }
    }

    fn add_camera_commands(&self, camera: NodeId, variants: &mut VariantList) {
        for child in self.document.children(camera) {
            let Some(cells) = self.document.cells(*child) else {
                continue;
            };
            let Some(template) = camera_command(&cells.name) else {
                continue;
            };

            let value = cells.value.replace(' ', "");
            let command = match format_camera_command(template, &value) {
                Some(command) => command,
                None => {
                    warn!(tag = %cells.name, value = %value, "camera value does not match command");
                    variants.warnings.push(ResolveWarning::CameraValueMismatch {
                        tag: cells.name.clone(),
                        value: value.clone(),
                    });
                    template.to_string()
                }
            };
            debug!(tag = %cells.name, command = %command, "collected camera command");
            variants.push(&cells.name, &command, CAMERA_COMMAND_TYPE);
        }
    }

    fn missing(&self, variants: &mut VariantList, name: &str, target: ItemId) {
        warn!(reference = name, %target, "reference target not found");
        variants.warnings.push(ResolveWarning::MissingReference {
            name: name.to_string(),
            target,
        });
    }
}

/// Fill `{0}`, `{1}`, ... from the comma separated `value`.
///
/// Extra fields are ignored; missing ones make the whole command fail.
pub fn format_camera_command(template: &str, value: &str) -> Option<String> {
    let fields: Vec<&str> = value.split(',').collect();
    let mut out = String::with_capacity(template.len() + value.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let end = rest[start..].find('}')? + start;
        let index: usize = rest[start + 1..end].parse().ok()?;
        out.push_str(fields.get(index)?);
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Some(out)
}
