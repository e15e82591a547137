//! # Editor
//!
//! One open document together with its undo history and the replay that
//! may currently be running against it.
//!
//! Every user action builds a [`Chain`]. Chains shorter than `chunk_size`
//! commands replay immediately; longer ones are scheduled and advanced with
//! [`Editor::tick`] so the host can keep its event loop responsive.
//! While a replay is pending every other edit is refused.

use crate::chain::{Chain, ChainFocus, ChainState};
use crate::clipboard::Clipboard;
use crate::command::{EditCommand, ReorderCommand, TreeCommand};
use crate::config::EditorConfig;
use crate::errors::{EditorError, EditorResult};
use crate::paste::{plan_paste, top_level_start, InsertBatch};
use crate::render::{collect_render_presets, RenderPreset};
use crate::replay::{CancelToken, Direction, ReplayProgress, ReplayStatus, ReplayTask};
use crate::resolve::{VariantCollector, VariantList};
use crate::templates::{self, accepted_in_preset, Template};
use crate::undo_stack::UndoStack;
use knecht_common::{CellValue, Column, NodeData};
use knecht_document::{Document, IntegrityReport, NodeId, NodeKey};
use tracing::{debug, info, warn};

/// What happened to a chain handed to the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Replayed to the end before returning
    Applied,
    /// Too long to replay at once; drive it with [`Editor::tick`]
    Scheduled,
    /// Nothing to do
    Nothing,
}

#[derive(Debug)]
pub struct Editor {
    document: Document,
    history: UndoStack,
    config: EditorConfig,
    pending: Option<ReplayTask>,
    cancel: CancelToken,
    current: Option<NodeKey>,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_document(Document::new(), config)
    }

    pub fn with_document(document: Document, config: EditorConfig) -> Self {
        Self {
            document,
            history: UndoStack::with_max_levels(config.undo_limit),
            config,
            pending: None,
            cancel: CancelToken::new(),
            current: None,
        }
    }

    /// Swap in a freshly loaded document; history does not carry over
    pub fn replace_document(&mut self, document: Document) -> EditorResult<()> {
        self.ensure_idle()?;
        self.document = document;
        self.history.clear();
        self.current = None;
        Ok(())
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// Handle shared with a running replay; cancelling takes effect before the next chunk
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    // ------------------------------------------------------------------
    // Current node
    // ------------------------------------------------------------------

    pub fn current(&self) -> Option<NodeId> {
        self.current.and_then(|key| self.document.find_by_key(key))
    }

    pub fn set_current(&mut self, node: Option<NodeId>) {
        self.current = node.and_then(|node| self.document.key_of(node));
    }

    // ------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------

    /// Insert `items` under `parent` (the root when `None`) from order `start` on
    pub fn insert_items(
        &mut self,
        parent: Option<NodeId>,
        start: i32,
        items: Vec<NodeData>,
    ) -> EditorResult<ChainOutcome> {
        let parent = parent.unwrap_or_else(|| self.document.root());
        let start = start.max(0);
        let items = items
            .into_iter()
            .enumerate()
            .map(|(offset, mut item)| {
                item.cells.order = start + offset as i32;
                item
            })
            .collect();
        self.insert_batches("Insert", vec![InsertBatch { parent, start, items }])
    }

    /// Insert pre-numbered batches as one chain
    pub fn insert_batches(&mut self, description: &str, batches: Vec<InsertBatch>) -> EditorResult<ChainOutcome> {
        self.ensure_idle()?;

        let mut focus = None;
        let mut commands = Vec::new();
        for batch in batches {
            if batch.items.is_empty() {
                continue;
            }
            let parent = self
                .document
                .key_of(batch.parent)
                .ok_or(EditorError::NodeNotFound(batch.parent))?;

            focus.get_or_insert(ChainFocus {
                parent,
                redo_order: batch.start + batch.items.len() as i32 - 1,
                undo_order: (batch.start - 1).max(0),
            });

            for item in batch.items {
                let row = usize::try_from(item.cells.order).unwrap_or(0);
                let snapshot = self.document.prepare(item);
                commands.push(TreeCommand::insert(parent, row, snapshot));
            }
        }

        let Some(focus) = focus else {
            return Ok(ChainOutcome::Nothing);
        };
        let mut chain = Chain::new(description).with_focus(focus);
        chain.extend(commands);
        self.run(chain)
    }

    /// Insert detached subtrees at the top level, at the current position
    pub fn create_top_level(&mut self, items: Vec<NodeData>) -> EditorResult<ChainOutcome> {
        let start = top_level_start(&self.document, self.current());
        self.insert_items(None, start, items)
    }

    pub fn create_from_template(&mut self, template: Template, name: Option<&str>) -> EditorResult<ChainOutcome> {
        let data = match name {
            Some(name) => template.build_named(name),
            None => template.build(),
        };
        debug!(template = template.type_key(), name = %data.cells.name, "creating from template");
        self.create_top_level(vec![data])
    }

    /// Collect the selection into a new user preset or render preset.
    ///
    /// Selected top-level presets become references; other accepted items
    /// are copied as they are.
    pub fn create_preset_from_selection(
        &mut self,
        nodes: &[NodeId],
        name: &str,
        render: bool,
    ) -> EditorResult<ChainOutcome> {
        let mut items = Vec::new();
        for node in self.outermost(nodes) {
            let Some(cells) = self.document.cells(node) else {
                continue;
            };
            let kind = cells.kind();
            if !accepted_in_preset(kind) {
                debug!(node = ?node, ?kind, "skipping item not accepted in preset");
                continue;
            }

            if self.document.is_top_level(node) && kind.is_preset_like() {
                let mut reference = NodeData::new(cells.clone());
                if reference.convert_to_reference() {
                    items.push(reference);
                }
            } else if let Some(data) = self.document.to_data(node) {
                items.push(data);
            }
        }
        if items.is_empty() {
            return Ok(ChainOutcome::Nothing);
        }

        let preset = if render {
            templates::render_preset(name, items)
        } else {
            templates::user_preset(name, items)
        };
        self.create_top_level(vec![preset])
    }

    pub fn remove_nodes(&mut self, nodes: &[NodeId]) -> EditorResult<ChainOutcome> {
        self.ensure_idle()?;

        let mut chain = Chain::new("Remove");
        for node in self.outermost(nodes) {
            let (Some(key), Some(address)) = (self.document.key_of(node), self.document.locate(node)) else {
                continue;
            };
            let Some(parent) = self.document.key_of(address.parent) else {
                continue;
            };

            if chain.is_empty() {
                let order = self.document.cells(node).map_or(0, |cells| cells.order);
                chain = chain.with_focus(ChainFocus {
                    parent,
                    redo_order: (order - 1).max(0),
                    undo_order: order,
                });
            }
            chain.push(TreeCommand::remove(parent, address.row, key));
        }
        self.run(chain)
    }

    /// Move `nodes` so they land before row `to` of their common parent
    pub fn move_nodes(&mut self, nodes: &[NodeId], to: i32) -> EditorResult<ChainOutcome> {
        self.ensure_idle()?;

        let mut moving: Vec<(i32, NodeKey)> = Vec::with_capacity(nodes.len());
        let mut parent = None;
        for node in nodes {
            let node_parent = self
                .document
                .parent_of(*node)
                .ok_or(EditorError::NodeNotFound(*node))?;
            if parent.is_some_and(|parent| parent != node_parent) {
                return Err(EditorError::MoveAcrossParents);
            }
            parent = Some(node_parent);

            let order = self.document.cells(*node).map_or(0, |cells| cells.order);
            let key = self.document.key_of(*node).ok_or(EditorError::NodeNotFound(*node))?;
            moving.push((order, key));
        }
        let Some(parent) = parent.and_then(|parent| self.document.key_of(parent)) else {
            return Ok(ChainOutcome::Nothing);
        };
        moving.sort_by_key(|(order, _)| *order);

        let upwards = moving.first().is_some_and(|(order, _)| *order >= to);
        let mut chain = Chain::new("Move");
        for (offset, (_, key)) in moving.iter().enumerate() {
            let target = if upwards { to + offset as i32 } else { to };
            chain.push(ReorderCommand::new(*key, target));
        }

        let last = if upwards {
            to + moving.len() as i32 - 1
        } else {
            to - 1
        };
        let first_order = moving.first().map_or(0, |(order, _)| *order);
        let chain = chain.with_focus(ChainFocus {
            parent,
            redo_order: last.max(0),
            undo_order: first_order,
        });
        self.run(chain)
    }

    /// Undoable write of one cell; names of presets and references follow their links
    pub fn edit_cell(&mut self, node: NodeId, column: Column, value: impl Into<CellValue>) -> EditorResult<ChainOutcome> {
        self.ensure_idle()?;
        if column == Column::Order {
            return Err(EditorError::NotEditable("order"));
        }
        if node == self.document.root() {
            return Err(EditorError::NotEditable("root"));
        }

        let command = EditCommand::new(&self.document, node, column, value.into())
            .ok_or(EditorError::NodeNotFound(node))?;
        if command.is_noop() {
            return Ok(ChainOutcome::Nothing);
        }
        if command.linked_count() > 0 {
            debug!(linked = command.linked_count(), "edit propagates to linked items");
        }

        let mut chain = Chain::new("Edit");
        chain.push(command);
        self.run(chain)
    }

    // ------------------------------------------------------------------
    // Clipboard
    // ------------------------------------------------------------------

    pub fn copy(&self, nodes: &[NodeId]) -> Clipboard {
        Clipboard::copy(&self.document, nodes, self.config.reference_search_limit)
    }

    /// Paste at the current node. Content from another document brings its
    /// referenced presets along.
    pub fn paste(&mut self, clipboard: &Clipboard) -> EditorResult<ChainOutcome> {
        self.ensure_idle()?;
        if clipboard.is_empty() {
            return Err(EditorError::EmptyClipboard);
        }

        let plan = plan_paste(&self.document, clipboard, self.current());
        if plan.is_empty() {
            return Ok(ChainOutcome::Nothing);
        }
        info!(
            destination = ?plan.destination,
            different_origin = plan.different_origin,
            items = plan.item_count(),
            "pasting"
        );
        self.insert_batches("Paste", plan.batches)
    }

    // ------------------------------------------------------------------
    // History and replay
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> EditorResult<ChainOutcome> {
        self.ensure_idle()?;
        match self.history.take_undo() {
            Some(chain) => Ok(self.schedule(chain, Direction::Undo)),
            None => Ok(ChainOutcome::Nothing),
        }
    }

    pub fn redo(&mut self) -> EditorResult<ChainOutcome> {
        self.ensure_idle()?;
        match self.history.take_redo() {
            Some(chain) => Ok(self.schedule(chain, Direction::Redo)),
            None => Ok(ChainOutcome::Nothing),
        }
    }

    /// Execute a freshly built chain and record it
    pub fn run(&mut self, chain: Chain) -> EditorResult<ChainOutcome> {
        self.ensure_idle()?;
        if chain.is_empty() {
            return Ok(ChainOutcome::Nothing);
        }
        Ok(self.schedule(chain, Direction::Redo))
    }

    /// Advance a pending replay by one chunk
    pub fn tick(&mut self) -> Option<ReplayStatus> {
        let chunk = self.config.chunk_size;
        let task = self.pending.as_mut()?;
        let status = task.execute_chunk(&mut self.document, chunk);
        match status {
            ReplayStatus::Continue => {}
            ReplayStatus::Done => self.finish_pending(),
            ReplayStatus::Cancelled => self.abandon_pending(),
        }
        Some(status)
    }

    /// Drive a pending replay to its end
    pub fn complete(&mut self) -> Option<ReplayStatus> {
        let mut last = None;
        while self.pending.is_some() {
            last = self.tick();
        }
        last
    }

    pub fn cancel(&self) {
        if self.pending.is_some() {
            self.cancel.cancel();
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn progress(&self) -> Option<ReplayProgress> {
        self.pending.as_ref().map(ReplayTask::progress)
    }

    fn schedule(&mut self, chain: Chain, direction: Direction) -> ChainOutcome {
        let immediate = chain.len() < self.config.chunk_size.max(1);
        let task = ReplayTask::new(chain, direction).with_cancel_token(self.cancel.clone());
        self.pending = Some(task);

        if !immediate {
            return ChainOutcome::Scheduled;
        }
        match self.complete() {
            Some(ReplayStatus::Cancelled) => ChainOutcome::Nothing,
            _ => ChainOutcome::Applied,
        }
    }

    fn finish_pending(&mut self) {
        let Some(task) = self.pending.take() else {
            return;
        };
        if task.failures() > 0 {
            warn!(chain = task.chain().description(), failures = task.failures(), "chain replayed with failures");
        }
        let direction = task.direction();
        let fresh = task.chain().state() == ChainState::Applied;
        let chain = task.into_chain();
        self.refocus(chain.focus(), direction);

        if fresh {
            self.history.push(chain);
        } else {
            self.history.restore(chain);
        }
    }

    fn abandon_pending(&mut self) {
        let Some(task) = self.pending.take() else {
            return;
        };
        let progress = task.progress();
        warn!(
            chain = task.chain().description(),
            done = progress.done,
            total = progress.total,
            "replay cancelled, history cleared"
        );
        self.document.renumber_all();
        self.history.clear();
        self.cancel.reset();
        self.current = None;
    }

    /// Point the current node at the order the chain expects to land on
    fn refocus(&mut self, focus: Option<ChainFocus>, direction: Direction) {
        let Some(focus) = focus else {
            return;
        };
        let Some(parent) = self.document.find_by_key(focus.parent) else {
            self.current = None;
            return;
        };
        let order = match direction {
            Direction::Redo => focus.redo_order,
            Direction::Undo => focus.undo_order,
        };

        let children = self.document.ordered_children(parent);
        let node = children
            .iter()
            .copied()
            .find(|child| self.document.cells(*child).is_some_and(|cells| cells.order == order))
            .or_else(|| children.last().copied())
            .or_else(|| (parent != self.document.root()).then_some(parent));
        self.set_current(node);
    }

    fn ensure_idle(&self) -> EditorResult<()> {
        if self.pending.is_some() {
            return Err(EditorError::ReplayInProgress);
        }
        Ok(())
    }

    /// Selection without nodes whose ancestor is also selected
    fn outermost(&self, nodes: &[NodeId]) -> Vec<NodeId> {
        nodes
            .iter()
            .copied()
            .filter(|node| self.document.contains(*node) && *node != self.document.root())
            .filter(|node| {
                !nodes
                    .iter()
                    .any(|other| other != node && self.document.is_ancestor(*other, *node))
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Integrity and resolution
    // ------------------------------------------------------------------

    pub fn validate(&mut self) -> IntegrityReport {
        let report = self.document.refresh_integrity(self.config.cycle_depth_limit);
        if !report.is_clean() {
            warn!(
                invalid = report.invalid_references.len(),
                recursive = report.recursive.len(),
                duplicates = report.duplicate_presets.len(),
                "document has integrity problems"
            );
        }
        report
    }

    pub fn collector(&self) -> VariantCollector<'_> {
        VariantCollector::new(&self.document)
            .with_recursion_limit(self.config.resolve_recursion_limit)
            .with_reset(self.config.collect_reset)
    }

    pub fn resolve(&self, node: NodeId) -> VariantList {
        self.collector().collect(node)
    }

    pub fn resolve_by_name(&self, name: &str) -> Option<VariantList> {
        self.collector().collect_by_name(name)
    }

    pub fn render_presets(&self) -> Vec<RenderPreset> {
        collect_render_presets(&self.document, &self.collector())
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knecht_common::{Cells, ItemKind};

    fn editor() -> Editor {
        let p1 = Cells::preset("P1", "trim_setup");
        let u1 = p1.id.unwrap();
        Editor::with_document(
            Document::from_roots(vec![
                NodeData::new(p1).with_children(vec![Cells::variant(0, "Color", "red").into()]),
                NodeData::new(Cells::preset("P2", "package").with_order(1))
                    .with_children(vec![Cells::reference("R", u1).into()]),
            ]),
            EditorConfig::default(),
        )
    }

    fn top_names(editor: &Editor) -> Vec<String> {
        let doc = editor.document();
        doc.ordered_children(doc.root())
            .into_iter()
            .map(|node| doc.cells(node).unwrap().name.clone())
            .collect()
    }

    #[test]
    fn test_insert_undo_redo() {
        let mut editor = editor();
        let outcome = editor
            .insert_items(None, 1, vec![Cells::variant(0, "New", "1").into()])
            .unwrap();
        assert_eq!(outcome, ChainOutcome::Applied);
        assert_eq!(top_names(&editor), vec!["P1", "New", "P2"]);
        assert_eq!(editor.document().cells(editor.current().unwrap()).unwrap().name, "New");

        editor.undo().unwrap();
        assert_eq!(top_names(&editor), vec!["P1", "P2"]);
        editor.redo().unwrap();
        assert_eq!(top_names(&editor), vec!["P1", "New", "P2"]);
        assert!(editor.document().orders_are_contiguous());
    }

    #[test]
    fn test_remove_and_undo() {
        let mut editor = editor();
        let p1 = editor.document().find_top_level("P1").unwrap();
        let color = editor.document().child_at(p1, 0).unwrap();

        // the nested variant goes with its preset
        editor.remove_nodes(&[p1, color]).unwrap();
        assert_eq!(top_names(&editor), vec!["P2"]);
        assert_eq!(editor.document().len(), 2);

        editor.undo().unwrap();
        assert_eq!(top_names(&editor), vec!["P1", "P2"]);
        assert_eq!(editor.document().len(), 4);
    }

    #[test]
    fn test_long_chain_is_scheduled() {
        let mut editor = editor();
        let items: Vec<NodeData> = (0..20).map(|i| Cells::variant(0, format!("v{i}"), "x").into()).collect();
        let p2 = editor.document().find_top_level("P2").unwrap();

        let outcome = editor.insert_items(Some(p2), 1, items).unwrap();
        assert_eq!(outcome, ChainOutcome::Scheduled);
        assert!(editor.is_busy());
        assert!(matches!(editor.undo(), Err(EditorError::ReplayInProgress)));

        assert_eq!(editor.tick(), Some(ReplayStatus::Continue));
        assert_eq!(editor.progress().unwrap().done, 8);
        assert_eq!(editor.complete(), Some(ReplayStatus::Done));
        assert!(!editor.is_busy());
        assert_eq!(editor.document().row_count(p2), 21);
        assert!(editor.history().can_undo());
    }

    #[test]
    fn test_chain_of_chunk_size_is_scheduled() {
        let mut editor = Editor::default();
        let chunk = editor.config().chunk_size;
        let short: Vec<NodeData> = (0..chunk - 1).map(|i| Cells::variant(0, format!("s{i}"), "").into()).collect();
        assert_eq!(editor.insert_items(None, 0, short).unwrap(), ChainOutcome::Applied);

        let exact: Vec<NodeData> = (0..chunk).map(|i| Cells::variant(0, format!("e{i}"), "").into()).collect();
        assert_eq!(editor.insert_items(None, 0, exact).unwrap(), ChainOutcome::Scheduled);
        assert_eq!(editor.complete(), Some(ReplayStatus::Done));
        assert_eq!(editor.document().len(), 2 * chunk - 1);
    }

    #[test]
    fn test_cancel_clears_history() {
        let mut editor = editor();
        let items: Vec<NodeData> = (0..20).map(|i| Cells::variant(0, format!("v{i}"), "x").into()).collect();
        editor.insert_items(None, 0, items).unwrap();
        editor.tick();
        editor.cancel();

        assert_eq!(editor.tick(), Some(ReplayStatus::Cancelled));
        assert!(!editor.is_busy());
        assert!(!editor.history().can_undo());
        assert!(editor.document().orders_are_contiguous());
        assert!(!editor.cancel_token().is_cancelled());
    }

    #[test]
    fn test_edit_cell_rules() {
        let mut editor = editor();
        let p1 = editor.document().find_top_level("P1").unwrap();
        assert!(matches!(
            editor.edit_cell(p1, Column::Order, 5),
            Err(EditorError::NotEditable("order"))
        ));
        assert_eq!(editor.edit_cell(p1, Column::Value, "").unwrap(), ChainOutcome::Nothing);

        editor.edit_cell(p1, Column::Name, "Trim").unwrap();
        let p2 = editor.document().find_top_level("P2").unwrap();
        let r = editor.document().child_at(p2, 0).unwrap();
        assert_eq!(editor.document().cells(r).unwrap().name, "Trim");

        editor.undo().unwrap();
        assert_eq!(editor.document().cells(r).unwrap().name, "R");
    }

    #[test]
    fn test_move_rejects_different_parents() {
        let mut editor = editor();
        let p1 = editor.document().find_top_level("P1").unwrap();
        let color = editor.document().child_at(p1, 0).unwrap();
        assert!(matches!(
            editor.move_nodes(&[p1, color], 0),
            Err(EditorError::MoveAcrossParents)
        ));
    }

    #[test]
    fn test_move_up_and_undo() {
        let mut editor = Editor::default();
        let items: Vec<NodeData> = ["a", "b", "c", "d"].iter().map(|n| Cells::variant(0, *n, "").into()).collect();
        editor.insert_items(None, 0, items).unwrap();
        let d = editor.document().find_top_level("d").unwrap();

        editor.move_nodes(&[d], 1).unwrap();
        assert_eq!(top_names(&editor), vec!["a", "d", "b", "c"]);
        editor.undo().unwrap();
        assert_eq!(top_names(&editor), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_create_preset_from_selection() {
        let mut editor = editor();
        let p1 = editor.document().find_top_level("P1").unwrap();
        let u1 = editor.document().cells(p1).unwrap().id.unwrap();
        let color = editor.document().child_at(p1, 0).unwrap();

        editor.create_preset_from_selection(&[p1], "Mine", false).unwrap();
        let mine = editor.document().find_top_level("Mine").unwrap();
        let child = editor.document().child_at(mine, 0).unwrap();
        assert_eq!(editor.document().cells(child).unwrap().reference, Some(u1));
        assert_eq!(editor.document().cells(child).unwrap().kind(), ItemKind::Reference);

        editor.create_preset_from_selection(&[color], "Render", true).unwrap();
        let render = editor.document().find_top_level("Render").unwrap();
        assert_eq!(editor.document().cells(render).unwrap().kind(), ItemKind::RenderPreset);
        assert_eq!(editor.document().row_count(render), 4);
    }

    #[test]
    fn test_template_lands_at_current_top_level() {
        let mut editor = editor();
        let p2 = editor.document().find_top_level("P2").unwrap();
        let r = editor.document().child_at(p2, 0).unwrap();
        editor.set_current(Some(r));

        editor.create_from_template(Template::Viewset, None).unwrap();
        assert_eq!(top_names(&editor), vec!["P1", "Viewset", "P2"]);
    }

    #[test]
    fn test_resolve_through_editor() {
        let editor = editor();
        let list = editor.resolve_by_name("P2").unwrap();
        assert_eq!(list.pairs(), vec![("Color", "red")]);
    }
}
