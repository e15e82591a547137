//! # Commands
//!
//! Undoable edits. Commands address nodes by [`NodeKey`] and re-resolve
//! their position on every replay, so a chain of commands that each shift
//! sibling rows still finds the right nodes in both directions.
//!
//! ```text
//! Tree(Insert)   redo: insert snapshot     undo: remove it again
//! Tree(Remove)   redo: remove + snapshot   undo: insert snapshot
//! Reorder        redo: write target order  undo: restore previous slot
//! Edit           redo: write new cell      undo: write previous cell
//! ```

use knecht_common::{CellValue, Column, ItemKind};
use knecht_document::{Document, NodeId, NodeKey, Snapshot};
use tracing::{debug, warn};

/// Bookkeeping shared by the commands of one replay
#[derive(Debug, Default)]
pub struct ReplayContext {
    touched: Vec<NodeKey>,
}

impl ReplayContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a sibling group for the final renumbering pass
    pub fn touch(&mut self, parent: NodeKey) {
        if !self.touched.contains(&parent) {
            self.touched.push(parent);
        }
    }

    pub fn touched(&self) -> &[NodeKey] {
        &self.touched
    }

    /// Renumber every touched group that still exists
    pub fn renumber_touched(&mut self, document: &mut Document) {
        for key in self.touched.drain(..) {
            if let Some(parent) = document.find_by_key(key) {
                document.renumber(parent);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeAction {
    Insert,
    Remove,
}

/// Insertion or removal of one subtree
#[derive(Debug, Clone)]
pub struct TreeCommand {
    action: TreeAction,
    parent: NodeKey,
    row: usize,
    target: NodeKey,
    snapshot: Option<Snapshot>,
    previous_remove_failed: bool,
}

impl TreeCommand {
    /// Insert `snapshot` under `parent`; its order cell is the logical slot
    pub fn insert(parent: NodeKey, row: usize, snapshot: Snapshot) -> Self {
        Self {
            action: TreeAction::Insert,
            parent,
            row,
            target: snapshot.key,
            snapshot: Some(snapshot),
            previous_remove_failed: false,
        }
    }

    /// Remove the node currently at `row` under `parent`
    pub fn remove(parent: NodeKey, row: usize, target: NodeKey) -> Self {
        Self {
            action: TreeAction::Remove,
            parent,
            row,
            target,
            snapshot: None,
            previous_remove_failed: false,
        }
    }

    pub fn action(&self) -> TreeAction {
        self.action
    }

    pub fn target(&self) -> NodeKey {
        self.target
    }

    pub fn parent(&self) -> NodeKey {
        self.parent
    }

    pub fn previous_remove_failed(&self) -> bool {
        self.previous_remove_failed
    }

    pub fn redo(&mut self, document: &mut Document, context: &mut ReplayContext) -> bool {
        match self.action {
            TreeAction::Insert => self.add(document, context),
            TreeAction::Remove => self.take(document, context),
        }
    }

    pub fn undo(&mut self, document: &mut Document, context: &mut ReplayContext) -> bool {
        match self.action {
            TreeAction::Insert => self.take(document, context),
            TreeAction::Remove => self.add(document, context),
        }
    }

    fn add(&mut self, document: &mut Document, context: &mut ReplayContext) -> bool {
        // A failed removal means the node never left; re-adding would duplicate it
        if std::mem::take(&mut self.previous_remove_failed) {
            debug!(target = %self.target, "skipping insert after failed remove");
            return false;
        }

        let Some(snapshot) = &self.snapshot else {
            warn!(target = %self.target, "insert without snapshot");
            return false;
        };
        let Some(parent) = document.find_by_key(self.parent) else {
            warn!(parent = %self.parent, "insert parent no longer exists");
            return false;
        };

        let row = self.row.min(document.row_count(parent));
        let slot = usize::try_from(snapshot.order()).unwrap_or(0);
        let Some(node) = document.insert_snapshot(parent, row, snapshot) else {
            return false;
        };
        document.renumber_pinned(parent, node, slot);

        if let Some(key) = document.key_of(node) {
            self.target = key;
        }
        context.touch(self.parent);
        true
    }

    fn take(&mut self, document: &mut Document, context: &mut ReplayContext) -> bool {
        let located = document
            .find_by_key(self.target)
            .and_then(|node| Some((node, document.locate(node)?)));
        let Some((node, address)) = located else {
            warn!(target = %self.target, "remove target no longer exists");
            self.previous_remove_failed = true;
            return false;
        };
        let Some(parent_key) = document.key_of(address.parent) else {
            self.previous_remove_failed = true;
            return false;
        };

        let snapshot = document.snapshot(node);
        if !document.remove_rows(address.row, 1, address.parent) {
            warn!(row = address.row, parent = %parent_key, "could not remove row");
            self.previous_remove_failed = true;
            return false;
        }

        self.snapshot = snapshot;
        self.parent = parent_key;
        self.row = address.row;
        document.renumber(address.parent);
        context.touch(parent_key);
        true
    }
}

/// Target of a reorder step: the node whose order is written and the value
///
/// Moving a node exactly one slot down pulls its successor up instead.
pub fn reorder_target(document: &Document, node: NodeId, order: i32) -> Option<(NodeId, i32)> {
    let current = document.cells(node)?.order;

    if current + 1 == order {
        let parent = document.parent_of(node)?;
        let siblings = document.ordered_children(parent);
        let below = siblings
            .iter()
            .position(|sibling| *sibling == node)
            .and_then(|position| siblings.get(position + 1));
        if let Some(below) = below {
            debug!(node = ?node, "moving one order below");
            return Some((*below, order - 2));
        }
    }

    if current > order {
        Some((node, order - 1))
    } else {
        Some((node, order))
    }
}

/// Rewrite the order of one node within its sibling group.
///
/// Undo pins the node back into the slot it held before the first redo.
#[derive(Debug, Clone)]
pub struct ReorderCommand {
    target: NodeKey,
    to: i32,
    from: Option<usize>,
}

impl ReorderCommand {
    pub fn new(target: NodeKey, to: i32) -> Self {
        Self {
            target,
            to,
            from: None,
        }
    }

    pub fn target(&self) -> NodeKey {
        self.target
    }

    pub fn to(&self) -> i32 {
        self.to
    }

    pub fn redo(&mut self, document: &mut Document, context: &mut ReplayContext) -> bool {
        let Some(node) = document.find_by_key(self.target) else {
            warn!(target = %self.target, "reorder target no longer exists");
            return false;
        };
        let Some(parent) = document.parent_of(node) else {
            return false;
        };
        if self.from.is_none() {
            self.from = document
                .ordered_children(parent)
                .iter()
                .position(|sibling| *sibling == node);
        }
        let Some((subject, value)) = reorder_target(document, node, self.to) else {
            return false;
        };

        if let Err(err) = document.set_cell(subject, Column::Order, CellValue::Order(value)) {
            warn!(error = %err, "could not write order");
            return false;
        }
        document.renumber(parent);
        touch_parent(document, context, parent);
        true
    }

    /// Puts the node back at the row captured by the first redo rather than
    /// replaying the order rule, so edits interleaved since then are ignored.
    pub fn undo(&mut self, document: &mut Document, context: &mut ReplayContext) -> bool {
        let Some(slot) = self.from else {
            return false;
        };
        let Some(node) = document.find_by_key(self.target) else {
            warn!(target = %self.target, "reorder target no longer exists");
            return false;
        };
        let Some(parent) = document.parent_of(node) else {
            return false;
        };
        document.renumber_pinned(parent, node, slot);
        touch_parent(document, context, parent);
        true
    }
}

fn touch_parent(document: &Document, context: &mut ReplayContext, parent: NodeId) {
    if let Some(key) = document.key_of(parent) {
        context.touch(key);
    }
}

/// A single cell edit, mirrored onto linked nodes for names
#[derive(Debug, Clone)]
pub struct EditCommand {
    target: NodeKey,
    column: Column,
    previous: CellValue,
    next: CellValue,
    linked: Vec<(NodeKey, CellValue)>,
}

impl EditCommand {
    pub fn new(document: &Document, node: NodeId, column: Column, next: CellValue) -> Option<Self> {
        let target = document.key_of(node)?;
        let cells = document.cells(node)?;
        let previous = cells.get(column);

        let links_names = matches!(cells.kind(), ItemKind::Reference) || cells.kind().is_preset_like();
        let linked = if column == Column::Name && links_names {
            document
                .linked_nodes(node)
                .into_iter()
                .filter_map(|other| Some((document.key_of(other)?, document.cells(other)?.get(Column::Name))))
                .collect()
        } else {
            Vec::new()
        };

        Some(Self {
            target,
            column,
            previous,
            next,
            linked,
        })
    }

    pub fn column(&self) -> Column {
        self.column
    }

    pub fn is_noop(&self) -> bool {
        self.previous == self.next && self.linked.iter().all(|(_, value)| *value == self.next)
    }

    pub fn linked_count(&self) -> usize {
        self.linked.len()
    }

    pub fn redo(&mut self, document: &mut Document) -> bool {
        let mut ok = write(document, self.target, self.column, self.next.clone());
        for (key, _) in &self.linked {
            ok &= write(document, *key, self.column, self.next.clone());
        }
        ok
    }

    pub fn undo(&mut self, document: &mut Document) -> bool {
        let mut ok = write(document, self.target, self.column, self.previous.clone());
        for (key, previous) in &self.linked {
            ok &= write(document, *key, self.column, previous.clone());
        }
        ok
    }
}

fn write(document: &mut Document, key: NodeKey, column: Column, value: CellValue) -> bool {
    let Some(node) = document.find_by_key(key) else {
        warn!(target = %key, "edit target no longer exists");
        return false;
    };
    match document.set_cell(node, column, value) {
        Ok(_) => true,
        Err(err) => {
            warn!(target = %key, error = %err, "cell edit rejected");
            false
        }
    }
}

#[derive(Debug, Clone)]
pub enum Command {
    Tree(TreeCommand),
    Reorder(ReorderCommand),
    Edit(EditCommand),
}

impl Command {
    pub fn redo(&mut self, document: &mut Document, context: &mut ReplayContext) -> bool {
        match self {
            Command::Tree(command) => command.redo(document, context),
            Command::Reorder(command) => command.redo(document, context),
            Command::Edit(command) => command.redo(document),
        }
    }

    pub fn undo(&mut self, document: &mut Document, context: &mut ReplayContext) -> bool {
        match self {
            Command::Tree(command) => command.undo(document, context),
            Command::Reorder(command) => command.undo(document, context),
            Command::Edit(command) => command.undo(document),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Tree(command) if command.action() == TreeAction::Insert => "insert",
            Command::Tree(_) => "remove",
            Command::Reorder(_) => "reorder",
            Command::Edit(_) => "edit",
        }
    }
}

impl From<TreeCommand> for Command {
    fn from(command: TreeCommand) -> Self {
        Command::Tree(command)
    }
}

impl From<ReorderCommand> for Command {
    fn from(command: ReorderCommand) -> Self {
        Command::Reorder(command)
    }
}

impl From<EditCommand> for Command {
    fn from(command: EditCommand) -> Self {
        Command::Edit(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knecht_common::{Cells, NodeData};

    fn names(document: &Document) -> Vec<String> {
        document
            .ordered_children(document.root())
            .iter()
            .map(|node| document.cells(*node).unwrap().name.clone())
            .collect()
    }

    fn letters(count: usize) -> Document {
        Document::from_roots(
            (0..count)
                .map(|i| Cells::variant(i as i32, ((b'a' + i as u8) as char).to_string(), "").into())
                .collect(),
        )
    }

    fn key_at(document: &Document, row: usize) -> NodeKey {
        let node = document.child_at(document.root(), row).unwrap();
        document.key_of(node).unwrap()
    }

    #[test]
    fn test_insert_and_undo() {
        let mut doc = letters(3);
        let root_key = doc.key_of(doc.root()).unwrap();
        let snapshot = doc.prepare(NodeData::new(Cells::variant(1, "x", "")));
        let mut command = TreeCommand::insert(root_key, 1, snapshot);
        let mut context = ReplayContext::new();

        assert!(command.redo(&mut doc, &mut context));
        assert_eq!(names(&doc), vec!["a", "x", "b", "c"]);
        assert!(doc.orders_are_contiguous());

        assert!(command.undo(&mut doc, &mut context));
        assert_eq!(names(&doc), vec!["a", "b", "c"]);
        assert_eq!(context.touched(), &[root_key]);
    }

    #[test]
    fn test_remove_and_undo_restores_keys() {
        let mut doc = letters(3);
        let root_key = doc.key_of(doc.root()).unwrap();
        let target = key_at(&doc, 1);
        let mut command = TreeCommand::remove(root_key, 1, target);
        let mut context = ReplayContext::new();

        assert!(command.redo(&mut doc, &mut context));
        assert_eq!(names(&doc), vec!["a", "c"]);
        assert_eq!(doc.find_by_key(target), None);

        assert!(command.undo(&mut doc, &mut context));
        assert_eq!(names(&doc), vec!["a", "b", "c"]);
        assert!(doc.find_by_key(target).is_some());
    }

    #[test]
    fn test_failed_remove_turns_insert_into_noop() {
        let mut doc = letters(2);
        let root_key = doc.key_of(doc.root()).unwrap();
        let target = key_at(&doc, 0);
        let mut first = TreeCommand::remove(root_key, 0, target);
        let mut second = TreeCommand::remove(root_key, 0, target);
        let mut context = ReplayContext::new();

        assert!(first.redo(&mut doc, &mut context));
        assert!(!second.redo(&mut doc, &mut context));
        assert!(second.previous_remove_failed());

        // undo in reverse: the failed command must not re-insert
        assert!(!second.undo(&mut doc, &mut context));
        assert!(!second.previous_remove_failed());
        assert!(first.undo(&mut doc, &mut context));
        assert_eq!(names(&doc), vec!["a", "b"]);
    }

    #[test]
    fn test_reorder_target_rules() {
        let doc = letters(4);
        let root = doc.root();
        let b = doc.child_at(root, 1).unwrap();
        let c = doc.child_at(root, 2).unwrap();

        // one below: the successor moves up instead
        assert_eq!(reorder_target(&doc, b, 2), Some((c, 0)));
        // upwards
        assert_eq!(reorder_target(&doc, c, 0), Some((c, -1)));
        // further down
        assert_eq!(reorder_target(&doc, b, 3), Some((b, 3)));
    }

    #[test]
    fn test_reorder_swap_and_undo() {
        let mut doc = letters(4);
        let mut command = ReorderCommand::new(key_at(&doc, 1), 2);
        let mut context = ReplayContext::new();

        assert!(command.redo(&mut doc, &mut context));
        assert_eq!(names(&doc), vec!["a", "c", "b", "d"]);
        assert!(command.undo(&mut doc, &mut context));
        assert_eq!(names(&doc), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_reorder_up_and_down() {
        let mut doc = letters(5);
        let mut context = ReplayContext::new();

        let mut up = ReorderCommand::new(key_at(&doc, 3), 1);
        up.redo(&mut doc, &mut context);
        assert_eq!(names(&doc), vec!["a", "d", "b", "c", "e"]);
        up.undo(&mut doc, &mut context);
        assert_eq!(names(&doc), vec!["a", "b", "c", "d", "e"]);

        let mut down = ReorderCommand::new(key_at(&doc, 0), 3);
        down.redo(&mut doc, &mut context);
        assert_eq!(names(&doc), vec!["b", "c", "a", "d", "e"]);
        down.undo(&mut doc, &mut context);
        assert_eq!(names(&doc), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_edit_name_propagates_to_links() {
        let preset = Cells::preset("P1", "preset");
        let id = preset.id.unwrap();
        let mut doc = Document::from_roots(vec![
            preset.into(),
            NodeData::new(Cells::preset("P2", "preset").with_order(1))
                .with_children(vec![Cells::reference("P1", id).into()]),
        ]);
        let p1 = doc.preset_of(id).unwrap();
        let reference = doc.references_of(id)[0];

        let mut command = EditCommand::new(&doc, p1, Column::Name, "Renamed".into()).unwrap();
        assert_eq!(command.linked_count(), 1);
        assert!(command.redo(&mut doc));
        assert_eq!(doc.cells(reference).unwrap().name, "Renamed");

        assert!(command.undo(&mut doc));
        assert_eq!(doc.cells(p1).unwrap().name, "P1");
        assert_eq!(doc.cells(reference).unwrap().name, "P1");
    }

    #[test]
    fn test_edit_value_is_not_propagated() {
        let preset = Cells::preset("P1", "preset");
        let id = preset.id.unwrap();
        let doc = Document::from_roots(vec![preset.into(), Cells::reference("R", id).with_order(1).into()]);
        let p1 = doc.preset_of(id).unwrap();
        let command = EditCommand::new(&doc, p1, Column::Value, "v".into()).unwrap();
        assert_eq!(command.linked_count(), 0);
    }
}
