//! # Chains
//!
//! A chain is one user-visible action made of any number of commands. It
//! moves through `Pending -> Applied -> {Undone <-> Redone}` and is the unit
//! stored on the undo stack.

use crate::command::Command;
use crate::replay::Direction;
use knecht_document::NodeKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// Built but never executed
    Pending,
    /// Executed once as the original edit
    Applied,
    Undone,
    Redone,
}

/// Where the editor's current node lands once the chain has replayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainFocus {
    pub parent: NodeKey,
    pub redo_order: i32,
    pub undo_order: i32,
}

#[derive(Debug, Clone)]
pub struct Chain {
    pub(crate) description: String,
    pub(crate) commands: Vec<Command>,
    pub(crate) state: ChainState,
    pub(crate) focus: Option<ChainFocus>,
}

impl Chain {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            commands: Vec::new(),
            state: ChainState::Pending,
            focus: None,
        }
    }

    pub fn with_focus(mut self, focus: ChainFocus) -> Self {
        self.focus = Some(focus);
        self
    }

    pub fn push(&mut self, command: impl Into<Command>) {
        self.commands.push(command.into());
    }

    pub fn extend<I, C>(&mut self, commands: I)
    where
        I: IntoIterator<Item = C>,
        C: Into<Command>,
    {
        self.commands.extend(commands.into_iter().map(Into::into));
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    pub fn focus(&self) -> Option<ChainFocus> {
        self.focus
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Record that a replay in `direction` ran to the end
    pub(crate) fn finish(&mut self, direction: Direction) {
        self.state = match (direction, self.state) {
            (Direction::Redo, ChainState::Pending) => ChainState::Applied,
            (Direction::Redo, _) => ChainState::Redone,
            (Direction::Undo, _) => ChainState::Undone,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ReorderCommand;

    #[test]
    fn test_state_machine() {
        let mut chain = Chain::new("Move");
        assert_eq!(chain.state(), ChainState::Pending);

        chain.finish(Direction::Redo);
        assert_eq!(chain.state(), ChainState::Applied);
        chain.finish(Direction::Undo);
        assert_eq!(chain.state(), ChainState::Undone);
        chain.finish(Direction::Redo);
        assert_eq!(chain.state(), ChainState::Redone);
        chain.finish(Direction::Undo);
        assert_eq!(chain.state(), ChainState::Undone);
    }

    #[test]
    fn test_push_commands() {
        let mut chain = Chain::new("Move");
        assert!(chain.is_empty());
        let doc = knecht_document::Document::new();
        let key = doc.key_of(doc.root()).unwrap();
        chain.push(ReorderCommand::new(key, 1));
        chain.extend(vec![ReorderCommand::new(key, 2)]);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.commands()[0].name(), "reorder");
        assert_eq!(chain.description(), "Move");
    }
}
