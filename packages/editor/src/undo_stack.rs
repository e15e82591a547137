//! # Undo/Redo Stack
//!
//! Holds finished chains. The stack never replays anything itself: the
//! editor takes a chain off one side, replays it through a
//! [`crate::ReplayTask`] and hands it back with [`UndoStack::restore`].
//!
//! ## Design
//!
//! - Every new action is pushed as one chain and clears the redo side
//! - Undo takes the most recent applied chain
//! - Redo takes the most recent undone chain
//! - The oldest chains are dropped beyond the level limit

use crate::chain::{Chain, ChainState};
use tracing::debug;

#[derive(Debug)]
pub struct UndoStack {
    /// Applied chains (most recent last)
    undo_stack: Vec<Chain>,

    /// Undone chains (most recent last)
    redo_stack: Vec<Chain>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (50)
    pub fn new() -> Self {
        Self::with_max_levels(50)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record a freshly applied chain
    pub fn push(&mut self, chain: Chain) {
        self.push_undo(chain);

        // New action invalidates the future
        self.redo_stack.clear();
    }

    fn push_undo(&mut self, chain: Chain) {
        self.undo_stack.push(chain);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            let dropped = self.undo_stack.remove(0);
            debug!(chain = dropped.description(), "undo level evicted");
        }
    }

    pub fn take_undo(&mut self) -> Option<Chain> {
        self.undo_stack.pop()
    }

    pub fn take_redo(&mut self) -> Option<Chain> {
        self.redo_stack.pop()
    }

    /// Put a replayed chain back on the side matching its state
    pub fn restore(&mut self, chain: Chain) {
        match chain.state() {
            ChainState::Undone => self.redo_stack.push(chain),
            _ => self.push_undo(chain),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Description of the next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(Chain::description)
    }

    /// Description of the next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(Chain::description)
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
