//! # Chunked Replay
//!
//! A [`ReplayTask`] drives a chain forward or backward a few commands at a
//! time. The host calls [`ReplayTask::execute_chunk`] from whatever it uses as
//! a scheduler (an event loop tick, a timer, a plain loop) until it reports
//! [`ReplayStatus::Done`].
//!
//! ```text
//! execute_chunk(n)
//!   cancelled?  -> Cancelled (document keeps the chunks already applied)
//!   run n commands, report progress
//!   finished?   -> renumber touched groups, update chain state -> Done
//!   otherwise   -> Continue
//! ```

use crate::chain::Chain;
use crate::command::ReplayContext;
use knecht_document::Document;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Redo,
    Undo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayStatus {
    Continue,
    Done,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayProgress {
    pub done: usize,
    pub total: usize,
    pub direction: Direction,
}

/// Shared flag requesting early termination of a replay
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub type ProgressCallback = Box<dyn FnMut(ReplayProgress) + Send>;

pub struct ReplayTask {
    chain: Chain,
    direction: Direction,
    done: usize,
    context: ReplayContext,
    failures: usize,
    cancel: CancelToken,
    progress: Option<ProgressCallback>,
    completed: bool,
}

impl fmt::Debug for ReplayTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayTask")
            .field("chain", &self.chain.description())
            .field("direction", &self.direction)
            .field("done", &self.done)
            .field("total", &self.total())
            .field("failures", &self.failures)
            .finish()
    }
}

impl ReplayTask {
    pub fn new(chain: Chain, direction: Direction) -> Self {
        debug!(chain = chain.description(), commands = chain.len(), ?direction, "replay scheduled");
        Self {
            chain,
            direction,
            done: 0,
            context: ReplayContext::new(),
            failures: 0,
            cancel: CancelToken::new(),
            progress: None,
            completed: false,
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn on_progress(mut self, callback: impl FnMut(ReplayProgress) + Send + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn total(&self) -> usize {
        self.chain.len()
    }

    pub fn progress(&self) -> ReplayProgress {
        ReplayProgress {
            done: self.done,
            total: self.total(),
            direction: self.direction,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_finished(&self) -> bool {
        self.completed
    }

    /// Commands that reported failure so far
    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn into_chain(self) -> Chain {
        self.chain
    }

    /// Run up to `count` commands. Undo walks the chain back to front.
    pub fn execute_chunk(&mut self, document: &mut Document, count: usize) -> ReplayStatus {
        if self.completed {
            return ReplayStatus::Done;
        }
        if self.cancel.is_cancelled() {
            warn!(chain = self.chain.description(), done = self.done, total = self.total(), "replay cancelled");
            return ReplayStatus::Cancelled;
        }

        let total = self.total();
        let end = (self.done + count.max(1)).min(total);
        for step in self.done..end {
            let (index, ok) = match self.direction {
                Direction::Redo => (step, self.redo_at(document, step)),
                Direction::Undo => {
                    let index = total - 1 - step;
                    (index, self.undo_at(document, index))
                }
            };
            if !ok {
                debug!(index, "command reported failure");
                self.failures += 1;
            }
        }
        self.done = end;

        let progress = self.progress();
        if let Some(callback) = self.progress.as_mut() {
            callback(progress);
        }

        if self.done < total {
            return ReplayStatus::Continue;
        }

        self.context.renumber_touched(document);
        self.chain.finish(self.direction);
        self.completed = true;
        debug!(
            chain = self.chain.description(),
            direction = ?self.direction,
            failures = self.failures,
            "replay finished"
        );
        ReplayStatus::Done
    }

    /// Execute chunks back to back until the chain is done or cancelled
    pub fn run_to_end(&mut self, document: &mut Document, chunk: usize) -> ReplayStatus {
        loop {
            match self.execute_chunk(document, chunk) {
                ReplayStatus::Continue => continue,
                status => return status,
            }
        }
    }

    fn redo_at(&mut self, document: &mut Document, index: usize) -> bool {
        match self.chain.commands.get_mut(index) {
            Some(command) => command.redo(document, &mut self.context),
            None => false,
        }
    }

    fn undo_at(&mut self, document: &mut Document, index: usize) -> bool {
        match self.chain.commands.get_mut(index) {
            Some(command) => command.undo(document, &mut self.context),
            None => false,
        }
    }
}
