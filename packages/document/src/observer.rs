//! Change notifications for views.
//!
//! Every structural mutation is bracketed by an "about to" and a "done"
//! event. While a document is silent no events are delivered; leaving
//! silent mode emits a single [`DocumentEvent::Reset`].

use crate::arena::NodeId;
use knecht_common::Column;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    RowsAboutToBeInserted { parent: NodeId, first: usize, last: usize },
    RowsInserted { parent: NodeId, first: usize, last: usize },
    RowsAboutToBeRemoved { parent: NodeId, first: usize, last: usize },
    RowsRemoved { parent: NodeId, first: usize, last: usize },
    DataChanged { node: NodeId, column: Column },
    /// Children of `parent` were rearranged without insertion or removal
    LayoutChanged { parent: NodeId },
    Reset,
}

pub trait DocumentObserver: Send + Debug {
    fn on_event(&mut self, event: &DocumentEvent);
}

/// Observer that stores every event in a shared log
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<DocumentEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DocumentEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl DocumentObserver for EventRecorder {
    fn on_event(&mut self, event: &DocumentEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
