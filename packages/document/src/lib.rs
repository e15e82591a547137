//! # Knecht Document
//!
//! In-memory tree of presets, variants and references with an identity
//! registry kept in sync on every cell write.
//!
//! - [`Document`]: the tree, its addressing and structural edits
//! - [`IdentityRegistry`]: id → preset and id → references lookups,
//!   reference validation and cycle detection
//! - [`DocumentObserver`]: change notifications for views

pub mod arena;
pub mod document;
pub mod error;
pub mod node;
pub mod observer;
pub mod registry;

pub use arena::{Arena, NodeId};
pub use document::{Address, Document, DocumentId, IntegrityReport};
pub use error::{DocumentError, DocumentResult};
pub use node::{DisplayStyle, Node, NodeKey, Snapshot};
pub use observer::{DocumentEvent, DocumentObserver, EventRecorder};
pub use registry::{IdentityChange, IdentityRegistry, DEFAULT_CYCLE_DEPTH};
