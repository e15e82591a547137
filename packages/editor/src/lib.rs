//! # Knecht Editor
//!
//! Undoable editing engine on top of [`knecht_document`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ codec: exchange text ⇄ NodeData             │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ document: arena tree + identity registry    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: chains of commands + undo history   │
//! │  - Insert / remove / reorder / cell edits   │
//! │  - Chunked, cancellable replay              │
//! │  - Copy and paste across documents          │
//! │  - Templates, variant and render resolution │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Commands address nodes by key**: a command replayed after other
//!    edits still finds its node
//! 2. **Orders stay contiguous**: every touched sibling group is renumbered
//!    when a chain finishes
//! 3. **Integrity problems are values**: dangling references and cycles are
//!    reported, never repaired behind the user's back
//!
//! ## Usage
//!
//! ```rust,ignore
//! use knecht_editor::{load_file, Editor, EditorConfig, Template};
//!
//! let document = load_file("presets.xml").into_result()?;
//! let mut editor = Editor::with_document(document, EditorConfig::default());
//!
//! editor.create_from_template(Template::Viewset, Some("Front"))?;
//! editor.undo()?;
//!
//! let variants = editor.resolve_by_name("Trim").unwrap_or_default();
//! for (name, value) in variants.pairs() {
//!     println!("{name} = {value}");
//! }
//! ```

mod chain;
mod clipboard;
mod command;
mod config;
mod editor;
mod errors;
mod io;
mod paste;
mod rename;
mod render;
mod replay;
mod resolve;
mod templates;
mod undo_stack;

pub use chain::{Chain, ChainFocus, ChainState};
pub use clipboard::{Clipboard, ClipboardItem};
pub use command::{reorder_target, Command, EditCommand, ReorderCommand, ReplayContext, TreeAction, TreeCommand};
pub use config::EditorConfig;
pub use editor::{ChainOutcome, Editor};
pub use errors::{EditorError, EditorResult};
pub use io::{load_file, load_str, save_file, save_str, Loaded};
pub use paste::{determine_destination, plan_paste, InsertBatch, PasteDestination, PastePlan};
pub use rename::next_name;
pub use render::{
    collect_render_preset, collect_render_presets, file_safe_name, RenderEntry, RenderImage, RenderPreset,
    RenderSettings,
};
pub use replay::{CancelToken, Direction, ProgressCallback, ReplayProgress, ReplayStatus, ReplayTask};
pub use resolve::{format_camera_command, ResolveWarning, Variant, VariantCollector, VariantList};
pub use templates::Template;
pub use undo_stack::UndoStack;

pub mod camera {
    //! Camera command templates and the info rows of new camera items
    pub use crate::templates::{
        camera_command, camera_description, camera_item, CAMERA_COMMANDS, CAMERA_DESCRIPTIONS, CAMERA_EXAMPLE_INFO,
    };
}

pub mod presets {
    //! Builders for preset subtrees
    pub use crate::templates::{accepted_in_preset, render_preset, user_preset, RENDER_SETTING_DEFAULTS};
}

// Re-export the lower layers for convenience
pub use knecht_common::{CellValue, Cells, Column, ItemId, ItemKind, NodeData};
pub use knecht_document::{Document, IntegrityReport, NodeId, NodeKey};
