//! Error types for the editor

use knecht_codec::CodecError;
use knecht_document::{DocumentError, NodeId};
use thiserror::Error;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("A replay is still in progress")]
    ReplayInProgress,

    #[error("Cannot move rows across different parents")]
    MoveAcrossParents,

    #[error("Column {0} is not editable")]
    NotEditable(&'static str),

    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    #[error("Clipboard is empty")]
    EmptyClipboard,
}
