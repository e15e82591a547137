use crate::arena::NodeId;
use knecht_common::CellError;
use thiserror::Error;

pub type DocumentResult<T> = Result<T, DocumentError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    #[error("No row {row} under {parent:?}")]
    InvalidAddress { row: usize, parent: NodeId },

    #[error("The root node cannot be edited")]
    RootNotEditable,

    #[error("Cell error: {0}")]
    Cell(#[from] CellError),
}
