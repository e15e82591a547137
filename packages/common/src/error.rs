use crate::schema::Column;
use thiserror::Error;

/// Errors raised when a cell is written with a value it cannot hold
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CellError {
    #[error("Column {column:?} cannot hold a {found} value")]
    TypeMismatch { column: Column, found: &'static str },

    #[error("Invalid order value: {0:?}")]
    InvalidOrder(String),

    #[error("Invalid identity: {0:?}")]
    InvalidIdentity(String),
}
