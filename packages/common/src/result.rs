use crate::error::CellError;

/// Result type for cell reads and writes
pub type CellResult<T> = Result<T, CellError>;
