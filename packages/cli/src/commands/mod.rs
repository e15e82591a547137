pub mod convert;
pub mod info;
pub mod init;
pub mod resolve;
pub mod validate;

pub use convert::{convert, ConvertArgs};
pub use info::{info, InfoArgs};
pub use init::{init, InitArgs};
pub use resolve::{resolve, ResolveArgs};
pub use validate::{validate, ValidateArgs};

use anyhow::{anyhow, Result};
use knecht_codec::format_error;
use knecht_editor::{load_str, Document, EditorError};
use std::fs;
use std::path::Path;

/// Read and decode an exchange file, rendering decode errors against the source
pub(crate) fn open_document(path: &Path) -> Result<Document> {
    let source = fs::read_to_string(path).map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))?;
    let loaded = load_str(&source);

    match loaded.error {
        None => Ok(loaded.document),
        Some(EditorError::Codec(err)) => {
            let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown");
            Err(anyhow!("\n{}", format_error(&source, file_name, &err)))
        }
        Some(err) => Err(err.into()),
    }
}
