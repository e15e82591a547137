//! Loading and saving documents through the exchange codec.
//!
//! A failed load never yields a partial tree: the caller gets an empty
//! document together with the error.

use crate::errors::{EditorError, EditorResult};
use knecht_codec::{decode, encode};
use knecht_document::Document;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of a load: always a document, plus the error when reading failed
#[derive(Debug)]
pub struct Loaded {
    pub document: Document,
    pub error: Option<EditorError>,
}

impl Loaded {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> EditorResult<Document> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.document),
        }
    }
}

pub fn load_str(source: &str) -> Loaded {
    match decode(source) {
        Ok(roots) => Loaded {
            document: Document::from_roots(roots),
            error: None,
        },
        Err(err) => {
            warn!(error = %err, "could not decode document");
            Loaded {
                document: Document::new(),
                error: Some(err.into()),
            }
        }
    }
}

pub fn save_str(document: &Document) -> EditorResult<String> {
    Ok(encode(&document.top_level_data())?)
}

pub fn load_file(path: impl AsRef<Path>) -> Loaded {
    let path = path.as_ref();
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not read file");
            return Loaded {
                document: Document::new(),
                error: Some(err.into()),
            };
        }
    };

    let loaded = load_str(&source);
    if loaded.is_ok() {
        info!(path = %path.display(), nodes = loaded.document.len(), "loaded document");
    }
    loaded
}

pub fn save_file(document: &Document, path: impl AsRef<Path>) -> EditorResult<()> {
    let path = path.as_ref();
    let text = save_str(document)?;
    fs::write(path, text)?;
    info!(path = %path.display(), nodes = document.len(), "saved document");
    Ok(())
}
