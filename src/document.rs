//! Document identity, content sources, and index state.
//!
//! A document is identified by its URI string. The URI may name a local file
//! or be an opaque application-defined resource identifier (for example
//! `myapp://entry/42`). Two documents are the same entity iff their URIs are
//! equal; changing a document's location is modeled as remove plus add, never
//! as an in-place rename.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Arbitrary key-value metadata associated with a document in the index.
pub type Properties = HashMap<String, serde_json::Value>;

/// The content backing a document: a local file or free-standing text.
///
/// A document is either file-backed or content-backed, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocumentSource {
    /// Content read from a local file, with an optional MIME type hint to
    /// help the engine pick a text importer.
    File {
        path: PathBuf,
        mime_hint: Option<String>,
    },

    /// Free-standing text content supplied by the caller.
    Text(String),
}

impl DocumentSource {
    /// Create a file-backed source.
    pub fn file<P: Into<PathBuf>>(path: P) -> Self {
        DocumentSource::File {
            path: path.into(),
            mime_hint: None,
        }
    }

    /// Create a file-backed source with a MIME type hint.
    pub fn file_with_hint<P: Into<PathBuf>, S: Into<String>>(path: P, mime_hint: S) -> Self {
        DocumentSource::File {
            path: path.into(),
            mime_hint: Some(mime_hint.into()),
        }
    }

    /// Create a content-backed source.
    pub fn text<S: Into<String>>(content: S) -> Self {
        DocumentSource::Text(content.into())
    }
}

/// The index state of a document.
///
/// The pending states exist between a mutating call and the next flush or
/// close boundary; afterwards a document is either `Indexed` or gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexState {
    /// The document is not in the index.
    NotIndexed,

    /// The document is indexed and searchable.
    Indexed,

    /// The document will enter the index at the next flush.
    PendingAdd,

    /// The document will leave the index at the next flush.
    PendingDelete,
}
