//! Index engine abstraction and common types.
//!
//! This module defines the [`IndexEngine`] trait, the boundary between the
//! store orchestration layer and the underlying full-text index engine. The
//! engine supplies the primitives: tokenize-and-index a document, remove a
//! document, query term/document associations, run a ranked match search,
//! flush, and compact. It guarantees internal thread safety for isolated
//! calls only; the store's lock discipline ensures that no more than one
//! writer is active and that maintenance excludes all other access.
//!
//! The reference implementation is [`MemoryEngine`] in the `memory` module.

pub mod analyzer;
pub mod memory;

use std::fmt::Debug;
use std::time::Duration;

use crate::config::SearchOptions;
use crate::document::{DocumentSource, IndexState, Properties};
use crate::error::Result;

pub use memory::MemoryEngine;

/// A single match produced by an engine search: a document URI and its raw,
/// unnormalized relevance rank.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineMatch {
    /// The matched document's URI.
    pub uri: String,

    /// Raw relevance rank. Unbounded; normalize before display.
    pub score: f32,
}

/// A trait for full-text index engines.
///
/// Methods take `&self`: an engine is internally thread-safe for isolated
/// calls, and callers serialize writers and maintenance externally. Boolean
/// returns report recoverable per-document outcomes (an unreadable file, an
/// unknown URI); `Err` is reserved for engine faults.
pub trait IndexEngine: Send + Sync + Debug {
    /// Tokenize and index a document under the given URI. Re-adding an
    /// existing URI replaces its previous indexing at the next flush.
    ///
    /// Returns `Ok(false)` when the engine rejects the document, for example
    /// an unreadable backing file.
    fn add_document(&self, uri: &str, source: &DocumentSource) -> Result<bool>;

    /// Remove the document with the given URI from the index.
    ///
    /// Returns `Ok(false)` when the URI is not present.
    fn remove_document(&self, uri: &str) -> Result<bool>;

    /// Associate arbitrary key-value metadata with a document.
    fn set_properties(&self, uri: &str, properties: Properties) -> Result<()>;

    /// Get the metadata associated with a document, if any.
    fn properties(&self, uri: &str) -> Result<Option<Properties>>;

    /// Set the display name of a document. Returns `Ok(false)` when the URI
    /// is not present.
    fn set_name(&self, uri: &str, name: &str) -> Result<bool>;

    /// Get the display name of a document, if any.
    fn name(&self, uri: &str) -> Result<Option<String>>;

    /// Get the index state of a document.
    fn document_state(&self, uri: &str) -> Result<IndexState>;

    /// List document URIs known to the engine.
    ///
    /// When `ignore_empty` is set, documents with zero applied terms are
    /// excluded, which under-reports recently added, not-yet-flushed
    /// documents. When unset, the listing may include entries a caller never
    /// explicitly added.
    fn all_documents(&self, ignore_empty: bool) -> Result<Vec<String>>;

    /// Apply pending adds and deletes and commit the index to its backing.
    fn flush(&self) -> Result<()>;

    /// Fraction of term entries that are orphaned leftovers of removed
    /// documents, in `[0, 1]`.
    fn bloat_ratio(&self) -> Result<f32>;

    /// Reclaim orphaned term entries. Potentially expensive; callers must
    /// exclude all other access for the duration.
    fn compact(&self) -> Result<()>;

    /// Begin evaluating a query. This does not block; matches are retrieved
    /// incrementally through the returned [`EngineSearch`].
    fn begin_search(&self, query: &str, options: &SearchOptions) -> Result<Box<dyn EngineSearch>>;

    /// List every term in the index with at least one posting.
    fn all_terms(&self) -> Result<Vec<String>>;

    /// List the distinct terms contained in a document. Empty for unknown
    /// URIs.
    fn terms_for_document(&self, uri: &str) -> Result<Vec<String>>;

    /// List the documents containing a term. Empty for unknown terms.
    fn documents_for_term(&self, term: &str) -> Result<Vec<String>>;

    /// Number of documents associated with a term.
    fn document_count_for_term(&self, term: &str) -> Result<usize>;

    /// Number of distinct terms associated with a document.
    fn term_count_for_document(&self, uri: &str) -> Result<usize>;

    /// Number of times a term occurs in a document.
    fn frequency(&self, term: &str, uri: &str) -> Result<u64>;

    /// Release the engine handle. Pending changes are not flushed.
    fn close(&self) -> Result<()>;
}

/// An in-flight, resumable engine search.
///
/// Matches are fetched in bounded batches until the engine reports
/// completion. The search may be abandoned at any point with
/// [`EngineSearch::cancel`].
pub trait EngineSearch: Send {
    /// Fetch one batch of matches, bounded by elapsed time and count. The
    /// bounds cap this single call, not the total across the search.
    ///
    /// Returns the batch and whether further matches may remain. A cancelled
    /// search returns an empty batch and `false`.
    fn fetch_matches(
        &mut self,
        max_time: Duration,
        max_count: usize,
    ) -> Result<(Vec<EngineMatch>, bool)>;

    /// Abandon the search. Safe to call in any state, including when no
    /// evaluation is in flight, and safe to call repeatedly.
    fn cancel(&mut self);
}

impl Debug for dyn EngineSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EngineSearch")
    }
}
