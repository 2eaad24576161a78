//! Configuration types for store creation and runtime behavior.
//!
//! [`AnalysisConfig`] is fixed at store creation and immutable for the life of
//! that store instance. [`StoreConfig`] carries the per-store runtime knobs:
//! fetch bounds, numeric-term suppression, and the asynchronous-indexing flag.
//! There is no process-wide default configuration; callers construct a value
//! once in their setup code and thread it explicitly into each store.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default English stop words list.
///
/// Short, common words with little semantic value that search indexes
/// generally avoid. Only English is shipped; callers may supply their own
/// set for other languages.
const DEFAULT_ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "all", "am", "an", "and", "any", "are", "as", "at", "be", "but", "by", "can", "did",
    "do", "for", "from", "had", "has", "have", "he", "her", "his", "if", "in", "into", "is",
    "it", "its", "me", "my", "no", "not", "of", "on", "or", "she", "so", "some", "such", "than",
    "that", "the", "their", "then", "there", "these", "they", "this", "to", "too", "was", "we",
    "were", "what", "when", "which", "who", "will", "with", "you", "your",
];

static ENGLISH_STOP_WORDS: LazyLock<HashSet<String>> = LazyLock::new(|| {
    DEFAULT_ENGLISH_STOP_WORDS
        .iter()
        .map(|word| word.to_string())
        .collect()
});

/// Get the built-in English stop word set.
pub fn english_stop_words() -> HashSet<String> {
    ENGLISH_STOP_WORDS.clone()
}

/// The kind of term/document mapping an index maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    /// Terms map to documents only. Supports searching, but not the
    /// term-oriented document graph queries.
    Inverted,

    /// Bidirectional term <-> document mapping. Required for the document
    /// registry queries (all terms, terms per document, frequencies).
    InvertedVector,
}

/// Text analysis options, fixed at store creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Words excluded from indexing.
    pub stop_words: HashSet<String>,

    /// Minimum length (in characters) for a token to be indexed.
    pub min_term_length: usize,

    /// Maximum number of distinct terms indexed per document. `None` means
    /// unlimited.
    pub max_terms_per_document: Option<usize>,

    /// Whether term positions are recorded, enabling phrase queries.
    pub proximity_indexing: bool,

    /// The term/document mapping kind.
    pub index_kind: IndexKind,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            stop_words: HashSet::new(),
            min_term_length: 1,
            max_terms_per_document: None,
            proximity_indexing: false,
            index_kind: IndexKind::InvertedVector,
        }
    }
}

/// Per-store runtime options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum elapsed time for a single match-fetch call against the engine.
    /// Caps one batch, not the total result count across a whole search.
    pub fetch_time: Duration,

    /// Maximum number of results returned by a single match-fetch call.
    pub fetch_count: usize,

    /// When set, all-numeric terms are suppressed from term listings. The
    /// terms are still indexed and searchable.
    pub ignore_numeric_terms: bool,

    /// When set, write operations are queued and applied by a dedicated
    /// worker thread instead of running on the caller's thread. Queued
    /// operations report success unconditionally; the true outcome is
    /// absorbed by the worker.
    pub concurrent_indexing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            fetch_time: Duration::from_millis(500),
            fetch_count: 100,
            ignore_numeric_terms: false,
            concurrent_indexing: false,
        }
    }
}

/// Options controlling how a query string is interpreted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Whitespace between terms means OR instead of the default AND.
    pub space_means_or: bool,

    /// Skip relevance scoring; every match is reported with a raw rank of 1.
    pub no_relevance_scores: bool,
}
