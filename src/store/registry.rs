//! Document/term graph queries.
//!
//! [`DocumentRegistry`] is a read-only façade over the engine's bidirectional
//! term <-> document associations: every term in the index, the terms of a
//! document, the documents containing a term, and occurrence frequencies.
//! These queries are the basis for building a lexicon or glossary, or for
//! discovering relationships between documents through shared vocabulary.
//!
//! The store must have been created with [`IndexKind::InvertedVector`];
//! otherwise every registry call fails fast with an unsupported-operation
//! error rather than masking the configuration mistake with empty results.

use crate::config::IndexKind;
use crate::engine::analyzer::is_numeric_term;
use crate::error::{Result, XystonError};
use crate::store::SearchStore;

/// Read-only façade over the term <-> document graph of one store.
///
/// Obtained from [`SearchStore::registry`]. Each query takes the read-class
/// lock for the duration of the underlying engine call. Unknown URIs and
/// terms yield empty results, not errors.
#[derive(Debug)]
pub struct DocumentRegistry<'a> {
    store: &'a SearchStore,
}

impl<'a> DocumentRegistry<'a> {
    pub(crate) fn new(store: &'a SearchStore) -> Self {
        DocumentRegistry { store }
    }

    fn prepare_query(&self) -> Result<()> {
        self.store.ensure_open()?;
        if self.store.analysis().index_kind != IndexKind::InvertedVector {
            return Err(XystonError::unsupported(
                "term queries require a store created with IndexKind::InvertedVector",
            ));
        }
        // Pending mutations must be applied for term queries to see them.
        self.store.flush_if_needed()
    }

    /// Whether all-numeric terms are suppressed from term listings.
    fn suppress_numeric(&self) -> bool {
        self.store.config().ignore_numeric_terms
    }

    /// Every term in the index with at least one posting.
    pub fn all_terms(&self) -> Result<Vec<String>> {
        self.prepare_query()?;
        let core = self.store.core();
        let _guard = core.locks.read();
        let terms = core.engine.all_terms()?;
        if self.suppress_numeric() {
            Ok(terms.into_iter().filter(|t| !is_numeric_term(t)).collect())
        } else {
            Ok(terms)
        }
    }

    /// The distinct terms contained in a document.
    pub fn terms_for_document(&self, uri: &str) -> Result<Vec<String>> {
        self.prepare_query()?;
        let core = self.store.core();
        let _guard = core.locks.read();
        let terms = core.engine.terms_for_document(uri)?;
        if self.suppress_numeric() {
            Ok(terms.into_iter().filter(|t| !is_numeric_term(t)).collect())
        } else {
            Ok(terms)
        }
    }

    /// The documents containing a term.
    pub fn documents_for_term(&self, term: &str) -> Result<Vec<String>> {
        self.prepare_query()?;
        let core = self.store.core();
        let _guard = core.locks.read();
        core.engine.documents_for_term(term)
    }

    /// Number of documents associated with a term, without retrieving them.
    pub fn document_count_for_term(&self, term: &str) -> Result<usize> {
        self.prepare_query()?;
        let core = self.store.core();
        let _guard = core.locks.read();
        core.engine.document_count_for_term(term)
    }

    /// Number of distinct terms in a document, without retrieving them.
    pub fn term_count_for_document(&self, uri: &str) -> Result<usize> {
        self.prepare_query()?;
        let core = self.store.core();
        let _guard = core.locks.read();
        core.engine.term_count_for_document(uri)
    }

    /// Number of times a term occurs in a document.
    pub fn frequency_of_term(&self, term: &str, uri: &str) -> Result<u64> {
        self.prepare_query()?;
        let core = self.store.core();
        let _guard = core.locks.read();
        core.engine.frequency(term, uri)
    }
}
