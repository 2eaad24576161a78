//! Text analysis for the reference engine.
//!
//! Splits text on Unicode word boundaries (UAX #29), lowercases, and applies
//! the analysis options fixed at store creation: stop words, minimum term
//! length, and the per-document term cap.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::AnalysisConfig;

/// An analyzed document body: term frequencies and, when proximity indexing
/// is enabled, the token positions of each term.
#[derive(Debug, Clone, Default)]
pub struct AnalyzedText {
    /// Tokens in original order, after filtering.
    pub tokens: Vec<String>,
}

impl AnalyzedText {
    /// Number of tokens that survived filtering.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no tokens survived filtering.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Tokenize `text` according to the given analysis options.
///
/// Tokens are produced in document order. The `max_terms_per_document` cap
/// bounds the number of distinct terms: once the cap is reached, tokens
/// introducing a new term are dropped while occurrences of already-seen
/// terms still count.
pub fn analyze(text: &str, config: &AnalysisConfig) -> AnalyzedText {
    let mut tokens = Vec::new();
    let mut distinct = std::collections::HashSet::new();

    for word in text.unicode_words() {
        let token = word.to_lowercase();

        if token.chars().count() < config.min_term_length {
            continue;
        }
        if config.stop_words.contains(&token) {
            continue;
        }
        if !distinct.contains(&token) {
            if let Some(max) = config.max_terms_per_document {
                if distinct.len() >= max {
                    continue;
                }
            }
            distinct.insert(token.clone());
        }

        tokens.push(token);
    }

    AnalyzedText { tokens }
}

/// Whether a term consists entirely of numeric characters.
pub fn is_numeric_term(term: &str) -> bool {
    !term.is_empty() && term.chars().all(|c| c.is_numeric())
}
