//! In-memory reference engine implementation.
//!
//! `MemoryEngine` is a complete, self-contained [`IndexEngine`] backed by a
//! bidirectional term <-> document postings map. It is useful for testing and
//! for applications whose corpus fits in memory. A store opened from a path
//! persists a checksummed snapshot of the index on every flush and reloads it
//! on open.
//!
//! Adds and removes are buffered and applied at `flush`; until then the
//! affected documents report the pending states and their terms are not
//! searchable.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::{AnalysisConfig, SearchOptions};
use crate::document::{DocumentSource, IndexState, Properties};
use crate::engine::analyzer::{self, AnalyzedText};
use crate::engine::{EngineMatch, EngineSearch, IndexEngine};
use crate::error::{Result, XystonError};

/// Hash map used on the engine's hot paths.
pub(crate) type FastMap<K, V> = HashMap<K, V, ahash::RandomState>;

/// Leading bytes of a persisted snapshot.
const SNAPSHOT_MAGIC: &[u8; 4] = b"XYS1";

/// Term frequencies of a single document body, with token positions when
/// proximity indexing is enabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TermVector {
    frequencies: FastMap<String, u64>,
    positions: Option<FastMap<String, Vec<u32>>>,
}

impl TermVector {
    fn from_analyzed(text: &AnalyzedText, proximity: bool) -> TermVector {
        let mut frequencies: FastMap<String, u64> = FastMap::default();
        let mut positions: Option<FastMap<String, Vec<u32>>> =
            if proximity { Some(FastMap::default()) } else { None };

        for (index, token) in text.tokens.iter().enumerate() {
            *frequencies.entry(token.clone()).or_insert(0) += 1;
            if let Some(positions) = positions.as_mut() {
                positions.entry(token.clone()).or_default().push(index as u32);
            }
        }

        TermVector {
            frequencies,
            positions,
        }
    }
}

/// Everything the engine knows about one document URI.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocRecord {
    state: IndexState,
    name: Option<String>,
    properties: Properties,
    /// Terms currently visible in the postings map.
    applied: TermVector,
    /// Analyzed content awaiting the next flush.
    pending: Option<TermVector>,
}

impl DocRecord {
    fn new() -> Self {
        DocRecord {
            state: IndexState::NotIndexed,
            name: None,
            properties: Properties::new(),
            applied: TermVector::default(),
            pending: None,
        }
    }
}

/// The engine's shared index state. A term entry whose posting map is empty
/// is an orphan left behind by document removal; orphans are invisible to
/// queries and reclaimed by compaction.
#[derive(Debug, Default, Serialize, Deserialize)]
struct EngineState {
    docs: FastMap<String, DocRecord>,
    postings: FastMap<String, FastMap<String, u64>>,
    #[serde(skip)]
    closed: bool,
}

impl EngineState {
    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(XystonError::engine("engine is closed"))
        } else {
            Ok(())
        }
    }

    /// Number of documents with at least one applied term.
    fn live_doc_count(&self) -> usize {
        self.docs
            .values()
            .filter(|record| !record.applied.frequencies.is_empty())
            .count()
    }
}

fn unpost(postings: &mut FastMap<String, FastMap<String, u64>>, uri: &str, vector: &TermVector) {
    for term in vector.frequencies.keys() {
        if let Some(map) = postings.get_mut(term) {
            map.remove(uri);
        }
    }
}

fn post(postings: &mut FastMap<String, FastMap<String, u64>>, uri: &str, vector: &TermVector) {
    for (term, frequency) in &vector.frequencies {
        postings
            .entry(term.clone())
            .or_default()
            .insert(uri.to_string(), *frequency);
    }
}

fn encode_snapshot(state: &EngineState) -> Result<Vec<u8>> {
    let payload = bincode::serialize(state)
        .map_err(|e| XystonError::engine(format!("snapshot encode failed: {e}")))?;

    let mut bytes = Vec::with_capacity(payload.len() + 8);
    bytes.extend_from_slice(SNAPSHOT_MAGIC);
    bytes.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

fn decode_snapshot(bytes: &[u8]) -> Result<EngineState> {
    if bytes.len() < 8 || &bytes[..4] != SNAPSHOT_MAGIC {
        return Err(XystonError::engine("snapshot header mismatch"));
    }

    let stored = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let payload = &bytes[8..];
    if crc32fast::hash(payload) != stored {
        return Err(XystonError::engine("snapshot checksum mismatch"));
    }

    bincode::deserialize(payload)
        .map_err(|e| XystonError::engine(format!("snapshot decode failed: {e}")))
}

/// An in-memory inverted index engine with optional snapshot persistence.
#[derive(Debug)]
pub struct MemoryEngine {
    analysis: AnalysisConfig,
    path: Option<PathBuf>,
    state: Arc<RwLock<EngineState>>,
}

impl MemoryEngine {
    /// Create an empty in-memory engine.
    pub fn new(analysis: AnalysisConfig) -> Self {
        MemoryEngine {
            analysis,
            path: None,
            state: Arc::new(RwLock::new(EngineState::default())),
        }
    }

    /// Open an engine backed by a snapshot file at `path`.
    ///
    /// Returns the engine and whether a new empty index was created. A
    /// missing, truncated, or corrupted snapshot yields a fresh index with
    /// the created flag set, so callers can detect the loss and rebuild.
    pub fn open_path<P: AsRef<Path>>(path: P, analysis: AnalysisConfig) -> (Self, bool) {
        let path = path.as_ref().to_path_buf();
        let loaded = fs::read(&path)
            .ok()
            .and_then(|bytes| decode_snapshot(&bytes).ok());
        let did_create = loaded.is_none();

        let engine = MemoryEngine {
            analysis,
            path: Some(path),
            state: Arc::new(RwLock::new(loaded.unwrap_or_default())),
        };
        (engine, did_create)
    }

    /// Restore an in-memory engine from snapshot bytes previously produced
    /// by [`MemoryEngine::snapshot_bytes`].
    pub fn from_snapshot(bytes: &[u8], analysis: AnalysisConfig) -> Result<Self> {
        let state = decode_snapshot(bytes)?;
        Ok(MemoryEngine {
            analysis,
            path: None,
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// Encode the current index as snapshot bytes. Pending changes are not
    /// included; call `flush` first to capture them.
    pub fn snapshot_bytes(&self) -> Result<Vec<u8>> {
        let state = self.state.read();
        state.check_open()?;
        encode_snapshot(&state)
    }

    /// The analysis options this engine was created with.
    pub fn analysis(&self) -> &AnalysisConfig {
        &self.analysis
    }
}

impl IndexEngine for MemoryEngine {
    fn add_document(&self, uri: &str, source: &DocumentSource) -> Result<bool> {
        let text = match source {
            DocumentSource::Text(content) => content.clone(),
            DocumentSource::File { path, .. } => match fs::read_to_string(path) {
                Ok(content) => content,
                // An unreadable backing file is a per-document failure, not
                // an engine fault.
                Err(_) => return Ok(false),
            },
        };

        let analyzed = analyzer::analyze(&text, &self.analysis);
        let vector = TermVector::from_analyzed(&analyzed, self.analysis.proximity_indexing);

        let mut state = self.state.write();
        state.check_open()?;

        let record = state
            .docs
            .entry(uri.to_string())
            .or_insert_with(DocRecord::new);
        record.pending = Some(vector);
        if record.state != IndexState::Indexed {
            record.state = IndexState::PendingAdd;
        }
        Ok(true)
    }

    fn remove_document(&self, uri: &str) -> Result<bool> {
        let mut state = self.state.write();
        state.check_open()?;

        match state.docs.get_mut(uri) {
            Some(record) if record.state != IndexState::NotIndexed => {
                record.state = IndexState::PendingDelete;
                record.pending = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn set_properties(&self, uri: &str, properties: Properties) -> Result<()> {
        let mut state = self.state.write();
        state.check_open()?;

        // Setting properties on an unknown URI creates a bare entry; such
        // entries show up in unfiltered document listings.
        let record = state
            .docs
            .entry(uri.to_string())
            .or_insert_with(DocRecord::new);
        record.properties = properties;
        Ok(())
    }

    fn properties(&self, uri: &str) -> Result<Option<Properties>> {
        let state = self.state.read();
        state.check_open()?;
        Ok(state.docs.get(uri).map(|record| record.properties.clone()))
    }

    fn set_name(&self, uri: &str, name: &str) -> Result<bool> {
        let mut state = self.state.write();
        state.check_open()?;

        match state.docs.get_mut(uri) {
            Some(record) => {
                record.name = Some(name.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn name(&self, uri: &str) -> Result<Option<String>> {
        let state = self.state.read();
        state.check_open()?;
        Ok(state.docs.get(uri).and_then(|record| record.name.clone()))
    }

    fn document_state(&self, uri: &str) -> Result<IndexState> {
        let state = self.state.read();
        state.check_open()?;
        Ok(state
            .docs
            .get(uri)
            .map(|record| record.state)
            .unwrap_or(IndexState::NotIndexed))
    }

    fn all_documents(&self, ignore_empty: bool) -> Result<Vec<String>> {
        let state = self.state.read();
        state.check_open()?;

        let mut uris: Vec<String> = state
            .docs
            .iter()
            .filter(|(_, record)| {
                if ignore_empty {
                    record.state != IndexState::PendingDelete
                        && !record.applied.frequencies.is_empty()
                } else {
                    true
                }
            })
            .map(|(uri, _)| uri.clone())
            .collect();
        uris.sort();
        Ok(uris)
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.write();
        state.check_open()?;

        let uris: Vec<String> = state.docs.keys().cloned().collect();
        let EngineState { docs, postings, .. } = &mut *state;

        for uri in uris {
            let Some(record) = docs.get_mut(&uri) else {
                continue;
            };
            if record.state == IndexState::PendingDelete {
                unpost(postings, &uri, &record.applied);
                docs.remove(&uri);
            } else if let Some(pending) = record.pending.take() {
                unpost(postings, &uri, &record.applied);
                post(postings, &uri, &pending);
                record.applied = pending;
                record.state = IndexState::Indexed;
            }
        }

        if let Some(path) = &self.path {
            fs::write(path, encode_snapshot(&state)?)?;
        }
        Ok(())
    }

    fn bloat_ratio(&self) -> Result<f32> {
        let state = self.state.read();
        state.check_open()?;

        let total = state.postings.len();
        if total == 0 {
            return Ok(0.0);
        }
        let orphans = state.postings.values().filter(|map| map.is_empty()).count();
        Ok(orphans as f32 / total as f32)
    }

    fn compact(&self) -> Result<()> {
        let mut state = self.state.write();
        state.check_open()?;

        state.postings.retain(|_, map| !map.is_empty());

        if let Some(path) = &self.path {
            fs::write(path, encode_snapshot(&state)?)?;
        }
        Ok(())
    }

    fn begin_search(&self, query: &str, options: &SearchOptions) -> Result<Box<dyn EngineSearch>> {
        self.state.read().check_open()?;
        let clauses = parse_query(query, &self.analysis)?;

        Ok(Box::new(MemorySearch {
            state: Arc::clone(&self.state),
            options: options.clone(),
            proximity: self.analysis.proximity_indexing,
            clauses,
            results: None,
            cursor: 0,
            cancelled: false,
        }))
    }

    fn all_terms(&self) -> Result<Vec<String>> {
        let state = self.state.read();
        state.check_open()?;

        let mut terms: Vec<String> = state
            .postings
            .iter()
            .filter(|(_, map)| !map.is_empty())
            .map(|(term, _)| term.clone())
            .collect();
        terms.sort();
        Ok(terms)
    }

    fn terms_for_document(&self, uri: &str) -> Result<Vec<String>> {
        let state = self.state.read();
        state.check_open()?;

        let mut terms: Vec<String> = state
            .docs
            .get(uri)
            .map(|record| record.applied.frequencies.keys().cloned().collect())
            .unwrap_or_default();
        terms.sort();
        Ok(terms)
    }

    fn documents_for_term(&self, term: &str) -> Result<Vec<String>> {
        let state = self.state.read();
        state.check_open()?;

        let mut uris: Vec<String> = state
            .postings
            .get(term)
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        uris.sort();
        Ok(uris)
    }

    fn document_count_for_term(&self, term: &str) -> Result<usize> {
        let state = self.state.read();
        state.check_open()?;
        Ok(state.postings.get(term).map(|map| map.len()).unwrap_or(0))
    }

    fn term_count_for_document(&self, uri: &str) -> Result<usize> {
        let state = self.state.read();
        state.check_open()?;
        Ok(state
            .docs
            .get(uri)
            .map(|record| record.applied.frequencies.len())
            .unwrap_or(0))
    }

    fn frequency(&self, term: &str, uri: &str) -> Result<u64> {
        let state = self.state.read();
        state.check_open()?;
        Ok(state
            .postings
            .get(term)
            .and_then(|map| map.get(uri))
            .copied()
            .unwrap_or(0))
    }

    fn close(&self) -> Result<()> {
        self.state.write().closed = true;
        Ok(())
    }
}

/// One parsed query clause.
#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Term(String),
    Prefix(String),
    Phrase(Vec<String>),
}

/// Parse a query string into clauses.
///
/// Terms are whitespace-separated and matched exactly after analysis; a
/// trailing `*` requests prefix matching; double quotes group a phrase.
/// Analysis drops stop words and short tokens from the query the same way
/// indexing drops them from documents.
fn parse_query(query: &str, analysis: &AnalysisConfig) -> Result<Vec<Clause>> {
    let mut clauses = Vec::new();
    let mut rest = query.trim();

    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('"') {
            let Some(end) = stripped.find('"') else {
                return Err(XystonError::query("unbalanced quote in query"));
            };
            let tokens = analyzer::analyze(&stripped[..end], analysis).tokens;
            match tokens.len() {
                0 => {}
                1 => clauses.push(Clause::Term(tokens.into_iter().next().unwrap_or_default())),
                _ => clauses.push(Clause::Phrase(tokens)),
            }
            rest = stripped[end + 1..].trim_start();
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let word = &rest[..end];
            if let Some(stem) = word.strip_suffix('*') {
                let stem = stem.to_lowercase();
                if !stem.is_empty() {
                    clauses.push(Clause::Prefix(stem));
                }
            } else {
                for token in analyzer::analyze(word, analysis).tokens {
                    clauses.push(Clause::Term(token));
                }
            }
            rest = rest[end..].trim_start();
        }
    }

    Ok(clauses)
}

fn idf(total_docs: usize, doc_frequency: usize) -> f32 {
    (1.0 + total_docs as f32 / doc_frequency as f32).ln()
}

/// Count occurrences of `terms` at consecutive positions in one document.
fn phrase_occurrences(vector: &TermVector, terms: &[String]) -> Option<u64> {
    let positions = vector.positions.as_ref()?;
    let first = positions.get(terms.first()?)?;

    let mut count = 0;
    'starts: for &start in first {
        for (offset, term) in terms.iter().enumerate().skip(1) {
            let Some(term_positions) = positions.get(term) else {
                continue 'starts;
            };
            if !term_positions.contains(&(start + offset as u32)) {
                continue 'starts;
            }
        }
        count += 1;
    }
    Some(count)
}

/// Evaluate one clause to a map of matching URIs and partial scores.
fn evaluate_clause(
    state: &EngineState,
    clause: &Clause,
    total_docs: usize,
    proximity: bool,
) -> FastMap<String, f32> {
    let mut scores: FastMap<String, f32> = FastMap::default();

    match clause {
        Clause::Term(term) => {
            if let Some(map) = state.postings.get(term) {
                if !map.is_empty() {
                    let weight = idf(total_docs, map.len());
                    for (uri, frequency) in map {
                        *scores.entry(uri.clone()).or_insert(0.0) += *frequency as f32 * weight;
                    }
                }
            }
        }
        Clause::Prefix(stem) => {
            for (term, map) in &state.postings {
                if map.is_empty() || !term.starts_with(stem.as_str()) {
                    continue;
                }
                let weight = idf(total_docs, map.len());
                for (uri, frequency) in map {
                    *scores.entry(uri.clone()).or_insert(0.0) += *frequency as f32 * weight;
                }
            }
        }
        Clause::Phrase(terms) => {
            // Candidates must contain every phrase term.
            let Some(first) = state.postings.get(&terms[0]) else {
                return scores;
            };
            let weight: f32 = terms
                .iter()
                .map(|term| {
                    state
                        .postings
                        .get(term)
                        .filter(|map| !map.is_empty())
                        .map(|map| idf(total_docs, map.len()))
                        .unwrap_or(0.0)
                })
                .sum();

            'candidates: for uri in first.keys() {
                let Some(record) = state.docs.get(uri) else {
                    continue;
                };
                let mut min_frequency = u64::MAX;
                for term in terms {
                    match record.applied.frequencies.get(term) {
                        Some(frequency) => min_frequency = min_frequency.min(*frequency),
                        None => continue 'candidates,
                    }
                }

                // With positions recorded, require the terms to be adjacent;
                // without them, degrade to an AND over the phrase terms.
                let frequency = if proximity {
                    match phrase_occurrences(&record.applied, terms) {
                        Some(0) => continue,
                        Some(count) => count,
                        None => min_frequency,
                    }
                } else {
                    min_frequency
                };

                scores.insert(uri.clone(), frequency as f32 * weight);
            }
        }
    }

    scores
}

fn evaluate(
    state: &EngineState,
    clauses: &[Clause],
    options: &SearchOptions,
    proximity: bool,
) -> Vec<EngineMatch> {
    if clauses.is_empty() {
        return Vec::new();
    }

    let total_docs = state.live_doc_count().max(1);
    let mut combined: Option<FastMap<String, f32>> = None;

    for clause in clauses {
        let scores = evaluate_clause(state, clause, total_docs, proximity);
        combined = Some(match combined.take() {
            None => scores,
            Some(mut accumulated) => {
                if options.space_means_or {
                    for (uri, score) in scores {
                        *accumulated.entry(uri).or_insert(0.0) += score;
                    }
                    accumulated
                } else {
                    // AND: keep only documents matched by every clause.
                    let mut intersection = FastMap::default();
                    for (uri, score) in scores {
                        if let Some(previous) = accumulated.get(&uri) {
                            intersection.insert(uri, previous + score);
                        }
                    }
                    intersection
                }
            }
        });
    }

    let mut matches: Vec<EngineMatch> = combined
        .unwrap_or_default()
        .into_iter()
        .map(|(uri, score)| EngineMatch {
            uri,
            score: if options.no_relevance_scores { 1.0 } else { score },
        })
        .collect();

    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.uri.cmp(&b.uri))
    });
    matches
}

/// A resumable search over a [`MemoryEngine`].
///
/// Evaluation is deferred to the first `fetch_matches` call; `begin_search`
/// never blocks.
struct MemorySearch {
    state: Arc<RwLock<EngineState>>,
    options: SearchOptions,
    proximity: bool,
    clauses: Vec<Clause>,
    results: Option<Vec<EngineMatch>>,
    cursor: usize,
    cancelled: bool,
}

impl EngineSearch for MemorySearch {
    fn fetch_matches(
        &mut self,
        _max_time: Duration,
        max_count: usize,
    ) -> Result<(Vec<EngineMatch>, bool)> {
        if self.cancelled || max_count == 0 {
            return Ok((Vec::new(), false));
        }

        if self.results.is_none() {
            let state = self.state.read();
            state.check_open()?;
            self.results = Some(evaluate(&state, &self.clauses, &self.options, self.proximity));
        }
        let Some(results) = self.results.as_ref() else {
            return Ok((Vec::new(), false));
        };

        let end = (self.cursor + max_count).min(results.len());
        let batch = results[self.cursor..end].to_vec();
        self.cursor = end;

        // A full batch may mean further matches remain; the next call finds
        // out. A short batch is definitive.
        let more = batch.len() == max_count;
        Ok((batch, more))
    }

    fn cancel(&mut self) {
        self.cancelled = true;
        self.results = None;
    }
}
