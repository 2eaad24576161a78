//! Search session state machine.
//!
//! Searching is a two-stage protocol: `prepare` starts the engine evaluating
//! a query, then repeated `fetch` calls drain bounded batches of matches
//! until the engine reports completion. A store holds at most one session;
//! preparing a new search implicitly cancels a session that is still active.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::EngineSearch;
use crate::error::{Result, XystonError};

/// The lifecycle state of a search session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No search has been prepared.
    Idle,

    /// A search is in flight; matches remain to be fetched.
    Active,

    /// The engine reported completion; every match has been fetched.
    Exhausted,

    /// The search was abandoned before completion.
    Cancelled,
}

/// One scored search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// The matched document's URI.
    pub uri: String,

    /// Raw relevance rank as reported by the engine. Not normalized; see
    /// [`crate::normalize::normalize_ranks`].
    pub score: f32,
}

/// The outcome of one fetch call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchBatch {
    /// Matches in engine order, typically rank-descending.
    pub hits: Vec<SearchHit>,

    /// Whether further matches may remain. `true` means call again.
    pub more: bool,
}

/// The per-store search session.
#[derive(Debug)]
pub(crate) struct SearchSession {
    state: SessionState,
    search: Option<Box<dyn EngineSearch>>,
}

impl SearchSession {
    pub fn new() -> Self {
        SearchSession {
            state: SessionState::Idle,
            search: None,
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a search is currently active.
    pub fn is_searching(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Install a freshly begun engine search, cancelling any session that is
    /// not already terminal.
    pub fn prepare(&mut self, search: Box<dyn EngineSearch>) {
        self.cancel();
        self.search = Some(search);
        self.state = SessionState::Active;
    }

    /// Abandon the in-flight search, if any.
    ///
    /// Unconditional and idempotent: calling with no active session, or
    /// calling twice in a row, changes no observable state.
    pub fn cancel(&mut self) {
        if let Some(mut search) = self.search.take() {
            search.cancel();
        }
        if self.state == SessionState::Active {
            self.state = SessionState::Cancelled;
        }
    }

    /// Fetch one batch of results, or every remaining batch when
    /// `until_exhausted` is set.
    ///
    /// The caller must hold the read-class lock for the duration. A session
    /// that is not active returns an empty terminal batch immediately.
    pub fn fetch(
        &mut self,
        max_time: Duration,
        max_count: usize,
        until_exhausted: bool,
    ) -> Result<FetchBatch> {
        if self.state != SessionState::Active {
            return Ok(FetchBatch::default());
        }
        let Some(search) = self.search.as_mut() else {
            return Err(XystonError::store("active session lost its engine search"));
        };

        let mut hits = Vec::new();
        loop {
            let (matches, more) = search.fetch_matches(max_time, max_count)?;
            hits.extend(matches.into_iter().map(|m| SearchHit {
                uri: m.uri,
                score: m.score,
            }));

            if !more {
                self.state = SessionState::Exhausted;
                self.search = None;
                return Ok(FetchBatch { hits, more: false });
            }
            if !until_exhausted {
                return Ok(FetchBatch { hits, more: true });
            }
        }
    }
}
