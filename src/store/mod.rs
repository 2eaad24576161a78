//! Store orchestration over an index engine.
//!
//! [`SearchStore`] owns an engine handle and makes concurrent use of it safe:
//! write operations serialize through the lock manager (directly, or via the
//! asynchronous indexing queue), searches run through the two-stage
//! prepare/fetch session, and maintenance excludes everything else for its
//! duration. Callers on separate threads do not need to coordinate.

pub mod lock;
pub(crate) mod queue;
pub mod registry;
pub mod session;

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use parking_lot::Mutex;

use crate::config::{AnalysisConfig, SearchOptions, StoreConfig};
use crate::document::{DocumentSource, IndexState, Properties};
use crate::engine::{IndexEngine, MemoryEngine};
use crate::error::{Result, XystonError};
use crate::store::lock::LockManager;
use crate::store::queue::{IndexingQueue, WriteTask};
use crate::store::registry::DocumentRegistry;
use crate::store::session::{FetchBatch, SearchHit, SearchSession, SessionState};

/// The engine handle and the synchronization state shared with the queue
/// worker.
#[derive(Debug)]
pub(crate) struct StoreCore {
    pub(crate) engine: Box<dyn IndexEngine>,
    pub(crate) locks: LockManager,
    changes: AtomicU64,
    closed: AtomicBool,
}

impl StoreCore {
    pub(crate) fn new(engine: Box<dyn IndexEngine>) -> Self {
        StoreCore {
            engine,
            locks: LockManager::new(),
            changes: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Run one write task under the write-class lock.
    pub(crate) fn apply_write(&self, task: WriteTask) -> Result<bool> {
        let _guard = self.locks.write();
        let outcome = match task {
            WriteTask::Add { uri, source } => self.engine.add_document(&uri, &source)?,
            WriteTask::Remove { uri } => self.engine.remove_document(&uri)?,
            WriteTask::Replace {
                old_uri,
                new_uri,
                source,
            } => {
                // The old and new URI are distinct identities to the engine;
                // removing first avoids orphaning the old content.
                self.engine.remove_document(&old_uri)?;
                self.engine.add_document(&new_uri, &source)?
            }
            WriteTask::SetProperties { uri, properties } => {
                self.engine.set_properties(&uri, properties)?;
                true
            }
            WriteTask::SetName { uri, name } => self.engine.set_name(&uri, &name)?,
        };
        self.changes.fetch_add(1, Ordering::Release);
        Ok(outcome)
    }
}

/// A thread-safe document store over a full-text index engine.
///
/// Indexing, searching, and maintenance may be invoked from any number of
/// threads; the store enforces the engine's single-writer contract
/// internally. Search follows a two-stage protocol: [`prepare_search`] starts
/// the engine evaluating, then [`fetch_results`] drains bounded batches until
/// it reports no more. [`search_stream`] wraps the same protocol in an
/// iterator that cancels on drop.
///
/// [`prepare_search`]: SearchStore::prepare_search
/// [`fetch_results`]: SearchStore::fetch_results
/// [`search_stream`]: SearchStore::search_stream
#[derive(Debug)]
pub struct SearchStore {
    core: Arc<StoreCore>,
    analysis: AnalysisConfig,
    config: StoreConfig,
    session: Mutex<SearchSession>,
    queue: Option<IndexingQueue>,
    did_create: bool,
}

impl SearchStore {
    /// Create a store over an already-opened engine handle.
    ///
    /// `did_create` records whether the engine created a new empty index
    /// rather than opening an existing one.
    pub fn with_engine(
        engine: Box<dyn IndexEngine>,
        did_create: bool,
        analysis: AnalysisConfig,
        config: StoreConfig,
    ) -> Result<Self> {
        let core = Arc::new(StoreCore::new(engine));
        let queue = if config.concurrent_indexing {
            Some(IndexingQueue::start(Arc::clone(&core))?)
        } else {
            None
        };

        Ok(SearchStore {
            core,
            analysis,
            config,
            session: Mutex::new(SearchSession::new()),
            queue,
            did_create,
        })
    }

    /// Create an empty in-memory store.
    pub fn open_in_memory(analysis: AnalysisConfig, config: StoreConfig) -> Result<Self> {
        let engine = MemoryEngine::new(analysis.clone());
        Self::with_engine(Box::new(engine), true, analysis, config)
    }

    /// Open or create a store backed by a snapshot file.
    ///
    /// Check [`SearchStore::did_create_store`] afterwards: a missing or
    /// corrupted prior snapshot yields a fresh empty index, and the flag is
    /// the caller's opportunity to rebuild.
    pub fn open_path<P: AsRef<Path>>(
        path: P,
        analysis: AnalysisConfig,
        config: StoreConfig,
    ) -> Result<Self> {
        let (engine, did_create) = MemoryEngine::open_path(path, analysis.clone());
        Self::with_engine(Box::new(engine), did_create, analysis, config)
    }

    /// Whether the engine created a new empty index at open time.
    pub fn did_create_store(&self) -> bool {
        self.did_create
    }

    /// The analysis options this store was created with.
    pub fn analysis(&self) -> &AnalysisConfig {
        &self.analysis
    }

    /// The runtime options this store was created with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Direct access to the engine handle.
    ///
    /// Callers going through the store get the lock discipline for free.
    /// When calling the engine directly, use [`SearchStore::lock_manager`]
    /// to uphold the single-writer contract yourself.
    pub fn engine(&self) -> &dyn IndexEngine {
        self.core.engine.as_ref()
    }

    /// The lock manager guarding this store's engine handle.
    pub fn lock_manager(&self) -> &LockManager {
        &self.core.locks
    }

    pub(crate) fn core(&self) -> &StoreCore {
        &self.core
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.core.closed.load(Ordering::Acquire) {
            Err(XystonError::lifecycle("store is closed"))
        } else {
            Ok(())
        }
    }

    /// Apply pending mutations when any write happened since the last flush.
    /// Searches and term queries call this so they observe prior writes.
    pub(crate) fn flush_if_needed(&self) -> Result<()> {
        if self.core.changes.load(Ordering::Acquire) == 0 {
            return Ok(());
        }
        let _guard = self.core.locks.write();
        if self.core.changes.swap(0, Ordering::AcqRel) > 0 {
            self.core.engine.flush()?;
        }
        Ok(())
    }

    /// Route a write task through the queue or run it synchronously.
    fn write_op(&self, task: WriteTask) -> Result<bool> {
        self.ensure_open()?;
        match &self.queue {
            Some(queue) => {
                // Queued writes report success unconditionally; the worker
                // absorbs the engine's true outcome.
                queue.submit(task)?;
                Ok(true)
            }
            None => self.core.apply_write(task),
        }
    }

    /// Tokenize and index a document under the given URI.
    ///
    /// Returns whether the document was indexed. With asynchronous indexing
    /// enabled, the return value is always `true` regardless of the eventual
    /// outcome.
    pub fn add_document(&self, uri: &str, source: DocumentSource) -> Result<bool> {
        self.write_op(WriteTask::Add {
            uri: uri.to_string(),
            source,
        })
    }

    /// Remove a document from the index.
    pub fn remove_document(&self, uri: &str) -> Result<bool> {
        self.write_op(WriteTask::Remove {
            uri: uri.to_string(),
        })
    }

    /// Replace a document whose URI changed: remove the old identity and
    /// index the new one under a single write-lock hold.
    ///
    /// Re-adding under an unchanged URI does not need this; plain
    /// [`SearchStore::add_document`] replaces the previous indexing.
    pub fn replace_document(
        &self,
        old_uri: &str,
        new_uri: &str,
        source: DocumentSource,
    ) -> Result<bool> {
        self.write_op(WriteTask::Replace {
            old_uri: old_uri.to_string(),
            new_uri: new_uri.to_string(),
            source,
        })
    }

    /// Associate arbitrary key-value metadata with a document.
    pub fn set_properties(&self, uri: &str, properties: Properties) -> Result<()> {
        self.write_op(WriteTask::SetProperties {
            uri: uri.to_string(),
            properties,
        })
        .map(|_| ())
    }

    /// Get the metadata associated with a document.
    pub fn properties(&self, uri: &str) -> Result<Option<Properties>> {
        self.ensure_open()?;
        let _guard = self.core.locks.read();
        self.core.engine.properties(uri)
    }

    /// Set a document's display name.
    pub fn set_name(&self, uri: &str, name: &str) -> Result<bool> {
        self.write_op(WriteTask::SetName {
            uri: uri.to_string(),
            name: name.to_string(),
        })
    }

    /// Get a document's display name.
    pub fn name(&self, uri: &str) -> Result<Option<String>> {
        self.ensure_open()?;
        let _guard = self.core.locks.read();
        self.core.engine.name(uri)
    }

    /// The index state of a document.
    pub fn document_state(&self, uri: &str) -> Result<IndexState> {
        self.ensure_open()?;
        let _guard = self.core.locks.read();
        self.core.engine.document_state(uri)
    }

    /// List document URIs in the index.
    ///
    /// With `ignore_empty` set, documents with zero indexed terms are
    /// excluded, which can under-report recently added, not-yet-flushed
    /// documents. Without it, the listing may include engine-internal
    /// entries never explicitly added. Callers needing an authoritative
    /// list should keep their own ledger of added URIs.
    pub fn all_documents(&self, ignore_empty: bool) -> Result<Vec<String>> {
        self.ensure_open()?;
        let _guard = self.core.locks.read();
        self.core.engine.all_documents(ignore_empty)
    }

    /// The term/document graph query façade.
    pub fn registry(&self) -> DocumentRegistry<'_> {
        DocumentRegistry::new(self)
    }

    /// Start evaluating a query, cancelling any still-active prior search.
    /// This call does not block on evaluation.
    pub fn prepare_search(&self, query: &str, options: &SearchOptions) -> Result<()> {
        self.ensure_open()?;
        self.flush_if_needed()?;

        let mut session = self.session.lock();
        session.cancel();
        let search = {
            let _guard = self.core.locks.read();
            self.core.engine.begin_search(query, options)?
        };
        session.prepare(search);
        Ok(())
    }

    /// Fetch the next batch of results, bounded by the store's fetch time
    /// and count; with `until_exhausted`, keep fetching and return
    /// everything.
    ///
    /// The returned batch's `more` flag is `true` while further calls may
    /// yield results. Without an active search this returns an empty
    /// terminal batch.
    pub fn fetch_results(&self, until_exhausted: bool) -> Result<FetchBatch> {
        self.ensure_open()?;
        let mut session = self.session.lock();
        let _guard = self.core.locks.read();
        session.fetch(
            self.config.fetch_time,
            self.config.fetch_count,
            until_exhausted,
        )
    }

    /// Abandon the active search, if any. Safe to call in any state and
    /// safe to call repeatedly.
    pub fn cancel_search(&self) {
        self.session.lock().cancel();
    }

    /// Whether a search is currently active.
    pub fn is_searching(&self) -> bool {
        self.session.lock().is_searching()
    }

    /// The current search session state.
    pub fn search_state(&self) -> SessionState {
        self.session.lock().state()
    }

    /// Run a query as an iterator of scored hits.
    ///
    /// Batches are fetched lazily under the hood; dropping the stream before
    /// exhaustion cancels the search.
    pub fn search_stream(&self, query: &str, options: &SearchOptions) -> Result<SearchStream<'_>> {
        self.prepare_search(query, options)?;
        Ok(SearchStream {
            store: self,
            buffer: VecDeque::new(),
            finished: false,
        })
    }

    /// Reclaim orphaned terms left behind by removed documents.
    ///
    /// `tolerance` is the bloat fraction to put up with: 0 forces
    /// compaction unconditionally, 1 compacts only a fully orphaned index.
    /// The engine call runs on a dedicated thread while both locks are
    /// held, so indexing and querying block until it completes. Returns
    /// whether compaction was performed.
    pub fn compact(&self, tolerance: f32) -> Result<bool> {
        self.ensure_open()?;
        if !(0.0..=1.0).contains(&tolerance) {
            return Err(XystonError::invalid_argument(
                "compaction tolerance must be within 0.0..=1.0",
            ));
        }
        if self.is_searching() {
            return Err(XystonError::lifecycle(
                "cannot compact while a search is active",
            ));
        }

        let _guard = self.core.locks.exclusive();
        let bloat = self.core.engine.bloat_ratio()?;
        if tolerance > 0.0 && bloat < tolerance {
            return Ok(false);
        }

        let core = Arc::clone(&self.core);
        let worker = thread::Builder::new()
            .name("xyston-compact".to_string())
            .spawn(move || core.engine.compact())
            .map_err(|e| XystonError::store(format!("failed to start compaction thread: {e}")))?;
        worker
            .join()
            .map_err(|_| XystonError::thread_join("compaction thread panicked"))??;
        Ok(true)
    }

    /// Flush pending changes and commit the index to its backing.
    pub fn save(&self) -> Result<()> {
        self.ensure_open()?;
        let _guard = self.core.locks.write();
        self.core.engine.flush()?;
        self.core.changes.store(0, Ordering::Release);
        Ok(())
    }

    /// Cancel any active search, drain the indexing queue, and release the
    /// engine handle.
    ///
    /// Pending changes are not saved; call [`SearchStore::save`] first to
    /// keep them. Every subsequent operation fails with a lifecycle error.
    pub fn close(&self) -> Result<()> {
        if self.core.closed.swap(true, Ordering::AcqRel) {
            return Err(XystonError::lifecycle("store is already closed"));
        }

        self.session.lock().cancel();
        if let Some(queue) = &self.queue {
            queue.shutdown();
        }
        let _guard = self.core.locks.exclusive();
        self.core.engine.close()
    }
}

/// A lazy, cancellable sequence of search hits.
///
/// Produced by [`SearchStore::search_stream`]. Dropping the stream before
/// exhaustion abandons the underlying search the same way an explicit
/// [`SearchStore::cancel_search`] would.
#[derive(Debug)]
pub struct SearchStream<'a> {
    store: &'a SearchStore,
    buffer: VecDeque<SearchHit>,
    finished: bool,
}

impl Iterator for SearchStream<'_> {
    type Item = Result<SearchHit>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(hit) = self.buffer.pop_front() {
                return Some(Ok(hit));
            }
            if self.finished {
                return None;
            }
            match self.store.fetch_results(false) {
                Ok(batch) => {
                    self.finished = !batch.more;
                    self.buffer.extend(batch.hits);
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl Drop for SearchStream<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.store.cancel_search();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SearchStore {
        SearchStore::open_in_memory(AnalysisConfig::default(), StoreConfig::default()).unwrap()
    }

    #[test]
    fn test_closed_store_fails_fast() {
        let store = store();
        store.close().unwrap();

        assert!(matches!(
            store.add_document("doc:a", DocumentSource::text("late")),
            Err(XystonError::Lifecycle(_))
        ));
        assert!(matches!(
            store.fetch_results(false),
            Err(XystonError::Lifecycle(_))
        ));
        assert!(matches!(store.close(), Err(XystonError::Lifecycle(_))));
    }

    #[test]
    fn test_compact_rejects_out_of_range_tolerance() {
        let store = store();
        assert!(matches!(
            store.compact(1.5),
            Err(XystonError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.compact(-0.1),
            Err(XystonError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_compact_mid_search_is_lifecycle_misuse() {
        let store = store();
        store
            .add_document("doc:a", DocumentSource::text("apple"))
            .unwrap();
        store
            .prepare_search("apple", &SearchOptions::default())
            .unwrap();

        assert!(matches!(
            store.compact(0.5),
            Err(XystonError::Lifecycle(_))
        ));

        store.cancel_search();
        assert!(store.compact(0.0).unwrap());
    }

    #[test]
    fn test_optimistic_return_in_async_mode() {
        let config = StoreConfig {
            concurrent_indexing: true,
            ..StoreConfig::default()
        };
        let store = SearchStore::open_in_memory(AnalysisConfig::default(), config).unwrap();

        // Removing an unknown URI truly fails, but the queue reports
        // success before the outcome is known.
        assert!(store.remove_document("doc:unknown").unwrap());
        store.close().unwrap();
    }

    #[test]
    fn test_replace_moves_identity() {
        let store = store();
        store
            .add_document("doc:old", DocumentSource::text("movable content"))
            .unwrap();
        store
            .replace_document("doc:old", "doc:new", DocumentSource::text("movable content"))
            .unwrap();
        store.save().unwrap();

        assert_eq!(
            store.document_state("doc:old").unwrap(),
            IndexState::NotIndexed
        );
        assert_eq!(
            store.document_state("doc:new").unwrap(),
            IndexState::Indexed
        );
    }

    #[test]
    fn test_properties_and_name() {
        let store = store();
        store
            .add_document("doc:a", DocumentSource::text("named content"))
            .unwrap();

        let mut properties = Properties::new();
        properties.insert("author".to_string(), serde_json::json!("phil"));
        store.set_properties("doc:a", properties).unwrap();
        assert!(store.set_name("doc:a", "Notes").unwrap());

        let read_back = store.properties("doc:a").unwrap().unwrap();
        assert_eq!(read_back.get("author"), Some(&serde_json::json!("phil")));
        assert_eq!(store.name("doc:a").unwrap().as_deref(), Some("Notes"));
        assert!(store.name("doc:missing").unwrap().is_none());
    }

    #[test]
    fn test_search_stream_yields_and_cancels() {
        // A fetch bound of one forces the stream through multiple batches.
        let config = StoreConfig {
            fetch_count: 1,
            ..StoreConfig::default()
        };
        let store = SearchStore::open_in_memory(AnalysisConfig::default(), config).unwrap();
        store
            .add_document("doc:a", DocumentSource::text("stream content"))
            .unwrap();
        store
            .add_document("doc:b", DocumentSource::text("stream content too"))
            .unwrap();

        let hits: Vec<SearchHit> = store
            .search_stream("stream", &SearchOptions::default())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(store.search_state(), SessionState::Exhausted);

        // Dropping before exhaustion cancels the session.
        let mut stream = store
            .search_stream("stream", &SearchOptions::default())
            .unwrap();
        let first = stream.next().unwrap().unwrap();
        assert!(!first.uri.is_empty());
        drop(stream);
        assert_eq!(store.search_state(), SessionState::Cancelled);
    }
}
