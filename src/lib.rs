//! # Xyston
//!
//! A thread-safe store orchestration layer for embedded full-text index
//! engines.
//!
//! ## Features
//!
//! - Safe concurrent indexing and searching over a single-writer engine
//! - Optional asynchronous indexing queue off the caller's thread
//! - Two-stage, resumable search with bounded batches and cancellation
//! - Relevance rank normalization to the 0..1 range
//! - Term <-> document graph queries for lexicon building
//! - In-memory reference engine with checksummed snapshot persistence

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod store;

pub use config::{AnalysisConfig, IndexKind, SearchOptions, StoreConfig, english_stop_words};
pub use document::{DocumentSource, IndexState, Properties};
pub use engine::{EngineMatch, EngineSearch, IndexEngine, MemoryEngine};
pub use error::{Result, XystonError};
pub use normalize::normalize_ranks;
pub use store::registry::DocumentRegistry;
pub use store::session::{FetchBatch, SearchHit, SessionState};
pub use store::{SearchStore, SearchStream};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
