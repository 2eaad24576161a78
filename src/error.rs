//! Error types for the Xyston library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`XystonError`] enum. Recoverable per-document indexing failures are not
//! errors at all: they are reported as boolean outcomes by the store, so the
//! variants here cover engine faults, malformed queries, and caller misuse.

use std::io;

use anyhow;
use thiserror::Error;

/// The main error type for Xyston operations.
#[derive(Error, Debug)]
pub enum XystonError {
    /// I/O errors (file operations, snapshot persistence, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Backend engine errors
    #[error("Engine error: {0}")]
    Engine(String),

    /// Store orchestration errors
    #[error("Store error: {0}")]
    Store(String),

    /// Query-related errors (parsing, invalid option combinations)
    #[error("Query error: {0}")]
    Query(String),

    /// Text analysis errors
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Lifecycle misuse: operating on a closed store, compacting mid-search
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// Operation requires a capability the store was not created with
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Thread join errors
    #[error("Thread join error: {0}")]
    ThreadJoin(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with XystonError.
pub type Result<T> = std::result::Result<T, XystonError>;

impl XystonError {
    /// Create a new engine error.
    pub fn engine<S: Into<String>>(msg: S) -> Self {
        XystonError::Engine(msg.into())
    }

    /// Create a new store error.
    pub fn store<S: Into<String>>(msg: S) -> Self {
        XystonError::Store(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        XystonError::Query(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        XystonError::Analysis(msg.into())
    }

    /// Create a new lifecycle error.
    pub fn lifecycle<S: Into<String>>(msg: S) -> Self {
        XystonError::Lifecycle(msg.into())
    }

    /// Create a new unsupported-operation error.
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        XystonError::Unsupported(msg.into())
    }

    /// Create a new thread join error.
    pub fn thread_join<S: Into<String>>(msg: S) -> Self {
        XystonError::ThreadJoin(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        XystonError::InvalidArgument(msg.into())
    }
}
