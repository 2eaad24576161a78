//! Asynchronous indexing queue.
//!
//! When a store is created with `concurrent_indexing`, write operations are
//! appended to a FIFO queue and applied by exactly one dedicated worker
//! thread, so batch indexing never stalls a latency-sensitive caller. The
//! queue never reorders, drops, or coalesces entries: removing a
//! not-yet-processed add is not deduplicated, both tasks run in order and
//! the later one determines the final state.
//!
//! Queued submissions report success unconditionally; the engine's true
//! outcome is absorbed by the worker.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, unbounded};
use parking_lot::Mutex;

use crate::document::{DocumentSource, Properties};
use crate::error::{Result, XystonError};
use crate::store::StoreCore;

/// One queued write-class operation.
#[derive(Debug)]
pub(crate) enum WriteTask {
    Add {
        uri: String,
        source: DocumentSource,
    },
    Remove {
        uri: String,
    },
    Replace {
        old_uri: String,
        new_uri: String,
        source: DocumentSource,
    },
    SetProperties {
        uri: String,
        properties: Properties,
    },
    SetName {
        uri: String,
        name: String,
    },
}

/// Single-worker FIFO queue applying write tasks against the engine.
#[derive(Debug)]
pub(crate) struct IndexingQueue {
    sender: Mutex<Option<Sender<WriteTask>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl IndexingQueue {
    /// Start the queue worker.
    pub fn start(core: Arc<StoreCore>) -> Result<Self> {
        let (sender, receiver) = unbounded::<WriteTask>();

        let handle = thread::Builder::new()
            .name("xyston-indexing".to_string())
            .spawn(move || {
                // Drain strictly in submission order until the channel closes.
                while let Ok(task) = receiver.recv() {
                    let _ = core.apply_write(task);
                }
            })
            .map_err(|e| XystonError::store(format!("failed to start indexing worker: {e}")))?;

        Ok(IndexingQueue {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Append a task to the queue.
    pub fn submit(&self, task: WriteTask) -> Result<()> {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => sender
                .send(task)
                .map_err(|_| XystonError::store("indexing queue disconnected")),
            None => Err(XystonError::lifecycle("indexing queue is shut down")),
        }
    }

    /// Close the queue, process everything already submitted, and join the
    /// worker. Safe to call more than once.
    pub fn shutdown(&self) {
        // Dropping the sender closes the channel; recv drains what remains.
        self.sender.lock().take();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for IndexingQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}
