//! Lock discipline for engine access.
//!
//! An engine is thread-safe for isolated calls, but callers must ensure no
//! more than one writer is active at a time and must serialize access during
//! structural maintenance. [`LockManager`] holds two mutually exclusive
//! halves: a write-class lock serializing indexing operations and a
//! read-class lock serializing queries. Maintenance takes both through
//! [`LockManager::exclusive`], always write before read, so no caller can
//! deadlock against it by acquiring in the opposite order.
//!
//! All acquisitions are scoped: the returned guards release their half on
//! every exit path, including panics and early returns.

use parking_lot::{Mutex, MutexGuard};

/// The two-lock coordinator guarding a single engine handle.
#[derive(Debug, Default)]
pub struct LockManager {
    write: Mutex<()>,
    read: Mutex<()>,
}

/// Scoped hold of the read-class lock.
#[derive(Debug)]
pub struct ReadGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

/// Scoped hold of the write-class lock.
#[derive(Debug)]
pub struct WriteGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

/// Scoped hold of both locks, excluding every reader and writer.
#[derive(Debug)]
pub struct ExclusiveGuard<'a> {
    _write: MutexGuard<'a, ()>,
    _read: MutexGuard<'a, ()>,
}

impl LockManager {
    /// Create a new lock manager.
    pub fn new() -> Self {
        LockManager::default()
    }

    /// Acquire the read-class lock, blocking until it is available.
    pub fn read(&self) -> ReadGuard<'_> {
        ReadGuard {
            _guard: self.read.lock(),
        }
    }

    /// Acquire the write-class lock, blocking until it is available.
    pub fn write(&self) -> WriteGuard<'_> {
        WriteGuard {
            _guard: self.write.lock(),
        }
    }

    /// Acquire both locks for a maintenance operation.
    ///
    /// Acquisition order is fixed: write before read.
    pub fn exclusive(&self) -> ExclusiveGuard<'_> {
        let write = self.write.lock();
        let read = self.read.lock();
        ExclusiveGuard {
            _write: write,
            _read: read,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_writers_never_overlap() {
        let locks = Arc::new(LockManager::new());
        let in_critical = Arc::new(AtomicBool::new(false));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = Arc::clone(&locks);
            let in_critical = Arc::clone(&in_critical);
            let overlaps = Arc::clone(&overlaps);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    let _guard = locks.write();
                    if in_critical.swap(true, Ordering::SeqCst) {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    thread::sleep(Duration::from_micros(50));
                    in_critical.store(false, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_exclusive_blocks_readers_and_writers() {
        let locks = Arc::new(LockManager::new());
        let exclusive_held = Arc::new(AtomicBool::new(true));

        let guard = locks.exclusive();

        let reader = {
            let locks = Arc::clone(&locks);
            let exclusive_held = Arc::clone(&exclusive_held);
            thread::spawn(move || {
                let _read = locks.read();
                assert!(!exclusive_held.load(Ordering::SeqCst));
            })
        };
        let writer = {
            let locks = Arc::clone(&locks);
            let exclusive_held = Arc::clone(&exclusive_held);
            thread::spawn(move || {
                let _write = locks.write();
                assert!(!exclusive_held.load(Ordering::SeqCst));
            })
        };

        thread::sleep(Duration::from_millis(50));
        exclusive_held.store(false, Ordering::SeqCst);
        drop(guard);

        reader.join().unwrap();
        writer.join().unwrap();
    }

    #[test]
    fn test_read_and_write_can_coexist() {
        let locks = LockManager::new();
        let _read = locks.read();
        // One indexing and one searching operation may run simultaneously.
        let _write = locks.write();
    }
}
