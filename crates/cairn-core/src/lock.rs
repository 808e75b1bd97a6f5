//! In-process locking of cache file paths.
//!
//! Two sources may name the same cache file (the same remote URI listed twice, or two
//! remotes sharing a pack id). Writes to one path are serialized through a [`PathLocks`]
//! table so a staged file is never renamed over a destination another worker is
//! still committing.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

/// A table of per-path mutexes.
///
/// Entries are created on first use and kept for the lifetime of the table.
#[derive(Default)]
pub(crate) struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    fn entry(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    /// Runs `f` while holding the lock for `path`.
    ///
    /// Blocks until no other caller holds the same path. A lock poisoned by a panicking
    /// holder is taken over, since the guarded data is the file on disk.
    pub(crate) fn with_lock<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let lock = self.entry(path);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
        time::Duration,
    };

    use super::*;

    #[test]
    fn test_same_path_is_serialized() {
        let locks = Arc::new(PathLocks::default());
        let active = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = locks.clone();
                let active = active.clone();
                let overlap = overlap.clone();
                thread::spawn(move || {
                    locks.with_lock(Path::new("/cache/package_a.xml"), || {
                        if active.fetch_add(1, Ordering::SeqCst) > 0 {
                            overlap.fetch_add(1, Ordering::SeqCst);
                        }
                        thread::sleep(Duration::from_millis(10));
                        active.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(overlap.load(Ordering::SeqCst), 0);
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn test_distinct_paths_get_distinct_locks() {
        let locks = PathLocks::default();
        let value = locks.with_lock(Path::new("/a"), || {
            locks.with_lock(Path::new("/b"), || 7)
        });
        assert_eq!(value, 7);
        assert_eq!(locks.len(), 2);
    }
}
