//! Registry of live handles.
//!
//! The registry owns every open [`VirtualFile`] and hands out [`HandleId`]s.
//! It is a process-scoped state object rather than a global: each
//! [`FileLayer`](crate::FileLayer) owns one, so tests can run isolated
//! instances side by side.
//!
//! Mutation is guarded by a mutex because disk, ROM and module loaders may
//! create and destroy handles from different threads. Ids come from a
//! monotonically increasing counter and are never reused, so a stale id is
//! always detected as [`Error::UnknownHandle`] instead of aliasing a newer
//! handle.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::handle::{HandleId, VirtualFile};
use crate::{Error, Result};

/// Acquires a mutex lock, recovering from poisoned state if necessary.
///
/// Handle state stays consistent across a panic in a caller's closure, since
/// every mutation is a single map insert or remove.
fn lock_or_recover<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("handle registry mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Ledger of every open handle.
#[derive(Debug)]
pub struct HandleRegistry {
    handles: Mutex<HashMap<HandleId, VirtualFile>>,
    next_id: AtomicU64,
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a file and returns its new id.
    pub fn insert(&self, file: VirtualFile) -> HandleId {
        let id = HandleId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock_or_recover(&self.handles).insert(id, file);
        id
    }

    /// Puts a checked-out file back under its existing id.
    pub(crate) fn restore(&self, id: HandleId, file: VirtualFile) {
        lock_or_recover(&self.handles).insert(id, file);
    }

    /// Removes a file from the registry and returns ownership of it.
    pub fn remove(&self, id: HandleId) -> Result<VirtualFile> {
        lock_or_recover(&self.handles)
            .remove(&id)
            .ok_or(Error::UnknownHandle(id))
    }

    /// Returns true if the id is registered.
    pub fn contains(&self, id: HandleId) -> bool {
        lock_or_recover(&self.handles).contains_key(&id)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        lock_or_recover(&self.handles).len()
    }

    /// Returns true if no handle is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` against a registered file while holding the registry lock.
    ///
    /// `f` must not call back into the registry.
    pub fn with<T>(&self, id: HandleId, f: impl FnOnce(&mut VirtualFile) -> T) -> Result<T> {
        let mut handles = lock_or_recover(&self.handles);
        let file = handles.get_mut(&id).ok_or(Error::UnknownHandle(id))?;
        Ok(f(file))
    }

    /// Closes a handle.
    ///
    /// Closing an id that is not registered (already closed, or never
    /// issued) is rejected with [`Error::UnknownHandle`] and leaves the
    /// registry untouched.
    pub fn close(&self, id: HandleId) -> Result<()> {
        match self.remove(id) {
            Ok(file) => {
                file.close();
                Ok(())
            }
            Err(e) => {
                log::warn!("tried to close unknown or already closed handle {}", id);
                Err(e)
            }
        }
    }

    /// Closes every live handle. Returns how many were closed.
    pub fn close_all(&self) -> usize {
        let drained: Vec<VirtualFile> = lock_or_recover(&self.handles)
            .drain()
            .map(|(_, file)| file)
            .collect();
        let count = drained.len();
        for file in drained {
            file.close();
        }
        count
    }
}

impl Drop for HandleRegistry {
    fn drop(&mut self) {
        let remaining = self.close_all();
        if remaining > 0 {
            log::debug!("closed {} handles left open at teardown", remaining);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_close() {
        let registry = HandleRegistry::new();
        let id = registry.insert(VirtualFile::memory("a", 4));
        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);
        registry.close(id).unwrap();
        assert!(!registry.contains(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_double_close_rejected() {
        let registry = HandleRegistry::new();
        let id = registry.insert(VirtualFile::memory("a", 4));
        registry.close(id).unwrap();
        assert!(matches!(registry.close(id), Err(Error::UnknownHandle(x)) if x == id));
    }

    #[test]
    fn test_ids_never_reused() {
        let registry = HandleRegistry::new();
        let first = registry.insert(VirtualFile::memory("a", 1));
        registry.close(first).unwrap();
        let second = registry.insert(VirtualFile::memory("b", 1));
        assert_ne!(first, second);
        assert!(second > first);
    }

    #[test]
    fn test_close_all_drains() {
        let registry = HandleRegistry::new();
        let a = registry.insert(VirtualFile::memory("a", 1));
        let b = registry.insert(VirtualFile::memory("b", 1));
        assert_eq!(registry.close_all(), 2);
        assert!(registry.is_empty());
        assert!(registry.with(a, |f| f.len()).is_err());
        assert!(matches!(registry.close(b), Err(Error::UnknownHandle(_))));
    }

    #[test]
    fn test_isolated_instances() {
        let one = HandleRegistry::new();
        let two = HandleRegistry::new();
        let id = one.insert(VirtualFile::memory("a", 1));
        assert!(!two.contains(id));
        two.close_all();
        assert!(one.contains(id));
    }

    #[test]
    fn test_with_mutates_in_place() {
        let registry = HandleRegistry::new();
        let id = registry.insert(VirtualFile::memory("a", 4));
        registry.with(id, |f| f.write_bytes(b"xy").unwrap()).unwrap();
        assert_eq!(registry.with(id, |f| f.tell()).unwrap(), 2);
    }
}
