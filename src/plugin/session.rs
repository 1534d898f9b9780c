//! Bounded arena of active extraction sessions.

use std::sync::Mutex;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use super::{StreamId, StreamIo};
use crate::handle::{VirtualFile, Whence};
use crate::{Error, Result};

/// A fixed-capacity stack of files taking part in plugin extraction.
///
/// Slots are addressed by their position, which is what the module sees as
/// a [`StreamId`]. Sessions are strictly nested: only the top may be
/// popped. [`reclaim`](Self::reclaim) takes a slot out of order without
/// renumbering the others.
#[derive(Debug)]
pub struct SessionArena {
    slots: Vec<Option<VirtualFile>>,
    capacity: usize,
}

impl SessionArena {
    /// Creates an empty arena with room for `capacity` sessions.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Pushes a file. When the arena is full the file is handed back.
    pub fn try_push(&mut self, file: VirtualFile) -> std::result::Result<StreamId, VirtualFile> {
        if self.slots.len() >= self.capacity {
            return Err(file);
        }
        self.slots.push(Some(file));
        Ok(StreamId(self.slots.len() - 1))
    }

    /// Pops the top session, which must be `id`.
    pub fn pop(&mut self, id: StreamId) -> Result<VirtualFile> {
        let top = self.slots.len().checked_sub(1).ok_or(Error::UnknownStream(id.0))?;
        if top != id.0 {
            return Err(Error::SessionMismatch {
                expected: top,
                actual: id.0,
            });
        }
        self.reclaim(id)
    }

    /// Takes the file out of slot `id`, wherever it is in the stack.
    pub fn reclaim(&mut self, id: StreamId) -> Result<VirtualFile> {
        let file = self
            .slots
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(Error::UnknownStream(id.0))?;
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
        Ok(file)
    }

    /// Returns the file in slot `id`.
    pub fn get_mut(&mut self, id: StreamId) -> Result<&mut VirtualFile> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(Error::UnknownStream(id.0))
    }

    /// Number of active sessions.
    pub fn depth(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Maximum number of sessions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A [`SessionArena`] shared by every extraction of one layer.
///
/// The arena lock is held only for a single push, pop, read or write,
/// never across a call into the module. Whole extractions are serialized
/// per thread by [`enter`](Self::enter), a reentrant lock: the thread
/// holding it may nest further extractions (a visitor opening another
/// archive), while other threads wait, so the stack only ever holds the
/// sessions of one thread.
#[derive(Debug)]
pub struct Sessions {
    arena: Mutex<SessionArena>,
    owner: ReentrantMutex<()>,
}

impl Sessions {
    /// Creates a shared arena with room for `capacity` sessions.
    pub fn new(capacity: usize) -> Self {
        Self {
            arena: Mutex::new(SessionArena::new(capacity)),
            owner: ReentrantMutex::new(()),
        }
    }

    /// Claims the arena for the current thread until the guard drops.
    pub fn enter(&self) -> ReentrantMutexGuard<'_, ()> {
        self.owner.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionArena> {
        self.arena.lock().unwrap_or_else(|poisoned| {
            log::warn!("extraction session mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Pushes a file, handing it back if the arena is full.
    pub fn try_push(&self, file: VirtualFile) -> std::result::Result<StreamId, VirtualFile> {
        let mut arena = self.lock();
        let capacity = arena.capacity();
        arena.try_push(file).inspect_err(|_| {
            log::warn!("extraction session stack exhausted (capacity {})", capacity);
        })
    }

    /// Pops the top session, which must be `id`.
    pub fn pop(&self, id: StreamId) -> Result<VirtualFile> {
        self.lock().pop(id)
    }

    /// Pops `id`, taking it out of order if it is not on top.
    ///
    /// An out-of-order session is logged; the file still comes back, so
    /// callers can always restore what they pushed.
    pub fn take(&self, id: StreamId) -> Result<VirtualFile> {
        let mut arena = self.lock();
        arena.pop(id).or_else(|e| {
            log::error!("extraction session {} left unbalanced: {}", id.0, e);
            arena.reclaim(id)
        })
    }

    /// Number of active sessions.
    pub fn depth(&self) -> usize {
        self.lock().depth()
    }

    /// Maximum number of sessions.
    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// Returns the callback object handed to modules.
    pub fn io(&self) -> SessionIo<'_> {
        SessionIo { sessions: self }
    }
}

/// [`StreamIo`] implementation over a shared arena.
#[derive(Debug, Clone, Copy)]
pub struct SessionIo<'a> {
    sessions: &'a Sessions,
}

impl StreamIo for SessionIo<'_> {
    fn read_at(&mut self, stream: StreamId, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut arena = self.sessions.lock();
        let file = arena.get_mut(stream)?;
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        file.seek_to(offset, Whence::Start)?;
        Ok(file.read_bytes(buf)?)
    }

    fn write(&mut self, stream: StreamId, buf: &[u8]) -> Result<usize> {
        let mut arena = self.sessions.lock();
        let file = arena.get_mut(stream)?;
        Ok(file.write_bytes(buf)?)
    }
}
