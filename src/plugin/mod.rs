//! Plugin archive-module contract.
//!
//! Archive families the layer cannot decode itself (7z, RAR, and ZIP when
//! no DEFLATE codec is present) are delegated to an external
//! [`ArchiveModule`]. The module never sees a [`VirtualFile`] directly: it
//! reads the archive and writes extracted members through a [`StreamIo`]
//! callback object, addressing streams by small integer [`StreamId`]s that
//! the layer maps to handles in its [`SessionArena`].
//!
//! The arena is bounded. Because the layer may call back into the module
//! while another archive is still open (an iterator visitor opening a
//! nested archive, for example), extraction contexts stack up; once the
//! arena is full, further sessions fail with
//! [`Error::SessionStackExhausted`](crate::Error::SessionStackExhausted)
//! instead of overwriting a live context.

mod session;

pub use session::{SessionArena, SessionIo, Sessions};

use crate::Result;
use crate::format::PluginKind;

/// Index of a stream in the session arena, as passed across the module boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub usize);

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Module-side identifier of an open archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchiveHandle(pub u32);

/// Directory entry reported by the module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemberInfo {
    /// Member path inside the archive.
    pub path: String,
    /// Packed size. Zero for members continuing a solid block.
    pub compressed_size: u64,
    /// Unpacked size.
    pub uncompressed_size: u64,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Callbacks through which a module reads archives and writes members.
pub trait StreamIo {
    /// Reads up to `buf.len()` bytes at `offset` of `stream`.
    fn read_at(&mut self, stream: StreamId, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Appends `buf` to `stream`. A count short of `buf.len()` means the
    /// target is full.
    fn write(&mut self, stream: StreamId, buf: &[u8]) -> Result<usize>;
}

/// An external multi-format archive extraction module.
pub trait ArchiveModule: Send + Sync {
    /// Opens the archive readable through `stream`, which is `size` bytes long.
    fn open_archive(
        &self,
        io: &mut dyn StreamIo,
        stream: StreamId,
        size: u64,
        kind: PluginKind,
    ) -> Result<ArchiveHandle>;

    /// Number of entries in the archive.
    fn file_count(&self, archive: ArchiveHandle) -> usize;

    /// Describes entry `index` (0-based).
    fn file_info(&self, archive: ArchiveHandle, index: usize) -> Result<MemberInfo>;

    /// Extracts entry `index` by writing it to `target`. The archive itself
    /// stays readable through the stream it was opened with.
    fn extract(
        &self,
        io: &mut dyn StreamIo,
        archive: ArchiveHandle,
        index: usize,
        target: StreamId,
    ) -> Result<()>;

    /// Releases the archive.
    fn close_archive(&self, archive: ArchiveHandle);
}
