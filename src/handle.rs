//! The virtual file handle.
//!
//! A [`VirtualFile`] is the unit of I/O of the layer. It is backed either by
//! a real file on disk or by an owned, fixed-size memory buffer produced by
//! decompression. Both backings expose the same seek/read/write/tell
//! semantics:
//!
//! - seeks clamp into `[0, len]` and never fail on out-of-range offsets;
//! - memory buffers never grow, writes past the end are truncated;
//! - a write-skip counter discards bytes from the front of future writes.
//!
//! `VirtualFile` also implements [`Read`], [`Write`] and [`Seek`] so it can be
//! handed to any reader-based decoder, such as the ZIP directory parser.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Identifier of a handle registered in a [`HandleRegistry`](crate::HandleRegistry).
///
/// Identifiers are allocated from a monotonically increasing counter and
/// are never reused within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(u64);

impl HandleId {
    /// Wraps a raw identifier.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Origin of a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Offset from the start of the content.
    Start,
    /// Offset from the current position.
    Current,
    /// Offset from the end of the content.
    End,
}

/// How a real file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Read-only. The only mode valid for container-embedded paths.
    #[default]
    Read,
    /// Create or truncate for writing.
    Write,
    /// Read and write an existing file.
    ReadWrite,
    /// Create if missing, all writes go to the end.
    Append,
}

impl OpenMode {
    fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            Self::Read => options.read(true),
            Self::Write => options.write(true).create(true).truncate(true),
            Self::ReadWrite => options.read(true).write(true),
            Self::Append => options.append(true).create(true),
        };
        options
    }
}

/// Storage behind a [`VirtualFile`]. Exactly one of the two, never both.
pub enum Backing {
    /// A real file on disk.
    RealFile {
        /// The open file.
        file: File,
        /// The path the file was opened from.
        path: PathBuf,
        /// Whether writes always append.
        append: bool,
    },
    /// An owned buffer whose length is fixed at creation.
    Memory(Vec<u8>),
}

impl fmt::Debug for Backing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RealFile { path, append, .. } => f
                .debug_struct("RealFile")
                .field("path", path)
                .field("append", append)
                .finish_non_exhaustive(),
            Self::Memory(data) => f.debug_tuple("Memory").field(&data.len()).finish(),
        }
    }
}

/// A seekable, readable, writable file that may live on disk or in memory.
#[derive(Debug)]
pub struct VirtualFile {
    name: String,
    member_name: Option<String>,
    backing: Backing,
    length: u64,
    position: u64,
    delete_on_close: bool,
    write_skip: u64,
}

impl VirtualFile {
    /// Opens a real file.
    pub fn open_path(path: impl AsRef<Path>, mode: OpenMode) -> io::Result<Self> {
        let path = path.as_ref();
        let file = mode.options().open(path)?;
        let length = file.metadata()?.len();
        let append = mode == OpenMode::Append;
        Ok(Self {
            name: path.to_string_lossy().into_owned(),
            member_name: None,
            backing: Backing::RealFile {
                file,
                path: path.to_path_buf(),
                append,
            },
            length,
            position: if append { length } else { 0 },
            delete_on_close: false,
            write_skip: 0,
        })
    }

    /// Creates a zero-filled memory file of a fixed size.
    pub fn memory(name: impl Into<String>, size: usize) -> Self {
        Self::from_bytes(name, vec![0; size])
    }

    /// Wraps an existing buffer. The buffer length becomes the fixed length.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            member_name: None,
            length: data.len() as u64,
            backing: Backing::Memory(data),
            position: 0,
            delete_on_close: false,
            write_skip: 0,
        }
    }

    /// Returns the logical name the file was opened or created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns the archive member this file selects, if opened through a container.
    pub fn member_name(&self) -> Option<&str> {
        self.member_name.as_deref()
    }

    /// Attaches an archive member name.
    pub fn set_member_name(&mut self, member: Option<String>) {
        self.member_name = member;
    }

    /// Returns the backing storage.
    pub fn backing(&self) -> &Backing {
        &self.backing
    }

    /// Returns the owned buffer of a memory-backed file.
    pub fn memory_data(&self) -> Option<&[u8]> {
        match &self.backing {
            Backing::Memory(data) => Some(data),
            Backing::RealFile { .. } => None,
        }
    }

    /// Returns the filesystem path of a file-backed file.
    pub fn real_path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::RealFile { path, .. } => Some(path),
            Backing::Memory(_) => None,
        }
    }

    /// Returns true if the content lives in memory, i.e. it was produced by
    /// decompression.
    pub fn is_compressed(&self) -> bool {
        matches!(self.backing, Backing::Memory(_))
    }

    /// Total addressable size.
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Returns true if the file has no content.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Current cursor.
    pub fn tell(&self) -> u64 {
        self.position
    }

    /// Marks the backing storage for removal on close.
    pub fn set_delete_on_close(&mut self, delete: bool) {
        self.delete_on_close = delete;
    }

    /// Returns whether the backing storage is removed on close.
    pub fn delete_on_close(&self) -> bool {
        self.delete_on_close
    }

    /// Sets the number of bytes to discard from the front of future writes.
    pub fn set_write_skip(&mut self, bytes: u64) {
        self.write_skip = bytes;
    }

    /// Bytes still to be discarded by future writes.
    pub fn write_skip(&self) -> u64 {
        self.write_skip
    }

    /// Moves the cursor and returns the previous position.
    ///
    /// The target is clamped into `[0, len]`.
    pub fn seek_to(&mut self, offset: i64, whence: Whence) -> io::Result<u64> {
        let previous = self.position;
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.position,
            Whence::End => self.length,
        };
        let target = if offset < 0 {
            base.saturating_sub(offset.unsigned_abs())
        } else {
            base.saturating_add(offset as u64)
        }
        .min(self.length);

        if let Backing::RealFile { file, .. } = &mut self.backing {
            file.seek(SeekFrom::Start(target))?;
        }
        self.position = target;
        Ok(previous)
    }

    /// Reads up to `buf.len()` bytes, stopping only at the end of content.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = match &mut self.backing {
            Backing::Memory(data) => {
                let start = self.position as usize;
                let count = buf.len().min(data.len().saturating_sub(start));
                buf[..count].copy_from_slice(&data[start..start + count]);
                count
            }
            Backing::RealFile { file, .. } => {
                let mut filled = 0;
                while filled < buf.len() {
                    match file.read(&mut buf[filled..]) {
                        Ok(0) => break,
                        Ok(n) => filled += n,
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                        Err(e) => return Err(e),
                    }
                }
                filled
            }
        };
        self.position += count as u64;
        Ok(count)
    }

    /// Writes `buf`, honoring the write-skip counter first.
    ///
    /// Returns the number of bytes consumed from `buf`, skipped bytes
    /// included. Memory files truncate at their fixed length, so a short
    /// count means the buffer is full.
    pub fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize> {
        let skipped = (self.write_skip.min(buf.len() as u64)) as usize;
        self.write_skip -= skipped as u64;
        let rest = &buf[skipped..];
        if rest.is_empty() {
            return Ok(skipped);
        }

        let written = match &mut self.backing {
            Backing::Memory(data) => {
                let start = self.position as usize;
                let count = rest.len().min(data.len().saturating_sub(start));
                data[start..start + count].copy_from_slice(&rest[..count]);
                self.position += count as u64;
                count
            }
            Backing::RealFile { file, append, .. } => {
                file.write_all(rest)?;
                if *append {
                    self.length += rest.len() as u64;
                    self.position = self.length;
                } else {
                    self.position += rest.len() as u64;
                    self.length = self.length.max(self.position);
                }
                rest.len()
            }
        };
        Ok(skipped + written)
    }

    /// Reads into `buf` and restores the cursor afterwards.
    pub fn peek(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = self.position;
        let n = self.read_bytes(buf)?;
        self.seek_to(start as i64, Whence::Start)?;
        Ok(n)
    }

    /// Reads the entire content without moving the cursor.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        if let Backing::Memory(data) = &self.backing {
            return Ok(data.clone());
        }
        let start = self.position;
        self.seek_to(0, Whence::Start)?;
        let mut content = vec![0u8; self.length as usize];
        let n = self.read_bytes(&mut content);
        self.seek_to(start as i64, Whence::Start)?;
        content.truncate(n?);
        Ok(content)
    }

    /// Releases the handle, removing the backing file if it was marked
    /// delete-on-close.
    pub fn close(self) {
        let Self {
            backing,
            delete_on_close,
            ..
        } = self;
        if let Backing::RealFile { file, path, .. } = backing {
            drop(file);
            if delete_on_close {
                match fs::remove_file(&path) {
                    Ok(()) => log::debug!("deleted temporary file '{}'", path.display()),
                    Err(e) => log::warn!("failed to delete '{}': {}", path.display(), e),
                }
            }
        }
    }
}

impl Read for VirtualFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bytes(buf)
    }
}

impl Write for VirtualFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.backing {
            Backing::RealFile { file, .. } => file.flush(),
            Backing::Memory(_) => Ok(()),
        }
    }
}

impl Seek for VirtualFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::Start(offset) => {
                let offset = i64::try_from(offset).unwrap_or(i64::MAX);
                self.seek_to(offset, Whence::Start)?
            }
            SeekFrom::Current(offset) => self.seek_to(offset, Whence::Current)?,
            SeekFrom::End(offset) => self.seek_to(offset, Whence::End)?,
        };
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_advances() {
        let mut file = VirtualFile::from_bytes("mem", b"abcdef".to_vec());
        let mut buf = [0u8; 4];
        assert_eq!(file.read_bytes(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(file.tell(), 4);
        assert_eq!(file.read_bytes(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(file.read_bytes(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_seek_clamps_and_returns_previous() {
        let mut file = VirtualFile::memory("mem", 10);
        assert_eq!(file.seek_to(4, Whence::Start).unwrap(), 0);
        assert_eq!(file.seek_to(1000, Whence::Current).unwrap(), 4);
        assert_eq!(file.tell(), 10);
        file.seek_to(-1000, Whence::End).unwrap();
        assert_eq!(file.tell(), 0);
        file.seek_to(-3, Whence::End).unwrap();
        assert_eq!(file.tell(), 7);
        file.seek_to(i64::MAX, Whence::Start).unwrap();
        assert_eq!(file.tell(), 10);
    }

    #[test]
    fn test_memory_write_truncates_at_length() {
        let mut file = VirtualFile::memory("mem", 4);
        assert_eq!(file.write_bytes(b"abcdef").unwrap(), 4);
        assert_eq!(file.len(), 4);
        assert_eq!(file.memory_data().unwrap(), b"abcd");
        assert_eq!(file.write_bytes(b"x").unwrap(), 0);
    }

    #[test]
    fn test_write_skip_discards_front() {
        let mut file = VirtualFile::memory("mem", 4);
        file.set_write_skip(5);
        assert_eq!(file.write_bytes(b"123").unwrap(), 3);
        assert_eq!(file.write_skip(), 2);
        assert_eq!(file.tell(), 0);
        assert_eq!(file.write_bytes(b"45abcd").unwrap(), 6);
        assert_eq!(file.write_skip(), 0);
        assert_eq!(file.memory_data().unwrap(), b"abcd");
    }

    #[test]
    fn test_peek_restores_position() {
        let mut file = VirtualFile::from_bytes("mem", b"PK\x03\x04rest".to_vec());
        file.seek_to(1, Whence::Start).unwrap();
        let mut header = [0u8; 2];
        assert_eq!(file.peek(&mut header).unwrap(), 2);
        assert_eq!(&header, b"K\x03");
        assert_eq!(file.tell(), 1);
    }

    #[test]
    fn test_is_compressed_only_for_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.bin");
        std::fs::write(&path, b"data").unwrap();
        let file = VirtualFile::open_path(&path, OpenMode::Read).unwrap();
        assert!(!file.is_compressed());
        assert_eq!(file.len(), 4);
        assert!(VirtualFile::memory("m", 1).is_compressed());
    }

    #[test]
    fn test_real_file_write_extends_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let mut file = VirtualFile::open_path(&path, OpenMode::Write).unwrap();
        assert_eq!(file.len(), 0);
        file.write_bytes(b"hello").unwrap();
        assert_eq!(file.len(), 5);
        file.seek_to(0, Whence::Start).unwrap();
        file.close();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn test_append_mode_positions_at_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, b"abc").unwrap();
        let mut file = VirtualFile::open_path(&path, OpenMode::Append).unwrap();
        assert_eq!(file.tell(), 3);
        file.write_bytes(b"de").unwrap();
        assert_eq!(file.tell(), 5);
        file.close();
        assert_eq!(std::fs::read(&path).unwrap(), b"abcde");
    }

    #[test]
    fn test_delete_on_close_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.tmp");
        std::fs::write(&path, b"tmp").unwrap();
        let mut file = VirtualFile::open_path(&path, OpenMode::Read).unwrap();
        file.set_delete_on_close(true);
        file.close();
        assert!(!path.exists());
    }

    #[test]
    fn test_read_all_keeps_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"0123456789").unwrap();
        let mut file = VirtualFile::open_path(&path, OpenMode::Read).unwrap();
        file.seek_to(6, Whence::Start).unwrap();
        assert_eq!(file.read_all().unwrap(), b"0123456789");
        assert_eq!(file.tell(), 6);
    }

    #[test]
    fn test_io_seek_trait() {
        let mut file = VirtualFile::memory("mem", 8);
        assert_eq!(file.seek(SeekFrom::End(-2)).unwrap(), 6);
        assert_eq!(file.seek(SeekFrom::Start(100)).unwrap(), 8);
        assert_eq!(file.stream_position().unwrap(), 8);
    }

    #[test]
    fn test_handle_id_display() {
        assert_eq!(HandleId::from_raw(3).to_string(), "#3");
        assert_eq!(HandleId::from_raw(3).as_raw(), 3);
    }
}
