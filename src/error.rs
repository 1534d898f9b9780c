//! Error types for the virtual file layer.
//!
//! This module provides the [`Error`] enum which represents every failure
//! the layer can report, along with a convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! The layer is best-effort by construction: a container that cannot be
//! decompressed (unsupported variant, corrupt data, missing codec) is handed
//! back to the caller unchanged rather than failing. The errors a caller
//! will actually observe are therefore few:
//!
//! - [`Error::NotFound`] when a path does not resolve to any real file,
//!   with or without container splitting.
//! - [`Error::UnknownHandle`] when a handle id is used after it was closed
//!   (or after [`FileLayer::close_all`]).
//! - [`Error::Io`] from reads, writes and seeks on real files.
//!
//! ```rust,no_run
//! use arcvfs::{Error, FileLayer, OpenMode};
//!
//! let layer = FileLayer::new();
//! match layer.open("games/game.zip/disk1.adf", OpenMode::Read) {
//!     Ok(id) => println!("opened {} bytes", layer.len(id).unwrap_or(0)),
//!     Err(Error::NotFound { path }) => eprintln!("no such file: {}", path),
//!     Err(e) => eprintln!("error: {}", e),
//! }
//! ```
//!
//! The remaining variants are produced inside the decompression pipeline.
//! They are logged and converted into "return unchanged" before they reach
//! the dispatcher boundary, but are public so that custom
//! [`Decompressor`](crate::decompress::Decompressor) implementations and
//! plugin modules can use them.
//!
//! [`FileLayer::close_all`]: crate::FileLayer::close_all

use std::io;

use crate::handle::HandleId;

/// The main error type for virtual file operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | Lookup | [`NotFound`][Self::NotFound], [`UnknownHandle`][Self::UnknownHandle] | Missing file, stale handle |
/// | I/O | [`Io`][Self::Io] | File system operations |
/// | Format | [`UnsupportedFeature`][Self::UnsupportedFeature], [`CorruptData`][Self::CorruptData] | Container contents |
/// | Resources | [`ResourceLimitExceeded`][Self::ResourceLimitExceeded], [`SessionStackExhausted`][Self::SessionStackExhausted] | Safety bounds |
/// | Modules | [`ModuleFailure`][Self::ModuleFailure], [`CodecUnavailable`][Self::CodecUnavailable] | Optional collaborators |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred on a real file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The path does not resolve to a real file, directly or through a
    /// container.
    #[error("File not found: {path}")]
    NotFound {
        /// The path as passed by the caller.
        path: String,
    },

    /// The handle id is not (or no longer) registered.
    ///
    /// This is returned for closed handles, for handles of another layer
    /// instance and for every handle after a `close_all`.
    #[error("Unknown handle {0}")]
    UnknownHandle(HandleId),

    /// A recognized format uses a feature this layer does not implement.
    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature {
        /// The name of the unsupported feature.
        feature: &'static str,
    },

    /// Container data is corrupt or truncated.
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// A declared size is outside the configured bounds.
    #[error("Resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),

    /// The plugin extraction session arena is full.
    #[error("Extraction session stack exhausted (capacity {capacity})")]
    SessionStackExhausted {
        /// Capacity of the arena.
        capacity: usize,
    },

    /// A session was popped out of order.
    #[error("Extraction session mismatch: expected stream {expected}, got {actual}")]
    SessionMismatch {
        /// The stream id on top of the arena.
        expected: usize,
        /// The stream id the caller tried to release.
        actual: usize,
    },

    /// A stream id passed across the module boundary is not in the arena.
    #[error("Unknown extraction stream {0}")]
    UnknownStream(usize),

    /// An external module reported a failure status.
    #[error("{operation} failed with status {status}")]
    ModuleFailure {
        /// The module operation that failed.
        operation: &'static str,
        /// The status code reported by the module.
        status: i32,
    },

    /// No DEFLATE codec is available.
    #[error("DEFLATE codec unavailable")]
    CodecUnavailable,
}

impl Error {
    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Returns true if the error is caused by a missing feature or module.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFeature { .. } | Self::CodecUnavailable
        )
    }

    /// Returns true if the error indicates corrupt or oversized input.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::CorruptData(_) | Self::ResourceLimitExceeded(_)
        )
    }

    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Shorthand for [`Error::CorruptData`].
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptData(reason.into())
    }
}

/// A specialized `Result` type for virtual file operations.
pub type Result<T> = std::result::Result<T, Error>;
