//! # arcvfs
//!
//! Transparent archive-aware file access.
//!
//! Open a path by name and get byte-addressable content back, whether the
//! bytes live in a plain file, inside a ZIP/7z/RAR container or behind a
//! gzip or DMS stream. Callers never need to know which case applies.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arcvfs::{FileLayer, OpenMode, Result};
//!
//! fn main() -> Result<()> {
//!     let layer = FileLayer::new();
//!
//!     // A plain file, a gzip-packed image and a ZIP member all open alike.
//!     for path in ["disk.adf", "disk.adz", "games/game.zip/disk1.adf"] {
//!         let id = layer.open(path, OpenMode::Read)?;
//!         println!(
//!             "{}: {} bytes, decompressed: {}",
//!             path,
//!             layer.len(id)?,
//!             layer.is_compressed(id)?
//!         );
//!         layer.close(id)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Container paths
//!
//! A path like `games/game.zip/disk1.adf` is split at the rightmost
//! component with an archive extension (`zip`, `7z`, `rar`) that names a
//! real file. The remainder selects a member, by case-insensitive name or
//! by position with `#N`. Without a member name the first eligible member
//! wins, skipping a short list of uninteresting extensions (images, text).
//!
//! ### Listing archives
//!
//! ```rust,no_run
//! use arcvfs::FileLayer;
//!
//! # fn main() -> arcvfs::Result<()> {
//! let layer = FileLayer::new();
//! layer.for_each_member("games/collection.zip", |member| {
//!     println!("{} ({} bytes)", member.name(), member.len());
//!     true
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Optional Collaborators
//!
//! | Collaborator | Builder method | Without it |
//! |--------------|----------------|------------|
//! | DEFLATE codec | [`FileLayerBuilder::codec`] | gzip and ZIP open as plain files, the host is notified once |
//! | Plugin archive module | [`FileLayerBuilder::archive_module`] | 7z and RAR open as plain files |
//! | DMS unpacker | [`FileLayerBuilder::dms_unpacker`] | DMS opens as a plain file |
//! | History sink | [`FileLayerBuilder::history`] | discovered members are not reported |
//! | Notifier | [`FileLayerBuilder::notifier`] | the codec notice is only logged |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `deflate` | Yes | Built-in DEFLATE codec (flate2) and ZIP deflate support |
//! | `cli` | No | Command-line inspection tool |
//!
//! ## Error Handling
//!
//! Decompression is best-effort: content that cannot be decoded is handed
//! back unchanged. What reaches the caller is [`Error::NotFound`] for paths
//! that do not resolve, [`Error::UnknownHandle`] for stale ids and
//! [`Error::Io`] from real-file I/O. See [`error`] for the full taxonomy.
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`](https://docs.rs/log) facade. The
//! library installs no logger.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Default buffer size for read operations (8 KiB).
pub(crate) const READ_BUFFER_SIZE: usize = 8192;

pub mod checksum;
pub mod codec;
pub mod content;
pub mod decompress;
pub mod dms;
pub mod error;
pub mod format;
pub mod handle;
mod iterate;
mod layer;
pub mod options;
pub mod path;
pub mod plugin;
pub mod registry;
pub mod sink;

pub use content::ContentKind;
pub use error::{Error, Result};
pub use format::{Format, PluginKind};
pub use handle::{HandleId, OpenMode, VirtualFile, Whence};
pub use layer::{FileLayer, FileLayerBuilder};
pub use options::LayerOptions;
pub use registry::HandleRegistry;
pub use sink::{HistorySink, Notice, Notifier};
