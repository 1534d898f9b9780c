//! The [`FileLayer`] façade.

use std::path::Path;
use std::sync::Arc;

use crate::checksum::file_crc32;
use crate::codec::{self, CodecProvider, StreamFormat, deflate_to_sink, inflate_from_reader};
use crate::content::{self, ContentKind};
use crate::decompress::{Context, Decompressor, Dispatcher, Outcome};
use crate::dms::DmsUnpacker;
use crate::format::{Capabilities, Format, classify};
use crate::handle::{HandleId, OpenMode, VirtualFile, Whence};
use crate::iterate;
use crate::options::LayerOptions;
use crate::path::locate_container;
use crate::plugin::{ArchiveModule, Sessions};
use crate::registry::HandleRegistry;
use crate::sink::{HistorySink, Notifier, NotifyOnce};
use crate::{Error, Result};

/// Compression level used by [`FileLayer::deflate_into`].
const DEFLATE_LEVEL: u32 = 9;

/// Opens a path without registering or decompressing it.
///
/// A path naming an existing file opens that file. Otherwise the path is
/// split at the rightmost `container/member` boundary whose container is a
/// real file; such paths open read-only, with the member name attached.
/// Anything else is opened as a direct path with `mode`.
pub(crate) fn open_unregistered(path: &str, mode: OpenMode) -> Result<VirtualFile> {
    if path.is_empty() {
        return Err(Error::not_found(path));
    }

    if !Path::new(path).is_file() {
        if let Some(split) = locate_container(path) {
            if mode != OpenMode::Read {
                log::debug!("{}: archive members are read-only", path);
                return Err(Error::not_found(path));
            }
            match VirtualFile::open_path(split.container, OpenMode::Read) {
                Ok(mut file) => {
                    file.set_name(path);
                    file.set_member_name(Some(split.member.to_string()));
                    return Ok(file);
                }
                Err(e) => log::debug!("{}: cannot open container: {}", split.container, e),
            }
        }
    }

    VirtualFile::open_path(path, mode).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::not_found(path)
        } else {
            Error::Io(e)
        }
    })
}

/// Transparent archive-aware file access.
///
/// A `FileLayer` owns a [`HandleRegistry`] and the optional collaborators
/// (DEFLATE codec, plugin archive module, DMS unpacker, host callbacks).
/// Callers open paths and get back a [`HandleId`]; whether the bytes come
/// from a plain file, a gzip stream or a ZIP member is invisible to them.
///
/// ```rust,no_run
/// use arcvfs::{FileLayer, OpenMode, Whence};
///
/// # fn main() -> arcvfs::Result<()> {
/// let layer = FileLayer::new();
/// let id = layer.open("games/game.zip/disk1.adf", OpenMode::Read)?;
/// let mut boot = [0u8; 1024];
/// layer.read(id, &mut boot)?;
/// layer.seek(id, 0, Whence::End)?;
/// println!("{} bytes, crc {:08x}", layer.tell(id)?, layer.checksum(id)?);
/// layer.close(id)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileLayer {
    registry: HandleRegistry,
    cx: Context,
}

impl Default for FileLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl FileLayer {
    /// A layer with default options and the built-in codec, if compiled in.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts configuring a layer.
    pub fn builder() -> FileLayerBuilder {
        FileLayerBuilder::new()
    }

    /// Layer options.
    pub fn options(&self) -> &LayerOptions {
        self.cx.options()
    }

    /// Which optional collaborators are present.
    pub fn capabilities(&self) -> Capabilities {
        self.cx.capabilities()
    }

    /// Returns true if a DEFLATE codec is available.
    pub fn codec_available(&self) -> bool {
        self.cx.codec().is_some()
    }

    /// The registry of live handles.
    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Opens `path` and, in [`OpenMode::Read`], decompresses it once.
    ///
    /// A `container/member` path whose member cannot be produced is
    /// [`Error::NotFound`].
    pub fn open(&self, path: &str, mode: OpenMode) -> Result<HandleId> {
        let file = open_unregistered(path, mode)?;
        if mode != OpenMode::Read {
            return Ok(self.registry.insert(file));
        }

        let from_container = file.member_name().is_some();
        match self.cx.redispatch(file, 0) {
            Outcome::Unchanged(file) if from_container => {
                log::debug!("{}: member not available", path);
                file.close();
                Err(Error::not_found(path))
            }
            outcome => Ok(self.registry.insert(outcome.into_file())),
        }
    }

    /// Opens `path` without decompressing it.
    pub fn open_raw(&self, path: &str, mode: OpenMode) -> Result<HandleId> {
        Ok(self.registry.insert(open_unregistered(path, mode)?))
    }

    /// Returns true if `path` resolves to a real file, directly or as a
    /// container path.
    pub fn exists(&self, path: &str) -> bool {
        !path.is_empty() && (Path::new(path).is_file() || locate_container(path).is_some())
    }

    /// Registers a zero-filled memory handle of `size` bytes.
    pub fn create_memory(&self, name: &str, size: usize) -> HandleId {
        self.registry.insert(VirtualFile::memory(name, size))
    }

    /// Registers an existing file.
    pub fn adopt(&self, file: VirtualFile) -> HandleId {
        self.registry.insert(file)
    }

    /// Runs `f` against the file behind `id`.
    ///
    /// `f` must not call back into this layer's handle operations.
    pub fn with_file<T>(&self, id: HandleId, f: impl FnOnce(&mut VirtualFile) -> T) -> Result<T> {
        self.registry.with(id, f)
    }

    /// Moves the cursor and returns the previous position. The target is
    /// clamped into `[0, len]`.
    pub fn seek(&self, id: HandleId, offset: i64, whence: Whence) -> Result<u64> {
        Ok(self.registry.with(id, |file| file.seek_to(offset, whence))??)
    }

    /// Reads up to `buf.len()` bytes.
    pub fn read(&self, id: HandleId, buf: &mut [u8]) -> Result<usize> {
        Ok(self.registry.with(id, |file| file.read_bytes(buf))??)
    }

    /// Writes `buf`. Memory handles truncate at their fixed length.
    pub fn write(&self, id: HandleId, buf: &[u8]) -> Result<usize> {
        Ok(self.registry.with(id, |file| file.write_bytes(buf))??)
    }

    /// Writes a string.
    pub fn write_str(&self, id: HandleId, text: &str) -> Result<usize> {
        self.write(id, text.as_bytes())
    }

    /// Current cursor.
    pub fn tell(&self, id: HandleId) -> Result<u64> {
        self.registry.with(id, |file| file.tell())
    }

    /// Total length.
    pub fn len(&self, id: HandleId) -> Result<u64> {
        self.registry.with(id, |file| file.len())
    }

    /// Logical name.
    pub fn name(&self, id: HandleId) -> Result<String> {
        self.registry.with(id, |file| file.name().to_string())
    }

    /// Archive member name, if the handle came out of a container.
    pub fn member_name(&self, id: HandleId) -> Result<Option<String>> {
        self.registry
            .with(id, |file| file.member_name().map(str::to_string))
    }

    /// Returns true if the content is memory-backed, i.e. was decompressed.
    pub fn is_compressed(&self, id: HandleId) -> Result<bool> {
        self.registry.with(id, |file| file.is_compressed())
    }

    /// Marks the backing file for removal when the handle is closed.
    pub fn set_delete_on_close(&self, id: HandleId, delete: bool) -> Result<()> {
        self.registry
            .with(id, |file| file.set_delete_on_close(delete))
    }

    /// Sets the number of bytes to discard from the front of future writes.
    pub fn set_write_skip(&self, id: HandleId, bytes: u64) -> Result<()> {
        self.registry.with(id, |file| file.set_write_skip(bytes))
    }

    /// Closes a handle.
    pub fn close(&self, id: HandleId) -> Result<()> {
        self.registry.close(id)
    }

    /// Closes every handle. Returns how many were open.
    pub fn close_all(&self) -> usize {
        self.registry.close_all()
    }

    /// Number of live handles.
    pub fn live_handles(&self) -> usize {
        self.registry.len()
    }

    /// Number of plugin extraction sessions currently on the stack.
    pub fn active_sessions(&self) -> usize {
        self.cx.sessions().depth()
    }

    /// Classifies the content behind `id`.
    pub fn classify(&self, id: HandleId) -> Result<Format> {
        let caps = self.capabilities();
        Ok(self.registry.with(id, |file| classify(file, &caps))??)
    }

    /// Decompresses `id` once.
    ///
    /// Returns the id to use from now on: a new id if decoding took place
    /// (the old one is closed), otherwise `id` itself with its cursor
    /// rewound.
    pub fn decompress(&self, id: HandleId) -> Result<HandleId> {
        let file = self.registry.remove(id)?;
        Ok(match self.cx.redispatch(file, 0) {
            Outcome::Unchanged(file) => {
                self.registry.restore(id, file);
                id
            }
            Outcome::Replaced(file) => self.registry.insert(file),
        })
    }

    /// CRC-32 of the whole content. The cursor is not moved.
    pub fn checksum(&self, id: HandleId) -> Result<u32> {
        Ok(self.registry.with(id, file_crc32)??)
    }

    /// What the content is for. The cursor is not moved.
    pub fn content_kind(&self, id: HandleId) -> Result<ContentKind> {
        Ok(self.registry.with(id, content::detect)??)
    }

    /// Visits every member of the archive at `path`, or the file itself,
    /// undecoded, if it is not an archive.
    ///
    /// Each member is a transient memory handle, already decompressed once,
    /// that is closed as soon as the visitor returns. Directories and
    /// ignore-listed members are skipped. Returning `false` from the
    /// visitor stops the enumeration, and the call then returns
    /// `Ok(false)`. Archives that cannot be enumerated are logged and
    /// reported as `Ok(true)`.
    pub fn for_each_member<F>(&self, path: &str, mut visitor: F) -> Result<bool>
    where
        F: FnMut(&mut VirtualFile) -> bool,
    {
        iterate::for_each_member(&self.cx, path, &mut visitor)
    }

    /// Inflates a zlib stream of `src_len` bytes, read from the cursor of
    /// `src`, into `dst`. Returns the number of bytes produced.
    pub fn inflate_into(&self, src: HandleId, src_len: u64, dst: &mut [u8]) -> Result<usize> {
        let codec = self.cx.require_codec()?;
        let chunk_size = self.options().inflate_chunk_size;
        self.registry.with(src, |file| {
            let mut inflater = codec.inflater(StreamFormat::Zlib);
            inflate_from_reader(inflater.as_mut(), file, src_len, dst, chunk_size)
                .map(|outcome| outcome.produced)
        })?
    }

    /// Compresses `src` as a zlib stream into `dst` at its cursor. Returns
    /// the number of compressed bytes written.
    pub fn deflate_into(&self, dst: HandleId, src: &[u8]) -> Result<u64> {
        let codec = self.cx.require_codec()?;
        let chunk_size = self.options().inflate_chunk_size;
        self.registry.with(dst, |file| {
            let mut deflater = codec.deflater(StreamFormat::Zlib, DEFLATE_LEVEL);
            deflate_to_sink(deflater.as_mut(), src, chunk_size, |block| {
                if file.write_bytes(block)? != block.len() {
                    return Err(Error::ResourceLimitExceeded(format!(
                        "destination '{}' is full",
                        file.name()
                    )));
                }
                Ok(())
            })
        })?
    }
}

/// Builder for [`FileLayer`].
pub struct FileLayerBuilder {
    options: LayerOptions,
    codec: Option<Arc<dyn CodecProvider>>,
    archive_module: Option<Arc<dyn ArchiveModule>>,
    dms: Option<Arc<dyn DmsUnpacker>>,
    history: Option<Arc<dyn HistorySink>>,
    notifier: Option<Arc<dyn Notifier>>,
    dispatcher: Dispatcher,
}

impl Default for FileLayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FileLayerBuilder {
    /// Default options, built-in codec, no modules, no callbacks.
    pub fn new() -> Self {
        Self {
            options: LayerOptions::default(),
            codec: codec::builtin(),
            archive_module: None,
            dms: None,
            history: None,
            notifier: None,
            dispatcher: Dispatcher::standard(),
        }
    }

    /// Replaces the options.
    pub fn options(mut self, options: LayerOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses `codec` for gzip, ZIP and the raw zlib helpers.
    pub fn codec(mut self, codec: impl CodecProvider + 'static) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    /// Runs without a DEFLATE codec.
    pub fn without_codec(mut self) -> Self {
        self.codec = None;
        self
    }

    /// Uses `module` for 7z, RAR and codec-less ZIP archives.
    pub fn archive_module(mut self, module: impl ArchiveModule + 'static) -> Self {
        self.archive_module = Some(Arc::new(module));
        self
    }

    /// Uses `unpacker` for DMS archives.
    pub fn dms_unpacker(mut self, unpacker: impl DmsUnpacker + 'static) -> Self {
        self.dms = Some(Arc::new(unpacker));
        self
    }

    /// Receives archive members discovered during selection.
    pub fn history(mut self, sink: impl HistorySink + 'static) -> Self {
        self.history = Some(Arc::new(sink));
        self
    }

    /// Receives the one-time "codec unavailable" notice.
    pub fn notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    /// Adds a decompression strategy that takes precedence over the
    /// built-in ones.
    pub fn decompressor(mut self, strategy: impl Decompressor + 'static) -> Self {
        self.dispatcher.prepend(Box::new(strategy));
        self
    }

    /// Builds the layer.
    pub fn build(self) -> FileLayer {
        if self.codec.is_none() {
            log::debug!("building file layer without a DEFLATE codec");
        }
        FileLayer {
            registry: HandleRegistry::new(),
            cx: Context {
                sessions: Sessions::new(self.options.session_capacity),
                options: self.options,
                codec: self.codec,
                archive_module: self.archive_module,
                dms: self.dms,
                history: self.history,
                notifier: self.notifier,
                codec_notice: NotifyOnce::new(),
                dispatcher: self.dispatcher,
            },
        }
    }
}

impl std::fmt::Debug for FileLayerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLayerBuilder")
            .field("options", &self.options)
            .field("codec", &self.codec.as_ref().map(|c| c.name().to_string()))
            .field("archive_module", &self.archive_module.is_some())
            .field("dms", &self.dms.is_some())
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
