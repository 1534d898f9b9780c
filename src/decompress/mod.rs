//! Decompression dispatcher.
//!
//! [`Dispatcher`] holds an ordered list of [`Decompressor`] strategies. A
//! handle is classified once with [`classify`], and the first strategy
//! that accepts the resulting [`Format`] is run. The outcome is always one
//! of two things:
//!
//! - [`Outcome::Replaced`]: a fully populated memory handle; the original
//!   handle has been closed;
//! - [`Outcome::Unchanged`]: the original handle, rewound to its start.
//!
//! Strategy errors never cross this boundary. They are logged and turned
//! into `Unchanged`, so a half-decoded buffer can never reach the caller.
//!
//! Results are not re-dispatched at the top level: a gzip that wraps
//! another gzip takes two calls. ZIP and plugin members are the exception,
//! they are classified once more inside the archive, bounded by
//! [`LayerOptions::max_nesting_depth`].

mod dms;
mod gzip;
mod plugin;
mod select;
mod zip;

pub use self::dms::DmsDecompressor;
pub use self::gzip::GzipDecompressor;
pub use self::plugin::PluginDecompressor;
pub use self::zip::ZipDecompressor;

pub(crate) use self::plugin::{SolidOffsets, with_plugin_archive};
pub(crate) use self::select::container_label;
pub(crate) use self::zip::{read_zip_entry, zip_entry_meta, zip_error};

use std::sync::Arc;

use crate::codec::CodecProvider;
use crate::dms::DmsUnpacker;
use crate::format::{Capabilities, Format, classify};
use crate::handle::{VirtualFile, Whence};
use crate::options::LayerOptions;
use crate::plugin::{ArchiveModule, Sessions};
use crate::sink::{HistorySink, Notice, Notifier, NotifyOnce};
use crate::{Error, Result};

/// A decoder for one family of formats.
pub trait Decompressor: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Returns true if this strategy decodes `format`.
    fn accepts(&self, format: Format) -> bool;

    /// Decodes `file` into a new memory handle.
    ///
    /// On error the caller keeps `file`, so implementations that take the
    /// file apart temporarily must put it back before returning. `depth`
    /// is the archive nesting level of `file`.
    fn decompress(
        &self,
        cx: &Context,
        format: Format,
        file: &mut VirtualFile,
        depth: usize,
    ) -> Result<VirtualFile>;
}

/// Strategy for LHA/LZH archives, which are recognized but not decoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct LhaDecompressor;

impl Decompressor for LhaDecompressor {
    fn name(&self) -> &'static str {
        "lha"
    }

    fn accepts(&self, format: Format) -> bool {
        format == Format::Lha
    }

    fn decompress(&self, _: &Context, _: Format, _: &mut VirtualFile, _: usize) -> Result<VirtualFile> {
        Err(Error::UnsupportedFeature {
            feature: "LHA archives",
        })
    }
}

/// Result of a dispatch.
#[derive(Debug)]
pub enum Outcome {
    /// Nothing was decoded. The original handle, rewound.
    Unchanged(VirtualFile),
    /// The decoded content.
    Replaced(VirtualFile),
}

impl Outcome {
    /// Returns the handle, whichever it is.
    pub fn into_file(self) -> VirtualFile {
        match self {
            Self::Unchanged(file) | Self::Replaced(file) => file,
        }
    }

    /// Returns true if decoding took place.
    pub fn is_replaced(&self) -> bool {
        matches!(self, Self::Replaced(_))
    }
}

/// Ordered list of decompression strategies.
pub struct Dispatcher {
    strategies: Vec<Box<dyn Decompressor>>,
}

impl Dispatcher {
    /// The built-in strategies: gzip, ZIP, DMS, plugin archives and LHA.
    pub fn standard() -> Self {
        Self {
            strategies: vec![
                Box::new(GzipDecompressor),
                Box::new(ZipDecompressor),
                Box::new(DmsDecompressor),
                Box::new(PluginDecompressor),
                Box::new(LhaDecompressor),
            ],
        }
    }

    /// Adds a strategy ahead of the existing ones.
    pub fn prepend(&mut self, strategy: Box<dyn Decompressor>) {
        self.strategies.insert(0, strategy);
    }

    /// Names of the strategies, in evaluation order.
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub(crate) fn dispatch(&self, cx: &Context, mut file: VirtualFile, depth: usize) -> Outcome {
        if depth > cx.options.max_nesting_depth {
            log::debug!(
                "{}: nesting depth {} exceeds limit, not decompressing",
                file.name(),
                depth
            );
            return unchanged(file);
        }

        let format = match classify(&mut file, &cx.capabilities()) {
            Ok(format) => format,
            Err(e) => {
                log::debug!("{}: cannot classify: {}", file.name(), e);
                return unchanged(file);
            }
        };
        if format == Format::Plain {
            return unchanged(file);
        }

        let Some(strategy) = self.strategies.iter().find(|s| s.accepts(format)) else {
            log::trace!("{}: no decompressor for {}", file.name(), format);
            return unchanged(file);
        };

        log::trace!("{}: {} via {}", file.name(), format, strategy.name());
        match strategy.decompress(cx, format, &mut file, depth) {
            Ok(mut produced) => {
                if let Err(e) = produced.seek_to(0, Whence::Start) {
                    log::warn!("{}: cannot rewind decoded content: {}", produced.name(), e);
                }
                file.close();
                Outcome::Replaced(produced)
            }
            Err(e) => {
                log::debug!("{}: {} left unchanged: {}", file.name(), format, e);
                unchanged(file)
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("strategies", &self.names())
            .finish()
    }
}

fn unchanged(mut file: VirtualFile) -> Outcome {
    if let Err(e) = file.seek_to(0, Whence::Start) {
        log::warn!("{}: cannot rewind: {}", file.name(), e);
    }
    Outcome::Unchanged(file)
}

/// Everything a strategy may use: options, optional collaborators and the
/// host callbacks.
pub struct Context {
    pub(crate) options: LayerOptions,
    pub(crate) codec: Option<Arc<dyn CodecProvider>>,
    pub(crate) archive_module: Option<Arc<dyn ArchiveModule>>,
    pub(crate) dms: Option<Arc<dyn DmsUnpacker>>,
    pub(crate) history: Option<Arc<dyn HistorySink>>,
    pub(crate) notifier: Option<Arc<dyn Notifier>>,
    pub(crate) codec_notice: NotifyOnce,
    pub(crate) sessions: Sessions,
    pub(crate) dispatcher: Dispatcher,
}

impl Context {
    /// Layer options.
    pub fn options(&self) -> &LayerOptions {
        &self.options
    }

    /// Which optional collaborators are present.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            codec: self.codec.is_some(),
            archive_module: self.archive_module.is_some(),
            dms: self.dms.is_some(),
        }
    }

    /// Returns the codec, if one is available.
    pub fn codec(&self) -> Option<&Arc<dyn CodecProvider>> {
        self.codec.as_ref()
    }

    /// Returns the codec, or notifies the host (once per layer) that it is
    /// missing and fails with [`Error::CodecUnavailable`].
    pub fn require_codec(&self) -> Result<&Arc<dyn CodecProvider>> {
        match &self.codec {
            Some(codec) => Ok(codec),
            None => {
                self.codec_notice
                    .fire(self.notifier.as_deref(), Notice::CodecUnavailable);
                Err(Error::CodecUnavailable)
            }
        }
    }

    /// Returns the plugin archive module, if any.
    pub fn archive_module(&self) -> Option<&Arc<dyn ArchiveModule>> {
        self.archive_module.as_ref()
    }

    /// Returns the DMS unpacker, if any.
    pub fn dms(&self) -> Option<&Arc<dyn DmsUnpacker>> {
        self.dms.as_ref()
    }

    /// Returns the plugin extraction session arena.
    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    /// Reports a discovered archive member to the history sink, if any.
    pub fn record_candidate(&self, path: &str) {
        if let Some(history) = &self.history {
            log::trace!("history candidate '{}'", path);
            history.record_candidate(path);
        }
    }

    /// Runs `file` through the dispatcher at archive nesting level `depth`.
    pub fn redispatch(&self, file: VirtualFile, depth: usize) -> Outcome {
        self.dispatcher.dispatch(self, file, depth)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("options", &self.options)
            .field("capabilities", &self.capabilities())
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::context;
    use super::*;

    #[test]
    fn test_plain_is_unchanged_and_rewound() {
        let cx = context(None);
        let mut file = VirtualFile::from_bytes("disk.adf", vec![1, 2, 3, 4]);
        file.seek_to(3, Whence::Start).unwrap();

        let outcome = cx.redispatch(file, 0);
        assert!(!outcome.is_replaced());
        let file = outcome.into_file();
        assert_eq!(file.name(), "disk.adf");
        assert_eq!(file.len(), 4);
        assert_eq!(file.tell(), 0);
    }

    #[test]
    fn test_lha_is_unchanged() {
        let cx = context(None);
        let file = VirtualFile::from_bytes("music.lha", b"\0\0-lh5-rest".to_vec());
        let outcome = cx.redispatch(file, 0);
        assert!(!outcome.is_replaced());
    }

    #[test]
    fn test_depth_limit() {
        let cx = context(crate::codec::builtin());
        let file = VirtualFile::from_bytes("x.gz", vec![0x1F, 0x8B, 8, 0]);
        let depth = cx.options().max_nesting_depth + 1;
        assert!(!cx.redispatch(file, depth).is_replaced());
    }

    #[test]
    fn test_missing_codec_notifies_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let mut cx = context(None);
        cx.notifier = Some(Arc::new(move |_: Notice| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        for _ in 0..3 {
            let file = VirtualFile::from_bytes("disk.adz", vec![0x1F, 0x8B, 8, 0, 0, 0]);
            assert!(!cx.redispatch(file, 0).is_replaced());
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prepend_takes_precedence() {
        struct Upper;
        impl Decompressor for Upper {
            fn name(&self) -> &'static str {
                "upper"
            }
            fn accepts(&self, format: Format) -> bool {
                format == Format::Lha
            }
            fn decompress(
                &self,
                _: &Context,
                _: Format,
                file: &mut VirtualFile,
                _: usize,
            ) -> Result<VirtualFile> {
                let data = file.read_all()?.to_ascii_uppercase();
                Ok(VirtualFile::from_bytes(file.name(), data))
            }
        }

        let mut cx = context(None);
        cx.dispatcher.prepend(Box::new(Upper));
        assert_eq!(cx.dispatcher.names()[0], "upper");

        let file = VirtualFile::from_bytes("a.lzh", b"ab-lh0-x".to_vec());
        let outcome = cx.redispatch(file, 0);
        assert!(outcome.is_replaced());
        assert_eq!(outcome.into_file().memory_data().unwrap(), b"AB-LH0-X");
    }
}
