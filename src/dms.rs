//! DMS unpacker contract.
//!
//! DMS is a track-based disk archiver. Decoding is delegated to an external
//! unpacker that fills a fixed-size floppy image.

use crate::handle::VirtualFile;

/// Result reported by a [`DmsUnpacker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmsStatus {
    /// Every track was unpacked.
    Ok,
    /// The input ended cleanly before the last track.
    FileEnd,
    /// Unpacking failed with a module-specific code.
    Failed(i32),
}

impl DmsStatus {
    /// Returns true for the statuses that yield a usable image.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::FileEnd)
    }
}

/// An external DMS decoder.
pub trait DmsUnpacker: Send + Sync {
    /// Unpacks `input` (positioned at its start) into `output`, a zeroed
    /// memory file of the configured image size.
    fn unpack(&self, input: &mut VirtualFile, output: &mut VirtualFile) -> DmsStatus;
}
