//! Content formats recognized by the layer.
//!
//! The [`detect`] submodule classifies an open handle into a [`Format`];
//! the dispatcher in [`crate::decompress`] then routes it to the matching
//! decompressor.

pub mod detect;

pub use detect::{Capabilities, classify};

/// gzip stream signature.
pub const GZIP_SIGNATURE: &[u8; 2] = &[0x1F, 0x8B];

/// ZIP signature prefix shared by local headers and the end-of-directory record.
pub const ZIP_SIGNATURE: &[u8; 2] = b"PK";

/// DMS disk image signature.
pub const DMS_SIGNATURE: &[u8; 4] = b"DMS!";

/// 7z signature prefix.
pub const SEVEN_ZIP_SIGNATURE: &[u8; 4] = &[0x37, 0x7A, 0xBC, 0xAF];

/// RAR signature prefix (v4 and v5 share it).
pub const RAR_SIGNATURE: &[u8; 4] = b"Rar!";

/// Archive family handled by the plugin archive module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    /// 7z archive. Members of a solid block are extracted with a write skip.
    SevenZip,
    /// RAR archive.
    Rar,
    /// ZIP archive, used when no DEFLATE codec is available.
    Zip,
}

impl PluginKind {
    /// Returns the typical file extension for this family.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::SevenZip => "7z",
            Self::Rar => "rar",
            Self::Zip => "zip",
        }
    }

    /// Returns true if members of this family may share a solid block.
    pub fn is_solid(&self) -> bool {
        matches!(self, Self::SevenZip)
    }
}

/// Classification of a handle's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Not a recognized container; the handle is used as is.
    Plain,
    /// gzip stream (`.gz`, `.adz`, `.roz`).
    Gzip,
    /// ZIP archive read with the built-in directory parser.
    Zip,
    /// DMS-compressed disk image.
    Dms,
    /// LHA/LZH archive. Recognized but not decoded.
    Lha,
    /// Archive family delegated to the plugin archive module.
    PluginArchive(PluginKind),
}

impl Format {
    /// Returns a human-readable name for this format.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Gzip => "gzip",
            Self::Zip => "ZIP",
            Self::Dms => "DMS",
            Self::Lha => "LHA",
            Self::PluginArchive(PluginKind::SevenZip) => "7-Zip (plugin)",
            Self::PluginArchive(PluginKind::Rar) => "RAR (plugin)",
            Self::PluginArchive(PluginKind::Zip) => "ZIP (plugin)",
        }
    }

    /// Returns true if the format holds several named members.
    pub fn is_archive(&self) -> bool {
        matches!(self, Self::Zip | Self::PluginArchive(_))
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
