//! Format sniffing.
//!
//! Classification looks at two kinds of evidence, in order:
//!
//! 1. the file extension, matched against [`EXTENSION_RULES`];
//! 2. when the extension is inconclusive, the leading magic bytes, matched
//!    against [`SIGNATURE_RULES`].
//!
//! Both tables are ordered lists of `(matcher, format)` pairs, so adding a
//! format means adding a row rather than growing a conditional chain. The
//! peek never moves the handle's cursor.

use std::io;

use super::{
    DMS_SIGNATURE, Format, GZIP_SIGNATURE, PluginKind, RAR_SIGNATURE, SEVEN_ZIP_SIGNATURE,
    ZIP_SIGNATURE,
};
use crate::handle::VirtualFile;

/// Optional collaborators available to the layer.
///
/// Classification is capability-aware: a `.zip` is only a [`Format::Zip`]
/// when a DEFLATE codec is present, and is otherwise handed to the plugin
/// archive module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// A DEFLATE codec is available.
    pub codec: bool,
    /// A plugin archive module is available.
    pub archive_module: bool,
    /// A DMS unpacker is available.
    pub dms: bool,
}

impl Capabilities {
    /// Every collaborator present.
    pub fn all() -> Self {
        Self {
            codec: true,
            archive_module: true,
            dms: true,
        }
    }

    fn zip_format(&self) -> Format {
        if self.codec {
            Format::Zip
        } else {
            Format::PluginArchive(PluginKind::Zip)
        }
    }
}

/// Extension classes, resolved against [`Capabilities`] at classification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Fixed(Format),
    Zip,
}

impl Rule {
    fn resolve(self, caps: &Capabilities) -> Format {
        match self {
            Rule::Fixed(format) => format,
            Rule::Zip => caps.zip_format(),
        }
    }
}

/// Extension table, evaluated in order.
const EXTENSION_RULES: &[(&[&str], Rule)] = &[
    (&["gz", "adz", "roz"], Rule::Fixed(Format::Gzip)),
    (&["zip"], Rule::Zip),
    (&["dms"], Rule::Fixed(Format::Dms)),
    (
        &["7z"],
        Rule::Fixed(Format::PluginArchive(PluginKind::SevenZip)),
    ),
    (&["rar"], Rule::Fixed(Format::PluginArchive(PluginKind::Rar))),
    (&["lha", "lzh"], Rule::Fixed(Format::Lha)),
];

/// Signature table, evaluated in order against the first bytes.
const SIGNATURE_RULES: &[(&[u8], Rule)] = &[
    (GZIP_SIGNATURE, Rule::Fixed(Format::Gzip)),
    (ZIP_SIGNATURE, Rule::Zip),
    (DMS_SIGNATURE, Rule::Fixed(Format::Dms)),
    (
        SEVEN_ZIP_SIGNATURE,
        Rule::Fixed(Format::PluginArchive(PluginKind::SevenZip)),
    ),
    (
        RAR_SIGNATURE,
        Rule::Fixed(Format::PluginArchive(PluginKind::Rar)),
    ),
];

/// LHA level-0/1/2 headers carry `-lh?-` at offset 2.
const LHA_METHOD_OFFSET: usize = 2;

/// Number of bytes peeked for signature matching.
const PEEK_LEN: usize = 8;

/// Classifies a format from an extension alone.
///
/// ```rust
/// use arcvfs::format::{Capabilities, Format, PluginKind};
/// use arcvfs::format::detect::format_from_extension;
///
/// let caps = Capabilities::all();
/// assert_eq!(format_from_extension("ADZ", &caps), Some(Format::Gzip));
/// assert_eq!(format_from_extension("7z", &caps), Some(Format::PluginArchive(PluginKind::SevenZip)));
/// assert_eq!(format_from_extension("adf", &caps), None);
/// ```
pub fn format_from_extension(extension: &str, caps: &Capabilities) -> Option<Format> {
    EXTENSION_RULES
        .iter()
        .find(|(extensions, _)| extensions.iter().any(|e| e.eq_ignore_ascii_case(extension)))
        .map(|(_, rule)| rule.resolve(caps))
}

/// Classifies a format from leading bytes alone.
pub fn format_from_signature(header: &[u8], caps: &Capabilities) -> Option<Format> {
    if let Some((_, rule)) = SIGNATURE_RULES
        .iter()
        .find(|(signature, _)| header.starts_with(signature))
    {
        return Some(rule.resolve(caps));
    }

    let method = header.get(LHA_METHOD_OFFSET..LHA_METHOD_OFFSET + 3)?;
    let terminator = header.get(LHA_METHOD_OFFSET + 4)?;
    (method == b"-lh" && *terminator == b'-').then_some(Format::Lha)
}

/// Classifies an open handle.
///
/// The extension is taken from the real file path for file-backed handles
/// (so a handle opened as `game.zip/disk.adz` is judged by `.zip`) and from
/// the logical name for memory-backed ones.
pub fn classify(file: &mut VirtualFile, caps: &Capabilities) -> io::Result<Format> {
    let extension = {
        let source = match file.real_path() {
            Some(path) => path.to_string_lossy().into_owned(),
            None => file.name().to_string(),
        };
        crate::path::extension(&source).map(str::to_string)
    };

    if let Some(format) = extension
        .as_deref()
        .and_then(|ext| format_from_extension(ext, caps))
    {
        return Ok(format);
    }

    let start = file.tell();
    file.seek_to(0, crate::handle::Whence::Start)?;
    let mut header = [0u8; PEEK_LEN];
    let peeked = file.read_bytes(&mut header);
    file.seek_to(start as i64, crate::handle::Whence::Start)?;
    let n = peeked?;

    Ok(format_from_signature(&header[..n], caps).unwrap_or(Format::Plain))
}
