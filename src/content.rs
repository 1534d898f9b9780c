//! Content kind detection.
//!
//! Answers "what is this file for" rather than "how is it packed": a disk
//! image, a ROM, a saved state and so on. Extensions decide first; failing
//! that, an executable hunk header marks the content as something to put
//! on a disk.

use std::io;

use crate::handle::VirtualFile;
use crate::path::extension;

/// Header of an executable hunk file.
const HUNK_HEADER: [u8; 8] = [0x00, 0x00, 0x03, 0xF3, 0x00, 0x00, 0x00, 0x00];

/// What a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// A floppy image, or an executable that can be turned into one.
    DiskImage,
    /// A ROM image.
    Rom,
    /// A saved machine state.
    StateFile,
    /// A ROM key file.
    Key,
    /// Non-volatile RAM contents.
    Nvram,
    /// A configuration file.
    Configuration,
    /// None of the above.
    Unknown,
}

impl ContentKind {
    /// Lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DiskImage => "disk-image",
            Self::Rom => "rom",
            Self::StateFile => "state",
            Self::Key => "key",
            Self::Nvram => "nvram",
            Self::Configuration => "configuration",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

const EXTENSION_KINDS: &[(&[&str], ContentKind)] = &[
    (&["adf", "adz", "ipf", "fdi", "dms"], ContentKind::DiskImage),
    (&["rom", "roz"], ContentKind::Rom),
    (&["uss"], ContentKind::StateFile),
    (&["key"], ContentKind::Key),
    (&["nvr"], ContentKind::Nvram),
    (&["uae"], ContentKind::Configuration),
];

/// Kind implied by a file name alone.
pub fn kind_from_name(name: &str) -> Option<ContentKind> {
    let ext = extension(name)?;
    EXTENSION_KINDS
        .iter()
        .find(|(extensions, _)| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .map(|(_, kind)| *kind)
}

/// Detects the kind of `file`. The member name, when present, takes
/// precedence over the handle name. The cursor is left where it was.
pub fn detect(file: &mut VirtualFile) -> io::Result<ContentKind> {
    let by_name = file
        .member_name()
        .and_then(kind_from_name)
        .or_else(|| kind_from_name(file.name()));
    if let Some(kind) = by_name {
        return Ok(kind);
    }

    let start = file.tell();
    file.seek_to(0, crate::handle::Whence::Start)?;
    let mut header = [0u8; HUNK_HEADER.len()];
    let read = file.read_bytes(&mut header);
    file.seek_to(start as i64, crate::handle::Whence::Start)?;

    Ok(if read? == HUNK_HEADER.len() && header == HUNK_HEADER {
        ContentKind::DiskImage
    } else {
        ContentKind::Unknown
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Whence;

    #[test]
    fn test_by_extension() {
        assert_eq!(kind_from_name("Workbench.ADF"), Some(ContentKind::DiskImage));
        assert_eq!(kind_from_name("kick.rom"), Some(ContentKind::Rom));
        assert_eq!(kind_from_name("save.uss"), Some(ContentKind::StateFile));
        assert_eq!(kind_from_name("rom.key"), Some(ContentKind::Key));
        assert_eq!(kind_from_name("cd32.nvr"), Some(ContentKind::Nvram));
        assert_eq!(kind_from_name("default.uae"), Some(ContentKind::Configuration));
        assert_eq!(kind_from_name("notes.txt"), None);
    }

    #[test]
    fn test_member_name_wins() {
        let mut file = VirtualFile::from_bytes("bundle.zip", vec![0; 4]);
        file.set_member_name(Some("kick.rom".into()));
        assert_eq!(detect(&mut file).unwrap(), ContentKind::Rom);
    }

    #[test]
    fn test_hunk_header() {
        let mut data = HUNK_HEADER.to_vec();
        data.extend_from_slice(&[1, 2, 3, 4]);
        let mut file = VirtualFile::from_bytes("game", data);
        file.seek_to(10, Whence::Start).unwrap();
        assert_eq!(detect(&mut file).unwrap(), ContentKind::DiskImage);
        assert_eq!(file.tell(), 10);
    }

    #[test]
    fn test_unknown() {
        let mut file = VirtualFile::from_bytes("blob", vec![0; 3]);
        assert_eq!(detect(&mut file).unwrap(), ContentKind::Unknown);
    }
}
