//! ZIP member extraction.

use std::io::{Read, Seek};

use zip::ZipArchive;
use zip::result::ZipError;

use super::select::{HistoryTracker, MemberSelector, container_label, is_eligible};
use super::{Context, Decompressor, Outcome};
use crate::format::Format;
use crate::handle::VirtualFile;
use crate::path::join_member;
use crate::{Error, Result};

/// Extracts one member of a ZIP archive.
///
/// The directory is read with the `zip` crate. Empty entries and
/// directories are skipped, ignore-listed entries are never selected, and
/// the selected member is read fully into memory and classified once more
/// in case it is itself compressed. Only the selected entry is decoded, so
/// entries with a method or encryption the `zip` crate cannot handle do
/// not spoil the rest of the archive.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipDecompressor;

impl Decompressor for ZipDecompressor {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn accepts(&self, format: Format) -> bool {
        format == Format::Zip
    }

    fn decompress(
        &self,
        cx: &Context,
        _: Format,
        file: &mut VirtualFile,
        depth: usize,
    ) -> Result<VirtualFile> {
        cx.require_codec()?;
        let container = container_label(file);
        let wanted = file.member_name().map(str::to_string);
        let mut selector = MemberSelector::new(wanted.as_deref());
        let mut history = HistoryTracker::new(cx, &container);
        let max_member_size = cx.options().max_member_size;

        let mut archive = ZipArchive::new(&mut *file).map_err(zip_error)?;
        let mut selected = None;
        let mut position = 0;

        for index in 0..archive.len() {
            let Some((name, size, is_dir)) = zip_entry_meta(&mut archive, index, &container)
            else {
                continue;
            };
            if is_dir || size == 0 {
                continue;
            }
            position += 1;
            if !is_eligible(cx.options(), &name) {
                continue;
            }
            history.observe(&name);

            if !selector.matches(position, &name) {
                continue;
            }
            match read_zip_entry(&mut archive, index, &name, size, max_member_size) {
                Ok(data) => {
                    selector.mark_selected();
                    selected = Some((name, data));
                }
                Err(e) => log::debug!("{}: cannot read member '{}': {}", container, name, e),
            }
        }

        let (name, data) = selected.ok_or_else(|| {
            Error::not_found(join_member(&container, wanted.as_deref().unwrap_or("")))
        })?;
        let member = VirtualFile::from_bytes(join_member(&container, &name), data);
        let mut produced = match cx.redispatch(member, depth + 1) {
            Outcome::Unchanged(file) | Outcome::Replaced(file) => file,
        };
        if produced.member_name().is_none() {
            produced.set_member_name(Some(name));
        }
        Ok(produced)
    }
}

/// Name, uncompressed size and directory flag of entry `index`.
///
/// Read from the raw entry, which needs no decoder. An entry whose header
/// cannot be read is logged and yields `None`.
pub(crate) fn zip_entry_meta<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    container: &str,
) -> Option<(String, u64, bool)> {
    match archive.by_index_raw(index) {
        Ok(entry) => Some((entry.name().to_string(), entry.size(), entry.is_dir())),
        Err(e) => {
            log::debug!("{}: skipping entry {}: {}", container, index, e);
            None
        }
    }
}

/// Decodes entry `index` and reads it with [`read_zip_member`].
pub(crate) fn read_zip_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    name: &str,
    declared: u64,
    max_size: u64,
) -> Result<Vec<u8>> {
    let mut entry = archive.by_index(index).map_err(zip_error)?;
    read_zip_member(&mut entry, name, declared, max_size)
}

/// Reads a whole archive member of `declared` bytes, bounded by `max_size`.
///
/// Reading to the end lets the `zip` crate verify the entry CRC.
fn read_zip_member(
    entry: &mut impl Read,
    name: &str,
    declared: u64,
    max_size: u64,
) -> Result<Vec<u8>> {
    if declared > max_size {
        return Err(Error::ResourceLimitExceeded(format!(
            "member '{}' declares {} bytes",
            name, declared
        )));
    }
    let capacity = usize::try_from(declared)
        .map_err(|_| Error::ResourceLimitExceeded(format!("member size {}", declared)))?;
    let mut data = Vec::with_capacity(capacity);
    entry.take(declared + 1).read_to_end(&mut data)?;
    if data.len() as u64 != declared {
        log::warn!("unpack failed, got only {} bytes of '{}'", data.len(), name);
        return Err(Error::corrupt(format!(
            "member '{}' has {} bytes, directory declares {}",
            name,
            data.len(),
            declared
        )));
    }
    Ok(data)
}

/// Maps a `zip` crate error into the layer's error type.
pub(crate) fn zip_error(e: ZipError) -> Error {
    match e {
        ZipError::Io(e) => Error::Io(e),
        ZipError::UnsupportedArchive(_) => Error::UnsupportedFeature {
            feature: "ZIP archive variant",
        },
        other => Error::corrupt(format!("ZIP: {}", other)),
    }
}

#[cfg(all(test, feature = "deflate"))]
mod tests {
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;

    use super::super::test_support::context;
    use super::*;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn decode(member: Option<&str>, bytes: Vec<u8>) -> Result<VirtualFile> {
        let cx = context(crate::codec::builtin());
        let mut file = VirtualFile::from_bytes("game.zip", bytes);
        file.set_member_name(member.map(str::to_string));
        ZipDecompressor.decompress(&cx, Format::Zip, &mut file, 0)
    }

    fn fixture() -> Vec<u8> {
        build_zip(&[
            ("readme.txt", b"read me!!!"),
            ("disk1.adf", &[1u8; 50]),
            ("disk2.adf", &[2u8; 60]),
        ])
    }

    #[test]
    fn test_first_eligible() {
        let out = decode(None, fixture()).unwrap();
        assert_eq!(out.len(), 50);
        assert_eq!(out.member_name(), Some("disk1.adf"));
        assert!(out.is_compressed());
    }

    #[test]
    fn test_index_selector_counts_ignored_entries() {
        let out = decode(Some("#3"), fixture()).unwrap();
        assert_eq!(out.len(), 60);
        assert_eq!(out.memory_data().unwrap()[0], 2);
    }

    #[test]
    fn test_named_member() {
        let out = decode(Some("DISK2.adf"), fixture()).unwrap();
        assert_eq!(out.len(), 60);
    }

    #[test]
    fn test_ignored_member_is_never_selected() {
        assert!(decode(Some("readme.txt"), fixture()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_missing_member() {
        assert!(decode(Some("disk9.adf"), fixture()).is_err());
    }

    #[test]
    fn test_nested_gzip_member_is_unwrapped() {
        let data = vec![9u8; 300];
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&data).unwrap();
        let gz = encoder.finish().unwrap();

        let out = decode(None, build_zip(&[("disk.adz", &gz)])).unwrap();
        assert_eq!(out.memory_data().unwrap(), data.as_slice());
        assert_eq!(out.member_name(), Some("disk.adz"));
    }

    #[test]
    fn test_not_a_zip() {
        let err = decode(None, b"PK but not really".to_vec()).unwrap_err();
        assert!(err.is_corruption() || matches!(err, Error::Io(_)));
    }
}
