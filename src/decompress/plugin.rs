//! Extraction through the plugin archive module.

use std::mem;

use super::select::{HistoryTracker, MemberSelector, container_label, is_eligible};
use super::{Context, Decompressor, Outcome};
use crate::format::{Format, PluginKind};
use crate::handle::{VirtualFile, Whence};
use crate::path::join_member;
use crate::plugin::{ArchiveHandle, ArchiveModule, MemberInfo, StreamId};
use crate::{Error, Result};

/// Extracts one member of a 7z, RAR or (codec-less) ZIP archive through
/// the [`ArchiveModule`].
///
/// Selection and history reporting follow the same rules as
/// [`ZipDecompressor`](super::ZipDecompressor).
#[derive(Debug, Default, Clone, Copy)]
pub struct PluginDecompressor;

impl Decompressor for PluginDecompressor {
    fn name(&self) -> &'static str {
        "plugin"
    }

    fn accepts(&self, format: Format) -> bool {
        matches!(format, Format::PluginArchive(_))
    }

    fn decompress(
        &self,
        cx: &Context,
        format: Format,
        file: &mut VirtualFile,
        depth: usize,
    ) -> Result<VirtualFile> {
        let Format::PluginArchive(kind) = format else {
            return Err(Error::UnsupportedFeature {
                feature: "non-plugin format",
            });
        };
        let wanted = file.member_name().map(str::to_string);

        let selected = with_plugin_archive(cx, kind, file, |archive| {
            let mut selector = MemberSelector::new(wanted.as_deref());
            let mut history = HistoryTracker::new(cx, archive.container());
            let mut offsets = SolidOffsets::new(kind);
            let mut selected = None;
            let mut position = 0;

            for index in 0..archive.len() {
                let info = match archive.info(index) {
                    Ok(info) => info,
                    Err(e) => {
                        log::debug!("{}: no info for entry {}: {}", archive.container(), index, e);
                        continue;
                    }
                };
                if info.is_dir {
                    continue;
                }
                let skip = offsets.next(&info);
                if info.uncompressed_size == 0 {
                    continue;
                }
                position += 1;
                if !is_eligible(cx.options(), &info.path) {
                    continue;
                }
                history.observe(&info.path);

                if !selector.matches(position, &info.path) {
                    continue;
                }
                match archive.extract(index, &info, skip) {
                    Ok(member) => {
                        selector.mark_selected();
                        selected = Some((info.path, member));
                    }
                    Err(e) => {
                        log::debug!("{}: cannot extract '{}': {}", archive.container(), info.path, e)
                    }
                }
            }
            Ok(selected)
        })?;

        let (name, member) = selected.ok_or_else(|| {
            Error::not_found(join_member(
                &container_label(file),
                wanted.as_deref().unwrap_or(""),
            ))
        })?;
        let mut produced = match cx.redispatch(member, depth + 1) {
            Outcome::Unchanged(file) | Outcome::Replaced(file) => file,
        };
        if produced.member_name().is_none() {
            produced.set_member_name(Some(name));
        }
        Ok(produced)
    }
}

/// Tracks where each member starts inside its solid block.
///
/// A solid 7z block decodes as one stream, so the module writes every
/// member of the block from the block start. Members with a zero packed
/// size continue the current block; the returned offset becomes the target
/// handle's write skip.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SolidOffsets {
    solid: bool,
    offset: u64,
}

impl SolidOffsets {
    pub(crate) fn new(kind: PluginKind) -> Self {
        Self {
            solid: kind.is_solid(),
            offset: 0,
        }
    }

    /// Returns the write skip for `info` and advances past it.
    pub(crate) fn next(&mut self, info: &MemberInfo) -> u64 {
        if !self.solid {
            return 0;
        }
        if info.compressed_size != 0 {
            self.offset = 0;
        }
        let skip = self.offset;
        self.offset += info.uncompressed_size;
        skip
    }
}

/// An archive opened by the module for the duration of a closure.
pub(crate) struct PluginArchive<'a> {
    cx: &'a Context,
    module: &'a dyn ArchiveModule,
    handle: ArchiveHandle,
    container: String,
}

impl PluginArchive<'_> {
    pub(crate) fn container(&self) -> &str {
        &self.container
    }

    pub(crate) fn len(&self) -> usize {
        self.module.file_count(self.handle)
    }

    pub(crate) fn info(&self, index: usize) -> Result<MemberInfo> {
        self.module.file_info(self.handle, index)
    }

    /// Extracts entry `index` into a new memory handle.
    ///
    /// The extraction counts only if the module filled the handle
    /// completely; a module status error alone is not fatal.
    pub(crate) fn extract(&self, index: usize, info: &MemberInfo, skip: u64) -> Result<VirtualFile> {
        let declared = info.uncompressed_size;
        if declared > self.cx.options().max_member_size {
            return Err(Error::ResourceLimitExceeded(format!(
                "member '{}' declares {} bytes",
                info.path, declared
            )));
        }
        let size = usize::try_from(declared)
            .map_err(|_| Error::ResourceLimitExceeded(format!("member size {}", declared)))?;

        let mut target = VirtualFile::memory(join_member(&self.container, &info.path), size);
        target.set_write_skip(skip);

        let sessions = self.cx.sessions();
        let _exclusive = sessions.enter();
        let stream = sessions.try_push(target).map_err(|_| Error::SessionStackExhausted {
            capacity: sessions.capacity(),
        })?;
        let mut io = sessions.io();
        let status = self.module.extract(&mut io, self.handle, index, stream);
        let mut target = sessions.take(stream)?;

        if let Err(e) = status {
            log::debug!("{}: module reported '{}' for '{}'", self.container, e, info.path);
        }
        if target.tell() != declared {
            log::warn!(
                "unpack failed, got only {} bytes of '{}'",
                target.tell(),
                info.path
            );
            return Err(Error::corrupt(format!(
                "member '{}' extracted {} of {} bytes",
                info.path,
                target.tell(),
                declared
            )));
        }
        target.seek_to(0, Whence::Start)?;
        Ok(target)
    }
}

/// Opens `file` with the archive module, runs `f`, and closes it again.
///
/// `file` lives in the session arena while `f` runs and is put back
/// afterwards, also on error. The calling thread owns the arena for the
/// whole call; `f` may open further archives on the same thread.
pub(crate) fn with_plugin_archive<T>(
    cx: &Context,
    kind: PluginKind,
    file: &mut VirtualFile,
    f: impl FnOnce(&PluginArchive<'_>) -> Result<T>,
) -> Result<T> {
    let module = cx.archive_module().ok_or(Error::UnsupportedFeature {
        feature: "plugin archive module",
    })?;
    let container = container_label(file);
    let size = file.len();
    let placeholder = VirtualFile::memory(file.name(), 0);

    let sessions = cx.sessions();
    let _exclusive = sessions.enter();
    let stream: StreamId = match sessions.try_push(mem::replace(file, placeholder)) {
        Ok(stream) => stream,
        Err(owned) => {
            *file = owned;
            return Err(Error::SessionStackExhausted {
                capacity: sessions.capacity(),
            });
        }
    };

    let mut io = sessions.io();
    let result = module
        .open_archive(&mut io, stream, size, kind)
        .and_then(|handle| {
            let archive = PluginArchive {
                cx,
                module: &**module,
                handle,
                container,
            };
            let result = f(&archive);
            module.close_archive(handle);
            result
        });

    *file = sessions.take(stream)?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(compressed: u64, uncompressed: u64) -> MemberInfo {
        MemberInfo {
            path: String::new(),
            compressed_size: compressed,
            uncompressed_size: uncompressed,
            is_dir: false,
        }
    }

    #[test]
    fn test_solid_offsets() {
        let mut offsets = SolidOffsets::new(PluginKind::SevenZip);
        assert_eq!(offsets.next(&info(40, 100)), 0);
        assert_eq!(offsets.next(&info(0, 30)), 100);
        assert_eq!(offsets.next(&info(0, 5)), 130);
        assert_eq!(offsets.next(&info(12, 50)), 0);
        assert_eq!(offsets.next(&info(0, 1)), 50);
    }

    #[test]
    fn test_non_solid_offsets() {
        let mut offsets = SolidOffsets::new(PluginKind::Rar);
        assert_eq!(offsets.next(&info(40, 100)), 0);
        assert_eq!(offsets.next(&info(0, 30)), 0);
    }
}
