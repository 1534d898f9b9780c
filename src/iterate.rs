//! Archive member iteration.
//!
//! [`for_each_member`] hands every file member of an archive to a visitor,
//! one transient memory handle at a time. A path that is not an archive is
//! visited once, as the container handle itself.

use zip::ZipArchive;

use crate::decompress::{
    Context, SolidOffsets, container_label, read_zip_entry, with_plugin_archive, zip_entry_meta,
    zip_error,
};
use crate::format::{Format, PluginKind, classify};
use crate::handle::{OpenMode, VirtualFile};
use crate::layer::open_unregistered;
use crate::path::join_member;
use crate::Result;

/// Visitor callback. Returning `false` stops the enumeration.
pub type Visitor<'a> = dyn FnMut(&mut VirtualFile) -> bool + 'a;

/// Visits every non-directory, non-ignored member of the archive at `path`.
///
/// Returns `Ok(false)` if the visitor stopped early and `Ok(true)`
/// otherwise, including when the archive could not be enumerated (which is
/// logged). Only a path that does not resolve fails.
pub fn for_each_member(cx: &Context, path: &str, visitor: &mut Visitor<'_>) -> Result<bool> {
    let mut file = open_unregistered(path, OpenMode::Read)?;
    let format = classify(&mut file, &cx.capabilities())?;

    let result = match format {
        Format::Zip => visit_zip(cx, &mut file, visitor),
        Format::PluginArchive(kind) => visit_plugin(cx, kind, &mut file, visitor),
        _ => {
            let keep_going = visitor(&mut file);
            file.close();
            return Ok(keep_going);
        }
    };
    file.close();

    result.or_else(|e| {
        log::debug!("{}: cannot enumerate members: {}", path, e);
        Ok(true)
    })
}

fn visit_zip(cx: &Context, file: &mut VirtualFile, visitor: &mut Visitor<'_>) -> Result<bool> {
    cx.require_codec()?;
    let container = container_label(file);
    let max_member_size = cx.options().max_member_size;
    let mut archive = ZipArchive::new(&mut *file).map_err(zip_error)?;

    for index in 0..archive.len() {
        let Some((name, size, is_dir)) = zip_entry_meta(&mut archive, index, &container) else {
            continue;
        };
        if is_dir || cx.options().is_ignored(&name) {
            continue;
        }
        let data = match read_zip_entry(&mut archive, index, &name, size, max_member_size) {
            Ok(data) => data,
            Err(e) => {
                log::debug!("{}: skipping '{}': {}", container, name, e);
                continue;
            }
        };
        let member = VirtualFile::from_bytes(join_member(&container, &name), data);
        if !visit(cx, member, name, visitor) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn visit_plugin(
    cx: &Context,
    kind: PluginKind,
    file: &mut VirtualFile,
    visitor: &mut Visitor<'_>,
) -> Result<bool> {
    with_plugin_archive(cx, kind, file, |archive| {
        let mut offsets = SolidOffsets::new(kind);
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
            if cx.options().is_ignored(&info.path) {
                continue;
            }
            let member = match archive.extract(index, &info, skip) {
                Ok(member) => member,
                Err(e) => {
                    log::debug!("{}: skipping '{}': {}", archive.container(), info.path, e);
                    continue;
                }
            };
            if !visit(cx, member, info.path, visitor) {
                return Ok(false);
            }
        }
        Ok(true)
    })
}

/// Unwraps one member, shows it to the visitor and closes it.
fn visit(cx: &Context, member: VirtualFile, name: String, visitor: &mut Visitor<'_>) -> bool {
    let mut member = cx.redispatch(member, 1).into_file();
    if member.member_name().is_none() {
        member.set_member_name(Some(name));
    }
    let keep_going = visitor(&mut member);
    member.close();
    keep_going
}
