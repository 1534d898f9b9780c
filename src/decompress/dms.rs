//! DMS disk archives.

use super::{Context, Decompressor};
use crate::format::Format;
use crate::handle::{VirtualFile, Whence};
use crate::{Error, Result};

/// Unpacks DMS archives into a floppy image through the [`DmsUnpacker`].
///
/// The output always has the configured image size, whatever the input
/// size.
///
/// [`DmsUnpacker`]: crate::dms::DmsUnpacker
#[derive(Debug, Default, Clone, Copy)]
pub struct DmsDecompressor;

impl Decompressor for DmsDecompressor {
    fn name(&self) -> &'static str {
        "dms"
    }

    fn accepts(&self, format: Format) -> bool {
        format == Format::Dms
    }

    fn decompress(
        &self,
        cx: &Context,
        _: Format,
        file: &mut VirtualFile,
        _: usize,
    ) -> Result<VirtualFile> {
        let unpacker = cx.dms().ok_or(Error::UnsupportedFeature {
            feature: "DMS unpacker",
        })?;

        file.seek_to(0, Whence::Start)?;
        let mut image = VirtualFile::memory(image_name(file.name()), cx.options().dms_image_size);
        let status = unpacker.unpack(file, &mut image);
        if !status.is_success() {
            let code = match status {
                crate::dms::DmsStatus::Failed(code) => code,
                _ => 0,
            };
            return Err(Error::ModuleFailure {
                operation: "DMS unpack",
                status: code,
            });
        }
        image.set_member_name(file.member_name().map(str::to_string));
        Ok(image)
    }
}

/// `disk.dms` becomes `disk.adf`.
fn image_name(name: &str) -> String {
    let stem = match name.len().checked_sub(4) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".dms") => {
            &name[..cut]
        }
        _ => name,
    };
    format!("{}.adf", stem)
}
