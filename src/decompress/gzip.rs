//! Gzip member decoding.

use super::{Context, Decompressor};
use crate::codec::{StreamFormat, inflate_from_reader};
use crate::format::{Format, GZIP_SIGNATURE};
use crate::handle::{VirtualFile, Whence};
use crate::{Error, Result};

const HEADER_LEN: usize = 10;
const TRAILER_LEN: u64 = 8;
const METHOD_DEFLATE: u8 = 8;

const FLAG_MULTIPART: u8 = 0x02;
const FLAG_EXTRA: u8 = 0x04;
const FLAG_NAME: u8 = 0x08;
const FLAG_COMMENT: u8 = 0x10;
const FLAG_ENCRYPTED: u8 = 0x20;

/// Longest embedded name or comment accepted.
const MAX_HEADER_STRING: usize = 4096;

/// Decodes single-member gzip files (`.gz`, `.adz`, `.roz`).
///
/// The declared size in the trailer bounds the allocation and must lie in
/// `[min_gzip_size, max_gzip_size]`. The inflated content must end exactly
/// at that size and match the trailer CRC-32.
#[derive(Debug, Default, Clone, Copy)]
pub struct GzipDecompressor;

impl Decompressor for GzipDecompressor {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn accepts(&self, format: Format) -> bool {
        format == Format::Gzip
    }

    fn decompress(
        &self,
        cx: &Context,
        _: Format,
        file: &mut VirtualFile,
        _: usize,
    ) -> Result<VirtualFile> {
        let codec = cx.require_codec()?;
        let options = cx.options();

        file.seek_to(0, Whence::Start)?;
        let mut header = [0u8; HEADER_LEN];
        if file.read_bytes(&mut header)? < HEADER_LEN || !header.starts_with(GZIP_SIGNATURE) {
            return Err(Error::corrupt("missing gzip header"));
        }
        if header[2] != METHOD_DEFLATE {
            return Err(Error::UnsupportedFeature {
                feature: "gzip compression method",
            });
        }

        let flags = header[3];
        if flags & FLAG_MULTIPART != 0 {
            return Err(Error::UnsupportedFeature {
                feature: "multipart gzip",
            });
        }
        if flags & FLAG_ENCRYPTED != 0 {
            return Err(Error::UnsupportedFeature {
                feature: "encrypted gzip",
            });
        }
        if flags & FLAG_EXTRA != 0 {
            let mut len = [0u8; 2];
            if file.read_bytes(&mut len)? < len.len() {
                return Err(Error::corrupt("truncated gzip extra field"));
            }
            file.seek_to(i64::from(u16::from_le_bytes(len)), Whence::Current)?;
        }

        let mut name = file.name().to_string();
        if flags & FLAG_NAME != 0 {
            let embedded = read_header_string(file)?;
            if !embedded.is_empty() {
                name = embedded;
            }
        }
        if flags & FLAG_COMMENT != 0 {
            read_header_string(file)?;
        }

        let body_start = file.tell();
        let body_len = file
            .len()
            .checked_sub(body_start + TRAILER_LEN)
            .ok_or_else(|| Error::corrupt("gzip file too short for its trailer"))?;

        file.seek_to(-(TRAILER_LEN as i64), Whence::End)?;
        let mut trailer = [0u8; TRAILER_LEN as usize];
        if file.read_bytes(&mut trailer)? < trailer.len() {
            return Err(Error::corrupt("truncated gzip trailer"));
        }
        let expected_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let size = u64::from(u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]));
        if size < options.min_gzip_size || size > options.max_gzip_size {
            log::warn!(
                "{}: gzip declares {} bytes, outside [{}, {}]",
                file.name(),
                size,
                options.min_gzip_size,
                options.max_gzip_size
            );
            return Err(Error::ResourceLimitExceeded(format!(
                "gzip declared size {}",
                size
            )));
        }
        let size = usize::try_from(size)
            .map_err(|_| Error::ResourceLimitExceeded(format!("gzip declared size {}", size)))?;

        file.seek_to(body_start as i64, Whence::Start)?;
        // One spare byte so that content longer than declared is detected.
        let mut out = vec![0u8; size + 1];
        let mut inflater = codec.inflater(StreamFormat::Raw);
        let outcome = inflate_from_reader(
            inflater.as_mut(),
            file,
            body_len,
            &mut out,
            options.inflate_chunk_size,
        )?;
        if !outcome.finished || outcome.produced != size {
            return Err(Error::corrupt(format!(
                "gzip inflated {} bytes, trailer declares {}",
                outcome.produced, size
            )));
        }
        out.truncate(size);

        let actual_crc = codec.crc32(0, &out);
        if actual_crc != expected_crc {
            return Err(Error::corrupt(format!(
                "gzip CRC mismatch: expected {:08x}, got {:08x}",
                expected_crc, actual_crc
            )));
        }

        let mut produced = VirtualFile::from_bytes(name, out);
        produced.set_member_name(file.member_name().map(str::to_string));
        Ok(produced)
    }
}

fn read_header_string(file: &mut VirtualFile) -> Result<String> {
    let mut bytes = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        if file.read_bytes(&mut byte)? == 0 {
            return Err(Error::corrupt("unterminated gzip header string"));
        }
        if byte[0] == 0 {
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }
        if bytes.len() == MAX_HEADER_STRING {
            return Err(Error::corrupt("gzip header string too long"));
        }
        bytes.push(byte[0]);
    }
}
