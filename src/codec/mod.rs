//! DEFLATE codec capability.
//!
//! The layer does not hard-wire a compression library. Instead it receives
//! an optional [`CodecProvider`] at construction: when present, gzip
//! streams and ZIP archives are decoded; when absent, the layer degrades to
//! plain-file behavior and notifies the host once.
//!
//! A provider exposes the stream primitives the layer needs: an
//! [`Inflater`] (init on creation, step with [`Inflater::inflate`], end on
//! drop), a [`Deflater`] and a CRC-32 primitive. The built-in provider
//! ([`FlateCodec`]) wraps `flate2` and is compiled with the `deflate`
//! feature.

#[cfg(feature = "deflate")]
pub mod deflate;

#[cfg(feature = "deflate")]
pub use deflate::FlateCodec;

use std::io::Read;
use std::sync::Arc;

use crate::{Error, Result};

/// Framing of a DEFLATE stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// Bare DEFLATE data, as found inside gzip members.
    Raw,
    /// DEFLATE with a zlib header and Adler-32 trailer.
    Zlib,
}

/// Outcome of a single codec step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Progress was made and the stream continues.
    Ok,
    /// The end of the stream was reached.
    StreamEnd,
    /// No progress was possible with the buffers given.
    BufError,
}

/// Bytes consumed and produced by a single codec step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Input bytes consumed.
    pub consumed: usize,
    /// Output bytes produced.
    pub produced: usize,
    /// Codec status after the step.
    pub status: StepStatus,
}

impl Step {
    fn is_stalled(&self) -> bool {
        self.consumed == 0 && self.produced == 0 && self.status != StepStatus::StreamEnd
    }
}

/// A streaming decompressor.
pub trait Inflater: Send {
    /// Decompresses as much of `input` into `output` as possible.
    fn inflate(&mut self, input: &[u8], output: &mut [u8]) -> Result<Step>;
}

/// A streaming compressor.
pub trait Deflater: Send {
    /// Compresses `input` into `output`. With `finish` set, the stream is
    /// terminated once all input is consumed.
    fn deflate(&mut self, input: &[u8], output: &mut [u8], finish: bool) -> Result<Step>;
}

/// A provider of DEFLATE stream primitives and a CRC-32 checksum.
pub trait CodecProvider: Send + Sync + std::fmt::Debug {
    /// Name reported in diagnostics.
    fn name(&self) -> &str;

    /// Starts a new decompression stream.
    fn inflater(&self, format: StreamFormat) -> Box<dyn Inflater>;

    /// Starts a new compression stream at `level` (0-9).
    fn deflater(&self, format: StreamFormat, level: u32) -> Box<dyn Deflater>;

    /// Continues a CRC-32 from `seed` over `data`.
    fn crc32(&self, seed: u32, data: &[u8]) -> u32;
}

/// Returns the codec compiled into this build, if any.
///
/// This is resolved once, when a [`FileLayer`](crate::FileLayer) is built.
pub fn builtin() -> Option<Arc<dyn CodecProvider>> {
    #[cfg(feature = "deflate")]
    {
        Some(Arc::new(FlateCodec::new()))
    }
    #[cfg(not(feature = "deflate"))]
    {
        None
    }
}

/// Result of [`inflate_from_reader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflateOutcome {
    /// Bytes written to the output buffer.
    pub produced: usize,
    /// Whether the codec reported the end of the stream.
    pub finished: bool,
}

/// Streams compressed bytes from `input` through `inflater` into `output`,
/// reading at most `input_limit` bytes in chunks of `chunk_size`.
///
/// Stops at the end of the stream, or when the output buffer is full and no
/// further progress is possible. Running out of input before the end of the
/// stream is reported as [`Error::CorruptData`].
pub fn inflate_from_reader(
    inflater: &mut dyn Inflater,
    input: &mut dyn Read,
    input_limit: u64,
    output: &mut [u8],
    chunk_size: usize,
) -> Result<InflateOutcome> {
    let mut chunk = vec![0u8; chunk_size.max(1)];
    let (mut start, mut end) = (0usize, 0usize);
    let mut remaining = input_limit;
    let mut eof = false;
    let mut produced = 0usize;

    loop {
        if start == end && !eof {
            let want = chunk.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
            let n = if want == 0 { 0 } else { input.read(&mut chunk[..want])? };
            remaining -= n as u64;
            start = 0;
            end = n;
            eof = n == 0;
        }

        let step = inflater.inflate(&chunk[start..end], &mut output[produced..])?;
        start += step.consumed;
        produced += step.produced;

        if step.status == StepStatus::StreamEnd {
            return Ok(InflateOutcome {
                produced,
                finished: true,
            });
        }
        if step.is_stalled() {
            if produced == output.len() {
                return Ok(InflateOutcome {
                    produced,
                    finished: false,
                });
            }
            if start == end && !eof {
                continue;
            }
            return Err(Error::corrupt(format!(
                "deflate stream ended early after {} bytes",
                produced
            )));
        }
    }
}

/// Compresses `input` with `deflater` and hands every finished block to
/// `sink`. Returns the total number of compressed bytes.
pub fn deflate_to_sink(
    deflater: &mut dyn Deflater,
    input: &[u8],
    chunk_size: usize,
    mut sink: impl FnMut(&[u8]) -> Result<()>,
) -> Result<u64> {
    let mut out = vec![0u8; chunk_size.max(64)];
    let mut offset = 0usize;
    let mut total = 0u64;

    loop {
        let step = deflater.deflate(&input[offset..], &mut out, true)?;
        offset += step.consumed;
        if step.produced > 0 {
            sink(&out[..step.produced])?;
            total += step.produced as u64;
        }
        match step.status {
            StepStatus::StreamEnd => return Ok(total),
            _ if step.is_stalled() => {
                return Err(Error::corrupt("deflate made no progress"));
            }
            _ => {}
        }
    }
}
