//! Built-in DEFLATE codec backed by `flate2`.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use super::{CodecProvider, Deflater, Inflater, Step, StepStatus, StreamFormat};
use crate::{Error, Result};

/// The `flate2` codec provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlateCodec;

impl FlateCodec {
    /// Creates the provider.
    pub fn new() -> Self {
        Self
    }
}

impl CodecProvider for FlateCodec {
    fn name(&self) -> &str {
        "flate2"
    }

    fn inflater(&self, format: StreamFormat) -> Box<dyn Inflater> {
        Box::new(FlateInflater {
            inner: Decompress::new(format == StreamFormat::Zlib),
        })
    }

    fn deflater(&self, format: StreamFormat, level: u32) -> Box<dyn Deflater> {
        Box::new(FlateDeflater {
            inner: Compress::new(Compression::new(level.min(9)), format == StreamFormat::Zlib),
        })
    }

    fn crc32(&self, seed: u32, data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new_with_initial(seed);
        hasher.update(data);
        hasher.finalize()
    }
}

fn map_status(status: Status) -> StepStatus {
    match status {
        Status::Ok => StepStatus::Ok,
        Status::StreamEnd => StepStatus::StreamEnd,
        Status::BufError => StepStatus::BufError,
    }
}

struct FlateInflater {
    inner: Decompress,
}

impl Inflater for FlateInflater {
    fn inflate(&mut self, input: &[u8], output: &mut [u8]) -> Result<Step> {
        let (in_before, out_before) = (self.inner.total_in(), self.inner.total_out());
        let status = self
            .inner
            .decompress(input, output, FlushDecompress::None)
            .map_err(|e| Error::corrupt(format!("inflate: {}", e)))?;
        Ok(Step {
            consumed: (self.inner.total_in() - in_before) as usize,
            produced: (self.inner.total_out() - out_before) as usize,
            status: map_status(status),
        })
    }
}

struct FlateDeflater {
    inner: Compress,
}

impl Deflater for FlateDeflater {
    fn deflate(&mut self, input: &[u8], output: &mut [u8], finish: bool) -> Result<Step> {
        let flush = if finish {
            FlushCompress::Finish
        } else {
            FlushCompress::None
        };
        let (in_before, out_before) = (self.inner.total_in(), self.inner.total_out());
        let status = self
            .inner
            .compress(input, output, flush)
            .map_err(|e| Error::corrupt(format!("deflate: {}", e)))?;
        Ok(Step {
            consumed: (self.inner.total_in() - in_before) as usize,
            produced: (self.inner.total_out() - out_before) as usize,
            status: map_status(status),
        })
    }
}
