//! CRC-32 over virtual files.
//!
//! [`file_crc32`] checksums the whole content of a handle without moving
//! its cursor: memory handles are hashed in place, file handles are read
//! from the start in [`READ_BUFFER_SIZE`] chunks and the cursor is put back
//! afterwards.
//!
//! ```rust
//! use arcvfs::VirtualFile;
//! use arcvfs::checksum::{Crc32, file_crc32};
//!
//! let mut file = VirtualFile::from_bytes("hello.txt", b"Hello, World!".to_vec());
//! assert_eq!(file_crc32(&mut file).unwrap(), 0xEC4AC3D0);
//! assert_eq!(Crc32::compute(b"Hello, World!"), 0xEC4AC3D0);
//! ```

use std::io;

use crate::READ_BUFFER_SIZE;
use crate::handle::{VirtualFile, Whence};

/// Incremental CRC-32 (IEEE 802.3 polynomial).
#[derive(Clone, Default)]
pub struct Crc32 {
    hasher: crc32fast::Hasher,
}

impl Crc32 {
    /// Starts a new checksum.
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues a checksum from a previous value.
    pub fn with_initial(initial: u32) -> Self {
        Self {
            hasher: crc32fast::Hasher::new_with_initial(initial),
        }
    }

    /// Feeds more data.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Returns the checksum of everything fed so far.
    pub fn finalize(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// One-shot checksum of `data`.
    pub fn compute(data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }
}

impl std::fmt::Debug for Crc32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crc32")
            .field("current", &format_args!("{:08x}", self.finalize()))
            .finish()
    }
}

/// Checksums the whole content of `file`, leaving its cursor where it was.
pub fn file_crc32(file: &mut VirtualFile) -> io::Result<u32> {
    if let Some(data) = file.memory_data() {
        return Ok(Crc32::compute(data));
    }

    let start = file.tell();
    file.seek_to(0, Whence::Start)?;
    let result = hash_to_end(file);
    file.seek_to(start as i64, Whence::Start)?;
    result
}

fn hash_to_end(file: &mut VirtualFile) -> io::Result<u32> {
    let mut crc = Crc32::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = file.read_bytes(&mut buffer)?;
        if n == 0 {
            return Ok(crc.finalize());
        }
        crc.update(&buffer[..n]);
    }
}
