//! Fuzz target for format dispatch with arbitrary byte input.
//!
//! The bytes are registered as a memory handle under each of the names
//! below, so that both extension and signature classification are reached,
//! and decompressed once. The layer must never panic and must always hand
//! back a usable handle.
//!
//! Run with: cargo +nightly fuzz run decompress_bytes

#![no_main]

use arcvfs::{FileLayer, LayerOptions, VirtualFile, Whence};
use libfuzzer_sys::fuzz_target;

const NAMES: &[&str] = &["fuzz.bin", "fuzz.adz", "fuzz.zip", "fuzz.dms", "fuzz.lha"];

fuzz_target!(|data: &[u8]| {
    let layer = FileLayer::builder()
        .options(LayerOptions::new().max_gzip_size(1 << 20).max_member_size(1 << 20))
        .build();

    for name in NAMES {
        let id = layer.adopt(VirtualFile::from_bytes(*name, data.to_vec()));
        let Ok(id) = layer.decompress(id) else {
            panic!("decompress lost the handle for {}", name);
        };
        assert_eq!(layer.tell(id).unwrap(), 0);
        let len = layer.len(id).unwrap();
        layer.seek(id, i64::MAX, Whence::Start).unwrap();
        assert_eq!(layer.tell(id).unwrap(), len);
        let _ = layer.checksum(id);
        layer.close(id).unwrap();
    }
});
