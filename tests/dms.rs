//! DMS disk images through an external unpacker.

use arcvfs::{FileLayer, LayerOptions, OpenMode};
use tempfile::TempDir;

mod common;
use common::{FakeDms, payload, write_fixture};

fn dms_bytes(body: &[u8]) -> Vec<u8> {
    let mut out = b"DMS!".to_vec();
    out.extend_from_slice(body);
    out
}

#[test]
fn test_unpacks_into_floppy_image() {
    let dir = TempDir::new().unwrap();
    let body = payload(2048, 3);
    let path = write_fixture(&dir, "demo.dms", &dms_bytes(&body));
    let layer = FileLayer::builder().dms_unpacker(FakeDms).build();

    let id = layer.open(&path, OpenMode::Read).unwrap();
    assert!(layer.is_compressed(id).unwrap());
    assert_eq!(
        layer.len(id).unwrap(),
        arcvfs::options::FLOPPY_IMAGE_SIZE as u64
    );
    assert!(layer.name(id).unwrap().ends_with("demo.adf"));

    let mut head = vec![0u8; body.len()];
    assert_eq!(layer.read(id, &mut head).unwrap(), body.len());
    assert_eq!(head, body);
}

#[test]
fn test_image_size_is_configurable() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "demo.dms", &dms_bytes(&payload(64, 1)));
    let layer = FileLayer::builder()
        .options(LayerOptions::new().dms_image_size(1024))
        .dms_unpacker(FakeDms)
        .build();

    let id = layer.open(&path, OpenMode::Read).unwrap();
    assert_eq!(layer.len(id).unwrap(), 1024);
}

#[test]
fn test_failed_unpack_is_unchanged() {
    let dir = TempDir::new().unwrap();
    let raw = b"not a dms image".to_vec();
    let path = write_fixture(&dir, "broken.dms", &raw);
    let layer = FileLayer::builder().dms_unpacker(FakeDms).build();

    let id = layer.open(&path, OpenMode::Read).unwrap();
    assert!(!layer.is_compressed(id).unwrap());
    assert_eq!(layer.len(id).unwrap(), raw.len() as u64);
}

#[test]
fn test_without_unpacker_is_unchanged() {
    let dir = TempDir::new().unwrap();
    let bytes = dms_bytes(&payload(64, 1));
    let path = write_fixture(&dir, "demo.dms", &bytes);
    let layer = FileLayer::new();

    let id = layer.open(&path, OpenMode::Read).unwrap();
    assert!(!layer.is_compressed(id).unwrap());
    assert_eq!(layer.len(id).unwrap(), bytes.len() as u64);
}
