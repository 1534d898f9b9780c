//! Archive member iteration.

#![cfg(feature = "deflate")]

use arcvfs::FileLayer;
use arcvfs::checksum::file_crc32;
use tempfile::TempDir;

mod common;
use common::{
    FakeEntry, FakeModule, fake_archive, gzip_bytes, payload, set_zip_method, write_fixture,
    zip_bytes,
};

/// Collects `(member, length)` pairs for every visited member.
fn collect(layer: &FileLayer, path: &str) -> (bool, Vec<(String, u64)>) {
    let mut seen = Vec::new();
    let complete = layer
        .for_each_member(path, |member| {
            seen.push((
                member.member_name().unwrap_or_default().to_string(),
                member.len(),
            ));
            true
        })
        .unwrap();
    (complete, seen)
}

#[test]
fn test_zip_members_in_order() {
    let dir = TempDir::new().unwrap();
    let zip = zip_bytes(&[
        ("disks/", b""),
        ("disks/disk1.adf", &payload(50, 1)),
        ("readme.txt", b"0123456789"),
        ("empty.cfg", b""),
        ("disks/disk2.adz", &gzip_bytes(None, &payload(80, 2))),
    ]);
    let path = write_fixture(&dir, "set.zip", &zip);
    let layer = FileLayer::new();

    let (complete, seen) = collect(&layer, &path);
    assert!(complete);
    assert_eq!(
        seen,
        vec![
            ("disks/disk1.adf".to_string(), 50),
            ("empty.cfg".to_string(), 0),
            ("disks/disk2.adz".to_string(), 80),
        ]
    );
    assert_eq!(layer.live_handles(), 0);
}

#[test]
fn test_visitor_can_stop_early() {
    let dir = TempDir::new().unwrap();
    let zip = zip_bytes(&[
        ("a.adf", &payload(10, 1)),
        ("b.adf", &payload(10, 2)),
        ("c.adf", &payload(10, 3)),
    ]);
    let path = write_fixture(&dir, "set.zip", &zip);
    let layer = FileLayer::new();

    let mut visited = 0;
    let complete = layer
        .for_each_member(&path, |_| {
            visited += 1;
            visited < 2
        })
        .unwrap();
    assert!(!complete);
    assert_eq!(visited, 2);
}

#[test]
fn test_members_are_readable_in_visitor() {
    let dir = TempDir::new().unwrap();
    let disk = payload(300, 4);
    let zip = zip_bytes(&[("disk.adf", &disk)]);
    let path = write_fixture(&dir, "one.zip", &zip);
    let layer = FileLayer::new();

    let expected = crc32fast::hash(&disk);
    let mut crcs = Vec::new();
    layer
        .for_each_member(&path, |member| {
            crcs.push(file_crc32(member).unwrap());
            true
        })
        .unwrap();
    assert_eq!(crcs, vec![expected]);
}

#[test]
fn test_plugin_members() {
    let dir = TempDir::new().unwrap();
    let archive = fake_archive(&[
        FakeEntry::dir("disks"),
        FakeEntry::file("disks/a.adf", &payload(100, 1)),
        FakeEntry::file("disks/b.adf", &payload(30, 2)).solid(),
        FakeEntry::file("notes.txt", b"ignored"),
    ]);
    let path = write_fixture(&dir, "set.7z", &archive);
    let layer = FileLayer::builder().archive_module(FakeModule::new()).build();

    let mut contents = Vec::new();
    layer
        .for_each_member(&path, |member| {
            contents.push(member.read_all().unwrap());
            true
        })
        .unwrap();
    assert_eq!(contents, vec![payload(100, 1), payload(30, 2)]);
}

#[test]
fn test_plain_file_is_visited_once_undecoded() {
    let dir = TempDir::new().unwrap();
    let gz = gzip_bytes(None, &payload(120, 8));
    let path = write_fixture(&dir, "disk.adz", &gz);
    let layer = FileLayer::new();

    let mut contents = Vec::new();
    let complete = layer
        .for_each_member(&path, |member| {
            assert!(!member.is_compressed());
            contents.push(member.read_all().unwrap());
            true
        })
        .unwrap();
    assert!(complete);
    assert_eq!(contents, vec![gz]);
}

#[test]
fn test_undecodable_zip_entry_is_skipped() {
    let dir = TempDir::new().unwrap();
    let mut zip = zip_bytes(&[
        ("disk1.adf", &payload(50, 1)),
        ("weird.bin", &payload(40, 3)),
        ("disk2.adf", &payload(60, 2)),
    ]);
    set_zip_method(&mut zip, "weird.bin", 12);
    let path = write_fixture(&dir, "game.zip", &zip);
    let layer = FileLayer::new();

    let (complete, seen) = collect(&layer, &path);
    assert!(complete);
    assert_eq!(
        seen,
        vec![("disk1.adf".to_string(), 50), ("disk2.adf".to_string(), 60)]
    );
}

#[test]
fn test_unreadable_archive_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "broken.zip", b"PK\x03\x04 definitely not a zip");
    let layer = FileLayer::new();

    let (complete, seen) = collect(&layer, &path);
    assert!(complete);
    assert!(seen.is_empty());
}

#[test]
fn test_missing_path_fails() {
    let layer = FileLayer::new();
    let err = layer
        .for_each_member("/definitely/not/here.zip", |_| true)
        .unwrap_err();
    assert!(err.is_not_found());
}
