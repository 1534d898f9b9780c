//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arcvfs::dms::{DmsStatus, DmsUnpacker};
use arcvfs::format::{PluginKind, SEVEN_ZIP_SIGNATURE};
use arcvfs::plugin::{ArchiveHandle, ArchiveModule, MemberInfo, StreamId, StreamIo};
use arcvfs::{Error, VirtualFile};
use tempfile::TempDir;

/// Builds a deflated ZIP archive. Names ending in `/` become directories.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use zip::write::SimpleFileOptions;

    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, options)
                .expect("Failed to add directory");
        } else {
            writer.start_file(*name, options).expect("Failed to start entry");
            writer.write_all(data).expect("Failed to write entry");
        }
    }
    writer.finish().expect("Failed to finish zip").into_inner()
}

/// Rewrites the compression method of entry `name` in both its local
/// header and its central directory record.
pub fn set_zip_method(bytes: &mut [u8], name: &str, method: u16) {
    // (signature, method offset, name length offset, name offset)
    const HEADERS: [(&[u8; 4], usize, usize, usize); 2] =
        [(b"PK\x03\x04", 8, 26, 30), (b"PK\x01\x02", 10, 28, 46)];

    let mut patched = 0;
    for (signature, method_at, name_len_at, name_at) in HEADERS {
        let mut pos = 0;
        while pos + name_at <= bytes.len() {
            if &bytes[pos..pos + 4] != signature {
                pos += 1;
                continue;
            }
            let len = u16::from_le_bytes([bytes[pos + name_len_at], bytes[pos + name_len_at + 1]]);
            let start = pos + name_at;
            if bytes.get(start..start + len as usize) == Some(name.as_bytes()) {
                bytes[pos + method_at..pos + method_at + 2].copy_from_slice(&method.to_le_bytes());
                patched += 1;
            }
            pos += 4;
        }
    }
    assert_eq!(patched, 2, "entry '{}' not found in zip", name);
}

/// Builds a gzip stream, optionally carrying an embedded file name.
pub fn gzip_bytes(name: Option<&str>, data: &[u8]) -> Vec<u8> {
    let mut builder = flate2::GzBuilder::new();
    if let Some(name) = name {
        builder = builder.filename(name);
    }
    let mut encoder = builder.write(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).expect("Failed to write gzip body");
    encoder.finish().expect("Failed to finish gzip")
}

/// Deterministic, mildly compressible payload.
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| seed.wrapping_add((i % 61) as u8).wrapping_mul(3))
        .collect()
}

/// Writes `bytes` to `name` inside `dir` and returns the path as a string.
pub fn write_fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> String {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create fixture dir");
    }
    std::fs::write(&path, bytes).expect("Failed to write fixture");
    path_string(&path)
}

pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Joins a container path and a member the way the layer splits them.
pub fn member_path(container: &str, member: &str) -> String {
    format!("{}{}{}", container, std::path::MAIN_SEPARATOR, member)
}

// =============================================================================
// Fake plugin archive format
// =============================================================================

const FLAG_DIR: u8 = 0x01;
const FLAG_CONTINUES_BLOCK: u8 = 0x02;

/// One entry of a fake plugin archive.
#[derive(Debug, Clone)]
pub struct FakeEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub is_dir: bool,
    /// Shares the solid block of the previous entry.
    pub continues_block: bool,
}

impl FakeEntry {
    pub fn file(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            data: data.to_vec(),
            is_dir: false,
            continues_block: false,
        }
    }

    pub fn dir(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data: Vec::new(),
            is_dir: true,
            continues_block: false,
        }
    }

    pub fn solid(mut self) -> Self {
        self.continues_block = true;
        self
    }
}

/// Serializes entries into the fake archive layout understood by [`FakeModule`].
///
/// Layout: 7z signature, 2 pad bytes, `u32` count, then per entry a `u16`
/// name length, the name, a flag byte, a `u32` data length and the data.
pub fn fake_archive(entries: &[FakeEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(SEVEN_ZIP_SIGNATURE);
    out.extend_from_slice(&[0x27, 0x1C]);
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    for entry in entries {
        out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        out.extend_from_slice(entry.name.as_bytes());
        let mut flags = 0;
        if entry.is_dir {
            flags |= FLAG_DIR;
        }
        if entry.continues_block {
            flags |= FLAG_CONTINUES_BLOCK;
        }
        out.push(flags);
        out.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&entry.data);
    }
    out
}

fn take<'a>(bytes: &'a [u8], pos: &mut usize, n: usize) -> arcvfs::Result<&'a [u8]> {
    let slice = bytes
        .get(*pos..*pos + n)
        .ok_or_else(|| Error::CorruptData("fake archive truncated".into()))?;
    *pos += n;
    Ok(slice)
}

fn take_u32(bytes: &[u8], pos: &mut usize) -> arcvfs::Result<usize> {
    let raw = take(bytes, pos, 4)?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize)
}

fn parse_fake_archive(bytes: &[u8]) -> arcvfs::Result<Vec<FakeEntry>> {
    if !bytes.starts_with(SEVEN_ZIP_SIGNATURE) {
        return Err(Error::CorruptData("not a fake archive".into()));
    }
    let mut pos = 6;
    let count = take_u32(bytes, &mut pos)?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let raw = take(bytes, &mut pos, 2)?;
        let name_len = u16::from_le_bytes([raw[0], raw[1]]) as usize;
        let name = String::from_utf8_lossy(take(bytes, &mut pos, name_len)?).into_owned();
        let flags = take(bytes, &mut pos, 1)?[0];
        let data_len = take_u32(bytes, &mut pos)?;
        let data = take(bytes, &mut pos, data_len)?.to_vec();
        entries.push(FakeEntry {
            name,
            data,
            is_dir: flags & FLAG_DIR != 0,
            continues_block: flags & FLAG_CONTINUES_BLOCK != 0,
        });
    }
    Ok(entries)
}

/// Counters shared between a [`FakeModule`] and the test observing it.
#[derive(Debug, Default)]
pub struct ModuleStats {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub extracted: AtomicUsize,
    pub kinds: Mutex<Vec<PluginKind>>,
}

impl ModuleStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn extracted(&self) -> usize {
        self.extracted.load(Ordering::SeqCst)
    }
}

/// In-process archive module reading the [`fake_archive`] layout.
///
/// Entries of one solid block are written from the block start, so the
/// layer has to skip the bytes of the preceding members. The archive is
/// only ever read through [`StreamIo::read_at`].
#[derive(Debug, Default)]
pub struct FakeModule {
    archives: Mutex<HashMap<u32, Vec<FakeEntry>>>,
    next: AtomicU32,
    stats: Arc<ModuleStats>,
    chunk: usize,
    report_error: bool,
}

impl FakeModule {
    pub fn new() -> Self {
        Self {
            chunk: 7,
            ..Self::default()
        }
    }

    /// Reports an error status after every extraction, even a complete one.
    pub fn reporting_errors(mut self) -> Self {
        self.report_error = true;
        self
    }

    pub fn stats(&self) -> Arc<ModuleStats> {
        Arc::clone(&self.stats)
    }

    fn entries(&self, archive: ArchiveHandle) -> Vec<FakeEntry> {
        self.archives
            .lock()
            .unwrap()
            .get(&archive.0)
            .cloned()
            .unwrap_or_default()
    }

    fn compressed_size(entries: &[FakeEntry], index: usize) -> u64 {
        if entries[index].continues_block {
            return 0;
        }
        entries[index..]
            .iter()
            .enumerate()
            .take_while(|(i, e)| *i == 0 || e.continues_block)
            .map(|(_, e)| e.data.len() as u64)
            .sum::<u64>()
            .max(1)
    }
}

impl ArchiveModule for FakeModule {
    fn open_archive(
        &self,
        io: &mut dyn StreamIo,
        stream: StreamId,
        size: u64,
        kind: PluginKind,
    ) -> arcvfs::Result<ArchiveHandle> {
        let mut bytes = vec![0u8; size as usize];
        let mut filled = 0;
        while filled < bytes.len() {
            let n = io.read_at(stream, filled as u64, &mut bytes[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        bytes.truncate(filled);

        let entries = parse_fake_archive(&bytes)?;
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        self.archives.lock().unwrap().insert(id, entries);
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        self.stats.kinds.lock().unwrap().push(kind);
        Ok(ArchiveHandle(id))
    }

    fn file_count(&self, archive: ArchiveHandle) -> usize {
        self.entries(archive).len()
    }

    fn file_info(&self, archive: ArchiveHandle, index: usize) -> arcvfs::Result<MemberInfo> {
        let entries = self.entries(archive);
        let entry = entries
            .get(index)
            .ok_or_else(|| Error::CorruptData(format!("no entry {}", index)))?;
        Ok(MemberInfo {
            path: entry.name.clone(),
            compressed_size: Self::compressed_size(&entries, index),
            uncompressed_size: entry.data.len() as u64,
            is_dir: entry.is_dir,
        })
    }

    fn extract(
        &self,
        io: &mut dyn StreamIo,
        archive: ArchiveHandle,
        index: usize,
        target: StreamId,
    ) -> arcvfs::Result<()> {
        let entries = self.entries(archive);
        let mut start = index;
        while start > 0 && entries[start].continues_block {
            start -= 1;
        }
        let block: Vec<u8> = entries[start..=index]
            .iter()
            .flat_map(|e| e.data.iter().copied())
            .collect();

        for chunk in block.chunks(self.chunk.max(1)) {
            if io.write(target, chunk)? < chunk.len() {
                break;
            }
        }
        self.stats.extracted.fetch_add(1, Ordering::SeqCst);
        if self.report_error {
            return Err(Error::ModuleFailure {
                operation: "extract",
                status: -1,
            });
        }
        Ok(())
    }

    fn close_archive(&self, archive: ArchiveHandle) {
        self.archives.lock().unwrap().remove(&archive.0);
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Fake DMS unpacker
// =============================================================================

/// Copies everything after the `DMS!` signature into the disk image.
#[derive(Debug, Default)]
pub struct FakeDms;

impl DmsUnpacker for FakeDms {
    fn unpack(&self, input: &mut VirtualFile, output: &mut VirtualFile) -> DmsStatus {
        let data = match input.read_all() {
            Ok(data) => data,
            Err(_) => return DmsStatus::Failed(-2),
        };
        let Some(body) = data.strip_prefix(b"DMS!".as_slice()) else {
            return DmsStatus::Failed(-1);
        };
        match output.write_bytes(body) {
            Ok(_) => DmsStatus::Ok,
            Err(_) => DmsStatus::Failed(-3),
        }
    }
}
