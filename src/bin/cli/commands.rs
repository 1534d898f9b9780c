//! Command implementations for the CLI tool.

use std::io::Write;

use arcvfs::checksum::file_crc32;
use arcvfs::{FileLayer, HandleId, OpenMode, Whence};

use crate::OutputFormat;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::{FileReport, MemberLine, create_formatter};

/// Cat command implementation
pub fn cat(layer: &FileLayer, path: &str) -> ExitCode {
    let id = match open(layer, path) {
        Ok(id) => id,
        Err(code) => return code,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut buffer = vec![0u8; 64 * 1024];
    let code = loop {
        let n = match layer.read(id, &mut buffer) {
            Ok(0) => break ExitCode::Success,
            Ok(n) => n,
            Err(e) => {
                eprintln!("Error reading {}: {}", path, e);
                break error_to_exit_code(&e);
            }
        };
        if let Err(e) = out.write_all(&buffer[..n]) {
            eprintln!("Error writing output: {}", e);
            break ExitCode::IoError;
        }
    };
    let _ = out.flush();
    let _ = layer.close(id);
    code
}

/// List command implementation
pub fn list(layer: &FileLayer, path: &str, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);
    let mut members = Vec::new();

    let result = layer.for_each_member(path, |member| {
        match file_crc32(member) {
            Ok(crc32) => members.push(MemberLine {
                name: member
                    .member_name()
                    .unwrap_or_else(|| member.name())
                    .to_string(),
                length: member.len(),
                crc32,
                decompressed: member.is_compressed(),
            }),
            Err(e) => log::warn!("{}: checksum failed: {}", member.name(), e),
        }
        true
    });

    match result {
        Ok(_) => {
            print!("{}", formatter.format_list(&members));
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error listing {}: {}", path, e);
            error_to_exit_code(&e)
        }
    }
}

/// CRC command implementation
pub fn crc(layer: &FileLayer, path: &str, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);
    match report(layer, path) {
        Ok(report) => {
            print!("{}", formatter.format_crc(&report));
            ExitCode::Success
        }
        Err(code) => code,
    }
}

/// Info command implementation
pub fn info(layer: &FileLayer, path: &str, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);
    match report(layer, path) {
        Ok(report) => {
            print!("{}", formatter.format_info(&report));
            ExitCode::Success
        }
        Err(code) => code,
    }
}

fn report(layer: &FileLayer, path: &str) -> Result<FileReport, ExitCode> {
    let raw = layer.open_raw(path, OpenMode::Read).map_err(|e| {
        eprintln!("Error opening {}: {}", path, e);
        error_to_exit_code(&e)
    })?;
    let stored = layer.classify(raw);
    let _ = layer.close(raw);
    let format = stored.map_err(|e| {
        eprintln!("Error reading {}: {}", path, e);
        error_to_exit_code(&e)
    })?;

    let id = open(layer, path)?;
    let result = (|| {
        layer.seek(id, 0, Whence::Start)?;
        Ok::<_, arcvfs::Error>(FileReport {
            path: path.to_string(),
            name: layer.name(id)?,
            member: layer.member_name(id)?,
            length: layer.len(id)?,
            decompressed: layer.is_compressed(id)?,
            format: format.to_string(),
            content: layer.content_kind(id)?.to_string(),
            crc32: layer.checksum(id)?,
        })
    })();
    let _ = layer.close(id);

    result.map_err(|e| {
        eprintln!("Error reading {}: {}", path, e);
        error_to_exit_code(&e)
    })
}

/// Helper to open and decompress a path
fn open(layer: &FileLayer, path: &str) -> Result<HandleId, ExitCode> {
    layer.open(path, OpenMode::Read).map_err(|e| {
        eprintln!("Error opening {}: {}", path, e);
        error_to_exit_code(&e)
    })
}
