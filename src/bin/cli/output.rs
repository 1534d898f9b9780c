//! Output formatting for CLI operations.

use serde_json::json;

/// One visited archive member.
pub struct MemberLine {
    pub name: String,
    pub length: u64,
    pub crc32: u32,
    pub decompressed: bool,
}

/// What `info` and `crc` report about an opened path.
pub struct FileReport {
    pub path: String,
    pub name: String,
    pub member: Option<String>,
    pub length: u64,
    pub decompressed: bool,
    pub format: String,
    pub content: String,
    pub crc32: u32,
}

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats a member listing
    fn format_list(&self, members: &[MemberLine]) -> String;

    /// Formats the full report of a path
    fn format_info(&self, report: &FileReport) -> String;

    /// Formats the checksum line of a path
    fn format_crc(&self, report: &FileReport) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_list(&self, members: &[MemberLine]) -> String {
        let mut output = String::new();
        output.push_str(&format!("{:>12} {:>10} {}\n", "Size", "CRC", "Name"));
        output.push_str(&"-".repeat(60));
        output.push('\n');

        let mut total: u64 = 0;
        for member in members {
            total += member.length;
            output.push_str(&format!(
                "{:>12} {:>10} {}{}\n",
                humanize_bytes(member.length),
                format!("{:08X}", member.crc32),
                member.name,
                if member.decompressed { " *" } else { "" }
            ));
        }

        output.push_str(&"-".repeat(60));
        output.push('\n');
        output.push_str(&format!(
            "{} members, {} total\n",
            members.len(),
            humanize_bytes(total)
        ));
        output
    }

    fn format_info(&self, report: &FileReport) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", report.path));
        output.push_str(&"-".repeat(40));
        output.push('\n');
        output.push_str(&format!("  Name:           {}\n", report.name));
        if let Some(member) = &report.member {
            output.push_str(&format!("  Member:         {}\n", member));
        }
        output.push_str(&format!(
            "  Length:         {} ({} bytes)\n",
            humanize_bytes(report.length),
            report.length
        ));
        output.push_str(&format!(
            "  Decompressed:   {}\n",
            if report.decompressed { "Yes" } else { "No" }
        ));
        output.push_str(&format!("  Stored as:      {}\n", report.format));
        output.push_str(&format!("  Content:        {}\n", report.content));
        output.push_str(&format!("  CRC-32:         {:08X}\n", report.crc32));
        output
    }

    fn format_crc(&self, report: &FileReport) -> String {
        format!("{:08X}  {:>10}  {}\n", report.crc32, report.length, report.path)
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_list(&self, members: &[MemberLine]) -> String {
        let items: Vec<_> = members
            .iter()
            .map(|m| {
                json!({
                    "name": m.name,
                    "length": m.length,
                    "crc32": m.crc32,
                    "decompressed": m.decompressed,
                })
            })
            .collect();

        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_info(&self, report: &FileReport) -> String {
        let obj = json!({
            "path": report.path,
            "name": report.name,
            "member": report.member,
            "length": report.length,
            "decompressed": report.decompressed,
            "format": report.format,
            "content": report.content,
            "crc32": report.crc32,
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_crc(&self, report: &FileReport) -> String {
        let obj = json!({
            "path": report.path,
            "length": report.length,
            "crc32": report.crc32,
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Converts bytes to a human-readable string
pub fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
