//! Output formatting for CLI operations.

use serde_json::{Value, json};
use std::path::Path;

use dsarc::progress::format_bytes_iec;
use dsarc::{ArchiveInfo, ArchiveType, Entry, ExtractResult, ImportResult, SaveResult};

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats an entry tree
    fn format_list(&self, archive_type: ArchiveType, entries: &[Entry]) -> String;

    /// Formats archive information
    fn format_info(&self, info: &ArchiveInfo) -> String;

    /// Formats extraction results
    fn format_extract_result(&self, result: &ExtractResult, warnings: &[String]) -> String;

    /// Formats a folder classification
    fn format_import(&self, result: &ImportResult, warnings: &[String]) -> String;

    /// Formats save results
    fn format_save_result(&self, result: &SaveResult) -> String;

    /// Formats a plain "wrote N bytes" outcome (rebuild, replace-chunk)
    fn format_written(&self, path: &Path, archive_type: Option<ArchiveType>, bytes: u64) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl HumanFormatter {
    fn push_entries(output: &mut String, entries: &[Entry], depth: usize) {
        for entry in entries {
            let kind = if entry.is_bundle { "B" } else { "" };
            output.push_str(&format!(
                "{:>12} {:>10} {}{}{}\n",
                format_bytes_iec(entry.size),
                format!("{:#x}", entry.offset),
                "  ".repeat(depth),
                entry.name,
                if kind.is_empty() {
                    String::new()
                } else {
                    format!(" [{kind}]")
                }
            ));
            Self::push_entries(output, &entry.children, depth + 1);
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_list(&self, archive_type: ArchiveType, entries: &[Entry]) -> String {
        let mut output = String::new();

        output.push_str(&format!("{:>12} {:>10} {}\n", "Size", "Offset", "Name"));
        output.push_str(&"-".repeat(60));
        output.push('\n');

        Self::push_entries(&mut output, entries, 0);

        let total_size: u64 = entries.iter().map(|e| e.size).sum();
        let bundles = entries.iter().filter(|e| e.is_bundle).count();
        output.push_str(&"-".repeat(60));
        output.push('\n');
        output.push_str(&format!(
            "{} entries, {} bundles, {} total ({})\n",
            entries.len(),
            bundles,
            format_bytes_iec(total_size),
            archive_type
        ));

        output
    }

    fn format_info(&self, info: &ArchiveInfo) -> String {
        let mut output = String::new();

        output.push_str("Archive Information:\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');
        output.push_str(&format!("  Type:           {}\n", info.archive_type));
        output.push_str(&format!("  Entries:        {}\n", info.entry_count));
        output.push_str(&format!("  Bundles:        {}\n", info.bundle_count));
        output.push_str(&format!(
            "  Payload size:   {}\n",
            format_bytes_iec(info.payload_size)
        ));
        output.push_str(&format!(
            "  File size:      {}\n",
            format_bytes_iec(info.file_size)
        ));
        output.push_str(&format!(
            "  Overhead:       {}\n",
            format_bytes_iec(info.overhead())
        ));

        output
    }

    fn format_extract_result(&self, result: &ExtractResult, warnings: &[String]) -> String {
        let mut output = format!(
            "Extracted {} files to {}\n",
            result.files_written,
            result.out_dir.display()
        );
        if !result.mapping_lines.is_empty() {
            output.push_str(&format!(
                "Wrote {} manifest lines\n",
                result.mapping_lines.len()
            ));
        }
        push_warnings(&mut output, warnings);
        output
    }

    fn format_import(&self, result: &ImportResult, warnings: &[String]) -> String {
        let mut output = format!(
            "{} would be saved as a {} with {} entries:\n",
            result.source_folder.display(),
            result.file_type,
            result.entries.len()
        );
        Self::push_entries(&mut output, &result.entries, 1);
        push_warnings(&mut output, warnings);
        output
    }

    fn format_save_result(&self, result: &SaveResult) -> String {
        format!(
            "Saved {} with {} entries ({})\n",
            result.path.display(),
            result.entries_written,
            format_bytes_iec(result.bytes_written)
        )
    }

    fn format_written(&self, path: &Path, archive_type: Option<ArchiveType>, bytes: u64) -> String {
        match archive_type {
            Some(t) => format!("Wrote {} {} ({})\n", t, path.display(), format_bytes_iec(bytes)),
            None => format!("Wrote {} ({})\n", path.display(), format_bytes_iec(bytes)),
        }
    }
}

fn push_warnings(output: &mut String, warnings: &[String]) {
    if !warnings.is_empty() {
        output.push_str(&format!("\n{} warnings:\n", warnings.len()));
        for warning in warnings {
            output.push_str(&format!("  {}\n", warning));
        }
    }
}

/// JSON output formatter
pub struct JsonFormatter;

fn entry_json(entry: &Entry) -> Value {
    json!({
        "name": entry.name,
        "size": entry.size,
        "offset": entry.offset,
        "is_bundle": entry.is_bundle,
        "children": entry.children.iter().map(entry_json).collect::<Vec<_>>(),
    })
}

fn pretty(value: &Value) -> String {
    let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    text.push('\n');
    text
}

impl OutputFormatter for JsonFormatter {
    fn format_list(&self, archive_type: ArchiveType, entries: &[Entry]) -> String {
        pretty(&json!({
            "type": archive_type.name(),
            "entries": entries.iter().map(entry_json).collect::<Vec<_>>(),
        }))
    }

    fn format_info(&self, info: &ArchiveInfo) -> String {
        pretty(&json!({
            "type": info.archive_type.name(),
            "entry_count": info.entry_count,
            "bundle_count": info.bundle_count,
            "payload_size": info.payload_size,
            "file_size": info.file_size,
            "overhead": info.overhead(),
        }))
    }

    fn format_extract_result(&self, result: &ExtractResult, warnings: &[String]) -> String {
        pretty(&json!({
            "out_dir": result.out_dir.display().to_string(),
            "files_written": result.files_written,
            "mapping": result
                .mapping_lines
                .iter()
                .map(|l| json!({"entry": l.left, "source": l.right}))
                .collect::<Vec<_>>(),
            "warnings": warnings,
        }))
    }

    fn format_import(&self, result: &ImportResult, warnings: &[String]) -> String {
        pretty(&json!({
            "folder": result.source_folder.display().to_string(),
            "type": result.file_type.name(),
            "entries": result.entries.iter().map(entry_json).collect::<Vec<_>>(),
            "warnings": warnings,
        }))
    }

    fn format_save_result(&self, result: &SaveResult) -> String {
        pretty(&json!({
            "path": result.path.display().to_string(),
            "type": result.archive_type.name(),
            "entries_written": result.entries_written,
            "bytes_written": result.bytes_written,
        }))
    }

    fn format_written(&self, path: &Path, archive_type: Option<ArchiveType>, bytes: u64) -> String {
        pretty(&json!({
            "path": path.display().to_string(),
            "type": archive_type.map(|t| t.name()),
            "bytes_written": bytes,
        }))
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}
