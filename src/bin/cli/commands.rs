//! Command implementations for the CLI tool.

use std::path::Path;
use std::sync::Arc;

use dsarc::bundle::BundleChunk;
use dsarc::{
    ArchiveType, AtomicProgress, Entry, Error, ExtractOptions, LoadedArchive, inspect_folder,
    rebuild_folder, save_archive,
};

use crate::OutputFormat;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::create_formatter;
use crate::progress::CliProgress;

/// Settings shared by every command.
pub struct Context {
    pub format: OutputFormat,
    pub quiet: bool,
    pub cancel: Arc<AtomicProgress>,
}

impl Context {
    fn progress(&self, total: u64) -> CliProgress {
        CliProgress::new(total, self.quiet, Arc::clone(&self.cancel))
    }
}

/// Configuration for the extract command.
pub struct ExtractConfig<'a> {
    pub archive_path: &'a Path,
    pub output_dir: &'a Path,
    pub nested: bool,
    pub guess_extensions: bool,
}

/// Configuration for the replace-chunk command.
pub struct ReplaceConfig<'a> {
    pub archive_path: &'a Path,
    pub chunk: &'a str,
    pub replacement: &'a Path,
    pub output: &'a Path,
    pub entry: Option<&'a str>,
    pub stage: Option<&'a Path>,
}

fn fail(progress: Option<&CliProgress>, e: &Error) -> ExitCode {
    if let Some(progress) = progress {
        progress.finish_with_message("Failed");
    }
    eprintln!("Error: {}", e);
    error_to_exit_code(e)
}

fn open_archive(path: &Path) -> Result<LoadedArchive, ExitCode> {
    LoadedArchive::open_path(path).map_err(|e| {
        eprintln!("Error opening archive: {}", e);
        error_to_exit_code(&e)
    })
}

/// List command implementation
pub fn list(ctx: &Context, archive_path: &Path) -> ExitCode {
    let archive = match open_archive(archive_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let formatter = create_formatter(ctx.format);
    print!(
        "{}",
        formatter.format_list(archive.archive_type(), archive.entries())
    );
    ExitCode::Success
}

/// Info command implementation
pub fn info(ctx: &Context, archive_path: &Path) -> ExitCode {
    let archive = match open_archive(archive_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match archive.info() {
        Ok(info) => {
            print!("{}", create_formatter(ctx.format).format_info(&info));
            ExitCode::Success
        }
        Err(e) => fail(None, &e),
    }
}

/// Extract command implementation
pub fn extract(ctx: &Context, config: &ExtractConfig<'_>) -> ExitCode {
    let archive = match open_archive(config.archive_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let options = ExtractOptions::new()
        .nested(config.nested)
        .guess_extensions(config.guess_extensions);

    let mut progress = ctx.progress(archive.entries().len() as u64);
    progress.set_message("Extracting...");

    let result = match archive.extract_all(config.output_dir, &options, &mut progress) {
        Ok(r) => r,
        Err(e) => return fail(Some(&progress), &e),
    };
    progress.finish();

    let formatter = create_formatter(ctx.format);
    print!(
        "{}",
        formatter.format_extract_result(&result, progress.warnings())
    );
    ExitCode::from_warnings(progress.warnings().len())
}

/// Rebuild command implementation
pub fn rebuild(ctx: &Context, folder: &Path, output: &Path) -> ExitCode {
    let mut progress = ctx.progress(0);
    progress.set_message("Rebuilding...");

    let bytes = match rebuild_folder(folder, &mut progress) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            progress.finish_with_message("Failed");
            eprintln!("Error: {} does not exist", folder.display());
            return ExitCode::IoError;
        }
        Err(e) => return fail(Some(&progress), &e),
    };
    progress.finish();

    if let Err(e) = dsarc::fs::write_file(output, &bytes) {
        return fail(None, &e);
    }

    let archive_type = dsarc::format::detect::detect_bytes(&bytes).ok();
    print!(
        "{}",
        create_formatter(ctx.format).format_written(output, archive_type, bytes.len() as u64)
    );
    ExitCode::from_warnings(progress.warnings().len())
}

/// Inspect command implementation
pub fn inspect(ctx: &Context, folder: &Path) -> ExitCode {
    let mut progress = ctx.progress(0);
    progress.set_message("Inspecting...");

    let result = match inspect_folder(folder, &mut progress) {
        Ok(r) => r,
        Err(e) => return fail(Some(&progress), &e),
    };
    progress.finish();

    print!(
        "{}",
        create_formatter(ctx.format).format_import(&result, progress.warnings())
    );
    ExitCode::from_warnings(progress.warnings().len())
}

/// Save command implementation
pub fn save(ctx: &Context, folder: &Path, output: &Path) -> ExitCode {
    let mut progress = ctx.progress(0);
    progress.set_message("Inspecting...");

    let import = match inspect_folder(folder, &mut progress) {
        Ok(r) => r,
        Err(e) => return fail(Some(&progress), &e),
    };

    progress.set_message("Saving...");
    let result = match save_archive(
        output,
        import.file_type,
        &import.entries,
        &import.source_folder,
        &mut progress,
    ) {
        Ok(r) => r,
        Err(e) => return fail(Some(&progress), &e),
    };
    progress.finish();

    print!("{}", create_formatter(ctx.format).format_save_result(&result));
    ExitCode::from_warnings(progress.warnings().len())
}

/// Finds a chunk by name, or by extension with or without the leading dot.
fn find_chunk<'a>(chunks: &'a [Entry], wanted: &str) -> Option<&'a Entry> {
    chunks
        .iter()
        .find(|c| c.name == wanted)
        .or_else(|| chunks.get(BundleChunk::from_extension(wanted)?.index()))
}

/// Replace-chunk command implementation
pub fn replace_chunk(ctx: &Context, config: &ReplaceConfig<'_>) -> ExitCode {
    let archive = match open_archive(config.archive_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let parent = match (config.entry, archive.archive_type()) {
        (Some(name), ArchiveType::Archive) => match archive.entry(name) {
            Some(entry) if entry.is_bundle => Some(entry),
            Some(_) => {
                eprintln!("Error: '{}' is not a bundle", name);
                return ExitCode::BadArgs;
            }
            None => {
                eprintln!("Error: no entry named '{}'", name);
                return ExitCode::BadArgs;
            }
        },
        (None, ArchiveType::Bundle) => None,
        (None, ArchiveType::Archive) => {
            eprintln!("Error: --entry is required for a DSARC archive");
            return ExitCode::BadArgs;
        }
        (Some(_), ArchiveType::Bundle) => {
            eprintln!("Error: --entry only applies to DSARC archives");
            return ExitCode::BadArgs;
        }
    };

    let chunks = parent.map_or(archive.entries(), |p| p.children.as_slice());
    let Some(chunk) = find_chunk(chunks, config.chunk) else {
        eprintln!("Error: no chunk matching '{}'", config.chunk);
        return ExitCode::BadArgs;
    };

    let bundle = match archive.replace_chunk(parent, chunk, config.replacement, config.stage) {
        Ok(b) => b,
        Err(e) => return fail(None, &e),
    };

    let bytes = match parent {
        Some(parent) => match archive.with_entry_bytes(parent, &bundle) {
            Ok(b) => b,
            Err(e) => return fail(None, &e),
        },
        None => bundle,
    };

    if let Err(e) = dsarc::fs::write_file(config.output, &bytes) {
        return fail(None, &e);
    }

    if !ctx.quiet && ctx.format == OutputFormat::Human {
        eprintln!("Replaced {} in {}", chunk.name, config.archive_path.display());
    }
    print!(
        "{}",
        create_formatter(ctx.format).format_written(
            config.output,
            Some(archive.archive_type()),
            bytes.len() as u64
        )
    );
    ExitCode::Success
}
