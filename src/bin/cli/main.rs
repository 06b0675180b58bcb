//! CLI tool for DSARC archives and DSEQ bundles.

mod commands;
mod exit_codes;
mod output;
mod progress;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;
use std::sync::Arc;

use dsarc::AtomicProgress;
use exit_codes::ExitCode;

/// DSARC archive and DSEQ bundle tool
#[derive(Parser)]
#[command(name = "dsarc")]
#[command(author, version, about = "DSARC archive and DSEQ bundle tool", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Suppress progress output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List entries and bundle chunks (alias: l)
    #[command(alias = "l")]
    List {
        /// Archive or bundle to list
        archive: PathBuf,
    },

    /// Show archive information (alias: i)
    #[command(alias = "i")]
    Info {
        /// Archive or bundle to inspect
        archive: PathBuf,
    },

    /// Extract into <output>/<archive stem> (alias: x)
    #[command(alias = "x")]
    Extract {
        /// Archive or bundle to extract
        archive: PathBuf,

        /// Output directory
        #[arg(short = 'o', long, default_value = ".")]
        output: PathBuf,

        /// Unpack nested archives and bundles into sub-folders
        #[arg(short = 'n', long)]
        nested: bool,

        /// Keep recorded extensions instead of guessing from payload magic
        #[arg(long)]
        no_guess: bool,
    },

    /// Rebuild a container from an extracted folder (alias: r)
    #[command(alias = "r")]
    Rebuild {
        /// Folder produced by extract
        folder: PathBuf,

        /// File to write
        #[arg(short = 'o', long)]
        output: PathBuf,
    },

    /// Show what a folder would be saved as
    Inspect {
        /// Folder to classify
        folder: PathBuf,
    },

    /// Save a loose folder as a new archive or bundle (alias: s)
    #[command(alias = "s")]
    Save {
        /// Folder holding the sources
        folder: PathBuf,

        /// File to write
        #[arg(short = 'o', long)]
        output: PathBuf,
    },

    /// Replace one chunk of a bundle
    ReplaceChunk {
        /// Archive or standalone bundle
        archive: PathBuf,

        /// Chunk name or extension (e.g. `.swar`)
        chunk: String,

        /// File holding the new chunk payload
        file: PathBuf,

        /// File to write
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Bundle entry inside a DSARC archive
        #[arg(short = 'e', long)]
        entry: Option<String>,

        /// Also stage the rebuilt bundle in this folder
        #[arg(long)]
        stage: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn main() {
    let cancel = AtomicProgress::shared();

    // First Ctrl+C asks the running operation to stop, a second one exits
    let handler_cancel = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        if handler_cancel.is_cancelled() {
            std::process::exit(exit_codes::USER_INTERRUPT);
        }
        eprintln!("\nInterrupted, stopping...");
        handler_cancel.cancel();
    })
    .ok();

    let cli = Cli::parse();
    let ctx = commands::Context {
        format: cli.format,
        quiet: cli.quiet,
        cancel,
    };

    let exit_code = match cli.command {
        Commands::List { archive } => commands::list(&ctx, &archive),

        Commands::Info { archive } => commands::info(&ctx, &archive),

        Commands::Extract {
            archive,
            output,
            nested,
            no_guess,
        } => commands::extract(
            &ctx,
            &commands::ExtractConfig {
                archive_path: &archive,
                output_dir: &output,
                nested,
                guess_extensions: !no_guess,
            },
        ),

        Commands::Rebuild { folder, output } => commands::rebuild(&ctx, &folder, &output),

        Commands::Inspect { folder } => commands::inspect(&ctx, &folder),

        Commands::Save { folder, output } => commands::save(&ctx, &folder, &output),

        Commands::ReplaceChunk {
            archive,
            chunk,
            file,
            output,
            entry,
            stage,
        } => commands::replace_chunk(
            &ctx,
            &commands::ReplaceConfig {
                archive_path: &archive,
                chunk: &chunk,
                replacement: &file,
                output: &output,
                entry: entry.as_deref(),
                stage: stage.as_deref(),
            },
        ),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
