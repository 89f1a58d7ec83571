use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "seedkit",
    about = "Seedkit: merge, diff and re-apply JSON fixture collections for mock backends",
    version
)]
pub struct Cli {
    /// Settings file (defaults to ./seedkit.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every command that writes files.
#[derive(Args, Debug, Clone, Copy)]
pub struct RunFlags {
    /// Compute and report, but write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Log per-record decisions to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge an origin document into a target file (or every file in a directory)
    MergeData {
        /// Document whose records are merged in
        origin: PathBuf,

        /// Target file, rewritten in place
        target: Option<PathBuf>,

        /// Merge into every *.json file directly inside this directory
        #[arg(long, conflicts_with = "target")]
        target_dir: Option<PathBuf>,

        /// On an _id collision, replace the target record with the origin's
        #[arg(long)]
        overwrite_conflicts: bool,

        #[command(flatten)]
        flags: RunFlags,
    },

    /// Save the customizations a backend file made on top of a source document
    GenerateDiff {
        /// Source document the backend was derived from
        source: PathBuf,

        /// Backend file to diff
        backend: Option<PathBuf>,

        /// Diff every *.json file directly inside this directory
        #[arg(long, conflicts_with = "backend")]
        target_dir: Option<PathBuf>,

        /// Write the diff file even when it is empty
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        flags: RunFlags,
    },

    /// Rebuild target files from a merged source plus their saved diffs
    ApplyDiff {
        /// Refreshed, merged source document
        merged_source: PathBuf,

        /// Target file, rewritten in place
        target: Option<PathBuf>,

        /// Rebuild every *.json file directly inside this directory
        #[arg(long, conflicts_with = "target")]
        target_dir: Option<PathBuf>,

        #[command(flatten)]
        flags: RunFlags,
    },

    /// Give every identity-less record a content-derived _id
    GenerateCollectionIds {
        /// File to update in place
        file: Option<PathBuf>,

        /// Update every *.json file directly inside this directory
        #[arg(long, conflicts_with = "file")]
        target_dir: Option<PathBuf>,

        /// Comma-separated collection names (default: all)
        #[arg(long)]
        collections: Option<String>,

        #[command(flatten)]
        flags: RunFlags,
    },

    /// Rewrite _ids in target files to match a source document by content
    SyncIds {
        /// Document holding the authoritative ids
        #[arg(long)]
        source: PathBuf,

        /// Directory of files to update
        #[arg(long)]
        target_dir: PathBuf,

        #[command(flatten)]
        flags: RunFlags,
    },

    /// Remove content-identical files from a directory and write a name mapping
    DedupeFiles {
        /// Directory holding the *.json files
        dir: PathBuf,

        /// Where to write the stem → surviving stem mapping
        #[arg(long, default_value = "mapping.json")]
        mapping: PathBuf,

        /// Report duplicates without removing anything
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print collection names, record counts and a field outline
    Shape {
        /// Document to summarize
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    pub fn verbose(&self) -> bool {
        match self {
            Self::MergeData { flags, .. }
            | Self::GenerateDiff { flags, .. }
            | Self::ApplyDiff { flags, .. }
            | Self::GenerateCollectionIds { flags, .. }
            | Self::SyncIds { flags, .. } => flags.verbose,
            Self::DedupeFiles { .. } | Self::Shape { .. } => false,
        }
    }
}
