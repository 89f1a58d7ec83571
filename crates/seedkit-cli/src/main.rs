//! Seedkit CLI: the `seedkit` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use support::Context;

fn main() {
    let cli = Cli::try_parse().unwrap_or_else(|err| {
        let _ = err.print();
        // Help and version requests are not failures.
        std::process::exit(if err.use_stderr() { 1 } else { 0 });
    });

    support::init_logging(cli.command.verbose());
    let ctx = Context::load_or_exit(cli.config.as_deref());

    match cli.command {
        Commands::MergeData {
            origin,
            target,
            target_dir,
            overwrite_conflicts,
            flags,
        } => commands::merge_data::run(
            &ctx,
            commands::merge_data::Args {
                origin,
                target,
                target_dir,
                overwrite_conflicts,
                flags,
            },
        ),

        Commands::GenerateDiff {
            source,
            backend,
            target_dir,
            force,
            flags,
        } => commands::generate_diff::run(
            &ctx,
            commands::generate_diff::Args {
                source,
                backend,
                target_dir,
                force,
                flags,
            },
        ),

        Commands::ApplyDiff {
            merged_source,
            target,
            target_dir,
            flags,
        } => commands::apply_diff::run(&ctx, merged_source, target, target_dir, flags),

        Commands::GenerateCollectionIds {
            file,
            target_dir,
            collections,
            flags,
        } => commands::generate_collection_ids::run(&ctx, file, target_dir, collections, flags),

        Commands::SyncIds {
            source,
            target_dir,
            flags,
        } => commands::sync_ids::run(&ctx, source, target_dir, flags),

        Commands::DedupeFiles {
            dir,
            mapping,
            dry_run,
            json,
        } => commands::dedupe_files::run(&ctx, dir, mapping, dry_run, json),

        Commands::Shape { file, json } => commands::shape::run(&ctx, file, json),
    }
}
