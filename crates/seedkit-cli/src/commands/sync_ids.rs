use crate::cli::RunFlags;
use crate::support::{
    Context, FileReport, load_document_or_exit, print_reports, process_targets, targets_or_exit,
    write_document,
};
use seedkit_kernel::sync_ids;
use seedkit_store::load_document;
use serde_json::{Map, json};
use std::path::PathBuf;

pub fn run(ctx: &Context, source: PathBuf, target_dir: PathBuf, flags: RunFlags) {
    let source_path = ctx.resolve(&source);
    let source = load_document_or_exit(&source_path);
    let targets = targets_or_exit(ctx, None, Some(target_dir), Some(&source_path));

    let reports = process_targets(&targets, |path| {
        let target = load_document(path)?;
        let outcome = sync_ids(&source, &target);
        let mut report = FileReport::new(path, json!(outcome.stats));
        for (name, stats) in &outcome.stats {
            report.note(format!(
                "{name}: {} matched, {} updated",
                stats.matched, stats.updated
            ));
        }
        if outcome.updated() > 0 {
            write_document(ctx, path, &outcome.document, flags.dry_run, &mut report)?;
        }
        Ok(report)
    });

    print_reports(
        "sync-ids",
        &[("Source", source_path.display().to_string())],
        &targets,
        &reports,
        flags,
        Map::from_iter([(
            "source".to_string(),
            json!(source_path.display().to_string()),
        )]),
    );
}
