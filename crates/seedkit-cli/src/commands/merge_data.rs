use crate::cli::RunFlags;
use crate::support::{
    Context, FileReport, load_document_or_exit, print_reports, process_targets, targets_or_exit,
    write_document,
};
use seedkit_kernel::{ConflictPolicy, merge_documents};
use seedkit_store::load_document;
use serde_json::{Map, json};
use std::path::PathBuf;

pub struct Args {
    pub origin: PathBuf,
    pub target: Option<PathBuf>,
    pub target_dir: Option<PathBuf>,
    pub overwrite_conflicts: bool,
    pub flags: RunFlags,
}

pub fn run(ctx: &Context, args: Args) {
    let origin_path = ctx.resolve(&args.origin);
    let origin = load_document_or_exit(&origin_path);
    let policy = if args.overwrite_conflicts {
        ConflictPolicy::OverwriteWithOrigin
    } else {
        ctx.settings.merge.conflict_policy
    };
    let targets = targets_or_exit(ctx, args.target, args.target_dir, Some(&origin_path));
    let dry_run = args.flags.dry_run;

    let reports = process_targets(&targets, |path| {
        let target = load_document(path)?;
        let outcome = merge_documents(&target, &origin, policy);
        let mut report = FileReport::new(path, json!(outcome.stats));
        for (name, stats) in &outcome.stats {
            report.note(format!(
                "{name}: {} added, {} skipped, {} overwritten, {} conflict(s)",
                stats.added,
                stats.skipped,
                stats.overwritten,
                stats.conflicts.len()
            ));
            report.sample(format!("{name} conflicting ids"), stats.conflicts.clone());
        }
        if outcome.changed() {
            write_document(ctx, path, &outcome.document, dry_run, &mut report)?;
        }
        Ok(report)
    });

    print_reports(
        "merge-data",
        &[
            ("Origin", origin_path.display().to_string()),
            ("Conflict policy", policy.to_string()),
        ],
        &targets,
        &reports,
        args.flags,
        Map::from_iter([
            ("origin".to_string(), json!(origin_path.display().to_string())),
            ("conflict_policy".to_string(), json!(policy)),
        ]),
    );
}
