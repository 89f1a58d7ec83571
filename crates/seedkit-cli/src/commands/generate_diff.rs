use crate::cli::RunFlags;
use crate::support::{
    Context, FileReport, load_document_or_exit, print_reports, process_targets, targets_or_exit,
};
use seedkit_kernel::generate_diff;
use seedkit_store::{load_document, save_diff_for};
use serde_json::{Map, json};
use std::path::PathBuf;

pub struct Args {
    pub source: PathBuf,
    pub backend: Option<PathBuf>,
    pub target_dir: Option<PathBuf>,
    pub force: bool,
    pub flags: RunFlags,
}

pub fn run(ctx: &Context, args: Args) {
    let source_path = ctx.resolve(&args.source);
    let source = load_document_or_exit(&source_path);
    let targets = targets_or_exit(ctx, args.backend, args.target_dir, Some(&source_path));
    let dry_run = args.flags.dry_run;

    let reports = process_targets(&targets, |path| {
        let backend = load_document(path)?;
        let outcome = generate_diff(&source, &backend);
        let mut report = FileReport::new(path, json!(outcome.stats));
        for (name, stats) in &outcome.stats {
            report.note(format!(
                "{name}: {} added, {} modified, {} unchanged ({} matched by id, {} by content)",
                stats.added,
                stats.modified,
                stats.unchanged,
                stats.matched_by_id,
                stats.matched_by_content
            ));
        }

        if outcome.diff.is_empty() && !args.force {
            report.note("no customizations; diff not written");
            return Ok(report);
        }
        let diff_path = ctx.layout().diff_path(path);
        if !dry_run {
            save_diff_for(ctx.layout(), path, &outcome.diff)?;
        }
        report.mark_written(&diff_path, dry_run);
        Ok(report)
    });

    print_reports(
        "generate-diff",
        &[("Source", source_path.display().to_string())],
        &targets,
        &reports,
        args.flags,
        Map::from_iter([(
            "source".to_string(),
            json!(source_path.display().to_string()),
        )]),
    );
}
