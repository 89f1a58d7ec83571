use crate::cli::RunFlags;
use crate::support::{
    Context, FileReport, load_document_or_exit, print_reports, process_targets, targets_or_exit,
    write_document,
};
use seedkit_kernel::apply_diff;
use seedkit_store::{load_diff_for, load_document};
use serde_json::{Map, Value, json};
use std::path::PathBuf;

pub fn run(
    ctx: &Context,
    merged_source: PathBuf,
    target: Option<PathBuf>,
    target_dir: Option<PathBuf>,
    flags: RunFlags,
) {
    let merged_path = ctx.resolve(&merged_source);
    let merged = load_document_or_exit(&merged_path);
    let targets = targets_or_exit(ctx, target, target_dir, Some(&merged_path));

    let reports = process_targets(&targets, |path| {
        let (document, mut report) = match load_diff_for(ctx.layout(), path)? {
            Some(diff) => {
                let outcome = apply_diff(&merged, &diff);
                let mut report = FileReport::new(path, json!(outcome.stats));
                for (name, stats) in &outcome.stats {
                    report.note(format!(
                        "{name}: {} modified, {} added, {} missing reference(s), {} already present",
                        stats.modified,
                        stats.added,
                        stats.missing_refs.len(),
                        stats.already_present.len()
                    ));
                    report.sample(
                        format!("{name} missing references"),
                        stats.missing_refs.clone(),
                    );
                    report.sample(
                        format!("{name} already present"),
                        stats.already_present.clone(),
                    );
                }
                (outcome.document, report)
            }
            None => {
                let mut report = FileReport::new(path, Value::Null);
                report.note("no saved diff; taking the merged source as is");
                (merged.clone(), report)
            }
        };

        // An unreadable target is simply replaced.
        let current = load_document(path).ok();
        if current.as_ref() != Some(&document) {
            write_document(ctx, path, &document, flags.dry_run, &mut report)?;
        }
        Ok(report)
    });

    print_reports(
        "apply-diff",
        &[("Merged source", merged_path.display().to_string())],
        &targets,
        &reports,
        flags,
        Map::from_iter([(
            "merged_source".to_string(),
            json!(merged_path.display().to_string()),
        )]),
    );
}
