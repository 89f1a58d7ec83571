use crate::cli::RunFlags;
use crate::support::{
    Context, FileReport, print_reports, process_targets, targets_or_exit, write_document,
};
use seedkit_kernel::{CollectionFilter, assign_ids};
use seedkit_store::load_document;
use serde_json::{Map, json};
use std::path::PathBuf;

pub fn run(
    ctx: &Context,
    file: Option<PathBuf>,
    target_dir: Option<PathBuf>,
    collections: Option<String>,
    flags: RunFlags,
) {
    let filter = collections
        .as_deref()
        .map(CollectionFilter::from_csv)
        .unwrap_or_default();
    let hash_len = ctx.settings.ids.hash_length;
    let targets = targets_or_exit(ctx, file, target_dir, None);

    let reports = process_targets(&targets, |path| {
        let document = load_document(path)?;
        let outcome = assign_ids(&document, &filter, hash_len);
        let mut report = FileReport::new(
            path,
            json!({
                "collections": outcome.stats,
                "missing_collections": outcome.missing_collections,
                "available_collections": outcome.available_collections,
            }),
        );

        if outcome.matched_nothing() {
            tracing::warn!(
                file = %path.display(),
                requested = ?outcome.missing_collections,
                "none of the requested collections exist"
            );
            report.note(format!(
                "warning: none of the requested collections exist ({}); available: {}",
                outcome.missing_collections.join(", "),
                outcome.available_collections.join(", ")
            ));
        } else if !outcome.missing_collections.is_empty() {
            report.note(format!(
                "not present: {}",
                outcome.missing_collections.join(", ")
            ));
        }
        for (name, stats) in &outcome.stats {
            report.note(format!(
                "{name}: {} records, {} already identified, {} assigned",
                stats.total, stats.existing, stats.assigned
            ));
        }

        if outcome.assigned() > 0 {
            write_document(ctx, path, &outcome.document, flags.dry_run, &mut report)?;
        }
        Ok(report)
    });

    let header = match &filter {
        CollectionFilter::All => vec![("Collections", "all".to_string())],
        CollectionFilter::Only(names) => vec![("Collections", names.join(", "))],
    };
    print_reports(
        "generate-collection-ids",
        &header,
        &targets,
        &reports,
        flags,
        Map::from_iter([("hash_length".to_string(), json!(hash_len))]),
    );
}
