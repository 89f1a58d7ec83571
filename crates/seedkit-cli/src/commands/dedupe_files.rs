use crate::support::{
    Context, SAMPLE_LIMIT, or_exit, print_json, print_sample_block, sample_with_truncation,
};
use seedkit_store::{apply_dedupe, plan_dedupe};
use serde_json::json;
use std::path::PathBuf;

pub fn run(ctx: &Context, dir: PathBuf, mapping: PathBuf, dry_run: bool, json_output: bool) {
    let dir = ctx.resolve(&dir);
    let mapping_path = ctx.resolve(&mapping);
    let plan = or_exit(plan_dedupe(&dir, Some(&mapping_path)));
    if !dry_run {
        or_exit(apply_dedupe(&plan, ctx.layout(), &mapping_path));
    }

    let duplicates: Vec<String> = plan
        .duplicates
        .iter()
        .map(|path| path.display().to_string())
        .collect();

    if json_output {
        let payload = json!({
            "action": "dedupe-files",
            "dry_run": dry_run,
            "dir": dir.display().to_string(),
            "mapping_path": mapping_path.display().to_string(),
            "original": plan.mapping.len(),
            "unique": plan.unique(),
            "duplicates": duplicates,
            "skipped": plan.skipped,
            "mapping": plan.mapping_value(),
        });
        print_json(&payload);
        return;
    }

    println!("seedkit dedupe-files{}", if dry_run { " (dry run)" } else { "" });
    println!("  Directory: {}", dir.display());
    println!("  Original: {} files", plan.mapping.len());
    println!("  Deduplicated: {} files", plan.unique());
    println!(
        "  Duplicates {}: {}",
        if dry_run { "found" } else { "removed" },
        plan.duplicates.len()
    );
    let (sample, truncated) = sample_with_truncation(duplicates, SAMPLE_LIMIT);
    print_sample_block("Duplicates", &sample, truncated);
    let (skipped, truncated) = sample_with_truncation(plan.skipped.clone(), SAMPLE_LIMIT);
    print_sample_block("Skipped", &skipped, truncated);
    if !dry_run {
        println!("  Mapping saved to {}", mapping_path.display());
    }
}
