use crate::support::{Context, load_document_or_exit, print_json};
use seedkit_kernel::document_summary;
use serde_json::json;
use std::path::PathBuf;

pub fn run(ctx: &Context, file: PathBuf, json_output: bool) {
    let path = ctx.resolve(&file);
    let document = load_document_or_exit(&path);
    let summary = document_summary(&document);

    if json_output {
        print_json(&json!({
            "action": "shape",
            "file": path.display().to_string(),
            "collections": summary,
        }));
        return;
    }

    println!("seedkit shape {}", path.display());
    for collection in &summary {
        println!();
        println!("{} ({} records)", collection.name, collection.records);
        let outline =
            serde_json::to_string_pretty(&collection.sample).expect("json serialization");
        for line in outline.lines() {
            println!("  {line}");
        }
    }
}
