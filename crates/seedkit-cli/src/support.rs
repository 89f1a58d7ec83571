use crate::cli::RunFlags;
use seedkit_kernel::Document;
use seedkit_store::{
    DEFAULT_CONFIG_FILE, Layout, Settings, StoreError, list_json_files, load_document,
    require_json_extension, resolve, save_document,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

pub const SAMPLE_LIMIT: usize = 25;

/// Working directory and settings shared by every command.
pub struct Context {
    pub base: PathBuf,
    pub settings: Settings,
}

impl Context {
    pub fn load_or_exit(config: Option<&Path>) -> Self {
        let base = or_exit(std::env::current_dir());
        let (path, explicit) = match config {
            Some(path) => (resolve(&base, path), true),
            None => (base.join(DEFAULT_CONFIG_FILE), false),
        };
        let settings = or_exit(Settings::load_or_default(&path, explicit));
        Self { base, settings }
    }

    pub fn resolve(&self, input: &Path) -> PathBuf {
        resolve(&self.base, input)
    }

    pub fn layout(&self) -> &Layout {
        &self.settings.layout
    }
}

/// Stderr logging. `RUST_LOG` wins when set; otherwise `warn`, raised to
/// `debug` for seedkit targets by `-v`.
pub fn init_logging(verbose: bool) {
    let default_directives = if verbose {
        "warn,seedkit=debug,seedkit_kernel=debug,seedkit_store=debug"
    } else {
        "warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directives));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn or_exit<T, E: Display>(result: Result<T, E>) -> T {
    result.unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    })
}

/// Load the shared document a command reads once (origin, source, ...).
pub fn load_document_or_exit(path: &Path) -> Document {
    or_exit(require_json_extension(path).and_then(|()| load_document(path)))
}

pub enum Targets {
    Single(PathBuf),
    Batch { dir: PathBuf, files: Vec<PathBuf> },
}

/// Exactly one of a target file or a target directory. In directory mode
/// `companion` is left out of the batch if it lives there.
pub fn targets_or_exit(
    ctx: &Context,
    file: Option<PathBuf>,
    dir: Option<PathBuf>,
    companion: Option<&Path>,
) -> Targets {
    match (file, dir) {
        (Some(file), None) => {
            let path = ctx.resolve(&file);
            or_exit(require_json_extension(&path));
            if !path.is_file() {
                eprintln!("error: {}", StoreError::NotFound(path.display().to_string()));
                std::process::exit(1);
            }
            Targets::Single(path)
        }
        (None, Some(dir)) => {
            let dir = ctx.resolve(&dir);
            let companion = companion.map(canonical_or_self);
            let files = or_exit(list_json_files(&dir))
                .into_iter()
                .filter(|file| companion.as_ref() != Some(&canonical_or_self(file)))
                .collect();
            Targets::Batch { dir, files }
        }
        _ => {
            eprintln!("error: provide either a target file or --target-dir, not both");
            std::process::exit(1);
        }
    }
}

fn canonical_or_self(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Written,
    Unchanged,
    DryRun,
    Skipped,
}

impl FileStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Written => "written",
            Self::Unchanged => "unchanged",
            Self::DryRun => "would write (dry run)",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug)]
pub struct Sample {
    pub header: String,
    pub items: Vec<String>,
    pub truncated: usize,
}

/// What happened to one target file.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub file: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    pub stats: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub notes: Vec<String>,
    #[serde(skip)]
    pub samples: Vec<Sample>,
}

impl FileReport {
    pub fn new(file: &Path, stats: Value) -> Self {
        Self {
            file: file.display().to_string(),
            status: FileStatus::Unchanged,
            written: None,
            backup: None,
            stats,
            error: None,
            notes: Vec::new(),
            samples: Vec::new(),
        }
    }

    pub fn skipped(file: &Path, error: &StoreError) -> Self {
        let mut report = Self::new(file, Value::Null);
        report.status = FileStatus::Skipped;
        report.error = Some(error.to_string());
        report
    }

    pub fn note(&mut self, line: impl Into<String>) {
        self.notes.push(line.into());
    }

    pub fn sample(&mut self, header: impl Into<String>, items: Vec<String>) {
        let (items, truncated) = sample_with_truncation(items, SAMPLE_LIMIT);
        if !items.is_empty() {
            self.samples.push(Sample {
                header: header.into(),
                items,
                truncated,
            });
        }
    }

    /// Record that `path` would be (or was) written.
    pub fn mark_written(&mut self, path: &Path, dry_run: bool) {
        self.written = Some(path.display().to_string());
        self.status = if dry_run {
            FileStatus::DryRun
        } else {
            FileStatus::Written
        };
    }
}

/// Run `process` over every target. A single target's error exits the
/// process; in a batch it becomes a skipped report and the loop continues.
pub fn process_targets<F>(targets: &Targets, mut process: F) -> Vec<FileReport>
where
    F: FnMut(&Path) -> Result<FileReport, StoreError>,
{
    match targets {
        Targets::Single(path) => vec![or_exit(process(path))],
        Targets::Batch { files, .. } => files
            .iter()
            .map(|file| {
                process(file).unwrap_or_else(|error| {
                    tracing::warn!(file = %file.display(), %error, "skipping file");
                    FileReport::skipped(file, &error)
                })
            })
            .collect(),
    }
}

/// Back up `path` (when it exists) and replace it with `document`.
pub fn write_document(
    ctx: &Context,
    path: &Path,
    document: &Document,
    dry_run: bool,
    report: &mut FileReport,
) -> Result<(), StoreError> {
    if !dry_run {
        if path.is_file() {
            let backup = ctx.layout().backup(path)?;
            report.backup = Some(backup.display().to_string());
        }
        save_document(path, document)?;
    }
    report.mark_written(path, dry_run);
    Ok(())
}

#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub written: usize,
    pub unchanged: usize,
    pub dry_run: usize,
    pub skipped: usize,
}

pub fn summarize(reports: &[FileReport]) -> BatchSummary {
    let mut summary = BatchSummary {
        processed: reports.len(),
        ..BatchSummary::default()
    };
    for report in reports {
        match report.status {
            FileStatus::Written => summary.written += 1,
            FileStatus::Unchanged => summary.unchanged += 1,
            FileStatus::DryRun => summary.dry_run += 1,
            FileStatus::Skipped => summary.skipped += 1,
        }
    }
    summary
}

/// Print per-file reports as a human summary or one JSON payload.
///
/// `header` lines describe the shared inputs; `extra` adds top-level keys
/// to the JSON payload.
pub fn print_reports(
    action: &str,
    header: &[(&str, String)],
    targets: &Targets,
    reports: &[FileReport],
    flags: RunFlags,
    extra: Map<String, Value>,
) {
    let summary = summarize(reports);

    if flags.json {
        let mut payload = json!({
            "action": action,
            "dry_run": flags.dry_run,
            "files": reports,
            "summary": summary,
        });
        if let Some(object) = payload.as_object_mut() {
            if let Targets::Batch { dir, .. } = targets {
                object.insert("target_dir".to_string(), json!(dir.display().to_string()));
            }
            object.extend(extra);
        }
        print_json(&payload);
        return;
    }

    println!("seedkit {action}{}", if flags.dry_run { " (dry run)" } else { "" });
    for (label, value) in header {
        println!("  {label}: {value}");
    }
    if let Targets::Batch { dir, .. } = targets {
        println!("  Directory: {}", dir.display());
    }
    for report in reports {
        println!();
        match &report.error {
            Some(error) => println!("{}: {} ({error})", report.file, report.status.label()),
            None => println!("{}: {}", report.file, report.status.label()),
        }
        for note in &report.notes {
            println!("  {note}");
        }
        for sample in &report.samples {
            print_sample_block(&sample.header, &sample.items, sample.truncated);
        }
        if let Some(backup) = &report.backup {
            println!("  Backup: {backup}");
        }
        if let Some(written) = &report.written
            && written != &report.file
        {
            println!("  Output: {written}");
        }
    }
    if matches!(targets, Targets::Batch { .. }) {
        println!();
        println!(
            "Summary: {} processed, {} written, {} unchanged, {} dry run, {} skipped",
            summary.processed, summary.written, summary.unchanged, summary.dry_run, summary.skipped
        );
    }
}

pub fn print_json(payload: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).expect("json serialization")
    );
}

pub fn sample_with_truncation<T>(items: Vec<T>, limit: usize) -> (Vec<T>, usize) {
    let total = items.len();
    let sample: Vec<T> = items.into_iter().take(limit).collect();
    let truncated = total.saturating_sub(sample.len());
    (sample, truncated)
}

pub fn print_sample_block(header: &str, items: &[String], truncated: usize) {
    if items.is_empty() {
        return;
    }

    println!("  {header} (showing up to {}):", items.len());
    for item in items {
        println!("    - {item}");
    }
    if truncated > 0 {
        println!("    - ... and {truncated} more");
    }
}
