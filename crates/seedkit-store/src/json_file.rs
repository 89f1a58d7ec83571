//! JSON document files.
//!
//! Reads validate the raw bytes before parsing. Writes go through a
//! temporary sibling file that is synced and renamed into place, so a
//! failed write never leaves a truncated document behind.

use crate::error::StoreError;
use seedkit_kernel::Document;
use serde_json::Value;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Reject paths that do not end in `.json`.
pub fn require_json_extension(path: &Path) -> Result<(), StoreError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(()),
        _ => Err(StoreError::NotJson(path.display().to_string())),
    }
}

/// Read and parse one JSON file.
pub fn read_json(path: impl AsRef<Path>) -> Result<Value, StoreError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(StoreError::NotFound(path.display().to_string()));
    }
    let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    validate_substrate_bytes(path, &bytes)?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Read a backend data document.
pub fn load_document(path: impl AsRef<Path>) -> Result<Document, StoreError> {
    let path = path.as_ref();
    let value = read_json(path)?;
    Document::from_value(value).map_err(|source| StoreError::Document {
        path: path.display().to_string(),
        source,
    })
}

/// Pretty-print with 2-space indentation and a trailing newline.
pub fn to_pretty_json(value: &Value) -> String {
    let mut text = serde_json::to_string_pretty(value).expect("json serialization");
    text.push('\n');
    text
}

/// Atomically replace `path` with the pretty-printed `value`.
pub fn write_json(path: impl AsRef<Path>, value: &Value) -> Result<(), StoreError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), StoreError> {
        let file = File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(to_pretty_json(value).as_bytes())
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        file.sync_all().map_err(|e| StoreError::io(&tmp_path, e))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::io(path, e)
    })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        let dir = File::open(parent).map_err(|e| StoreError::io(parent, e))?;
        dir.sync_all().map_err(|e| StoreError::io(parent, e))?;
    }
    tracing::info!(path = %path.display(), "wrote json file");
    Ok(())
}

pub fn save_document(path: impl AsRef<Path>, document: &Document) -> Result<(), StoreError> {
    write_json(path, &document.clone().into_value())
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

fn validate_substrate_bytes(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if bytes.contains(&0) {
        return Err(StoreError::Corrupt(format!(
            "{}: contains NUL byte(s)",
            path.display()
        )));
    }
    if std::str::from_utf8(bytes).is_err() {
        return Err(StoreError::Corrupt(format!(
            "{}: contains non-UTF-8 byte sequence(s)",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "seedkit-json-{prefix}-{}-{unique}.json",
            std::process::id()
        ))
    }

    #[test]
    fn read_json_rejects_nul_payload() {
        let path = temp_path("nul");
        fs::write(&path, b"{\"users\": []}\0").expect("fixture should write");

        match read_json(&path) {
            Err(StoreError::Corrupt(message)) => assert!(message.contains("contains NUL")),
            other => panic!("expected corrupt input error, got {other:?}"),
        }

        let _ = fs::remove_file(path);
    }

    #[test]
    fn read_json_rejects_non_utf8_payload() {
        let path = temp_path("non-utf8");
        fs::write(&path, [0xff, 0xfe, 0xfd]).expect("fixture should write");

        match read_json(&path) {
            Err(StoreError::Corrupt(message)) => assert!(message.contains("non-UTF-8")),
            other => panic!("expected corrupt input error, got {other:?}"),
        }

        let _ = fs::remove_file(path);
    }

    #[test]
    fn read_json_reports_parse_errors_with_path() {
        let path = temp_path("malformed");
        fs::write(&path, "{\"users\": [").expect("fixture should write");

        let err = read_json(&path).expect_err("malformed json must fail");
        assert!(matches!(err, StoreError::Parse { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_document_rejects_array_roots() {
        let path = temp_path("array-root");
        fs::write(&path, "[1, 2]").expect("fixture should write");

        let err = load_document(&path).expect_err("array root must fail");
        assert!(matches!(err, StoreError::Document { .. }));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_files_are_not_found() {
        let err = read_json(temp_path("absent")).expect_err("missing file must fail");
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(require_json_extension(Path::new("a/b.JSON")).is_ok());
        assert!(matches!(
            require_json_extension(Path::new("a/b.txt")),
            Err(StoreError::NotJson(_))
        ));
        assert!(require_json_extension(Path::new("a/json")).is_err());
    }

    #[test]
    fn write_json_replaces_file_with_pretty_output() {
        let path = temp_path("atomic-write");
        write_json(&path, &json!({"old": true})).expect("first write should succeed");
        write_json(&path, &json!({"users": [{"_id": "u1"}]})).expect("second write should succeed");

        let text = fs::read_to_string(&path).expect("file should exist");
        assert_eq!(
            text,
            "{\n  \"users\": [\n    {\n      \"_id\": \"u1\"\n    }\n  ]\n}\n"
        );

        let _ = fs::remove_file(path);
    }

    #[test]
    fn write_json_creates_parents_and_leaves_no_temp_files() {
        let dir = temp_path("nested-dir").with_extension("");
        let path = dir.join(".diff/task.diff.json");
        write_json(&path, &json!({"users": {"added": []}})).expect("write should succeed");

        let names: Vec<String> = fs::read_dir(path.parent().expect("parent"))
            .expect("diff dir should exist")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["task.diff.json".to_string()]);
        assert_eq!(
            read_json(&path).expect("file should parse"),
            json!({"users": {"added": []}})
        );

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn documents_keep_key_order_through_a_round_trip() {
        let path = temp_path("order");
        fs::write(&path, r#"{"zeta": [{"b": 1, "a": 2}], "alpha": 1}"#).expect("fixture");

        let document = load_document(&path).expect("document should load");
        save_document(&path, &document).expect("document should save");
        let text = fs::read_to_string(&path).expect("file should exist");
        let zeta = text.find("zeta").expect("zeta key");
        let alpha = text.find("alpha").expect("alpha key");
        assert!(zeta < alpha);
        assert!(text.find("\"b\"").expect("b") < text.find("\"a\"").expect("a"));

        let _ = fs::remove_file(path);
    }
}
