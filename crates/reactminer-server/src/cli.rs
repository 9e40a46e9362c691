//! Batch input loading and result writing for the command line.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use reactminer_extract::ExtractionResult;
use reactminer_runtime::BatchInput;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

/// Load segments from a file.
///
/// `.json` files hold a string or an array of strings. Anything else is read
/// as plain text with one segment per non-empty line.
pub fn read_input(path: &Path) -> anyhow::Result<BatchInput> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        return serde_json::from_str(&data).with_context(|| {
            format!(
                "{} must contain a string or an array of strings",
                path.display()
            )
        });
    }

    Ok(BatchInput::Many(
        data.lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect(),
    ))
}

/// Write results as JSON indented with four spaces.
pub fn write_results<W: Write>(writer: W, results: &[ExtractionResult]) -> anyhow::Result<()> {
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    results.serialize(&mut serializer)?;
    let mut writer = serializer.into_inner();
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write results to `path`, creating parent directories.
pub fn write_results_to_path(path: &Path, results: &[ExtractionResult]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_results(std::io::BufWriter::new(file), results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactminer_extract::{ReactionRecord, TextSegment};

    #[test]
    fn test_read_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segments.json");
        std::fs::write(&path, r#"["first segment", "second segment"]"#).unwrap();

        let input = read_input(&path).unwrap();
        assert_eq!(input.len(), 2);
    }

    #[test]
    fn test_read_json_single_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segment.JSON");
        std::fs::write(&path, r#""only one""#).unwrap();

        assert_eq!(read_input(&path).unwrap(), BatchInput::One("only one".into()));
    }

    #[test]
    fn test_read_text_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segments.txt");
        std::fs::write(&path, "line one\n\n   \nline two\n").unwrap();

        assert_eq!(
            read_input(&path).unwrap(),
            BatchInput::Many(vec!["line one".into(), "line two".into()])
        );
    }

    #[test]
    fn test_bad_json_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"texts": 1}"#).unwrap();

        let err = read_input(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_write_four_space_indent() {
        let record: ReactionRecord = [("Product", "Cu(OAc)2"), ("Yield", "85%")]
            .into_iter()
            .collect();
        let results = vec![ExtractionResult {
            text: TextSegment::new("Copper acetate was prepared."),
            reactions: vec![record],
        }];

        let mut buf = Vec::new();
        write_results(&mut buf, &results).unwrap();
        let out = String::from_utf8(buf).unwrap();

        assert!(out.starts_with("[\n    {\n        \"text\": \"Copper acetate was prepared.\""));
        assert!(out.contains("\"Product\": \"Cu(OAc)2\""));
        assert!(out.ends_with("]\n"));
    }

    #[test]
    fn test_write_to_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results").join("paper.json");
        write_results_to_path(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");
    }
}
