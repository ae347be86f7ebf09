//! Drives the two subcommands: extract (locate, structure, write) and merge
//! (load, fold, write master).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::errors::AppError;
use crate::extract::find_resume_files;
use crate::llm_client::LlmClient;
use crate::merge::{self, MergeOptions, MergeOutcome, MergeReport, SkippedRecord, SourceDocument};
use crate::output::{record_path, write_json_atomic};
use crate::structuring::structure_document;

/// What `run_extract` did, file by file.
#[derive(Debug, Default)]
pub struct ExtractSummary {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    pub merge: Option<MergeOutcome>,
}

/// Structures every resume under `config.input_dir`, one call at a time.
/// A failing file is logged and skipped; the batch continues.
pub async fn run_extract(config: &Config, llm: &LlmClient) -> Result<ExtractSummary, AppError> {
    if !config.input_dir.is_dir() {
        return Err(AppError::Config(format!(
            "input directory {} does not exist",
            config.input_dir.display()
        )));
    }

    let files = find_resume_files(&config.input_dir);
    info!(
        "Found {} resume(s) under {}",
        files.len(),
        config.input_dir.display()
    );

    let mut summary = ExtractSummary::default();
    let mut sources = Vec::new();

    for (i, path) in files.iter().enumerate() {
        info!("[{}/{}] {}", i + 1, files.len(), path.display());

        let value = match structure_document(path, llm).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to process {}: {e}", path.display());
                summary.failed.push((path.clone(), e.to_string()));
                continue;
            }
        };

        if let Err(e) = merge::validate(&value) {
            warn!("{} produced a record the merge will skip: {e}", path.display());
        }

        let out = record_path(&config.output_dir, path);
        if let Err(e) = write_json_atomic(&out, &value) {
            warn!("Failed to write {}: {e}", out.display());
            summary.failed.push((path.clone(), e.to_string()));
            continue;
        }
        info!("Wrote {}", out.display());

        sources.push(SourceDocument {
            label: source_label(&config.input_dir, path),
            value,
        });
        summary.written.push(out);
    }

    info!(
        "Extraction finished: {} written, {} failed",
        summary.written.len(),
        summary.failed.len()
    );

    if summary.written.is_empty() {
        return Err(AppError::NoRecords(config.input_dir.clone()));
    }

    if config.merge_after_extraction {
        let outcome = merge_and_write(
            sources,
            Vec::new(),
            &config.input_dir,
            &config.master_output_path,
            &config.merge_options(),
        )?;
        summary.merge = Some(outcome);
    }

    Ok(summary)
}

/// Merges every per-resume `*.json` under `dir` into `master_path`.
pub fn run_merge(
    dir: &Path,
    master_path: &Path,
    opts: &MergeOptions,
) -> Result<MergeOutcome, AppError> {
    if !dir.is_dir() {
        return Err(AppError::Config(format!(
            "record directory {} does not exist",
            dir.display()
        )));
    }
    let (sources, load_failures) = load_sources(dir, master_path);
    merge_and_write(sources, load_failures, dir, master_path, opts)
}

fn merge_and_write(
    sources: Vec<SourceDocument>,
    load_failures: Vec<SkippedRecord>,
    origin: &Path,
    master_path: &Path,
    opts: &MergeOptions,
) -> Result<MergeOutcome, AppError> {
    let mut outcome = merge::merge_records(sources, opts)?;
    let mut skipped = load_failures;
    skipped.append(&mut outcome.report.skipped);
    outcome.report.skipped = skipped;
    log_report(&outcome.report);

    if outcome.report.merged.is_empty() {
        return Err(AppError::NoRecords(origin.to_path_buf()));
    }

    write_json_atomic(master_path, &outcome.master)?;
    info!("Master resume written to {}", master_path.display());
    Ok(outcome)
}

fn log_report(report: &MergeReport) {
    info!(
        "Merge summary: {} merged, {} skipped",
        report.merged.len(),
        report.skipped.len()
    );
    for skipped in &report.skipped {
        warn!("Skipped {}: {}", skipped.source, skipped.reason);
    }
}

/// Reads every candidate record under `dir`. Files that cannot be read or
/// parsed are returned as skips rather than errors.
pub fn load_sources(dir: &Path, master_path: &Path) -> (Vec<SourceDocument>, Vec<SkippedRecord>) {
    let mut sources = Vec::new();
    let mut failures = Vec::new();

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!("Skipping unreadable path under {}: {e}", dir.display());
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_record_file(p) && p != master_path)
        .collect();
    paths.sort();

    for path in paths {
        let label = source_label(dir, &path);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                failures.push(SkippedRecord {
                    source: label,
                    reason: AppError::io(&path, e).to_string(),
                });
                continue;
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => sources.push(SourceDocument { label, value }),
            Err(e) => failures.push(SkippedRecord {
                source: label,
                reason: AppError::json(&path, e).to_string(),
            }),
        }
    }

    (sources, failures)
}

/// `*.json`, excluding previously merged outputs (`master*.json`, `merged*.json`).
fn is_record_file(path: &Path) -> bool {
    static EXCLUDED: OnceLock<Regex> = OnceLock::new();
    let excluded =
        EXCLUDED.get_or_init(|| Regex::new(r"(?i)^(master|merged).*\.json$").expect("valid regex"));

    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.to_ascii_lowercase().ends_with(".json") && !excluded.is_match(name)
}

fn source_label(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::tests::MockBackend;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Arc;

    fn write(path: &Path, body: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, body).unwrap();
    }

    fn write_docx(path: &Path, paragraphs: &[&str]) {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
            .collect();
        let xml = format!("<w:document><w:body>{body}</w:body></w:document>");
        let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    fn test_config(input: &Path, output: &Path, merge: bool) -> Config {
        let env: HashMap<&str, String> = HashMap::from([
            ("RESUMERGE_INPUT_DIR", input.display().to_string()),
            ("RESUMERGE_OUTPUT_DIR", output.display().to_string()),
            ("RESUMERGE_MERGE_AFTER_EXTRACTION", merge.to_string()),
        ]);
        Config::from_lookup(|key| env.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_is_record_file() {
        assert!(is_record_file(Path::new("out/jane.json")));
        assert!(is_record_file(Path::new("out/Jane.JSON")));
        assert!(is_record_file(Path::new("out/remastered.json")));
        assert!(!is_record_file(Path::new("out/master_resume.json")));
        assert!(!is_record_file(Path::new("out/Merged-2024.json")));
        assert!(!is_record_file(Path::new("out/jane.pdf")));
    }

    #[test]
    fn test_run_merge_writes_master_and_reports_skips() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("a.json"),
            r#"{"name": "Jane Doe", "skills": ["Rust", "SQL"]}"#,
        );
        write(
            &root.join("nested/b.json"),
            r#"{"name": "Jane Doe", "skills": ["rust", "Go"], "highlights": "Led a team of 5"}"#,
        );
        write(&root.join("broken.json"), "{ not json");
        write(&root.join("list.json"), "[1, 2]");
        write(&root.join("MASTER_resume.json"), r#"{"name": "stale"}"#);

        let master_path = root.join("master_resume.json");
        let outcome = run_merge(root, &master_path, &MergeOptions::default()).unwrap();

        assert_eq!(outcome.report.merged.len(), 2);
        assert!(outcome.report.merged.contains(&"nested/b.json".to_string()));
        let skipped: Vec<&str> = outcome
            .report
            .skipped
            .iter()
            .map(|s| s.source.as_str())
            .collect();
        assert_eq!(skipped, vec!["broken.json", "list.json"]);

        let written: Value = serde_json::from_str(&fs::read_to_string(&master_path).unwrap()).unwrap();
        assert_eq!(written["skills"], json!(["Go", "Rust", "SQL"]));
        assert_eq!(written["highlights"], json!(["Led a team of 5"]));
    }

    #[test]
    fn test_run_merge_is_idempotent_over_its_output() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("a.json"),
            r#"{"name": "Jane", "work": [{"name": "Acme", "position": "SRE", "startDate": "2021-03", "endDate": "present", "highlights": ["On-call lead"]}]}"#,
        );
        let first_path = root.join("master_resume.json");
        let first = run_merge(root, &first_path, &MergeOptions::default()).unwrap();

        let replay = tempfile::tempdir().unwrap();
        fs::copy(&first_path, replay.path().join("previous.json")).unwrap();
        let second = run_merge(
            replay.path(),
            &replay.path().join("master_resume.json"),
            &MergeOptions::default(),
        )
        .unwrap();

        assert_eq!(first.master, second.master);
    }

    #[test]
    fn test_run_merge_with_nothing_valid_fails() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("bad.json"), "42");
        let master_path = dir.path().join("master_resume.json");

        let result = run_merge(dir.path(), &master_path, &MergeOptions::default());
        assert!(matches!(result, Err(AppError::NoRecords(_))));
        assert!(!master_path.exists());
    }

    #[test]
    fn test_run_merge_missing_dir() {
        let result = run_merge(
            Path::new("/definitely/not/here"),
            Path::new("/tmp/master.json"),
            &MergeOptions::default(),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_run_extract_writes_records_and_master() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_docx(&input.path().join("jane.docx"), &["Jane Doe", "Rust engineer"]);
        write(&input.path().join("jane.pdf"), "%PDF-1.4 shadowed by the docx");
        write(&input.path().join("empty.docx"), "not a zip archive");

        let backend = Arc::new(MockBackend::new(
            r#"{"basics": {"name": "Jane Doe"}, "skills": [{"name": "Languages", "keywords": ["Rust"]}]}"#,
        ));
        let llm = LlmClient::new(backend.clone());
        let config = test_config(input.path(), output.path(), true);

        let summary = run_extract(&config, &llm).await.unwrap();

        assert_eq!(summary.written, vec![output.path().join("jane.json")]);
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.failed[0].0.ends_with("empty.docx"));
        assert_eq!(backend.seen.lock().unwrap().len(), 1);

        let outcome = summary.merge.unwrap();
        assert_eq!(outcome.master.name, "Jane Doe");
        assert_eq!(outcome.master.skills, vec!["Languages", "Rust"]);
        assert!(output.path().join("master_resume.json").exists());
    }

    #[tokio::test]
    async fn test_run_extract_without_merge() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_docx(&input.path().join("cv.docx"), &["John Roe"]);

        let llm = LlmClient::new(Arc::new(MockBackend::new(r#"{"name": "John Roe"}"#)));
        let config = test_config(input.path(), output.path(), false);

        let summary = run_extract(&config, &llm).await.unwrap();
        assert!(summary.merge.is_none());
        assert!(output.path().join("cv.json").exists());
        assert!(!output.path().join("master_resume.json").exists());
    }

    #[tokio::test]
    async fn test_run_extract_with_nothing_written_fails() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let llm = LlmClient::new(Arc::new(MockBackend::new(r#"{"name": "Unused"}"#)));
        let config = test_config(input.path(), output.path(), false);

        let result = run_extract(&config, &llm).await;
        assert!(matches!(result, Err(AppError::NoRecords(_))));
    }

    #[tokio::test]
    async fn test_run_extract_write_failure_does_not_abort_batch() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_docx(&input.path().join("a.docx"), &["Jane Doe"]);
        write_docx(&input.path().join("b.docx"), &["Jane Doe"]);
        // A directory squatting on the record path makes the rename fail.
        fs::create_dir_all(output.path().join("a.json").join("blocker")).unwrap();

        let llm = LlmClient::new(Arc::new(MockBackend::new(r#"{"name": "Jane Doe"}"#)));
        let config = test_config(input.path(), output.path(), true);

        let summary = run_extract(&config, &llm).await.unwrap();
        assert_eq!(summary.written, vec![output.path().join("b.json")]);
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.failed[0].0.ends_with("a.docx"));
        assert_eq!(summary.merge.unwrap().report.merged, vec!["b.docx"]);
    }
}
