//! JSON writers for per-file records and the master resume.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::errors::AppError;

/// Writes `value` as pretty JSON to `path` through a temp file in the same
/// directory, so readers never see a half-written file.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AppError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| AppError::io(&dir, e))?;

    let mut body = serde_json::to_vec_pretty(value).map_err(|e| AppError::json(path, e))?;
    body.push(b'\n');

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| AppError::io(&dir, e))?;
    tmp.write_all(&body).map_err(|e| AppError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| AppError::io(path, e))?;
    tmp.persist(path).map_err(|e| AppError::io(path, e.error))?;
    Ok(())
}

/// Output path for the record derived from `source`: `{output_dir}/{stem}.json`.
pub fn record_path(output_dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "resume".to_string());
    output_dir.join(format!("{stem}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_write_json_atomic_creates_dirs_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("master_resume.json");

        write_json_atomic(&path, &json!({"name": "old"})).unwrap();
        write_json_atomic(&path, &json!({"name": "Jane"})).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.ends_with("}\n"));
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, json!({"name": "Jane"}));

        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_record_path_uses_stem() {
        assert_eq!(
            record_path(Path::new("out"), Path::new("resumes/2023/jane.doe.docx")),
            PathBuf::from("out/jane.doe.json")
        );
    }
}
