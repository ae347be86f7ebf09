use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

/// Supported source document formats. A `.docx` is authoritative over a
/// `.pdf` with the same base name in the same directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            _ => None,
        }
    }
}

/// Walks `root` recursively and returns one document per `(directory, stem)`,
/// preferring DOCX. The result is sorted by path.
pub fn find_resume_files(root: &Path) -> Vec<PathBuf> {
    let mut buckets: BTreeMap<(PathBuf, String), (DocumentKind, PathBuf)> = BTreeMap::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable path under {}: {e}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let Some(kind) = DocumentKind::from_path(&path) else {
            continue;
        };
        // Office lock files such as "~$resume.docx"
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.starts_with("~$") {
            continue;
        }
        let key = (
            path.parent().map(Path::to_path_buf).unwrap_or_default(),
            stem.to_string(),
        );
        match buckets.get(&key) {
            Some((existing, _)) if *existing >= kind => {}
            _ => {
                buckets.insert(key, (kind, path));
            }
        }
    }

    let files: Vec<PathBuf> = buckets.into_values().map(|(_, path)| path).collect();
    debug!("Found {} resume documents under {}", files.len(), root.display());
    files
}
