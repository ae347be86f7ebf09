//! Document Locator & Extractor: finds resumes on disk and pulls plain text out of them.

pub mod locator;
pub mod text;

use std::path::PathBuf;

use thiserror::Error;

pub use locator::find_resume_files;
pub use text::extract_text;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF extraction failed for {path}: {message}")]
    Pdf { path: PathBuf, message: String },

    #[error("DOCX extraction failed for {path}: {message}")]
    Docx { path: PathBuf, message: String },

    #[error("Unsupported file type: {0}")]
    Unsupported(PathBuf),

    #[error("No text extracted from {0}")]
    Empty(PathBuf),
}
