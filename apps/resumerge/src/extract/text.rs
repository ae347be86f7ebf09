use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::extract::locator::DocumentKind;
use crate::extract::ExtractionError;

const DOCX_BODY: &str = "word/document.xml";

/// Extracts plain text from a PDF or DOCX document.
pub fn extract_text(path: &Path) -> Result<String, ExtractionError> {
    let text = match DocumentKind::from_path(path) {
        Some(DocumentKind::Docx) => read_docx_text(path)?,
        Some(DocumentKind::Pdf) => read_pdf_text(path)?,
        None => return Err(ExtractionError::Unsupported(path.to_path_buf())),
    };
    if text.trim().is_empty() {
        return Err(ExtractionError::Empty(path.to_path_buf()));
    }
    debug!("Extracted {} chars from {}", text.len(), path.display());
    Ok(text)
}

fn read_pdf_text(path: &Path) -> Result<String, ExtractionError> {
    let raw = pdf_extract::extract_text(path).map_err(|e| ExtractionError::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(normalize_pdf_text(&raw))
}

fn read_docx_text(path: &Path) -> Result<String, ExtractionError> {
    let docx_err = |message: String| ExtractionError::Docx {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| docx_err(e.to_string()))?;
    let mut body = archive
        .by_name(DOCX_BODY)
        .map_err(|e| docx_err(format!("{DOCX_BODY}: {e}")))?;

    let mut xml = String::new();
    body.read_to_string(&mut xml)
        .map_err(|e| docx_err(e.to_string()))?;
    Ok(docx_xml_to_text(&xml))
}

/// Collapses horizontal whitespace runs and caps blank lines at one.
pub fn normalize_pdf_text(raw: &str) -> String {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static BLANKS: OnceLock<Regex> = OnceLock::new();
    let spaces = SPACES.get_or_init(|| Regex::new(r"[ \t]+").expect("valid regex"));
    let blanks = BLANKS.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let text = spaces.replace_all(raw, " ");
    blanks.replace_all(&text, "\n\n").trim().to_string()
}

fn docx_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)<w:t(?:\s[^>/]*)?>(.*?)</w:t>|<w:tab/>|<w:br\s*/>|<w:tc(?:\s[^>]*)?>|</w:tc>|</w:tr>|</w:p>",
        )
        .expect("valid regex")
    })
}

/// Converts a WordprocessingML body into plain text. Paragraphs become lines;
/// table rows become one line with cells joined by `" | "`.
pub fn docx_xml_to_text(xml: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut cell = String::new();
    let mut cells: Vec<String> = Vec::new();
    let mut in_cell = false;

    for caps in docx_token_re().captures_iter(xml) {
        let target = if in_cell { &mut cell } else { &mut line };
        if let Some(text) = caps.get(1) {
            target.push_str(&decode_entities(text.as_str()));
            continue;
        }
        match &caps[0] {
            "<w:tab/>" => target.push('\t'),
            "</w:p>" if in_cell => {
                if !cell.ends_with(' ') && !cell.is_empty() {
                    cell.push(' ');
                }
            }
            "</w:p>" => lines.push(std::mem::take(&mut line)),
            "</w:tc>" => {
                cells.push(cell.trim().to_string());
                cell.clear();
                in_cell = false;
            }
            "</w:tr>" => {
                let row: Vec<String> = std::mem::take(&mut cells)
                    .into_iter()
                    .filter(|c| !c.is_empty())
                    .collect();
                lines.push(row.join(" | "));
            }
            token if token.starts_with("<w:br") => target.push('\n'),
            _ => in_cell = true,
        }
    }
    lines.push(line);

    lines
        .iter()
        .flat_map(|l| l.lines())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(s: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);").expect("valid regex")
    });
    re.replace_all(s, |caps: &Captures| {
        let entity = &caps[1];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .map(|hex| u32::from_str_radix(hex, 16))
                .unwrap_or_else(|| entity[1..].parse())
                .ok()
                .and_then(char::from_u32),
        };
        decoded.map_or_else(|| caps[0].to_string(), String::from)
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BODY: &str = r#"<w:document><w:body>
        <w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>
        <w:p><w:r><w:t xml:space="preserve">Rust &amp; Go </w:t></w:r><w:r><w:t>engineer</w:t></w:r></w:p>
        <w:p></w:p>
        <w:tbl><w:tr>
            <w:tc><w:tcPr/><w:p><w:r><w:t>Acme</w:t></w:r></w:p></w:tc>
            <w:tc><w:p><w:r><w:t>2020 &#8211; present</w:t></w:r></w:p></w:tc>
        </w:tr></w:tbl>
    </w:body></w:document>"#;

    #[test]
    fn test_docx_xml_to_text() {
        assert_eq!(
            docx_xml_to_text(BODY),
            "Jane Doe\nRust & Go engineer\nAcme | 2020 \u{2013} present"
        );
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#x41;&#66; &bogus;"), "a <b> AB &bogus;");
    }

    #[test]
    fn test_normalize_pdf_text() {
        let raw = "Jane   Doe\t\tEngineer\n\n\n\n\nExperience  \n";
        assert_eq!(normalize_pdf_text(raw), "Jane Doe Engineer\n\nExperience");
    }

    #[test]
    fn test_extract_docx_from_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jane.docx");
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        zip.start_file(DOCX_BODY, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(BODY.as_bytes()).unwrap();
        zip.finish().unwrap();

        let text = extract_text(&path).unwrap();
        assert!(text.starts_with("Jane Doe"));
    }

    #[test]
    fn test_docx_without_body_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<x/>").unwrap();
        zip.finish().unwrap();

        assert!(matches!(
            extract_text(&path),
            Err(ExtractionError::Docx { .. })
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            extract_text(Path::new("resume.txt")),
            Err(ExtractionError::Unsupported(_))
        ));
    }
}
