//! Structuring Call prompt templates.

use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_INVENTION_INSTRUCTION};

/// Longest resume text sent to the model, in characters.
pub const MAX_RESUME_CHARS: usize = 120_000;

pub const EXTRACTION_SYSTEM_ROLE: &str = "You are a careful information extraction assistant. \
    You will be given the full text of a resume. Convert it into a STRICT JSON object \
    following the provided JSON schema exactly (keys, nesting and arrays).";

pub const EXTRACTION_RULES: &str = "\
- Use ISO dates (YYYY-MM-DD) where possible; if only year/month is known, use YYYY-MM-01.
- Use \"present\" as endDate for a current position.
- For skills: group related keywords under a reasonable 'name' and list them in 'keywords'; set 'level' only if explicitly stated.
- For work: include concise bullet-style 'highlights' covering achievements, impact, scale and metrics.";

/// JSON Resume layout the model must fill in.
pub const SCHEMA_EXAMPLE: &str = r#"{
  "basics": {"name": "", "label": "", "email": "", "phone": "", "url": "", "summary": "",
    "location": {"address": "", "postalCode": "", "city": "", "countryCode": "", "region": ""},
    "profiles": [{"network": "", "username": "", "url": ""}]},
  "highlights": [],
  "work": [{"name": "", "position": "", "url": "", "startDate": "", "endDate": "", "summary": "", "highlights": []}],
  "education": [{"institution": "", "url": "", "area": "", "studyType": "", "startDate": "", "endDate": "", "score": "", "courses": []}],
  "skills": [{"name": "", "level": "", "keywords": []}],
  "projects": [{"name": "", "description": "", "url": "", "startDate": "", "endDate": "", "highlights": [], "keywords": []}],
  "certificates": [{"name": "", "issuer": "", "date": "", "url": ""}],
  "awards": [{"title": "", "awarder": "", "date": "", "summary": ""}],
  "publications": [{"name": "", "publisher": "", "releaseDate": "", "url": "", "summary": ""}],
  "volunteer": [{"organization": "", "position": "", "url": "", "startDate": "", "endDate": "", "summary": "", "highlights": []}],
  "languages": [{"language": "", "fluency": ""}],
  "interests": [{"name": "", "keywords": []}],
  "references": [{"name": "", "reference": ""}]
}"#;

pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"JSON schema (example; keep the exact structure and keys, values must reflect the resume):
{schema}

Resume text:
"""
{resume_text}
"""
"#;

pub fn extraction_system_prompt() -> String {
    format!("{EXTRACTION_SYSTEM_ROLE}\n{EXTRACTION_RULES}\n{NO_INVENTION_INSTRUCTION}\n{JSON_ONLY_SYSTEM}")
}

/// Fills the user prompt, truncating the resume text on a char boundary.
pub fn extraction_prompt(resume_text: &str) -> String {
    let text = match resume_text.char_indices().nth(MAX_RESUME_CHARS) {
        Some((cut, _)) => &resume_text[..cut],
        None => resume_text,
    };
    EXTRACTION_PROMPT_TEMPLATE
        .replace("{schema}", SCHEMA_EXAMPLE)
        .replace("{resume_text}", text)
}
