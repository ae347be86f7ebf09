//! Structuring Call: one prompt-and-parse round trip per resume document.

pub mod prompts;

use std::path::Path;

use serde_json::{Map, Value};
use tracing::info;

use crate::errors::AppError;
use crate::extract::extract_text;
use crate::llm_client::{LlmClient, LlmError};
use crate::structuring::prompts::{extraction_prompt, extraction_system_prompt};

/// Asks the model to turn raw resume text into a JSON Resume object.
/// A reply that is valid JSON but not an object is a parse error.
pub async fn structure_text(text: &str, llm: &LlmClient) -> Result<Value, LlmError> {
    let system = extraction_system_prompt();
    let prompt = extraction_prompt(text);
    let object: Map<String, Value> = llm.call_json(&prompt, &system).await?;
    Ok(Value::Object(object))
}

/// Extracts the text of `path` and structures it.
pub async fn structure_document(path: &Path, llm: &LlmClient) -> Result<Value, AppError> {
    let text = extract_text(path)?;
    info!(
        "Structuring {} ({} chars) with {}",
        path.display(),
        text.chars().count(),
        llm.describe()
    );
    Ok(structure_text(&text, llm).await?)
}
