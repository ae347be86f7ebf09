use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::llm_client::ollama::DEFAULT_OLLAMA_HOST;
use crate::merge::fuzzy::DEFAULT_SIMILARITY_THRESHOLD;
use crate::merge::MergeOptions;

pub const MASTER_FILE_NAME: &str = "master_resume.json";

/// Which model backend the Structuring Call talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    OpenAi,
}

impl Provider {
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Ollama => "llama3.2",
            Provider::OpenAi => "gpt-4o-mini",
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" | "local-model" | "local" => Ok(Provider::Ollama),
            "openai" | "hosted-api" | "hosted" => Ok(Provider::OpenAi),
            other => bail!("Unknown provider '{other}' (expected 'ollama' or 'openai')"),
        }
    }
}

/// Application configuration loaded from environment variables (and `.env`).
/// Only the hosted provider has a required secret; everything else defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,
    pub model: String,
    pub ollama_host: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub master_output_path: PathBuf,
    pub merge_after_extraction: bool,
    pub similarity_threshold: f32,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match var("RESUMERGE_PROVIDER") {
            Some(raw) => raw.parse::<Provider>().context("RESUMERGE_PROVIDER is invalid")?,
            None => Provider::Ollama,
        };
        let output_dir = PathBuf::from(
            var("RESUMERGE_OUTPUT_DIR").unwrap_or_else(|| "./out_resume_json".to_string()),
        );
        let master_output_path = var("RESUMERGE_MASTER_OUTPUT")
            .map(PathBuf::from)
            .unwrap_or_else(|| output_dir.join(MASTER_FILE_NAME));
        let merge_after_extraction = match var("RESUMERGE_MERGE_AFTER_EXTRACTION") {
            Some(raw) => parse_bool(&raw)
                .context("RESUMERGE_MERGE_AFTER_EXTRACTION must be true or false")?,
            None => true,
        };
        let similarity_threshold = match var("RESUMERGE_SIMILARITY_THRESHOLD") {
            Some(raw) => raw
                .trim()
                .parse::<f32>()
                .context("RESUMERGE_SIMILARITY_THRESHOLD must be a number")?,
            None => DEFAULT_SIMILARITY_THRESHOLD,
        };

        let config = Config {
            provider,
            model: var("RESUMERGE_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            ollama_host: var("OLLAMA_HOST").unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL"),
            input_dir: PathBuf::from(
                var("RESUMERGE_INPUT_DIR").unwrap_or_else(|| "./resumes".to_string()),
            ),
            output_dir,
            master_output_path,
            merge_after_extraction,
            similarity_threshold,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Re-checks invariants after CLI overrides have been applied.
    pub fn validate(&self) -> Result<()> {
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            bail!(
                "Similarity threshold must be in (0, 1], got {}",
                self.similarity_threshold
            );
        }
        if self.model.trim().is_empty() {
            bail!("Model name must not be empty");
        }
        Ok(())
    }

    /// Points the per-file output somewhere else. A master path that was
    /// derived from the old output directory follows it.
    pub fn set_output_dir(&mut self, dir: PathBuf) {
        if self.master_output_path == self.output_dir.join(MASTER_FILE_NAME) {
            self.master_output_path = dir.join(MASTER_FILE_NAME);
        }
        self.output_dir = dir;
    }

    /// Switches provider; a model still at the old provider's default follows too.
    pub fn set_provider(&mut self, provider: Provider) {
        if self.model == self.provider.default_model() {
            self.model = provider.default_model().to_string();
        }
        self.provider = provider;
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            similarity_threshold: self.similarity_threshold,
        }
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("'{other}' is not a boolean"),
    }
}
