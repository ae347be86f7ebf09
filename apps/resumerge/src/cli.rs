use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::{Config, Provider};

/// Top-level CLI parser for the `resumerge` binary. Flags override the
/// environment / `.env` configuration.
#[derive(Debug, Parser)]
#[command(
    name = "resumerge",
    version,
    about = "Turn PDF/DOCX resumes into JSON and merge them into one master resume"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Fuzzy dedupe threshold in (0, 1]
    #[arg(long, global = true)]
    pub threshold: Option<f32>,

    /// Where to write the merged master resume
    #[arg(long, global = true)]
    pub master: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract text from every resume, structure it with the model, and write one JSON per file
    Extract {
        /// Directory scanned recursively for .pdf/.docx files
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory for the per-file JSON records
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Model backend: ollama (local) or openai (hosted)
        #[arg(long)]
        provider: Option<String>,

        /// Model name, e.g. llama3.2 or gpt-4o-mini
        #[arg(long)]
        model: Option<String>,

        /// Ollama base URL
        #[arg(long)]
        ollama_host: Option<String>,

        /// Skip the merge step after extraction
        #[arg(long)]
        no_merge: bool,
    },

    /// Merge every per-resume *.json in a directory into the master resume
    Merge {
        /// Directory holding the per-file records (defaults to the output dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Applies flag overrides on top of `config` and re-validates it.
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        match &self.command {
            Commands::Extract {
                input,
                output,
                provider,
                model,
                ollama_host,
                no_merge,
            } => {
                if let Some(input) = input {
                    config.input_dir = input.clone();
                }
                if let Some(output) = output {
                    config.set_output_dir(output.clone());
                }
                if let Some(provider) = provider {
                    config.set_provider(provider.parse::<Provider>()?);
                }
                if let Some(model) = model {
                    config.model = model.clone();
                }
                if let Some(host) = ollama_host {
                    config.ollama_host = host.clone();
                }
                if *no_merge {
                    config.merge_after_extraction = false;
                }
            }
            Commands::Merge { dir } => {
                if let Some(dir) = dir {
                    config.set_output_dir(dir.clone());
                }
            }
        }
        if let Some(threshold) = self.threshold {
            config.similarity_threshold = threshold;
        }
        if let Some(master) = &self.master {
            config.master_output_path = master.clone();
        }
        config.validate()
    }
}
