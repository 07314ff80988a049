// src/config.rs

use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,
    #[error("max_total_length must be greater than zero when set")]
    ZeroCap,
    #[error("summarizer min_length ({min}) exceeds max_length ({max})")]
    LengthBounds { min: usize, max: usize },
    #[error("invalid tax_id_pattern: {0}")]
    TaxIdPattern(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub summarizer: SummarizerSection,
    #[serde(default)]
    pub ocr: OcrSection,
    #[serde(default)]
    pub report: ReportSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Only the first `max_total_length` characters are summarized when set.
    #[serde(default)]
    pub max_total_length: Option<usize>,
    #[serde(default = "default_min_chunk_length")]
    pub min_chunk_length: usize,
    #[serde(default = "default_valid_tax_rates")]
    pub valid_tax_rates: Vec<String>,
    #[serde(default = "default_tax_id_pattern")]
    pub tax_id_pattern: String,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_total_length: None,
            min_chunk_length: default_min_chunk_length(),
            valid_tax_rates: default_valid_tax_rates(),
            tax_id_pattern: default_tax_id_pattern(),
        }
    }
}

fn default_chunk_size() -> usize {
    400
}

fn default_min_chunk_length() -> usize {
    30
}

fn default_valid_tax_rates() -> Vec<String> {
    ["0%", "5%", "12%", "18%", "28%"]
        .iter()
        .map(|r| r.to_string())
        .collect()
}

fn default_tax_id_pattern() -> String {
    r"\b[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]\b".to_string()
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerBackend {
    #[default]
    HuggingFace,
    Ollama,
    Remote,
    Disabled,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerSection {
    #[serde(default)]
    pub backend: SummarizerBackend,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_huggingface")]
    pub huggingface: EndpointConfig,
    #[serde(default = "default_ollama")]
    pub ollama: EndpointConfig,
    #[serde(default = "default_remote")]
    pub remote: EndpointConfig,
}

impl Default for SummarizerSection {
    fn default() -> Self {
        Self {
            backend: SummarizerBackend::default(),
            max_length: default_max_length(),
            min_length: default_min_length(),
            huggingface: default_huggingface(),
            ollama: default_ollama(),
            remote: default_remote(),
        }
    }
}

fn default_max_length() -> usize {
    250
}

fn default_min_length() -> usize {
    30
}

/// Where a summarization model is hosted. The key itself never lives in the
/// config file, only the name of the environment variable holding it.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

fn default_huggingface() -> EndpointConfig {
    EndpointConfig {
        base_url: "https://api-inference.huggingface.co".to_string(),
        model: "google/flan-t5-small".to_string(),
        api_key_env: Some("HF_API_TOKEN".to_string()),
    }
}

fn default_ollama() -> EndpointConfig {
    EndpointConfig {
        base_url: "http://localhost:11434/v1".to_string(),
        model: "qwen3:8b".to_string(),
        api_key_env: None,
    }
}

fn default_remote() -> EndpointConfig {
    EndpointConfig {
        base_url: "https://api.openai.com/v1".to_string(),
        model: "gpt-4o-mini".to_string(),
        api_key_env: Some("LLM_API_KEY".to_string()),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrSection {
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: String,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for OcrSection {
    fn default() -> Self {
        Self {
            tesseract_path: default_tesseract_path(),
            language: default_language(),
        }
    }
}

fn default_tesseract_path() -> String {
    "tesseract".to_string()
}

fn default_language() -> String {
    "eng".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportSection {
    #[serde(default = "default_report_filename")]
    pub filename: String,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            filename: default_report_filename(),
        }
    }
}

fn default_report_filename() -> String {
    "BillCheck_AI_Summary.pdf".to_string()
}

pub const DEFAULT_CONFIG_PATH: &str = ".config/billcheck.toml";

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Like [`Config::load`], but a missing file means "all defaults".
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// A path given on the command line must exist; without one the default
    /// location is tried and may be absent.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        match explicit {
            Some(path) => Self::load(path)
                .map_err(|e| format!("cannot load config {}: {e}", path.display()).into()),
            None => Self::load_or_default(DEFAULT_CONFIG_PATH),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.pipeline.max_total_length == Some(0) {
            return Err(ConfigError::ZeroCap);
        }
        if self.summarizer.min_length > self.summarizer.max_length {
            return Err(ConfigError::LengthBounds {
                min: self.summarizer.min_length,
                max: self.summarizer.max_length,
            });
        }
        Ok(())
    }
}
