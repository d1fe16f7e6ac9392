//! Configuration loading, validation, and management for SlashGPT.
//!
//! Loads configuration from `./slashgpt.toml` (or an explicit path), after
//! reading `.env` into the process environment. Environment variables
//! override file values. Credentials are checked separately with
//! [`AppConfig::require_credentials`] so tools that never call the APIs
//! (like listing personas) work without keys.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE: &str = "slashgpt.toml";

/// The root configuration structure.
///
/// Maps directly to `slashgpt.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion and embedding API
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Pinecone credentials
    #[serde(default)]
    pub pinecone: PineconeConfig,

    /// Which vector index backend to use
    #[serde(default)]
    pub index: IndexConfig,

    /// Retrieval-augmentation settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_embedding_model() -> String {
    "text-embedding-ada-002".into()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            embedding_model: default_embedding_model(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct PineconeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Pinecone environment, e.g. "us-west1-gcp"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Override for the controller endpoint
    /// (default `https://controller.<environment>.pinecone.io`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_url: Option<String>,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl std::fmt::Debug for PineconeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeConfig")
            .field("api_key", &redact(&self.api_key))
            .field("environment", &self.environment)
            .field("controller_url", &self.controller_url)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
    #[default]
    Pinecone,
    /// JSON index files under `index.local_dir`
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub backend: IndexBackend,

    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("indexes")
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            local_dir: default_local_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// BPE encoding of the session's model
    #[default]
    Tiktoken,
    /// ~4 characters per token
    Heuristic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Token budget for the reference block plus the query
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Number of matches requested from the index
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub tokenizer: TokenizerKind,
}

fn default_token_budget() -> usize {
    4096 - 500
}
fn default_top_k() -> usize {
    100
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            top_k: default_top_k(),
            tokenizer: TokenizerKind::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory of persona manifests
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: PathBuf,

    /// Directory transcripts are written under
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_prompts_dir() -> PathBuf {
    PathBuf::from("prompts")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            prompts_dir: default_prompts_dir(),
            output_dir: default_output_dir(),
        }
    }
}

impl AppConfig {
    /// Load configuration: `.env`, then the config file, then environment
    /// overrides.
    ///
    /// With no explicit path, `./slashgpt.toml` is used if it exists.
    /// Recognized variables:
    /// - `OPENAI_API_KEY`, `OPENAI_API_MODEL`, `OPENAI_TEMPERATURE`
    /// - `PINECONE_API_KEY`, `PINECONE_ENVIRONMENT`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(env_file) = dotenv::dotenv() {
            tracing::debug!(path = %env_file.display(), "Loaded .env");
        }

        let path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(model) = non_empty("OPENAI_API_MODEL") {
            self.openai.model = model;
        }
        if let Some(temperature) = non_empty("OPENAI_TEMPERATURE") {
            self.openai.temperature = temperature.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "OPENAI_TEMPERATURE must be a number, got '{temperature}'"
                ))
            })?;
        }
        if let Some(key) = non_empty("PINECONE_API_KEY") {
            self.pinecone.api_key = Some(key);
        }
        if let Some(environment) = non_empty("PINECONE_ENVIRONMENT") {
            self.pinecone.environment = Some(environment);
        }
        Ok(())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.openai.temperature) {
            return Err(ConfigError::ValidationError(
                "openai.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check that every credential needed to chat is present.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.openai.api_key.is_none() {
            return Err(ConfigError::Missing("OPENAI_API_KEY"));
        }
        if self.index.backend == IndexBackend::Pinecone {
            if self.pinecone.api_key.is_none() {
                return Err(ConfigError::Missing("PINECONE_API_KEY"));
            }
            if self.pinecone.environment.is_none() {
                return Err(ConfigError::Missing("PINECONE_ENVIRONMENT"));
            }
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("{0} environment variable is missing from .env")]
    Missing(&'static str),
}
