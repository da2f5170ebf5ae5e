/// Configuration system for sift
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::embedding::fastembed_manager::{DEFAULT_MODEL_NAME, resolve_model};
use crate::error::{ConfigError, SiftError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Commit history ingestion configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "all-MiniLM-L6-v2", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Never load a model; index and search by text only
    #[serde(default)]
    pub text_only: bool,
}

/// Commit history ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryConfig {
    /// Include a diff excerpt in each commit's indexed content
    #[serde(default = "default_include_diffs")]
    pub include_diffs: bool,

    /// Maximum diff excerpt size (in bytes)
    #[serde(default = "default_max_diff_bytes")]
    pub max_diff_bytes: usize,

    /// Maximum indexed content per commit (in bytes)
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: usize,

    /// Default commit limit per indexing run, 0 for unlimited
    #[serde(default)]
    pub max_commits: usize,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Default result limit
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Inline preview size requested from the store (in bytes)
    #[serde(default = "default_preview_bytes")]
    pub preview_bytes: usize,

    /// Size of the explicit preview fetched when nothing else is available
    #[serde(default = "default_fallback_preview_bytes")]
    pub fallback_preview_bytes: usize,
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

fn default_include_diffs() -> bool {
    true
}

fn default_max_diff_bytes() -> usize {
    8_000
}

fn default_max_content_bytes() -> usize {
    12_000
}

fn default_top_k() -> usize {
    10
}

fn default_preview_bytes() -> usize {
    2048
}

fn default_fallback_preview_bytes() -> usize {
    4096
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            text_only: false,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            include_diffs: default_include_diffs(),
            max_diff_bytes: default_max_diff_bytes(),
            max_content_bytes: default_max_content_bytes(),
            max_commits: 0,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            preview_bytes: default_preview_bytes(),
            fallback_preview_bytes: default_fallback_preview_bytes(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> SiftError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, SiftError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, SiftError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::debug!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), SiftError> {
        if !self.embedding.text_only {
            resolve_model(&self.embedding.model_name)
                .map_err(|e| invalid("embedding.model_name", e.to_string()))?;
        }

        if self.history.include_diffs && self.history.max_diff_bytes == 0 {
            return Err(invalid("history.max_diff_bytes", "must be greater than 0"));
        }

        if self.history.max_content_bytes == 0 {
            return Err(invalid("history.max_content_bytes", "must be greater than 0"));
        }

        if self.search.top_k == 0 {
            return Err(invalid("search.top_k", "must be greater than 0"));
        }

        if self.search.preview_bytes == 0 {
            return Err(invalid("search.preview_bytes", "must be greater than 0"));
        }

        if self.search.fallback_preview_bytes == 0 {
            return Err(invalid(
                "search.fallback_preview_bytes",
                "must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; unparsable values are ignored
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("SIFT_MODEL") {
            self.embedding.model_name = model;
        }

        if let Some(top_k) = lookup("SIFT_TOP_K")
            && let Ok(value) = top_k.trim().parse()
        {
            self.search.top_k = value;
        }

        if let Some(text_only) = lookup("SIFT_TEXT_ONLY")
            && let Some(value) = parse_flag(&text_only)
        {
            self.embedding.text_only = value;
        }

        if let Some(max_diff) = lookup("SIFT_MAX_DIFF_BYTES")
            && let Ok(value) = max_diff.trim().parse()
        {
            self.history.max_diff_bytes = value;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, SiftError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests;
