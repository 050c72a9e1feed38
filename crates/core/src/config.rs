//! Configuration management for the concierge pipeline.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Environment variables
//! - Command-line flags
//! - Config files (.concierge/config.yaml)
//!
//! Pipeline thresholds (fuzzy floor, quality cutoff, token minimum) are
//! deliberately configuration rather than hard-coded constants so they can
//! be tuned without code changes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Main application configuration.
///
/// This struct holds all global configuration options that affect
/// behavior across commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .concierge/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// LLM provider for answer synthesis (e.g., "ollama", "openai")
    pub provider: String,

    /// Model identifier for answer synthesis
    pub model: String,

    /// Optional custom endpoint for the LLM provider
    pub endpoint: Option<String>,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Deterministic-stage and retrieval tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Embedding provider settings
    #[serde(default)]
    pub embedding: EmbeddingSettings,
}

/// Tuning knobs for the deterministic stages and retrieval.
///
/// Defaults follow the documented heuristics: a record with fewer than 3
/// tokens is low-information, fuzzy name matches need similarity >= 0.8,
/// records below quality 0.3 never reach retrieval, and retrieval returns
/// the top 5 candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum token count below which a record is low-information
    #[serde(rename = "minTokens", default = "default_min_tokens")]
    pub min_tokens: usize,

    /// Similarity floor for fuzzy name matches (0-1)
    #[serde(rename = "fuzzyFloor", default = "default_fuzzy_floor")]
    pub fuzzy_floor: f32,

    /// Quality score cutoff for the relevance filter (0-1)
    #[serde(rename = "qualityCutoff", default = "default_quality_cutoff")]
    pub quality_cutoff: f32,

    /// Number of candidates the retriever returns
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: usize,

    /// Request-level timeout for the single LLM call, in seconds
    #[serde(rename = "llmTimeoutSecs", default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// Sampling temperature for answer synthesis
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Token budget for the synthesized answer
    #[serde(rename = "maxAnswerTokens", default = "default_max_answer_tokens")]
    pub max_answer_tokens: u32,
}

fn default_min_tokens() -> usize {
    3
}

fn default_fuzzy_floor() -> f32 {
    0.8
}

fn default_quality_cutoff() -> f32 {
    0.3
}

fn default_top_k() -> usize {
    5
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_answer_tokens() -> u32 {
    512
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_tokens: default_min_tokens(),
            fuzzy_floor: default_fuzzy_floor(),
            quality_cutoff: default_quality_cutoff(),
            top_k: default_top_k(),
            llm_timeout_secs: default_llm_timeout_secs(),
            temperature: default_temperature(),
            max_answer_tokens: default_max_answer_tokens(),
        }
    }
}

impl PipelineConfig {
    /// LLM call deadline as a Duration.
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

/// Embedding provider settings for the retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Provider name ("trigram" for offline, "ollama" for semantic)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Embedding vector dimension
    pub dimensions: usize,

    /// Optional custom endpoint for HTTP providers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    pipeline: Option<PipelineConfig>,
    embedding: Option<EmbeddingSettings>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            endpoint: None,
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            pipeline: PipelineConfig::default(),
            embedding: EmbeddingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `CONCIERGE_WORKSPACE`: Override workspace path
    /// - `CONCIERGE_CONFIG`: Path to config file
    /// - `CONCIERGE_PROVIDER`: LLM provider
    /// - `CONCIERGE_MODEL`: Model identifier
    /// - `CONCIERGE_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        // Load from environment variables
        if let Ok(workspace) = std::env::var("CONCIERGE_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("CONCIERGE_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        // Validate workspace exists
        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        // Load from YAML config file if it exists
        let config_path = if let Some(ref cf) = config.config_file {
            cf.clone()
        } else {
            config.workspace.join(".concierge/config.yaml")
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("CONCIERGE_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("CONCIERGE_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("CONCIERGE_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(llm) = config_file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            if llm.endpoint.is_some() {
                result.endpoint = llm.endpoint;
            }
        }

        if let Some(pipeline) = config_file.pipeline {
            result.pipeline = pipeline;
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// This method merges command-line flags with the loaded configuration,
    /// giving precedence to CLI flags over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .concierge directory.
    pub fn concierge_dir(&self) -> PathBuf {
        self.workspace.join(".concierge")
    }

    /// Resolve the API key for a provider.
    ///
    /// `CONCIERGE_API_KEY` wins; otherwise the provider's conventional
    /// environment variable is consulted (OPENAI_API_KEY for "openai").
    /// Ollama needs no key.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match provider {
            "openai" => std::env::var("OPENAI_API_KEY").ok(),
            _ => None,
        }
    }

    /// Validate configuration for the active provider and thresholds.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["ollama", "openai"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        if self.provider == "openai" && self.resolve_api_key("openai").is_none() {
            return Err(AppError::Config(
                "OpenAI provider requires CONCIERGE_API_KEY or OPENAI_API_KEY".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.pipeline.fuzzy_floor) {
            return Err(AppError::Config(format!(
                "fuzzyFloor must be within 0.0-1.0, got {}",
                self.pipeline.fuzzy_floor
            )));
        }

        if !(0.0..=1.0).contains(&self.pipeline.quality_cutoff) {
            return Err(AppError::Config(format!(
                "qualityCutoff must be within 0.0-1.0, got {}",
                self.pipeline.quality_cutoff
            )));
        }

        if self.pipeline.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }

        Ok(())
    }
}
