
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::DEFAULT_EMBEDDING_DIMENSION;
use crate::segmenter::DEFAULT_GROUP_SIZE;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Connection settings for the embedding service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
    pub dimension: u32,
}

impl Default for EmbeddingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "all-minilm:latest".to_string(),
            batch_size: 16,
            dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

/// Settings for the external answering service. The bearer credential is
/// never stored in the config file; only the name of the environment
/// variable holding it is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OracleConfig {
    pub api_url: String,
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

impl Default for OracleConfig {
    #[inline]
    fn default() -> Self {
        Self {
            api_url: "https://api.deepseek.com/v1/answer".to_string(),
            api_key_env: "DEEPSEEK_API_KEY".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
}

impl Default for FetcherConfig {
    #[inline]
    fn default() -> Self {
        Self {
            user_agent: "urlqa/0.1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_seconds: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    /// Number of sentences grouped into one chunk.
    pub group_size: usize,
    pub fetch_timeout_seconds: u64,
    pub answer_timeout_seconds: u64,
}

impl Default for PipelineSettings {
    #[inline]
    fn default() -> Self {
        Self {
            group_size: DEFAULT_GROUP_SIZE,
            fetch_timeout_seconds: 30,
            answer_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidDimension(u32),
    #[error("Invalid sentence group size: {0} (must be at least 1)")]
    InvalidGroupSize(usize),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid oracle key environment variable name (cannot be empty)")]
    InvalidKeyEnv,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load the config from `config.toml` under `config_dir`, falling back
    /// to defaults when no file exists yet.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                embedding: EmbeddingConfig::default(),
                oracle: OracleConfig::default(),
                fetcher: FetcherConfig::default(),
                pipeline: PipelineSettings::default(),
                base_dir: config_dir.as_ref().to_path_buf(),
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        self.oracle.validate()?;

        if self.pipeline.group_size == 0 {
            return Err(ConfigError::InvalidGroupSize(self.pipeline.group_size));
        }
        for timeout in [
            self.fetcher.timeout_seconds,
            self.pipeline.fetch_timeout_seconds,
            self.pipeline.answer_timeout_seconds,
        ] {
            if !(1..=600).contains(&timeout) {
                return Err(ConfigError::InvalidTimeout(timeout));
            }
        }

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    /// Root directory for the durable object store.
    #[inline]
    pub fn store_path(&self) -> PathBuf {
        self.base_dir.join("store")
    }

    /// Directory for the QA-pair cache.
    #[inline]
    pub fn cache_path(&self) -> PathBuf {
        self.base_dir.join("cache")
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        self.endpoint()?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.dimension) {
            return Err(ConfigError::InvalidDimension(self.dimension));
        }

        Ok(())
    }

    /// Base URL of the embedding service.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl OracleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.api_url).map_err(|_| ConfigError::InvalidUrl(self.api_url.clone()))?;

        if self.api_key_env.trim().is_empty() {
            return Err(ConfigError::InvalidKeyEnv);
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }
}
