use crate::rag::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Environment variable consulted when `embedding.api_key` is empty.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable overriding `environment`.
pub const ENVIRONMENT_ENV: &str = "AERORAG_ENV";

/// Process configuration for the retrieval core.
///
/// Every section has defaults, so a YAML file only needs the keys it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub environment: Environment,
}

/// Deployment environment. Only front ends act on it; the core never does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "staging" => Some(Self::Staging),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        };
        f.write_str(name)
    }
}

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Remote OpenAI-compatible embeddings API.
    #[default]
    OpenAi,
    /// Deterministic hash-seeded vectors for offline use.
    Local,
}

/// Configuration for the embedding provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Must match the dimension of every vector already stored in the collection.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

// Hand-written so the credential never ends up in logs.
impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimension() -> usize {
    1536
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            api_key: String::new(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            base_url: default_base_url(),
        }
    }
}

/// Vector index storage mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum StorageMode {
    /// Embedded LanceDB index persisted under `path` (default)
    Embedded { path: String },
    /// Process-local index, gone when the process exits
    Memory,
}

impl Default for StorageMode {
    fn default() -> Self {
        Self::Embedded {
            path: "./data/aerorag_vectordb".to_string(),
        }
    }
}

/// Storage configuration for the reference collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub storage_mode: StorageMode,
    #[serde(default = "default_collection_name")]
    pub collection_name: String,
}

fn default_collection_name() -> String {
    "wing_aerodynamic_data".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_mode: StorageMode::default(),
            collection_name: default_collection_name(),
        }
    }
}

/// Retrieval tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Minimum similarity a match needs to be returned.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    /// Result limit used when the caller does not pass one.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub metric: DistanceMetric,
}

fn default_similarity_threshold() -> f32 {
    0.3
}

fn default_top_k() -> usize {
    5
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            top_k: default_top_k(),
            metric: DistanceMetric::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file, then apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from `config.yaml` if it exists, otherwise use defaults.
    pub fn load_or_default() -> Self {
        Self::load("config.yaml").unwrap_or_else(|_| {
            let mut config = Self::default();
            config.apply_env_overrides();
            config
        })
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.embedding.api_key.is_empty() {
            if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.is_empty()) {
                self.embedding.api_key = key;
            }
        }
        if let Some(env) = lookup(ENVIRONMENT_ENV).as_deref().and_then(Environment::parse) {
            self.environment = env;
        }
    }

    /// Check the configuration before any component is built.
    ///
    /// A remote provider without a credential is rejected here rather than on
    /// the first embedding call.
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(ConfigError::Validation(
                "embedding.dimension must be positive".to_string(),
            ));
        }
        if self.rag.top_k == 0 {
            return Err(ConfigError::Validation("rag.top_k must be positive".to_string()));
        }
        let threshold = self.rag.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Validation(format!(
                "rag.similarity_threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        if self.storage.collection_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.collection_name must not be empty".to_string(),
            ));
        }
        if self.embedding.provider == EmbeddingProviderKind::OpenAi
            && self.embedding.api_key.trim().is_empty()
        {
            return Err(ConfigError::MissingCredential(format!(
                "{} must be set when using the openai embedding provider \
                 (or switch embedding.provider to local)",
                API_KEY_ENV
            )));
        }
        Ok(())
    }
}
