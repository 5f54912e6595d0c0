use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct BrainConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub judgment: JudgmentConfig,
    pub retrieval: RetrievalConfig,
    pub notes: NotesConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Remote embedding endpoint (OpenAI-compatible `/embeddings`).
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key. Empty disables auth.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

/// Text-generation endpoint used for topic extraction, title matching and merging.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct JudgmentConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Cosine similarity a match must strictly exceed.
    pub similarity_threshold: f64,
    pub context_max_chars: usize,
    pub topic_max_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotesConfig {
    pub title_max_len: usize,
    pub queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            host: "127.0.0.1".into(),
            port: 7341,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_brain_dir()
            .join("brain.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "http".into(),
            base_url: "http://localhost:11434/v1".into(),
            model: "nomic-embed-text".into(),
            api_key_env: String::new(),
            timeout_secs: 10,
        }
    }
}

impl Default for JudgmentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".into(),
            model: "llama3.1".into(),
            api_key_env: String::new(),
            timeout_secs: 30,
            temperature: 0.2,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            context_max_chars: 1500,
            topic_max_chars: 80,
        }
    }
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            title_max_len: 100,
            queue_capacity: 64,
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl JudgmentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Returns `~/.secondbrain/`
pub fn default_brain_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".secondbrain")
}

/// Returns the default config file path: `~/.secondbrain/config.toml`
pub fn default_config_path() -> PathBuf {
    default_brain_dir().join("config.toml")
}

impl BrainConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            BrainConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (SECONDBRAIN_DB, SECONDBRAIN_LOG_LEVEL, SECONDBRAIN_THRESHOLD).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SECONDBRAIN_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("SECONDBRAIN_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("SECONDBRAIN_THRESHOLD") {
            match parse_threshold(&val) {
                Some(t) => self.retrieval.similarity_threshold = t,
                None => warn!(value = %val, "ignoring SECONDBRAIN_THRESHOLD, expected a number in [-1, 1]"),
            }
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

/// Read an API key from the environment variable named by `var`.
/// An empty variable name means the endpoint needs no key.
pub fn read_api_key(var: &str) -> Option<String> {
    if var.is_empty() {
        return None;
    }
    std::env::var(var).ok().filter(|k| !k.is_empty())
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

/// A cosine threshold: finite and within [-1, 1].
fn parse_threshold(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite() && (-1.0..=1.0).contains(t))
}
