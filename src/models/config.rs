use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::providers::Provider;

pub const DEFAULT_MAX_CHUNK_CHARS: usize = 2000;
pub const DEFAULT_OVERLAP_CHARS: usize = 400;
pub const DEFAULT_TOP_K: usize = 6;
pub const DEFAULT_HISTORY_WINDOW: usize = 6;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
    /// Documentation-friendly Markdown format
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("docchat").join("config.toml"))
    }

    /// Directory for mutable state (metrics database, last-session marker).
    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|p| p.join("docchat"))
    }

    pub fn metrics_db_path() -> Option<PathBuf> {
        Self::data_dir().map(|p| p.join("metrics.db"))
    }

    /// Marker file holding the id of the most recently used session, so
    /// `ask`/`reset` work without an explicit `--session`.
    pub fn last_session_path() -> Option<PathBuf> {
        Self::data_dir().map(|p| p.join("last_session"))
    }

    /// Socket and pid files live in the runtime dir when the platform has
    /// one, else the temp dir.
    fn runtime_dir() -> PathBuf {
        dirs::runtime_dir().unwrap_or_else(std::env::temp_dir)
    }

    pub fn socket_path(&self) -> PathBuf {
        Self::runtime_dir().join("docchat.sock")
    }

    pub fn pid_path(&self) -> PathBuf {
        Self::runtime_dir().join("docchat.pid")
    }

    pub fn load() -> Result<Self, crate::error::ConfigError> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            return Ok(config);
        }
        Ok(Self::default())
    }

    pub fn save(&self) -> Result<(), crate::error::ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            crate::error::ConfigError::Path("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

/// Document chunking parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

fn default_max_chunk_chars() -> usize {
    DEFAULT_MAX_CHUNK_CHARS
}

fn default_overlap_chars() -> usize {
    DEFAULT_OVERLAP_CHARS
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

/// Retrieval and prompting parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Passages retrieved per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Prior history messages included in the prompt.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            history_window: default_history_window(),
        }
    }
}

/// Session lifecycle parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle seconds before a session is treated as expired.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Per-upload document size cap, checked before extraction.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_max_upload_bytes() -> u64 {
    15 * 1024 * 1024
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Model names and HTTP behavior for the external providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Provider used when an upload does not name one.
    #[serde(default)]
    pub default_provider: Provider,

    #[serde(default = "default_openai_embedding_model")]
    pub openai_embedding_model: String,

    #[serde(default = "default_openai_chat_model")]
    pub openai_chat_model: String,

    #[serde(default = "default_gemini_embedding_model")]
    pub gemini_embedding_model: String,

    #[serde(default = "default_gemini_chat_model")]
    pub gemini_chat_model: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// HTTP attempts per provider call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_openai_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_openai_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_gemini_embedding_model() -> String {
    "text-embedding-004".to_string()
}

fn default_gemini_chat_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            default_provider: Provider::default(),
            openai_embedding_model: default_openai_embedding_model(),
            openai_chat_model: default_openai_chat_model(),
            gemini_embedding_model: default_gemini_embedding_model(),
            gemini_chat_model: default_gemini_chat_model(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Daemon lifecycle parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Daemon exits after this many seconds without a request.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Start the daemon automatically on first client use.
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,

    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,

    /// Days of request history kept in the metrics database.
    #[serde(default = "default_metrics_retention_days")]
    pub metrics_retention_days: u32,
}

fn default_idle_timeout_secs() -> u64 {
    30 * 60
}

fn default_auto_start() -> bool {
    true
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_retention_days() -> u32 {
    7
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            auto_start: default_auto_start(),
            metrics_enabled: default_metrics_enabled(),
            metrics_retention_days: default_metrics_retention_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub default_format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.chunking.max_chunk_chars, DEFAULT_MAX_CHUNK_CHARS);
        assert_eq!(config.chunking.overlap_chars, DEFAULT_OVERLAP_CHARS);
        assert_eq!(config.retrieval.top_k, 6);
        assert_eq!(config.retrieval.history_window, 6);
        assert_eq!(config.session.ttl(), Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.is_some());
    }

    #[test]
    fn test_providers_config_default() {
        let config = ProvidersConfig::default();
        assert_eq!(config.openai_embedding_model, "text-embedding-3-small");
        assert_eq!(config.gemini_chat_model, "gemini-2.5-flash");
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "md".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [chunking]
            max_chunk_chars = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.max_chunk_chars, 500);
        assert_eq!(config.chunking.overlap_chars, DEFAULT_OVERLAP_CHARS);
        assert_eq!(config.session.ttl_secs, DEFAULT_SESSION_TTL_SECS);
    }
}
