mod chat;
mod config;
mod passage;

pub use chat::{ChatRole, ChatTurn};
pub use config::{
    ChunkingConfig, Config, DEFAULT_MAX_CHUNK_CHARS, DEFAULT_OVERLAP_CHARS, DEFAULT_SESSION_TTL_SECS,
    DEFAULT_TOP_K, DaemonConfig, OutputConfig, OutputFormat, ProvidersConfig, RetrievalConfig,
    SessionConfig,
};
pub use passage::Passage;
