//! External model providers.
//!
//! A session binds one [`Provider`] at creation time; everything downstream
//! talks to the capability interface [`ProviderClient`], so adding a provider
//! means adding an implementation, not extending a branch.

mod gemini;
mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CompletionError, EmbeddingError};
use crate::models::{ChatTurn, ProvidersConfig};

/// Supported external AI providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Gemini,
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            _ => Err(format!("unknown provider: {} (expected openai or gemini)", s)),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::Gemini => write!(f, "gemini"),
        }
    }
}

/// Capability interface over an external provider: batch embeddings plus a
/// single-shot chat completion. One embedding call is one HTTP round trip;
/// the provider fixes the embedding dimensionality for the session's
/// lifetime.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Embed a batch of texts, one vector per input, order preserved.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Run the conversation through the chat model and return the answer
    /// text. Temperature is pinned to zero.
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, CompletionError>;
}

/// Construct the client bound to a session's provider choice.
pub fn client_for(
    provider: Provider,
    api_key: &str,
    config: &ProvidersConfig,
) -> Result<Box<dyn ProviderClient>, EmbeddingError> {
    match provider {
        Provider::OpenAi => Ok(Box::new(OpenAiClient::new(api_key, config)?)),
        Provider::Gemini => Ok(Box::new(GeminiClient::new(api_key, config)?)),
    }
}
