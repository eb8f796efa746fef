//! OpenAI REST adapter for the embedding and completion contracts.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{CompletionError, EmbeddingError};
use crate::models::{ChatRole, ChatTurn, ProvidersConfig};
use crate::utils::retry::{RetryConfig, with_retry};

use super::ProviderClient;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Client for the OpenAI embeddings and chat completions APIs.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    retry: RetryConfig,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        config: &ProvidersConfig,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            embedding_model: config.openai_embedding_model.clone(),
            chat_model: config.openai_chat_model.clone(),
            retry: RetryConfig::new(config.max_attempts),
        })
    }

    async fn send_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = EmbeddingsRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{OPENAI_API_BASE}/embeddings"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else {
                    EmbeddingError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status,
                message: error_message(&body),
            });
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        let mut data = parsed.data;
        if data.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                data.len()
            )));
        }

        // The API reports an index per item; order by it rather than
        // trusting response order.
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    async fn send_chat(&self, turns: &[ChatTurn]) -> Result<String, CompletionError> {
        let messages: Vec<ChatMessage> = turns
            .iter()
            .map(|turn| ChatMessage {
                role: match turn.role {
                    ChatRole::Human => "user",
                    ChatRole::Assistant => "assistant",
                },
                content: &turn.content,
            })
            .collect();

        let request = ChatRequest {
            model: &self.chat_model,
            messages,
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{OPENAI_API_BASE}/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout
                } else {
                    CompletionError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status,
                message: error_message(&body),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyResponse)
    }
}

#[async_trait]
impl ProviderClient for OpenAiClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        with_retry(&self.retry, || self.send_embeddings(texts)).await
    }

    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, CompletionError> {
        with_retry(&self.retry, || self.send_chat(turns)).await
    }
}

/// Pull the human-readable message out of an OpenAI error envelope, falling
/// back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
