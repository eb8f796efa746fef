//! Ingestion and query orchestration over the chunker, index, and providers.

use crate::error::{EmbeddingError, IngestError, QueryError};
use crate::models::{ChatTurn, Config, Passage};
use crate::providers::ProviderClient;
use crate::services::{SharedSession, TextChunker, VectorIndex};

/// Visible delimiter between passages in the prompt context block.
const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// A grounded answer plus the deduplicated source files it drew from.
#[derive(Debug, Clone)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Orchestrates chunk → embed → index on ingestion and embed → retrieve →
/// complete on query. Provider calls never run while a session lock is held.
#[derive(Debug, Clone)]
pub struct RetrievalPipeline {
    chunker: TextChunker,
    top_k: usize,
    history_window: usize,
}

impl RetrievalPipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            chunker: TextChunker::new(&config.chunking),
            top_k: config.retrieval.top_k,
            history_window: config.retrieval.history_window,
        }
    }

    /// Chunk and embed a document without touching any session state. One
    /// embedding call covers the whole batch.
    pub async fn embed_passages(
        &self,
        client: &dyn ProviderClient,
        text: &str,
        filename: &str,
    ) -> Result<(Vec<Vec<f32>>, Vec<Passage>), IngestError> {
        let passages = self.chunker.chunk(text, filename);
        if passages.is_empty() {
            return Err(IngestError::EmptyDocument);
        }

        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let vectors = client.embed_batch(&texts).await?;
        Ok((vectors, passages))
    }

    /// Build a fresh index from a document, or extend `existing` with it.
    pub async fn ingest(
        &self,
        client: &dyn ProviderClient,
        text: &str,
        filename: &str,
        existing: Option<VectorIndex>,
    ) -> Result<(VectorIndex, usize), IngestError> {
        let (vectors, passages) = self.embed_passages(client, text, filename).await?;
        let chunk_count = passages.len();

        let mut index = existing.unwrap_or_default();
        index.insert(vectors, passages);
        Ok((index, chunk_count))
    }

    /// Ingest a document into a live session. Embedding runs with no lock
    /// held; the index and file-list mutations commit atomically under the
    /// session lock, so concurrent uploads into one session both land.
    pub async fn ingest_into(
        &self,
        client: &dyn ProviderClient,
        session: &SharedSession,
        text: &str,
        filename: &str,
    ) -> Result<usize, IngestError> {
        let (vectors, passages) = self.embed_passages(client, text, filename).await?;
        let chunk_count = passages.len();

        let mut session = session.lock().await;
        session
            .index
            .get_or_insert_with(VectorIndex::new)
            .insert(vectors, passages);
        session.files.push(filename.to_string());
        Ok(chunk_count)
    }

    /// Answer a question against a session's index. The history window is
    /// read and the retrieval runs under the session lock; the embedding and
    /// completion round trips happen with the lock released. The caller
    /// appends the question/answer turns to history after a success.
    pub async fn query(
        &self,
        client: &dyn ProviderClient,
        session: &SharedSession,
        question: &str,
    ) -> Result<Answer, QueryError> {
        let recent: Vec<ChatTurn> = {
            let session = session.lock().await;
            if session.index.is_none() {
                return Err(QueryError::NoIndex);
            }
            let skip = session.history.len().saturating_sub(self.history_window);
            session.history[skip..].to_vec()
        };

        let question_batch = vec![question.to_string()];
        let query_vector = client
            .embed_batch(&question_batch)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                QueryError::Embedding(EmbeddingError::InvalidResponse(
                    "empty embedding response".to_string(),
                ))
            })?;

        let hits = {
            let session = session.lock().await;
            match &session.index {
                Some(index) => index.search(&query_vector, self.top_k),
                // Reset raced the embedding call; same outcome as asking
                // before any upload.
                None => return Err(QueryError::NoIndex),
            }
        };

        let context = hits
            .iter()
            .map(|hit| hit.passage.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_DELIMITER);

        let mut turns = recent;
        turns.push(ChatTurn::human(grounded_question(&context, question)));

        let answer = client.complete(&turns).await?;

        let mut sources = Vec::new();
        for hit in &hits {
            if !sources.contains(&hit.passage.source_file) {
                sources.push(hit.passage.source_file.clone());
            }
        }

        Ok(Answer { answer, sources })
    }
}

/// The grounding instruction folded into the final human turn: answer only
/// from the supplied context and admit ignorance otherwise.
fn grounded_question(context: &str, question: &str) -> String {
    format!(
        "You are a helpful AI assistant. Answer questions based on the document context below.\n\
         If the answer is not in the context, say you don't know. Be concise and factual.\n\
         \n\
         DOCUMENT CONTEXT:\n\
         {context}\n\
         \n\
         ---\n\
         Based on the above context, please answer the following question.\n\
         \n\
         QUESTION: {question}"
    )
}
