mod chunker;
mod metrics;
mod pipeline;
mod session_store;
mod vector_index;

pub use chunker::TextChunker;
pub use metrics::{MetricsStore, MetricsSummary};
pub use pipeline::{Answer, RetrievalPipeline};
pub use session_store::{Session, SessionStore, SharedSession};
pub use vector_index::{SearchHit, VectorIndex, cosine_similarity};
