use crate::error::Result;
use crate::types::{ChunkId, SearchHit};

/// External embedding capability.
///
/// Synchronous on purpose: callers pick their own concurrency model (threads,
/// blocking pool, ...) around it. Implementations must return vectors of
/// length [`Embedder::dim`]; callers still validate that contract.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hash:d384`).
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }

    /// Embed a search query. Models trained with query/passage prefixes
    /// override this; the default treats queries like passages.
    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed(text)
    }
}

/// Read-only ranking surface of the lexical index.
pub trait LexicalIndex: Send + Sync {
    /// Top `top_k` chunks by BM25, descending, ties by chunk id ascending.
    /// Chunks matching no query term are omitted.
    fn query(&self, text: &str, top_k: usize) -> Result<Vec<SearchHit>>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only ranking surface of the vector index.
///
/// Exact and approximate backends share the same contract: dimension check,
/// descending cosine similarity, ties by chunk id ascending, at most `top_k`.
pub trait VectorIndex: Send + Sync {
    fn dim(&self) -> usize;
    fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchHit>>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn contains(&self, id: &ChunkId) -> bool;
}
