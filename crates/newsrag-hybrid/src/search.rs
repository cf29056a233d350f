//! Fusion ranker: candidate retrieval, reciprocal-rank fusion, filtering
//! and hydration.
//!
//! Filters run on fused candidates *before* truncation. When they leave
//! fewer than `top_k` results, both sources are re-queried with doubled
//! breadth until `top_k` survive, both sources run dry, or
//! `fusion.max_breadth` is reached. A response that still falls short
//! because candidates were filtered out carries [`PartialResults`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use newsrag_core::config::FusionConfig;
use newsrag_core::error::validate_dimension;
use newsrag_core::traits::{Embedder, LexicalIndex, VectorIndex};
use newsrag_core::types::{DateRange, PartialResults, RetrievalResult};
use newsrag_core::{Error, Result};

use crate::filter::SearchFilter;
use crate::fusion::{rrf_fuse, FusedCandidate};
use crate::handle::IndexHandle;
use crate::snapshot::SearchSnapshot;

/// Which sources feed the ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Hybrid,
    /// BM25 only.
    Lexical,
    /// Vector only.
    Semantic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    pub mode: SearchMode,
    pub filter: SearchFilter,
    /// Drop results whose fused score is below this value.
    pub min_score: Option<f32>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self { query: query.into(), top_k, mode: SearchMode::Hybrid, filter: SearchFilter::default(), min_score: None }
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.filter.date_range = Some(range);
        self
    }

    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    fn admits(&self, snapshot: &SearchSnapshot, candidate: &FusedCandidate) -> bool {
        if self.min_score.is_some_and(|min| candidate.score < min) {
            return false;
        }
        snapshot.store().get(&candidate.id).is_some_and(|chunk| self.filter.matches(chunk))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<RetrievalResult>,
    /// Set when filtering left fewer than `top_k` results after the maximum
    /// breadth was searched.
    pub partial: Option<PartialResults>,
    /// Per-source candidate count of the final retrieval round.
    pub breadth: usize,
}

impl SearchResponse {
    pub fn is_partial(&self) -> bool {
        self.partial.is_some()
    }
}

impl SearchSnapshot {
    /// Rank chunks for `request`.
    ///
    /// `embedding` is the query vector, if the caller has one. An empty query
    /// text with an embedding runs vector-only; neither is `InvalidArgument`.
    /// An empty corpus yields an empty response, not an error.
    #[instrument(skip_all, fields(top_k = request.top_k, mode = ?request.mode))]
    pub fn search(
        &self,
        request: &SearchRequest,
        embedding: Option<&[f32]>,
        fusion: &FusionConfig,
    ) -> Result<SearchResponse> {
        if request.top_k == 0 {
            return Err(Error::InvalidArgument("top_k must be >= 1".into()));
        }
        let text = request.query.trim();
        let (lexical_weight, vector_weight) = match request.mode {
            SearchMode::Hybrid => (fusion.lexical_weight, fusion.vector_weight),
            SearchMode::Lexical => (1.0, 0.0),
            SearchMode::Semantic => (0.0, 1.0),
        };
        let use_lexical = lexical_weight > 0.0 && !text.is_empty();
        let vector_query = embedding.filter(|_| vector_weight > 0.0);
        match request.mode {
            SearchMode::Lexical if text.is_empty() => {
                return Err(Error::InvalidArgument("lexical search needs query text".into()));
            }
            SearchMode::Semantic if embedding.is_none() => {
                return Err(Error::InvalidArgument("semantic search needs a query embedding".into()));
            }
            _ if !use_lexical && vector_query.is_none() => {
                return Err(Error::InvalidArgument("query text and embedding are both empty".into()));
            }
            _ => {}
        }
        if let Some(e) = vector_query {
            validate_dimension(self.vector().dim(), e.len())?;
        }
        if self.store().is_empty() {
            return Ok(SearchResponse::default());
        }

        let max_breadth = fusion.max_breadth.max(1);
        let mut breadth = request.top_k.saturating_mul(fusion.overfetch_multiplier).clamp(1, max_breadth);
        loop {
            let lexical = if use_lexical { self.lexical().query(text, breadth)? } else { Vec::new() };
            let vector = match vector_query {
                Some(e) => self.vector().query(e, breadth)?,
                None => Vec::new(),
            };
            let exhausted = lexical.len() < breadth && vector.len() < breadth;
            let fused = rrf_fuse(&lexical, &vector, lexical_weight, vector_weight, fusion.rrf_k);

            let mut rejected = 0usize;
            let mut results = Vec::with_capacity(request.top_k);
            for candidate in &fused {
                if !request.admits(self, candidate) {
                    rejected += 1;
                    continue;
                }
                results.push(self.hydrate(candidate)?);
                if results.len() == request.top_k {
                    break;
                }
            }
            debug!(breadth, lexical = lexical.len(), vector = vector.len(), rejected, kept = results.len(), "fusion round");

            if results.len() >= request.top_k || exhausted || breadth >= max_breadth {
                let partial = (results.len() < request.top_k && rejected > 0)
                    .then_some(PartialResults { requested: request.top_k, returned: results.len() });
                if partial.is_some() {
                    debug!(requested = request.top_k, returned = results.len(), "partial results after filtering");
                }
                return Ok(SearchResponse { results, partial, breadth });
            }
            breadth = breadth.saturating_mul(2).min(max_breadth);
        }
    }

    fn hydrate(&self, candidate: &FusedCandidate) -> Result<RetrievalResult> {
        let chunk = self
            .store()
            .get(&candidate.id)
            .ok_or_else(|| Error::InvalidArgument(format!("chunk {} missing from corpus store", candidate.id)))?;
        Ok(RetrievalResult {
            chunk_id: candidate.id.clone(),
            score: candidate.score,
            document_id: chunk.document_id().to_string(),
            source: chunk.metadata.source.clone(),
            publication_date: chunk.publication_date(),
            page_number: chunk.metadata.page_number,
            text: chunk.text.clone(),
            lexical_rank: candidate.lexical_rank,
            vector_rank: candidate.vector_rank,
        })
    }
}

/// Query front end over the currently published snapshot.
///
/// Every query (embedding and index lookups alike) runs on tokio's blocking
/// pool under a timeout. Expiry fails that query with [`Error::Timeout`];
/// the published snapshot is read-only, so an abandoned query cannot corrupt
/// it.
#[derive(Clone)]
pub struct HybridSearcher {
    handle: Arc<IndexHandle>,
    embedder: Option<Arc<dyn Embedder>>,
    fusion: FusionConfig,
    timeout: Duration,
}

impl HybridSearcher {
    pub fn new(handle: Arc<IndexHandle>, embedder: Arc<dyn Embedder>, fusion: FusionConfig, timeout: Duration) -> Self {
        Self { handle, embedder: Some(embedder), fusion, timeout }
    }

    /// A searcher without an embedding provider. Text queries that need an
    /// embedding fail with `InvalidArgument`; lexical queries and
    /// caller-supplied embeddings work as usual.
    pub fn without_embedder(handle: Arc<IndexHandle>, fusion: FusionConfig, timeout: Duration) -> Self {
        Self { handle, embedder: None, fusion, timeout }
    }

    pub fn handle(&self) -> &Arc<IndexHandle> {
        &self.handle
    }

    /// Search with a caller-computed embedding (or none), bounded by the
    /// configured timeout.
    pub async fn search(&self, request: SearchRequest, embedding: Option<Vec<f32>>) -> Result<SearchResponse> {
        self.search_with_timeout(request, embedding, self.timeout).await
    }

    pub async fn search_with_timeout(
        &self,
        request: SearchRequest,
        embedding: Option<Vec<f32>>,
        timeout: Duration,
    ) -> Result<SearchResponse> {
        let snapshot = self.handle.load();
        let fusion = self.fusion;
        bounded(timeout, move || snapshot.search(&request, embedding.as_deref(), &fusion)).await
    }

    /// Embed the query text and search, bounded by the configured timeout.
    pub async fn search_text(&self, request: SearchRequest) -> Result<SearchResponse> {
        self.search_text_with_timeout(request, self.timeout).await
    }

    pub async fn search_text_with_timeout(&self, request: SearchRequest, timeout: Duration) -> Result<SearchResponse> {
        let snapshot = self.handle.load();
        let fusion = self.fusion;
        let embedder = if request.mode != SearchMode::Lexical && !request.query.trim().is_empty() {
            let embedder = self
                .embedder
                .as_ref()
                .ok_or_else(|| Error::InvalidArgument("no embedding provider configured for this search".into()))?;
            Some(Arc::clone(embedder))
        } else {
            None
        };
        bounded(timeout, move || {
            let embedding = match embedder {
                Some(e) => Some(e.embed_query(request.query.trim()).map_err(|e| Error::Embedding(e.to_string()))?),
                None => None,
            };
            snapshot.search(&request, embedding.as_deref(), &fusion)
        })
        .await
    }
}

/// Run `work` on the blocking pool and give up after `timeout`.
///
/// A panic inside `work` is re-raised on the caller.
async fn bounded<F>(timeout: Duration, work: F) -> Result<SearchResponse>
where
    F: FnOnce() -> Result<SearchResponse> + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) if join_error.is_panic() => std::panic::resume_unwind(join_error.into_panic()),
        Ok(Err(join_error)) => Err(Error::Cancelled(join_error.to_string())),
        Err(_) => {
            warn!(?timeout, "search timed out");
            Err(Error::Timeout(timeout))
        }
    }
}
