//! Batch embedding of chunks with a write-through cache.
//!
//! For each batch we consult the cache, embed the misses, validate every
//! returned vector against the deployment dimension and write accepted
//! vectors back to the cache. A failing batch (provider error, wrong count)
//! or a single bad vector is recorded and skipped; the backfill continues.

use std::collections::BTreeMap;

use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use newsrag_core::error::validate_dimension;
use newsrag_core::traits::Embedder;
use newsrag_core::types::{Chunk, ChunkId};
use newsrag_core::{Error, Result};

use crate::cache::{content_hash, EmbeddingCache};
use crate::flat::check_vector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFailure {
    pub chunk_ids: Vec<ChunkId>,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct EmbedReport {
    /// Accepted embeddings, ready for a vector index build.
    pub vectors: BTreeMap<ChunkId, Vec<f32>>,
    pub embedded: usize,
    pub cache_hits: usize,
    pub failures: Vec<EmbedFailure>,
}

impl EmbedReport {
    pub fn failed_chunks(&self) -> usize {
        self.failures.iter().map(|f| f.chunk_ids.len()).sum()
    }
}

#[instrument(skip_all, fields(embedder = embedder.embedder_id(), batch_size = batch_size))]
pub fn embed_chunks<'a, I>(
    chunks: I,
    embedder: &dyn Embedder,
    cache: &mut EmbeddingCache,
    expected_dim: usize,
    batch_size: usize,
    progress: Option<&ProgressBar>,
) -> Result<EmbedReport>
where
    I: IntoIterator<Item = &'a Chunk>,
{
    if batch_size == 0 {
        return Err(Error::Config("embedding batch_size must be > 0".into()));
    }
    validate_dimension(expected_dim, embedder.dim())?;
    let embedder_id = embedder.embedder_id().to_string();
    let chunks: Vec<&Chunk> = chunks.into_iter().collect();
    let mut report = EmbedReport::default();

    for batch in chunks.chunks(batch_size) {
        let hashes: Vec<String> = batch.iter().map(|c| content_hash(&c.text)).collect();
        let mut misses = Vec::new();
        for (chunk, hash) in batch.iter().zip(&hashes) {
            match cache.get(hash, &embedder_id) {
                Some(v) if v.len() == expected_dim => {
                    report.vectors.insert(chunk.id.clone(), v.to_vec());
                    report.cache_hits += 1;
                }
                _ => misses.push((*chunk, hash)),
            }
        }

        if !misses.is_empty() {
            let texts: Vec<String> = misses.iter().map(|(c, _)| c.text.clone()).collect();
            let miss_ids = || misses.iter().map(|(c, _)| c.id.clone()).collect::<Vec<_>>();
            match embedder.embed_batch(&texts) {
                Err(e) => {
                    warn!(error = %e, chunks = misses.len(), "embedding batch failed");
                    report.failures.push(EmbedFailure { chunk_ids: miss_ids(), reason: e.to_string() });
                }
                Ok(vectors) if vectors.len() != misses.len() => {
                    let reason = format!("embedder returned {} vectors for {} texts", vectors.len(), misses.len());
                    warn!(%reason, "embedding batch failed");
                    report.failures.push(EmbedFailure { chunk_ids: miss_ids(), reason });
                }
                Ok(vectors) => {
                    for ((chunk, hash), v) in misses.iter().zip(vectors) {
                        if let Err(e) = check_vector(&v, expected_dim, "embedding") {
                            warn!(chunk = %chunk.id, error = %e, "rejecting embedding");
                            report.failures.push(EmbedFailure { chunk_ids: vec![chunk.id.clone()], reason: e.to_string() });
                            continue;
                        }
                        cache.put((*hash).clone(), embedder_id.clone(), v.clone());
                        report.vectors.insert(chunk.id.clone(), v);
                        report.embedded += 1;
                    }
                }
            }
        }
        if let Some(pb) = progress {
            pb.inc(batch.len() as u64);
        }
    }

    info!(
        embedded = report.embedded,
        cache_hits = report.cache_hits,
        failed = report.failed_chunks(),
        "embedding backfill finished"
    );
    Ok(report)
}
