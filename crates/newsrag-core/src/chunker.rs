//! Sliding word-window chunking.
//!
//! A document's text is split on whitespace and walked with a window of
//! `chunk_size_words` that advances by `chunk_size_words - overlap_words`.
//! The last window may be shorter; nothing is padded. Chunking is a pure
//! function of its inputs, so re-chunking a document is deterministic.

use tracing::{debug, instrument};

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkId, Document};

/// Split `document` into overlapping word windows.
///
/// Fails with [`Error::Config`] when the window would not advance or either
/// size is zero, and with [`Error::MalformedDocument`] for an empty id.
#[instrument(skip_all, fields(doc = %document.id))]
pub fn chunk(document: &Document, chunk_size_words: usize, overlap_words: usize) -> Result<Vec<Chunk>> {
    let config = ChunkingConfig { chunk_size_words, overlap_words };
    config.validate()?;
    if document.id.trim().is_empty() {
        return Err(Error::MalformedDocument { id: document.id.clone(), reason: "empty document id".into() });
    }

    let words: Vec<&str> = document.text.split_whitespace().collect();
    let mut chunks = Vec::with_capacity(expected_chunk_count(words.len(), &config));
    let mut start = 0usize;
    while start < words.len() {
        let end = (start + chunk_size_words).min(words.len());
        let sequence = u32::try_from(chunks.len()).map_err(|_| Error::MalformedDocument {
            id: document.id.clone(),
            reason: "too many chunks for a single document".into(),
        })?;
        chunks.push(Chunk {
            id: ChunkId::new(document.id.clone(), sequence),
            text: words[start..end].join(" "),
            start_word: start,
            end_word: end,
            metadata: document.metadata.clone(),
        });
        if end == words.len() {
            break;
        }
        start += config.stride();
    }
    debug!(words = words.len(), chunks = chunks.len(), "chunked document");
    Ok(chunks)
}

/// Number of windows [`chunk`] produces for `n` words.
pub fn expected_chunk_count(n: usize, config: &ChunkingConfig) -> usize {
    if n == 0 {
        0
    } else if n <= config.chunk_size_words {
        1
    } else {
        (n - config.overlap_words).div_ceil(config.stride())
    }
}

/// Chunker bound to a validated configuration.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn chunk(&self, document: &Document) -> Result<Vec<Chunk>> {
        chunk(document, self.config.chunk_size_words, self.config.overlap_words)
    }

    /// Chunk a batch. A failing document is skipped and reported; it never
    /// aborts the rest of the batch.
    pub fn chunk_all<'a, I>(&self, documents: I) -> (Vec<Chunk>, Vec<(String, Error)>)
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut chunks = Vec::new();
        let mut failures = Vec::new();
        for doc in documents {
            match self.chunk(doc) {
                Ok(mut c) => chunks.append(&mut c),
                Err(e) => {
                    tracing::warn!(doc = %doc.id, error = %e, "skipping document");
                    failures.push((doc.id.clone(), e));
                }
            }
        }
        (chunks, failures)
    }
}
