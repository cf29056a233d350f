use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use newsrag_core::config::Bm25Config;
use newsrag_core::snapshot;
use newsrag_core::types::{Chunk, ChunkId};
use newsrag_core::{Error, Result};

use crate::tantivy_utils::Analyzer;

const SNAPSHOT_KIND: &str = "bm25-index";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Posting {
    /// Ordinal into `chunk_ids`.
    pub(crate) chunk: u32,
    pub(crate) tf: u32,
}

/// Everything a query needs; this is exactly what gets persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Postings {
    pub(crate) config: Bm25Config,
    /// Sorted ascending, so ordinal order is chunk id order.
    pub(crate) chunk_ids: Vec<ChunkId>,
    pub(crate) doc_lengths: Vec<u32>,
    pub(crate) total_length: u64,
    pub(crate) terms: BTreeMap<String, Vec<Posting>>,
}

/// In-memory BM25 index over chunk texts.
///
/// Built once from a chunk set and never mutated afterwards; a corpus change
/// means building a new index.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    pub(crate) postings: Postings,
    pub(crate) analyzer: Analyzer,
}

impl Bm25Index {
    #[instrument(skip_all, fields(k1 = config.k1, b = config.b))]
    pub fn build<'a, I>(chunks: I, config: Bm25Config) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Chunk>,
    {
        config.validate()?;
        let analyzer = Analyzer::new(config.remove_stopwords);

        let mut sorted: Vec<&Chunk> = chunks.into_iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(dup) = sorted.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(Error::InvalidArgument(format!("duplicate chunk id {} in lexical build", dup[0].id)));
        }

        let mut chunk_ids = Vec::with_capacity(sorted.len());
        let mut doc_lengths = Vec::with_capacity(sorted.len());
        let mut total_length = 0u64;
        let mut terms: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
        for (ordinal, chunk) in sorted.into_iter().enumerate() {
            let ordinal = u32::try_from(ordinal)
                .map_err(|_| Error::InvalidArgument("too many chunks for one lexical index".into()))?;
            let tokens = analyzer.tokenize(&chunk.text);
            let len = u32::try_from(tokens.len()).unwrap_or(u32::MAX);
            let mut tf: HashMap<String, u32> = HashMap::new();
            for t in tokens {
                *tf.entry(t).or_insert(0) += 1;
            }
            for (term, count) in tf {
                terms.entry(term).or_default().push(Posting { chunk: ordinal, tf: count });
            }
            chunk_ids.push(chunk.id.clone());
            doc_lengths.push(len);
            total_length += u64::from(len);
        }
        // HashMap iteration order is arbitrary; keep postings in ordinal order
        // so two builds of the same corpus are byte-identical.
        for list in terms.values_mut() {
            list.sort_by_key(|p| p.chunk);
        }

        info!(chunks = chunk_ids.len(), terms = terms.len(), "built lexical index");
        Ok(Self { postings: Postings { config, chunk_ids, doc_lengths, total_length, terms }, analyzer })
    }

    pub fn config(&self) -> &Bm25Config {
        &self.postings.config
    }

    pub fn len(&self) -> usize {
        self.postings.chunk_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.chunk_ids.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.postings.terms.len()
    }

    /// Number of chunks containing `term` after analysis.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.analyzer
            .tokenize(term)
            .first()
            .and_then(|t| self.postings.terms.get(t))
            .map_or(0, Vec::len)
    }

    pub fn avg_chunk_len(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.postings.total_length as f64 / self.len() as f64
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        snapshot::write(path, SNAPSHOT_KIND, &self.postings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let postings: Postings = snapshot::read(path, SNAPSHOT_KIND)?;
        postings.config.validate()?;
        if postings.doc_lengths.len() != postings.chunk_ids.len() {
            return Err(Error::Snapshot {
                path: path.to_path_buf(),
                reason: "chunk ids and lengths disagree".into(),
            });
        }
        let chunks = postings.chunk_ids.len();
        if let Some((term, posting)) = postings
            .terms
            .iter()
            .find_map(|(term, list)| list.iter().find(|p| p.chunk as usize >= chunks).map(|p| (term, p)))
        {
            return Err(Error::Snapshot {
                path: path.to_path_buf(),
                reason: format!("posting for '{term}' points at chunk {} of {chunks}", posting.chunk),
            });
        }
        let analyzer = Analyzer::new(postings.config.remove_stopwords);
        info!(path = %path.display(), chunks = postings.chunk_ids.len(), "loaded lexical index");
        Ok(Self { postings, analyzer })
    }
}
