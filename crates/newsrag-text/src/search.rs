use std::collections::HashMap;

use tracing::{debug, instrument};

use newsrag_core::traits::LexicalIndex;
use newsrag_core::types::{SearchHit, SourceKind};
use newsrag_core::{Error, Result};

use crate::index::Bm25Index;

/// Lucene's BM25 IDF; never negative, even for terms in most chunks.
fn idf(n: f64, df: f64) -> f64 {
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

impl Bm25Index {
    /// Score every chunk containing at least one query term.
    ///
    /// Repeated query terms contribute once per occurrence.
    pub(crate) fn score(&self, text: &str) -> Vec<(u32, f64)> {
        let tokens = self.analyzer.tokenize(text);
        if tokens.is_empty() || self.is_empty() {
            return Vec::new();
        }
        let p = &self.postings;
        let (k1, b) = (f64::from(p.config.k1), f64::from(p.config.b));
        let n = p.chunk_ids.len() as f64;
        let avg = self.avg_chunk_len();

        let mut scores: HashMap<u32, f64> = HashMap::new();
        for token in &tokens {
            let Some(list) = p.terms.get(token) else { continue };
            let term_idf = idf(n, list.len() as f64);
            for posting in list {
                let tf = f64::from(posting.tf);
                let len = f64::from(p.doc_lengths[posting.chunk as usize]);
                let norm = if avg > 0.0 { 1.0 - b + b * len / avg } else { 1.0 };
                *scores.entry(posting.chunk).or_insert(0.0) += term_idf * tf * (k1 + 1.0) / (tf + k1 * norm);
            }
        }
        let mut scored: Vec<(u32, f64)> = scores.into_iter().filter(|(_, s)| *s > 0.0).collect();
        // Ordinals follow chunk id order, so the secondary key is the id tie-break.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored
    }

    #[instrument(skip(self, text), fields(chunks = self.len()))]
    pub fn search(&self, text: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            return Err(Error::InvalidArgument("top_k must be >= 1".into()));
        }
        let scored = self.score(text);
        let matched = scored.len();
        let hits: Vec<SearchHit> = scored
            .into_iter()
            .take(top_k)
            .map(|(ordinal, score)| SearchHit {
                id: self.postings.chunk_ids[ordinal as usize].clone(),
                score: score as f32,
                source: SourceKind::Lexical,
            })
            .collect();
        debug!(matched, returned = hits.len(), "lexical query");
        Ok(hits)
    }
}

impl LexicalIndex for Bm25Index {
    fn query(&self, text: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        self.search(text, top_k)
    }

    fn len(&self) -> usize {
        Bm25Index::len(self)
    }
}
