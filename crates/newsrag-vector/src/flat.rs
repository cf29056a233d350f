use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use newsrag_core::error::validate_dimension;
use newsrag_core::traits::VectorIndex;
use newsrag_core::types::{ChunkId, SearchHit, SourceKind};
use newsrag_core::{Error, Result};

/// Row-major embeddings sorted by chunk id, with precomputed L2 norms.
///
/// Raw vectors are kept as given so a persisted index reloads bit-for-bit.
#[derive(Debug, Clone)]
pub(crate) struct VectorRows {
    pub(crate) dim: usize,
    pub(crate) ids: Vec<ChunkId>,
    pub(crate) data: Vec<f32>,
    pub(crate) norms: Vec<f32>,
}

pub(crate) fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt() as f32
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(&x, &y)| f64::from(x) * f64::from(y)).sum()
}

/// Reject vectors that cannot take part in cosine similarity.
pub(crate) fn check_vector(v: &[f32], dim: usize, what: &str) -> Result<f32> {
    validate_dimension(dim, v.len())?;
    if v.iter().any(|x| !x.is_finite()) {
        return Err(Error::InvalidArgument(format!("{what} contains a non-finite value")));
    }
    let norm = l2_norm(v);
    if norm == 0.0 {
        return Err(Error::InvalidArgument(format!("{what} has zero norm")));
    }
    Ok(norm)
}

impl VectorRows {
    pub(crate) fn build<I>(dim: usize, vectors: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ChunkId, Vec<f32>)>,
    {
        if dim == 0 {
            return Err(Error::Config("vector dimension must be > 0".into()));
        }
        let mut sorted: BTreeMap<ChunkId, Vec<f32>> = BTreeMap::new();
        for (id, v) in vectors {
            if sorted.contains_key(&id) {
                return Err(Error::InvalidArgument(format!("duplicate embedding for chunk {id}")));
            }
            sorted.insert(id, v);
        }
        let mut rows = Self {
            dim,
            ids: Vec::with_capacity(sorted.len()),
            data: Vec::with_capacity(sorted.len() * dim),
            norms: Vec::with_capacity(sorted.len()),
        };
        for (id, v) in sorted {
            let norm = check_vector(&v, dim, &format!("embedding for {id}"))?;
            rows.ids.push(id);
            rows.data.extend_from_slice(&v);
            rows.norms.push(norm);
        }
        Ok(rows)
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    pub(crate) fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub(crate) fn cosine(&self, i: usize, query: &[f32], query_norm: f32) -> f32 {
        (dot(self.row(i), query) / (f64::from(self.norms[i]) * f64::from(query_norm))) as f32
    }

    pub(crate) fn position(&self, id: &ChunkId) -> Option<usize> {
        self.ids.binary_search(id).ok()
    }

    /// Validate a query against the row contract and return its norm.
    pub(crate) fn check_query(&self, embedding: &[f32], top_k: usize) -> Result<f32> {
        if top_k == 0 {
            return Err(Error::InvalidArgument("top_k must be >= 1".into()));
        }
        check_vector(embedding, self.dim, "query embedding")
    }

    /// Exact cosine over `candidates`, descending, ties by chunk id ascending.
    pub(crate) fn rank<I>(&self, candidates: I, embedding: &[f32], query_norm: f32, top_k: usize) -> Vec<SearchHit>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut scored: Vec<(usize, f32)> =
            candidates.into_iter().map(|i| (i, self.cosine(i, embedding, query_norm))).collect();
        // Row order is chunk id order, so the index is the tie-break.
        scored.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(top_k);
        scored
            .into_iter()
            .map(|(i, score)| SearchHit { id: self.ids[i].clone(), score, source: SourceKind::Vector })
            .collect()
    }

    pub(crate) fn to_map(&self) -> BTreeMap<ChunkId, Vec<f32>> {
        (0..self.len()).map(|i| (self.ids[i].clone(), self.row(i).to_vec())).collect()
    }
}

/// Exact brute-force cosine index.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    pub(crate) rows: VectorRows,
}

impl FlatIndex {
    #[instrument(skip_all, fields(dim = dim))]
    pub fn build<I>(dim: usize, vectors: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ChunkId, Vec<f32>)>,
    {
        let rows = VectorRows::build(dim, vectors)?;
        info!(vectors = rows.len(), "built flat vector index");
        Ok(Self { rows })
    }

    /// Stored embedding for `id`, exactly as it was given to `build`.
    pub fn embedding(&self, id: &ChunkId) -> Option<&[f32]> {
        self.rows.position(id).map(|i| self.rows.row(i))
    }

    pub fn to_map(&self) -> BTreeMap<ChunkId, Vec<f32>> {
        self.rows.to_map()
    }
}

impl VectorIndex for FlatIndex {
    fn dim(&self) -> usize {
        self.rows.dim
    }

    fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let query_norm = self.rows.check_query(embedding, top_k)?;
        let hits = self.rows.rank(0..self.rows.len(), embedding, query_norm, top_k);
        debug!(scanned = self.rows.len(), returned = hits.len(), "flat vector query");
        Ok(hits)
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn contains(&self, id: &ChunkId) -> bool {
        self.rows.position(id).is_some()
    }
}
