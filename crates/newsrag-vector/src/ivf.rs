//! Inverted-file (IVF) index for large corpora.
//!
//! Rows are partitioned by spherical k-means into `nlist` lists. A query
//! probes the `nprobe` closest centroids (more when those lists hold fewer
//! than `top_k` rows) and re-scores every row in the visited lists with exact
//! cosine, so results carry the same scores, ordering, tie-break and
//! `min(top_k, n)` length as [`crate::FlatIndex`]; only recall is
//! approximate. With `nprobe >= nlist` every row is scored and the result
//! equals a flat scan.

use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use newsrag_core::traits::VectorIndex;
use newsrag_core::types::{ChunkId, SearchHit};
use newsrag_core::{Error, Result};

use crate::flat::{l2_norm, VectorRows};

const KMEANS_ITERATIONS: usize = 8;
const MAX_NLIST: usize = 65_536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IvfParams {
    pub nlist: usize,
    pub nprobe: usize,
}

/// `nlist ≈ 2·sqrt(n)`, capped, and never more lists than rows.
pub fn compute_ivf_params(total_vectors: usize, nlist_override: Option<usize>, nprobe: usize) -> IvfParams {
    let sqrt_n = (total_vectors as f64).sqrt() as usize;
    let wanted = nlist_override.unwrap_or(2 * sqrt_n).min(MAX_NLIST);
    let nlist = wanted.min(total_vectors).max(1);
    IvfParams { nlist, nprobe: nprobe.max(1) }
}

#[derive(Debug, Clone)]
pub struct IvfIndex {
    pub(crate) rows: VectorRows,
    params: IvfParams,
    /// Unit-length centroids, row-major `nlist x dim`.
    centroids: Vec<f32>,
    /// Row indices per list, ascending.
    lists: Vec<Vec<usize>>,
}

fn unit(v: &[f32]) -> Vec<f32> {
    let n = l2_norm(v);
    if n == 0.0 {
        v.to_vec()
    } else {
        v.iter().map(|x| x / n).collect()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Index of the best-scoring centroid; lowest index wins ties.
fn nearest(centroids: &[f32], dim: usize, v: &[f32]) -> usize {
    let mut best = (0usize, f32::NEG_INFINITY);
    for (c, centroid) in centroids.chunks_exact(dim).enumerate() {
        let s = dot(centroid, v);
        if s > best.1 {
            best = (c, s);
        }
    }
    best.0
}

impl IvfIndex {
    #[instrument(skip_all, fields(dim = dim, nprobe = nprobe))]
    pub fn build<I>(dim: usize, vectors: I, nlist: Option<usize>, nprobe: usize) -> Result<Self>
    where
        I: IntoIterator<Item = (ChunkId, Vec<f32>)>,
    {
        if nprobe == 0 {
            return Err(Error::Config("nprobe must be >= 1".into()));
        }
        let rows = VectorRows::build(dim, vectors)?;
        let params = compute_ivf_params(rows.len(), nlist, nprobe);
        if rows.len() == 0 {
            return Ok(Self { rows, params, centroids: Vec::new(), lists: Vec::new() });
        }

        let units: Vec<Vec<f32>> = (0..rows.len()).map(|i| unit(rows.row(i))).collect();
        // Deterministic seeding: evenly spaced rows in chunk id order.
        let mut centroids: Vec<f32> = Vec::with_capacity(params.nlist * dim);
        for c in 0..params.nlist {
            centroids.extend_from_slice(&units[c * rows.len() / params.nlist]);
        }

        let mut assignment = vec![0usize; rows.len()];
        for _ in 0..KMEANS_ITERATIONS {
            let mut changed = false;
            for (i, u) in units.iter().enumerate() {
                let c = nearest(&centroids, dim, u);
                if assignment[i] != c {
                    assignment[i] = c;
                    changed = true;
                }
            }
            let mut sums = vec![0f64; params.nlist * dim];
            let mut counts = vec![0usize; params.nlist];
            for (u, &c) in units.iter().zip(&assignment) {
                counts[c] += 1;
                for (s, &x) in sums[c * dim..(c + 1) * dim].iter_mut().zip(u) {
                    *s += f64::from(x);
                }
            }
            for c in 0..params.nlist {
                // An empty list keeps its previous centroid.
                if counts[c] == 0 {
                    continue;
                }
                let mean: Vec<f32> = sums[c * dim..(c + 1) * dim].iter().map(|&s| s as f32).collect();
                let mean = unit(&mean);
                centroids[c * dim..(c + 1) * dim].copy_from_slice(&mean);
            }
            if !changed {
                break;
            }
        }

        let mut lists = vec![Vec::new(); params.nlist];
        for (i, u) in units.iter().enumerate() {
            lists[nearest(&centroids, dim, u)].push(i);
        }
        info!(vectors = rows.len(), nlist = params.nlist, "built ivf vector index");
        Ok(Self { rows, params, centroids, lists })
    }

    pub fn params(&self) -> IvfParams {
        self.params
    }

    /// Sizes of the inverted lists, for diagnostics.
    pub fn list_sizes(&self) -> Vec<usize> {
        self.lists.iter().map(Vec::len).collect()
    }

    pub fn to_map(&self) -> BTreeMap<ChunkId, Vec<f32>> {
        self.rows.to_map()
    }

    /// Rows of the closest lists: at least `nprobe` lists, and more until
    /// `top_k` candidates are gathered or every list is used. A short answer
    /// therefore always means the index holds fewer than `top_k` rows.
    fn candidate_rows(&self, query_unit: &[f32], top_k: usize) -> (Vec<usize>, usize) {
        let dim = self.rows.dim;
        let mut scored: Vec<(usize, f32)> =
            self.centroids.chunks_exact(dim).map(|c| dot(c, query_unit)).enumerate().collect();
        scored.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut candidates = Vec::new();
        let mut visited = 0usize;
        for (c, _) in &scored {
            if visited >= self.params.nprobe && candidates.len() >= top_k {
                break;
            }
            candidates.extend_from_slice(&self.lists[*c]);
            visited += 1;
        }
        candidates.sort_unstable();
        (candidates, visited)
    }
}

impl VectorIndex for IvfIndex {
    fn dim(&self) -> usize {
        self.rows.dim
    }

    fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let query_norm = self.rows.check_query(embedding, top_k)?;
        if self.rows.len() == 0 {
            return Ok(Vec::new());
        }
        let (candidates, visited) = self.candidate_rows(&unit(embedding), top_k);
        let scanned = candidates.len();
        let hits = self.rows.rank(candidates, embedding, query_norm, top_k);
        debug!(visited, scanned, returned = hits.len(), "ivf vector query");
        Ok(hits)
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn contains(&self, id: &ChunkId) -> bool {
        self.rows.position(id).is_some()
    }
}
