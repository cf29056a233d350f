//! Backend selection and persistence for the vector index.
//!
//! Only the chunk -> embedding map and the backend settings are persisted.
//! Both backends are deterministic functions of that map, so a reload
//! answers every query exactly as before.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use newsrag_core::config::{VectorBackend, VectorConfig};
use newsrag_core::snapshot;
use newsrag_core::traits::VectorIndex;
use newsrag_core::types::{ChunkId, SearchHit};
use newsrag_core::Result;

use crate::flat::FlatIndex;
use crate::ivf::IvfIndex;

const SNAPSHOT_KIND: &str = "vector-index";

#[derive(Debug, Serialize, Deserialize)]
struct Persisted {
    config: VectorConfig,
    dim: usize,
    embedder_id: Option<String>,
    vectors: BTreeMap<ChunkId, Vec<f32>>,
}

#[derive(Debug, Clone)]
enum Backend {
    Flat(FlatIndex),
    Ivf(IvfIndex),
}

/// The serving vector index: one backend plus the settings it was built with.
#[derive(Debug, Clone)]
pub struct VectorStore {
    backend: Backend,
    config: VectorConfig,
    embedder_id: Option<String>,
}

impl VectorStore {
    pub fn build(
        config: VectorConfig,
        dim: usize,
        vectors: BTreeMap<ChunkId, Vec<f32>>,
        embedder_id: Option<String>,
    ) -> Result<Self> {
        config.validate()?;
        let backend = match config.backend {
            VectorBackend::Flat => Backend::Flat(FlatIndex::build(dim, vectors)?),
            VectorBackend::Ivf => Backend::Ivf(IvfIndex::build(dim, vectors, config.nlist, config.nprobe)?),
        };
        Ok(Self { backend, config, embedder_id })
    }

    pub fn config(&self) -> &VectorConfig {
        &self.config
    }

    /// Id of the embedder that produced the stored vectors, when known.
    pub fn embedder_id(&self) -> Option<&str> {
        self.embedder_id.as_deref()
    }

    fn index(&self) -> &dyn VectorIndex {
        match &self.backend {
            Backend::Flat(f) => f,
            Backend::Ivf(i) => i,
        }
    }

    pub fn to_map(&self) -> BTreeMap<ChunkId, Vec<f32>> {
        match &self.backend {
            Backend::Flat(f) => f.to_map(),
            Backend::Ivf(i) => i.to_map(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let persisted = Persisted {
            config: self.config,
            dim: self.dim(),
            embedder_id: self.embedder_id.clone(),
            vectors: self.to_map(),
        };
        snapshot::write(path, SNAPSHOT_KIND, &persisted)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let p: Persisted = snapshot::read(path, SNAPSHOT_KIND)?;
        let store = Self::build(p.config, p.dim, p.vectors, p.embedder_id)?;
        info!(path = %path.display(), vectors = store.len(), backend = ?store.config.backend, "loaded vector index");
        Ok(store)
    }
}

impl VectorIndex for VectorStore {
    fn dim(&self) -> usize {
        self.index().dim()
    }

    fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        self.index().query(embedding, top_k)
    }

    fn len(&self) -> usize {
        self.index().len()
    }

    fn contains(&self, id: &ChunkId) -> bool {
        self.index().contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectors() -> BTreeMap<ChunkId, Vec<f32>> {
        (0..40u32)
            .map(|i| {
                let a = i as f32 * 0.157;
                (ChunkId::new("doc", i), vec![a.cos(), a.sin(), 0.1 * (i % 3) as f32])
            })
            .collect()
    }

    #[test]
    fn both_backends_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        for backend in [VectorBackend::Flat, VectorBackend::Ivf] {
            let config = VectorConfig { backend, nlist: Some(4), nprobe: 2 };
            let store = VectorStore::build(config, 3, vectors(), Some("hash:d3".into())).unwrap();
            let path = tmp.path().join(format!("{backend:?}.json"));
            store.save(&path).unwrap();
            let back = VectorStore::load(&path).unwrap();
            assert_eq!(back.to_map(), vectors());
            assert_eq!(back.embedder_id(), Some("hash:d3"));
            assert_eq!(back.config().backend, backend);
            for q in [[1.0, 0.0, 0.0], [0.3, 0.9, 0.2], [-1.0, 0.2, 0.0]] {
                assert_eq!(store.query(&q, 5).unwrap(), back.query(&q, 5).unwrap());
            }
        }
    }

    #[test]
    fn flat_and_exhaustive_ivf_agree() {
        let flat = VectorStore::build(VectorConfig::default(), 3, vectors(), None).unwrap();
        let ivf_config = VectorConfig { backend: VectorBackend::Ivf, nlist: Some(5), nprobe: 5 };
        let ivf = VectorStore::build(ivf_config, 3, vectors(), None).unwrap();
        let q = [0.2, 0.7, 0.1];
        assert_eq!(flat.query(&q, 7).unwrap(), ivf.query(&q, 7).unwrap());
    }
}
