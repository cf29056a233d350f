//! Immutable bundle of everything a query reads: corpus store, lexical
//! index and vector index, built together from one chunk set.
//!
//! A snapshot is never mutated after construction. Rebuilding means building
//! a new snapshot and publishing it through [`crate::IndexHandle`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use newsrag_core::config::Settings;
use newsrag_core::store::CorpusStore;
use newsrag_core::traits::VectorIndex;
use newsrag_core::types::ChunkId;
use newsrag_core::{Error, Result};
use newsrag_text::Bm25Index;
use newsrag_vector::VectorStore;

const STORE_FILE: &str = "store.json";
const LEXICAL_FILE: &str = "lexical.json";
const VECTOR_FILE: &str = "vectors.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub chunks: usize,
    pub embedded_chunks: usize,
    pub vocabulary: usize,
    pub dimension: usize,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SearchSnapshot {
    store: CorpusStore,
    lexical: Bm25Index,
    vector: VectorStore,
}

impl SearchSnapshot {
    /// Build both indexes from `store` in parallel.
    ///
    /// Chunks without an embedding are still searchable lexically; an
    /// embedding for a chunk the store does not hold is rejected.
    #[instrument(skip_all, fields(chunks = store.len(), vectors = vectors.len()))]
    pub fn build(
        store: CorpusStore,
        vectors: BTreeMap<ChunkId, Vec<f32>>,
        settings: &Settings,
        embedder_id: Option<String>,
    ) -> Result<Self> {
        settings.validate()?;
        if let Some(orphan) = vectors.keys().find(|id| !store.contains(id)) {
            return Err(Error::InvalidArgument(format!("embedding for unknown chunk {orphan}")));
        }
        let (lexical, vector) = thread::scope(|s| {
            let lexical = s.spawn(|| Bm25Index::build(store.iter(), settings.bm25));
            let vector = s.spawn(|| {
                VectorStore::build(settings.vector, settings.embedding.dimension, vectors, embedder_id)
            });
            (join(lexical), join(vector))
        });
        let snapshot = Self { store, lexical: lexical?, vector: vector? };
        info!(
            chunks = snapshot.store.len(),
            embedded = snapshot.vector.len(),
            "built search snapshot"
        );
        Ok(snapshot)
    }

    /// A snapshot over no documents; every search returns nothing.
    pub fn empty(settings: &Settings) -> Result<Self> {
        Self::build(CorpusStore::new(), BTreeMap::new(), settings, None)
    }

    pub fn store(&self) -> &CorpusStore {
        &self.store
    }

    pub fn lexical(&self) -> &Bm25Index {
        &self.lexical
    }

    pub fn vector(&self) -> &VectorStore {
        &self.vector
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            chunks: self.store.len(),
            embedded_chunks: self.vector.len(),
            vocabulary: self.lexical.vocabulary_size(),
            dimension: self.vector.dim(),
            date_range: self.store.date_range(),
            sources: self.store.sources(),
        }
    }

    /// Write the three artifacts into `dir`, replacing any previous snapshot
    /// there only once the new one is complete.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let staging = sibling(dir, "partial");
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;
        self.store.save(&staging.join(STORE_FILE))?;
        self.lexical.save(&staging.join(LEXICAL_FILE))?;
        self.vector.save(&staging.join(VECTOR_FILE))?;

        let previous = sibling(dir, "old");
        if dir.exists() {
            if previous.exists() {
                fs::remove_dir_all(&previous)?;
            }
            fs::rename(dir, &previous)?;
        }
        fs::rename(&staging, dir)?;
        if previous.exists() {
            fs::remove_dir_all(&previous)?;
        }
        info!(dir = %dir.display(), "saved search snapshot");
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let store = CorpusStore::load(&dir.join(STORE_FILE))?;
        let lexical = Bm25Index::load(&dir.join(LEXICAL_FILE))?;
        let vector = VectorStore::load(&dir.join(VECTOR_FILE))?;
        if lexical.len() != store.len() {
            return Err(Error::Snapshot {
                path: dir.to_path_buf(),
                reason: format!("lexical index covers {} chunks, store holds {}", lexical.len(), store.len()),
            });
        }
        info!(dir = %dir.display(), chunks = store.len(), "loaded search snapshot");
        Ok(Self { store, lexical, vector })
    }
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, Result<T>>) -> Result<T> {
    handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let name = dir.file_name().map_or_else(|| "snapshot".into(), |n| n.to_string_lossy().to_string());
    dir.with_file_name(format!("{name}.{suffix}"))
}
