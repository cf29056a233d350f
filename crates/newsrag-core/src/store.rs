//! Corpus store: chunk text and metadata addressable by [`ChunkId`].
//!
//! Both indexes are built from the store's chunks and the fusion ranker
//! hydrates final results from it. Ingestion is append-only; removing or
//! altering a chunk means building a new store.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::snapshot;
use crate::types::{Chunk, ChunkId};

const SNAPSHOT_KIND: &str = "corpus-store";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStore {
    chunks: BTreeMap<ChunkId, Chunk>,
}

impl CorpusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from chunks; duplicate ids are rejected.
    pub fn from_chunks<I: IntoIterator<Item = Chunk>>(chunks: I) -> Result<Self> {
        let mut store = Self::new();
        store.extend(chunks)?;
        Ok(store)
    }

    pub fn insert(&mut self, chunk: Chunk) -> Result<()> {
        if self.chunks.contains_key(&chunk.id) {
            return Err(Error::InvalidArgument(format!("chunk {} is already stored", chunk.id)));
        }
        self.chunks.insert(chunk.id.clone(), chunk);
        Ok(())
    }

    pub fn extend<I: IntoIterator<Item = Chunk>>(&mut self, chunks: I) -> Result<()> {
        for c in chunks {
            self.insert(c)?;
        }
        Ok(())
    }

    pub fn get(&self, id: &ChunkId) -> Option<&Chunk> {
        self.chunks.get(id)
    }

    pub fn contains(&self, id: &ChunkId) -> bool {
        self.chunks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Earliest and latest known publication dates.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.iter().filter_map(Chunk::publication_date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Distinct newspaper titles, sorted.
    pub fn sources(&self) -> Vec<String> {
        self.iter().map(|c| c.metadata.source.clone()).collect::<BTreeSet<_>>().into_iter().collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        snapshot::write(path, SNAPSHOT_KIND, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        snapshot::read(path, SNAPSHOT_KIND)
    }
}
