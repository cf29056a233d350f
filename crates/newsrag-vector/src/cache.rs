//! Embedding cache keyed by `(content_hash, embedder_id)`.
//!
//! Consulted before calling a provider and written through on misses, so
//! re-indexing an unchanged corpus (or re-chunking into identical windows)
//! does not re-embed anything. Persisted with the snapshot envelope for
//! offline reuse.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use newsrag_core::snapshot;
use newsrag_core::Result;

const SNAPSHOT_KIND: &str = "embedding-cache";

pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content_hash: String,
    pub embedder_id: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Default, Clone)]
pub struct EmbeddingCache {
    entries: HashMap<(String, String), Vec<f32>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, content_hash: &str, embedder_id: &str) -> Option<&[f32]> {
        self.entries.get(&(content_hash.to_string(), embedder_id.to_string())).map(Vec::as_slice)
    }

    pub fn put(&mut self, content_hash: String, embedder_id: String, vector: Vec<f32>) {
        self.entries.insert((content_hash, embedder_id), vector);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut entries: Vec<CacheEntry> = self
            .entries
            .iter()
            .map(|((h, e), v)| CacheEntry { content_hash: h.clone(), embedder_id: e.clone(), vector: v.clone() })
            .collect();
        entries.sort_by(|a, b| (&a.content_hash, &a.embedder_id).cmp(&(&b.content_hash, &b.embedder_id)));
        snapshot::write(path, SNAPSHOT_KIND, &entries)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let entries: Vec<CacheEntry> = snapshot::read(path, SNAPSHOT_KIND)?;
        info!(path = %path.display(), entries = entries.len(), "loaded embedding cache");
        let mut cache = Self::new();
        for e in entries {
            cache.put(e.content_hash, e.embedder_id, e.vector);
        }
        Ok(cache)
    }

    /// Load `path` if it exists, otherwise start empty.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_scoped_by_embedder() {
        let mut cache = EmbeddingCache::new();
        let h = content_hash("strike at the mill");
        cache.put(h.clone(), "hash:d4".into(), vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(cache.get(&h, "hash:d4"), Some(&[1.0f32, 0.0, 0.0, 0.0][..]));
        assert_eq!(cache.get(&h, "e5:d1024"), None);
        assert_eq!(cache.get(&content_hash("other text"), "hash:d4"), None);
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        assert_eq!(content_hash("a"), content_hash("a"));
        assert_ne!(content_hash("a"), content_hash("a "));
        assert_eq!(content_hash("a").len(), 64);
    }

    #[test]
    fn persists_across_runs() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cache.json");
        assert!(EmbeddingCache::load_or_default(&path).unwrap().is_empty());

        let mut cache = EmbeddingCache::new();
        cache.put("h1".into(), "m".into(), vec![0.25, -0.5]);
        cache.put("h2".into(), "m".into(), vec![0.1, 0.2]);
        cache.save(&path).unwrap();
        let back = EmbeddingCache::load_or_default(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.get("h2", "m"), Some(&[0.1f32, 0.2][..]));
    }
}
