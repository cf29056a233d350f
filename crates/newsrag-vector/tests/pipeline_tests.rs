use newsrag_core::config::{VectorBackend, VectorConfig};
use newsrag_core::traits::{Embedder, VectorIndex};
use newsrag_core::types::{Chunk, ChunkId, DocumentMetadata};
use newsrag_embed::HashingEmbedder;
use newsrag_vector::{embed_chunks, EmbeddingCache, VectorStore};

fn chunks() -> Vec<Chunk> {
    let texts = [
        "steel workers strike at the gary mill",
        "dock workers walk out on the west coast",
        "city council debates the transit fare",
        "election night results from the fifth ward",
        "union hall meeting on wages and hours",
        "editorial on civil rights marches in the south",
    ];
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| Chunk {
            id: ChunkId::new(format!("issue{}", i / 2), (i % 2) as u32),
            text: (*t).to_string(),
            start_word: 0,
            end_word: t.split_whitespace().count(),
            metadata: DocumentMetadata::default(),
        })
        .collect()
}

#[test]
fn backfill_then_query_finds_the_source_chunk() {
    let embedder = HashingEmbedder::new(64);
    let chunks = chunks();
    let mut cache = EmbeddingCache::new();
    let report = embed_chunks(&chunks, &embedder, &mut cache, 64, 4, None).unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(report.vectors.len(), chunks.len());

    for backend in [VectorBackend::Flat, VectorBackend::Ivf] {
        let config = VectorConfig { backend, nlist: None, nprobe: 64 };
        let store = VectorStore::build(config, 64, report.vectors.clone(), Some(embedder.embedder_id().into())).unwrap();
        for chunk in &chunks {
            let q = embedder.embed(&chunk.text).unwrap();
            let hits = store.query(&q, 3).unwrap();
            assert_eq!(hits[0].id, chunk.id, "{backend:?}");
            assert!((hits[0].score - 1.0).abs() < 1e-5);
        }
    }
}

#[test]
fn persisted_index_answers_identically() {
    let embedder = HashingEmbedder::new(32);
    let chunks = chunks();
    let report = embed_chunks(&chunks, &embedder, &mut EmbeddingCache::new(), 32, 8, None).unwrap();
    let store = VectorStore::build(VectorConfig::default(), 32, report.vectors, None).unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("vectors.json");
    store.save(&path).unwrap();
    let reloaded = VectorStore::load(&path).unwrap();

    for q in ["workers strike", "election results", "civil rights", "transit"] {
        let e = embedder.embed_query(q).unwrap();
        assert_eq!(store.query(&e, 4).unwrap(), reloaded.query(&e, 4).unwrap());
    }
}

#[test]
fn query_with_wrong_dimension_fails() {
    let embedder = HashingEmbedder::new(16);
    let report = embed_chunks(&chunks(), &embedder, &mut EmbeddingCache::new(), 16, 8, None).unwrap();
    let store = VectorStore::build(VectorConfig::default(), 16, report.vectors, None).unwrap();
    let wrong = HashingEmbedder::new(8).embed("strike").unwrap();
    assert!(matches!(
        store.query(&wrong, 3),
        Err(newsrag_core::Error::DimensionMismatch { expected: 16, actual: 8 })
    ));
}
