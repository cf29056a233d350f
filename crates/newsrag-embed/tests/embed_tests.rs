use newsrag_core::config::EmbeddingConfig;
use newsrag_core::traits::Embedder;
use newsrag_embed::{get_default_embedder, resolve_model_dir, HashingEmbedder};

#[test]
fn fake_embedder_shapes_and_determinism() {
    // Force the hashing embedder to avoid loading a large model
    std::env::set_var("NEWSRAG_USE_FAKE_EMBEDDINGS", "1");

    let config = EmbeddingConfig { dimension: 384, ..EmbeddingConfig::default() };
    let embedder = get_default_embedder(&config).expect("embedder");
    assert_eq!(embedder.embedder_id(), "hash:d384");

    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384, "embedding dim follows configuration");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    assert_eq!(v1, v2, "deterministic for same input");
}

#[test]
fn query_and_passage_embeddings_agree_for_hashing() {
    let embedder = HashingEmbedder::new(128);
    assert_eq!(embedder.embed_query("picket line").unwrap(), embedder.embed("picket line").unwrap());
}

#[test]
fn missing_model_directory_is_reported() {
    std::env::remove_var("NEWSRAG_MODEL_DIR");
    let err = resolve_model_dir(Some("/nonexistent/newsrag/model")).unwrap_err();
    assert!(err.to_string().contains("model directory"));
}
