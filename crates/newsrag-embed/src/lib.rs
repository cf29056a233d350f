//! newsrag-embed
//!
//! Embedding providers behind `newsrag_core::traits::Embedder`: a local
//! candle transformer (`model`) and a deterministic hashing embedder
//! (`hashing`). `NEWSRAG_USE_FAKE_EMBEDDINGS=1` switches
//! [`get_default_embedder`] to the hashing embedder for fast, model-free
//! runs.
pub mod device;
pub mod hashing;
pub mod model;
pub mod pool;
pub mod tokenize;

use anyhow::Result;
use tracing::info;

use newsrag_core::config::EmbeddingConfig;
use newsrag_core::traits::Embedder;

pub use hashing::HashingEmbedder;
pub use model::{resolve_model_dir, EmbeddingModel};
pub use pool::masked_mean_l2;

pub fn use_fake_embeddings() -> bool {
    std::env::var("NEWSRAG_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Build the configured embedder and check it against `embedding.dimension`.
pub fn get_default_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let embedder: Box<dyn Embedder> = if use_fake_embeddings() {
        info!(dim = config.dimension, "using hashing embedder");
        Box::new(HashingEmbedder::new(config.dimension))
    } else {
        let dir = resolve_model_dir(config.model_dir.as_deref())?;
        Box::new(EmbeddingModel::load(&dir, config.max_len)?)
    };
    newsrag_core::error::validate_dimension(config.dimension, embedder.dim())?;
    Ok(embedder)
}
