//! newsrag-vector
//!
//! Cosine-similarity vector indexes over chunk embeddings:
//! - `flat`: exact brute-force scan
//! - `ivf`: inverted-file partitions with exact re-scoring of visited lists
//! - `store`: backend selection and the persisted chunk -> embedding map
//! - `embed_backfill` + `cache`: batch embedding with a content-hash cache
pub mod cache;
pub mod embed_backfill;
pub mod flat;
pub mod ivf;
pub mod store;

pub use cache::EmbeddingCache;
pub use embed_backfill::{embed_chunks, EmbedFailure, EmbedReport};
pub use flat::FlatIndex;
pub use ivf::IvfIndex;
pub use store::VectorStore;
