//! newsrag-text
//!
//! BM25 lexical index over chunks. Tokenisation goes through one tantivy
//! analyzer (see `tantivy_utils`) for both indexing and querying; postings,
//! scoring and persistence live in `index` and `search`.
pub mod index;
pub mod search;
pub mod tantivy_utils;

pub use index::Bm25Index;
pub use tantivy_utils::Analyzer;
