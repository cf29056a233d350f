//! Hybrid search over a published snapshot: BM25 and vector candidates fused
//! by weighted reciprocal rank, filtered by metadata, hydrated from the
//! corpus store.

pub mod filter;
pub mod fusion;
pub mod handle;
pub mod search;
pub mod snapshot;

pub use filter::SearchFilter;
pub use fusion::{rrf_fuse, FusedCandidate};
pub use handle::IndexHandle;
pub use search::{HybridSearcher, SearchMode, SearchRequest, SearchResponse};
pub use snapshot::{SearchSnapshot, SnapshotStats};
