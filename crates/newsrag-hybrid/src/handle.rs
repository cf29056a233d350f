use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::snapshot::SearchSnapshot;

/// Shared pointer to the snapshot currently being served.
///
/// Readers clone the `Arc` and release the lock before querying, so a
/// publish never waits on a slow search and a search never observes a
/// half-swapped state. Superseded snapshots are dropped when their last
/// in-flight query finishes.
#[derive(Debug)]
pub struct IndexHandle {
    current: RwLock<Arc<SearchSnapshot>>,
    generation: AtomicU64,
}

impl IndexHandle {
    pub fn new(snapshot: SearchSnapshot) -> Self {
        Self { current: RwLock::new(Arc::new(snapshot)), generation: AtomicU64::new(0) }
    }

    /// The snapshot to use for one query.
    pub fn load(&self) -> Arc<SearchSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Swap in a fully built snapshot and return the one it replaces.
    pub fn publish(&self, snapshot: SearchSnapshot) -> Arc<SearchSnapshot> {
        let next = Arc::new(snapshot);
        let chunks = next.store().len();
        let previous = std::mem::replace(&mut *self.current.write(), next);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        info!(generation, chunks, "published search snapshot");
        previous
    }

    /// Number of publishes since construction.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
