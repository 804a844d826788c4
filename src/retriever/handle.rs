/// Shared, swappable reference to the current index.
///
/// Readers take an `Arc` snapshot and score against it without holding the
/// lock. A rebuild constructs the new index first and only then swaps the
/// reference, so no reader ever sees a half-built index.
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use super::RetrievalError;
use crate::indexer::{Chunk, Index, build_index};

#[derive(Debug, Default)]
pub struct IndexHandle {
    current: RwLock<Option<Arc<Index>>>,
}

impl IndexHandle {
    /// A handle with no index installed yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_index(index: Index) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(index))),
        }
    }

    /// The index queries should run against.
    pub fn snapshot(&self) -> Result<Arc<Index>, RetrievalError> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(RetrievalError::IndexNotBuilt)
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Installs `index`, returning the one it replaced. Snapshots taken
    /// earlier stay valid.
    pub fn replace(&self, index: Index) -> Option<Arc<Index>> {
        let next = Arc::new(index);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        guard.replace(next)
    }

    /// Builds an index from `chunks` outside the lock, then swaps it in.
    pub fn rebuild(&self, chunks: Vec<Chunk>) -> Arc<Index> {
        let index = Arc::new(build_index(chunks));
        info!("Swapping in rebuilt index ({} chunks)", index.len());
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Arc::clone(&index));
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{ChunkId, Metadata};
    use crate::retriever::{DEFAULT_TOP_K, retrieve};
    use std::thread;

    fn chunks(text: &str) -> Vec<Chunk> {
        vec![Chunk::new(ChunkId(0), "doc", "main", text, Metadata::new())]
    }

    #[test]
    fn test_snapshot_before_build() {
        let handle = IndexHandle::new();
        assert!(!handle.is_built());
        assert_eq!(handle.snapshot().unwrap_err(), RetrievalError::IndexNotBuilt);
    }

    #[test]
    fn test_rebuild_swaps_reference() {
        let handle = IndexHandle::new();
        handle.rebuild(chunks("triphala digestion"));
        let old = handle.snapshot().unwrap();

        handle.rebuild(chunks("brahmi oil"));
        let new = handle.snapshot().unwrap();

        // The earlier snapshot is untouched by the swap.
        assert!(old.postings("triphala").is_some());
        assert!(new.postings("triphala").is_none());
        assert!(new.postings("brahmi").is_some());
    }

    #[test]
    fn test_replace_returns_previous() {
        let handle = IndexHandle::with_index(build_index(chunks("first")));
        let previous = handle.replace(build_index(chunks("second"))).unwrap();
        assert!(previous.postings("first").is_some());
    }

    #[test]
    fn test_concurrent_readers() {
        let handle = Arc::new(IndexHandle::with_index(build_index(chunks("abhyanga oil massage"))));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let handle = Arc::clone(&handle);
                thread::spawn(move || {
                    let index = handle.snapshot().unwrap();
                    retrieve(&index, "oil massage", DEFAULT_TOP_K).ranked.len()
                })
            })
            .collect();

        for reader in readers {
            assert_eq!(reader.join().unwrap(), 1);
        }
    }
}
