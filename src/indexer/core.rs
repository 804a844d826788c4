use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use super::{Chunk, ChunkId};

/// Inverted index over a fixed chunk set.
///
/// Immutable once built; a corpus change means building a new one. Every
/// table is ordered, so two builds over the same chunks compare equal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Index {
    chunks: Vec<Chunk>,
    positions: BTreeMap<ChunkId, usize>,
    term_to_chunks: BTreeMap<String, BTreeSet<ChunkId>>,
    term_frequency: BTreeMap<ChunkId, BTreeMap<String, u32>>,
    doc_length: BTreeMap<ChunkId, usize>,
    doc_frequency: BTreeMap<String, usize>,
    avg_doc_length: f64,
}

/// Builds the index in one pass over `chunks`.
///
/// A chunk whose id was already seen is skipped.
pub fn build_index(chunks: Vec<Chunk>) -> Index {
    let mut index = Index::default();
    let mut total_length = 0usize;

    for chunk in chunks {
        if index.positions.contains_key(&chunk.id) {
            warn!(
                "Skipping chunk {} ({}/{}): duplicate id",
                chunk.id, chunk.doc_id, chunk.section_id
            );
            continue;
        }

        let mut frequencies: BTreeMap<String, u32> = BTreeMap::new();
        for term in &chunk.terms {
            *frequencies.entry(term.clone()).or_insert(0) += 1;
        }

        for term in frequencies.keys() {
            index
                .term_to_chunks
                .entry(term.clone())
                .or_default()
                .insert(chunk.id);
            *index.doc_frequency.entry(term.clone()).or_insert(0) += 1;
        }

        total_length += chunk.terms.len();
        index.doc_length.insert(chunk.id, chunk.terms.len());
        index.term_frequency.insert(chunk.id, frequencies);
        index.positions.insert(chunk.id, index.chunks.len());
        index.chunks.push(chunk);
    }

    if !index.chunks.is_empty() {
        index.avg_doc_length = total_length as f64 / index.chunks.len() as f64;
    }

    info!(
        "Index built: {} chunks, {} distinct terms, avg length {:.1}",
        index.chunks.len(),
        index.term_to_chunks.len(),
        index.avg_doc_length
    );

    index
}

impl Index {
    /// Number of indexed chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks in the order they were indexed.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk> {
        self.positions.get(&id).map(|&pos| &self.chunks[pos])
    }

    /// Chunks containing `term`.
    pub fn postings(&self, term: &str) -> Option<&BTreeSet<ChunkId>> {
        self.term_to_chunks.get(term)
    }

    pub fn term_frequency(&self, id: ChunkId, term: &str) -> u32 {
        self.term_frequency
            .get(&id)
            .and_then(|tf| tf.get(term))
            .copied()
            .unwrap_or(0)
    }

    pub fn doc_length(&self, id: ChunkId) -> usize {
        self.doc_length.get(&id).copied().unwrap_or(0)
    }

    pub fn doc_frequency(&self, term: &str) -> usize {
        self.doc_frequency.get(term).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn avg_doc_length(&self) -> f64 {
        self.avg_doc_length
    }

    /// Number of distinct indexed terms.
    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.term_to_chunks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::Metadata;

    fn chunk(id: u64, text: &str) -> Chunk {
        Chunk::new(ChunkId(id), "doc", format!("s{id}"), text, Metadata::new())
    }

    fn sample() -> Vec<Chunk> {
        vec![
            chunk(0, "stress and sleep support"),
            chunk(1, "sleep sleep sleep"),
            chunk(2, "digestive comfort"),
        ]
    }

    #[test]
    fn test_build_statistics() {
        let index = build_index(sample());

        assert_eq!(index.len(), 3);
        assert_eq!(index.doc_length(ChunkId(0)), 4);
        assert_eq!(index.doc_length(ChunkId(1)), 3);
        assert_eq!(index.term_frequency(ChunkId(1), "sleep"), 3);
        assert_eq!(index.term_frequency(ChunkId(2), "sleep"), 0);
        assert_eq!(index.doc_frequency("sleep"), 2);
        assert_eq!(index.doc_frequency("missing"), 0);
        assert!((index.avg_doc_length() - 3.0).abs() < 1e-12);
        assert_eq!(index.vocabulary_size(), 6);
    }

    #[test]
    fn test_postings() {
        let index = build_index(sample());
        let sleep: Vec<ChunkId> = index.postings("sleep").unwrap().iter().copied().collect();
        assert_eq!(sleep, vec![ChunkId(0), ChunkId(1)]);
        assert!(index.postings("ashwagandha").is_none());
    }

    #[test]
    fn test_build_is_idempotent() {
        assert_eq!(build_index(sample()), build_index(sample()));
    }

    #[test]
    fn test_chunk_lookup() {
        let index = build_index(sample());
        assert_eq!(index.chunk(ChunkId(2)).unwrap().text, "digestive comfort");
        assert!(index.chunk(ChunkId(9)).is_none());
    }

    #[test]
    fn test_duplicate_ids_are_skipped() {
        let index = build_index(vec![chunk(0, "first"), chunk(0, "second")]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.chunks()[0].text, "first");
        assert_eq!(index.doc_frequency("second"), 0);
    }

    #[test]
    fn test_empty_index() {
        let index = build_index(Vec::new());
        assert!(index.is_empty());
        assert_eq!(index.avg_doc_length(), 0.0);
    }
}
