//! Chunking and indexing.
//!
//! - [`markdown`], [`faq`], [`table`] turn the three source shapes into [`Chunk`]s
//! - [`core`] builds the immutable inverted [`Index`] over a chunk set

pub mod core;
pub mod faq;
pub mod markdown;
pub mod table;

pub use self::core::{Index, build_index};
pub use self::faq::FaqPair;
pub use self::table::{Row, TableTemplate};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::tokenizer::tokenize;

/// Section id of a document chunked as a single block of text.
pub const TEXT_SECTION: &str = "main";

/// String attributes attached to a chunk. Only used for boosting.
pub type Metadata = BTreeMap<String, String>;

/// Identifier assigned to a chunk when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(pub u64);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Minimal retrievable unit of corpus text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub section_id: String,
    pub text: String,
    /// Character count of `text`.
    pub raw_length: usize,
    /// `tokenize(text)`, kept alongside so scoring never re-tokenizes.
    pub terms: Vec<String>,
    pub metadata: Metadata,
}

impl Chunk {
    /// Build a chunk, deriving `raw_length` and `terms` from `text`.
    pub fn new(
        id: ChunkId,
        doc_id: impl Into<String>,
        section_id: impl Into<String>,
        text: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        let text = text.into();
        Self {
            id,
            doc_id: doc_id.into(),
            section_id: section_id.into(),
            raw_length: text.chars().count(),
            terms: tokenize(&text),
            text,
            metadata,
        }
    }
}

/// A source record that was missing a required field.
///
/// The field is rendered as empty and chunking carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    pub doc_id: String,
    pub section_id: String,
    pub field: String,
}

/// Turns source documents into chunks with ids that are never reused.
#[derive(Debug, Default)]
pub struct Chunker {
    next_id: u64,
    malformed: Vec<MalformedRecord>,
}

impl Chunker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records recovered so far, in the order they were encountered.
    pub fn malformed_records(&self) -> &[MalformedRecord] {
        &self.malformed
    }

    /// Number of chunks created by this chunker.
    #[must_use]
    pub fn chunks_created(&self) -> u64 {
        self.next_id
    }

    /// Unstructured text becomes a single chunk.
    pub fn chunk_text(&mut self, raw_text: &str, doc_id: &str, metadata: &Metadata) -> Vec<Chunk> {
        if raw_text.trim().is_empty() {
            return Vec::new();
        }
        vec![self.make_chunk(
            doc_id,
            TEXT_SECTION.to_string(),
            raw_text.to_string(),
            tagged_metadata(metadata, "text"),
        )]
    }

    pub(crate) fn make_chunk(
        &mut self,
        doc_id: &str,
        section_id: String,
        text: String,
        metadata: Metadata,
    ) -> Chunk {
        let id = ChunkId(self.next_id);
        self.next_id += 1;

        let text = text.trim().to_string();
        // Keeps the non-empty text invariant for records with nothing to render.
        let text = if text.is_empty() {
            section_id.clone()
        } else {
            text
        };

        Chunk::new(id, doc_id, section_id, text, metadata)
    }

    pub(crate) fn record_malformed(&mut self, doc_id: &str, section_id: &str, field: &str) {
        warn!("Malformed record {doc_id}/{section_id}: missing {field}, rendering it empty");
        self.malformed.push(MalformedRecord {
            doc_id: doc_id.to_string(),
            section_id: section_id.to_string(),
            field: field.to_string(),
        });
    }
}

/// Copy the document metadata and tag it with the chunk kind unless the
/// caller already set a `type`.
pub(crate) fn tagged_metadata(base: &Metadata, kind: &str) -> Metadata {
    let mut metadata = base.clone();
    metadata
        .entry("type".to_string())
        .or_insert_with(|| kind.to_string());
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_new_derives_terms_and_length() {
        let chunk = Chunk::new(
            ChunkId(7),
            "faq_general",
            "faq_1",
            "Q: Is it safe?",
            Metadata::new(),
        );
        assert_eq!(chunk.raw_length, 14);
        assert_eq!(chunk.terms, vec!["q", "is", "it", "safe"]);
        assert_eq!(chunk.terms, tokenize(&chunk.text));
    }

    #[test]
    fn test_chunker_ids_are_sequential() {
        let mut chunker = Chunker::new();
        let a = chunker.make_chunk("doc", "a".into(), "alpha".into(), Metadata::new());
        let b = chunker.make_chunk("doc", "b".into(), "beta".into(), Metadata::new());
        assert_eq!(a.id, ChunkId(0));
        assert_eq!(b.id, ChunkId(1));
        assert_eq!(chunker.chunks_created(), 2);
    }

    #[test]
    fn test_empty_text_falls_back_to_section_id() {
        let mut chunker = Chunker::new();
        let chunk = chunker.make_chunk("doc", "section_1".into(), "   ".into(), Metadata::new());
        assert_eq!(chunk.text, "section_1");
        assert!(!chunk.terms.is_empty());
    }

    #[test]
    fn test_chunk_text() {
        let mut chunker = Chunker::new();
        let chunks = chunker.chunk_text("  Opening hours are 9 to 5.  ", "notes", &Metadata::new());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].section_id, TEXT_SECTION);
        assert_eq!(chunks[0].text, "Opening hours are 9 to 5.");
        assert!(chunker.chunk_text("\n", "notes", &Metadata::new()).is_empty());
    }

    #[test]
    fn test_tagged_metadata_keeps_caller_type() {
        let mut base = Metadata::new();
        base.insert("type".into(), "catalog".into());
        assert_eq!(tagged_metadata(&base, "row")["type"], "catalog");
        assert_eq!(tagged_metadata(&Metadata::new(), "row")["type"], "row");
    }
}
