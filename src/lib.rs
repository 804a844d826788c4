//! # lexrag: Lexical Retrieval with Cited Answers
//!
//! Chunks a small heterogeneous corpus (markdown, FAQ, product tables),
//! builds an in-memory inverted index, ranks chunks for a question with a
//! BM25-style hybrid score and composes a short extractive answer with
//! citations and a confidence label.
//!
//! ## Architecture
//!
//! - **[`tokenizer`]**: Text normalization shared by indexing and querying
//! - **[`indexer`]**: Chunkers for the three source shapes and the inverted index
//! - **[`retriever`]**: Hybrid scoring, ranking, confidence and the swappable index handle
//! - **[`answer`]**: Extractive answer composition with `[n]` citation markers
//! - **[`corpus`]**: Manifest, directory and glob loading plus the bundled sample corpus
//! - **[`config`]**: Configuration loading, validation and defaults

pub mod answer;
pub mod config;
pub mod corpus;
pub mod indexer;
pub mod retriever;
pub mod tokenizer;

pub use answer::{Answer, Citation, compose_answer};
pub use indexer::{Chunk, ChunkId, Chunker, Index, build_index};
pub use retriever::{Confidence, RetrievalResult, Retriever, retrieve};
