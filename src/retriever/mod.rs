//! Hybrid lexical retrieval over an [`Index`].
//!
//! Candidates are every chunk sharing at least one term with the query. Each
//! candidate gets a [`ScoreBreakdown`]; the ranking is by composite score,
//! then coverage, then chunk id, and the top K are labelled with a
//! [`Confidence`].

pub mod handle;
pub mod scoring;

pub use handle::IndexHandle;
pub use scoring::ScoreBreakdown;

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ScoringConfig;
use crate::indexer::{Chunk, ChunkId, Index};
use crate::tokenizer::tokenize;

/// Default retrieval cut.
pub const DEFAULT_TOP_K: usize = 4;

/// Errors raised before any scoring happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    #[error("retrieval attempted before an index was built")]
    IndexNotBuilt,
}

/// How well the returned chunks support an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Two or more chunks above the relevance floor.
    High,
    /// Exactly one chunk above the relevance floor.
    Low,
    /// Nothing above the relevance floor, or nothing retrieved.
    None,
}

impl Confidence {
    /// Classifies a ranking by how many scores are strictly above `floor`.
    pub fn classify(scores: impl IntoIterator<Item = f64>, floor: f64) -> Self {
        match scores.into_iter().filter(|&s| s > floor).count() {
            0 => Confidence::None,
            1 => Confidence::Low,
            _ => Confidence::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Low => "low",
            Confidence::None => "none",
        }
    }
}

/// A chunk with its composite score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult<'a> {
    pub ranked: Vec<RankedChunk<'a>>,
    pub confidence: Confidence,
}

impl RetrievalResult<'_> {
    /// No chunks, confidence `none`. Also the outcome of an empty query.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ranked: Vec::new(),
            confidence: Confidence::None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// Composite score descending, then coverage descending, then id ascending.
fn rank_order(a: &RankedChunk<'_>, b: &RankedChunk<'_>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.breakdown.coverage.total_cmp(&a.breakdown.coverage))
        .then_with(|| a.chunk.id.cmp(&b.chunk.id))
}

/// Scores candidates with a fixed set of [`ScoringConfig`] constants.
#[derive(Debug, Clone, Default)]
pub struct Retriever {
    config: ScoringConfig,
}

impl Retriever {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Rank the chunks of `index` against `query` and keep the best `k`.
    ///
    /// An empty or out-of-vocabulary query yields [`RetrievalResult::empty`].
    pub fn retrieve<'a>(&self, index: &'a Index, query: &str, k: usize) -> RetrievalResult<'a> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            debug!("Empty query after normalization: {query:?}");
            return RetrievalResult::empty();
        }

        let candidates: BTreeSet<ChunkId> = query_terms
            .iter()
            .filter_map(|term| index.postings(term))
            .flatten()
            .copied()
            .collect();

        debug!(
            "Query {query:?}: {} terms, {} candidates",
            query_terms.len(),
            candidates.len()
        );

        let mut ranked: Vec<RankedChunk<'a>> = candidates
            .into_iter()
            .filter_map(|id| index.chunk(id))
            .map(|chunk| {
                let breakdown = self.score(index, chunk, &query_terms);
                RankedChunk {
                    chunk,
                    score: breakdown.composite,
                    breakdown,
                }
            })
            .collect();

        ranked.sort_by(rank_order);
        ranked.truncate(k);

        let confidence = Confidence::classify(
            ranked.iter().map(|r| r.score),
            self.config.relevance_floor,
        );

        RetrievalResult { ranked, confidence }
    }

    /// All four sub-scores of one chunk for already-tokenized query terms.
    pub fn score(&self, index: &Index, chunk: &Chunk, query_terms: &[String]) -> ScoreBreakdown {
        let cfg = &self.config;
        ScoreBreakdown::compose(
            scoring::term_frequency_score(index, chunk.id, query_terms, cfg),
            scoring::coverage_score(query_terms, &chunk.terms),
            scoring::phrase_score(query_terms, &chunk.terms, cfg.phrase_window),
            scoring::metadata_boost(query_terms, &chunk.metadata, cfg),
            cfg,
        )
    }
}

/// [`Retriever::retrieve`] with the default constants.
pub fn retrieve<'a>(index: &'a Index, query: &str, k: usize) -> RetrievalResult<'a> {
    Retriever::default().retrieve(index, query, k)
}
