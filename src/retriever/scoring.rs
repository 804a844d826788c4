//! The four sub-scores of the hybrid ranking function.
//!
//! Each is a pure function of the query terms and one chunk, composed by
//! [`ScoreBreakdown::compose`] with fixed weights from [`ScoringConfig`].

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::config::ScoringConfig;
use crate::indexer::{ChunkId, Index, Metadata};
use crate::tokenizer::tokenize;

/// Per-heuristic scores of one chunk and their weighted sum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreBreakdown {
    pub term_frequency: f64,
    pub coverage: f64,
    pub phrase: f64,
    /// Already weighted and capped.
    pub metadata: f64,
    pub composite: f64,
}

impl ScoreBreakdown {
    pub fn compose(
        term_frequency: f64,
        coverage: f64,
        phrase: f64,
        metadata: f64,
        config: &ScoringConfig,
    ) -> Self {
        let w = &config.weights;
        let composite = w.term_frequency * term_frequency
            + w.coverage * coverage
            + w.phrase * phrase
            + metadata;

        Self {
            term_frequency,
            coverage,
            phrase,
            metadata,
            composite,
        }
    }
}

/// Query terms with duplicates removed, first occurrence wins.
pub fn distinct_terms(query_terms: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    query_terms
        .iter()
        .map(String::as_str)
        .filter(|t| seen.insert(*t))
        .collect()
}

/// `ln(N / df)`, floored so ubiquitous terms keep a small positive weight.
pub fn idf(index: &Index, term: &str, floor: f64) -> f64 {
    let df = index.doc_frequency(term);
    if df == 0 || index.is_empty() {
        return floor;
    }
    (index.len() as f64 / df as f64).ln().max(floor)
}

/// BM25-style saturated term frequency, summed over every query term
/// (duplicates included) present in the chunk.
pub fn term_frequency_score(
    index: &Index,
    chunk: ChunkId,
    query_terms: &[String],
    config: &ScoringConfig,
) -> f64 {
    let len = index.doc_length(chunk).max(1) as f64;
    let avg = index.avg_doc_length().max(1.0);
    let norm = 1.0 - config.b + config.b * len / avg;

    query_terms
        .iter()
        .map(|term| {
            let tf = f64::from(index.term_frequency(chunk, term));
            if tf == 0.0 {
                return 0.0;
            }
            let saturated = tf * (config.k1 + 1.0) / (tf + config.k1 * norm);
            idf(index, term, config.idf_floor) * saturated
        })
        .sum()
}

/// Fraction of distinct query terms that occur anywhere in the chunk.
pub fn coverage_score(query_terms: &[String], chunk_terms: &[String]) -> f64 {
    let distinct = distinct_terms(query_terms);
    if distinct.is_empty() {
        return 0.0;
    }

    let present: HashSet<&str> = chunk_terms.iter().map(String::as_str).collect();
    let matched = distinct.iter().filter(|t| present.contains(*t)).count();
    matched as f64 / distinct.len() as f64
}

/// Fraction of adjacent query-term pairs `(a, b)` that the chunk contains in
/// the same order with `b` at most `window` tokens after `a`.
pub fn phrase_score(query_terms: &[String], chunk_terms: &[String], window: usize) -> f64 {
    if query_terms.len() < 2 {
        return 0.0;
    }

    let wanted: HashSet<&str> = query_terms.iter().map(String::as_str).collect();
    let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
    for (pos, term) in chunk_terms.iter().enumerate() {
        if wanted.contains(term.as_str()) {
            positions.entry(term.as_str()).or_default().push(pos);
        }
    }

    let pairs = query_terms.len() - 1;
    let matched = query_terms
        .windows(2)
        .filter(|pair| {
            let (Some(first), Some(second)) = (
                positions.get(pair[0].as_str()),
                positions.get(pair[1].as_str()),
            ) else {
                return false;
            };
            first
                .iter()
                .any(|&p| second.iter().any(|&q| q > p && q - p <= window))
        })
        .count();

    matched as f64 / pairs as f64
}

/// Fraction of distinct query terms found among the tokenized metadata
/// values, weighted and capped so metadata only reorders near-ties.
pub fn metadata_boost(query_terms: &[String], metadata: &Metadata, config: &ScoringConfig) -> f64 {
    let distinct = distinct_terms(query_terms);
    if distinct.is_empty() || metadata.is_empty() {
        return 0.0;
    }

    let vocabulary: HashSet<String> = metadata.values().flat_map(|v| tokenize(v)).collect();
    let matched = distinct.iter().filter(|t| vocabulary.contains(**t)).count();
    let overlap = matched as f64 / distinct.len() as f64;

    (overlap * config.weights.metadata).min(config.metadata_cap)
}
