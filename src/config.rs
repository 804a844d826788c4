/// Configuration module for lexrag.
///
/// Handles loading, validating, and providing default values for the
/// retrieval constants, the answer composer, and the corpus location.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Config file used when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "lexrag.json";

// ── Default value functions ──────────────────────────────────────────

fn default_corpus_path() -> String {
    "./corpus".to_string()
}

fn default_top_k() -> usize {
    4
}

fn default_k1() -> f64 {
    1.2
}

fn default_b() -> f64 {
    0.75
}

fn default_idf_floor() -> f64 {
    0.1
}

fn default_phrase_window() -> usize {
    3
}

fn default_metadata_cap() -> f64 {
    1.0
}

fn default_relevance_floor() -> f64 {
    2.5
}

fn default_tf_weight() -> f64 {
    1.0
}

fn default_coverage_weight() -> f64 {
    2.0
}

fn default_phrase_weight() -> f64 {
    1.0
}

fn default_metadata_weight() -> f64 {
    1.0
}

fn default_max_sources() -> usize {
    3
}

fn default_sentence_sources() -> usize {
    2
}

fn default_min_sentence_chars() -> usize {
    40
}

fn default_snippet_chars() -> usize {
    120
}

fn default_max_context_chars() -> usize {
    1500
}

fn default_fallback_chars() -> usize {
    400
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Manifest file, directory, or glob pattern of corpus sources.
    #[serde(default = "default_corpus_path")]
    pub corpus_path: String,

    /// Retrieval cut.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub retrieval: ScoringConfig,

    #[serde(default)]
    pub answer: AnswerConfig,
}

/// Constants of the hybrid ranking function.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ScoringConfig {
    /// BM25 term-frequency saturation.
    #[serde(default = "default_k1")]
    pub k1: f64,

    /// BM25 length normalization strength, in `[0, 1]`.
    #[serde(default = "default_b")]
    pub b: f64,

    /// Lower bound on inverse document frequency, so terms present in every
    /// chunk still count a little.
    #[serde(default = "default_idf_floor")]
    pub idf_floor: f64,

    /// Maximum token distance for two query terms to count as a phrase.
    #[serde(default = "default_phrase_window")]
    pub phrase_window: usize,

    #[serde(default)]
    pub weights: ScoreWeights,

    /// Upper bound on the metadata contribution to a composite score.
    #[serde(default = "default_metadata_cap")]
    pub metadata_cap: f64,

    /// A chunk scoring strictly above this supports an answer.
    #[serde(default = "default_relevance_floor")]
    pub relevance_floor: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ScoreWeights {
    #[serde(default = "default_tf_weight")]
    pub term_frequency: f64,

    #[serde(default = "default_coverage_weight")]
    pub coverage: f64,

    #[serde(default = "default_phrase_weight")]
    pub phrase: f64,

    #[serde(default = "default_metadata_weight")]
    pub metadata: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AnswerConfig {
    /// Chunks forwarded from the ranking into the answer.
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,

    /// Chunks a sentence is extracted from.
    #[serde(default = "default_sentence_sources")]
    pub sentence_sources: usize,

    #[serde(default = "default_min_sentence_chars")]
    pub min_sentence_chars: usize,

    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,

    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    #[serde(default = "default_fallback_chars")]
    pub fallback_chars: usize,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus_path: default_corpus_path(),
            top_k: default_top_k(),
            retrieval: ScoringConfig::default(),
            answer: AnswerConfig::default(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
            idf_floor: default_idf_floor(),
            phrase_window: default_phrase_window(),
            weights: ScoreWeights::default(),
            metadata_cap: default_metadata_cap(),
            relevance_floor: default_relevance_floor(),
        }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            term_frequency: default_tf_weight(),
            coverage: default_coverage_weight(),
            phrase: default_phrase_weight(),
            metadata: default_metadata_weight(),
        }
    }
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            max_sources: default_max_sources(),
            sentence_sources: default_sentence_sources(),
            min_sentence_chars: default_min_sentence_chars(),
            snippet_chars: default_snippet_chars(),
            max_context_chars: default_max_context_chars(),
            fallback_chars: default_fallback_chars(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to [`DEFAULT_CONFIG_PATH`].
    /// If the file does not exist, returns a default config and generates a
    /// template file for the default path.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            DEFAULT_CONFIG_PATH
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            if path == DEFAULT_CONFIG_PATH {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.top_k > 0, "top_k must be positive");
        anyhow::ensure!(!self.corpus_path.is_empty(), "corpus_path must be set");
        self.retrieval.validate()?;
        self.answer.validate()?;
        Ok(())
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.k1 > 0.0, "retrieval.k1 must be positive");
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.b),
            "retrieval.b must be within [0, 1]"
        );
        anyhow::ensure!(self.idf_floor > 0.0, "retrieval.idf_floor must be positive");
        anyhow::ensure!(
            self.phrase_window > 0,
            "retrieval.phrase_window must be positive"
        );
        anyhow::ensure!(
            self.metadata_cap >= 0.0,
            "retrieval.metadata_cap must not be negative"
        );
        anyhow::ensure!(
            self.relevance_floor >= 0.0,
            "retrieval.relevance_floor must not be negative"
        );

        let w = &self.weights;
        for (name, value) in [
            ("term_frequency", w.term_frequency),
            ("coverage", w.coverage),
            ("phrase", w.phrase),
            ("metadata", w.metadata),
        ] {
            anyhow::ensure!(
                value.is_finite() && value >= 0.0,
                "retrieval.weights.{name} must be a non-negative number"
            );
        }
        Ok(())
    }
}

impl AnswerConfig {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_sources > 0, "answer.max_sources must be positive");
        anyhow::ensure!(
            self.sentence_sources <= self.max_sources,
            "answer.sentence_sources cannot exceed answer.max_sources"
        );
        anyhow::ensure!(
            self.max_context_chars > 0,
            "answer.max_context_chars must be positive"
        );
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
