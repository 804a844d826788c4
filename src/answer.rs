//! Extractive answer composition.
//!
//! Turns a ranking into a short answer built from sentences of the top
//! chunks, each followed by an inline `[n]` marker pointing at a citation.

use serde::Serialize;

use crate::config::AnswerConfig;
use crate::retriever::{Confidence, RetrievalResult};

/// Answer text used when nothing was retrieved.
pub const NO_ANSWER: &str = "No relevant information found in the corpus.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub doc_id: String,
    pub section_id: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub confidence: Confidence,
}

/// First `max` characters of `text`, with `...` appended when cut.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn prefix_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

/// Splits on `.`, `!` or `?` followed by whitespace, and on line breaks.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let end = match c {
            '\n' => Some(i),
            '.' | '!' | '?' if chars.peek().is_some_and(|(_, next)| next.is_whitespace()) => {
                Some(i + c.len_utf8())
            }
            _ => None,
        };
        if let Some(end) = end {
            sentences.push(text[start..end].trim());
            start = end;
        }
    }
    sentences.push(text[start..].trim());

    sentences.retain(|s| !s.is_empty());
    sentences
}

/// Builds an answer from the top of `result`.
///
/// Up to `max_sources` chunks become citations; the first sentence longer
/// than `min_sentence_chars` from each of the first `sentence_sources`
/// chunks forms the answer text.
pub fn compose_answer(result: &RetrievalResult<'_>, config: &AnswerConfig) -> Answer {
    if result.is_empty() || config.max_sources == 0 {
        return Answer {
            answer: NO_ANSWER.to_string(),
            citations: Vec::new(),
            confidence: Confidence::None,
        };
    }

    let forwarded = &result.ranked[..result.ranked.len().min(config.max_sources)];

    let citations: Vec<Citation> = forwarded
        .iter()
        .map(|r| {
            let chunk = r.chunk;
            let context = if chunk.raw_length > config.max_context_chars {
                truncate_chars(&chunk.text, config.max_context_chars)
            } else {
                chunk.text.clone()
            };
            Citation {
                doc_id: chunk.doc_id.clone(),
                section_id: chunk.section_id.clone(),
                snippet: prefix_chars(&context, config.snippet_chars).to_string(),
            }
        })
        .collect();

    let parts: Vec<String> = forwarded
        .iter()
        .take(config.sentence_sources)
        .enumerate()
        .filter_map(|(i, r)| {
            split_sentences(&r.chunk.text)
                .into_iter()
                .find(|s| s.chars().count() > config.min_sentence_chars)
                .map(|s| format!("{s} [{}]", i + 1))
        })
        .collect();

    let answer = if parts.is_empty() {
        let top = &forwarded[0].chunk.text;
        format!("{} [1]", truncate_chars(top, config.fallback_chars))
    } else {
        parts.join(" ")
    };

    Answer {
        answer,
        citations,
        confidence: result.confidence,
    }
}
