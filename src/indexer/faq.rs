use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Chunk, Chunker, Metadata, tagged_metadata};
use crate::tokenizer::slugify;

/// Section id used when a FAQ document has no numbered questions.
pub const FAQ_FALLBACK_SECTION: &str = "faq_all";

// Matches: ## 3. Can Ayurveda help with stress and sleep?
static QUESTION_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^##\s*\d+\.\s*(.+?)\s*$").expect("valid FAQ heading regex"));

/// One question/answer pair. An empty field counts as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqPair {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

impl FaqPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Extracts `## <n>. <question>` headings and the answer text below each.
///
/// Text before the first numbered heading (usually the document title) is
/// not part of any pair.
pub fn parse_faq(content: &str) -> Vec<FaqPair> {
    let mut pairs = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in content.lines() {
        if let Some(caps) = QUESTION_HEADING.captures(line) {
            if let Some((question, answer)) = current.take() {
                pairs.push(FaqPair::new(question, answer.join("\n").trim()));
            }
            current = Some((caps[1].to_string(), Vec::new()));
        } else if let Some((_, answer)) = current.as_mut() {
            answer.push(line);
        }
    }

    if let Some((question, answer)) = current {
        pairs.push(FaqPair::new(question, answer.join("\n").trim()));
    }

    pairs
}

impl Chunker {
    /// One chunk per pair; question and answer are both searchable.
    pub fn chunk_faq(&mut self, pairs: &[FaqPair], doc_id: &str, metadata: &Metadata) -> Vec<Chunk> {
        let mut chunks = Vec::with_capacity(pairs.len());

        for (i, pair) in pairs.iter().enumerate() {
            let number = i + 1;
            let question = pair.question.trim();
            let answer = pair.answer.trim();

            let slug = slugify(question);
            let section_id = if slug.is_empty() {
                format!("faq_{number}")
            } else {
                format!("faq_{number}_{slug}")
            };

            if question.is_empty() {
                self.record_malformed(doc_id, &section_id, "question");
            }
            if answer.is_empty() {
                self.record_malformed(doc_id, &section_id, "answer");
            }

            let mut pair_meta = tagged_metadata(metadata, "faq");
            pair_meta.insert("faq_number".to_string(), number.to_string());
            pair_meta.insert("question".to_string(), question.to_string());

            let text = format!("Q: {question}\n\nA: {answer}");
            chunks.push(self.make_chunk(doc_id, section_id, text, pair_meta));
        }

        chunks
    }

    /// Parses FAQ markdown and chunks it. A document without numbered
    /// questions becomes a single chunk rather than being dropped.
    pub fn chunk_faq_document(&mut self, content: &str, doc_id: &str, metadata: &Metadata) -> Vec<Chunk> {
        let pairs = parse_faq(content);
        if !pairs.is_empty() {
            return self.chunk_faq(&pairs, doc_id, metadata);
        }
        if content.trim().is_empty() {
            return Vec::new();
        }

        vec![self.make_chunk(
            doc_id,
            FAQ_FALLBACK_SECTION.to_string(),
            content.to_string(),
            tagged_metadata(metadata, "faq"),
        )]
    }
}
