use super::{Chunk, Chunker, Metadata, tagged_metadata};
use crate::tokenizer::slugify;

/// Section id given to the text preceding the first heading.
pub const INTRODUCTION_SECTION: &str = "introduction";

/// A `##` heading line and the body lines that follow it.
#[derive(Debug, Clone, PartialEq)]
struct Section<'a> {
    title: &'a str,
    body: Vec<&'a str>,
}

/// Returns the title when `line` is a top-level (`##`) heading.
///
/// `###` and deeper headings stay part of the enclosing section.
fn heading_title(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("##")?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Splits markdown into the introduction lines and the `##` sections.
fn split_sections(content: &str) -> (Vec<&str>, Vec<Section<'_>>) {
    let mut intro = Vec::new();
    let mut sections: Vec<Section<'_>> = Vec::new();

    for line in content.lines() {
        if let Some(title) = heading_title(line) {
            sections.push(Section {
                title,
                body: Vec::new(),
            });
        } else if let Some(current) = sections.last_mut() {
            current.body.push(line);
        } else {
            intro.push(line);
        }
    }

    (intro, sections)
}

impl Chunker {
    /// Chunks sectioned prose: one chunk for a non-empty introduction plus one
    /// per `##` heading, in document order.
    ///
    /// Each section chunk is prefixed with its heading title so it reads
    /// standalone, and gets `section_title` in its metadata.
    pub fn chunk_markdown(&mut self, raw_text: &str, doc_id: &str, metadata: &Metadata) -> Vec<Chunk> {
        let (intro, sections) = split_sections(raw_text);
        let mut chunks = Vec::with_capacity(sections.len() + 1);

        let intro = intro.join("\n");
        let intro = intro.trim();
        if !intro.is_empty() {
            chunks.push(self.make_chunk(
                doc_id,
                INTRODUCTION_SECTION.to_string(),
                intro.to_string(),
                tagged_metadata(metadata, "section"),
            ));
        }

        for (i, section) in sections.iter().enumerate() {
            let slug = slugify(section.title);
            let section_id = if slug.is_empty() {
                format!("section_{}", i + 1)
            } else {
                format!("section_{}_{slug}", i + 1)
            };

            let body = section.body.join("\n");
            let body = body.trim();
            let text = match (section.title.is_empty(), body.is_empty()) {
                (_, true) => section.title.to_string(),
                (true, false) => body.to_string(),
                (false, false) => format!("{}\n\n{body}", section.title),
            };

            let mut section_meta = tagged_metadata(metadata, "section");
            section_meta.insert("section_title".to_string(), section.title.to_string());

            chunks.push(self.make_chunk(doc_id, section_id, text, section_meta));
        }

        chunks
    }
}
