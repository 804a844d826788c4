//! Shared text normalizer.
//!
//! Both the chunker (at index time) and the retriever (at query time) go
//! through [`tokenize`], so a term produced for a chunk always compares equal
//! to the same word typed in a query.

/// Split text into lowercase alphanumeric terms.
///
/// Any non-alphanumeric character acts as a separator, which strips
/// punctuation and collapses whitespace in one pass. Order and duplicates
/// are preserved.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Build an identifier-safe slug: lowercase ASCII alphanumerics joined by `_`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            slug.push(c);
            pending_sep = false;
        } else {
            pending_sep = true;
        }
    }

    slug
}
