use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{Chunk, Chunker, Metadata, tagged_metadata};

/// One tabular record, keyed by column name.
pub type Row = BTreeMap<String, String>;

/// A labelled column rendered as `"<label>: <value>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateField {
    pub label: String,
    pub column: String,
}

/// How a row is rendered into prose and which column identifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableTemplate {
    /// Column holding the row's natural key (e.g. a SKU).
    pub key_column: String,
    /// Prefix for the row's section id: `<prefix>_<key>`.
    pub section_prefix: String,
    pub fields: Vec<TemplateField>,
}

impl TableTemplate {
    /// Layout of the product catalog export.
    #[must_use]
    pub fn product_catalog() -> Self {
        let fields = [
            ("Product", "name"),
            ("ID", "product_id"),
            ("Category", "category"),
            ("Format", "format"),
            ("Target concerns", "target_concerns"),
            ("Key herbs", "key_herbs"),
            ("Contraindications", "contraindications_short"),
            ("Tags", "internal_tags"),
        ];

        Self {
            key_column: "product_id".to_string(),
            section_prefix: "product".to_string(),
            fields: fields
                .iter()
                .map(|(label, column)| TemplateField {
                    label: (*label).to_string(),
                    column: (*column).to_string(),
                })
                .collect(),
        }
    }

    /// Generic layout: every header becomes a field labelled with its
    /// humanized name, and the first header is the key.
    pub fn from_headers<S: AsRef<str>>(headers: &[S], section_prefix: &str) -> Self {
        let fields = headers
            .iter()
            .map(|h| TemplateField {
                label: humanize(h.as_ref()),
                column: h.as_ref().to_string(),
            })
            .collect();

        Self {
            key_column: headers
                .first()
                .map(|h| h.as_ref().to_string())
                .unwrap_or_default(),
            section_prefix: section_prefix.to_string(),
            fields,
        }
    }

    /// Whether the rows look like the product catalog export.
    pub fn matches_product_catalog<S: AsRef<str>>(headers: &[S]) -> bool {
        let catalog = Self::product_catalog();
        headers.iter().any(|h| h.as_ref() == catalog.key_column)
            && headers.iter().any(|h| h.as_ref() == "name")
    }

    /// Renders the row and returns the columns that were missing or blank.
    fn render<'a>(&'a self, row: &Row) -> (String, Vec<&'a str>) {
        let mut lines = Vec::with_capacity(self.fields.len());
        let mut missing = Vec::new();

        for field in &self.fields {
            let value = row.get(&field.column).map(|v| v.trim()).unwrap_or_default();
            if value.is_empty() {
                missing.push(field.column.as_str());
            }
            lines.push(format!("{}: {value}", field.label).trim_end().to_string());
        }

        (lines.join("\n"), missing)
    }
}

/// `target_concerns` → `Target concerns`
fn humanize(column: &str) -> String {
    let spaced = column.replace(['_', '-'], " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Chunker {
    /// One chunk per row, rendered through `template`. Row fields are merged
    /// into the chunk metadata.
    pub fn chunk_table(
        &mut self,
        rows: &[Row],
        doc_id: &str,
        template: &TableTemplate,
        metadata: &Metadata,
    ) -> Vec<Chunk> {
        let mut chunks = Vec::with_capacity(rows.len());
        let mut seen = HashSet::new();

        for (i, row) in rows.iter().enumerate() {
            let number = i + 1;
            let key = row
                .get(&template.key_column)
                .map(|k| k.trim())
                .filter(|k| !k.is_empty());

            let base = match key {
                Some(key) => format!("{}_{key}", template.section_prefix),
                None => format!("{}_row_{number}", template.section_prefix),
            };
            let mut section_id = base.clone();
            let mut attempt = 1;
            while !seen.insert(section_id.clone()) {
                section_id = if attempt == 1 {
                    format!("{base}_{number}")
                } else {
                    format!("{base}_{number}_{attempt}")
                };
                attempt += 1;
            }

            let (text, missing) = template.render(row);
            if key.is_none() && !missing.contains(&template.key_column.as_str()) {
                self.record_malformed(doc_id, &section_id, &template.key_column);
            }
            for column in missing {
                self.record_malformed(doc_id, &section_id, column);
            }

            let mut row_meta = tagged_metadata(metadata, "row");
            for (column, value) in row {
                row_meta.insert(column.clone(), value.clone());
            }

            chunks.push(self.make_chunk(doc_id, section_id, text, row_meta));
        }

        chunks
    }
}
