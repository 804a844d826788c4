/// Corpus loading.
///
/// Reads manifests, directories, and glob patterns of markdown, FAQ, CSV,
/// and plain-text sources, and runs each through the matching chunker.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::indexer::{Chunk, Chunker, Index, MalformedRecord, Metadata, Row, TableTemplate, build_index};

const SAMPLE_CORPUS: &str = include_str!("../data/sample_corpus.json");

// ── Manifest types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Markdown,
    Faq,
    Csv,
    #[default]
    Text,
}

/// One entry of a corpus manifest. Either `content` or `path` (relative to
/// the manifest) supplies the source.
#[derive(Debug, Clone, Deserialize)]
pub struct CorpusDocument {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: DocumentKind,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub path: Option<String>,
    /// Key column for `csv` documents; defaults to the first column.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Manifest {
    List(Vec<CorpusDocument>),
    Wrapped { documents: Vec<CorpusDocument> },
}

impl Manifest {
    fn into_documents(self) -> Vec<CorpusDocument> {
        match self {
            Manifest::List(docs) | Manifest::Wrapped { documents: docs } => docs,
        }
    }
}

// ── Corpus ───────────────────────────────────────────────────────────

/// Chunks produced from a set of sources.
#[derive(Debug, Default)]
pub struct Corpus {
    pub chunks: Vec<Chunk>,
    pub malformed: Vec<MalformedRecord>,
}

impl Corpus {
    /// Load a manifest file, a directory, or a glob pattern.
    pub fn load(path: &str) -> Result<Self> {
        let mut loader = Loader::default();

        if path.contains(['*', '?']) {
            let mut files: Vec<PathBuf> = glob::glob(path)
                .with_context(|| format!("invalid glob pattern: {path}"))?
                .flatten()
                .filter(|p| p.is_file())
                .collect();
            files.sort();
            for file in files {
                loader.load_file(&file)?;
            }
        } else {
            let p = Path::new(path);
            if p.is_dir() {
                for file in walk_files(p)? {
                    loader.load_file(&file)?;
                }
            } else if p.is_file() {
                loader.load_file(p)?;
            } else {
                bail!("corpus path not found: {path}");
            }
        }

        Ok(loader.finish())
    }

    /// Parse a JSON manifest; relative `path` entries resolve against `base_dir`.
    pub fn from_manifest_str(json: &str, base_dir: &Path) -> Result<Self> {
        let mut loader = Loader::default();
        loader.load_manifest_str(json, base_dir)?;
        Ok(loader.finish())
    }

    pub fn from_documents(documents: &[CorpusDocument], base_dir: &Path) -> Result<Self> {
        let mut loader = Loader::default();
        for doc in documents {
            loader.load_document(doc, base_dir)?;
        }
        Ok(loader.finish())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn into_index(self) -> Index {
        build_index(self.chunks)
    }
}

/// The bundled Ayurveda demo corpus: a primer, a FAQ, a product catalog,
/// and a clinic programme.
pub fn sample_corpus() -> Result<Corpus> {
    Corpus::from_manifest_str(SAMPLE_CORPUS, Path::new("."))
}

// ── Loader ───────────────────────────────────────────────────────────

#[derive(Default)]
struct Loader {
    chunker: Chunker,
    chunks: Vec<Chunk>,
}

impl Loader {
    fn finish(self) -> Corpus {
        info!(
            "Loaded {} document chunks ({} malformed records recovered)",
            self.chunks.len(),
            self.chunker.malformed_records().len()
        );
        Corpus {
            malformed: self.chunker.malformed_records().to_vec(),
            chunks: self.chunks,
        }
    }

    fn load_file(&mut self, path: &Path) -> Result<()> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let doc_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let kind = match ext.as_str() {
            "json" => {
                let data = read_source(path)?;
                let base = path.parent().unwrap_or_else(|| Path::new("."));
                return self.load_manifest_str(&data, base);
            }
            "md" | "markdown" if doc_id.to_ascii_lowercase().starts_with("faq") => DocumentKind::Faq,
            "md" | "markdown" => DocumentKind::Markdown,
            "csv" => DocumentKind::Csv,
            "txt" => DocumentKind::Text,
            _ => {
                debug!("Skipping unsupported file: {}", path.display());
                return Ok(());
            }
        };

        let data = read_source(path)?;
        self.chunk_source(&doc_id, kind, Source::Text(&data), None, &Metadata::new())
    }

    fn load_manifest_str(&mut self, json: &str, base_dir: &Path) -> Result<()> {
        let manifest: Manifest =
            serde_json::from_str(json).context("failed to parse corpus manifest")?;
        for doc in manifest.into_documents() {
            self.load_document(&doc, base_dir)?;
        }
        Ok(())
    }

    fn load_document(&mut self, doc: &CorpusDocument, base_dir: &Path) -> Result<()> {
        let file_data;
        let source = match (&doc.content, &doc.path) {
            (Some(Value::String(text)), _) => Source::Text(text),
            (Some(Value::Array(items)), _) => Source::Rows(items),
            (Some(other), _) => bail!("document {}: unsupported content {other}", doc.id),
            (None, Some(rel)) => {
                file_data = read_source(&base_dir.join(rel))?;
                Source::Text(&file_data)
            }
            (None, None) => {
                warn!("Document {} has neither content nor path, skipping", doc.id);
                return Ok(());
            }
        };

        self.chunk_source(&doc.id, doc.kind, source, doc.key.as_deref(), &doc.metadata)
    }

    fn chunk_source(
        &mut self,
        doc_id: &str,
        kind: DocumentKind,
        source: Source<'_>,
        key: Option<&str>,
        metadata: &Metadata,
    ) -> Result<()> {
        let chunks = match (kind, source) {
            (DocumentKind::Markdown, Source::Text(text)) => {
                self.chunker.chunk_markdown(text, doc_id, metadata)
            }
            (DocumentKind::Faq, Source::Text(text)) => {
                self.chunker.chunk_faq_document(text, doc_id, metadata)
            }
            (DocumentKind::Text, Source::Text(text)) => {
                self.chunker.chunk_text(text, doc_id, metadata)
            }
            (DocumentKind::Csv, Source::Text(text)) => {
                let (headers, rows) =
                    parse_csv(text).with_context(|| format!("document {doc_id}: invalid CSV"))?;
                let template = template_for(&headers, key);
                self.chunker.chunk_table(&rows, doc_id, &template, metadata)
            }
            (DocumentKind::Csv, Source::Rows(items)) => {
                let (headers, rows) = rows_from_json(items);
                let template = template_for(&headers, key);
                self.chunker.chunk_table(&rows, doc_id, &template, metadata)
            }
            (kind, Source::Rows(_)) => {
                bail!("document {doc_id}: row content is only valid for csv, not {kind:?}")
            }
        };

        debug!("Chunked {doc_id} ({kind:?}) into {} chunks", chunks.len());
        self.chunks.extend(chunks);
        Ok(())
    }
}

enum Source<'a> {
    Text(&'a str),
    Rows(&'a [Value]),
}

// ── Helpers ──────────────────────────────────────────────────────────

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Recursive directory walk in a stable (sorted) order.
fn walk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    let mut files = Vec::new();
    for path in entries {
        if path.is_dir() {
            files.extend(walk_files(&path)?);
        } else {
            files.push(path);
        }
    }
    Ok(files)
}

fn template_for(headers: &[String], key: Option<&str>) -> TableTemplate {
    let mut template = if TableTemplate::matches_product_catalog(headers) {
        TableTemplate::product_catalog()
    } else {
        TableTemplate::from_headers(headers, "row")
    };
    if let Some(key) = key {
        template.key_column = key.to_string();
    }
    template
}

/// Parses CSV text with a header row. Short records simply lack the
/// trailing columns.
pub fn parse_csv(text: &str) -> Result<(Vec<String>, Vec<Row>)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("missing CSV header row")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(row);
    }

    Ok((headers, rows))
}

/// Rows given inline as JSON objects. Non-string values are stringified;
/// entries that are not objects become empty rows.
fn rows_from_json(items: &[Value]) -> (Vec<String>, Vec<Row>) {
    let mut headers: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(items.len());

    for item in items {
        let mut row = Row::new();
        if let Value::Object(map) = item {
            for (key, value) in map {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
                let value = match value {
                    Value::String(s) => s.clone(),
                    Value::Null => continue,
                    other => other.to_string(),
                };
                row.insert(key.clone(), value);
            }
        }
        rows.push(row);
    }

    (headers, rows)
}
