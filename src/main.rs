use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lexrag::answer::{Answer, compose_answer};
use lexrag::config::Config;
use lexrag::corpus::{Corpus, sample_corpus};
use lexrag::retriever::{IndexHandle, Retriever};

const DEMO_QUERIES: [&str; 3] = [
    "What are the key benefits of Ashwagandha Stress Balance Tablets?",
    "Are there any contraindications for Triphala Capsules?",
    "Can Ayurveda help with stress and sleep?",
];

#[derive(Parser)]
#[command(name = "lexrag", version, about = "Lexical retrieval with cited extractive answers")]
struct Cli {
    /// JSON config file (defaults to lexrag.json)
    #[arg(long, global = true, default_value = "")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a question from a corpus
    Query {
        question: String,
        /// Manifest, directory or glob pattern
        #[arg(long)]
        corpus: Option<String>,
        #[arg(long)]
        top_k: Option<usize>,
        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the example questions against the bundled corpus
    Demo,
    /// List the chunks a corpus produces
    Chunks {
        #[arg(long)]
        corpus: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    config.validate().context("invalid configuration")?;

    match cli.command {
        Command::Query {
            question,
            corpus,
            top_k,
            json,
        } => {
            let corpus = load_corpus(corpus.as_deref(), &config)?;
            let handle = IndexHandle::new();
            handle.rebuild(corpus.chunks);
            let answer = ask(&handle, &config, &question, top_k.unwrap_or(config.top_k))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                print_answer(&question, &answer);
            }
        }
        Command::Demo => {
            let corpus = sample_corpus()?;
            let handle = IndexHandle::new();
            handle.rebuild(corpus.chunks);
            for question in DEMO_QUERIES {
                let answer = ask(&handle, &config, question, config.top_k)?;
                print_answer(question, &answer);
            }
        }
        Command::Chunks { corpus } => {
            let corpus = load_corpus(corpus.as_deref(), &config)?;
            for chunk in &corpus.chunks {
                println!(
                    "{:>4}  {}/{}  ({} chars)",
                    chunk.id, chunk.doc_id, chunk.section_id, chunk.raw_length
                );
            }
            if !corpus.malformed.is_empty() {
                println!("\n{} malformed record(s)", corpus.malformed.len());
            }
        }
    }

    Ok(())
}

/// An explicit corpus path must exist; the configured default falls back to
/// the bundled sample when missing.
fn load_corpus(explicit: Option<&str>, config: &Config) -> Result<Corpus> {
    if let Some(path) = explicit {
        return Corpus::load(path);
    }
    let path = config.corpus_path.as_str();
    if path.contains(['*', '?']) || Path::new(path).exists() {
        Corpus::load(path)
    } else {
        info!("{path} not found, using the bundled sample corpus");
        sample_corpus()
    }
}

fn ask(handle: &IndexHandle, config: &Config, question: &str, top_k: usize) -> Result<Answer> {
    let index = handle.snapshot()?;
    let retriever = Retriever::new(config.retrieval.clone());
    let result = retriever.retrieve(&index, question, top_k);
    Ok(compose_answer(&result, &config.answer))
}

fn print_answer(question: &str, answer: &Answer) {
    println!("Q: {question}");
    println!("A: {}", answer.answer);
    println!("Confidence: {}", answer.confidence.as_str());
    for (i, citation) in answer.citations.iter().enumerate() {
        println!(
            "  [{}] {}/{}: {}",
            i + 1,
            citation.doc_id,
            citation.section_id,
            citation.snippet.replace('\n', " ")
        );
    }
    println!();
}
