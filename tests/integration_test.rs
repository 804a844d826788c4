/// End-to-end integration tests for the lexrag pipeline.
///
/// Tests the complete flow:
///   Corpus → Chunker → Index → Retriever → Answer
use lexrag::answer::{NO_ANSWER, compose_answer};
use lexrag::config::{AnswerConfig, Config};
use lexrag::corpus::{Corpus, sample_corpus};
use lexrag::indexer::build_index;
use lexrag::retriever::{Confidence, DEFAULT_TOP_K, IndexHandle, RetrievalError, Retriever, retrieve};
use std::fs;
use tempfile::tempdir;

const ASHWAGANDHA_QUERY: &str = "What are the key benefits of Ashwagandha Stress Balance Tablets?";

/// The product row outranks the FAQ and two chunks clear the floor.
#[test]
fn test_ashwagandha_scenario() {
    let index = sample_corpus().unwrap().into_index();
    let result = retrieve(&index, ASHWAGANDHA_QUERY, DEFAULT_TOP_K);

    assert_eq!(result.ranked.len(), DEFAULT_TOP_K);
    let top = result.ranked[0].chunk;
    assert_eq!(top.doc_id, "product_catalog");
    assert_eq!(top.section_id, "product_KA-P002");
    assert_eq!(result.confidence, Confidence::High);

    let faq_rank = result
        .ranked
        .iter()
        .position(|r| r.chunk.section_id.starts_with("faq_3"));
    assert!(faq_rank.is_none_or(|rank| rank > 0));

    // Scores are non-increasing down the ranking.
    for pair in result.ranked.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    // The weighted term-frequency part outweighs coverage for every hit.
    let weights = Config::default().retrieval.weights;
    for hit in &result.ranked {
        let b = hit.breakdown;
        assert!(
            weights.term_frequency * b.term_frequency > weights.coverage * b.coverage,
            "{}: tf {} vs coverage {}",
            hit.chunk.section_id,
            b.term_frequency,
            b.coverage
        );
    }
}

#[test]
fn test_sample_corpus_shape() {
    let corpus = sample_corpus().unwrap();
    assert_eq!(corpus.len(), 13);
    assert!(corpus.malformed.is_empty());

    // Ids are unique and every chunk carries its derived terms.
    let index = corpus.into_index();
    assert_eq!(index.len(), 13);
    for chunk in index.chunks() {
        assert!(!chunk.text.is_empty());
        assert_eq!(chunk.terms, lexrag::tokenizer::tokenize(&chunk.text));
    }
}

#[test]
fn test_demo_queries_pick_expected_sources() {
    let index = sample_corpus().unwrap().into_index();

    let triphala = retrieve(&index, "Are there any contraindications for Triphala Capsules?", DEFAULT_TOP_K);
    assert_eq!(triphala.ranked[0].chunk.section_id, "product_KA-P001");

    let sleep = retrieve(&index, "Can Ayurveda help with stress and sleep?", DEFAULT_TOP_K);
    assert_eq!(
        sleep.ranked[0].chunk.section_id,
        "faq_3_can_ayurveda_help_with_stress_and_sleep"
    );
    assert_eq!(sleep.confidence, Confidence::High);

    let massage = retrieve(&index, "oil massage", DEFAULT_TOP_K);
    assert_eq!(massage.ranked[0].chunk.section_id, "section_2_core_components");
}

#[test]
fn test_composed_answer_cites_sources() {
    let index = sample_corpus().unwrap().into_index();
    let result = retrieve(&index, ASHWAGANDHA_QUERY, DEFAULT_TOP_K);
    let answer = compose_answer(&result, &AnswerConfig::default());

    assert_eq!(answer.confidence, Confidence::High);
    assert_eq!(answer.citations.len(), 3);
    assert_eq!(answer.citations[0].section_id, "product_KA-P002");
    assert!(
        answer
            .answer
            .starts_with("Product: Ashwagandha Stress Balance Tablets [1]"),
        "unexpected answer: {}",
        answer.answer
    );
    assert!(answer.answer.ends_with("[2]"));
    assert!(answer.citations.iter().all(|c| c.snippet.chars().count() <= 120));

    let json = serde_json::to_value(&answer).unwrap();
    assert_eq!(json["confidence"], "high");
    assert_eq!(json["citations"][0]["doc_id"], "product_catalog");
}

/// No query term in the vocabulary: empty ranking, no answer.
#[test]
fn test_out_of_vocabulary_query() {
    let index = sample_corpus().unwrap().into_index();
    let result = retrieve(&index, "quantum entanglement", DEFAULT_TOP_K);
    assert!(result.is_empty());
    assert_eq!(result.confidence, Confidence::None);

    let answer = compose_answer(&result, &AnswerConfig::default());
    assert_eq!(answer.answer, NO_ANSWER);
    assert!(answer.citations.is_empty());

    assert!(retrieve(&index, "?!  ...", DEFAULT_TOP_K).is_empty());
}

#[test]
fn test_rebuild_is_idempotent_and_deterministic() {
    let first = sample_corpus().unwrap().into_index();
    let second = sample_corpus().unwrap().into_index();
    assert_eq!(first, second);

    let a = retrieve(&first, ASHWAGANDHA_QUERY, DEFAULT_TOP_K);
    let b = retrieve(&second, ASHWAGANDHA_QUERY, DEFAULT_TOP_K);
    let ids = |r: &lexrag::RetrievalResult<'_>| r.ranked.iter().map(|c| c.chunk.id).collect::<Vec<_>>();
    assert_eq!(ids(&a), ids(&b));
    assert_eq!(a.confidence, b.confidence);

    // Rebuilding from the chunks of an index yields an equal index.
    let rebuilt = build_index(first.chunks().to_vec());
    assert_eq!(rebuilt, first);
}

#[test]
fn test_index_handle_lifecycle() {
    let handle = IndexHandle::new();
    assert_eq!(handle.snapshot().unwrap_err(), RetrievalError::IndexNotBuilt);

    handle.rebuild(sample_corpus().unwrap().chunks);
    let index = handle.snapshot().unwrap();
    let result = retrieve(&index, ASHWAGANDHA_QUERY, DEFAULT_TOP_K);
    assert_eq!(result.ranked[0].chunk.section_id, "product_KA-P002");
}

/// Load a directory of mixed sources, then query it.
#[test]
fn test_directory_corpus() {
    let temp_dir = tempdir().unwrap();
    let docs = temp_dir.path();

    fs::write(
        docs.join("faq_shipping.md"),
        "# Shipping\n\n## 1. Do you ship abroad?\n\nYes, parcels leave within ten working days.\n\n## 2. Can I return an opened bottle?\n\nOnly sealed products are accepted.",
    )
    .unwrap();
    fs::write(
        docs.join("catalog.csv"),
        "product_id,name,category\nKA-P010,Chyawanprash,Immunity\nKA-P011,Dashamoola Arishta,Vitality\n",
    )
    .unwrap();
    fs::write(docs.join("hours.txt"), "The clinic opens at nine every weekday.").unwrap();
    fs::write(docs.join("ignored.bin"), [0u8, 159, 146, 150]).unwrap();

    let corpus = Corpus::load(docs.to_str().unwrap()).unwrap();
    let sections: Vec<&str> = corpus.chunks.iter().map(|c| c.section_id.as_str()).collect();
    assert_eq!(
        sections,
        vec![
            "product_KA-P010",
            "product_KA-P011",
            "faq_1_do_you_ship_abroad",
            "faq_2_can_i_return_an_opened_bottle",
            "main",
        ]
    );
    // The catalog rows lack most template columns.
    assert!(!corpus.malformed.is_empty());

    let index = corpus.into_index();
    let result = retrieve(&index, "ship abroad", DEFAULT_TOP_K);
    assert_eq!(result.ranked.len(), 1);
    assert_eq!(result.ranked[0].chunk.doc_id, "faq_shipping");
}

#[test]
fn test_config_file_tunes_retrieval() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("lexrag.json");
    fs::write(&path, r#"{ "top_k": 2, "retrieval": { "relevance_floor": 100.0 } }"#).unwrap();

    let config = Config::load(path.to_str().unwrap()).unwrap();
    config.validate().unwrap();
    assert_eq!(config.top_k, 2);
    assert_eq!(config.retrieval.k1, 1.2);

    let index = sample_corpus().unwrap().into_index();
    let retriever = Retriever::new(config.retrieval.clone());
    let result = retriever.retrieve(&index, ASHWAGANDHA_QUERY, config.top_k);

    // Same ranking, but nothing clears the raised floor.
    assert_eq!(result.ranked.len(), 2);
    assert_eq!(result.ranked[0].chunk.section_id, "product_KA-P002");
    assert_eq!(result.confidence, Confidence::None);
}
