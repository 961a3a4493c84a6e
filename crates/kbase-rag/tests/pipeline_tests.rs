use std::sync::{Arc, Mutex};

use kbase_core::chunking::{Chunker, ChunkingConfig};
use kbase_core::config::{RetrievalPolicy, Settings};
use kbase_core::error::Result;
use kbase_core::traits::{AnswerGenerator, Embedder};
use kbase_core::types::SourceDocument;
use kbase_core::Error;
use kbase_embed::FallbackEmbedder;
use kbase_index::DocumentIndex;
use kbase_rag::{build_prompt, OfflineGenerator, RagPipeline, NOT_FOUND_ANSWER};

/// Records the context it was called with.
#[derive(Clone, Default)]
struct RecordingGenerator {
    calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl AnswerGenerator for RecordingGenerator {
    fn generate(&self, question: &str, context: &[String]) -> Result<String> {
        self.calls.lock().unwrap().push((question.to_string(), context.to_vec()));
        Ok(format!("{} passages", context.len()))
    }
}

fn pipeline(generator: Box<dyn AnswerGenerator>) -> RagPipeline {
    let index = Arc::new(DocumentIndex::new(Arc::new(FallbackEmbedder::new(64).unwrap())));
    RagPipeline::new(index, generator)
}

#[test]
fn ingest_chunks_and_indexes_every_piece() {
    let p = pipeline(Box::new(OfflineGenerator))
        .with_chunker(Chunker::new(ChunkingConfig { chunk_words: 3, overlap_words: 0 }).unwrap());

    let ids = p.ingest("one two three four five\n\nsix", "notes.txt").unwrap();

    assert_eq!(ids.len(), 3);
    let texts: Vec<String> = p.index().chunks().iter().map(|c| c.text.clone()).collect();
    assert_eq!(texts, vec!["one two three", "four five", "six"]);
    assert!(p.index().chunks().iter().all(|c| c.source_name == "notes.txt"));
}

#[test]
fn ingest_rejects_blank_upload() {
    let p = pipeline(Box::new(OfflineGenerator));
    assert!(matches!(p.ingest(" \n\n ", "empty.txt"), Err(Error::EmptyInput)));
    assert!(p.index().is_empty());
}

/// Fallback vectors for every text except `poison`.
struct PoisonedEmbedder {
    inner: FallbackEmbedder,
    poison: &'static str,
}

impl Embedder for PoisonedEmbedder {
    fn embedder_id(&self) -> &str {
        "poisoned"
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim() == self.poison {
            return Err(Error::Operation(format!("cannot embed {text:?}")));
        }
        self.inner.embed(text)
    }
}

#[test]
fn failed_ingest_stores_nothing() {
    let embedder = PoisonedEmbedder { inner: FallbackEmbedder::new(8).unwrap(), poison: "b" };
    let index = Arc::new(DocumentIndex::new(Arc::new(embedder)));
    let p = RagPipeline::new(index, Box::new(OfflineGenerator))
        .with_chunker(Chunker::new(ChunkingConfig { chunk_words: 1, overlap_words: 0 }).unwrap());

    assert!(matches!(p.ingest("a b c", "abc.txt"), Err(Error::Operation(_))));
    assert_eq!(p.index().len(), 0);

    let ids = p.ingest("a c", "ac.txt").unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(p.index().sources(), vec!["ac.txt"]);
}

#[test]
fn ingest_all_counts_chunks() {
    let p = pipeline(Box::new(OfflineGenerator));
    let docs = vec![
        SourceDocument { source_name: "a.txt".into(), text: "alpha".into() },
        SourceDocument { source_name: "b.txt".into(), text: "bravo\n\ncharlie".into() },
    ];
    assert_eq!(p.ingest_all(&docs).unwrap(), 2, "short paragraphs pack into one chunk");
    assert_eq!(p.index().sources(), vec!["a.txt", "b.txt"]);
}

#[test]
fn answer_passes_ranked_context_and_cites_sources() {
    let generator = RecordingGenerator::default();
    let p = pipeline(Box::new(generator.clone()))
        .with_policy(RetrievalPolicy { top_k: 2, min_score: None });
    p.ingest("the budget meeting is on friday", "minutes.txt").unwrap();
    p.ingest("lunch menu for the week", "menu.txt").unwrap();
    p.ingest("parking rules", "rules.txt").unwrap();

    let answer = p.answer("  the budget meeting is on friday ").unwrap();

    assert_eq!(answer.question, "the budget meeting is on friday");
    assert_eq!(answer.text, "2 passages");
    assert_eq!(answer.citations.len(), 2);
    assert_eq!(
        answer.citations[0].source_name, "minutes.txt",
        "identical text ranks first under fallback"
    );
    assert!((answer.citations[0].score - 1.0).abs() < 1e-6);

    let calls = generator.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1[0], "the budget meeting is on friday");
}

#[test]
fn threshold_can_drop_every_hit() {
    let generator = RecordingGenerator::default();
    let p = pipeline(Box::new(generator.clone()))
        .with_policy(RetrievalPolicy { top_k: 3, min_score: Some(0.99) });
    p.ingest("completely unrelated text", "a.txt").unwrap();

    assert!(p.retrieve("another question entirely").unwrap().is_empty());
    let answer = p.answer("another question entirely").unwrap();

    assert!(answer.citations.is_empty());
    assert_eq!(generator.calls.lock().unwrap()[0].1.len(), 0, "generator runs without context");
}

#[test]
fn empty_question_is_rejected() {
    let p = pipeline(Box::new(OfflineGenerator));
    assert!(matches!(p.answer("   "), Err(Error::EmptyInput)));
}

#[test]
fn offline_generator_quotes_best_passage_or_reports_not_found() {
    let p = pipeline(Box::new(OfflineGenerator));
    assert_eq!(p.answer("anything").unwrap().text, NOT_FOUND_ANSWER);

    p.ingest("fire safety drill at noon", "safety.txt").unwrap();
    let answer = p.answer("fire safety drill at noon").unwrap();
    assert!(answer.text.ends_with("fire safety drill at noon"));
}

#[test]
fn prompt_contains_context_and_question() {
    let prompt = build_prompt(" when? ", &["first".to_string(), "second".to_string()]);
    assert!(prompt.contains("CONTEXT:\nfirst\n\nsecond"));
    assert!(prompt.contains("QUESTION:\nwhen?"));
    assert!(prompt.contains(NOT_FOUND_ANSWER));
}

#[test]
fn from_settings_builds_working_pipeline() {
    let mut settings = Settings::default();
    settings.embedding.dimension = 16;
    settings.retrieval.top_k = 1;

    let p = RagPipeline::from_settings(&settings, Box::new(OfflineGenerator)).unwrap();
    p.ingest("hello world", "h.txt").unwrap();
    p.ingest("goodbye world", "g.txt").unwrap();

    assert_eq!(p.index().dim(), 16);
    assert_eq!(p.retrieve("hello").unwrap().len(), 1);

    settings.chunking.overlap_words = settings.chunking.chunk_words;
    assert!(RagPipeline::from_settings(&settings, Box::new(OfflineGenerator)).is_err());
}

#[test]
fn answer_serializes_to_json() {
    let p = pipeline(Box::new(OfflineGenerator));
    p.ingest("serialize me", "s.txt").unwrap();
    let json = serde_json::to_value(p.answer("serialize me").unwrap()).unwrap();
    assert_eq!(json["citations"][0]["source_name"], "s.txt");
}
