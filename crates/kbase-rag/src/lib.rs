//! Retrieval-augmented answering on top of [`DocumentIndex`].
//!
//! The index ranks; an [`AnswerGenerator`] phrases. This crate glues the two
//! together with chunked ingestion and a caller-side relevance threshold.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use kbase_core::chunking::Chunker;
use kbase_core::config::{RetrievalPolicy, Settings};
use kbase_core::error::{Error, Result};
use kbase_core::traits::AnswerGenerator;
use kbase_core::types::{non_empty_trimmed, ChunkId, SearchHit, SourceDocument};
use kbase_index::DocumentIndex;

pub mod prompt;

pub use prompt::{build_prompt, OfflineGenerator, NOT_FOUND_ANSWER};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    pub chunk_id: ChunkId,
    pub source_name: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub question: String,
    pub text: String,
    /// One entry per context chunk handed to the generator, best first.
    pub citations: Vec<Citation>,
}

pub struct RagPipeline {
    index: Arc<DocumentIndex>,
    chunker: Chunker,
    policy: RetrievalPolicy,
    generator: Box<dyn AnswerGenerator>,
}

impl RagPipeline {
    pub fn new(index: Arc<DocumentIndex>, generator: Box<dyn AnswerGenerator>) -> Self {
        Self { index, chunker: Chunker::default(), policy: RetrievalPolicy::default(), generator }
    }

    /// Wire embedder, index and chunker from validated settings.
    pub fn from_settings(settings: &Settings, generator: Box<dyn AnswerGenerator>) -> Result<Self> {
        settings.validate()?;
        let embedder = kbase_embed::build_embedder(&settings.embedding)?;
        let index = Arc::new(DocumentIndex::new(embedder));
        Ok(Self {
            index,
            chunker: Chunker::new(settings.chunking)?,
            policy: settings.retrieval,
            generator,
        })
    }

    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn with_policy(mut self, policy: RetrievalPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn index(&self) -> &Arc<DocumentIndex> {
        &self.index
    }

    pub fn policy(&self) -> &RetrievalPolicy {
        &self.policy
    }

    /// Chunk and index one upload. Either every chunk is stored or none is,
    /// and concurrent queries never see a partially ingested upload.
    pub fn ingest(&self, text: &str, source_name: &str) -> Result<Vec<ChunkId>> {
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Err(Error::EmptyInput);
        }
        let ids = self.index.add_many(&chunks, source_name).map_err(|e| {
            tracing::warn!(source = source_name, error = %e, "ingest failed, nothing stored");
            e
        })?;
        tracing::info!(source = source_name, chunks = ids.len(), "document ingested");
        Ok(ids)
    }

    /// Ingest a batch of documents; returns the number of chunks stored.
    pub fn ingest_all(&self, docs: &[SourceDocument]) -> Result<usize> {
        let mut total = 0;
        for doc in docs {
            total += self.ingest(&doc.text, &doc.source_name)?.len();
        }
        Ok(total)
    }

    /// Ranked hits for `question` after applying the relevance threshold.
    pub fn retrieve(&self, question: &str) -> Result<Vec<SearchHit>> {
        let mut hits = self.index.query(question, self.policy.top_k)?;
        if let Some(min) = self.policy.min_score {
            hits.retain(|h| h.score >= min);
        }
        Ok(hits)
    }

    /// Retrieve context and let the generator answer. With no relevant hits
    /// the generator is called with empty context.
    pub fn answer(&self, question: &str) -> Result<Answer> {
        let question = non_empty_trimmed(question)?;
        let hits = self.retrieve(question)?;
        let context: Vec<String> = hits.iter().map(|h| h.text.clone()).collect();
        let text = self.generator.generate(question, &context)?;
        let citations = hits
            .into_iter()
            .map(|h| Citation { chunk_id: h.chunk_id, source_name: h.source_name, score: h.score })
            .collect();
        Ok(Answer { question: question.to_string(), text, citations })
    }
}
