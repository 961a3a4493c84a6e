//! Domain types shared by the index, the embedders and the RAG pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type ChunkId = u64;

/// A unit of stored text together with its embedding.
///
/// - `id`: assigned by the index at insertion, never reused
/// - `text`: trimmed, never empty
/// - `vector`: same length for every chunk of one index
/// - `source_name`: originating upload, used for citations
/// - `created_at`: insertion time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub text: String,
    pub vector: Vec<f32>,
    pub source_name: String,
    pub created_at: DateTime<Utc>,
}

/// One ranked result of an index query.
///
/// `score` is the cosine similarity between the query and the chunk, in
/// `[-1, 1]`; higher is better.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub chunk_id: ChunkId,
    pub text: String,
    pub source_name: String,
    pub score: f32,
}

impl SearchHit {
    pub fn from_chunk(chunk: &DocumentChunk, score: f32) -> Self {
        Self {
            chunk_id: chunk.id,
            text: chunk.text.clone(),
            source_name: chunk.source_name.clone(),
            score,
        }
    }
}

/// Plain text produced by an extraction collaborator, ready for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub source_name: String,
    pub text: String,
}

/// Trim `text` and reject it if nothing is left.
pub fn non_empty_trimmed(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyInput);
    }
    Ok(trimmed)
}
