use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use chrono::Utc;

use kbase_core::error::{Error, Result};
use kbase_core::traits::Embedder;
use kbase_core::types::{non_empty_trimmed, ChunkId, DocumentChunk, SearchHit};

use crate::similarity::{cosine_similarity, top_k};

/// In-memory, append-only store of embedded chunks with brute-force cosine
/// ranking.
///
/// Safe to share across threads. Embedding happens outside the lock; the
/// write lock is held only to append or delete, so ids follow insertion
/// order. Queries score a snapshot taken under the read lock, which means a
/// chunk added concurrently is either fully visible or not at all.
pub struct DocumentIndex {
    embedder: Arc<dyn Embedder>,
    dim: usize,
    state: RwLock<IndexState>,
}

#[derive(Default)]
struct IndexState {
    chunks: Vec<Arc<DocumentChunk>>,
    next_id: ChunkId,
}

impl DocumentIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        let dim = embedder.dim();
        Self { embedder, dim, state: RwLock::new(IndexState::default()) }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Dimensionality shared by every stored vector.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.read().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Trim, embed and append `text`. Identical inputs are stored twice.
    pub fn add(&self, text: &str, source_name: &str) -> Result<ChunkId> {
        let text = non_empty_trimmed(text)?;
        let vector = self.embedder.embed(text)?;
        self.push(text, source_name, vector)
    }

    /// Append a chunk whose vector was computed by the caller, e.g. on a
    /// blocking worker or when reloading externally persisted chunks.
    pub fn add_embedded(&self, text: &str, source_name: &str, vector: Vec<f32>) -> Result<ChunkId> {
        let text = non_empty_trimmed(text)?;
        self.push(text, source_name, vector)
    }

    /// Embed every text, then append them all under a single write lock.
    /// If any text is empty or fails to embed, nothing is stored, and readers
    /// never observe a partial batch.
    pub fn add_many<S: AsRef<str>>(&self, texts: &[S], source_name: &str) -> Result<Vec<ChunkId>> {
        let mut embedded = Vec::with_capacity(texts.len());
        for text in texts {
            let text = non_empty_trimmed(text.as_ref())?;
            let vector = self.embedder.embed(text)?;
            self.check_dim(&vector)?;
            embedded.push((text, vector));
        }
        let mut state = self.write();
        let ids: Vec<ChunkId> = embedded
            .into_iter()
            .map(|(text, vector)| Self::append(&mut state, text, source_name, vector))
            .collect();
        tracing::debug!(source = source_name, total = state.chunks.len(), "batch added");
        Ok(ids)
    }

    fn push(&self, text: &str, source_name: &str, vector: Vec<f32>) -> Result<ChunkId> {
        self.check_dim(&vector)?;
        let mut state = self.write();
        let id = Self::append(&mut state, text, source_name, vector);
        tracing::debug!(id, source = source_name, total = state.chunks.len(), "chunk added");
        Ok(id)
    }

    fn check_dim(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() });
        }
        Ok(())
    }

    fn append(state: &mut IndexState, text: &str, source_name: &str, vector: Vec<f32>) -> ChunkId {
        let id = state.next_id;
        state.next_id += 1;
        state.chunks.push(Arc::new(DocumentChunk {
            id,
            text: text.to_string(),
            vector,
            source_name: source_name.to_string(),
            created_at: Utc::now(),
        }));
        id
    }

    /// Best `top_k` chunks for `question`, highest cosine similarity first.
    /// Ties go to the earlier-inserted chunk. An empty index yields `[]`.
    pub fn query(&self, question: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let question = non_empty_trimmed(question)?;
        if top_k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let query_vector = self.embedder.embed(question)?;
        self.query_vector(&query_vector, top_k)
    }

    /// Rank stored chunks against a precomputed query vector.
    pub fn query_vector(&self, query_vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query_vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query_vector.len() });
        }
        let started = Instant::now();
        let snapshot = self.chunks();
        let mut scored = Vec::with_capacity(snapshot.len());
        for (pos, chunk) in snapshot.iter().enumerate() {
            if chunk.vector.len() != query_vector.len() {
                tracing::error!(
                    id = chunk.id,
                    len = chunk.vector.len(),
                    "stored vector has wrong dimension"
                );
                return Err(Error::DimensionMismatch {
                    expected: query_vector.len(),
                    actual: chunk.vector.len(),
                });
            }
            scored.push((pos, cosine_similarity(query_vector, &chunk.vector)));
        }
        let hits: Vec<SearchHit> = top_k(scored, k)
            .into_iter()
            .map(|(pos, score)| SearchHit::from_chunk(&snapshot[pos], score))
            .collect();
        tracing::debug!(
            scanned = snapshot.len(),
            returned = hits.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "query ranked"
        );
        Ok(hits)
    }

    /// Delete one chunk. Other ids are unaffected.
    pub fn remove(&self, id: ChunkId) -> Result<Arc<DocumentChunk>> {
        let mut state = self.write();
        let pos = state.chunks.iter().position(|c| c.id == id).ok_or(Error::NotFound(id))?;
        let removed = state.chunks.remove(pos);
        tracing::debug!(id, "chunk removed");
        Ok(removed)
    }

    /// Delete every chunk that came from `source_name`; returns how many.
    pub fn remove_source(&self, source_name: &str) -> usize {
        let mut state = self.write();
        let before = state.chunks.len();
        state.chunks.retain(|c| c.source_name != source_name);
        let removed = before - state.chunks.len();
        if removed > 0 {
            tracing::debug!(source = source_name, removed, "source removed");
        }
        removed
    }

    pub fn get(&self, id: ChunkId) -> Option<Arc<DocumentChunk>> {
        self.read().chunks.iter().find(|c| c.id == id).cloned()
    }

    /// Snapshot of all chunks in insertion order.
    pub fn chunks(&self) -> Vec<Arc<DocumentChunk>> {
        self.read().chunks.clone()
    }

    /// Distinct source names in first-seen order.
    pub fn sources(&self) -> Vec<String> {
        let state = self.read();
        let mut out: Vec<String> = Vec::new();
        for c in &state.chunks {
            if !out.iter().any(|s| s == &c.source_name) {
                out.push(c.source_name.clone());
            }
        }
        out
    }

    // Chunks are immutable once pushed, so a poisoned lock still guards a
    // consistent list.
    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for DocumentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentIndex")
            .field("embedder", &self.embedder.embedder_id())
            .field("dim", &self.dim)
            .field("len", &self.len())
            .finish()
    }
}
