//! In-memory embedding cache keyed by the blake3 hash of the trimmed text.
//!
//! Bounded by `capacity`; when full the oldest entry is evicted. The inner
//! embedder runs outside the lock, so two callers racing on the same text may
//! both compute it; the second insert is dropped. Vectors the inner embedder
//! reports as degraded are passed through but never stored.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use kbase_core::error::Result;
use kbase_core::traits::{Embedded, Embedder};
use kbase_core::types::non_empty_trimmed;

pub struct CachedEmbedder<E> {
    inner: E,
    capacity: usize,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Default)]
struct CacheState {
    vectors: HashMap<blake3::Hash, Vec<f32>>,
    order: VecDeque<blake3::Hash>,
}

impl<E: Embedder> CachedEmbedder<E> {
    pub fn new(inner: E, capacity: usize) -> Self {
        Self {
            inner,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &blake3::Hash) -> Option<Vec<f32>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).vectors.get(key).cloned()
    }

    fn insert(&self, key: blake3::Hash, vector: Vec<f32>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.vectors.contains_key(&key) {
            return;
        }
        while state.order.len() >= self.capacity {
            match state.order.pop_front() {
                Some(old) => {
                    state.vectors.remove(&old);
                }
                None => break,
            }
        }
        state.order.push_back(key);
        state.vectors.insert(key, vector);
    }
}

impl<E: Embedder> Embedder for CachedEmbedder<E> {
    fn embedder_id(&self) -> &str {
        self.inner.embedder_id()
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_checked(text).map(|e| e.vector)
    }

    fn embed_checked(&self, text: &str) -> Result<Embedded> {
        let text = non_empty_trimmed(text)?;
        let key = blake3::hash(text.as_bytes());
        let cached = self.lookup(&key);
        if let Some(vector) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Embedded { vector, degraded: false });
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let embedded = self.inner.embed_checked(text)?;
        if embedded.degraded {
            tracing::debug!(embedder = self.inner.embedder_id(), "degraded vector not cached");
        } else {
            self.insert(key, embedded.vector.clone());
        }
        Ok(embedded)
    }
}
