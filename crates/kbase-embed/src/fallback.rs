//! Deterministic, model-free embeddings.
//!
//! The vector for a text is drawn from a standard normal distribution using a
//! PRNG seeded with the text's xxHash64 reduced modulo 2^32. Identical text
//! always yields a bit-identical vector, but similarity between different
//! texts carries no meaning. Use it to exercise the pipeline without a model.

use std::hash::Hasher;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use twox_hash::XxHash64;

use kbase_core::error::{Error, Result};
use kbase_core::traits::Embedder;
use kbase_core::types::non_empty_trimmed;

#[derive(Debug, Clone)]
pub struct FallbackEmbedder {
    dim: usize,
    id: String,
}

impl FallbackEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("fallback dimension must be > 0".into()));
        }
        Ok(Self { dim, id: format!("fallback:xxh64:d{dim}") })
    }

    /// Vector for already-trimmed, non-empty text.
    pub(crate) fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed_for(text));
        (0..self.dim).map(|_| rng.sample::<f32, _>(StandardNormal)).collect()
    }
}

/// Stable 32-bit seed for `text`.
pub fn seed_for(text: &str) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(text.as_bytes());
    hasher.finish() % (1u64 << 32)
}

impl Embedder for FallbackEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = non_empty_trimmed(text)?;
        Ok(self.vector_for(text))
    }
}
