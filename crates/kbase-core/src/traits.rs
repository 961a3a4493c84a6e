use std::sync::Arc;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct Embedded {
    pub vector: Vec<f32>,
    /// Produced by a fallback after the primary strategy failed.
    pub degraded: bool,
}

/// Maps text to a fixed-length vector suitable for cosine comparison.
///
/// Implementations trim their input and return `Error::EmptyInput` when
/// nothing is left. The same text must always produce the same vector for a
/// given `embedder_id`.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the strategy/model (e.g. `fallback:xxh64:d384`).
    fn embedder_id(&self) -> &str;
    /// Output dimensionality (D).
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Like [`Embedder::embed`], but also reports whether the vector came from
    /// a degraded path. Wrappers that memoize vectors must skip degraded ones.
    fn embed_checked(&self, text: &str) -> Result<Embedded> {
        Ok(Embedded { vector: self.embed(text)?, degraded: false })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embedder_id(&self) -> &str {
        (**self).embedder_id()
    }

    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }

    fn embed_checked(&self, text: &str) -> Result<Embedded> {
        (**self).embed_checked(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}

impl<E: Embedder + ?Sized> Embedder for Arc<E> {
    fn embedder_id(&self) -> &str {
        (**self).embedder_id()
    }

    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }

    fn embed_checked(&self, text: &str) -> Result<Embedded> {
        (**self).embed_checked(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}

/// Turns a question plus retrieved context into a natural-language answer.
pub trait AnswerGenerator: Send + Sync {
    fn generate(&self, question: &str, context: &[String]) -> Result<String>;
}
