//! Embedding strategies for the kbase index.
//!
//! - [`FallbackEmbedder`]: hash-seeded normal vectors, always available.
//! - [`SemanticEmbedder`]: local candle model, degrades to the fallback.
//! - [`CachedEmbedder`]: memoizing wrapper around either.

use std::sync::Arc;

use kbase_core::config::{EmbedderStrategy, EmbeddingConfig};
use kbase_core::error::Result;
use kbase_core::traits::Embedder;

pub mod cache;
pub mod device;
pub mod fallback;
pub mod model;
pub mod semantic;

pub use cache::CachedEmbedder;
pub use fallback::FallbackEmbedder;
pub use model::{mean_pool_l2, SentenceModel};
pub use semantic::SemanticEmbedder;

/// Build the embedder described by `config`, wrapped in a cache when
/// `cache_capacity > 0`.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    config.validate()?;
    let base: Box<dyn Embedder> = match config.strategy {
        EmbedderStrategy::Fallback => Box::new(FallbackEmbedder::new(config.dimension)?),
        EmbedderStrategy::Semantic => Box::new(SemanticEmbedder::from_config(config)?),
    };
    tracing::info!(
        embedder = base.embedder_id(),
        cache = config.cache_capacity,
        "embedder configured"
    );
    if config.cache_capacity > 0 {
        Ok(Arc::new(CachedEmbedder::new(base, config.cache_capacity)))
    } else {
        Ok(Arc::from(base))
    }
}
