//! In-memory document index with brute-force cosine ranking.

pub mod index;
pub mod similarity;

pub use index::DocumentIndex;
pub use similarity::{cosine_similarity, UNDEFINED_SIMILARITY};
