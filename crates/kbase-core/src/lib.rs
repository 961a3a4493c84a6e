//! Shared building blocks for the kbase retrieval engine: domain types, the
//! embedder and answer-generator seams, configuration, chunking and the
//! plain-text loader.

pub mod chunking;
pub mod config;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
