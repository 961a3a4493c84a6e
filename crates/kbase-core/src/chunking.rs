//! Word-window chunking of extracted document text.
//!
//! Paragraphs (separated by blank lines) are packed greedily into chunks of at
//! most `chunk_words` words. A paragraph longer than that is split into
//! windows that share `overlap_words` words with their predecessor.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_words: usize,
    pub overlap_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_words: 500, overlap_words: 0 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_words == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_words must be > 0".into()));
        }
        if self.overlap_words >= self.chunk_words {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap_words ({}) must be smaller than chunk_words ({})",
                self.overlap_words, self.chunk_words
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split `text` into whitespace-normalized, non-empty chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let max = self.config.chunk_words;
        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for paragraph in paragraphs(text) {
            if paragraph.len() > max {
                flush(&mut pending, &mut chunks);
                chunks.extend(self.windows(&paragraph));
                continue;
            }
            if pending.len() + paragraph.len() > max {
                flush(&mut pending, &mut chunks);
            }
            pending.extend(paragraph);
        }
        flush(&mut pending, &mut chunks);
        chunks
    }

    fn windows(&self, words: &[&str]) -> Vec<String> {
        let size = self.config.chunk_words;
        let overlap = self.config.overlap_words;
        let mut out = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + size).min(words.len());
            out.push(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start = end - overlap;
        }
        out
    }
}

/// Collapse every run of whitespace to a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn paragraphs(text: &str) -> Vec<Vec<&str>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.extend(line.split_whitespace());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn flush(pending: &mut Vec<&str>, chunks: &mut Vec<String>) {
    if !pending.is_empty() {
        chunks.push(pending.join(" "));
        pending.clear();
    }
}
