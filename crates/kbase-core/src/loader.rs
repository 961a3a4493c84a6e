use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::SourceDocument;

const DEFAULT_EXTENSIONS: &[&str] = &["txt", "md", "csv"];

/// Reads plain-text uploads from a directory tree.
///
/// Binary formats (PDF, DOCX, XLSX) need an external extractor; this loader
/// only handles files that already are text.
#[derive(Debug, Clone)]
pub struct TextLoader {
    extensions: Vec<String>,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self { extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect() }
    }
}

impl TextLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { extensions: extensions.into_iter().map(|e| e.into().to_lowercase()).collect() }
    }

    /// Load every supported file under `root`, in sorted path order.
    /// Files that are empty after trimming are skipped.
    pub fn load_dir(&self, root: &Path) -> Result<Vec<SourceDocument>> {
        if !root.is_dir() {
            anyhow::bail!("not a directory: {}", root.display());
        }
        let files = self.list_files(root);
        tracing::debug!(dir = %root.display(), files = files.len(), "listing text files");
        let mut docs = Vec::with_capacity(files.len());
        for path in files {
            let text = read_text(&path)?;
            if text.trim().is_empty() {
                tracing::warn!(file = %path.display(), "skipping empty file");
                continue;
            }
            let source_name =
                path.strip_prefix(root).unwrap_or(&path).to_string_lossy().replace('\\', "/");
            docs.push(SourceDocument { source_name, text });
        }
        Ok(docs)
    }

    fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable directory entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| self.is_supported(p))
            .collect();
        files.sort();
        files
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}
